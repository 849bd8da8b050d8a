//! Interactive console loop

use std::io;
use std::io::Write;

use catalog_lib::cache::CacheKey;
use catalog_lib::query::CacheEvent;
use catalog_lib::query::CacheEventKind;
use catalog_lib::query::LifecycleEvent;
use catalog_lib::session::SessionGuard;
use catalog_lib::view::CatalogView;
use catalog_lib::view::CategoryFilter;
use catalog_lib::view::Dialog;
use catalog_lib::view::FormField;
use log::debug;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::io::Lines;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::commands::Command;
use crate::commands::HELP;
use crate::render;

pub struct App<R> {
    view: CatalogView,
    session: SessionGuard,
    input: Lines<R>,
    events: broadcast::Receiver<CacheEvent>,
}

impl<R: AsyncBufRead + Unpin> App<R> {
    pub fn new(view: CatalogView, session: SessionGuard, input: R) -> Self {
        let events = view.queries().subscribe();
        Self {
            view,
            session,
            input: input.lines(),
            events,
        }
    }

    /// Reads and runs commands until `quit`, end of input or cancellation.
    pub async fn run(mut self, cancel: CancellationToken) -> io::Result<()> {
        println!("Product catalog admin. Type 'login' to begin, 'help' for commands.");

        loop {
            prompt("> ")?;
            tokio::select! {
                _ = cancel.cancelled() => break,
                line = self.input.next_line() => {
                    let Some(line) = line? else { break };
                    match Command::parse(&line) {
                        Ok(None) => {}
                        Ok(Some(Command::Quit)) => break,
                        Ok(Some(command)) => self.dispatch(command).await?,
                        Err(err) => println!("{}", err),
                    }
                }
                event = self.events.recv() => self.on_cache_event(event),
            }
        }

        println!("Bye.");
        Ok(())
    }

    fn on_cache_event(&mut self, event: Result<CacheEvent, broadcast::error::RecvError>) {
        let refreshed = match event {
            Ok(CacheEvent {
                key: CacheKey::Products,
                kind: CacheEventKind::Updated,
            }) => true,
            Ok(_) => false,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!("console skipped {} cache events", skipped);
                true
            }
            Err(broadcast::error::RecvError::Closed) => false,
        };
        if refreshed && self.session.is_authenticated() && self.view.sync() && !self.view.dialog().is_open() {
            println!("\n(product list refreshed, {})", self.view.summary());
        }
    }

    async fn dispatch(&mut self, command: Command) -> io::Result<()> {
        if !command.is_public()
            && let Err(err) = self.session.require_authenticated()
        {
            println!("{}. Type 'login' first.", err);
            return Ok(());
        }

        match command {
            Command::Login { username, password } => self.login(username, password).await?,
            Command::Logout => {
                if let Err(err) = self.session.logout().await {
                    println!("{}", err);
                }
                self.view.close();
                println!("Logged out.");
            }
            Command::List => {
                let _ = self.view.load().await;
                self.show_grid();
            }
            Command::Search(text) => {
                if text.is_empty() {
                    self.view.clear_search();
                } else {
                    self.view.set_search(text);
                }
                self.show_grid();
            }
            Command::Category(filter) => {
                if let CategoryFilter::Only(category) = &filter
                    && !self.view.categories().contains(category)
                {
                    println!("Unknown category '{}'.", category);
                    self.print_categories();
                    return Ok(());
                }
                self.view.set_category(filter);
                self.show_grid();
            }
            Command::Clear => {
                self.view.clear_filters();
                self.show_grid();
            }
            Command::Show(id) => {
                self.view.open_product(id).await;
                self.show_dialog();
            }
            Command::Edit => self.edit().await?,
            Command::Delete => self.delete().await?,
            Command::Back => {
                self.view.back();
                if self.view.dialog().is_open() {
                    self.show_dialog();
                } else {
                    self.show_grid();
                }
            }
            Command::Retry => {
                let _ = self.view.retry().await;
                self.show_grid();
            }
            Command::Focus => self.lifecycle(LifecycleEvent::FocusGained),
            Command::Online => self.lifecycle(LifecycleEvent::Reconnected),
            Command::Help => println!("{}", HELP),
            Command::Quit => {}
        }
        Ok(())
    }

    async fn login(&mut self, username: Option<String>, password: Option<String>) -> io::Result<()> {
        if self.session.is_authenticated() {
            println!("Already logged in.");
            return Ok(());
        }

        let username = match username {
            Some(username) => username,
            None => self.ask("Username: ").await?.unwrap_or_default(),
        };
        let password = match password {
            Some(password) => password,
            None => self.ask("Password: ").await?.unwrap_or_default(),
        };

        match self.session.login(username.trim(), password.trim()).await {
            Ok(()) => {
                println!("Logged in.");
                let _ = self.view.load().await;
                self.show_grid();
            }
            Err(err) => println!("{}", err),
        }
        Ok(())
    }

    async fn edit(&mut self) -> io::Result<()> {
        if !matches!(self.view.dialog(), Dialog::Editing { .. }) && !self.view.start_edit() {
            println!("Open a loaded product with 'show <id>' first.");
            return Ok(());
        }

        println!("Press enter to keep the current value.");
        for field in FormField::ALL {
            let current = match self.view.form_mut() {
                Some(form) => form.value(field),
                None => return Ok(()),
            };
            let Some(input) = self.ask(&format!("{} [{}]: ", field.label(), current)).await? else {
                return Ok(());
            };
            if !input.trim().is_empty()
                && let Some(form) = self.view.form_mut()
            {
                form.set(field, input.trim());
            }
        }

        match self.view.submit_edit().await {
            Ok(()) => {
                if let Some(notice) = self.view.take_notice() {
                    println!("{}", notice);
                }
                self.show_dialog();
            }
            Err(_) => {
                self.show_dialog();
                println!("Type 'edit' to change the values or 'back' to cancel.");
            }
        }
        Ok(())
    }

    async fn delete(&mut self) -> io::Result<()> {
        if !matches!(self.view.dialog(), Dialog::ConfirmDelete { .. }) && !self.view.request_delete() {
            println!("Open a product with 'show <id>' first.");
            return Ok(());
        }

        self.show_dialog();
        let answer = self.ask("Delete? [y/N] ").await?.unwrap_or_default();
        if !matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes") {
            self.view.back();
            println!("Delete cancelled.");
            return Ok(());
        }

        match self.view.confirm_delete().await {
            Ok(()) => {
                if let Some(notice) = self.view.take_notice() {
                    println!("{}", notice);
                }
                self.show_grid();
            }
            Err(_) => {
                self.show_dialog();
                println!("Type 'delete' to try again or 'back' to cancel.");
            }
        }
        Ok(())
    }

    fn lifecycle(&mut self, event: LifecycleEvent) {
        let count = self.view.queries().handle_event(event);
        match count {
            0 => println!("Nothing to refresh."),
            n => println!("Refreshing {} stale {}.", n, if n == 1 { "entry" } else { "entries" }),
        }
    }

    fn show_grid(&mut self) {
        self.view.sync();
        print!("{}", render::grid(&self.view));
    }

    fn show_dialog(&self) {
        if let Some(text) = render::dialog(self.view.dialog()) {
            print!("{}", text);
        }
    }

    fn print_categories(&self) {
        let categories: Vec<String> = self.view.categories().iter().map(|c| c.to_string()).collect();
        println!("Categories: all, {}", categories.join(", "));
    }

    /// Prompts for one line; `None` at end of input.
    async fn ask(&mut self, label: &str) -> io::Result<Option<String>> {
        prompt(label)?;
        self.input.next_line().await
    }
}

fn prompt(label: &str) -> io::Result<()> {
    let mut stdout = io::stdout();
    write!(stdout, "{}", label)?;
    stdout.flush()
}
