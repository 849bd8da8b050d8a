mod app;
mod commands;
mod paths;
mod render;

use std::env;
use std::fs;
use std::fs::File;
use std::time::Duration;

use catalog_lib::CatalogClient;
use catalog_lib::DEFAULT_BASE_URL;
use catalog_lib::QueryClient;
use catalog_lib::error::ApiError;
use catalog_lib::session::SessionGuard;
use catalog_lib::view::CatalogView;
use log::info;
use simplelog::Config;
use simplelog::LevelFilter;
use simplelog::WriteLogger;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;

use crate::app::App;

/// Environment variable overriding the product service URL.
const API_URL_VAR: &str = "CATALOG_API_URL";

const GC_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn init_logging() {
    paths::rotate_logs();
    let Some(path) = paths::log_file() else { return };
    if let Some(dir) = path.parent() {
        let _ = fs::create_dir_all(dir);
    }
    match File::create(&path) {
        Ok(file) => {
            let _ = WriteLogger::init(LevelFilter::Debug, Config::default(), file);
        }
        Err(err) => eprintln!("Logging disabled, cannot create {}: {}", path.display(), err),
    }
}

async fn run() -> Result<(), AppError> {
    let base_url = env::var(API_URL_VAR).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
    let client = CatalogClient::builder()
        .url(&base_url)
        .timeout(Duration::from_secs(30))
        .build()?;
    info!("using product service at {}", base_url);

    let queries = QueryClient::new(client);
    let session = SessionGuard::in_memory();
    session.restore().await;

    let cancel = CancellationToken::new();
    let gc = queries.spawn_gc(GC_INTERVAL, cancel.clone());

    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let app = App::new(
        CatalogView::new(queries),
        session,
        BufReader::new(tokio::io::stdin()),
    );
    let result = app.run(cancel.clone()).await;

    cancel.cancel();
    let _ = gc.await;
    info!("shutting down");
    result?;
    Ok(())
}

#[tokio::main]
async fn main() {
    init_logging();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
