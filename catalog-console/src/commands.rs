//! Console command parsing

use catalog_lib::model::ProductId;
use catalog_lib::view::CategoryFilter;

/// A parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Credentials not given on the line are prompted for.
    Login {
        username: Option<String>,
        password: Option<String>,
    },
    Logout,
    List,
    /// An empty search clears the search text.
    Search(String),
    Category(CategoryFilter),
    Clear,
    Show(ProductId),
    Edit,
    Delete,
    Back,
    Retry,
    Focus,
    Online,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Unknown command '{0}' (type 'help' for a list)")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Invalid product id '{0}'")]
    InvalidId(String),
}

impl Command {
    /// Parses one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, ParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };

        let command = match name.to_ascii_lowercase().as_str() {
            "login" => {
                let mut parts = rest.split_whitespace().map(str::to_string);
                Self::Login {
                    username: parts.next(),
                    password: parts.next(),
                }
            }
            "logout" => Self::Logout,
            "list" | "ls" => Self::List,
            "search" | "find" => Self::Search(rest.to_string()),
            "category" | "cat" => {
                if rest.is_empty() {
                    return Err(ParseError::Usage("category <name|all>"));
                }
                Self::Category(CategoryFilter::parse(rest))
            }
            "clear" => Self::Clear,
            "show" | "open" => {
                if rest.is_empty() {
                    return Err(ParseError::Usage("show <id>"));
                }
                Self::Show(rest.parse().map_err(|_| ParseError::InvalidId(rest.to_string()))?)
            }
            "edit" => Self::Edit,
            "delete" | "rm" => Self::Delete,
            "back" | "close" => Self::Back,
            "retry" => Self::Retry,
            "focus" => Self::Focus,
            "online" => Self::Online,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => return Err(ParseError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }

    /// Commands that work without logging in.
    pub fn is_public(&self) -> bool {
        matches!(self, Self::Login { .. } | Self::Help | Self::Quit)
    }
}

pub const HELP: &str = "\
Commands:
  login [user] [password]   log in
  logout                    log out
  list                      show the product grid
  search <text>             filter by title (empty clears the search)
  category <name|all>       filter by category
  clear                     clear search and category filters
  show <id>                 open product details
  edit                      edit the open product
  delete                    delete the open product
  back                      leave the current dialog
  retry                     reload the product list from the service
  focus                     simulate the window regaining focus
  online                    simulate the network coming back
  help                      show this help
  quit                      exit";
