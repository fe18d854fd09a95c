//! revwiki CLI: create, edit, browse and inspect a versioned wiki.
//!
//! All output is JSON by default with an optional `--pretty` flag for human
//! readability. Errors go to stderr as `{"error": ..., "kind": ...}` with a
//! non-zero exit code.

use clap::{Parser, Subcommand};
use revwiki::config::Config;
use revwiki::db::WikiError;
use revwiki::messages::{Reply, Request, RequestKind};
use revwiki::models::{PageId, PageUpdate, RevisionId};
use revwiki::output::{self, OutputMode};
use revwiki::service::WikiService;
use revwiki::store::SqliteStore;
use revwiki::tui;
use std::io::{self, Read as _};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Input validation applied before anything reaches the store.
mod validation {
    use revwiki::db::WikiError;

    pub const MAX_TITLE_LEN: usize = 500;
    pub const MAX_BODY_LEN: usize = 10_000_000; // 10 MB
    pub const MAX_REQUEST_LEN: usize = 11_000_000;

    pub fn validate_title(title: &str) -> Result<(), WikiError> {
        if title.is_empty() {
            return Err(WikiError::InvalidInput("Title must not be empty".to_string()));
        }
        if title.len() > MAX_TITLE_LEN {
            return Err(WikiError::InvalidInput(format!(
                "Title too long (max {} bytes)",
                MAX_TITLE_LEN
            )));
        }
        Ok(())
    }

    pub fn validate_body(body: &str) -> Result<(), WikiError> {
        if body.len() > MAX_BODY_LEN {
            return Err(WikiError::InvalidInput(format!(
                "Body too long (max {} bytes)",
                MAX_BODY_LEN
            )));
        }
        Ok(())
    }

    pub fn validate_request(json: &str) -> Result<(), WikiError> {
        if json.len() > MAX_REQUEST_LEN {
            return Err(WikiError::InvalidInput(format!(
                "Request too long (max {} bytes)",
                MAX_REQUEST_LEN
            )));
        }
        Ok(())
    }
}

/// A versioned wiki on a local SQLite database.
///
/// Every edit appends a revision; history is kept until the page is deleted.
/// All output is JSON by default; use --pretty for human-readable format.
#[derive(Parser)]
#[command(name = "revwiki", version, about)]
struct Cli {
    /// Output in human-readable format instead of JSON.
    #[arg(long, global = true)]
    pretty: bool,

    /// Log debug detail to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Database file (overrides config and WIKI_DATABASE_PATH).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Config file (default: ~/.config/revwiki/config.toml or $WIKI_CONFIG).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create, read, edit and delete pages.
    Page {
        #[command(subcommand)]
        action: PageAction,
    },
    /// Inspect page history.
    Rev {
        #[command(subcommand)]
        action: RevAction,
    },
    /// Apply a JSON request read from stdin or --file.
    Submit {
        /// Which request the payload carries.
        #[arg(value_enum)]
        kind: RequestKind,
        /// Read the payload from this file instead of stdin.
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Interactive TUI browser for pages and their history.
    Browse,
}

#[derive(Subcommand)]
enum PageAction {
    /// Create a page with its first revision.
    Create {
        /// Page title. Spaces become underscores; other punctuation is dropped.
        #[arg(long)]
        title: String,
        /// Page content (markdown).
        #[arg(long, conflicts_with = "stdin")]
        body: Option<String>,
        /// Read content from stdin.
        #[arg(long)]
        stdin: bool,
    },
    /// Show a page's current revision and content.
    Get {
        /// Stored title (case-insensitive).
        title: String,
    },
    /// Show page metadata by title.
    Info {
        title: String,
    },
    /// Show page metadata by id.
    Show {
        id: PageId,
    },
    /// Print the id of the page with this title.
    Resolve {
        title: String,
    },
    /// List all pages.
    List,
    /// Rename and/or edit a page in one step.
    Update {
        id: PageId,
        /// New title.
        #[arg(long)]
        title: Option<String>,
        /// New content.
        #[arg(long, conflicts_with = "stdin")]
        body: Option<String>,
        /// Read new content from stdin.
        #[arg(long)]
        stdin: bool,
    },
    /// Rename a page without adding a revision.
    Rename {
        id: PageId,
        title: String,
    },
    /// Save new content as the page's current revision.
    Edit {
        id: PageId,
        #[arg(long, conflicts_with = "stdin")]
        body: Option<String>,
        #[arg(long)]
        stdin: bool,
    },
    /// Delete a page and its whole history.
    Delete {
        id: PageId,
    },
}

#[derive(Subcommand)]
enum RevAction {
    /// List a page's revisions, oldest first.
    List {
        title: String,
    },
    /// Show a page as it was at a given revision.
    Get {
        title: String,
        rev_id: RevisionId,
    },
    /// Print the raw text of a revision.
    Raw {
        rev_id: RevisionId,
    },
}

/// Read content from --body or --stdin. `None` if neither was given.
fn read_body(body: &Option<String>, stdin: bool) -> Result<Option<String>, WikiError> {
    let content = if stdin {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        Some(buf)
    } else {
        body.clone()
    };
    if let Some(ref c) = content {
        validation::validate_body(c)?;
    }
    Ok(content)
}

fn read_request(file: &Option<PathBuf>) -> Result<String, WikiError> {
    let json = match file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    validation::validate_request(&json)?;
    Ok(json)
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config, WikiError> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    if let Some(ref db) = cli.db {
        config.database_path = db.clone();
    }
    tracing::debug!(
        database = %config.database_path.display(),
        max_open = config.pool.max_open_conns,
        timeout_secs = config.timeout_secs,
        "configuration resolved"
    );
    Ok(config)
}

fn run(cli: Cli) -> Result<(), WikiError> {
    let mode = if cli.pretty {
        OutputMode::Pretty
    } else {
        OutputMode::Json
    };

    let config = load_config(&cli)?;
    let store = SqliteStore::open(&config.database_path, config.pool.clone())?;
    let wiki = WikiService::new(store);
    let deadline = config.deadline();

    let result = dispatch(&cli.command, &wiki, &config, mode, deadline);
    wiki.store().close();
    result
}

fn dispatch(
    command: &Commands,
    wiki: &WikiService<SqliteStore>,
    config: &Config,
    mode: OutputMode,
    deadline: revwiki::deadline::Deadline,
) -> Result<(), WikiError> {
    match command {
        // =====================================================================
        // Page commands
        // =====================================================================
        Commands::Page { action } => match action {
            PageAction::Create { title, body, stdin } => {
                validation::validate_title(title)?;
                let content = read_body(body, *stdin)?.unwrap_or_default();
                let page_id = wiki.create_page_bundle(title, &content, deadline)?;
                tracing::debug!(%page_id, "page created");

                let page = wiki.get_page(page_id, deadline)?;
                let bundle = wiki.get_current_bundle(&page.title, deadline)?;
                output::print(mode, &bundle, || output::print_pretty_bundle(&bundle));
            }
            PageAction::Get { title } => {
                let bundle = wiki.get_current_bundle(title, deadline)?;
                output::print(mode, &bundle, || output::print_pretty_bundle(&bundle));
            }
            PageAction::Info { title } => {
                let page = wiki.get_page_by_title(title, deadline)?;
                output::print(mode, &page, || output::print_pretty_page(&page));
            }
            PageAction::Show { id } => {
                let page = wiki.get_page(*id, deadline)?;
                output::print(mode, &page, || output::print_pretty_page(&page));
            }
            PageAction::Resolve { title } => {
                let page_id = wiki.resolve_title_to_id(title, deadline)?;
                let msg = serde_json::json!({ "page_id": page_id });
                output::print(mode, &msg, || println!("{}", page_id));
            }
            PageAction::List => {
                let pages = wiki.list_pages(deadline)?;
                output::print(mode, &pages, || output::print_pretty_pages(&pages));
            }
            PageAction::Update {
                id,
                title,
                body,
                stdin,
            } => {
                if let Some(ref t) = title {
                    validation::validate_title(t)?;
                }
                let update = PageUpdate {
                    title: title.clone(),
                    content: read_body(body, *stdin)?,
                };
                let rev_id = wiki.update_page_bundle(*id, update, deadline)?;
                let reply = Reply {
                    page_id: Some(*id),
                    rev_id,
                };
                output::print(mode, &reply, || output::print_pretty_reply(&reply));
            }
            PageAction::Rename { id, title } => {
                validation::validate_title(title)?;
                wiki.update_page_title(*id, title, deadline)?;
                let page = wiki.get_page(*id, deadline)?;
                output::print(mode, &page, || output::print_pretty_page(&page));
            }
            PageAction::Edit { id, body, stdin } => {
                let content = read_body(body, *stdin)?.ok_or_else(|| {
                    WikiError::InvalidInput("No content given. Use --body or --stdin.".to_string())
                })?;
                let rev_id = wiki.update_page_content(*id, &content, deadline)?;
                let reply = Reply {
                    page_id: Some(*id),
                    rev_id: Some(rev_id),
                };
                output::print(mode, &reply, || output::print_pretty_reply(&reply));
            }
            PageAction::Delete { id } => {
                wiki.delete_page_bundle(*id, deadline)?;
                let msg = serde_json::json!({ "deleted": id });
                output::print(mode, &msg, || println!("Deleted page {}", id));
            }
        },

        // =====================================================================
        // Revision commands
        // =====================================================================
        Commands::Rev { action } => match action {
            RevAction::List { title } => {
                let revisions = wiki.list_revisions(title, deadline)?;
                output::print(mode, &revisions, || output::print_pretty_revisions(&revisions));
            }
            RevAction::Get { title, rev_id } => {
                let bundle = wiki.get_bundle_at_revision(title, *rev_id, deadline)?;
                output::print(mode, &bundle, || output::print_pretty_bundle(&bundle));
            }
            RevAction::Raw { rev_id } => {
                let text = wiki.get_raw_text(*rev_id, deadline)?;
                output::print(mode, &text, || output::print_pretty_text(&text));
            }
        },

        // =====================================================================
        // JSON requests
        // =====================================================================
        Commands::Submit { kind, file } => {
            let json = read_request(file)?;
            let request = Request::parse(*kind, &json)?;
            tracing::debug!(?kind, "applying request");
            let reply = request.apply(wiki, deadline)?;
            output::print(mode, &reply, || output::print_pretty_reply(&reply));
        }

        // =====================================================================
        // Browse command (interactive TUI)
        // =====================================================================
        Commands::Browse => {
            let timeout = match config.timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            };
            tui::run_browse(wiki, timeout)?;
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        tracing::debug!(kind = %e.kind(), retryable = e.is_retryable(), "command failed");
        let error_json = serde_json::json!({
            "error": e.to_string(),
            "kind": e.kind(),
            "retryable": e.is_retryable(),
        });
        eprintln!("{}", error_json);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_body_flags_conflict() {
        let result = Cli::try_parse_from(["revwiki", "page", "create", "--title", "A", "--body", "x", "--stdin"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_ids_must_be_numeric() {
        assert!(Cli::try_parse_from(["revwiki", "page", "show", "abc"]).is_err());
        assert!(Cli::try_parse_from(["revwiki", "page", "show", "12"]).is_ok());
    }

    #[test]
    fn test_submit_kinds_parse() {
        let cli = Cli::try_parse_from(["revwiki", "submit", "update-bundle"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Submit {
                kind: RequestKind::UpdateBundle,
                file: None
            }
        ));
        assert!(Cli::try_parse_from(["revwiki", "submit", "merge"]).is_err());
    }

    // ===== Title validation =====

    #[test]
    fn test_title_valid() {
        assert!(validation::validate_title("Intro Guide").is_ok());
    }

    #[test]
    fn test_title_rejects_empty() {
        assert!(validation::validate_title("").is_err());
    }

    #[test]
    fn test_title_at_limit() {
        assert!(validation::validate_title(&"x".repeat(500)).is_ok());
    }

    #[test]
    fn test_title_rejects_too_long() {
        assert!(validation::validate_title(&"x".repeat(501)).is_err());
    }

    #[test]
    fn test_title_limit_counts_bytes() {
        // 300 characters, 600 bytes.
        let err = validation::validate_title(&"é".repeat(300)).unwrap_err();
        assert!(err.to_string().contains("max 500 bytes"));
    }

    // ===== Body validation =====

    #[test]
    fn test_body_empty_is_valid() {
        assert!(validation::validate_body("").is_ok());
    }

    #[test]
    fn test_body_at_limit() {
        assert!(validation::validate_body(&"x".repeat(10_000_000)).is_ok());
    }

    #[test]
    fn test_body_over_limit() {
        let err = validation::validate_body(&"x".repeat(10_000_001)).unwrap_err();
        assert_eq!(err.kind(), revwiki::db::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_request_over_limit() {
        assert!(validation::validate_request(&"x".repeat(11_000_001)).is_err());
    }
}
