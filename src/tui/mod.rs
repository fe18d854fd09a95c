//! Read-only terminal browser: page list, revision history, revision content.

pub mod app;
pub mod event;
pub mod ui;

use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{self as ct_event, Event, KeyEvent, KeyEventKind};
use ratatui::DefaultTerminal;

use crate::db::WikiError;
use crate::service::WikiService;
use crate::store::Storage;

use self::app::App;
use self::event::{apply_action, map_key};

/// How often an idle browser re-reads the wiki to pick up other writers.
const REFRESH_INTERVAL: Duration = Duration::from_secs(2);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Alternate-screen terminal for the lifetime of one browse session.
/// `ratatui::try_init` installs a panic hook that restores the terminal;
/// dropping the session restores it on every other exit path.
struct Session {
    terminal: DefaultTerminal,
}

impl Session {
    fn start() -> io::Result<Self> {
        Ok(Self {
            terminal: ratatui::try_init()?,
        })
    }

    /// Rows available to the content pane (frame minus borders and status line).
    fn content_height(&self) -> io::Result<u16> {
        Ok(self.terminal.size()?.height.saturating_sub(4))
    }

    /// Wait up to [`POLL_INTERVAL`] for a key press.
    fn next_key(&self) -> io::Result<Option<KeyEvent>> {
        if !ct_event::poll(POLL_INTERVAL)? {
            return Ok(None);
        }
        match ct_event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => Ok(Some(key)),
            _ => Ok(None),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        ratatui::restore();
    }
}

/// Entry point for the `browse` subcommand. `query_timeout` bounds each
/// lookup the browser makes.
pub fn run_browse<S: Storage>(
    wiki: &WikiService<S>,
    query_timeout: Option<Duration>,
) -> Result<(), WikiError> {
    let mut app = App::new();
    app.query_timeout = query_timeout;
    // Fail on a bad store before taking over the screen.
    app.load_initial(wiki)?;
    tracing::debug!(pages = app.items.len(), "browser started");

    let mut session = Session::start()?;
    let mut last_read = Instant::now();

    while app.running {
        session.terminal.draw(|f| ui::draw(f, &app))?;

        match session.next_key()? {
            Some(key) => {
                let action = map_key(&app, key);
                apply_action(&mut app, action, wiki, session.content_height()?)?;
                last_read = Instant::now();
            }
            None if last_read.elapsed() >= REFRESH_INTERVAL => {
                app.refresh(wiki)?;
                last_read = Instant::now();
            }
            None => {}
        }
    }

    Ok(())
}
