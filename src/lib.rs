//! revwiki: a versioned wiki store.
//!
//! Pages carry an append-only history of revisions, each pointing at an
//! immutable text. Every write is one SQLite transaction; reads compose a
//! page, one of its revisions and that revision's text into a
//! [`models::PageBundle`].
//!
//! Entry point for library users is [`service::WikiService`] over a
//! [`store::SqliteStore`]:
//!
//! ```no_run
//! use revwiki::deadline::Deadline;
//! use revwiki::pool::PoolConfig;
//! use revwiki::service::WikiService;
//! use revwiki::store::SqliteStore;
//!
//! # fn main() -> Result<(), revwiki::db::WikiError> {
//! let store = SqliteStore::open("wiki.db".as_ref(), PoolConfig::default())?;
//! let wiki = WikiService::new(store);
//! let id = wiki.create_page_bundle("Intro Guide", "# Hi", Deadline::none())?;
//! let bundle = wiki.get_current_bundle("Intro_Guide", Deadline::none())?;
//! assert_eq!(bundle.page.page_id, id);
//! wiki.store().close();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
pub mod deadline;
pub mod messages;
pub mod models;
pub mod output;
pub mod pool;
pub mod repo;
pub mod service;
pub mod store;
pub mod title;
pub mod tui;
