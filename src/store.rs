//! Storage capabilities and the SQLite backend.
//!
//! The service layer talks to storage only through the four capability traits
//! below, bundled as [`Storage`]. [`SqliteStore`] is the one backend: it owns
//! a [`Pool`], runs every write as a single `IMMEDIATE` transaction, and
//! enforces the caller's [`Deadline`] while waiting for a connection, while
//! statements run, and once more before commit.

use crate::db::WikiError;
use crate::deadline::Deadline;
use crate::models::{Page, PageId, PageUpdate, Revision, RevisionId, Text, TextId};
use crate::pool::{Pool, PoolConfig};
use crate::repo;
use crate::title;
use rusqlite::{Connection, ErrorCode, Transaction, TransactionBehavior};
use std::path::Path;

/// Atomic multi-row writes over a page, its revisions and their texts.
///
/// Titles must already be sanitized; implementations reject any other
/// title with `InvalidInput`.
pub trait BundleStore {
    /// Inserts a text, a page, and a revision joining them, then points the
    /// page at that revision.
    fn create_bundle(&self, title: &str, content: &str, deadline: Deadline)
        -> Result<PageId, WikiError>;

    /// Applies whichever fields of `update` are present in one transaction.
    /// Returns the new revision when content was written.
    fn update_bundle(
        &self,
        page_id: PageId,
        update: &PageUpdate,
        deadline: Deadline,
    ) -> Result<Option<RevisionId>, WikiError>;

    /// Appends a revision with new content and repoints the page at it.
    fn update_content(
        &self,
        page_id: PageId,
        content: &str,
        deadline: Deadline,
    ) -> Result<RevisionId, WikiError>;

    /// Removes the page, its revisions, and the texts only they reference.
    fn delete_bundle(&self, page_id: PageId, deadline: Deadline) -> Result<(), WikiError>;
}

pub trait PageStore {
    fn get_page(&self, page_id: PageId, deadline: Deadline) -> Result<Page, WikiError>;

    /// Case-insensitive title lookup.
    fn page_id_by_title(&self, title: &str, deadline: Deadline) -> Result<PageId, WikiError>;

    fn list_pages(&self, deadline: Deadline) -> Result<Vec<Page>, WikiError>;

    fn update_title(&self, page_id: PageId, title: &str, deadline: Deadline)
        -> Result<(), WikiError>;
}

pub trait RevisionStore {
    fn get_revision(&self, rev_id: RevisionId, deadline: Deadline)
        -> Result<Revision, WikiError>;

    /// A page's revisions, oldest first.
    fn list_revisions(&self, page_id: PageId, deadline: Deadline)
        -> Result<Vec<Revision>, WikiError>;
}

pub trait TextStore {
    fn get_text(&self, text_id: TextId, deadline: Deadline) -> Result<Text, WikiError>;

    fn text_for_revision(&self, rev_id: RevisionId, deadline: Deadline)
        -> Result<Text, WikiError>;
}

/// Everything the service layer needs from a storage engine.
pub trait Storage: BundleStore + PageStore + RevisionStore + TextStore + Send + Sync {}

impl<T> Storage for T where T: BundleStore + PageStore + RevisionStore + TextStore + Send + Sync {}

/// SQLite-backed storage.
pub struct SqliteStore {
    pool: Pool,
}

impl SqliteStore {
    /// Opens (creating and migrating if needed) the database at `path`.
    ///
    /// # Errors
    ///
    /// See [`Pool::open`].
    pub fn open(path: &Path, config: PoolConfig) -> Result<Self, WikiError> {
        Ok(Self {
            pool: Pool::open(path, config)?,
        })
    }

    /// Shuts the pool down. Later calls fail with `PoolClosed`.
    pub fn close(&self) {
        self.pool.close();
    }

    fn read<T>(
        &self,
        deadline: Deadline,
        f: impl FnOnce(&Connection) -> Result<T, WikiError>,
    ) -> Result<T, WikiError> {
        let conn = self.pool.get(deadline)?;
        conn.interrupt_at(deadline);
        f(&*conn).map_err(deadline_error)
    }

    fn write<T>(
        &self,
        deadline: Deadline,
        f: impl FnOnce(&Transaction) -> Result<T, WikiError>,
    ) -> Result<T, WikiError> {
        let mut conn = self.pool.get(deadline)?;
        conn.interrupt_at(deadline);
        in_transaction(&mut conn, deadline, f).map_err(deadline_error)
    }
}

/// Runs `f` inside an `IMMEDIATE` transaction and commits only if it succeeds
/// and `deadline` has not passed. Any error rolls the transaction back.
fn in_transaction<T>(
    conn: &mut Connection,
    deadline: Deadline,
    f: impl FnOnce(&Transaction) -> Result<T, WikiError>,
) -> Result<T, WikiError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    match f(&tx).and_then(|value| deadline.check().map(|()| value)) {
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(e) => {
            // The rollback on drop must not be interrupted by the deadline.
            tx.progress_handler(0, None::<fn() -> bool>);
            drop(tx);
            Err(e)
        }
    }
}

/// A statement stopped by the progress handler means the deadline fired.
fn deadline_error(e: WikiError) -> WikiError {
    let interrupted = matches!(
        &e,
        WikiError::Db(db) if db.sqlite_error_code() == Some(ErrorCode::OperationInterrupted)
    );
    if interrupted {
        WikiError::DeadlineExceeded
    } else {
        e
    }
}

/// Stored titles are non-empty and already in sanitized form.
fn check_title(title: &str) -> Result<(), WikiError> {
    if title.is_empty() || !title::is_sanitized(title) {
        return Err(WikiError::InvalidInput(format!(
            "Title '{}' is not in canonical form",
            title
        )));
    }
    Ok(())
}

fn ensure_page(conn: &Connection, page_id: PageId) -> Result<(), WikiError> {
    if repo::page_exists(conn, page_id)? {
        Ok(())
    } else {
        Err(WikiError::NotFound(format!("Page '{}' not found", page_id)))
    }
}

/// New text plus new revision, then repoint the page. The caller has
/// already checked that the page exists.
fn append_revision(conn: &Connection, page_id: PageId, content: &str) -> Result<RevisionId, WikiError> {
    let text_id = repo::insert_text(conn, content)?;
    let rev_id = repo::insert_revision(conn, page_id, text_id)?;
    repo::set_latest_revision(conn, page_id, rev_id)?;
    Ok(rev_id)
}

impl BundleStore for SqliteStore {
    fn create_bundle(
        &self,
        title: &str,
        content: &str,
        deadline: Deadline,
    ) -> Result<PageId, WikiError> {
        check_title(title)?;
        self.write(deadline, |tx| {
            let text_id = repo::insert_text(tx, content)?;
            let page_id = repo::insert_page(tx, title)?;
            let rev_id = repo::insert_revision(tx, page_id, text_id)?;
            repo::set_latest_revision(tx, page_id, rev_id)?;
            Ok(page_id)
        })
    }

    fn update_bundle(
        &self,
        page_id: PageId,
        update: &PageUpdate,
        deadline: Deadline,
    ) -> Result<Option<RevisionId>, WikiError> {
        if let Some(title) = update.title.as_deref() {
            check_title(title)?;
        }
        self.write(deadline, |tx| {
            ensure_page(tx, page_id)?;
            let rev_id = match update.content.as_deref() {
                Some(content) => Some(append_revision(tx, page_id, content)?),
                None => None,
            };
            if let Some(title) = update.title.as_deref() {
                repo::set_title(tx, page_id, title)?;
            }
            Ok(rev_id)
        })
    }

    fn update_content(
        &self,
        page_id: PageId,
        content: &str,
        deadline: Deadline,
    ) -> Result<RevisionId, WikiError> {
        self.write(deadline, |tx| {
            ensure_page(tx, page_id)?;
            append_revision(tx, page_id, content)
        })
    }

    fn delete_bundle(&self, page_id: PageId, deadline: Deadline) -> Result<(), WikiError> {
        self.write(deadline, |tx| repo::delete_page_rows(tx, page_id))
    }
}

impl PageStore for SqliteStore {
    fn get_page(&self, page_id: PageId, deadline: Deadline) -> Result<Page, WikiError> {
        self.read(deadline, |conn| repo::get_page(conn, page_id))
    }

    fn page_id_by_title(&self, title: &str, deadline: Deadline) -> Result<PageId, WikiError> {
        self.read(deadline, |conn| repo::get_page_id_by_title(conn, title))
    }

    fn list_pages(&self, deadline: Deadline) -> Result<Vec<Page>, WikiError> {
        self.read(deadline, repo::list_pages)
    }

    fn update_title(
        &self,
        page_id: PageId,
        title: &str,
        deadline: Deadline,
    ) -> Result<(), WikiError> {
        check_title(title)?;
        self.write(deadline, |tx| repo::set_title(tx, page_id, title))
    }
}

impl RevisionStore for SqliteStore {
    fn get_revision(&self, rev_id: RevisionId, deadline: Deadline) -> Result<Revision, WikiError> {
        self.read(deadline, |conn| repo::get_revision(conn, rev_id))
    }

    fn list_revisions(
        &self,
        page_id: PageId,
        deadline: Deadline,
    ) -> Result<Vec<Revision>, WikiError> {
        self.read(deadline, |conn| repo::list_revisions(conn, page_id))
    }
}

impl TextStore for SqliteStore {
    fn get_text(&self, text_id: TextId, deadline: Deadline) -> Result<Text, WikiError> {
        self.read(deadline, |conn| repo::get_text(conn, text_id))
    }

    fn text_for_revision(&self, rev_id: RevisionId, deadline: Deadline) -> Result<Text, WikiError> {
        self.read(deadline, |conn| repo::get_text_for_revision(conn, rev_id))
    }
}
