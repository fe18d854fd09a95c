//! Repository layer: the SQL for every read and write on the three tables.
//!
//! Plain functions that take a `rusqlite::Connection` (or a `Transaction`,
//! which derefs to one) and map rows to the structs in `models`. They know
//! nothing about pooling, deadlines, or transactions; callers in `store`
//! decide which of them run together atomically.

use crate::db::WikiError;
use crate::models::{Page, PageId, Revision, RevisionId, Text, TextId};
use rusqlite::{Connection, OptionalExtension};

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Map a unique-constraint failure on `page.title` to `Conflict`.
fn title_conflict(e: rusqlite::Error, title: &str) -> WikiError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            WikiError::Conflict(format!("A page titled '{}' already exists", title))
        }
        _ => WikiError::Db(e),
    }
}

fn not_found(what: &str, id: impl std::fmt::Display) -> impl FnOnce(rusqlite::Error) -> WikiError {
    let message = format!("{} '{}' not found", what, id);
    move |e| match e {
        rusqlite::Error::QueryReturnedNoRows => WikiError::NotFound(message),
        _ => WikiError::Db(e),
    }
}

/// Expects columns: page_id, title, latest_rev, created_at
fn row_to_page(row: &rusqlite::Row) -> Result<Page, rusqlite::Error> {
    Ok(Page {
        page_id: row.get(0)?,
        title: row.get(1)?,
        latest_rev: row.get(2)?,
        created_at: row.get(3)?,
    })
}

/// Expects columns: rev_id, page_id, text_id, created_at
fn row_to_revision(row: &rusqlite::Row) -> Result<Revision, rusqlite::Error> {
    Ok(Revision {
        rev_id: row.get(0)?,
        page_id: row.get(1)?,
        text_id: row.get(2)?,
        created_at: row.get(3)?,
    })
}

/// Expects columns: text_id, content, created_at
fn row_to_text(row: &rusqlite::Row) -> Result<Text, rusqlite::Error> {
    Ok(Text {
        text_id: row.get(0)?,
        content: row.get(1)?,
        created_at: row.get(2)?,
    })
}

// =============================================================================
// Texts
// =============================================================================

/// Inserts a new immutable text row.
pub fn insert_text(conn: &Connection, content: &str) -> Result<TextId, WikiError> {
    conn.execute(
        "INSERT INTO text (content, created_at) VALUES (?1, ?2)",
        rusqlite::params![content, now()],
    )?;
    Ok(TextId(conn.last_insert_rowid()))
}

/// # Errors
/// Returns `WikiError::NotFound` if no text has this id.
pub fn get_text(conn: &Connection, text_id: TextId) -> Result<Text, WikiError> {
    conn.query_row(
        "SELECT text_id, content, created_at FROM text WHERE text_id = ?1",
        [text_id],
        row_to_text,
    )
    .map_err(not_found("Text", text_id))
}

/// Fetches the text a revision points at.
///
/// # Errors
/// Returns `WikiError::NotFound` if the revision does not exist.
pub fn get_text_for_revision(conn: &Connection, rev_id: RevisionId) -> Result<Text, WikiError> {
    conn.query_row(
        "SELECT t.text_id, t.content, t.created_at
         FROM revision r JOIN text t ON t.text_id = r.text_id
         WHERE r.rev_id = ?1",
        [rev_id],
        row_to_text,
    )
    .map_err(not_found("Revision", rev_id))
}

// =============================================================================
// Pages
// =============================================================================

/// Inserts a page with no latest revision yet.
///
/// # Errors
/// Returns `WikiError::Conflict` if the title is taken, ignoring case.
pub fn insert_page(conn: &Connection, title: &str) -> Result<PageId, WikiError> {
    conn.execute(
        "INSERT INTO page (title, latest_rev, created_at) VALUES (?1, NULL, ?2)",
        rusqlite::params![title, now()],
    )
    .map_err(|e| title_conflict(e, title))?;
    Ok(PageId(conn.last_insert_rowid()))
}

pub fn page_exists(conn: &Connection, page_id: PageId) -> Result<bool, WikiError> {
    let found = conn
        .query_row("SELECT 1 FROM page WHERE page_id = ?1", [page_id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

/// Points the page at a new current revision.
///
/// # Errors
/// Returns `WikiError::NotFound` if the page does not exist.
pub fn set_latest_revision(
    conn: &Connection,
    page_id: PageId,
    rev_id: RevisionId,
) -> Result<(), WikiError> {
    let rows = conn.execute(
        "UPDATE page SET latest_rev = ?1 WHERE page_id = ?2",
        rusqlite::params![rev_id, page_id],
    )?;
    if rows == 0 {
        return Err(WikiError::NotFound(format!("Page '{}' not found", page_id)));
    }
    Ok(())
}

/// Renames a page.
///
/// # Errors
/// Returns `WikiError::Conflict` if another page already has the title
/// (ignoring case) and `WikiError::NotFound` if the page does not exist.
pub fn set_title(conn: &Connection, page_id: PageId, title: &str) -> Result<(), WikiError> {
    let rows = conn
        .execute(
            "UPDATE page SET title = ?1 WHERE page_id = ?2",
            rusqlite::params![title, page_id],
        )
        .map_err(|e| title_conflict(e, title))?;
    if rows == 0 {
        return Err(WikiError::NotFound(format!("Page '{}' not found", page_id)));
    }
    Ok(())
}

/// Resolves a title to a page id. The comparison ignores case.
///
/// # Errors
/// Returns `WikiError::NotFound` if no page has the title.
pub fn get_page_id_by_title(conn: &Connection, title: &str) -> Result<PageId, WikiError> {
    conn.query_row(
        "SELECT page_id FROM page WHERE title = ?1",
        [title],
        |row| row.get(0),
    )
    .map_err(not_found("Page titled", title))
}

/// # Errors
/// Returns `WikiError::NotFound` if the page does not exist.
pub fn get_page(conn: &Connection, page_id: PageId) -> Result<Page, WikiError> {
    conn.query_row(
        "SELECT page_id, title, latest_rev, created_at FROM page WHERE page_id = ?1",
        [page_id],
        row_to_page,
    )
    .map_err(not_found("Page", page_id))
}

/// Lists every page ordered by title (ignoring case), then id.
pub fn list_pages(conn: &Connection) -> Result<Vec<Page>, WikiError> {
    let mut stmt = conn.prepare(
        "SELECT page_id, title, latest_rev, created_at
         FROM page
         ORDER BY title COLLATE NOCASE, page_id",
    )?;

    let pages = stmt
        .query_map([], row_to_page)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(pages)
}

/// Deletes a page with its revisions and every text only those revisions
/// reach. Statements run texts first, then revisions, then the page, so the
/// caller must hold a transaction: the foreign keys are deferred to commit.
///
/// # Errors
/// Returns `WikiError::NotFound` if the page does not exist.
pub fn delete_page_rows(conn: &Connection, page_id: PageId) -> Result<(), WikiError> {
    if !page_exists(conn, page_id)? {
        return Err(WikiError::NotFound(format!("Page '{}' not found", page_id)));
    }

    conn.execute(
        "DELETE FROM text
         WHERE text_id IN (SELECT text_id FROM revision WHERE page_id = ?1)
           AND text_id NOT IN (SELECT text_id FROM revision WHERE page_id <> ?1)",
        [page_id],
    )?;
    conn.execute("DELETE FROM revision WHERE page_id = ?1", [page_id])?;
    conn.execute("DELETE FROM page WHERE page_id = ?1", [page_id])?;

    Ok(())
}

// =============================================================================
// Revisions
// =============================================================================

/// Appends a revision linking `page_id` to `text_id`.
pub fn insert_revision(
    conn: &Connection,
    page_id: PageId,
    text_id: TextId,
) -> Result<RevisionId, WikiError> {
    conn.execute(
        "INSERT INTO revision (page_id, text_id, created_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![page_id, text_id, now()],
    )?;
    Ok(RevisionId(conn.last_insert_rowid()))
}

/// # Errors
/// Returns `WikiError::NotFound` if the revision does not exist.
pub fn get_revision(conn: &Connection, rev_id: RevisionId) -> Result<Revision, WikiError> {
    conn.query_row(
        "SELECT rev_id, page_id, text_id, created_at FROM revision WHERE rev_id = ?1",
        [rev_id],
        row_to_revision,
    )
    .map_err(not_found("Revision", rev_id))
}

/// Lists a page's revisions oldest first.
pub fn list_revisions(conn: &Connection, page_id: PageId) -> Result<Vec<Revision>, WikiError> {
    let mut stmt = conn.prepare(
        "SELECT rev_id, page_id, text_id, created_at
         FROM revision
         WHERE page_id = ?1
         ORDER BY rev_id ASC",
    )?;

    let revisions = stmt
        .query_map([page_id], row_to_revision)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(revisions)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_test_db() -> Connection {
        let mut conn = Connection::open_in_memory().expect("Failed to create in-memory database");
        conn.pragma_update(None, "foreign_keys", "ON")
            .expect("Failed to enable foreign keys");
        crate::db::run_migrations(&mut conn).expect("Failed to run migrations");
        conn
    }

    /// Runs the create protocol by hand and returns (page, revision, text).
    fn seed_page(conn: &mut Connection, title: &str, content: &str) -> (PageId, RevisionId, TextId) {
        let tx = conn.transaction().unwrap();
        let text_id = insert_text(&tx, content).unwrap();
        let page_id = insert_page(&tx, title).unwrap();
        let rev_id = insert_revision(&tx, page_id, text_id).unwrap();
        set_latest_revision(&tx, page_id, rev_id).unwrap();
        tx.commit().unwrap();
        (page_id, rev_id, text_id)
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_insert_and_get_text() {
        let conn = setup_test_db();

        let text_id = insert_text(&conn, "# Hello").expect("Failed to insert text");
        let text = get_text(&conn, text_id).expect("Failed to get text");

        assert_eq!(text.text_id, text_id);
        assert_eq!(text.content, "# Hello");
        assert!(!text.created_at.is_empty());
    }

    #[test]
    fn test_get_text_not_found() {
        let conn = setup_test_db();
        assert!(matches!(get_text(&conn, TextId(99)), Err(WikiError::NotFound(_))));
    }

    #[test]
    fn test_seeded_page_points_at_its_revision() {
        let mut conn = setup_test_db();
        let (page_id, rev_id, text_id) = seed_page(&mut conn, "Intro_Guide", "# Hi");

        let page = get_page(&conn, page_id).expect("Failed to get page");
        assert_eq!(page.title, "Intro_Guide");
        assert_eq!(page.latest_rev, Some(rev_id));

        let rev = get_revision(&conn, rev_id).expect("Failed to get revision");
        assert_eq!(rev.page_id, page_id);
        assert_eq!(rev.text_id, text_id);
    }

    #[test]
    fn test_title_lookup_ignores_case() {
        let mut conn = setup_test_db();
        let (page_id, _, _) = seed_page(&mut conn, "Test", "content");

        assert_eq!(get_page_id_by_title(&conn, "test").unwrap(), page_id);
        assert_eq!(get_page_id_by_title(&conn, "TEST").unwrap(), page_id);
        assert!(matches!(
            get_page_id_by_title(&conn, "Other"),
            Err(WikiError::NotFound(_))
        ));
    }

    #[test]
    fn test_insert_page_conflict_ignores_case() {
        let conn = setup_test_db();
        insert_page(&conn, "Test").expect("first insert");

        let result = insert_page(&conn, "test");
        assert!(matches!(result, Err(WikiError::Conflict(_))));
    }

    #[test]
    fn test_set_title_conflict_and_self_rename() {
        let mut conn = setup_test_db();
        let (a, _, _) = seed_page(&mut conn, "Alpha", "a");
        seed_page(&mut conn, "Beta", "b");

        assert!(matches!(set_title(&conn, a, "BETA"), Err(WikiError::Conflict(_))));

        // Changing only the case of its own title is not a conflict.
        set_title(&conn, a, "ALPHA").expect("self rename");
        assert_eq!(get_page(&conn, a).unwrap().title, "ALPHA");
    }

    #[test]
    fn test_set_title_missing_page() {
        let conn = setup_test_db();
        assert!(matches!(
            set_title(&conn, PageId(42), "Nope"),
            Err(WikiError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_pages_ordered_by_title() {
        let mut conn = setup_test_db();
        seed_page(&mut conn, "charlie", "c");
        seed_page(&mut conn, "Alpha", "a");
        seed_page(&mut conn, "bravo", "b");

        let titles: Vec<String> = list_pages(&conn).unwrap().into_iter().map(|p| p.title).collect();
        assert_eq!(titles, vec!["Alpha", "bravo", "charlie"]);
    }

    #[test]
    fn test_list_revisions_oldest_first() {
        let mut conn = setup_test_db();
        let (page_id, first, _) = seed_page(&mut conn, "Log", "v1");

        let text_id = insert_text(&conn, "v2").unwrap();
        let second = insert_revision(&conn, page_id, text_id).unwrap();

        let revs = list_revisions(&conn, page_id).unwrap();
        let ids: Vec<RevisionId> = revs.iter().map(|r| r.rev_id).collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[test]
    fn test_get_text_for_revision() {
        let mut conn = setup_test_db();
        let (_, rev_id, _) = seed_page(&mut conn, "Page", "body");

        assert_eq!(get_text_for_revision(&conn, rev_id).unwrap().content, "body");
        assert!(matches!(
            get_text_for_revision(&conn, RevisionId(1234)),
            Err(WikiError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_page_rows_leaves_no_orphans() {
        let mut conn = setup_test_db();
        let (doomed, _, _) = seed_page(&mut conn, "Doomed", "v1");
        let text_id = insert_text(&conn, "v2").unwrap();
        let rev_id = insert_revision(&conn, doomed, text_id).unwrap();
        set_latest_revision(&conn, doomed, rev_id).unwrap();
        let (kept, _, _) = seed_page(&mut conn, "Kept", "stay");

        let tx = conn.transaction().unwrap();
        delete_page_rows(&tx, doomed).expect("delete should succeed");
        tx.commit().expect("commit should pass deferred foreign key checks");

        assert_eq!(count(&conn, "page"), 1);
        assert_eq!(count(&conn, "revision"), 1);
        assert_eq!(count(&conn, "text"), 1);
        assert!(get_page(&conn, kept).is_ok());
        assert!(matches!(get_page(&conn, doomed), Err(WikiError::NotFound(_))));
    }

    #[test]
    fn test_delete_page_rows_missing_page() {
        let conn = setup_test_db();
        assert!(matches!(
            delete_page_rows(&conn, PageId(5)),
            Err(WikiError::NotFound(_))
        ));
    }
}
