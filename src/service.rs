//! The wiki's public operations.
//!
//! [`WikiService`] wraps any [`Storage`] backend. Write paths sanitize titles
//! before they reach storage; read paths pass titles through untouched and
//! rely on the store's case-insensitive lookup. Nothing here logs or retries:
//! every failure comes back to the caller as a [`WikiError`].

use crate::db::WikiError;
use crate::deadline::Deadline;
use crate::models::{Page, PageBundle, PageId, PageUpdate, Revision, RevisionId, Text};
use crate::store::Storage;
use crate::title::sanitize_title;

pub struct WikiService<S> {
    store: S,
}

/// Sanitizes a title for storage, rejecting one with nothing left.
fn canonical_title(title: &str) -> Result<String, WikiError> {
    let sanitized = sanitize_title(title);
    if sanitized.is_empty() {
        return Err(WikiError::InvalidInput(format!(
            "Title '{}' has no letters, digits or underscores",
            title
        )));
    }
    Ok(sanitized)
}

impl<S: Storage> WikiService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Creates a page with its first revision.
    ///
    /// # Errors
    ///
    /// - `WikiError::InvalidInput` if the title sanitizes to nothing
    /// - `WikiError::Conflict` if the sanitized title is taken, ignoring case
    pub fn create_page_bundle(
        &self,
        title: &str,
        content: &str,
        deadline: Deadline,
    ) -> Result<PageId, WikiError> {
        let title = canonical_title(title)?;
        self.store.create_bundle(&title, content, deadline)
    }

    /// Renames and/or edits a page atomically. Present fields are applied;
    /// an empty `content` is still a new revision.
    ///
    /// # Errors
    ///
    /// - `WikiError::InvalidInput` if neither field is present, or the title
    ///   sanitizes to nothing
    /// - `WikiError::NotFound` if the page does not exist
    /// - `WikiError::Conflict` if another page has the new title
    pub fn update_page_bundle(
        &self,
        page_id: PageId,
        update: PageUpdate,
        deadline: Deadline,
    ) -> Result<Option<RevisionId>, WikiError> {
        if update.is_empty() {
            return Err(WikiError::InvalidInput(
                "Update must set a title, content, or both".to_string(),
            ));
        }
        let update = PageUpdate {
            title: update.title.as_deref().map(canonical_title).transpose()?,
            content: update.content,
        };
        self.store.update_bundle(page_id, &update, deadline)
    }

    /// Renames a page without touching its history.
    pub fn update_page_title(
        &self,
        page_id: PageId,
        title: &str,
        deadline: Deadline,
    ) -> Result<(), WikiError> {
        let title = canonical_title(title)?;
        self.store.update_title(page_id, &title, deadline)
    }

    /// Appends a revision and makes it current. Returns the new revision id.
    pub fn update_page_content(
        &self,
        page_id: PageId,
        content: &str,
        deadline: Deadline,
    ) -> Result<RevisionId, WikiError> {
        self.store.update_content(page_id, content, deadline)
    }

    pub fn delete_page_bundle(&self, page_id: PageId, deadline: Deadline) -> Result<(), WikiError> {
        self.store.delete_bundle(page_id, deadline)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn resolve_title_to_id(&self, title: &str, deadline: Deadline) -> Result<PageId, WikiError> {
        self.store.page_id_by_title(title, deadline)
    }

    pub fn get_page(&self, page_id: PageId, deadline: Deadline) -> Result<Page, WikiError> {
        self.store.get_page(page_id, deadline)
    }

    pub fn get_page_by_title(&self, title: &str, deadline: Deadline) -> Result<Page, WikiError> {
        let page_id = self.resolve_title_to_id(title, deadline)?;
        self.store.get_page(page_id, deadline)
    }

    /// The page, its current revision and that revision's text.
    ///
    /// # Errors
    ///
    /// `WikiError::NotFound` from whichever lookup fails first.
    pub fn get_current_bundle(&self, title: &str, deadline: Deadline) -> Result<PageBundle, WikiError> {
        let page = self.get_page_by_title(title, deadline)?;
        let rev_id = page.latest_rev.ok_or_else(|| {
            WikiError::NotFound(format!("Page '{}' has no current revision", page.title))
        })?;
        let revision = self.store.get_revision(rev_id, deadline)?;
        self.compose(page, revision, deadline)
    }

    /// The page as it was at `rev_id`.
    ///
    /// # Errors
    ///
    /// `WikiError::NotFound` if the title or revision is unknown, or the
    /// revision belongs to a different page.
    pub fn get_bundle_at_revision(
        &self,
        title: &str,
        rev_id: RevisionId,
        deadline: Deadline,
    ) -> Result<PageBundle, WikiError> {
        let page = self.get_page_by_title(title, deadline)?;
        let revision = self.store.get_revision(rev_id, deadline)?;
        if revision.page_id != page.page_id {
            return Err(WikiError::NotFound(format!(
                "Revision '{}' does not belong to page '{}'",
                rev_id, page.title
            )));
        }
        self.compose(page, revision, deadline)
    }

    /// All pages ordered by title, ignoring case.
    pub fn list_pages(&self, deadline: Deadline) -> Result<Vec<Page>, WikiError> {
        self.store.list_pages(deadline)
    }

    /// A page's history, oldest revision first.
    pub fn list_revisions(&self, title: &str, deadline: Deadline) -> Result<Vec<Revision>, WikiError> {
        let page_id = self.resolve_title_to_id(title, deadline)?;
        self.store.list_revisions(page_id, deadline)
    }

    pub fn get_raw_text(&self, rev_id: RevisionId, deadline: Deadline) -> Result<Text, WikiError> {
        self.store.text_for_revision(rev_id, deadline)
    }

    fn compose(&self, page: Page, revision: Revision, deadline: Deadline) -> Result<PageBundle, WikiError> {
        let text = self.store.get_text(revision.text_id, deadline)?;
        Ok(PageBundle { page, revision, text })
    }
}
