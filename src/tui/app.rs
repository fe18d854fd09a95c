use crate::db::WikiError;
use crate::deadline::Deadline;
use crate::models::{Page, Revision};
use crate::service::WikiService;
use crate::store::Storage;
use std::time::Duration;

/// Which pane has focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    List,
    Content,
}

/// Input mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Filter,
}

/// What the left pane is currently showing.
#[derive(Debug, Clone)]
pub enum NavState {
    PageList,
    RevisionList {
        page: Page,
    },
    FilteredPages {
        query: String,
        /// The state to return to when pressing Esc.
        previous: Box<NavState>,
    },
}

/// Display item in the left pane list.
#[derive(Debug, Clone)]
pub enum ListItem {
    Page(Page),
    Revision { revision: Revision, current: bool },
}

impl ListItem {
    pub fn display_text(&self) -> String {
        match self {
            ListItem::Page(page) => page.display_title(),
            ListItem::Revision { revision, current } => {
                let marker = if *current { "*" } else { " " };
                format!("{} rev {} ({})", marker, revision.rev_id, revision.created_at)
            }
        }
    }
}

/// The main application state for the TUI browser.
pub struct App {
    pub running: bool,
    pub focus: Focus,
    pub mode: Mode,
    pub nav_state: NavState,
    pub items: Vec<ListItem>,
    pub cursor: usize,
    pub content_scroll: u16,
    pub filter_input: String,
    /// Cached right-pane content lines for scrolling.
    pub content_lines: Vec<String>,
    /// Per-query timeout; `None` means queries never time out.
    pub query_timeout: Option<Duration>,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self {
            running: true,
            focus: Focus::List,
            mode: Mode::Normal,
            nav_state: NavState::PageList,
            items: Vec::new(),
            cursor: 0,
            content_scroll: 0,
            filter_input: String::new(),
            content_lines: Vec::new(),
            query_timeout: None,
        }
    }

    fn deadline(&self) -> Deadline {
        match self.query_timeout {
            Some(timeout) => Deadline::after(timeout),
            None => Deadline::none(),
        }
    }

    /// Load the initial data (page list).
    pub fn load_initial<S: Storage>(&mut self, wiki: &WikiService<S>) -> Result<(), WikiError> {
        self.nav_state = NavState::PageList;
        self.load_items(wiki)
    }

    /// Refresh items, preserving cursor and scroll position.
    /// Used for periodic auto-refresh to pick up external changes.
    pub fn refresh<S: Storage>(&mut self, wiki: &WikiService<S>) -> Result<(), WikiError> {
        let prev_scroll = self.content_scroll;
        self.load_items(wiki)?;
        self.content_scroll = prev_scroll.min(self.content_lines.len().saturating_sub(1) as u16);
        Ok(())
    }

    /// Reload items for the current nav state.
    pub fn load_items<S: Storage>(&mut self, wiki: &WikiService<S>) -> Result<(), WikiError> {
        let deadline = self.deadline();
        self.items = match &self.nav_state {
            NavState::PageList => wiki
                .list_pages(deadline)?
                .into_iter()
                .map(ListItem::Page)
                .collect(),
            NavState::RevisionList { page } => match wiki.get_page(page.page_id, deadline) {
                Ok(page) => {
                    let revisions = wiki.list_revisions(&page.title, deadline)?;
                    let items = revisions
                        .into_iter()
                        .rev()
                        .map(|revision| ListItem::Revision {
                            current: page.latest_rev == Some(revision.rev_id),
                            revision,
                        })
                        .collect();
                    self.nav_state = NavState::RevisionList { page };
                    items
                }
                Err(WikiError::NotFound(_)) => {
                    tracing::debug!(page_id = %page.page_id, "page vanished, returning to page list");
                    self.nav_state = NavState::PageList;
                    self.cursor = 0;
                    return self.load_items(wiki);
                }
                Err(e) => return Err(e),
            },
            NavState::FilteredPages { query, .. } => {
                let needle = query.to_lowercase();
                wiki.list_pages(deadline)?
                    .into_iter()
                    .filter(|p| p.title.to_lowercase().contains(&needle))
                    .map(ListItem::Page)
                    .collect()
            }
        };

        // Clamp cursor
        if self.items.is_empty() {
            self.cursor = 0;
        } else if self.cursor >= self.items.len() {
            self.cursor = self.items.len() - 1;
        }

        self.content_scroll = 0;
        self.update_content(wiki)?;
        Ok(())
    }

    /// Update the right pane content based on the currently selected item.
    pub fn update_content<S: Storage>(&mut self, wiki: &WikiService<S>) -> Result<(), WikiError> {
        self.content_lines.clear();
        self.content_scroll = 0;

        if self.items.is_empty() {
            self.content_lines.push("(empty)".to_string());
            return Ok(());
        }

        let deadline = self.deadline();
        let bundle = match &self.items[self.cursor] {
            ListItem::Page(page) => wiki.get_current_bundle(&page.title, deadline),
            ListItem::Revision { revision, .. } => match &self.nav_state {
                NavState::RevisionList { page } => {
                    wiki.get_bundle_at_revision(&page.title, revision.rev_id, deadline)
                }
                _ => return Ok(()),
            },
        };

        let bundle = match bundle {
            Ok(bundle) => bundle,
            // Deleted or renamed underneath us; the next refresh catches up.
            Err(WikiError::NotFound(msg)) => {
                self.content_lines.push(format!("(gone: {})", msg));
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        self.content_lines.push(format!("Title:    {}", bundle.page.display_title()));
        self.content_lines.push(format!("Page ID:  {}", bundle.page.page_id));
        self.content_lines.push(format!("Revision: {}", bundle.revision.rev_id));
        self.content_lines.push(format!("Saved:    {}", bundle.revision.created_at));
        self.content_lines.push(String::new());
        for line in bundle.text.content.lines() {
            self.content_lines.push(line.to_string());
        }
        Ok(())
    }

    // === Navigation ===

    /// Move the cursor by `delta` rows, clamped to the list, and show the
    /// newly selected item.
    pub fn move_cursor<S: Storage>(
        &mut self,
        delta: isize,
        wiki: &WikiService<S>,
    ) -> Result<(), WikiError> {
        let last = self.items.len().saturating_sub(1);
        let target = self.cursor.saturating_add_signed(delta).min(last);
        if target == self.cursor {
            return Ok(());
        }
        self.cursor = target;
        self.update_content(wiki)
    }

    /// In a history view, select the revision the page currently points at.
    pub fn jump_to_current<S: Storage>(&mut self, wiki: &WikiService<S>) -> Result<(), WikiError> {
        let current = self
            .items
            .iter()
            .position(|item| matches!(item, ListItem::Revision { current: true, .. }));
        match current {
            Some(idx) if idx != self.cursor => {
                self.cursor = idx;
                self.update_content(wiki)
            }
            _ => Ok(()),
        }
    }

    /// Switch from one page's history to its neighbour's in title order.
    /// Stepping past either end leaves the view unchanged.
    pub fn step_page<S: Storage>(
        &mut self,
        delta: isize,
        wiki: &WikiService<S>,
    ) -> Result<(), WikiError> {
        let current = match &self.nav_state {
            NavState::RevisionList { page } => page.page_id,
            _ => return Ok(()),
        };
        let pages = wiki.list_pages(self.deadline())?;
        let Some(pos) = pages.iter().position(|p| p.page_id == current) else {
            // Deleted since the history was opened.
            return self.load_items(wiki);
        };
        let Some(target) = pos.checked_add_signed(delta) else {
            return Ok(());
        };
        let Some(next) = pages.into_iter().nth(target) else {
            return Ok(());
        };

        tracing::debug!(title = %next.title, "stepping to neighbouring history");
        self.nav_state = NavState::RevisionList { page: next };
        self.cursor = 0;
        self.focus = Focus::List;
        self.load_items(wiki)
    }

    pub fn scroll_content_down(&mut self) {
        self.content_scroll = self.content_scroll.saturating_add(1);
    }

    pub fn scroll_content_up(&mut self) {
        self.content_scroll = self.content_scroll.saturating_sub(1);
    }

    pub fn scroll_content_to_top(&mut self) {
        self.content_scroll = 0;
    }

    pub fn scroll_content_to_bottom(&mut self, visible_height: u16) {
        let total = self.content_lines.len() as u16;
        if total > visible_height {
            self.content_scroll = total - visible_height;
        }
    }

    /// Select the current item (Enter key). Returns true if navigation changed.
    pub fn select<S: Storage>(&mut self, wiki: &WikiService<S>) -> Result<bool, WikiError> {
        if self.items.is_empty() {
            return Ok(false);
        }

        match self.items[self.cursor].clone() {
            ListItem::Page(page) => {
                tracing::debug!(title = %page.title, "opening revision history");
                self.nav_state = NavState::RevisionList { page };
                self.cursor = 0;
                self.load_items(wiki)?;
                Ok(true)
            }
            ListItem::Revision { .. } => {
                self.focus = Focus::Content;
                Ok(true)
            }
        }
    }

    /// Go back one level (Esc key in list focus).
    pub fn go_back<S: Storage>(&mut self, wiki: &WikiService<S>) -> Result<(), WikiError> {
        match &self.nav_state {
            NavState::PageList => {
                self.running = false;
            }
            NavState::RevisionList { page } => {
                let page_id = page.page_id;
                self.nav_state = NavState::PageList;
                self.cursor = 0;
                self.load_items(wiki)?;
                let origin = self
                    .items
                    .iter()
                    .position(|item| matches!(item, ListItem::Page(p) if p.page_id == page_id));
                if let Some(idx) = origin {
                    self.cursor = idx;
                    self.update_content(wiki)?;
                }
            }
            NavState::FilteredPages { previous, .. } => {
                self.nav_state = *previous.clone();
                self.cursor = 0;
                self.load_items(wiki)?;
            }
        }
        Ok(())
    }

    pub fn enter_filter(&mut self) {
        self.mode = Mode::Filter;
        self.filter_input.clear();
    }

    /// Narrow the page list to titles containing the typed text.
    pub fn submit_filter<S: Storage>(&mut self, wiki: &WikiService<S>) -> Result<(), WikiError> {
        self.mode = Mode::Normal;
        if self.filter_input.is_empty() {
            return Ok(());
        }
        let query = self.filter_input.clone();
        let previous = Box::new(self.nav_state.clone());
        self.nav_state = NavState::FilteredPages { query, previous };
        self.cursor = 0;
        self.focus = Focus::List;
        self.load_items(wiki)
    }

    pub fn cancel_filter(&mut self) {
        self.mode = Mode::Normal;
        self.filter_input.clear();
    }

    /// Returns the title for the left pane based on current nav state.
    pub fn left_pane_title(&self) -> String {
        match &self.nav_state {
            NavState::PageList => "Pages".to_string(),
            NavState::RevisionList { page } => format!("{} / History", page.display_title()),
            NavState::FilteredPages { query, .. } => format!("Filter: {}", query),
        }
    }

    /// Returns the status line hint text.
    pub fn status_hint(&self) -> &'static str {
        match self.mode {
            Mode::Filter => "Type part of a title, Enter:apply, Esc:cancel",
            Mode::Normal => match self.focus {
                Focus::Content => "j/k:scroll  g/G:top/bottom  Esc:list  q:quit",
                Focus::List => match self.nav_state {
                    NavState::RevisionList { .. } => {
                        "j/k:revisions  Enter:read  c:current  n/p:next/prev page  Esc:pages  q:quit"
                    }
                    _ => "j/k:nav  Enter:history  Tab:read  /:filter  q:quit",
                },
            },
        }
    }
}
