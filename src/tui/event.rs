use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::db::WikiError;
use crate::service::WikiService;
use crate::store::Storage;

use super::app::{App, Focus, Mode, NavState};

/// What the browser does in response to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Down,
    Up,
    Top,
    Bottom,
    /// Page: open its history. Revision: read it in the content pane.
    Open,
    Back,
    ToggleFocus,
    /// Put the cursor on the page's current revision.
    CurrentRevision,
    /// Show the history of the next (+1) or previous (-1) page in title order.
    StepPage(i8),
    StartFilter,
    FilterKey(char),
    FilterBackspace,
    ApplyFilter,
    CancelFilter,
    None,
}

/// Map a key to an action. History views get revision keys on top of the
/// shared navigation keys.
pub fn map_key(app: &App, key: KeyEvent) -> Action {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Action::Quit;
    }

    if app.mode == Mode::Filter {
        return match key.code {
            KeyCode::Enter => Action::ApplyFilter,
            KeyCode::Esc => Action::CancelFilter,
            KeyCode::Backspace => Action::FilterBackspace,
            KeyCode::Char(c) => Action::FilterKey(c),
            _ => Action::None,
        };
    }

    let in_history = matches!(app.nav_state, NavState::RevisionList { .. });
    match key.code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Char('j') | KeyCode::Down => Action::Down,
        KeyCode::Char('k') | KeyCode::Up => Action::Up,
        KeyCode::Char('g') | KeyCode::Home => Action::Top,
        KeyCode::Char('G') | KeyCode::End => Action::Bottom,
        KeyCode::Tab => Action::ToggleFocus,
        KeyCode::Char('/') => Action::StartFilter,
        KeyCode::Esc | KeyCode::Char('h') | KeyCode::Left => Action::Back,
        KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right => Action::Open,
        KeyCode::Char('c') if in_history => Action::CurrentRevision,
        KeyCode::Char('n') if in_history => Action::StepPage(1),
        KeyCode::Char('p') if in_history => Action::StepPage(-1),
        _ => Action::None,
    }
}

/// Apply an action to the app state, querying the wiki where needed.
/// `content_height` is the number of visible content rows.
pub fn apply_action<S: Storage>(
    app: &mut App,
    action: Action,
    wiki: &WikiService<S>,
    content_height: u16,
) -> Result<(), WikiError> {
    let reading = app.focus == Focus::Content;
    match action {
        Action::Quit => app.running = false,
        Action::Down if reading => app.scroll_content_down(),
        Action::Up if reading => app.scroll_content_up(),
        Action::Top if reading => app.scroll_content_to_top(),
        Action::Bottom if reading => app.scroll_content_to_bottom(content_height),
        Action::Down => app.move_cursor(1, wiki)?,
        Action::Up => app.move_cursor(-1, wiki)?,
        Action::Top => app.move_cursor(isize::MIN, wiki)?,
        Action::Bottom => app.move_cursor(isize::MAX, wiki)?,
        Action::Open => {
            app.select(wiki)?;
        }
        Action::Back if reading => app.focus = Focus::List,
        Action::Back => app.go_back(wiki)?,
        Action::ToggleFocus => {
            app.focus = match app.focus {
                Focus::Content => Focus::List,
                Focus::List if app.items.is_empty() => Focus::List,
                Focus::List => Focus::Content,
            }
        }
        Action::CurrentRevision => app.jump_to_current(wiki)?,
        Action::StepPage(delta) => app.step_page(delta.into(), wiki)?,
        Action::StartFilter => app.enter_filter(),
        Action::FilterKey(c) => app.filter_input.push(c),
        Action::FilterBackspace => {
            app.filter_input.pop();
        }
        Action::ApplyFilter => app.submit_filter(wiki)?,
        Action::CancelFilter => app.cancel_filter(),
        Action::None => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deadline::Deadline;
    use crate::models::PageId;
    use crate::pool::PoolConfig;
    use crate::store::SqliteStore;
    use crate::tui::app::ListItem;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn setup_wiki(dir: &tempfile::TempDir) -> WikiService<SqliteStore> {
        let store = SqliteStore::open(&dir.path().join("event.db"), PoolConfig::default())
            .expect("store should open");
        WikiService::new(store)
    }

    /// Three pages; "Beta" has three revisions.
    fn seeded(wiki: &WikiService<SqliteStore>) -> PageId {
        let none = Deadline::none();
        wiki.create_page_bundle("Alpha", "a1", none).unwrap();
        let beta = wiki.create_page_bundle("Beta", "b1", none).unwrap();
        wiki.update_page_content(beta, "b2", none).unwrap();
        wiki.update_page_content(beta, "b3", none).unwrap();
        wiki.create_page_bundle("Gamma", "g1", none).unwrap();
        beta
    }

    fn press(app: &mut App, wiki: &WikiService<SqliteStore>, code: KeyCode) {
        let action = map_key(app, key(code));
        apply_action(app, action, wiki, 10).unwrap();
    }

    fn history_title(app: &App) -> Option<&str> {
        match &app.nav_state {
            NavState::RevisionList { page } => Some(page.title.as_str()),
            _ => None,
        }
    }

    #[test]
    fn test_ctrl_c_quits_in_every_mode() {
        let mut app = App::new();
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(map_key(&app, ctrl_c), Action::Quit);
        app.mode = Mode::Filter;
        assert_eq!(map_key(&app, ctrl_c), Action::Quit);
    }

    #[test]
    fn test_revision_keys_only_in_history() {
        let dir = tempfile::tempdir().unwrap();
        let wiki = setup_wiki(&dir);
        seeded(&wiki);

        let mut app = App::new();
        app.load_initial(&wiki).unwrap();
        assert_eq!(map_key(&app, key(KeyCode::Char('c'))), Action::None);
        assert_eq!(map_key(&app, key(KeyCode::Char('n'))), Action::None);

        app.select(&wiki).unwrap();
        assert_eq!(map_key(&app, key(KeyCode::Char('c'))), Action::CurrentRevision);
        assert_eq!(map_key(&app, key(KeyCode::Char('n'))), Action::StepPage(1));
        assert_eq!(map_key(&app, key(KeyCode::Char('p'))), Action::StepPage(-1));
    }

    #[test]
    fn test_filter_mode_captures_letters() {
        let mut app = App::new();
        app.mode = Mode::Filter;
        assert_eq!(map_key(&app, key(KeyCode::Char('q'))), Action::FilterKey('q'));
        assert_eq!(map_key(&app, key(KeyCode::Enter)), Action::ApplyFilter);
        assert_eq!(map_key(&app, key(KeyCode::Esc)), Action::CancelFilter);
        assert_eq!(map_key(&app, key(KeyCode::F(1))), Action::None);
    }

    #[test]
    fn test_browse_history_and_return_to_current() {
        let dir = tempfile::tempdir().unwrap();
        let wiki = setup_wiki(&dir);
        seeded(&wiki);

        let mut app = App::new();
        app.load_initial(&wiki).unwrap();
        press(&mut app, &wiki, KeyCode::Char('j'));
        press(&mut app, &wiki, KeyCode::Enter);
        assert_eq!(history_title(&app), Some("Beta"));
        assert!(app.content_lines.contains(&"b3".to_string()));

        press(&mut app, &wiki, KeyCode::Char('G'));
        assert!(app.content_lines.contains(&"b1".to_string()));
        assert!(matches!(app.items[app.cursor], ListItem::Revision { current: false, .. }));

        press(&mut app, &wiki, KeyCode::Char('c'));
        assert_eq!(app.cursor, 0);
        assert!(matches!(app.items[app.cursor], ListItem::Revision { current: true, .. }));
        assert!(app.content_lines.contains(&"b3".to_string()));
    }

    #[test]
    fn test_step_between_page_histories() {
        let dir = tempfile::tempdir().unwrap();
        let wiki = setup_wiki(&dir);
        seeded(&wiki);

        let mut app = App::new();
        app.load_initial(&wiki).unwrap();
        press(&mut app, &wiki, KeyCode::Enter);
        assert_eq!(history_title(&app), Some("Alpha"));

        press(&mut app, &wiki, KeyCode::Char('n'));
        assert_eq!(history_title(&app), Some("Beta"));
        assert_eq!(app.items.len(), 3);

        press(&mut app, &wiki, KeyCode::Char('n'));
        press(&mut app, &wiki, KeyCode::Char('n'));
        assert_eq!(history_title(&app), Some("Gamma"));

        press(&mut app, &wiki, KeyCode::Char('p'));
        assert_eq!(history_title(&app), Some("Beta"));

        press(&mut app, &wiki, KeyCode::Esc);
        assert!(matches!(app.nav_state, NavState::PageList));
        assert_eq!(app.cursor, 1);
    }

    #[test]
    fn test_reading_pane_scrolls_and_esc_returns_to_list() {
        let dir = tempfile::tempdir().unwrap();
        let wiki = setup_wiki(&dir);
        let body: String = (0..50).map(|i| format!("line {}\n", i)).collect();
        wiki.create_page_bundle("Long", &body, Deadline::none()).unwrap();

        let mut app = App::new();
        app.load_initial(&wiki).unwrap();
        press(&mut app, &wiki, KeyCode::Enter);
        press(&mut app, &wiki, KeyCode::Enter);
        assert_eq!(app.focus, Focus::Content);

        press(&mut app, &wiki, KeyCode::Char('j'));
        assert_eq!(app.content_scroll, 1);
        press(&mut app, &wiki, KeyCode::Char('G'));
        assert_eq!(app.content_scroll, app.content_lines.len() as u16 - 10);
        press(&mut app, &wiki, KeyCode::Char('g'));
        assert_eq!(app.content_scroll, 0);

        press(&mut app, &wiki, KeyCode::Esc);
        assert_eq!(app.focus, Focus::List);
        assert!(matches!(app.nav_state, NavState::RevisionList { .. }));
    }

    #[test]
    fn test_tab_needs_something_to_read() {
        let dir = tempfile::tempdir().unwrap();
        let wiki = setup_wiki(&dir);

        let mut app = App::new();
        app.load_initial(&wiki).unwrap();
        press(&mut app, &wiki, KeyCode::Tab);
        assert_eq!(app.focus, Focus::List);

        wiki.create_page_bundle("Some Page", "body", Deadline::none()).unwrap();
        app.refresh(&wiki).unwrap();
        press(&mut app, &wiki, KeyCode::Tab);
        assert_eq!(app.focus, Focus::Content);
        press(&mut app, &wiki, KeyCode::Tab);
        assert_eq!(app.focus, Focus::List);
    }

    #[test]
    fn test_filter_typing() {
        let dir = tempfile::tempdir().unwrap();
        let wiki = setup_wiki(&dir);
        seeded(&wiki);

        let mut app = App::new();
        app.load_initial(&wiki).unwrap();
        for code in [KeyCode::Char('/'), KeyCode::Char('g'), KeyCode::Char('x')] {
            press(&mut app, &wiki, code);
        }
        press(&mut app, &wiki, KeyCode::Backspace);
        assert_eq!(app.filter_input, "g");
        press(&mut app, &wiki, KeyCode::Enter);

        assert_eq!(app.mode, Mode::Normal);
        assert_eq!(app.items.len(), 1);
        assert_eq!(app.items[0].display_text(), "Gamma");
    }
}
