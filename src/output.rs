//! Output formatting for the wiki CLI.
//!
//! This module provides two output modes:
//! - **JSON**: Compact machine-readable output (default)
//! - **Pretty**: Human-readable formatted output (enabled via `--pretty` flag)
//!
//! JSON output serializes the models directly, so field names match the
//! storage schema. The pretty format shows display titles and labeled fields.

use crate::messages::Reply;
use crate::models::{Page, PageBundle, Revision, Text};
use serde::Serialize;

/// Output mode for CLI results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Compact JSON output.
    Json,
    /// Human-readable formatted output.
    Pretty,
}

/// Serialize a value to compact JSON and print to stdout.
///
/// # Panics
///
/// Panics if serialization fails, which should only happen if the type has a broken
/// `Serialize` implementation.
pub fn print_json<T: Serialize>(value: &T) {
    let json = serde_json::to_string(value).expect("failed to serialize to JSON");
    println!("{}", json);
}

/// Print page metadata.
///
/// Format:
/// ```text
/// Title:   Intro Guide (Intro_Guide)
/// ID:      3
/// Current: rev 7
/// Created: 2024-01-15T10:30:00+00:00
/// ```
pub fn print_pretty_page(page: &Page) {
    println!("Title:   {} ({})", page.display_title(), page.title);
    println!("ID:      {}", page.page_id);
    match page.latest_rev {
        Some(rev) => println!("Current: rev {}", rev),
        None => println!("Current: (none)"),
    }
    println!("Created: {}", page.created_at);
}

/// Print a list of pages, one per line: `<id> | <title> | rev <latest>`.
pub fn print_pretty_pages(pages: &[Page]) {
    if pages.is_empty() {
        println!("(no pages)");
        return;
    }

    for page in pages {
        let latest = page
            .latest_rev
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{} | {} | rev {}", page.page_id, page.display_title(), latest);
    }
}

/// Print a bundle: page metadata, which revision is shown, then the raw
/// content.
pub fn print_pretty_bundle(bundle: &PageBundle) {
    print_pretty_page(&bundle.page);
    let marker = if bundle.page.latest_rev == Some(bundle.revision.rev_id) {
        " (current)"
    } else {
        ""
    };
    println!("Showing: rev {}{} from {}", bundle.revision.rev_id, marker, bundle.revision.created_at);
    println!();
    println!("{}", bundle.text.content);
}

/// Print revision history, one per line: `rev <id> | text <id> | <created_at>`.
pub fn print_pretty_revisions(revisions: &[Revision]) {
    if revisions.is_empty() {
        println!("(no revisions)");
        return;
    }

    for rev in revisions {
        println!("rev {} | text {} | {}", rev.rev_id, rev.text_id, rev.created_at);
    }
}

/// Print only the text's content, unadorned.
pub fn print_pretty_text(text: &Text) {
    println!("{}", text.content);
}

/// Print the ids a write produced, or `ok` when there are none.
pub fn print_pretty_reply(reply: &Reply) {
    match (reply.page_id, reply.rev_id) {
        (Some(page), Some(rev)) => println!("ok: page {} at rev {}", page, rev),
        (Some(page), None) => println!("ok: page {}", page),
        (None, Some(rev)) => println!("ok: rev {}", rev),
        (None, None) => println!("ok"),
    }
}

/// Chooses between JSON serialization and a custom pretty-print function.
///
/// ```ignore
/// print(mode, &page, || print_pretty_page(&page));
/// ```
pub fn print<T: Serialize>(mode: OutputMode, value: &T, pretty_fn: impl FnOnce()) {
    match mode {
        OutputMode::Json => print_json(value),
        OutputMode::Pretty => pretty_fn(),
    }
}
