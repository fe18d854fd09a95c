//! Core data structures for the wiki.
//!
//! These structs are the shared language between the repository layer (SQL),
//! the service layer, and the output layer (serde_json). They are plain data:
//! a page, the append-only revisions that point at it, and the immutable
//! texts those revisions carry.

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.0))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                i64::column_result(value).map(Self)
            }
        }
    };
}

row_id!(
    /// Primary key of a page.
    PageId
);
row_id!(
    /// Primary key of a revision.
    RevisionId
);
row_id!(
    /// Primary key of a text blob.
    TextId
);

/// A wiki page. The title is stored in sanitized form and is unique without
/// regard to case. `latest_rev` names the current revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub page_id: PageId,
    pub title: String,
    pub latest_rev: Option<RevisionId>,
    pub created_at: String,
}

impl Page {
    /// The title as shown to readers: underscores become spaces.
    pub fn display_title(&self) -> String {
        self.title.replace('_', " ")
    }
}

/// One point in a page's history. Never updated after insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Revision {
    pub rev_id: RevisionId,
    pub page_id: PageId,
    pub text_id: TextId,
    pub created_at: String,
}

/// Content of one revision. Never updated after insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Text {
    pub text_id: TextId,
    pub content: String,
    pub created_at: String,
}

/// A page together with one of its revisions and that revision's text.
/// Composed on read, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageBundle {
    pub page: Page,
    pub revision: Revision,
    pub text: Text,
}

/// Partial update of a page. Absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl PageUpdate {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            content: None,
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self {
            title: None,
            content: Some(content.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_title_replaces_underscores() {
        let page = Page {
            page_id: PageId(1),
            title: "Intro_Guide".to_string(),
            latest_rev: Some(RevisionId(1)),
            created_at: "2024-01-15T10:00:00Z".to_string(),
        };
        assert_eq!(page.display_title(), "Intro Guide");
    }

    #[test]
    fn ids_serialize_as_plain_numbers() {
        let rev = Revision {
            rev_id: RevisionId(7),
            page_id: PageId(3),
            text_id: TextId(9),
            created_at: "2024-01-15T10:00:00Z".to_string(),
        };
        let json = serde_json::to_value(&rev).unwrap();
        assert_eq!(json["rev_id"], 7);
        assert_eq!(json["page_id"], 3);
        assert_eq!(json["text_id"], 9);
    }

    #[test]
    fn ids_parse_from_strings() {
        assert_eq!("42".parse::<PageId>().unwrap(), PageId(42));
        assert!("abc".parse::<RevisionId>().is_err());
        assert_eq!(TextId(5).to_string(), "5");
    }

    #[test]
    fn page_update_constructors() {
        assert!(PageUpdate::default().is_empty());
        assert_eq!(PageUpdate::title("A").title.as_deref(), Some("A"));
        assert!(PageUpdate::title("A").content.is_none());
        assert_eq!(PageUpdate::content("").content.as_deref(), Some(""));
    }
}
