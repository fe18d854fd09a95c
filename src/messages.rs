//! JSON request payloads accepted by `revwiki submit`.
//!
//! Each payload names the page by id and carries the title and/or content
//! to write. [`Request::apply`] runs the matching service operation and
//! returns a [`Reply`] describing the ids it produced.

use crate::db::WikiError;
use crate::deadline::Deadline;
use crate::models::{PageId, PageUpdate, RevisionId};
use crate::service::WikiService;
use crate::store::Storage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBundleRequest {
    pub page_title: String,
    #[serde(default)]
    pub text_content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePageTitleRequest {
    pub page_id: PageId,
    pub page_title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePageContentRequest {
    pub page_id: PageId,
    #[serde(default)]
    pub text_content: String,
}

/// Either field may be omitted; an omitted field is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateBundleRequest {
    pub page_id: PageId,
    #[serde(default)]
    pub page_title: Option<String>,
    #[serde(default)]
    pub text_content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletePageRequest {
    pub page_id: PageId,
}

/// Which payload a submission carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RequestKind {
    NewBundle,
    UpdateTitle,
    UpdateContent,
    UpdateBundle,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    NewBundle(NewBundleRequest),
    UpdateTitle(UpdatePageTitleRequest),
    UpdateContent(UpdatePageContentRequest),
    UpdateBundle(UpdateBundleRequest),
    Delete(DeletePageRequest),
}

/// Ids produced by an applied request. Absent ids are omitted from JSON, so
/// a delete or rename replies with `{}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reply {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_id: Option<PageId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rev_id: Option<RevisionId>,
}

impl Request {
    /// Decodes `json` as the payload for `kind`.
    ///
    /// # Errors
    ///
    /// Returns `WikiError::InvalidInput` if the JSON is malformed or does not
    /// match the payload's shape.
    pub fn parse(kind: RequestKind, json: &str) -> Result<Self, WikiError> {
        fn decode<T: serde::de::DeserializeOwned>(json: &str) -> Result<T, WikiError> {
            serde_json::from_str(json)
                .map_err(|e| WikiError::InvalidInput(format!("Malformed request: {}", e)))
        }

        Ok(match kind {
            RequestKind::NewBundle => Self::NewBundle(decode(json)?),
            RequestKind::UpdateTitle => Self::UpdateTitle(decode(json)?),
            RequestKind::UpdateContent => Self::UpdateContent(decode(json)?),
            RequestKind::UpdateBundle => Self::UpdateBundle(decode(json)?),
            RequestKind::Delete => Self::Delete(decode(json)?),
        })
    }

    pub fn apply<S: Storage>(
        self,
        wiki: &WikiService<S>,
        deadline: Deadline,
    ) -> Result<Reply, WikiError> {
        match self {
            Self::NewBundle(req) => {
                let page_id = wiki.create_page_bundle(&req.page_title, &req.text_content, deadline)?;
                Ok(Reply {
                    page_id: Some(page_id),
                    rev_id: None,
                })
            }
            Self::UpdateTitle(req) => {
                wiki.update_page_title(req.page_id, &req.page_title, deadline)?;
                Ok(Reply::default())
            }
            Self::UpdateContent(req) => {
                let rev_id = wiki.update_page_content(req.page_id, &req.text_content, deadline)?;
                Ok(Reply {
                    page_id: Some(req.page_id),
                    rev_id: Some(rev_id),
                })
            }
            Self::UpdateBundle(req) => {
                let update = PageUpdate {
                    title: req.page_title,
                    content: req.text_content,
                };
                let rev_id = wiki.update_page_bundle(req.page_id, update, deadline)?;
                Ok(Reply {
                    page_id: Some(req.page_id),
                    rev_id,
                })
            }
            Self::Delete(req) => {
                wiki.delete_page_bundle(req.page_id, deadline)?;
                Ok(Reply::default())
            }
        }
    }
}
