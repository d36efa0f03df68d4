// Document Aggregate (read side)

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::error::DomainError;
use crate::domain::job::DocumentNumber;

/// Visibility of a document on the portal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PortalPublicationStatus {
    #[default]
    Unpublished,
    Published,
    Withdrawn,
}

impl PortalPublicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortalPublicationStatus::Unpublished => "UNPUBLISHED",
            PortalPublicationStatus::Published => "PUBLISHED",
            PortalPublicationStatus::Withdrawn => "WITHDRAWN",
        }
    }
}

impl std::fmt::Display for PortalPublicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PortalPublicationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNPUBLISHED" => Ok(PortalPublicationStatus::Unpublished),
            "PUBLISHED" => Ok(PortalPublicationStatus::Published),
            "WITHDRAWN" => Ok(PortalPublicationStatus::Withdrawn),
            other => Err(DomainError::UnknownPublicationStatus(other.to_string())),
        }
    }
}

/// Court and metadata of the decision
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreData {
    pub court: Option<String>,
    pub file_numbers: Vec<String>,
    pub decision_date: Option<chrono::NaiveDate>,
    pub document_type: Option<String>,
    pub ecli: Option<String>,
}

/// Text sections of the decision
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Texts {
    pub headnote: Option<String>,
    pub guiding_principle: Option<String>,
    pub tenor: Option<String>,
    pub grounds: Option<String>,
    pub case_facts: Option<String>,
    pub decision_reasons: Option<String>,
}

/// Binary attachment published next to the XML rendition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Object filename, used verbatim in the object key
    pub filename: String,
    pub content: Vec<u8>,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }
}

/// Current publishable state of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentAggregate {
    pub document_number: DocumentNumber,
    pub core_data: CoreData,
    pub texts: Texts,
    pub attachments: Vec<Attachment>,
    pub portal_publication_status: PortalPublicationStatus,
}

impl DocumentAggregate {
    pub fn new(document_number: impl Into<String>) -> Self {
        Self {
            document_number: document_number.into(),
            core_data: CoreData::default(),
            texts: Texts::default(),
            attachments: Vec::new(),
            portal_publication_status: PortalPublicationStatus::Unpublished,
        }
    }
}
