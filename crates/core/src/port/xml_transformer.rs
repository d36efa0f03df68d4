// XML Transformer Port
// Pure function: aggregate -> validated XML rendition

use crate::domain::DocumentAggregate;
use thiserror::Error;

/// Rejected aggregate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("XML validation failed: {reason}")]
pub struct ValidationError {
    pub reason: String,
}

impl ValidationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Validated XML content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlContent(String);

impl XmlContent {
    pub fn new(xml: impl Into<String>) -> Self {
        Self(xml.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0.into_bytes()
    }
}

pub trait XmlTransformer: Send + Sync {
    /// Render the aggregate
    ///
    /// # Errors
    /// - `ValidationError` if mandatory fields are missing or the output is
    ///   not well-formed
    fn transform(&self, aggregate: &DocumentAggregate) -> Result<XmlContent, ValidationError>;
}
