// Publication Job Domain Model

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::error::{DomainError, Result};
use crate::domain::object::CHANGELOG_DIR;

/// Job ID (UUID v4)
pub type JobId = String;

/// Stable external identifier of a document, used as the object-store prefix
pub type DocumentNumber = String;

/// Maximum accepted document number length
pub const MAX_DOCUMENT_NUMBER_LEN: usize = 128;

/// What a job wants the portal to show for its document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublicationJobType {
    Publish,
    Delete,
}

impl PublicationJobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublicationJobType::Publish => "PUBLISH",
            PublicationJobType::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for PublicationJobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PublicationJobType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PUBLISH" => Ok(PublicationJobType::Publish),
            "DELETE" => Ok(PublicationJobType::Delete),
            other => Err(DomainError::UnknownJobType(other.to_string())),
        }
    }
}

/// Job status
///
/// `Pending -> Succeeded | Failed`, terminal once left. A retryable failure is
/// still terminal: a retry is a new job, never this one flipped back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    #[serde(rename = "SUCCESS")]
    Succeeded,
    #[serde(rename = "ERROR")]
    Failed { retryable: bool, reason: String },
}

impl JobStatus {
    /// Persisted status column value
    pub fn code(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Succeeded => "SUCCESS",
            JobStatus::Failed { .. } => "ERROR",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Pending)
    }

    /// Rebuild from the persisted columns
    pub fn from_columns(code: &str, retryable: bool, reason: Option<String>) -> Result<Self> {
        match code {
            "PENDING" => Ok(JobStatus::Pending),
            "SUCCESS" => Ok(JobStatus::Succeeded),
            "ERROR" => Ok(JobStatus::Failed {
                retryable,
                reason: reason.unwrap_or_default(),
            }),
            other => Err(DomainError::UnknownJobStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Publication Job Entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationJob {
    pub id: JobId,
    pub document_number: DocumentNumber,
    pub job_type: PublicationJobType,
    #[serde(flatten)]
    pub status: JobStatus,

    pub created_at: i64, // epoch ms
    pub finished_at: Option<i64>,

    /// 1-based; a retry carries the attempt of the job it replaces plus one
    pub attempt: i32,
}

impl PublicationJob {
    /// Create a new PENDING job
    ///
    /// # Arguments
    ///
    /// * `id` - Unique job ID (injected, not generated)
    /// * `created_at` - Creation timestamp in epoch ms (injected, not system time)
    /// * `document_number` - Target document
    /// * `job_type` - PUBLISH or DELETE
    pub fn new(
        id: impl Into<String>,
        created_at: i64,
        document_number: impl Into<String>,
        job_type: PublicationJobType,
    ) -> Self {
        Self {
            id: id.into(),
            document_number: document_number.into(),
            job_type,
            status: JobStatus::Pending,
            created_at,
            finished_at: None,
            attempt: 1,
        }
    }

    /// Create a follow-up job replacing a retryable failure
    pub fn retry_of(previous: &PublicationJob, id: impl Into<String>, created_at: i64) -> Self {
        let mut job = Self::new(
            id,
            created_at,
            previous.document_number.clone(),
            previous.job_type,
        );
        job.attempt = previous.attempt + 1;
        job
    }

    pub fn is_pending(&self) -> bool {
        self.status == JobStatus::Pending
    }

    /// Transition to Succeeded with explicit timestamp
    pub fn succeed(&mut self, now_millis: i64) -> Result<()> {
        self.ensure_pending("SUCCESS")?;
        self.status = JobStatus::Succeeded;
        self.finished_at = Some(now_millis);
        Ok(())
    }

    /// Transition to Failed with explicit timestamp
    pub fn fail(
        &mut self,
        now_millis: i64,
        retryable: bool,
        reason: impl Into<String>,
    ) -> Result<()> {
        self.ensure_pending("ERROR")?;
        self.status = JobStatus::Failed {
            retryable,
            reason: reason.into(),
        };
        self.finished_at = Some(now_millis);
        Ok(())
    }

    fn ensure_pending(&self, to: &str) -> Result<()> {
        if self.status.is_terminal() {
            return Err(DomainError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        Ok(())
    }
}

/// Check a document number is usable as an object-store prefix
pub fn validate_document_number(number: &str) -> Result<()> {
    let invalid = |reason: &str| DomainError::InvalidDocumentNumber {
        number: number.to_string(),
        reason: reason.to_string(),
    };

    if number.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if number.len() > MAX_DOCUMENT_NUMBER_LEN {
        return Err(invalid("too long"));
    }
    if number.contains('/') || number.contains('\\') {
        return Err(invalid("must not contain path separators"));
    }
    if number.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain whitespace"));
    }
    if number == "." || number == ".." {
        return Err(invalid("reserved name"));
    }
    if number == CHANGELOG_DIR {
        return Err(invalid("reserved for changelogs"));
    }
    Ok(())
}
