// SQLite DocumentRepository Implementation
// Read side of the editor's documents plus the portal visibility column

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use portal_sync_core::domain::{
    Attachment, CoreData, DocumentAggregate, PortalPublicationStatus, Texts,
};
use portal_sync_core::error::{AppError, Result};
use portal_sync_core::port::DocumentRepository;
use sqlx::types::chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::{debug, warn};

pub struct SqliteDocumentRepository {
    pool: SqlitePool,
}

impl SqliteDocumentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or replace a document together with its attachments
    ///
    /// Used by the editing side and by tests to seed documents.
    pub async fn upsert(&self, document: &DocumentAggregate) -> Result<()> {
        let file_numbers = serde_json::to_string(&document.core_data.file_numbers)?;
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        sqlx::query(
            r#"
            INSERT INTO documents (
                document_number, court, file_numbers, decision_date, document_type, ecli,
                headnote, guiding_principle, tenor, grounds, case_facts, decision_reasons,
                portal_publication_status
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(document_number) DO UPDATE SET
                court = excluded.court,
                file_numbers = excluded.file_numbers,
                decision_date = excluded.decision_date,
                document_type = excluded.document_type,
                ecli = excluded.ecli,
                headnote = excluded.headnote,
                guiding_principle = excluded.guiding_principle,
                tenor = excluded.tenor,
                grounds = excluded.grounds,
                case_facts = excluded.case_facts,
                decision_reasons = excluded.decision_reasons,
                portal_publication_status = excluded.portal_publication_status
            "#,
        )
        .bind(&document.document_number)
        .bind(&document.core_data.court)
        .bind(&file_numbers)
        .bind(document.core_data.decision_date)
        .bind(&document.core_data.document_type)
        .bind(&document.core_data.ecli)
        .bind(&document.texts.headnote)
        .bind(&document.texts.guiding_principle)
        .bind(&document.texts.tenor)
        .bind(&document.texts.grounds)
        .bind(&document.texts.case_facts)
        .bind(&document.texts.decision_reasons)
        .bind(document.portal_publication_status.as_str())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        sqlx::query("DELETE FROM document_attachments WHERE document_number = ?")
            .bind(&document.document_number)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        for (position, attachment) in document.attachments.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO document_attachments (document_number, position, filename, content)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(&document.document_number)
            .bind(position as i64)
            .bind(&attachment.filename)
            .bind(&attachment.content)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Delete a document and its attachments
    pub async fn remove(&self, document_number: &str) -> Result<()> {
        sqlx::query("DELETE FROM documents WHERE document_number = ?")
            .bind(document_number)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[async_trait]
impl DocumentRepository for SqliteDocumentRepository {
    async fn find_by_document_number(
        &self,
        document_number: &str,
    ) -> Result<Option<DocumentAggregate>> {
        let row = sqlx::query_as::<_, DocumentRow>(
            "SELECT * FROM documents WHERE document_number = ?",
        )
        .bind(document_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let attachments: Vec<AttachmentRow> = sqlx::query_as(
            r#"
            SELECT filename, content FROM document_attachments
            WHERE document_number = ?
            ORDER BY position ASC
            "#,
        )
        .bind(document_number)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.into_aggregate(attachments).map(Some)
    }

    async fn set_publication_status(
        &self,
        document_number: &str,
        status: PortalPublicationStatus,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE documents SET portal_publication_status = ? WHERE document_number = ?",
        )
        .bind(status.as_str())
        .bind(document_number)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            // withdrawal of a document the editor already deleted
            debug!(
                document_number = %document_number,
                status = %status,
                "No document row to record publication status on"
            );
        }
        Ok(())
    }
}

/// SQLite row representation
#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    document_number: String,
    court: Option<String>,
    file_numbers: String,
    decision_date: Option<NaiveDate>,
    document_type: Option<String>,
    ecli: Option<String>,
    headnote: Option<String>,
    guiding_principle: Option<String>,
    tenor: Option<String>,
    grounds: Option<String>,
    case_facts: Option<String>,
    decision_reasons: Option<String>,
    portal_publication_status: String,
}

#[derive(Debug, sqlx::FromRow)]
struct AttachmentRow {
    filename: String,
    content: Vec<u8>,
}

impl DocumentRow {
    fn into_aggregate(self, attachments: Vec<AttachmentRow>) -> Result<DocumentAggregate> {
        let file_numbers: Vec<String> =
            serde_json::from_str(&self.file_numbers).map_err(|e| {
                warn!(
                    document_number = %self.document_number,
                    error = %e,
                    "Malformed file_numbers column"
                );
                AppError::Database(format!(
                    "Malformed file_numbers for {}: {}",
                    self.document_number, e
                ))
            })?;

        Ok(DocumentAggregate {
            core_data: CoreData {
                court: self.court,
                file_numbers,
                decision_date: self.decision_date,
                document_type: self.document_type,
                ecli: self.ecli,
            },
            texts: Texts {
                headnote: self.headnote,
                guiding_principle: self.guiding_principle,
                tenor: self.tenor,
                grounds: self.grounds,
                case_facts: self.case_facts,
                decision_reasons: self.decision_reasons,
            },
            attachments: attachments
                .into_iter()
                .map(|a| Attachment::new(a.filename, a.content))
                .collect(),
            portal_publication_status: self.portal_publication_status.parse()?,
            document_number: self.document_number,
        })
    }
}
