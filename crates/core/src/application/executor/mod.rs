// Publication Executor - drains the job queue and publishes changelogs

pub mod constants;
mod pipeline;
mod shutdown;

use constants::*;
pub use pipeline::{PublicationError, PublicationPipeline};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::changelog::{changelog_key, ChangelogBuilder, FullResyncChangelog};
use crate::application::reconciler::ObjectReconciler;
use crate::application::retry::RetryPolicy;
use crate::domain::{PublicationJob, PublicationJobType};
use crate::error::{AppError, Result};
use crate::port::{
    DocumentLeases, DocumentRepository, ObjectStore, PublicationJobStore, TimeProvider,
    XmlTransformer,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Executor tuning
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Lease duration per document while its job runs
    pub lease_ttl_ms: i64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            lease_ttl_ms: DEFAULT_LEASE_TTL_MS,
        }
    }
}

/// Outcome of one `execute_pending_jobs` pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub fetched: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Left PENDING: document leased elsewhere, or already finished elsewhere
    pub skipped: usize,
    /// Published, but another executor recorded the job's outcome first
    pub superseded: usize,
    pub retries_enqueued: usize,
    /// Key of the uploaded changelog, if one was uploaded
    pub changelog_key: Option<String>,
    pub changelog_error: Option<String>,
}

enum JobDisposition {
    Succeeded,
    Failed,
    Skipped,
    /// Ran, but lost the terminal transition to another executor
    Superseded,
    /// Skipped and every later job of the document must wait too
    Blocked,
}

/// Executes PENDING publication jobs strictly in creation order
///
/// One pass at a time per executor; concurrent executors are kept apart per
/// document by leases.
pub struct PublicationExecutor {
    job_store: Arc<dyn PublicationJobStore>,
    leases: Arc<dyn DocumentLeases>,
    pipeline: PublicationPipeline,
    store: Arc<dyn ObjectStore>,
    time_provider: Arc<dyn TimeProvider>,
    retry_policy: Option<Arc<RetryPolicy>>,
    holder_id: String,
    config: ExecutorConfig,
    run_lock: Mutex<()>,
    changelog_seq: AtomicU64,
}

impl PublicationExecutor {
    /// Create a new executor
    ///
    /// # Arguments
    /// * `holder_id` - Unique name of this executor instance, used as lease holder
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        job_store: Arc<dyn PublicationJobStore>,
        leases: Arc<dyn DocumentLeases>,
        documents: Arc<dyn DocumentRepository>,
        transformer: Arc<dyn XmlTransformer>,
        store: Arc<dyn ObjectStore>,
        time_provider: Arc<dyn TimeProvider>,
        holder_id: impl Into<String>,
        config: ExecutorConfig,
    ) -> Self {
        let reconciler = Arc::new(ObjectReconciler::new(Arc::clone(&store)));
        Self {
            job_store,
            leases,
            pipeline: PublicationPipeline::new(documents, transformer, reconciler),
            store,
            time_provider,
            retry_policy: None,
            holder_id: holder_id.into(),
            config,
            run_lock: Mutex::new(()),
            changelog_seq: AtomicU64::new(0),
        }
    }

    /// Enable bounded retries of retryable failures
    pub fn with_retry_policy(mut self, retry_policy: Arc<RetryPolicy>) -> Self {
        self.retry_policy = Some(retry_policy);
        self
    }

    pub fn holder_id(&self) -> &str {
        &self.holder_id
    }

    /// Drain all PENDING jobs, then upload one changelog for the batch
    ///
    /// Per-job failures never abort the batch. The changelog is uploaded only
    /// if the batch changed or removed at least one object; an upload failure
    /// is logged and reported but leaves job statuses alone.
    ///
    /// # Errors
    /// Only if the pending jobs cannot be fetched.
    pub async fn execute_pending_jobs(&self) -> Result<BatchReport> {
        let _guard = self.run_lock.lock().await;
        let mut report = BatchReport::default();

        if let Some(retry_policy) = &self.retry_policy {
            match retry_policy.requeue_due().await {
                Ok(requeued) => report.retries_enqueued = requeued.len(),
                Err(e) => warn!(error = %e, "Retry requeue failed, continuing without retries"),
            }
        }

        let jobs = self.job_store.fetch_pending().await?;
        report.fetched = jobs.len();
        if jobs.is_empty() {
            debug!("No pending publication jobs");
            return Ok(report);
        }
        info!(pending = jobs.len(), "Executing pending publication jobs");

        let mut changelog = ChangelogBuilder::new();
        let mut blocked: HashSet<String> = HashSet::new();

        for job in jobs {
            if blocked.contains(&job.document_number) {
                debug!(
                    job_id = %job.id,
                    document_number = %job.document_number,
                    "Earlier job of this document was deferred, deferring too"
                );
                report.skipped += 1;
                continue;
            }

            match self.process_job(&job, &mut changelog).await {
                JobDisposition::Succeeded => report.succeeded += 1,
                JobDisposition::Failed => report.failed += 1,
                JobDisposition::Skipped => report.skipped += 1,
                JobDisposition::Superseded => report.superseded += 1,
                JobDisposition::Blocked => {
                    report.skipped += 1;
                    blocked.insert(job.document_number.clone());
                }
            }
        }

        let manifest = changelog.build();
        if manifest.is_empty() {
            info!("Batch produced no object changes, no changelog uploaded");
        } else {
            let key = self.next_changelog_key();
            match self.upload(&key, manifest.to_json()?).await {
                Ok(()) => {
                    info!(
                        key = %key,
                        changed = manifest.changed.len(),
                        deleted = manifest.deleted.len(),
                        "Changelog uploaded"
                    );
                    report.changelog_key = Some(key);
                }
                Err(e) => {
                    error!(key = %key, error = %e, "Changelog upload failed");
                    report.changelog_error = Some(e.to_string());
                }
            }
        }

        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            superseded = report.superseded,
            "Publication batch finished"
        );
        Ok(report)
    }

    /// Upload `{"change_all": true}`, telling consumers to resync everything
    ///
    /// # Returns
    /// The changelog key
    pub async fn publish_nightly_changelog(&self) -> Result<String> {
        let key = self.next_changelog_key();
        self.upload(&key, FullResyncChangelog::new().to_json()?)
            .await?;
        info!(key = %key, "Nightly full-resync changelog uploaded");
        Ok(key)
    }

    fn next_changelog_key(&self) -> String {
        let seq = self.changelog_seq.fetch_add(1, Ordering::Relaxed);
        changelog_key(self.time_provider.now_millis(), &self.holder_id, seq)
    }

    async fn upload(&self, key: &str, body: Vec<u8>) -> Result<()> {
        self.store.put(key, &body).await.map_err(AppError::from)
    }

    async fn process_job(
        &self,
        job: &PublicationJob,
        changelog: &mut ChangelogBuilder,
    ) -> JobDisposition {
        let doc = job.document_number.as_str();

        match self
            .leases
            .try_acquire(
                doc,
                &self.holder_id,
                self.time_provider.now_millis(),
                self.config.lease_ttl_ms,
            )
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                info!(
                    job_id = %job.id,
                    document_number = %doc,
                    "Document leased by another executor, deferring"
                );
                return JobDisposition::Blocked;
            }
            Err(e) => {
                error!(
                    job_id = %job.id,
                    document_number = %doc,
                    error = %e,
                    "Lease acquisition failed"
                );
                return JobDisposition::Blocked;
            }
        }

        let disposition = self.process_leased_job(job, changelog).await;

        if let Err(e) = self.leases.release(doc, &self.holder_id).await {
            // expires on its own after the TTL
            warn!(document_number = %doc, error = %e, "Lease release failed");
        }
        disposition
    }

    async fn process_leased_job(
        &self,
        job: &PublicationJob,
        changelog: &mut ChangelogBuilder,
    ) -> JobDisposition {
        // another executor may have finished it since we fetched the batch
        match self.job_store.find_by_id(&job.id).await {
            Ok(Some(current)) if current.is_pending() => {}
            Ok(Some(current)) => {
                info!(job_id = %job.id, status = %current.status, "Job already finished elsewhere");
                return JobDisposition::Skipped;
            }
            Ok(None) => {
                warn!(job_id = %job.id, "Job vanished from the store");
                return JobDisposition::Skipped;
            }
            Err(e) => {
                error!(job_id = %job.id, error = %e, "Re-reading job failed");
                return JobDisposition::Blocked;
            }
        }

        info!(
            job_id = %job.id,
            document_number = %job.document_number,
            job_type = %job.job_type,
            attempt = job.attempt,
            "Processing publication job"
        );

        // panics stay inside the job's own task
        let pipeline = self.pipeline.clone();
        let job_for_task = job.clone();
        let handle = tokio::task::spawn(async move { pipeline.run(&job_for_task).await });
        let result = match handle.await {
            Ok(result) => result,
            Err(join_err) => Err(PublicationError::Panicked(join_err.to_string())),
        };

        let now = self.time_provider.now_millis();
        match result {
            Ok(outcome) => {
                match self.job_store.mark_success(job, now).await {
                    Ok(()) => {}
                    Err(e @ (AppError::InvalidState(_) | AppError::NotFound(_))) => {
                        warn!(
                            job_id = %job.id,
                            error = %e,
                            "Job outcome recorded elsewhere, left out of the changelog"
                        );
                        return JobDisposition::Superseded;
                    }
                    Err(e) => {
                        // stays PENDING and reruns; the store already converged
                        error!(job_id = %job.id, error = %e, "Recording job success failed");
                    }
                }
                match job.job_type {
                    PublicationJobType::Publish => {
                        changelog.record_published(&job.document_number, &outcome)
                    }
                    PublicationJobType::Delete => {
                        changelog.record_deleted(&job.document_number, &outcome)
                    }
                }
                info!(
                    job_id = %job.id,
                    put = outcome.put.len(),
                    deleted = outcome.deleted.len(),
                    "Publication job succeeded"
                );
                JobDisposition::Succeeded
            }
            Err(e) => {
                let retryable = e.is_retryable();
                error!(
                    job_id = %job.id,
                    document_number = %job.document_number,
                    retryable = retryable,
                    error = %e,
                    "Publication job failed"
                );
                if let Err(store_err) = self
                    .job_store
                    .mark_error(job, now, retryable, &e.to_string())
                    .await
                {
                    error!(job_id = %job.id, error = %store_err, "Recording job failure failed");
                }
                JobDisposition::Failed
            }
        }
    }
}
