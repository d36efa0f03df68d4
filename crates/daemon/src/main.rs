//! Portal Sync - Main Entry Point
//! Scheduler daemon plus one-shot maintenance commands

mod config;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{Cli, Command};
use portal_sync_core::application::{
    shutdown_channel, ExecutorConfig, PortalXmlTransformer, PublicationExecutor,
    PublicationScheduler, PublicationTrigger, RetryPolicy,
};
use portal_sync_core::domain::PublicationJobType;
use portal_sync_core::port::id_provider::UuidProvider;
use portal_sync_core::port::time_provider::SystemTimeProvider;
use portal_sync_core::port::IdProvider;
use portal_sync_infra_fs::LocalFsObjectStore;
use portal_sync_infra_sqlite::{
    create_pool, run_migrations, SqliteDocumentRepository, SqlitePublicationJobStore,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Initialize logging
    init_logging(&cli.log_format)?;
    info!("Portal Sync v{} starting...", VERSION);

    // 2. Initialize database
    let db_path = cli.db_path();
    if let Some(parent) = Path::new(&db_path).parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Cannot create database directory {}", parent.display()))?;
    }
    info!(db_path = %db_path, "Initializing database...");

    let pool = create_pool(&db_path)
        .await
        .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

    // 3. Setup dependencies (DI wiring)
    let time_provider = Arc::new(SystemTimeProvider);
    let id_provider = Arc::new(UuidProvider);
    let job_store = Arc::new(SqlitePublicationJobStore::new(pool.clone()));
    let documents = Arc::new(SqliteDocumentRepository::new(pool.clone()));
    let store_root = cli.store_root();
    let object_store = Arc::new(LocalFsObjectStore::new(&store_root));
    info!(store_root = %store_root, "Using local object store");

    let command = cli.command();
    match &command {
        Command::Publish { document_number } => {
            let trigger = PublicationTrigger::new(job_store, id_provider, time_provider);
            return enqueue(&trigger, document_number, PublicationJobType::Publish).await;
        }
        Command::Withdraw { document_number } => {
            let trigger = PublicationTrigger::new(job_store, id_provider, time_provider);
            return enqueue(&trigger, document_number, PublicationJobType::Delete).await;
        }
        _ => {}
    }

    let retry_policy = Arc::new(RetryPolicy::new(
        job_store.clone(),
        id_provider.clone(),
        time_provider.clone(),
        cli.retry_base_delay_ms,
        cli.max_attempts,
    ));
    let executor = Arc::new(
        PublicationExecutor::new(
            job_store.clone(),
            job_store,
            documents,
            Arc::new(PortalXmlTransformer::new()),
            object_store,
            time_provider.clone(),
            format!("portal-sync-{}", id_provider.generate_id()),
            ExecutorConfig {
                lease_ttl_ms: cli.lease_ttl_ms,
            },
        )
        .with_retry_policy(retry_policy),
    );
    info!(holder_id = %executor.holder_id(), "Executor ready");

    match command {
        Command::Execute => {
            let report = executor
                .execute_pending_jobs()
                .await
                .map_err(|e| anyhow::anyhow!("Executor pass failed: {}", e))?;
            info!(
                fetched = report.fetched,
                succeeded = report.succeeded,
                failed = report.failed,
                skipped = report.skipped,
                superseded = report.superseded,
                retries_enqueued = report.retries_enqueued,
                changelog = report.changelog_key.as_deref().unwrap_or("-"),
                "Executor pass complete"
            );
            if let Some(err) = report.changelog_error {
                anyhow::bail!("Changelog upload failed: {}", err);
            }
        }
        Command::Nightly => {
            let key = executor
                .publish_nightly_changelog()
                .await
                .map_err(|e| anyhow::anyhow!("Nightly changelog failed: {}", e))?;
            println!("{}", key);
        }
        _ => {
            run_scheduler(&cli, executor, time_provider).await?;
        }
    }

    Ok(())
}

async fn enqueue(
    trigger: &PublicationTrigger,
    document_number: &str,
    job_type: PublicationJobType,
) -> Result<()> {
    let job = trigger
        .enqueue(document_number, job_type)
        .await
        .map_err(|e| anyhow::anyhow!("Enqueue failed: {}", e))?;
    println!("{} {} {}", job.id, job.job_type, job.document_number);
    Ok(())
}

async fn run_scheduler(
    cli: &Cli,
    executor: Arc<PublicationExecutor>,
    time_provider: Arc<SystemTimeProvider>,
) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let scheduler = PublicationScheduler::new(
        executor,
        time_provider,
        cli.job_interval(),
        cli.nightly_hour_utc,
    );

    let scheduler_handle = tokio::spawn(async move {
        scheduler.run(shutdown_rx).await;
    });

    info!("System ready. Press Ctrl+C to shutdown");
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    shutdown_tx.shutdown();
    // a pass in flight finishes its current batch before the loop exits
    if tokio::time::timeout(std::time::Duration::from_secs(30), scheduler_handle)
        .await
        .is_err()
    {
        tracing::warn!("Scheduler did not stop within 30s");
    }

    info!("Shutdown complete.");
    Ok(())
}

fn init_logging(log_format: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("portal_sync=info"))
        .context("Failed to create env filter")?;

    match log_format {
        "json" => {
            // Production: JSON structured logging
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            // Development: Pretty formatting with colors
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }
    Ok(())
}
