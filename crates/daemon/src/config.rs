//! Command line and environment configuration

use clap::{Parser, Subcommand};
use std::time::Duration;

use portal_sync_core::application::executor::constants::{
    DEFAULT_LEASE_TTL_MS, DEFAULT_MAX_ATTEMPTS, DEFAULT_NIGHTLY_HOUR_UTC,
    DEFAULT_RETRY_BASE_DELAY_MS,
};

pub const DEFAULT_DB_PATH: &str = "~/.portal-sync/jobs.db";
pub const DEFAULT_STORE_ROOT: &str = "~/.portal-sync/objects";

#[derive(Debug, Parser)]
#[command(name = "portal-sync")]
#[command(about = "Publishes court decisions to the portal object store", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// SQLite database holding jobs, leases and documents
    #[arg(long, env = "PORTAL_SYNC_DB_PATH", default_value = DEFAULT_DB_PATH)]
    pub db_path: String,

    /// Root directory of the local object store
    #[arg(long, env = "PORTAL_SYNC_STORE_ROOT", default_value = DEFAULT_STORE_ROOT)]
    pub store_root: String,

    /// Seconds between two executor passes
    #[arg(long, env = "PORTAL_SYNC_JOB_INTERVAL_SECS", default_value_t = 10)]
    pub job_interval_secs: u64,

    /// UTC hour (0-23) of the nightly full-resync changelog
    #[arg(
        long,
        env = "PORTAL_SYNC_NIGHTLY_HOUR_UTC",
        default_value_t = DEFAULT_NIGHTLY_HOUR_UTC,
        value_parser = clap::value_parser!(u32).range(0..=23)
    )]
    pub nightly_hour_utc: u32,

    /// Total attempts per document including the first (1 disables retries)
    #[arg(long, env = "PORTAL_SYNC_MAX_ATTEMPTS", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: i32,

    /// Backoff before the second attempt, doubled for each further one
    #[arg(
        long,
        env = "PORTAL_SYNC_RETRY_BASE_DELAY_MS",
        default_value_t = DEFAULT_RETRY_BASE_DELAY_MS
    )]
    pub retry_base_delay_ms: i64,

    /// How long a document stays leased to this process while its job runs
    #[arg(long, env = "PORTAL_SYNC_LEASE_TTL_MS", default_value_t = DEFAULT_LEASE_TTL_MS)]
    pub lease_ttl_ms: i64,

    /// Log output: `json` or `pretty`
    #[arg(long, env = "PORTAL_SYNC_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run the scheduler until Ctrl+C (default)
    Run,

    /// Execute all pending jobs once and exit
    Execute,

    /// Upload the full-resync changelog once and exit
    Nightly,

    /// Enqueue a PUBLISH job
    Publish {
        /// Document number
        document_number: String,
    },

    /// Enqueue a DELETE job
    Withdraw {
        /// Document number
        document_number: String,
    },
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }

    pub fn job_interval(&self) -> Duration {
        Duration::from_secs(self.job_interval_secs.max(1))
    }

    pub fn db_path(&self) -> String {
        shellexpand::tilde(&self.db_path).into_owned()
    }

    pub fn store_root(&self) -> String {
        shellexpand::tilde(&self.store_root).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["portal-sync"]).unwrap();
        assert_eq!(cli.command(), Command::Run);
        assert_eq!(cli.job_interval(), Duration::from_secs(10));
        assert_eq!(cli.nightly_hour_utc, 2);
        assert_eq!(cli.max_attempts, 3);
        assert!(!cli.db_path().starts_with('~'));
    }

    #[test]
    fn test_publish_subcommand() {
        let cli = Cli::try_parse_from(["portal-sync", "publish", "KORE100012023"]).unwrap();
        assert_eq!(
            cli.command(),
            Command::Publish {
                document_number: "KORE100012023".into()
            }
        );
    }

    #[test]
    fn test_nightly_hour_out_of_range_is_rejected() {
        assert!(Cli::try_parse_from(["portal-sync", "--nightly-hour-utc", "24"]).is_err());
    }
}
