// Application Layer - Use Cases and Business Logic

pub mod changelog;
pub mod executor;
pub mod portal_xml;
pub mod reconciler;
pub mod retry;
pub mod scheduler;
pub mod trigger;

// Re-exports
pub use changelog::{ChangeManifest, ChangelogBuilder, FullResyncChangelog};
pub use executor::{
    shutdown_channel, BatchReport, ExecutorConfig, PublicationExecutor, ShutdownSender,
    ShutdownToken,
};
pub use portal_xml::PortalXmlTransformer;
pub use reconciler::{ObjectReconciler, ReconcileOutcome};
pub use retry::RetryPolicy;
pub use scheduler::PublicationScheduler;
pub use trigger::PublicationTrigger;
