// Portal Sync Infrastructure - Filesystem Adapter
// Implements: ObjectStore on a local directory tree

mod local_fs;

pub use local_fs::LocalFsObjectStore;
