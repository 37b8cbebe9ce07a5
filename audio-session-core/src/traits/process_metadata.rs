use std::path::PathBuf;

/// Resolves executable path and descriptive file title for a process
/// id.
///
/// Lookups are best-effort: any failure is reported as `None` and must
/// never abort session construction.
pub trait ProcessMetadata: Send + Sync {
    fn executable_path(&self, pid: u32) -> Option<PathBuf>;

    fn file_description(&self, pid: u32) -> Option<String>;
}

/// Metadata source that resolves nothing (system sessions, tests).
pub struct NoProcessMetadata;

impl ProcessMetadata for NoProcessMetadata {
    fn executable_path(&self, _pid: u32) -> Option<PathBuf> {
        None
    }

    fn file_description(&self, _pid: u32) -> Option<String> {
        None
    }
}
