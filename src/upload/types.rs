use crate::remote::DirOutcome;
use std::path::PathBuf;

/// A transfer that did not complete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedTransfer {
    pub path: String,
    pub reason: String,
}

/// What happened while mirroring one or more local trees
#[derive(Debug, Clone, Default)]
pub struct UploadReport {
    /// Remote paths of stored files
    pub uploaded: Vec<String>,
    /// Local entries matched by an exclusion rule
    pub skipped: Vec<PathBuf>,
    /// Files (or unreadable entries) that could not be transferred
    pub failed: Vec<FailedTransfer>,
    /// Every remote directory touched, with its creation outcome
    pub directories: Vec<(String, DirOutcome)>,
    pub bytes_uploaded: u64,
}

impl UploadReport {
    pub fn merge(&mut self, other: UploadReport) {
        self.uploaded.extend(other.uploaded);
        self.skipped.extend(other.skipped);
        self.failed.extend(other.failed);
        self.directories.extend(other.directories);
        self.bytes_uploaded += other.bytes_uploaded;
    }

    pub fn failed_directories(&self) -> Vec<&str> {
        self.directories
            .iter()
            .filter(|(_, outcome)| !outcome.is_success())
            .map(|(path, _)| path.as_str())
            .collect()
    }

    /// Directory failures are tolerated; only file transfers count
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}
