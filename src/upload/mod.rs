//! Recursive mirroring of local directories onto a [`RemoteStore`].

mod types;

pub use types::{FailedTransfer, UploadReport};

use crate::exclude::ExclusionRules;
use crate::remote::{ensure_remote_dir, RemoteStore};
use crate::utils::{join_remote, to_remote_relative};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Uploads local trees through one remote session
pub struct Uploader<'a, S: RemoteStore + ?Sized> {
    store: &'a mut S,
    rules: &'a ExclusionRules,
}

impl<'a, S: RemoteStore + ?Sized> Uploader<'a, S> {
    pub fn new(store: &'a mut S, rules: &'a ExclusionRules) -> Self {
        Self { store, rules }
    }

    /// Mirror `local_dir` onto `remote_dir`.
    ///
    /// The remote directory is created if needed, then every entry not
    /// matched by the exclusion rules is transferred; excluded directories
    /// are not descended into. Individual failures are recorded in the
    /// report and never stop the walk.
    pub async fn upload_directory(&mut self, local_dir: &Path, remote_dir: &str) -> UploadReport {
        let mut report = UploadReport::default();

        let outcome = ensure_remote_dir(&mut *self.store, remote_dir).await;
        report.directories.push((remote_dir.to_string(), outcome));

        let mut walker = WalkDir::new(local_dir)
            .min_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter();

        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .unwrap_or(local_dir)
                        .display()
                        .to_string();
                    warn!(path = %path, error = %e, "Cannot read local entry");
                    report.failed.push(FailedTransfer {
                        path,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let is_dir = entry.file_type().is_dir();
            let Some(name) = entry.file_name().to_str() else {
                if is_dir {
                    walker.skip_current_dir();
                }
                let path = entry.path().display().to_string();
                warn!(path = %path, "File name is not valid UTF-8");
                report.failed.push(FailedTransfer {
                    path,
                    reason: "file name is not valid UTF-8".to_string(),
                });
                continue;
            };
            if self.rules.is_excluded(name) {
                if is_dir {
                    walker.skip_current_dir();
                }
                debug!(path = %entry.path().display(), "Skipped");
                report.skipped.push(entry.path().to_path_buf());
                continue;
            }

            let relative = entry.path().strip_prefix(local_dir).unwrap_or(entry.path());
            let remote_path = join_remote(remote_dir, &to_remote_relative(relative));

            if is_dir {
                let outcome = ensure_remote_dir(&mut *self.store, &remote_path).await;
                report.directories.push((remote_path, outcome));
            } else {
                match self.upload_file(entry.path(), &remote_path).await {
                    Ok(bytes) => {
                        report.bytes_uploaded += bytes;
                        report.uploaded.push(remote_path);
                    }
                    Err(failure) => report.failed.push(failure),
                }
            }
        }

        report
    }

    /// Transfer a single local file to `remote_path`
    pub async fn upload_file(
        &mut self,
        local_path: &Path,
        remote_path: &str,
    ) -> Result<u64, FailedTransfer> {
        let content = match fs::read(local_path).await {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %local_path.display(), error = %e, "Failed to read local file");
                return Err(FailedTransfer {
                    path: remote_path.to_string(),
                    reason: format!("reading {}: {}", local_path.display(), e),
                });
            }
        };

        match self.store.put_file(remote_path, content).await {
            Ok(bytes) => {
                info!(path = %remote_path, bytes, "Uploaded");
                Ok(bytes)
            }
            Err(e) => {
                warn!(path = %remote_path, error = %e, "Upload failed");
                Err(FailedTransfer {
                    path: remote_path.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}
