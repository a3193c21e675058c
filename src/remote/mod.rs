//! Remote file store abstraction.
//!
//! The uploader and orchestrator only talk to a [`RemoteStore`]; the FTP
//! session ([`FtpStore`]) and the in-process store used for dry runs and
//! tests ([`MemoryStore`]) both implement it.

mod ftp;
mod memory;

pub use ftp::{FtpConnector, FtpStore};
pub use memory::{MemoryRemote, MemoryStore};

use crate::utils::remote_parent;
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Failed to connect to {host}: {message}")]
    Connection { host: String, message: String },

    #[error("Login rejected for user '{user}': {message}")]
    Login { user: String, message: String },

    #[error("Remote path already exists: {0}")]
    AlreadyExists(String),

    #[error("Remote parent directory missing for {0}")]
    ParentMissing(String),

    #[error("Transfer of {path} failed: {message}")]
    Transfer { path: String, message: String },

    #[error("Remote command failed: {0}")]
    Command(String),

    #[error("Session is closed")]
    Closed,

    #[error("Background task failed: {0}")]
    Join(String),
}

/// A connected session on the remote host
#[async_trait]
pub trait RemoteStore: Send {
    /// Create a single directory. Fails with [`RemoteError::AlreadyExists`]
    /// when it is already there.
    async fn make_dir(&mut self, path: &str) -> Result<(), RemoteError>;

    /// Store `content` at `path`, replacing any existing file.
    /// Returns the number of bytes written.
    async fn put_file(&mut self, path: &str, content: Vec<u8>) -> Result<u64, RemoteError>;

    /// Change permissions of `path` (octal mode such as "755")
    async fn set_permissions(&mut self, path: &str, mode: &str) -> Result<(), RemoteError>;

    /// Close the session
    async fn quit(&mut self) -> Result<(), RemoteError>;
}

/// Opens sessions on a remote host
#[async_trait]
pub trait RemoteConnector: Send + Sync {
    type Store: RemoteStore;

    async fn connect(&self) -> Result<Self::Store, RemoteError>;

    /// Human readable target, used in log lines and the summary
    fn describe(&self) -> String;
}

/// Outcome of [`ensure_remote_dir`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirOutcome {
    Created,
    AlreadyExists,
    Failed,
}

impl DirOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, DirOutcome::Failed)
    }
}

/// Make sure `path` exists on the remote, creating missing ancestors.
///
/// A failed first attempt creates the parent (with the same policy) and
/// retries once. Errors never propagate; a directory that still cannot be
/// created is reported as [`DirOutcome::Failed`].
pub fn ensure_remote_dir<'a, S>(
    store: &'a mut S,
    path: &'a str,
) -> Pin<Box<dyn Future<Output = DirOutcome> + Send + 'a>>
where
    S: RemoteStore + ?Sized,
{
    Box::pin(async move {
        match store.make_dir(path).await {
            Ok(()) => {
                info!(path = %path, "Created directory");
                return DirOutcome::Created;
            }
            Err(RemoteError::AlreadyExists(_)) => {
                debug!(path = %path, "Directory already exists");
                return DirOutcome::AlreadyExists;
            }
            Err(e) => {
                debug!(path = %path, error = %e, "Directory creation failed, trying parent first");
            }
        }

        let Some(parent) = remote_parent(path) else {
            warn!(path = %path, "Could not create directory");
            return DirOutcome::Failed;
        };

        if !ensure_remote_dir(&mut *store, parent).await.is_success() {
            warn!(path = %path, parent = %parent, "Could not create parent directory");
        }

        match store.make_dir(path).await {
            Ok(()) => {
                info!(path = %path, "Created directory");
                DirOutcome::Created
            }
            Err(RemoteError::AlreadyExists(_)) => DirOutcome::AlreadyExists,
            Err(e) => {
                warn!(path = %path, error = %e, "Could not create directory");
                DirOutcome::Failed
            }
        }
    })
}
