mod hash;

pub use hash::{compute_bytes_hash, compute_hash};

use std::path::Path;

/// Name of the optional config file looked up in the local root
pub const CONFIG_FILE: &str = "deploy.json";

/// Current webdeploy version
pub const WEBDEPLOY_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Join a remote directory and a child name with a single `/`
pub fn join_remote(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    if dir.is_empty() {
        format!("/{}", name)
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Parent of a remote path, or `None` for the root and bare names
pub fn remote_parent(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    let idx = trimmed.rfind('/')?;
    let parent = &trimmed[..idx];
    if parent.is_empty() {
        // "/foo" has the root as parent, which always exists
        None
    } else {
        Some(parent)
    }
}

/// Render a local relative path with `/` separators
pub fn to_remote_relative(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Get current timestamp in ISO 8601 format
pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}
