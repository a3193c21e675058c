use super::{RemoteConnector, RemoteError, RemoteStore};
use crate::utils::remote_parent;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryState {
    dirs: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
    permissions: BTreeMap<String, String>,
    failing_uploads: HashSet<String>,
    refuse_connections: bool,
    sessions_opened: usize,
}

/// An in-process remote filesystem.
///
/// Clones share the same state, so a handle kept by the caller observes
/// everything stored through sessions opened from another clone. Used for
/// `--dry-run` and as the remote in tests.
#[derive(Debug, Clone)]
pub struct MemoryRemote {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryRemote {
    /// A remote containing only the root directory
    pub fn new() -> Self {
        let mut state = MemoryState::default();
        state.dirs.insert("/".to_string());
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Pre-create a directory (and its ancestors)
    pub fn add_dir(&self, path: &str) {
        let mut state = self.lock();
        let mut current = Some(normalize(path));
        while let Some(dir) = current {
            current = remote_parent(&dir).map(str::to_string);
            state.dirs.insert(dir);
        }
    }

    /// Pre-create a file without checking its parent
    pub fn add_file(&self, path: &str, content: Vec<u8>) {
        self.lock().files.insert(normalize(path), content);
    }

    /// Make every upload to `path` fail
    pub fn fail_uploads_to(&self, path: &str) {
        self.lock().failing_uploads.insert(normalize(path));
    }

    /// Make every subsequent connection attempt fail
    pub fn refuse_connections(&self) {
        self.lock().refuse_connections = true;
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.lock().dirs.contains(&normalize(path))
    }

    pub fn has_file(&self, path: &str) -> bool {
        self.lock().files.contains_key(&normalize(path))
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().files.get(&normalize(path)).cloned()
    }

    /// All stored file paths, sorted
    pub fn files(&self) -> Vec<String> {
        self.lock().files.keys().cloned().collect()
    }

    pub fn permissions(&self, path: &str) -> Option<String> {
        self.lock().permissions.get(&normalize(path)).cloned()
    }

    pub fn sessions_opened(&self) -> usize {
        self.lock().sessions_opened
    }
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

fn parent_of(path: &str) -> String {
    remote_parent(path).unwrap_or("/").to_string()
}

#[async_trait]
impl RemoteConnector for MemoryRemote {
    type Store = MemoryStore;

    async fn connect(&self) -> Result<MemoryStore, RemoteError> {
        let mut state = self.lock();
        if state.refuse_connections {
            return Err(RemoteError::Connection {
                host: "memory".to_string(),
                message: "connection refused".to_string(),
            });
        }
        state.sessions_opened += 1;
        Ok(MemoryStore {
            remote: self.clone(),
            open: true,
        })
    }

    fn describe(&self) -> String {
        "memory://dry-run".to_string()
    }
}

/// A session on a [`MemoryRemote`]
#[derive(Debug)]
pub struct MemoryStore {
    remote: MemoryRemote,
    open: bool,
}

impl MemoryStore {
    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, RemoteError> {
        if self.open {
            Ok(self.remote.lock())
        } else {
            Err(RemoteError::Closed)
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn make_dir(&mut self, path: &str) -> Result<(), RemoteError> {
        let path = normalize(path);
        let mut state = self.state()?;

        if state.dirs.contains(&path) {
            return Err(RemoteError::AlreadyExists(path));
        }
        if state.files.contains_key(&path) {
            return Err(RemoteError::Command(format!("{}: not a directory", path)));
        }
        if !state.dirs.contains(&parent_of(&path)) {
            return Err(RemoteError::ParentMissing(path));
        }

        state.dirs.insert(path);
        Ok(())
    }

    async fn put_file(&mut self, path: &str, content: Vec<u8>) -> Result<u64, RemoteError> {
        let path = normalize(path);
        let mut state = self.state()?;

        if state.failing_uploads.contains(&path) {
            return Err(RemoteError::Transfer {
                path,
                message: "permission denied".to_string(),
            });
        }
        if !state.dirs.contains(&parent_of(&path)) {
            return Err(RemoteError::Transfer {
                message: "no such directory".to_string(),
                path,
            });
        }

        let len = content.len() as u64;
        state.files.insert(path, content);
        Ok(len)
    }

    async fn set_permissions(&mut self, path: &str, mode: &str) -> Result<(), RemoteError> {
        let path = normalize(path);
        let mut state = self.state()?;

        if !state.dirs.contains(&path) && !state.files.contains_key(&path) {
            return Err(RemoteError::Command(format!("CHMOD {} {}: no such file", mode, path)));
        }
        state.permissions.insert(path, mode.to_string());
        Ok(())
    }

    async fn quit(&mut self) -> Result<(), RemoteError> {
        self.open = false;
        Ok(())
    }
}
