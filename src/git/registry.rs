//! Repository registry.
//!
//! Maps repository names to opened handles. The mapping is an immutable
//! snapshot behind an `Arc`; `reload()` builds a complete new snapshot from a
//! directory scan and swaps it in under a brief write lock, so readers always
//! observe either the previous or the new mapping in full.
//!
//! Used by: every route, to turn the `{repo}` path segment into a handle.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use crate::error::{AppError, Result};
use crate::git::repository::GitRepository;

/// One complete name → handle mapping.
#[derive(Default)]
pub struct RegistrySnapshot {
    repos: BTreeMap<String, Arc<GitRepository>>,
}

impl RegistrySnapshot {
    pub fn get(&self, name: &str) -> Option<Arc<GitRepository>> {
        self.repos.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.repos.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.repos.len()
    }
}

pub struct Registry {
    root: PathBuf,
    current: RwLock<Arc<RegistrySnapshot>>,
    reload_lock: Mutex<()>,
}

pub type SharedRegistry = Arc<Registry>;

impl Registry {
    /// An empty registry for `root`. Call [`Registry::reload`] to populate it.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            current: RwLock::new(Arc::new(RegistrySnapshot::default())),
            reload_lock: Mutex::new(()),
        }
    }

    /// Rescan the root directory and replace the whole mapping.
    ///
    /// Subdirectories that do not open as repositories are skipped. Returns
    /// the number of repositories in the new snapshot.
    pub fn reload(&self) -> Result<usize> {
        let _guard = self
            .reload_lock
            .lock()
            .map_err(|_| AppError::Internal("Lock poisoned".to_string()))?;

        let start = std::time::Instant::now();
        let snapshot = scan(&self.root)?;
        let count = snapshot.len();
        tracing::debug!("Registered: {}", snapshot.names().join(", "));

        let mut current = self
            .current
            .write()
            .map_err(|_| AppError::Internal("Lock poisoned".to_string()))?;
        *current = Arc::new(snapshot);

        tracing::info!(
            "Loaded {} repositories from {} in {:?}",
            count,
            self.root.display(),
            start.elapsed()
        );
        Ok(count)
    }

    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        match self.current.read() {
            Ok(current) => Arc::clone(&current),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Find a repository by name. `name.git` resolves to `name` when only the
    /// bare name is registered.
    pub fn lookup(&self, name: &str) -> Option<Arc<GitRepository>> {
        let snapshot = self.snapshot();
        snapshot.get(name).or_else(|| {
            name.strip_suffix(".git")
                .and_then(|stripped| snapshot.get(stripped))
        })
    }

    /// Like [`Registry::lookup`] but with the not-found error the routes return.
    pub fn require(&self, name: &str) -> Result<Arc<GitRepository>> {
        self.lookup(name)
            .ok_or_else(|| AppError::RepoNotFound(name.to_string()))
    }

    /// All repositories, sorted by name.
    pub fn list(&self) -> Vec<Arc<GitRepository>> {
        self.snapshot().repos.values().cloned().collect()
    }
}

fn scan(root: &Path) -> Result<RegistrySnapshot> {
    let mut repos = BTreeMap::new();

    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_string();
        match GitRepository::open(&name, &path) {
            Ok(repo) => {
                repos.insert(name, Arc::new(repo));
            }
            Err(e) => {
                tracing::debug!("Skipping {}: {}", path.display(), e);
            }
        }
    }

    Ok(RegistrySnapshot { repos })
}
