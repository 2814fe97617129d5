//! Tree and repository-related DTOs.
//!
//! - `TreeEntry`: Single file/directory in a listing
//! - `TreeResponse`: Directory listing or file content at a path
//! - `RepositoryInfo`: Registered repository (index listing)
//! - `ReloadResponse`: Result of rescanning the repository root
//! - `RepositorySummary`: Landing view of one repository

use serde::{Deserialize, Serialize};

use super::{CommitSummary, DefaultBranch, RefInfo};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TreeEntry {
    pub name: String,
    pub path: String,
    pub mode: EntryMode,
    pub oid: String,
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryMode {
    File,
    Executable,
    Directory,
    Symlink,
    Submodule,
}

impl EntryMode {
    pub fn from_filemode(mode: i32) -> Option<Self> {
        match mode {
            0o100644 | 0o100664 => Some(EntryMode::File),
            0o100755 => Some(EntryMode::Executable),
            0o040000 => Some(EntryMode::Directory),
            0o120000 => Some(EntryMode::Symlink),
            0o160000 => Some(EntryMode::Submodule),
            _ => None,
        }
    }

    pub fn is_directory(self) -> bool {
        self == EntryMode::Directory
    }

    /// Octal mode as git prints it in patch headers.
    pub fn octal(self) -> &'static str {
        match self {
            EntryMode::File => "100644",
            EntryMode::Executable => "100755",
            EntryMode::Directory => "040000",
            EntryMode::Symlink => "120000",
            EntryMode::Submodule => "160000",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TreeResponse {
    Directory {
        repository: String,
        revision: String,
        path: String,
        parent_path: Option<String>,
        entries: Vec<TreeEntry>,
    },
    File {
        repository: String,
        revision: String,
        path: String,
        parent_path: Option<String>,
        entry: TreeEntry,
        is_binary: bool,
        content: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryInfo {
    pub name: String,
    pub path: String,
    pub is_bare: bool,
    pub is_empty: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryIndex {
    pub title: String,
    pub description: String,
    pub repositories: Vec<RepositoryInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub repositories: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Readme {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositorySummary {
    pub name: String,
    pub default_branch: DefaultBranch,
    pub head_commit: CommitSummary,
    pub branches: Vec<RefInfo>,
    pub tags: Vec<RefInfo>,
    pub readme: Option<Readme>,
}
