//! Diff-related DTOs.
//!
//! - `Change`: One path that differs between a commit and its first parent
//! - `ChangeSide`: Path, object and mode on one side of a change
//! - `DiffStats` / `FileStat`: Line counts per file and in total
//! - `CommitDiffResponse`: Commit detail with its changes and rendered diff

use serde::{Deserialize, Serialize};

use super::{CommitDetail, EntryMode};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeSide {
    pub path: String,
    pub oid: String,
    pub mode: EntryMode,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Deleted,
    Modified,
    Renamed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Change {
    pub kind: ChangeKind,
    pub from: Option<ChangeSide>,
    pub to: Option<ChangeSide>,
}

impl Change {
    /// Path used for ordering and display: the new path when there is one.
    pub fn path(&self) -> &str {
        self.to
            .as_ref()
            .or(self.from.as_ref())
            .map(|side| side.path.as_str())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileStat {
    pub path: String,
    pub insertions: usize,
    pub deletions: usize,
    pub is_binary: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DiffStats {
    pub files_changed: usize,
    pub insertions: usize,
    pub deletions: usize,
    pub files: Vec<FileStat>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitDiffResponse {
    pub repository: String,
    pub commit: CommitDetail,
    pub changes: Vec<Change>,
    pub stats: DiffStats,
    pub diff: String,
}
