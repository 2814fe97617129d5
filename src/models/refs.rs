//! Reference DTOs.
//!
//! - `RefInfo`: a branch or tag with its target and peeled commit
//! - `RefsResponse`: branches and tags of one repository (refs view)
//! - `DefaultBranch`: result of default-branch detection

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefInfo {
    /// Fully qualified name, e.g. `refs/heads/main`
    pub name: String,
    /// Name without the namespace prefix, e.g. `main`
    pub short_name: String,
    /// Object the reference points at (an annotated tag object for some tags)
    pub target: String,
    /// Commit reached by peeling the target, when there is one
    pub commit: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefsResponse {
    pub repository: String,
    pub branches: Vec<RefInfo>,
    pub tags: Vec<RefInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DefaultBranch {
    pub name: String,
    pub commit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedRevision {
    pub revision: String,
    pub commit: String,
}
