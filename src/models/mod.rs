//! Data transfer objects (DTOs) for API responses.
//!
//! These structs are serialized to JSON for the rendering layer.
//! - `tree`: TreeEntry, TreeResponse, RepositoryInfo, RepositorySummary
//! - `commit`: CommitSummary, CommitDetail, CommitListResponse, AuthorInfo
//! - `diff`: Change, DiffStats, CommitDiffResponse
//! - `refs`: RefInfo, RefsResponse, DefaultBranch

pub mod commit;
pub mod diff;
pub mod refs;
pub mod tree;

pub use commit::*;
pub use diff::*;
pub use refs::*;
pub use tree::*;
