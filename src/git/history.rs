use git2::Sort;

use crate::error::Result;
use crate::git::repository::{commit_to_summary, GitRepository};
use crate::models::CommitListResponse;

/// Most commits a single log request returns.
pub const PAGE_SIZE: usize = 500;

impl GitRepository {
    /// Commits reachable from `revision`, newest committer time first.
    ///
    /// `limit` is clamped to `1..=PAGE_SIZE`; `None` means a full page.
    pub fn list_commits(&self, revision: &str, limit: Option<usize>) -> Result<CommitListResponse> {
        let start = self.resolve_revision(revision)?;
        let limit = limit.unwrap_or(PAGE_SIZE).clamp(1, PAGE_SIZE);

        self.with_repo(|repo| {
            let mut revwalk = repo.revwalk()?;
            revwalk.set_sorting(Sort::TIME)?;
            revwalk.push(start)?;

            let mut commits = Vec::new();
            let mut truncated = false;
            for oid in revwalk {
                let oid = oid?;
                if commits.len() == limit {
                    truncated = true;
                    break;
                }
                let commit = repo.find_commit(oid)?;
                commits.push(commit_to_summary(&commit));
            }

            Ok(CommitListResponse {
                revision: revision.to_string(),
                commits,
                truncated,
            })
        })
    }
}
