use git2::{Oid, Repository};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{AuthorInfo, CommitDetail, CommitSummary, RepositoryInfo};

/// A repository registered under a unique name.
///
/// `git2::Repository` is not `Sync`, so the handle keeps it behind a mutex and
/// hands out short borrows through [`GitRepository::with_repo`].
pub struct GitRepository {
    pub name: String,
    pub path: PathBuf,
    repo: Mutex<Repository>,
}

impl GitRepository {
    /// Open the repository at exactly `path`. Parent directories are not
    /// searched, so a plain directory inside another repository's work tree
    /// is rejected.
    pub fn open<P: AsRef<Path>>(name: &str, path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let repo = Repository::open(&path)
            .map_err(|_| AppError::RepoNotFound(path.to_string_lossy().to_string()))?;

        Ok(Self {
            name: name.to_string(),
            path,
            repo: Mutex::new(repo),
        })
    }

    pub fn info(&self) -> Result<RepositoryInfo> {
        self.with_repo(|repo| {
            Ok(RepositoryInfo {
                name: self.name.clone(),
                path: self.path.to_string_lossy().to_string(),
                is_bare: repo.is_bare(),
                is_empty: repo.is_empty().unwrap_or(true),
            })
        })
    }

    pub fn with_repo<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Repository) -> Result<T>,
    {
        let repo = self.repo.lock().map_err(|_| AppError::Internal("Lock poisoned".to_string()))?;
        f(&repo)
    }

    pub fn commit_summary(&self, oid: Oid) -> Result<CommitSummary> {
        self.with_repo(|repo| {
            let commit = find_commit(repo, oid)?;
            Ok(commit_to_summary(&commit))
        })
    }

    pub fn commit_detail(&self, oid: Oid) -> Result<CommitDetail> {
        self.with_repo(|repo| {
            let commit = find_commit(repo, oid)?;
            Ok(commit_to_detail(&commit))
        })
    }
}

pub fn find_commit(repo: &Repository, oid: Oid) -> Result<git2::Commit<'_>> {
    repo.find_commit(oid)
        .map_err(|_| AppError::CommitNotFound(oid.to_string()))
}

/// Parse a full commit hash as given in a URL.
pub fn parse_oid(hash: &str) -> Result<Oid> {
    if hash.len() != 40 {
        return Err(AppError::CommitNotFound(hash.to_string()));
    }
    Oid::from_str(hash).map_err(|_| AppError::CommitNotFound(hash.to_string()))
}

fn signature_to_author(sig: &git2::Signature) -> AuthorInfo {
    AuthorInfo {
        name: sig.name().unwrap_or("Unknown").to_string(),
        email: sig.email().unwrap_or("").to_string(),
    }
}

pub fn commit_to_summary(commit: &git2::Commit) -> CommitSummary {
    let oid = commit.id().to_string();
    let timestamp = commit.author().when().seconds();
    CommitSummary {
        short_hash: oid[..8].to_string(),
        oid,
        subject: commit.summary().unwrap_or("").to_string(),
        author: signature_to_author(&commit.author()),
        timestamp,
        date: format_date(timestamp),
        relative_time: format_relative_time(timestamp),
    }
}

pub fn commit_to_detail(commit: &git2::Commit) -> CommitDetail {
    let author = commit.author();
    let timestamp = author.when().seconds();
    CommitDetail {
        oid: commit.id().to_string(),
        message: commit.message().unwrap_or("").trim().to_string(),
        author: signature_to_author(&author),
        committer: signature_to_author(&commit.committer()),
        timestamp,
        relative_time: format_relative_time(timestamp),
        parent_count: commit.parent_count(),
        parents: commit.parent_ids().map(|id| id.to_string()).collect(),
    }
}

/// `YYYY-MM-DD` in UTC, as shown in log listings.
pub fn format_date(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

pub fn format_relative_time(timestamp: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let diff = now - timestamp;

    if diff < 60 {
        "just now".to_string()
    } else if diff < 3600 {
        let mins = diff / 60;
        format!("{} minute{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if diff < 86400 {
        let hours = diff / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if diff < 2592000 {
        let days = diff / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else if diff < 31536000 {
        let months = diff / 2592000;
        format!("{} month{} ago", months, if months == 1 { "" } else { "s" })
    } else {
        let years = diff / 31536000;
        format!("{} year{} ago", years, if years == 1 { "" } else { "s" })
    }
}
