use git2::{Oid, Repository};

use crate::error::{AppError, Result};
use crate::git::repository::GitRepository;
use crate::models::RefInfo;

const BRANCH_PREFIX: &str = "refs/heads/";
const TAG_PREFIX: &str = "refs/tags/";

/// Branch names preferred as the default, in order.
const PREFERRED_DEFAULTS: [&str; 2] = ["main", "master"];

impl GitRepository {
    /// Local branches sorted by full reference name.
    pub fn list_branches(&self) -> Result<Vec<RefInfo>> {
        self.with_repo(|repo| collect_refs(repo, BRANCH_PREFIX))
    }

    /// Tags sorted by full reference name.
    pub fn list_tags(&self) -> Result<Vec<RefInfo>> {
        self.with_repo(|repo| collect_refs(repo, TAG_PREFIX))
    }

    /// Pick the branch a browsing view shows when none is requested.
    ///
    /// `main` wins, then `master`, then the first branch by name. The remote
    /// HEAD is deliberately not consulted.
    pub fn find_default_branch(&self) -> Result<(String, Oid)> {
        let branches = self.list_branches()?;
        let branch = pick_default_branch(&branches).ok_or(AppError::NoBranches)?;
        let oid = self.resolve_revision(&branch.name)?;
        Ok((branch.short_name.clone(), oid))
    }

    /// Resolve a branch, tag, hash (full or abbreviated) or revision
    /// expression to a commit id.
    pub fn resolve_revision(&self, revision: &str) -> Result<Oid> {
        if revision.trim().is_empty() {
            return Err(AppError::RevisionNotFound(revision.to_string()));
        }
        self.with_repo(|repo| {
            repo.revparse_single(revision)
                .and_then(|obj| obj.peel_to_commit())
                .map(|commit| commit.id())
                .map_err(|_| AppError::RevisionNotFound(revision.to_string()))
        })
    }
}

pub fn pick_default_branch(branches: &[RefInfo]) -> Option<&RefInfo> {
    PREFERRED_DEFAULTS
        .iter()
        .find_map(|preferred| branches.iter().find(|b| b.short_name == *preferred))
        .or_else(|| branches.first())
}

fn collect_refs(repo: &Repository, prefix: &str) -> Result<Vec<RefInfo>> {
    let glob = format!("{}*", prefix);
    let references = repo
        .references_glob(&glob)
        .map_err(|e| AppError::RefEnumeration(e.message().to_string()))?;

    let mut refs = Vec::new();
    for reference in references {
        let reference = reference.map_err(|e| AppError::RefEnumeration(e.message().to_string()))?;
        let Some(name) = reference.name() else {
            tracing::debug!("Skipping reference with non UTF-8 name");
            continue;
        };
        let name = name.to_string();

        let resolved = reference
            .resolve()
            .map_err(|e| AppError::RefEnumeration(format!("{}: {}", name, e.message())))?;
        let Some(target) = resolved.target() else {
            continue;
        };
        let commit = resolved.peel_to_commit().ok().map(|c| c.id().to_string());

        refs.push(RefInfo {
            short_name: name.strip_prefix(prefix).unwrap_or(&name).to_string(),
            name,
            target: target.to_string(),
            commit,
        });
    }

    refs.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(refs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestRepo;

    fn repo_with_branches(names: &[&str]) -> (TestRepo, Oid) {
        let fixture = TestRepo::new("refs");
        let first = fixture.commit(names[0], &[("file.txt", "content\n")], "init", &[]);
        for name in &names[1..] {
            fixture.branch(name, first);
        }
        (fixture, first)
    }

    #[test]
    fn default_branch_prefers_main() {
        let (fixture, oid) = repo_with_branches(&["dev", "main"]);
        let (name, commit) = fixture.open().find_default_branch().unwrap();
        assert_eq!(name, "main");
        assert_eq!(commit, oid);
    }

    #[test]
    fn default_branch_falls_back_to_master() {
        let (fixture, _) = repo_with_branches(&["master", "dev"]);
        let (name, _) = fixture.open().find_default_branch().unwrap();
        assert_eq!(name, "master");
    }

    #[test]
    fn default_branch_prefers_main_over_master() {
        let (fixture, _) = repo_with_branches(&["master", "main"]);
        let (name, _) = fixture.open().find_default_branch().unwrap();
        assert_eq!(name, "main");
    }

    #[test]
    fn default_branch_uses_first_sorted_name() {
        let (fixture, _) = repo_with_branches(&["zeta", "alpha"]);
        let (name, _) = fixture.open().find_default_branch().unwrap();
        assert_eq!(name, "alpha");
    }

    #[test]
    fn default_branch_requires_a_branch() {
        let fixture = TestRepo::new("empty");
        let result = fixture.open().find_default_branch();
        assert!(matches!(result, Err(AppError::NoBranches)));
    }

    #[test]
    fn branches_are_sorted_by_full_name() {
        let (fixture, _) = repo_with_branches(&["zeta", "Beta", "feature/x", "alpha"]);
        let names: Vec<String> = fixture
            .open()
            .list_branches()
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "refs/heads/Beta",
                "refs/heads/alpha",
                "refs/heads/feature/x",
                "refs/heads/zeta",
            ]
        );
    }

    #[test]
    fn tags_are_sorted_and_peeled() {
        let (fixture, oid) = repo_with_branches(&["main"]);
        fixture.lightweight_tag("v2.0", oid);
        let tag_object = fixture.annotated_tag("v1.0", oid);

        let tags = fixture.open().list_tags().unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].name, "refs/tags/v1.0");
        assert_eq!(tags[0].short_name, "v1.0");
        assert_eq!(tags[0].target, tag_object.to_string());
        assert_eq!(tags[0].commit.as_deref(), Some(oid.to_string().as_str()));
        assert_eq!(tags[1].name, "refs/tags/v2.0");
        assert_eq!(tags[1].target, oid.to_string());
    }

    #[test]
    fn resolve_revision_accepts_names_and_hashes() {
        let fixture = TestRepo::new("rev");
        let first = fixture.commit("main", &[("a", "1\n")], "one", &[]);
        let second = fixture.commit("main", &[("a", "2\n")], "two", &[first]);
        fixture.annotated_tag("v1", first);

        let repo = fixture.open();
        assert_eq!(repo.resolve_revision("main").unwrap(), second);
        assert_eq!(repo.resolve_revision("v1").unwrap(), first);
        assert_eq!(repo.resolve_revision(&second.to_string()).unwrap(), second);
        assert_eq!(repo.resolve_revision(&first.to_string()[..10]).unwrap(), first);
        assert_eq!(repo.resolve_revision("main~1").unwrap(), first);
    }

    #[test]
    fn resolve_revision_reports_missing() {
        let (fixture, _) = repo_with_branches(&["main"]);
        let repo = fixture.open();
        assert!(matches!(
            repo.resolve_revision("does-not-exist"),
            Err(AppError::RevisionNotFound(_))
        ));
        assert!(matches!(
            repo.resolve_revision(""),
            Err(AppError::RevisionNotFound(_))
        ));
    }
}
