use git2::{ObjectType, Oid, Repository};

use crate::error::{AppError, Result};
use crate::git::repository::{find_commit, GitRepository};
use crate::models::{EntryMode, TreeEntry};

/// Bytes inspected for a NUL when deciding whether a blob is binary.
const BINARY_SNIFF_LEN: usize = 8000;

/// File names probed, in order, when looking for a README at the root.
const README_NAMES: [&str; 8] = [
    "readme",
    "README",
    "readme.md",
    "README.md",
    "readme.txt",
    "README.txt",
    "readme.markdown",
    "README.markdown",
];

/// What a path inside a commit's tree points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    Directory(Vec<TreeEntry>),
    File(TreeEntry),
}

impl GitRepository {
    pub fn list_root(&self, commit: Oid) -> Result<Vec<TreeEntry>> {
        match self.resolve_path(commit, "")? {
            TreeNode::Directory(entries) => Ok(entries),
            TreeNode::File(_) => Err(AppError::Internal("root tree is not a directory".to_string())),
        }
    }

    /// Walk `path` one tree level per segment starting at the commit's root.
    pub fn resolve_path(&self, commit: Oid, path: &str) -> Result<TreeNode> {
        self.with_repo(|repo| {
            let commit = find_commit(repo, commit)?;
            let mut tree = commit.tree()?;
            let segments: Vec<&str> = split_path(path).collect();

            let Some((last, parents)) = segments.split_last() else {
                return Ok(TreeNode::Directory(list_tree(repo, &tree, "")?));
            };

            for segment in parents {
                let next = {
                    let entry = tree
                        .get_name(segment)
                        .ok_or_else(|| AppError::PathNotFound(path.to_string()))?;
                    if entry.kind() != Some(ObjectType::Tree) {
                        return Err(AppError::PathNotFound(path.to_string()));
                    }
                    entry.id()
                };
                tree = repo.find_tree(next)?;
            }

            let normalized = normalize_path(path);
            let entry = tree
                .get_name(last)
                .ok_or_else(|| AppError::PathNotFound(path.to_string()))?;

            match entry.kind() {
                Some(ObjectType::Tree) => {
                    let subtree = repo.find_tree(entry.id())?;
                    Ok(TreeNode::Directory(list_tree(repo, &subtree, &normalized)?))
                }
                Some(ObjectType::Blob) => {
                    let entry = to_tree_entry(repo, &entry, &normalized)
                        .ok_or_else(|| AppError::PathNotFound(path.to_string()))?;
                    Ok(TreeNode::File(entry))
                }
                _ => Err(AppError::PathNotFound(path.to_string())),
            }
        })
    }

    /// Materialize a blob's bytes.
    pub fn read_blob(&self, oid: Oid) -> Result<Vec<u8>> {
        self.with_repo(|repo| read_blob(repo, oid))
    }

    /// First README-like file at the root of `commit`, with its content.
    pub fn find_readme(&self, commit: Oid) -> Result<Option<(TreeEntry, Vec<u8>)>> {
        let entries = self.list_root(commit)?;
        let Some(entry) = README_NAMES
            .iter()
            .find_map(|name| entries.iter().find(|e| e.name == *name && !e.mode.is_directory()))
        else {
            return Ok(None);
        };

        let oid = Oid::from_str(&entry.oid)?;
        let content = self.read_blob(oid)?;
        Ok(Some((entry.clone(), content)))
    }
}

pub fn read_blob(repo: &Repository, oid: Oid) -> Result<Vec<u8>> {
    repo.find_blob(oid)
        .map(|blob| blob.content().to_vec())
        .map_err(|e| {
            tracing::warn!("Failed to read blob {}: {}", oid, e.message());
            AppError::BlobRead(oid.to_string())
        })
}

/// Git's heuristic: a NUL byte near the start means binary.
pub fn is_binary(content: &[u8]) -> bool {
    content[..content.len().min(BINARY_SNIFF_LEN)].contains(&0)
}

/// Path with its last segment removed, for breadcrumbs.
///
/// Returns `None` at the root.
pub fn parent_path(path: &str) -> Option<String> {
    let segments: Vec<&str> = split_path(path).collect();
    match segments.split_last() {
        None => None,
        Some((_, parents)) => Some(parents.join("/")),
    }
}

/// `path` with empty segments dropped, as `resolve_path` walks it.
pub fn normalize_path(path: &str) -> String {
    split_path(path).collect::<Vec<_>>().join("/")
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn list_tree(repo: &Repository, tree: &git2::Tree, base_path: &str) -> Result<Vec<TreeEntry>> {
    let mut entries: Vec<TreeEntry> = tree
        .iter()
        .filter_map(|entry| {
            let name = entry.name().unwrap_or("");
            let path = if base_path.is_empty() {
                name.to_string()
            } else {
                format!("{}/{}", base_path, name)
            };
            to_tree_entry(repo, &entry, &path)
        })
        .collect();

    // Sort: directories first, then everything else, alphabetically
    entries.sort_by(|a, b| match (a.mode.is_directory(), b.mode.is_directory()) {
        (true, false) => std::cmp::Ordering::Less,
        (false, true) => std::cmp::Ordering::Greater,
        _ => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
    });

    Ok(entries)
}

fn to_tree_entry(repo: &Repository, entry: &git2::TreeEntry, path: &str) -> Option<TreeEntry> {
    let mode = EntryMode::from_filemode(entry.filemode())?;
    let size = match entry.kind() {
        Some(ObjectType::Blob) => repo
            .find_blob(entry.id())
            .ok()
            .map(|blob| blob.size() as u64),
        _ => None,
    };

    Some(TreeEntry {
        name: entry.name().unwrap_or("").to_string(),
        path: path.to_string(),
        mode,
        oid: entry.id().to_string(),
        size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Fixture, TestRepo};

    fn fixture() -> (TestRepo, Oid) {
        let fixture = TestRepo::new("tree");
        let oid = fixture.commit_fixtures(
            "main",
            &[
                ("README.md", Fixture::File(b"# Hello\n")),
                ("src/main.rs", Fixture::File(b"fn main() {}\n")),
                ("src/lib/util.rs", Fixture::File(b"pub fn util() {}\n")),
                ("bin/run.sh", Fixture::Executable(b"#!/bin/sh\n")),
                ("link", Fixture::Symlink("README.md")),
                ("zebra.txt", Fixture::File(b"z\n")),
            ],
            "init",
            &[],
        );
        (fixture, oid)
    }

    #[test]
    fn root_lists_directories_first() {
        let (fixture, oid) = fixture();
        let entries = fixture.open().list_root(oid).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["bin", "src", "link", "README.md", "zebra.txt"]);
        assert_eq!(entries[0].mode, EntryMode::Directory);
        assert_eq!(entries[2].mode, EntryMode::Symlink);
        assert_eq!(entries[3].size, Some(8));
    }

    #[test]
    fn resolve_nested_directory() {
        let (fixture, oid) = fixture();
        let node = fixture.open().resolve_path(oid, "src").unwrap();
        let TreeNode::Directory(entries) = node else {
            panic!("expected directory");
        };
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["src/lib", "src/main.rs"]);
    }

    #[test]
    fn resolve_file_round_trips_content() {
        let (fixture, oid) = fixture();
        let repo = fixture.open();
        let TreeNode::File(entry) = repo.resolve_path(oid, "src/lib/util.rs").unwrap() else {
            panic!("expected file");
        };
        assert_eq!(entry.path, "src/lib/util.rs");
        assert_eq!(entry.mode, EntryMode::File);

        let content = repo.read_blob(Oid::from_str(&entry.oid).unwrap()).unwrap();
        assert_eq!(content, b"pub fn util() {}\n");
    }

    #[test]
    fn resolve_ignores_redundant_slashes() {
        let (fixture, oid) = fixture();
        let node = fixture.open().resolve_path(oid, "/src//main.rs/").unwrap();
        let TreeNode::File(entry) = node else {
            panic!("expected file");
        };
        assert_eq!(entry.path, "src/main.rs");
    }

    #[test]
    fn executable_mode_is_reported() {
        let (fixture, oid) = fixture();
        let TreeNode::File(entry) = fixture.open().resolve_path(oid, "bin/run.sh").unwrap() else {
            panic!("expected file");
        };
        assert_eq!(entry.mode, EntryMode::Executable);
    }

    #[test]
    fn missing_segments_are_not_found() {
        let (fixture, oid) = fixture();
        let repo = fixture.open();
        assert!(matches!(
            repo.resolve_path(oid, "nope/main.rs"),
            Err(AppError::PathNotFound(_))
        ));
        assert!(matches!(
            repo.resolve_path(oid, "src/missing.rs"),
            Err(AppError::PathNotFound(_))
        ));
    }

    #[test]
    fn blob_used_as_directory_is_not_found() {
        let (fixture, oid) = fixture();
        assert!(matches!(
            fixture.open().resolve_path(oid, "zebra.txt/inner"),
            Err(AppError::PathNotFound(_))
        ));
    }

    #[test]
    fn unreadable_blob_is_reported() {
        let (fixture, _) = fixture();
        let missing = Oid::from_str("0123456789abcdef0123456789abcdef01234567").unwrap();
        assert!(matches!(
            fixture.open().read_blob(missing),
            Err(AppError::BlobRead(_))
        ));
    }

    #[test]
    fn readme_is_found_at_root() {
        let (fixture, oid) = fixture();
        let (entry, content) = fixture.open().find_readme(oid).unwrap().unwrap();
        assert_eq!(entry.name, "README.md");
        assert_eq!(content, b"# Hello\n");
    }

    #[test]
    fn nul_bytes_mark_binary() {
        assert!(!is_binary(b"plain text\n"));
        assert!(is_binary(b"PNG\x00\x01"));
        let mut late = vec![b'a'; 9000];
        late[8500] = 0;
        assert!(!is_binary(&late));
    }

    #[test]
    fn parent_path_strips_last_segment() {
        assert_eq!(parent_path("a/b/c").as_deref(), Some("a/b"));
        assert_eq!(parent_path("a").as_deref(), Some(""));
        assert_eq!(parent_path("a/b/").as_deref(), Some("a"));
        assert_eq!(parent_path(""), None);
    }

    #[test]
    fn normalized_paths_drop_empty_segments() {
        assert_eq!(normalize_path("/src//lib/"), "src/lib");
        assert_eq!(normalize_path("//"), "");
    }
}
