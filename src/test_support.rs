//! Repository fixtures for unit tests.
//!
//! Repositories are bare and built directly through `git2`, so trees and
//! commits are exact and independent of the local git configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use git2::{FileMode, Oid, Repository, Signature, Time};
use tempfile::TempDir;
use tower::ServiceExt;

use crate::git::{GitRepository, Registry};
use crate::routes::{create_router, AppState, SiteInfo};
use crate::smart_http::Bridge;

/// A temporary root directory holding one bare repository named `name`.
pub struct TestRepo {
    root: TempDir,
    name: String,
    repo: Repository,
}

/// File content plus mode for fixtures that need more than a plain file.
pub enum Fixture<'a> {
    File(&'a [u8]),
    Executable(&'a [u8]),
    Symlink(&'a str),
}

impl TestRepo {
    pub fn new(name: &str) -> Self {
        let root = TempDir::new().expect("failed to create temp dir");
        let repo = Repository::init_bare(root.path().join(name)).expect("failed to init repo");
        Self {
            root,
            name: name.to_string(),
            repo,
        }
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().join(&self.name)
    }

    pub fn open(&self) -> GitRepository {
        GitRepository::open(&self.name, self.path()).expect("failed to open fixture")
    }

    /// Commit `files` as the complete tree on `branch`.
    pub fn commit(&self, branch: &str, files: &[(&str, &str)], message: &str, parents: &[Oid]) -> Oid {
        let fixtures: Vec<(&str, Fixture)> = files
            .iter()
            .map(|(path, data)| (*path, Fixture::File(data.as_bytes())))
            .collect();
        self.commit_fixtures(branch, &fixtures, message, parents)
    }

    pub fn commit_fixtures(
        &self,
        branch: &str,
        files: &[(&str, Fixture)],
        message: &str,
        parents: &[Oid],
    ) -> Oid {
        let tree_oid = self.write_tree(files);
        let tree = self.repo.find_tree(tree_oid).unwrap();
        let sig = signature();
        let parents: Vec<git2::Commit> = parents
            .iter()
            .map(|oid| self.repo.find_commit(*oid).unwrap())
            .collect();
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();

        let commit = self
            .repo
            .commit(None, &sig, &sig, message, &tree, &parent_refs)
            .unwrap();
        self.repo
            .reference(&format!("refs/heads/{}", branch), commit, true, "fixture")
            .unwrap();
        commit
    }

    pub fn branch(&self, name: &str, target: Oid) {
        self.repo
            .reference(&format!("refs/heads/{}", name), target, true, "fixture")
            .unwrap();
    }

    pub fn lightweight_tag(&self, name: &str, target: Oid) {
        self.repo
            .reference(&format!("refs/tags/{}", name), target, true, "fixture")
            .unwrap();
    }

    pub fn annotated_tag(&self, name: &str, target: Oid) -> Oid {
        let object = self.repo.find_object(target, None).unwrap();
        self.repo
            .tag(name, &object, &signature(), "release", false)
            .unwrap()
    }

    pub fn write_tree(&self, files: &[(&str, Fixture)]) -> Oid {
        let entries: Vec<(Vec<&str>, &Fixture)> = files
            .iter()
            .map(|(path, fixture)| (path.split('/').collect(), fixture))
            .collect();
        build_tree(&self.repo, &entries)
    }
}

fn build_tree(repo: &Repository, entries: &[(Vec<&str>, &Fixture)]) -> Oid {
    let mut builder = repo.treebuilder(None).unwrap();
    let mut subdirs: BTreeMap<&str, Vec<(Vec<&str>, &Fixture)>> = BTreeMap::new();

    for (segments, fixture) in entries {
        if segments.len() > 1 {
            subdirs
                .entry(segments[0])
                .or_default()
                .push((segments[1..].to_vec(), *fixture));
            continue;
        }
        let (oid, mode) = match fixture {
            Fixture::File(data) => (repo.blob(data).unwrap(), FileMode::Blob),
            Fixture::Executable(data) => (repo.blob(data).unwrap(), FileMode::BlobExecutable),
            Fixture::Symlink(target) => (repo.blob(target.as_bytes()).unwrap(), FileMode::Link),
        };
        builder.insert(segments[0], oid, mode.into()).unwrap();
    }

    for (name, children) in subdirs {
        let oid = build_tree(repo, &children);
        builder.insert(name, oid, FileMode::Tree.into()).unwrap();
    }

    builder.write().unwrap()
}

pub fn signature() -> Signature<'static> {
    Signature::new("Test User", "test@example.com", &Time::new(1_700_000_000, 120)).unwrap()
}

/// Create a bare repository named `name` under `root` with one commit on `main`.
pub fn init_repo_at(root: &Path, name: &str) -> Oid {
    let repo = Repository::init_bare(root.join(name)).unwrap();
    let blob = repo.blob(name.as_bytes()).unwrap();
    let mut builder = repo.treebuilder(None).unwrap();
    builder.insert("NAME", blob, FileMode::Blob.into()).unwrap();
    let tree = repo.find_tree(builder.write().unwrap()).unwrap();
    let sig = signature();
    repo.commit(Some("refs/heads/main"), &sig, &sig, "init", &tree, &[])
        .unwrap()
}

/// Router over every repository under `root`, using `git` from `PATH`.
pub fn test_app(root: &Path) -> Router {
    let registry = Arc::new(Registry::new(root));
    registry.reload().unwrap();
    create_router(AppState {
        registry,
        bridge: Bridge::new("git"),
        site: Arc::new(SiteInfo {
            title: "Test Repositories".to_string(),
            description: "Fixtures".to_string(),
        }),
    })
}

pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

/// Issue a body-less request and collect the response body.
pub async fn request(app: &Router, method: &str, uri: &str) -> (StatusCode, Bytes) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = send(app, request).await;
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body)
}
