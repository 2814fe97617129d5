use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use git2::Oid;
use serde::Deserialize;

use super::AppState;
use crate::error::{AppError, Result};
use crate::git::tree::{is_binary, normalize_path, parent_path, TreeNode};
use crate::git::GitRepository;
use crate::models::TreeResponse;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/repos/{repo}/tree", get(get_tree))
        .route("/api/v1/repos/{repo}/raw", get(get_raw))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct TreeQuery {
    #[serde(rename = "ref")]
    revision: Option<String>,
    #[serde(default)]
    path: String,
}

/// Resolve the requested revision, falling back to the default branch.
fn resolve_ref(repo: &GitRepository, revision: Option<&str>) -> Result<(String, Oid)> {
    match revision.filter(|r| !r.is_empty()) {
        Some(revision) => Ok((revision.to_string(), repo.resolve_revision(revision)?)),
        None => repo.find_default_branch(),
    }
}

async fn get_tree(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<TreeQuery>,
) -> Result<Json<TreeResponse>> {
    let repo = state.registry.require(&name)?;
    let (revision, commit) = resolve_ref(&repo, query.revision.as_deref())?;

    let response = match repo.resolve_path(commit, &query.path)? {
        TreeNode::Directory(entries) => TreeResponse::Directory {
            repository: repo.name.clone(),
            revision,
            path: normalize_path(&query.path),
            parent_path: parent_path(&query.path),
            entries,
        },
        TreeNode::File(entry) => {
            let content = repo.read_blob(Oid::from_str(&entry.oid)?)?;
            let binary = is_binary(&content);
            TreeResponse::File {
                repository: repo.name.clone(),
                revision,
                path: entry.path.clone(),
                parent_path: parent_path(&entry.path),
                is_binary: binary,
                content: (!binary).then(|| String::from_utf8_lossy(&content).to_string()),
                entry,
            }
        }
    };

    Ok(Json(response))
}

async fn get_raw(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<TreeQuery>,
) -> Result<impl IntoResponse> {
    let repo = state.registry.require(&name)?;
    let (_, commit) = resolve_ref(&repo, query.revision.as_deref())?;

    let entry = match repo.resolve_path(commit, &query.path)? {
        TreeNode::File(entry) => entry,
        TreeNode::Directory(_) => {
            return Err(AppError::InvalidPath(format!("{} is a directory", query.path)));
        }
    };
    let content = repo.read_blob(Oid::from_str(&entry.oid)?)?;
    let content_type = if is_binary(&content) {
        "application/octet-stream"
    } else {
        "text/plain; charset=utf-8"
    };

    Ok(([(header::CONTENT_TYPE, content_type)], content))
}
