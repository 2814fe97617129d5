use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::AppState;
use crate::error::Result;
use crate::models::{DefaultBranch, Readme, RefsResponse, RepositorySummary, ResolvedRevision};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/repos/{repo}", get(get_summary))
        .route("/api/v1/repos/{repo}/refs", get(get_refs))
        .route("/api/v1/repos/{repo}/default-branch", get(get_default_branch))
        .route("/api/v1/repos/{repo}/resolve", get(resolve_revision))
        .with_state(state)
}

async fn get_summary(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<RepositorySummary>> {
    let repo = state.registry.require(&name)?;

    let (branch, head) = repo.find_default_branch()?;
    let head_commit = repo.commit_summary(head)?;
    let branches = repo.list_branches()?;
    let tags = repo.list_tags()?;
    let readme = repo.find_readme(head)?.map(|(entry, content)| Readme {
        name: entry.name,
        content: String::from_utf8_lossy(&content).to_string(),
    });

    Ok(Json(RepositorySummary {
        name: repo.name.clone(),
        default_branch: DefaultBranch {
            name: branch,
            commit: head.to_string(),
        },
        head_commit,
        branches,
        tags,
        readme,
    }))
}

/// Branches and tags. A listing that fails is returned empty rather than
/// failing the whole view.
async fn get_refs(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<RefsResponse>> {
    let repo = state.registry.require(&name)?;

    let branches = repo.list_branches().unwrap_or_else(|e| {
        tracing::warn!("Listing branches of {} failed: {}", repo.name, e);
        Vec::new()
    });
    let tags = repo.list_tags().unwrap_or_else(|e| {
        tracing::warn!("Listing tags of {} failed: {}", repo.name, e);
        Vec::new()
    });

    Ok(Json(RefsResponse {
        repository: repo.name.clone(),
        branches,
        tags,
    }))
}

async fn get_default_branch(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<DefaultBranch>> {
    let repo = state.registry.require(&name)?;
    let (name, commit) = repo.find_default_branch()?;
    Ok(Json(DefaultBranch {
        name,
        commit: commit.to_string(),
    }))
}

#[derive(Debug, Deserialize)]
struct ResolveQuery {
    #[serde(default)]
    rev: String,
}

async fn resolve_revision(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<ResolveQuery>,
) -> Result<Json<ResolvedRevision>> {
    let repo = state.registry.require(&name)?;
    let commit = repo.resolve_revision(&query.rev)?;
    Ok(Json(ResolvedRevision {
        revision: query.rev,
        commit: commit.to_string(),
    }))
}
