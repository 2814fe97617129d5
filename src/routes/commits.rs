use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::AppState;
use crate::error::Result;
use crate::git::repository::parse_oid;
use crate::models::{CommitDiffResponse, CommitListResponse};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/repos/{repo}/log", get(get_log))
        .route("/api/v1/repos/{repo}/commit/{hash}", get(get_commit))
        .route("/api/v1/repos/{repo}/commit/{hash}/patch", get(get_patch))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct LogQuery {
    #[serde(rename = "ref")]
    revision: Option<String>,
    limit: Option<usize>,
}

async fn get_log(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<LogQuery>,
) -> Result<Json<CommitListResponse>> {
    let repo = state.registry.require(&name)?;
    let revision = match query.revision.filter(|r| !r.is_empty()) {
        Some(revision) => revision,
        None => repo.find_default_branch()?.0,
    };
    Ok(Json(repo.list_commits(&revision, query.limit)?))
}

async fn get_commit(
    State(state): State<AppState>,
    Path((name, hash)): Path<(String, String)>,
) -> Result<Json<CommitDiffResponse>> {
    let repo = state.registry.require(&name)?;
    let oid = parse_oid(&hash)?;

    let commit = repo.commit_detail(oid)?;
    let changes = repo.changes_between(oid)?;
    let rendered = repo.render_unified(&changes)?;

    Ok(Json(CommitDiffResponse {
        repository: repo.name.clone(),
        commit,
        changes,
        stats: rendered.stats,
        diff: rendered.text,
    }))
}

async fn get_patch(
    State(state): State<AppState>,
    Path((name, hash)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    let repo = state.registry.require(&name)?;
    let patch = repo.render_patch_envelope(parse_oid(&hash)?)?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], patch))
}
