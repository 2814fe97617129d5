//! HTTP route handlers - maps endpoints to registry and git operations.
//!
//! Each submodule defines routes for a feature area:
//! - `repositories`: Repository index and registry reload
//! - `refs`: Landing summary, branches/tags, default branch, revision lookup
//! - `tree`: Directory listing, file content and raw blobs
//! - `commits`: Commit log, commit view with diff, mailbox patch
//! - `smart_http`: Git Smart HTTP clone/fetch/push endpoints

pub mod commits;
pub mod refs;
pub mod repositories;
pub mod smart_http;
pub mod tree;

use std::sync::Arc;

use axum::Router;

use crate::git::SharedRegistry;
use crate::smart_http::Bridge;

/// Title and description shown on the repository index.
#[derive(Debug, Clone)]
pub struct SiteInfo {
    pub title: String,
    pub description: String,
}

#[derive(Clone)]
pub struct AppState {
    pub registry: SharedRegistry,
    pub bridge: Bridge,
    pub site: Arc<SiteInfo>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(repositories::routes(state.clone()))
        .merge(refs::routes(state.clone()))
        .merge(tree::routes(state.clone()))
        .merge(commits::routes(state.clone()))
        .merge(smart_http::routes(state))
}
