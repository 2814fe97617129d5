use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use super::AppState;
use crate::error::{AppError, Result};
use crate::models::{ReloadResponse, RepositoryIndex};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/repositories", get(list_repositories))
        .route("/api/v1/reload", post(reload))
        .with_state(state)
}

async fn list_repositories(State(state): State<AppState>) -> Result<Json<RepositoryIndex>> {
    let repositories = state
        .registry
        .list()
        .iter()
        .map(|repo| repo.info())
        .collect::<Result<Vec<_>>>()?;

    Ok(Json(RepositoryIndex {
        title: state.site.title.clone(),
        description: state.site.description.clone(),
        repositories,
    }))
}

async fn reload(State(state): State<AppState>) -> Result<Json<ReloadResponse>> {
    let registry = state.registry.clone();
    let repositories = tokio::task::spawn_blocking(move || registry.reload())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(Json(ReloadResponse { repositories }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::Value;

    use crate::test_support::{init_repo_at, request, test_app};

    #[tokio::test]
    async fn index_lists_repositories_by_name() {
        let root = tempfile::TempDir::new().unwrap();
        init_repo_at(root.path(), "zeta");
        init_repo_at(root.path(), "alpha");

        let app = test_app(root.path());
        let (status, body) = request(&app, "GET", "/api/v1/repositories").await;
        assert_eq!(status, StatusCode::OK);

        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["title"], "Test Repositories");
        let names: Vec<&str> = json["repositories"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[tokio::test]
    async fn reload_picks_up_new_repositories() {
        let root = tempfile::TempDir::new().unwrap();
        init_repo_at(root.path(), "first");
        let app = test_app(root.path());

        init_repo_at(root.path(), "second");
        let (status, body) = request(&app, "POST", "/api/v1/reload").await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["repositories"], 2);

        let (status, _) = request(&app, "GET", "/api/v1/repos/second/refs").await;
        assert_eq!(status, StatusCode::OK);
    }
}
