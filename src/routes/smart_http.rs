use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tower_http::decompression::RequestDecompressionLayer;

use super::AppState;
use crate::error::Result;
use crate::smart_http::Service;

pub fn routes(state: AppState) -> Router {
    let pack_routes = Router::new()
        .route("/{repo}/git-upload-pack", post(upload_pack))
        .route("/{repo}/git-receive-pack", post(receive_pack))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestDecompressionLayer::new());

    Router::new()
        .route("/{repo}/info/refs", get(info_refs))
        .merge(pack_routes)
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct InfoRefsQuery {
    service: Option<String>,
}

fn git_protocol(headers: &HeaderMap) -> Option<&str> {
    headers.get("git-protocol").and_then(|v| v.to_str().ok())
}

fn pack_response(content_type: &'static str, body: Body) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response()
}

async fn info_refs(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<InfoRefsQuery>,
    headers: HeaderMap,
) -> Result<Response> {
    let service = Service::from_name(query.service.as_deref().unwrap_or(""))?;
    let repo = state.registry.require(&name)?;
    tracing::info!("Advertising {} refs for {}", service.verb(), repo.name);

    let body = state
        .bridge
        .advertise_refs(service, &repo.path, git_protocol(&headers))?;
    Ok(pack_response(service.advertisement_content_type(), body))
}

async fn upload_pack(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    run_service(state, Service::UploadPack, &name, &headers, body)
}

async fn receive_pack(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    run_service(state, Service::ReceivePack, &name, &headers, body)
}

fn run_service(
    state: AppState,
    service: Service,
    name: &str,
    headers: &HeaderMap,
    input: Bytes,
) -> Result<Response> {
    let repo = state.registry.require(name)?;
    tracing::info!(
        "Running {} for {} with {} byte request",
        service.verb(),
        repo.name,
        input.len()
    );

    let body = state
        .bridge
        .stateless_rpc(service, &repo.path, input, git_protocol(headers))
        .map_err(|e| {
            tracing::warn!("{} for {} failed to start: {}", service.verb(), repo.name, e);
            e
        })?;
    Ok(pack_response(service.result_content_type(), body))
}
