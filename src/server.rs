use std::sync::Arc;
use axum::{routing::post, Router, Json};
use tower_http::cors::{CorsLayer, Any};
use serde::Serialize;
use axum::http::StatusCode;
use tracing::{info, warn};
use crate::error::Result;
use crate::interface::SearchInterface;
use crate::quality::Statistic;
use crate::search::{SearchConfig, StopReason, Subgroup};

#[derive(Serialize)]
pub struct SearchResponse {
    pub status: String,
    pub elapsed_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub population: Option<Statistic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<StopReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<Subgroup>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub within: Option<Vec<Subgroup>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
impl SearchResponse {
    fn failed(elapsed_ms: f64, msg: String) -> Self {
        Self { status: "error".into(), elapsed_ms, population: None, stop: None, results: None, within: None, error: Some(msg) }
    }
}

pub fn router(interface: Arc<SearchInterface>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::POST])
        .allow_headers(Any);
    Router::new()
        .route("/v1/search", post(move |Json(config): Json<SearchConfig>| {
        let iface = Arc::clone(&interface);
        async move {
            // The search is CPU bound and spawns its own worker threads.
            let started = std::time::Instant::now();
            let outcome = tokio::task::spawn_blocking(move || iface.run_sync(config)).await.map_err(|e| {
                warn!(error=%e, "Join error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Join error")
            })?;
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            match outcome {
                Ok(outcome) => {
                    info!(ms=elapsed_ms, results=outcome.results.len(), stop=?outcome.stop, "search request complete");
                    let body = SearchResponse { status: "ok".into(), elapsed_ms, population: Some(outcome.population), stop: Some(outcome.stop), results: Some(outcome.results), within: Some(outcome.within), error: None };
                    Ok::<_, (StatusCode, &'static str)>((StatusCode::OK, Json(body)))
                }
                Err(e) => {
                    let status = if e.is_config() { StatusCode::BAD_REQUEST } else { StatusCode::INTERNAL_SERVER_ERROR };
                    let msg = format!("{e}");
                    warn!(%msg, code=%status.as_u16(), "search error");
                    Ok::<_, (StatusCode, &'static str)>((status, Json(SearchResponse::failed(elapsed_ms, msg))))
                }
            }
        }
    }))
    .layer(cors)
}

pub async fn serve(bind: &str, interface: Arc<SearchInterface>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(%bind, records = interface.records().len(), "listening");
    axum::serve(listener, router(interface)).await?;
    Ok(())
}
