use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::core::config::AppConfig;
use crate::core::models::response::ApiResponse;
use crate::core::models::usage::Window;
use crate::core::providers::fetch;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
}

#[derive(Debug, Deserialize)]
struct UsageQuery {
    #[serde(rename = "timeRange")]
    time_range: Option<String>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/google-cloud/usage", get(google_cloud_usage))
        .route("/api/supabase/usage", get(supabase_usage))
        .with_state(state)
}

pub async fn serve(config: AppConfig, bind: &str) -> anyhow::Result<()> {
    let addr: SocketAddr = bind.parse()?;
    let app = build_router(AppState {
        config: Arc::new(config),
    });
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

fn envelope<T: Serialize>(status: StatusCode, body: ApiResponse<T>) -> Response {
    (status, Json(body)).into_response()
}

/// Run a fetch on its own task so a panic inside it becomes a 500 instead of
/// tearing down the connection.
async fn isolated<T, F>(fut: F) -> Response
where
    T: Serialize + Send + 'static,
    F: std::future::Future<Output = T> + Send + 'static,
{
    match tokio::spawn(fut).await {
        Ok(data) => envelope(StatusCode::OK, ApiResponse::ok(data)),
        Err(e) => {
            tracing::error!("Usage request failed: {}", e);
            envelope(
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiResponse::<()>::failure("Internal server error"),
            )
        }
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

async fn google_cloud_usage(
    State(st): State<AppState>,
    Query(query): Query<UsageQuery>,
) -> Response {
    let window = match query.time_range.as_deref() {
        None => Window::default(),
        Some(raw) => match raw.parse::<Window>() {
            Ok(w) => w,
            Err(e) => {
                return envelope(StatusCode::BAD_REQUEST, ApiResponse::<()>::failure(e.to_string()))
            }
        },
    };

    let config = st.config.clone();
    isolated(async move { fetch::gemini_usage(window, &config.gemini, None).await.data }).await
}

async fn supabase_usage(State(st): State<AppState>) -> Response {
    let config = st.config.clone();
    isolated(async move { fetch::supabase_quota(&config.supabase, None).await.data }).await
}
