//! Axum HTTP surface for the translation pipeline.
//!
//! `POST /nl-to-sql` takes `{question, schema?, db_name?}` and answers
//! `{sql_query}` or `{error}`; `GET /` is a liveness probe.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::Settings;
use crate::generator::{GenerationError, SqlGenerator, WorkerGenerator};
use crate::pipeline::{Pipeline, PipelineError, Request, Response};

/// Application state shared across handlers
pub struct AppState {
    pub pipeline: Pipeline,
    pub generator: Arc<dyn SqlGenerator>,
}

impl AppState {
    pub fn new(pipeline: Pipeline, generator: Arc<dyn SqlGenerator>) -> Self {
        Self {
            pipeline,
            generator,
        }
    }
}

/// Build the axum router with all routes
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(home))
        .route("/nl-to-sql", post(nl_to_sql))
        .layer(cors)
        .with_state(state)
}

/// Start the web server with the configured generator worker.
pub async fn serve(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let generator = WorkerGenerator::spawn_with_settings(&settings.generator).await?;
    let state = Arc::new(AppState::new(
        Pipeline::from_settings(&settings.pipeline),
        Arc::new(generator),
    ));
    let app = router(state);

    let addr = settings.server.address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "sqlmend listening");

    axum::serve(listener, app).await?;
    Ok(())
}

// ============================================================================
// API Handlers
// ============================================================================

#[derive(Serialize)]
struct StatusMessage {
    message: &'static str,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// GET / - liveness probe
async fn home() -> Json<StatusMessage> {
    Json(StatusMessage {
        message: "NL-to-SQL API is running!",
    })
}

/// POST /nl-to-sql - translate a question
async fn nl_to_sql(
    State(state): State<Arc<AppState>>,
    Json(request): Json<Request>,
) -> Result<Json<Response>, (StatusCode, Json<ErrorBody>)> {
    match state
        .pipeline
        .translate(&request, state.generator.as_ref())
        .await
    {
        Ok(sql_query) => Ok(Json(Response { sql_query })),
        Err(e) => Err((
            status_for(&e),
            Json(ErrorBody {
                error: e.to_string(),
            }),
        )),
    }
}

fn status_for(error: &PipelineError) -> StatusCode {
    match error {
        PipelineError::Generation(GenerationError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
        PipelineError::Generation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    }
}
