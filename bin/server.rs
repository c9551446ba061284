// Entity Compare - Web Server
// JSON API over the comparison pipeline

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use entity_compare::{
    resolve_selection, CompareError, ComparisonPipeline, Entity, FetchConfig, GraphView,
    IndexedFlows, KnowledgeBase, Selection, Stats, Suggestion, SunburstNode, WikidataClient,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Shared application state
struct AppState<K: KnowledgeBase> {
    pipeline: Arc<ComparisonPipeline<K>>,
}

impl<K: KnowledgeBase> Clone for AppState<K> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
        }
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn failure(message: String) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message),
        }
    }
}

/// Everything a renderer needs for one comparison
#[derive(Serialize)]
struct CompareResponse {
    entity_a: Entity,
    entity_b: Entity,
    stats: Stats,
    flow: IndexedFlows,
    graph: GraphView,
    sunburst: SunburstNode,
    warnings: Vec<String>,
}

fn error_response(err: &CompareError) -> Response {
    let status = match err {
        CompareError::NotFound { .. } => StatusCode::NOT_FOUND,
        CompareError::TransientNetwork { .. } => StatusCode::SERVICE_UNAVAILABLE,
        CompareError::MalformedResponse { .. } => StatusCode::BAD_GATEWAY,
        CompareError::EmptyResult { .. } | CompareError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (status, Json(ApiResponse::failure(err.to_string()))).into_response()
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/search/:term - Suggestions for a free-text term
async fn search<K: KnowledgeBase + 'static>(
    State(state): State<AppState<K>>,
    Path(term): Path<String>,
) -> Response {
    match state.pipeline.knowledge_base().search(&term).await {
        Ok(suggestions) => (StatusCode::OK, Json(ApiResponse::ok(suggestions))).into_response(),
        Err(e) => {
            error!("Error searching for {}: {}", term, e);
            error_response(&e)
        }
    }
}

async fn resolve_id<K: KnowledgeBase>(kb: &K, input: &str) -> Result<String, Response> {
    match resolve_selection(kb, input).await {
        Ok(Selection::Direct(id)) => Ok(id),
        Ok(Selection::Suggested(Suggestion { id, .. })) => Ok(id),
        Ok(Selection::NoSelection) => Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::failure(format!("No entity found for \"{}\"", input))),
        )
            .into_response()),
        Err(e) => Err(error_response(&e)),
    }
}

/// GET /api/compare/:a/:b - Stats plus flow, graph and sunburst views
async fn compare<K: KnowledgeBase + 'static>(
    State(state): State<AppState<K>>,
    Path((a, b)): Path<(String, String)>,
) -> Response {
    let kb = state.pipeline.knowledge_base();

    let id_a = match resolve_id(kb, &a).await {
        Ok(id) => id,
        Err(response) => return response,
    };
    let id_b = match resolve_id(kb, &b).await {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.pipeline.run(&id_a, &id_b).await {
        Ok(run) => {
            let response = CompareResponse {
                flow: run.visualization.flow.to_indexed(),
                graph: run.visualization.graph,
                sunburst: run.visualization.sunburst,
                warnings: run.warnings.iter().map(|w| w.to_string()).collect(),
                entity_a: run.result.entity_a,
                entity_b: run.result.entity_b,
                stats: run.stats,
            };

            (StatusCode::OK, Json(ApiResponse::ok(response))).into_response()
        }
        Err(e) => {
            error!("Error comparing {} and {}: {}", id_a, id_b, e);
            error_response(&e)
        }
    }
}

fn router<K: KnowledgeBase + 'static>(pipeline: ComparisonPipeline<K>) -> Router {
    let state = AppState {
        pipeline: Arc::new(pipeline),
    };

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/search/:term", get(search::<K>))
        .route("/compare/:a/:b", get(compare::<K>))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    println!("🌐 Entity Compare - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = FetchConfig::from_env().context("Invalid configuration")?;
    println!("✓ Knowledge base: {}", config.api_url);

    let client = WikidataClient::new(config.clone())?;
    let app = router(ComparisonPipeline::new(client, config));

    let addr = std::env::var("COMPARE_SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!(addr = %addr, "listening");

    println!("\n🚀 Server running on http://{}", addr);
    println!("   API: http://{}/api/compare/Q42/Q5", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
