//! bouwrag API Gateway
//!
//! HTTP surface over the retrieval core.
//! Handles:
//! - Single-shot and multi-hop retrieval
//! - The legal RAG agent
//! - Table-aware chunk formatting
//! - Observability (logging, metrics, request ids)

mod handlers;
mod middleware;

use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use bouwrag_common::{
    config::{AppConfig, ObservabilityConfig},
    db::DbPool,
    embeddings::create_embedder,
    llm::create_chat_model,
    metrics,
    ChatModel, Embedder,
};
use bouwrag_context::LegalRagAgent;
use bouwrag_search::{ChunkStore, ContentRetriever, MultiHopRetriever, PgChunkStore};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub retriever: Arc<ContentRetriever>,
    pub multi_hop: Arc<MultiHopRetriever>,
    pub agent: Arc<LegalRagAgent>,
}

impl AppState {
    /// Wire the services over an already-opened store
    pub fn from_parts(
        config: AppConfig,
        db: DbPool,
        store: Arc<dyn ChunkStore>,
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn ChatModel>,
    ) -> Self {
        let retriever = Arc::new(ContentRetriever::new(
            store,
            embedder,
            config.retrieval.clone(),
            config.embedding.dimension,
        ));
        let multi_hop = Arc::new(MultiHopRetriever::new(
            retriever.clone(),
            config.multi_hop.clone(),
        ));
        let agent = Arc::new(LegalRagAgent::new(
            model,
            multi_hop.clone(),
            config.agent.clone(),
        ));

        Self {
            config: Arc::new(config),
            db,
            retriever,
            multi_hop,
            agent,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;

    init_tracing(&config.observability);
    info!("Starting bouwrag API Gateway v{}", bouwrag_common::VERSION);

    install_metrics_exporter(&config.observability)?;
    metrics::register_metrics();

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;

    let store = Arc::new(PgChunkStore::new(
        Arc::new(db.clone()),
        config.retrieval.text_search_config.clone(),
    ));
    let embedder = create_embedder(&config.embedding)?;
    let model = create_chat_model(&config.llm)?;
    info!(
        embedding_model = embedder.model_name(),
        chat_model = model.model_name(),
        dimension = config.embedding.dimension,
        "Model clients ready"
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let state = AppState::from_parts(config, db, store, embedder, model);

    // Build the router
    let app = create_router(state);

    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

fn install_metrics_exporter(config: &ObservabilityConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.metrics_port == 0 {
        info!("Metrics exporter disabled");
        return Ok(());
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            metrics::LATENCY_BUCKETS,
        )?
        .install()?;

    info!(%addr, service = %config.service_name, "Prometheus exporter listening");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let timeout = TimeoutLayer::new(state.config.request_timeout());

    let api_routes = Router::new()
        // Retrieval
        .route("/projects/{project_id}/search", post(handlers::search::search))
        .route(
            "/projects/{project_id}/chunks/{chunk_id}/similar",
            get(handlers::search::similar_chunks),
        )
        .route("/projects/{project_id}/multi-hop", post(handlers::multi_hop::multi_hop))
        // Agent
        .route("/projects/{project_id}/agent/query", post(handlers::agent::query))
        // Formatting
        .route("/format", post(handlers::format::format));

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/v2", api_routes)
        .route_layer(from_fn(middleware::metrics::track_metrics))
        .layer(
            ServiceBuilder::new()
                .layer(request_id)
                .layer(propagate_id)
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(timeout),
        )
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
