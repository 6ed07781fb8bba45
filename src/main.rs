use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scorebox::event::EventBus;
use scorebox::feed::LogFeed;
use scorebox::room::{handlers, MatchRegistry};
use scorebox::shared::AppState;
use scorebox::store::{InMemoryMatchStore, MatchStore, PostgresMatchStore};
use scorebox::websockets::{websocket_handler, InMemoryConnectionManager};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scorebox=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting scorebox scoring server");

    // Durable store when a database is configured, in-memory otherwise
    let store: Arc<dyn MatchStore + Send + Sync> = match std::env::var("DATABASE_URL") {
        Ok(database_url) => {
            let pool = sqlx::PgPool::connect(&database_url)
                .await
                .expect("Failed to connect to database");
            info!("Using PostgreSQL match store");
            Arc::new(PostgresMatchStore::new(pool))
        }
        Err(_) => {
            info!("DATABASE_URL not set, using in-memory match store");
            Arc::new(InMemoryMatchStore::new())
        }
    };

    let event_bus = EventBus::new();
    let feed = Arc::new(LogFeed);
    let registry = MatchRegistry::new(event_bus.clone(), store.clone(), feed.clone());
    let app_state = AppState::new(
        registry,
        Arc::new(InMemoryConnectionManager::new()),
        store,
        feed,
        event_bus,
    );

    let app = Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/matches",
            post(handlers::create_match).get(handlers::list_matches),
        )
        .route("/matches/:id/state", get(handlers::match_state))
        .route(
            "/matches/:id/innings/:selector/complete",
            post(handlers::complete_innings),
        )
        .route("/matches/:id/reset/:selector", post(handlers::reset_innings))
        .route("/matches/:id/dls", post(handlers::compute_dls))
        .route("/matches/:id/reconcile", post(handlers::reconcile))
        .route("/matches/:id/retire", post(handlers::retire_match))
        .route("/ws", get(websocket_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let addr = std::env::var("SCOREBOX_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    info!("Server running on http://{}", addr);
    axum::serve(listener, app).await.unwrap();
}
