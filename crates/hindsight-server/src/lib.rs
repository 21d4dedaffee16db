//! HTTP API for Hindsight.
//!
//! Exposes the ingestion and search pipeline plus the thin presentation
//! routes (transcript reads, analytics aggregates) over axum. All real logic
//! lives in `hindsight-pipeline` and `hindsight-store`; this crate only maps
//! requests in and errors out.
//!
//! # Example
//!
//! ```ignore
//! use hindsight_server::{Server, ServerConfig};
//!
//! let server = Server::new(pipeline, ServerConfig::default());
//! server.run().await?;
//! ```

pub mod error;
pub mod routes;
pub mod state;

pub use error::{ErrorResponse, Result, ServerError};
pub use state::AppState;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use hindsight_pipeline::Pipeline;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind.
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: ([127, 0, 0, 1], 8080).into(),
        }
    }
}

impl ServerConfig {
    /// Set the bind address.
    pub fn with_bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }
}

/// The Hindsight HTTP server.
pub struct Server {
    state: AppState,
    config: ServerConfig,
}

impl Server {
    /// Create a server around a wired pipeline.
    pub fn new(pipeline: Arc<Pipeline>, config: ServerConfig) -> Self {
        Self {
            state: AppState::new(pipeline),
            config,
        }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        Router::new()
            .merge(routes::health_routes())
            .nest("/api", self.api_routes())
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    fn api_routes(&self) -> Router<AppState> {
        Router::new()
            .route("/ingest", post(routes::ingest_handler))
            .route("/search", get(routes::search_handler))
            .route("/transcripts", get(routes::list_transcripts_handler))
            .route(
                "/transcripts/{id}",
                get(routes::get_transcript_handler).delete(routes::delete_transcript_handler),
            )
            .route("/analytics/topics", get(routes::topics_handler))
            .route("/analytics/participants", get(routes::participants_handler))
            .route(
                "/analytics/sentiment-trend",
                get(routes::sentiment_trend_handler),
            )
    }

    /// Bind the configured address and serve until shutdown.
    pub async fn run(&self) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        info!("Listening on {}", self.config.bind_addr);
        axum::serve(listener, self.router()).await
    }

    /// Serve on an already-bound listener (used by tests).
    pub async fn serve_on(&self, listener: TcpListener) -> std::io::Result<()> {
        axum::serve(listener, self.router()).await
    }
}
