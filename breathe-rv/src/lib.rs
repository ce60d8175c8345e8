//! breathe-rv library interface
//!
//! Exposes the pipeline, state, and router for integration testing.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::services::content_store::ContentStore;
use crate::services::lifecycle::LifecycleStateMachine;
use crate::services::scorer::Scorer;
use crate::services::user_directory::UserDirectory;
use crate::services::verification::VerificationPipeline;

/// Application state shared across handlers.
///
/// Collaborators are constructed once at startup and injected here; nothing
/// else owns a scorer or store handle.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub store: Arc<ContentStore>,
    pub pipeline: Arc<VerificationPipeline>,
    pub lifecycle: Arc<LifecycleStateMachine>,
    pub public_base_url: String,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        store: Arc<ContentStore>,
        scorer: Arc<dyn Scorer>,
        users: Arc<dyn UserDirectory>,
        public_base_url: String,
    ) -> Self {
        let pipeline = Arc::new(VerificationPipeline::new(
            db.clone(),
            store.clone(),
            scorer,
            users,
        ));
        let lifecycle = Arc::new(LifecycleStateMachine::new(db.clone(), store.clone()));

        Self {
            db,
            store,
            pipeline,
            lifecycle,
            public_base_url,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::report_routes())
        .merge(api::upload_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
