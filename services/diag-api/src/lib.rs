//! Diagnostics API service library.
//!
//! HTTP routes over the diagnostic query engine: filtered observation records,
//! magnitudes, GeoJSON observations, time-series history, run lists and model
//! metadata.

pub mod config;
pub mod error;
pub mod handlers;
pub mod state;

use std::sync::Arc;

use axum::{routing::get, Extension, Router};

use crate::state::AppState;

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_handler))
        .route("/models", get(handlers::models::models_handler))
        .route(
            "/diag/:model/:system/:domain/:background/:frequency/:variable/",
            get(handlers::diag::run_list_handler),
        )
        .route(
            "/diag/:model/:system/:domain/:background/:frequency/:variable/:loop/",
            get(handlers::diag::history_handler),
        )
        .route(
            "/diag/:model/:system/:domain/:background/:frequency/:variable/:initialization_time/:loop/",
            get(handlers::diag::records_handler),
        )
        .route(
            "/diag/:model/:system/:domain/:background/:frequency/:variable/:initialization_time/:loop/magnitude/",
            get(handlers::diag::magnitude_handler),
        )
        .route(
            "/diag/:model/:system/:domain/:background/:frequency/:variable/:initialization_time/:loop/geojson/",
            get(handlers::diag::geojson_handler),
        )
        .layer(Extension(state))
}
