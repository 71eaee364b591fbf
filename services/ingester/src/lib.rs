//! Event-driven diagnostic ingester.
//!
//! Receives object-created storage events over HTTP, fetches the named
//! diagnostic file and saves it to the array store, history archive and run
//! index.

pub mod config;
pub mod server;

pub use config::IngesterConfig;
pub use server::{build_router, process_event, IngestResponse, ObjectSource, ServerState};
