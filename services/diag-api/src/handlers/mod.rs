//! HTTP handlers.

pub mod diag;
pub mod health;
pub mod models;
