//! Follow-up Pipeline API Library
//!
//! This library tracks sales-pipeline contacts and their scheduled follow-ups,
//! classifies each follow-up by urgency, keeps every contact's `next_followup`
//! pointing at its soonest pending follow-up, and builds the dashboard and
//! funnel forecasts on top of that data.
//!
//! # Modules
//!
//! - `api`: HTTP-facing components.
//! - `core`: Domain logic, models and errors.
//! - `data`: Persistence layer.
//! - `app`: Router assembly.
//! - `config`: Configuration management.
//! - `db`: Database connection pool and schema bootstrap.
//! - `db_storage`: Postgres store.
//! - `errors`: Error handling types.
//! - `forecast`: Expected value and funnel conversion forecasts.
//! - `handlers`: HTTP request handlers.
//! - `memory_store`: In-process store.
//! - `models`: Core data models.
//! - `reporting`: Dashboard aggregates.
//! - `store`: Store contract and `next_followup` derivation.
//! - `sweep`: Daily urgency recompute job.
//! - `urgency`: Urgency classification.
//! - `validation`: Input validation.

pub mod api;
pub mod core;
pub mod data;

// Re-export primary modules for shared use in tests and other binaries
pub mod app;
pub mod config;
pub mod db;
pub mod db_storage;
pub mod errors;
pub mod forecast;
pub mod handlers;
pub mod memory_store;
pub mod models;
pub mod reporting;
pub mod store;
pub mod sweep;
pub mod urgency;
pub mod validation;
