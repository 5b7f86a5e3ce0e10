pub mod app;
pub mod auth;
pub mod clients;
pub mod clock;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod ledger;
pub mod outcomes;
pub mod pipeline;
pub mod state;
pub mod telemetry;
pub mod types;
pub mod validation;
