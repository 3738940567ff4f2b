//! Finboard - personal finance dashboard backend.
//!
//! Links bank connections through an external aggregator, reconciles
//! transaction deltas into PostgreSQL, and serves balances, budgets,
//! assets, and recurring-charge detection over REST.

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;

pub use startup::{AppState, Application};
