//! Elo Ladder - Elo rating service for pairwise match results
//!
//! This crate provides a pure Elo rating engine, a ladder service that
//! records matches against stored competitor ratings, and an HTTP API.

pub mod config;
pub mod error;
pub mod metrics;
pub mod rating;
pub mod service;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{LadderError, Result};
pub use types::*;

// Re-export key components
pub use rating::{compute_tie, compute_win_loss, EloRatingCalculator, InMemoryCompetitorStorage};
pub use service::LadderService;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
