//! Elo rating engine, calculator and competitor storage
//!
//! The engine in [`elo`] is a set of pure functions; [`calculator`] wraps it
//! behind a configurable trait and [`storage`] holds the current ratings.

pub mod calculator;
pub mod elo;
pub mod storage;

// Re-export commonly used types
pub use calculator::{EloConfig, EloRatingCalculator, RatingCalculator, RatingUpdate};
pub use elo::{compute_tie, compute_win_loss, OutcomeKind};
pub use storage::{CompetitorStorage, InMemoryCompetitorStorage};
