//! Elo rating update engine
//!
//! Pure functions that turn a pair of current ratings and a match outcome
//! into a pair of new ratings. Nothing here touches storage or holds state,
//! so every function can be called concurrently from any thread.
//!
//! Results are rounded to [`RATING_DECIMAL_PLACES`] decimal places using
//! round-half-away-from-zero ([`f64::round`]).

use serde::{Deserialize, Serialize};

/// Default K-factor
pub const DEFAULT_K_FACTOR: f64 = 32.0;

/// Rating given to newly registered competitors
pub const DEFAULT_INITIAL_RATING: f64 = 1000.0;

/// Number of decimal places kept on every computed rating
pub const RATING_DECIMAL_PLACES: i32 = 6;

/// Logistic scale of the expected score curve
const RATING_SCALE: f64 = 400.0;

/// Shape of a two-party match result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// First participant won, second lost
    WinLoss,
    /// Both participants scored half a point
    Tie,
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutcomeKind::WinLoss => write!(f, "win_loss"),
            OutcomeKind::Tie => write!(f, "tie"),
        }
    }
}

/// Expected score of a player rated `rating` against `opponent_rating`
pub fn expected_score(rating: f64, opponent_rating: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((opponent_rating - rating) / RATING_SCALE))
}

/// Round a rating to [`RATING_DECIMAL_PLACES`], halves away from zero
///
/// Values too large to carry digits below the last kept place are returned
/// as given, so every finite rating maps to a finite rating.
pub fn round_rating(value: f64) -> f64 {
    let factor = 10f64.powi(RATING_DECIMAL_PLACES);
    if value.abs() >= 2f64.powi(f64::MANTISSA_DIGITS as i32 - 1) / factor {
        return value;
    }
    (value * factor).round() / factor
}

/// New (winner, loser) ratings after a decisive match
pub fn compute_win_loss(winner_rating: f64, loser_rating: f64, k: f64) -> (f64, f64) {
    let expected_winner = expected_score(winner_rating, loser_rating);
    let expected_loser = expected_score(loser_rating, winner_rating);

    (
        round_rating(winner_rating + k * (1.0 - expected_winner)),
        round_rating(loser_rating + k * (0.0 - expected_loser)),
    )
}

/// New ratings for both sides of a drawn match
///
/// Each side is computed from its own expected score, so swapping the
/// arguments swaps the results bit for bit. Equal inputs come back exactly
/// as given (not re-rounded), which also covers a competitor tied against
/// itself.
pub fn compute_tie(rating_a: f64, rating_b: f64, k: f64) -> (f64, f64) {
    if rating_a == rating_b {
        return (rating_a, rating_b);
    }

    let expected_a = expected_score(rating_a, rating_b);
    let expected_b = expected_score(rating_b, rating_a);

    (
        round_rating(rating_a + k * (0.5 - expected_a)),
        round_rating(rating_b + k * (0.5 - expected_b)),
    )
}

/// Dispatch on the outcome kind
pub fn compute(kind: OutcomeKind, first: f64, second: f64, k: f64) -> (f64, f64) {
    match kind {
        OutcomeKind::WinLoss => compute_win_loss(first, second, k),
        OutcomeKind::Tie => compute_tie(first, second, k),
    }
}
