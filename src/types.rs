//! Common types used throughout the ladder service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for competitors, assigned in registration order from 1
pub type CompetitorId = u64;

/// A rated competitor as held by storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Competitor {
    pub id: CompetitorId,
    pub name: String,
    pub rating: f64,
    pub games_played: u64,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Competitor {
    /// Create a freshly registered competitor
    pub fn new(id: CompetitorId, name: String, initial_rating: f64) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            rating: initial_rating,
            games_played: 0,
            created_at: now,
            last_updated: now,
        }
    }

    /// Replace the rating after a match and count the game
    pub fn record_result(&mut self, new_rating: f64) {
        self.rating = new_rating;
        self.games_played += 1;
        self.last_updated = Utc::now();
    }
}

/// Request body for registering a competitor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCompetitorRequest {
    #[serde(default)]
    pub name: Option<String>,
}

/// Request body for recording a match
///
/// Equal ids are treated as a tie of the competitor with itself.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MatchRequest {
    pub winner_id: CompetitorId,
    pub loser_id: CompetitorId,
}

/// Rating change for one side of a recorded match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingChange {
    pub competitor_id: CompetitorId,
    pub old_rating: f64,
    pub new_rating: f64,
}

impl RatingChange {
    pub fn delta(&self) -> f64 {
        self.new_rating - self.old_rating
    }
}

/// Outcome of recording a match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MatchReport {
    WinLoss {
        winner: RatingChange,
        loser: RatingChange,
    },
    /// A competitor reported as both winner and loser
    Tie { competitor: RatingChange },
}

/// One row of the scoreboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreboardEntry {
    pub rank: usize,
    pub id: CompetitorId,
    pub name: String,
    pub rating: f64,
    pub games_played: u64,
}
