//! Rating calculator trait and the Elo implementation
//!
//! This module defines the interface the ladder service uses to turn match
//! outcomes into rating changes, and implements it on top of the pure
//! functions in [`crate::rating::elo`].

use crate::error::LadderError;
use crate::rating::elo::{self, OutcomeKind, DEFAULT_INITIAL_RATING, DEFAULT_K_FACTOR};
use serde::{Deserialize, Serialize};

/// Old and new ratings for both sides of one match
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingUpdate {
    pub kind: OutcomeKind,
    pub first_old: f64,
    pub first_new: f64,
    pub second_old: f64,
    pub second_new: f64,
}

impl RatingUpdate {
    pub fn first_delta(&self) -> f64 {
        self.first_new - self.first_old
    }

    pub fn second_delta(&self) -> f64 {
        self.second_new - self.second_old
    }
}

/// Trait for calculating rating changes after a two-party match
pub trait RatingCalculator: Send + Sync {
    /// Rate a match between `first` and `second`
    ///
    /// For [`OutcomeKind::WinLoss`] the first rating belongs to the winner.
    fn rate(&self, kind: OutcomeKind, first: f64, second: f64) -> RatingUpdate;

    /// Get the initial rating for new competitors
    fn initial_rating(&self) -> f64;

    /// Get current configuration as JSON
    fn config(&self) -> serde_json::Value;

    /// Update configuration from JSON
    fn update_config(&mut self, config: serde_json::Value) -> crate::error::Result<()>;
}

/// Configuration for the Elo calculator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EloConfig {
    /// Maximum rating swing per match
    pub k_factor: f64,
    /// Rating assigned to new competitors
    pub initial_rating: f64,
}

impl Default for EloConfig {
    fn default() -> Self {
        Self {
            k_factor: DEFAULT_K_FACTOR,
            initial_rating: DEFAULT_INITIAL_RATING,
        }
    }
}

impl EloConfig {
    /// Faster-moving configuration for young ladders
    pub fn provisional() -> Self {
        Self {
            k_factor: 40.0,
            ..Self::default()
        }
    }

    /// Slower-moving configuration for settled ladders
    pub fn established() -> Self {
        Self {
            k_factor: 16.0,
            ..Self::default()
        }
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> crate::error::Result<()> {
        if !self.k_factor.is_finite() || self.k_factor <= 0.0 {
            return Err(LadderError::ConfigurationError {
                message: format!("K-factor must be positive, got {}", self.k_factor),
            }
            .into());
        }

        if !self.initial_rating.is_finite() {
            return Err(LadderError::ConfigurationError {
                message: "Initial rating must be finite".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

/// Elo rating calculator
#[derive(Debug, Clone, Default)]
pub struct EloRatingCalculator {
    config: EloConfig,
}

impl EloRatingCalculator {
    /// Create a new Elo calculator
    pub fn new(config: EloConfig) -> crate::error::Result<Self> {
        config.validate()?;

        Ok(Self { config })
    }

    pub fn k_factor(&self) -> f64 {
        self.config.k_factor
    }
}

impl RatingCalculator for EloRatingCalculator {
    fn rate(&self, kind: OutcomeKind, first: f64, second: f64) -> RatingUpdate {
        let (first_new, second_new) = elo::compute(kind, first, second, self.config.k_factor);

        RatingUpdate {
            kind,
            first_old: first,
            first_new,
            second_old: second,
            second_new,
        }
    }

    fn initial_rating(&self) -> f64 {
        self.config.initial_rating
    }

    fn config(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or(serde_json::Value::Null)
    }

    fn update_config(&mut self, config: serde_json::Value) -> crate::error::Result<()> {
        let new_config: EloConfig =
            serde_json::from_value(config).map_err(|e| LadderError::ConfigurationError {
                message: format!("Invalid Elo configuration: {}", e),
            })?;

        new_config.validate()?;
        self.config = new_config;
        Ok(())
    }
}
