//! Metrics and monitoring for the elo-ladder service
//!
//! This module provides Prometheus metrics collection for competitor
//! registration and match recording.

pub mod collector;

pub use collector::{CompetitorMetrics, MatchMetrics, MetricsCollector, MetricsTimer};
