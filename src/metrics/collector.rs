//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the elo-ladder service using
//! Prometheus metrics.

use crate::rating::OutcomeKind;
use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the ladder service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Competitor-related metrics
    competitor_metrics: CompetitorMetrics,

    /// Match-related metrics
    match_metrics: MatchMetrics,
}

/// Competitor-related metrics
#[derive(Clone)]
pub struct CompetitorMetrics {
    /// Total competitors registered since boot
    pub registered_total: IntCounter,

    /// Competitors currently on the ladder
    pub competitors: IntGauge,

    /// Lookups for unknown competitors, by match role
    pub lookup_failures_total: IntCounterVec,
}

/// Match-related metrics
#[derive(Clone)]
pub struct MatchMetrics {
    /// Matches recorded by outcome
    pub recorded_total: IntCounterVec,

    /// Absolute rating change per competitor per match
    pub rating_change: Histogram,

    /// Time spent recording a match, lookups and storage included
    pub recording_duration: Histogram,
}

impl MetricsCollector {
    /// Create a new metrics collector on its own registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        let competitor_metrics = CompetitorMetrics::new(&registry)?;
        let match_metrics = MatchMetrics::new(&registry)?;

        Ok(Self {
            registry,
            competitor_metrics,
            match_metrics,
        })
    }

    pub fn competitors(&self) -> &CompetitorMetrics {
        &self.competitor_metrics
    }

    pub fn matches(&self) -> &MatchMetrics {
        &self.match_metrics
    }

    /// Record a newly registered competitor
    pub fn record_competitor_registered(&self, total: usize) {
        self.competitor_metrics.registered_total.inc();
        self.competitor_metrics.competitors.set(total as i64);
    }

    /// Set the current competitor count
    pub fn set_competitor_count(&self, total: usize) {
        self.competitor_metrics.competitors.set(total as i64);
    }

    /// Record a lookup for a competitor that does not exist
    pub fn record_lookup_failure(&self, role: &str) {
        self.competitor_metrics
            .lookup_failures_total
            .with_label_values(&[role])
            .inc();
    }

    /// Record a completed match with the absolute rating change of each side
    pub fn record_match(&self, kind: OutcomeKind, rating_changes: &[f64], duration: Duration) {
        let outcome = kind.to_string();
        self.match_metrics
            .recorded_total
            .with_label_values(&[outcome.as_str()])
            .inc();

        for change in rating_changes {
            self.match_metrics.rating_change.observe(*change);
        }

        self.match_metrics
            .recording_duration
            .observe(duration.as_secs_f64());
    }

    /// Encode all metrics in the Prometheus text format
    pub fn encode(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        Ok(encoder.encode_to_string(&metric_families)?)
    }

    /// Start a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

impl CompetitorMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let registered_total = IntCounter::new(
            "elo_ladder_competitors_registered_total",
            "Total competitors registered",
        )?;
        registry.register(Box::new(registered_total.clone()))?;

        let competitors = IntGauge::new("elo_ladder_competitors", "Competitors on the ladder")?;
        registry.register(Box::new(competitors.clone()))?;

        let lookup_failures_total = IntCounterVec::new(
            Opts::new(
                "elo_ladder_lookup_failures_total",
                "Lookups for unknown competitors",
            ),
            &["role"],
        )?;
        registry.register(Box::new(lookup_failures_total.clone()))?;

        Ok(Self {
            registered_total,
            competitors,
            lookup_failures_total,
        })
    }
}

impl MatchMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let recorded_total = IntCounterVec::new(
            Opts::new("elo_ladder_matches_recorded_total", "Total matches recorded"),
            &["outcome"],
        )?;
        registry.register(Box::new(recorded_total.clone()))?;

        let rating_change = Histogram::with_opts(
            HistogramOpts::new(
                "elo_ladder_rating_change",
                "Absolute rating change per competitor per match",
            )
            .buckets(vec![0.0, 1.0, 2.0, 4.0, 8.0, 16.0, 24.0, 32.0, 48.0, 64.0]),
        )?;
        registry.register(Box::new(rating_change.clone()))?;

        let recording_duration = Histogram::with_opts(
            HistogramOpts::new(
                "elo_ladder_match_recording_duration_seconds",
                "Time spent recording a match",
            )
            .buckets(vec![0.00001, 0.0001, 0.001, 0.01, 0.1, 1.0]),
        )?;
        registry.register(Box::new(recording_duration.clone()))?;

        Ok(Self {
            recorded_total,
            rating_change,
            recording_duration,
        })
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed time since timer creation
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return elapsed duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}
