//! Ladder service: competitor registration and match recording
//!
//! This is the layer between the HTTP API and the rating engine. It looks
//! competitors up, picks the outcome shape, calls the calculator and writes
//! the new ratings back to storage.

use crate::error::{LadderError, MatchRole, Result};
use crate::metrics::MetricsCollector;
use crate::rating::{CompetitorStorage, OutcomeKind, RatingCalculator};
use crate::types::{Competitor, CompetitorId, MatchReport, RatingChange, ScoreboardEntry};
use crate::utils::{normalize_name, rating_difference};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Coordinates storage and the rating calculator
pub struct LadderService {
    calculator: Arc<dyn RatingCalculator>,
    storage: Arc<dyn CompetitorStorage>,
    metrics: Arc<MetricsCollector>,
    /// Serialises registration, match recording and reset
    match_lock: Mutex<()>,
}

impl LadderService {
    pub fn new(
        calculator: Arc<dyn RatingCalculator>,
        storage: Arc<dyn CompetitorStorage>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            calculator,
            storage,
            metrics,
            match_lock: Mutex::new(()),
        }
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    /// Current calculator configuration as JSON
    pub fn rating_config(&self) -> serde_json::Value {
        self.calculator.config()
    }

    /// Register a competitor at the calculator's initial rating
    pub async fn add_competitor(&self, name: &str) -> Result<Competitor> {
        let name = normalize_name(name).ok_or_else(|| LadderError::InvalidRequest {
            reason: "Competitor name must not be empty".to_string(),
        })?;

        let _guard = self.match_lock.lock().await;

        let competitor = self
            .storage
            .add_competitor(name, self.calculator.initial_rating())?;

        // The competitor is stored at this point, so a failed count only
        // costs the gauge update
        match self.storage.competitor_count() {
            Ok(total) => self.metrics.record_competitor_registered(total),
            Err(e) => warn!("Failed to count competitors after registration: {:#}", e),
        }

        info!(
            "Registered competitor '{}' with id {} at rating {}",
            competitor.name, competitor.id, competitor.rating
        );

        Ok(competitor)
    }

    /// Look up a competitor by id
    pub async fn get_competitor(&self, id: CompetitorId) -> Result<Competitor> {
        match self.storage.get_competitor(id)? {
            Some(competitor) => Ok(competitor),
            None => {
                debug!("Competitor {} not found", id);
                Err(LadderError::CompetitorNotFound { competitor_id: id }.into())
            }
        }
    }

    /// Record a match and store the new ratings
    ///
    /// Equal ids are a tie of the competitor with itself: the rating is
    /// passed to the tie computation on both sides and comes back unchanged.
    /// Otherwise both are fetched together and the winner is checked
    /// before the loser.
    pub async fn record_match(
        &self,
        winner_id: CompetitorId,
        loser_id: CompetitorId,
    ) -> Result<MatchReport> {
        let timer = self.metrics.start_timer();
        let _guard = self.match_lock.lock().await;

        if winner_id == loser_id {
            let found = self.storage.get_competitor(winner_id)?;
            let competitor = self.participant(found, winner_id, MatchRole::Winner)?;
            let update = self
                .calculator
                .rate(OutcomeKind::Tie, competitor.rating, competitor.rating);

            self.storage
                .store_ratings(&[(competitor.id, update.first_new)])?;

            info!(
                "Recorded tie for competitor {} - rating {} -> {}",
                competitor.id, update.first_old, update.first_new
            );
            self.metrics.record_match(
                OutcomeKind::Tie,
                &[rating_difference(update.first_new, update.first_old)],
                timer.stop(),
            );

            return Ok(MatchReport::Tie {
                competitor: RatingChange {
                    competitor_id: competitor.id,
                    old_rating: update.first_old,
                    new_rating: update.first_new,
                },
            });
        }

        let mut found = self.storage.get_competitors(&[winner_id, loser_id])?;
        let winner = self.participant(found.remove(&winner_id), winner_id, MatchRole::Winner)?;
        let loser = self.participant(found.remove(&loser_id), loser_id, MatchRole::Loser)?;

        let update = self
            .calculator
            .rate(OutcomeKind::WinLoss, winner.rating, loser.rating);

        self.storage.store_ratings(&[
            (winner.id, update.first_new),
            (loser.id, update.second_new),
        ])?;

        info!(
            "Recorded match - winner {}: {} -> {} ({:+}), loser {}: {} -> {} ({:+})",
            winner.id,
            update.first_old,
            update.first_new,
            update.first_delta(),
            loser.id,
            update.second_old,
            update.second_new,
            update.second_delta()
        );
        self.metrics.record_match(
            OutcomeKind::WinLoss,
            &[
                rating_difference(update.first_new, update.first_old),
                rating_difference(update.second_new, update.second_old),
            ],
            timer.stop(),
        );

        Ok(MatchReport::WinLoss {
            winner: RatingChange {
                competitor_id: winner.id,
                old_rating: update.first_old,
                new_rating: update.first_new,
            },
            loser: RatingChange {
                competitor_id: loser.id,
                old_rating: update.second_old,
                new_rating: update.second_new,
            },
        })
    }

    /// Competitors ranked by rating, highest first
    pub async fn scoreboard(&self) -> Result<Vec<ScoreboardEntry>> {
        let competitors = self.storage.list_by_rating()?;

        Ok(competitors
            .into_iter()
            .enumerate()
            .map(|(index, competitor)| ScoreboardEntry {
                rank: index + 1,
                id: competitor.id,
                name: competitor.name,
                rating: competitor.rating,
                games_played: competitor.games_played,
            })
            .collect())
    }

    pub async fn competitor_count(&self) -> Result<usize> {
        self.storage.competitor_count()
    }

    /// Drop every competitor
    ///
    /// Used for the reset-on-boot policy; this is not a migration.
    pub async fn reset(&self) -> Result<()> {
        let _guard = self.match_lock.lock().await;

        warn!("Resetting ladder - all competitors and ratings are discarded");
        self.storage.reset()?;
        self.metrics.set_competitor_count(0);

        Ok(())
    }

    fn participant(
        &self,
        found: Option<Competitor>,
        id: CompetitorId,
        role: MatchRole,
    ) -> Result<Competitor> {
        match found {
            Some(competitor) => Ok(competitor),
            None => {
                warn!("Match {} {} does not exist", role, id);
                self.metrics.record_lookup_failure(&role.to_string());
                Err(LadderError::MatchParticipantNotFound {
                    role,
                    competitor_id: id,
                }
                .into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rating::storage::MockCompetitorStorage;
    use crate::rating::{EloConfig, EloRatingCalculator, InMemoryCompetitorStorage};
    use std::collections::HashMap;

    fn create_service() -> LadderService {
        LadderService::new(
            Arc::new(EloRatingCalculator::default()),
            Arc::new(InMemoryCompetitorStorage::default()),
            Arc::new(MetricsCollector::new().unwrap()),
        )
    }

    fn not_found_role(error: &anyhow::Error) -> Option<MatchRole> {
        match error.downcast_ref::<LadderError>() {
            Some(LadderError::MatchParticipantNotFound { role, .. }) => Some(*role),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_add_and_get_competitor() {
        let service = create_service();

        let alice = service.add_competitor("  alice ").await.unwrap();
        assert_eq!(alice.id, 1);
        assert_eq!(alice.name, "alice");
        assert_eq!(alice.rating, 1000.0);

        let fetched = service.get_competitor(1).await.unwrap();
        assert_eq!(fetched, alice);
        assert_eq!(service.metrics().competitors().competitors.get(), 1);
    }

    #[tokio::test]
    async fn test_add_competitor_rejects_blank_name() {
        let service = create_service();

        let error = service.add_competitor("   ").await.unwrap_err();
        assert!(matches!(
            error.downcast_ref::<LadderError>(),
            Some(LadderError::InvalidRequest { .. })
        ));
        assert_eq!(service.competitor_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_initial_rating_from_calculator() {
        let calculator = EloRatingCalculator::new(EloConfig {
            k_factor: 32.0,
            initial_rating: 1500.0,
        })
        .unwrap();
        let service = LadderService::new(
            Arc::new(calculator),
            Arc::new(InMemoryCompetitorStorage::default()),
            Arc::new(MetricsCollector::new().unwrap()),
        );

        let competitor = service.add_competitor("alice").await.unwrap();
        assert_eq!(competitor.rating, 1500.0);
        assert_eq!(service.rating_config()["initial_rating"], 1500.0);
    }

    #[tokio::test]
    async fn test_get_unknown_competitor() {
        let service = create_service();

        let error = service.get_competitor(5).await.unwrap_err();
        assert!(matches!(
            error.downcast_ref::<LadderError>(),
            Some(LadderError::CompetitorNotFound { competitor_id: 5 })
        ));
    }

    #[tokio::test]
    async fn test_record_win_loss() {
        let service = create_service();
        service.add_competitor("alice").await.unwrap();
        service.add_competitor("bob").await.unwrap();

        let report = service.record_match(1, 2).await.unwrap();
        match report {
            MatchReport::WinLoss { winner, loser } => {
                assert_eq!(winner.competitor_id, 1);
                assert_eq!(winner.new_rating, 1016.0);
                assert_eq!(loser.competitor_id, 2);
                assert_eq!(loser.new_rating, 984.0);
            }
            other => panic!("expected win/loss report, got {:?}", other),
        }

        let alice = service.get_competitor(1).await.unwrap();
        let bob = service.get_competitor(2).await.unwrap();
        assert_eq!(alice.rating, 1016.0);
        assert_eq!(bob.rating, 984.0);
        assert_eq!(alice.games_played, 1);
        assert_eq!(bob.games_played, 1);

        let metrics = service.metrics();
        let changes = &metrics.matches().rating_change;
        assert_eq!(changes.get_sample_count(), 2);
        assert_eq!(changes.get_sample_sum(), 32.0);
    }

    #[tokio::test]
    async fn test_record_match_uses_stored_ratings() {
        let service = create_service();
        service.add_competitor("alice").await.unwrap();
        service.add_competitor("bob").await.unwrap();

        service.record_match(1, 2).await.unwrap();
        let report = service.record_match(2, 1).await.unwrap();

        match report {
            MatchReport::WinLoss { winner, loser } => {
                assert_eq!(winner.old_rating, 984.0);
                assert_eq!(loser.old_rating, 1016.0);
                // The underdog gains more than 16
                assert!(winner.delta() > 16.0);
                assert!((winner.delta() + loser.delta()).abs() < 1e-6);
            }
            other => panic!("expected win/loss report, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_record_self_tie() {
        let service = create_service();
        service.add_competitor("alice").await.unwrap();

        let report = service.record_match(1, 1).await.unwrap();
        assert_eq!(
            report,
            MatchReport::Tie {
                competitor: RatingChange {
                    competitor_id: 1,
                    old_rating: 1000.0,
                    new_rating: 1000.0,
                },
            }
        );

        let alice = service.get_competitor(1).await.unwrap();
        assert_eq!(alice.rating, 1000.0);
        assert_eq!(alice.games_played, 1);

        let tie_count = service
            .metrics()
            .matches()
            .recorded_total
            .with_label_values(&["tie"])
            .get();
        assert_eq!(tie_count, 1);
    }

    #[tokio::test]
    async fn test_self_tie_unknown_competitor() {
        let service = create_service();

        let error = service.record_match(3, 3).await.unwrap_err();
        assert_eq!(not_found_role(&error), Some(MatchRole::Winner));
    }

    #[tokio::test]
    async fn test_unknown_winner_checked_first() {
        let service = create_service();
        service.add_competitor("alice").await.unwrap();

        let error = service.record_match(8, 9).await.unwrap_err();
        assert_eq!(not_found_role(&error), Some(MatchRole::Winner));

        let error = service.record_match(8, 1).await.unwrap_err();
        assert_eq!(not_found_role(&error), Some(MatchRole::Winner));

        let error = service.record_match(1, 9).await.unwrap_err();
        assert_eq!(not_found_role(&error), Some(MatchRole::Loser));

        // Failed matches leave ratings alone
        let alice = service.get_competitor(1).await.unwrap();
        assert_eq!(alice.rating, 1000.0);
        assert_eq!(alice.games_played, 0);

        let metrics = service.metrics();
        let failures = &metrics.competitors().lookup_failures_total;
        assert_eq!(failures.with_label_values(&["winner"]).get(), 2);
        assert_eq!(failures.with_label_values(&["loser"]).get(), 1);
    }

    #[tokio::test]
    async fn test_scoreboard_order() {
        let service = create_service();
        for name in ["alice", "bob", "carol"] {
            service.add_competitor(name).await.unwrap();
        }

        service.record_match(3, 1).await.unwrap();
        service.record_match(3, 2).await.unwrap();

        let board = service.scoreboard().await.unwrap();
        assert_eq!(board.len(), 3);
        assert_eq!(board[0].name, "carol");
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[0].games_played, 2);
        assert!(board[0].rating > board[1].rating);
        assert!(board[1].rating > board[2].rating);
        assert_eq!(board[2].rank, 3);
    }

    #[tokio::test]
    async fn test_reset() {
        let service = create_service();
        service.add_competitor("alice").await.unwrap();

        service.reset().await.unwrap();

        assert_eq!(service.competitor_count().await.unwrap(), 0);
        assert_eq!(service.metrics().competitors().competitors.get(), 0);
        let bob = service.add_competitor("bob").await.unwrap();
        assert_eq!(bob.id, 1);
    }

    #[tokio::test]
    async fn test_concurrent_matches_preserve_rating_sum() {
        let service = Arc::new(create_service());
        for name in ["alice", "bob", "carol", "dave"] {
            service.add_competitor(name).await.unwrap();
        }

        let mut handles = Vec::new();
        for i in 0..40u64 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                let winner = i % 4 + 1;
                let loser = (i + 1) % 4 + 1;
                service.record_match(winner, loser).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let board = service.scoreboard().await.unwrap();
        let total: f64 = board.iter().map(|entry| entry.rating).sum();
        let games: u64 = board.iter().map(|entry| entry.games_played).sum();

        assert_eq!(games, 80);
        assert!((total - 4000.0).abs() < 40.0 * 1e-6);
    }

    #[tokio::test]
    async fn test_registration_survives_failed_count() {
        let mut storage = MockCompetitorStorage::new();
        storage
            .expect_add_competitor()
            .times(1)
            .returning(|name, rating| Ok(Competitor::new(1, name, rating)));
        storage.expect_competitor_count().returning(|| {
            Err(LadderError::InternalError {
                message: "count unavailable".to_string(),
            }
            .into())
        });

        let service = LadderService::new(
            Arc::new(EloRatingCalculator::default()),
            Arc::new(storage),
            Arc::new(MetricsCollector::new().unwrap()),
        );

        let alice = service.add_competitor("alice").await.unwrap();
        assert_eq!(alice.id, 1);
        assert_eq!(service.metrics().competitors().registered_total.get(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_competitor_gauge_tracks_registrations_and_resets() {
        let service = Arc::new(create_service());

        let mut handles = Vec::new();
        for i in 0..40 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                if i % 10 == 9 {
                    service.reset().await.map(|_| ())
                } else {
                    service.add_competitor(&format!("player_{}", i)).await.map(|_| ())
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let count = service.competitor_count().await.unwrap();
        assert_eq!(service.metrics().competitors().competitors.get(), count as i64);
    }

    #[tokio::test]
    async fn test_storage_failure_propagates() {
        let alice = Competitor::new(1, "alice".to_string(), 1000.0);
        let bob = Competitor::new(2, "bob".to_string(), 1000.0);

        let mut storage = MockCompetitorStorage::new();
        storage
            .expect_get_competitors()
            .withf(|ids| ids.to_vec() == vec![1, 2])
            .returning(move |_| Ok(HashMap::from([(1, alice.clone()), (2, bob.clone())])));
        storage
            .expect_store_ratings()
            .withf(|updates| updates.to_vec() == vec![(1, 1016.0), (2, 984.0)])
            .times(1)
            .returning(|_| {
                Err(LadderError::InternalError {
                    message: "disk full".to_string(),
                }
                .into())
            });

        let service = LadderService::new(
            Arc::new(EloRatingCalculator::default()),
            Arc::new(storage),
            Arc::new(MetricsCollector::new().unwrap()),
        );

        let error = service.record_match(1, 2).await.unwrap_err();
        assert!(matches!(
            error.downcast_ref::<LadderError>(),
            Some(LadderError::InternalError { .. })
        ));

        // Nothing counted as recorded
        let recorded = service
            .metrics()
            .matches()
            .recorded_total
            .with_label_values(&["win_loss"])
            .get();
        assert_eq!(recorded, 0);
    }
}
