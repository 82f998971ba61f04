//! Competitor storage interface and implementations
//!
//! This module defines the repository the ladder service reads current
//! ratings from and writes new ratings back to. Storage is handed to the
//! service explicitly; there is no global connection.

use crate::error::LadderError;
use crate::types::{Competitor, CompetitorId};
use std::collections::HashMap;
use std::sync::RwLock;

/// Trait for competitor storage operations
#[cfg_attr(test, mockall::automock)]
pub trait CompetitorStorage: Send + Sync {
    /// Register a new competitor and return it with its assigned id
    fn add_competitor(&self, name: String, initial_rating: f64)
        -> crate::error::Result<Competitor>;

    /// Get a competitor by id
    fn get_competitor(&self, id: CompetitorId) -> crate::error::Result<Option<Competitor>>;

    /// Get several competitors at once; unknown ids are skipped
    fn get_competitors(
        &self,
        ids: &[CompetitorId],
    ) -> crate::error::Result<HashMap<CompetitorId, Competitor>>;

    /// Store new ratings atomically
    ///
    /// Either every listed competitor is updated (and has its game counted
    /// once) or, if any id is unknown, nothing is.
    fn store_ratings(&self, updates: &[(CompetitorId, f64)]) -> crate::error::Result<()>;

    /// All competitors, highest rating first
    fn list_by_rating(&self) -> crate::error::Result<Vec<Competitor>>;

    /// Number of registered competitors
    fn competitor_count(&self) -> crate::error::Result<usize>;

    /// Drop every competitor and restart id assignment
    fn reset(&self) -> crate::error::Result<()>;
}

#[derive(Debug, Default)]
struct Table {
    competitors: HashMap<CompetitorId, Competitor>,
    next_id: CompetitorId,
}

/// In-memory competitor storage
#[derive(Debug)]
pub struct InMemoryCompetitorStorage {
    table: RwLock<Table>,
    max_competitors: Option<usize>,
}

impl InMemoryCompetitorStorage {
    /// Create storage, optionally capped at `max_competitors` entries
    pub fn new(max_competitors: Option<usize>) -> Self {
        Self {
            table: RwLock::new(Table {
                competitors: HashMap::new(),
                next_id: 1,
            }),
            max_competitors,
        }
    }

    fn read_table(&self) -> crate::error::Result<std::sync::RwLockReadGuard<'_, Table>> {
        self.table.read().map_err(|_| {
            LadderError::InternalError {
                message: "Failed to acquire competitors read lock".to_string(),
            }
            .into()
        })
    }

    fn write_table(&self) -> crate::error::Result<std::sync::RwLockWriteGuard<'_, Table>> {
        self.table.write().map_err(|_| {
            LadderError::InternalError {
                message: "Failed to acquire competitors write lock".to_string(),
            }
            .into()
        })
    }
}

impl Default for InMemoryCompetitorStorage {
    fn default() -> Self {
        Self::new(None)
    }
}

impl CompetitorStorage for InMemoryCompetitorStorage {
    fn add_competitor(
        &self,
        name: String,
        initial_rating: f64,
    ) -> crate::error::Result<Competitor> {
        let mut table = self.write_table()?;

        if let Some(limit) = self.max_competitors {
            if table.competitors.len() >= limit {
                return Err(LadderError::CapacityExceeded { limit }.into());
            }
        }

        let id = table.next_id;
        table.next_id += 1;

        let competitor = Competitor::new(id, name, initial_rating);
        table.competitors.insert(id, competitor.clone());

        Ok(competitor)
    }

    fn get_competitor(&self, id: CompetitorId) -> crate::error::Result<Option<Competitor>> {
        let table = self.read_table()?;
        Ok(table.competitors.get(&id).cloned())
    }

    fn get_competitors(
        &self,
        ids: &[CompetitorId],
    ) -> crate::error::Result<HashMap<CompetitorId, Competitor>> {
        let table = self.read_table()?;

        let mut result = HashMap::new();
        for id in ids {
            if let Some(competitor) = table.competitors.get(id) {
                result.insert(*id, competitor.clone());
            }
        }

        Ok(result)
    }

    fn store_ratings(&self, updates: &[(CompetitorId, f64)]) -> crate::error::Result<()> {
        let mut table = self.write_table()?;

        // Validate everything before touching anything
        if let Some((missing, _)) = updates
            .iter()
            .find(|(id, _)| !table.competitors.contains_key(id))
        {
            return Err(LadderError::CompetitorNotFound {
                competitor_id: *missing,
            }
            .into());
        }

        // Later entries for the same id win, and each id counts one game
        let mut latest: Vec<(CompetitorId, f64)> = Vec::with_capacity(updates.len());
        for (id, rating) in updates {
            match latest.iter_mut().find(|(seen, _)| seen == id) {
                Some(entry) => entry.1 = *rating,
                None => latest.push((*id, *rating)),
            }
        }

        for (id, rating) in latest {
            if let Some(competitor) = table.competitors.get_mut(&id) {
                competitor.record_result(rating);
            }
        }

        Ok(())
    }

    fn list_by_rating(&self) -> crate::error::Result<Vec<Competitor>> {
        let table = self.read_table()?;

        let mut competitors: Vec<Competitor> = table.competitors.values().cloned().collect();
        competitors.sort_by(|a, b| {
            b.rating
                .partial_cmp(&a.rating)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });

        Ok(competitors)
    }

    fn competitor_count(&self) -> crate::error::Result<usize> {
        let table = self.read_table()?;
        Ok(table.competitors.len())
    }

    fn reset(&self) -> crate::error::Result<()> {
        let mut table = self.write_table()?;
        table.competitors.clear();
        table.next_id = 1;
        Ok(())
    }
}
