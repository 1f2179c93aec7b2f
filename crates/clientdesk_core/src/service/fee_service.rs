//! Fee settings use-case service with an explicit in-process cache.
//!
//! # Responsibility
//! - Serve the fee schedule from cache, falling back to the repository.
//! - Persist schedule and override edits.
//!
//! # Invariants
//! - `save_fees` always invalidates the cache, even when the write fails.
//! - Nothing else invalidates the cache; external sheet edits become visible
//!   after the next save or a process restart.
//! - Custom overrides are never cached.

use super::ServiceResult;
use crate::model::fee::{CustomFeeTable, FeeSchedule};
use crate::repo::fee_repo::FeeRepository;
use log::{debug, info};
use std::sync::{Mutex, MutexGuard};

/// Process-local fee schedule cache.
#[derive(Debug, Default)]
pub struct FeeCache {
    slot: Mutex<Option<FeeSchedule>>,
}

impl FeeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<FeeSchedule> {
        self.slot().clone()
    }

    pub fn put(&self, schedule: FeeSchedule) {
        *self.slot() = Some(schedule);
    }

    pub fn invalidate(&self) {
        *self.slot() = None;
    }

    pub fn is_warm(&self) -> bool {
        self.slot().is_some()
    }

    // A poisoned slot only ever holds a complete value, so recover it.
    fn slot(&self) -> MutexGuard<'_, Option<FeeSchedule>> {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub struct FeeService<R: FeeRepository> {
    repo: R,
    cache: FeeCache,
}

impl<R: FeeRepository> FeeService<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            cache: FeeCache::new(),
        }
    }

    pub fn cache(&self) -> &FeeCache {
        &self.cache
    }

    /// Cached schedule, or a fresh read that then populates the cache.
    pub fn load_fees(&self) -> ServiceResult<FeeSchedule> {
        if let Some(schedule) = self.cache.get() {
            debug!("event=fee_load module=service status=ok source=cache");
            return Ok(schedule);
        }
        let schedule = self.repo.load_fee_schedule()?;
        self.cache.put(schedule.clone());
        info!(
            "event=fee_load module=service status=ok source=store entries={}",
            schedule.len()
        );
        Ok(schedule)
    }

    /// Replaces the stored schedule wholesale.
    pub fn save_fees(&self, schedule: &FeeSchedule) -> ServiceResult<()> {
        let result = self.repo.store_fee_schedule(schedule);
        self.cache.invalidate();
        result?;
        Ok(())
    }

    pub fn load_custom_fees(&self) -> ServiceResult<CustomFeeTable> {
        Ok(self.repo.load_custom_fees()?)
    }

    pub fn save_custom_fees(&self, table: &CustomFeeTable) -> ServiceResult<()> {
        Ok(self.repo.store_custom_fees(table)?)
    }
}
