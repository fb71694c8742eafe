//! Turns a completed drag into a new order and persists the ordinals that changed.
//!
//! Writes go out one at a time, in ascending position, each awaited before the
//! next. Under [`ConsistencyPolicy::Optimistic`] a failed write does not stop the
//! batch and nothing is rolled back: the local order stays as dropped and the
//! store may disagree with it until the next reload. The failure is reported in
//! the [`ReconcileReport`] so the caller can retry or reload.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::domain::{Category, CategoryKey};
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{error::ReorderError, store::CategoryStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyPolicy {
    /// Keep the dropped order and continue after failed writes.
    #[default]
    Optimistic,
    /// On any failed write, restore the pre-drop order and write back the
    /// previous ordinals of items already persisted.
    RevertOnFailure,
}

impl FromStr for ConsistencyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "optimistic" => Ok(Self::Optimistic),
            "revert_on_failure" | "revert-on-failure" | "revert" => Ok(Self::RevertOnFailure),
            other => Err(format!("unknown consistency policy '{other}'")),
        }
    }
}

/// One `updateCategory(key, {sort_order})` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOrderWrite {
    pub key: CategoryKey,
    pub position: i64,
    pub previous: i64,
}

#[derive(Debug, Clone)]
pub struct WriteFailure {
    pub write: SortOrderWrite,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ReconcileReport {
    pub batch_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub applied: Vec<SortOrderWrite>,
    pub failures: Vec<WriteFailure>,
    pub reverted: bool,
    pub compensation_failures: Vec<WriteFailure>,
}

impl ReconcileReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn attempted(&self) -> usize {
        self.applied.len() + self.failures.len()
    }
}

/// Single-item list move: remove at `origin`, reinsert at `destination`.
pub fn move_item<T: Clone>(
    items: &[T],
    origin: usize,
    destination: usize,
) -> Result<Vec<T>, ReorderError> {
    let len = items.len();
    for index in [origin, destination] {
        if index >= len {
            return Err(ReorderError::IndexOutOfRange { index, len });
        }
    }

    let mut moved = items.to_vec();
    let item = moved.remove(origin);
    moved.insert(destination, item);
    Ok(moved)
}

/// Writes needed so every item's `sort_order` equals its index, in ascending position.
pub fn plan_sort_order_writes(items: &[Category]) -> Vec<SortOrderWrite> {
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let position = index as i64;
            (item.sort_order != position).then(|| SortOrderWrite {
                key: item.key.clone(),
                position,
                previous: item.sort_order,
            })
        })
        .collect()
}

pub struct OrderReconciler {
    gate: Semaphore,
    policy: ConsistencyPolicy,
}

impl OrderReconciler {
    pub fn new(policy: ConsistencyPolicy) -> Self {
        Self {
            gate: Semaphore::new(1),
            policy,
        }
    }

    pub fn policy(&self) -> ConsistencyPolicy {
        self.policy
    }

    pub fn is_busy(&self) -> bool {
        self.gate.available_permits() == 0
    }

    /// Claims the persistence phase. Only one batch may be in flight.
    pub fn try_begin(&self) -> Result<ReconcileBatch<'_>, ReorderError> {
        let permit = self
            .gate
            .try_acquire()
            .map_err(|_| ReorderError::PersistInFlight)?;
        Ok(ReconcileBatch {
            policy: self.policy,
            batch_id: Uuid::new_v4(),
            _permit: permit,
        })
    }
}

/// Holds the reconciliation gate until dropped.
pub struct ReconcileBatch<'a> {
    policy: ConsistencyPolicy,
    batch_id: Uuid,
    _permit: SemaphorePermit<'a>,
}

impl ReconcileBatch<'_> {
    pub fn id(&self) -> Uuid {
        self.batch_id
    }

    pub async fn persist(
        &self,
        store: &dyn CategoryStore,
        writes: &[SortOrderWrite],
    ) -> ReconcileReport {
        let started_at = Utc::now();
        info!(batch_id = %self.batch_id, writes = writes.len(), "persisting category order");

        let mut applied = Vec::new();
        let mut failures = Vec::new();
        for write in writes {
            match store
                .update_category_sort_order(&write.key, write.position)
                .await
            {
                Ok(()) => {
                    debug!(
                        batch_id = %self.batch_id,
                        key = %write.key,
                        sort_order = write.position,
                        "sort order persisted"
                    );
                    applied.push(write.clone());
                }
                Err(err) => {
                    warn!(
                        batch_id = %self.batch_id,
                        key = %write.key,
                        sort_order = write.position,
                        error = %format!("{err:#}"),
                        "sort order write failed"
                    );
                    failures.push(WriteFailure {
                        write: write.clone(),
                        message: format!("{err:#}"),
                    });
                }
            }
        }

        let mut reverted = false;
        let mut compensation_failures = Vec::new();
        if !failures.is_empty() && self.policy == ConsistencyPolicy::RevertOnFailure {
            for write in &applied {
                if let Err(err) = store
                    .update_category_sort_order(&write.key, write.previous)
                    .await
                {
                    warn!(
                        batch_id = %self.batch_id,
                        key = %write.key,
                        sort_order = write.previous,
                        error = %format!("{err:#}"),
                        "failed to restore previous sort order"
                    );
                    compensation_failures.push(WriteFailure {
                        write: write.clone(),
                        message: format!("{err:#}"),
                    });
                }
            }
            reverted = true;
        }

        ReconcileReport {
            batch_id: self.batch_id,
            started_at,
            finished_at: Utc::now(),
            applied,
            failures,
            reverted,
            compensation_failures,
        }
    }
}

#[cfg(test)]
#[path = "tests/reconciler_tests.rs"]
mod tests;
