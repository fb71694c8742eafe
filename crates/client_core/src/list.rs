use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use shared::{domain::Category, protocol::ServerEvent};
use tokio::{
    sync::{broadcast, mpsc, Mutex, RwLock},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    drag::{DragSession, DragState, DropOutcome, ItemRect, KeyStep, Point},
    error::ReorderError,
    events::{ClientEvent, Notice},
    projection::ListProjection,
    reconciler::{
        move_item, plan_sort_order_writes, ConsistencyPolicy, OrderReconciler, ReconcileBatch,
        ReconcileReport, SortOrderWrite,
    },
    store::CategoryStore,
};

/// Reorderable category list kept in sync with a remote [`CategoryStore`].
///
/// Drops are applied locally first and then persisted. While a batch is being
/// written no new drag may start.
pub struct SortableCategoryList {
    store: Arc<dyn CategoryStore>,
    projection: RwLock<ListProjection>,
    drag: Mutex<DragSession>,
    reconciler: OrderReconciler,
    events: broadcast::Sender<ClientEvent>,
    refresh_pending: AtomicBool,
}

impl SortableCategoryList {
    pub fn new(store: Arc<dyn CategoryStore>, policy: ConsistencyPolicy) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            store,
            projection: RwLock::new(ListProjection::new()),
            drag: Mutex::new(DragSession::new()),
            reconciler: OrderReconciler::new(policy),
            events,
            refresh_pending: AtomicBool::new(false),
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub fn is_persisting(&self) -> bool {
        self.reconciler.is_busy()
    }

    /// Replaces the local list with `records` as supplied. Cancels an active drag.
    pub async fn initialize(&self, records: Vec<Category>) {
        if let Some(DropOutcome::Cancelled { origin }) = self.drag.lock().await.cancel() {
            info!(origin, "list refreshed during drag; drag cancelled");
        }
        self.projection.write().await.initialize(records);
    }

    pub async fn current_order(&self) -> Vec<Category> {
        self.projection.read().await.current_order().to_vec()
    }

    /// Refetches the full list from the store.
    ///
    /// Holds the reconciliation gate for the whole fetch, so no drop can commit
    /// between the fetch and the replacement.
    pub async fn reload(&self) -> Result<(), ReorderError> {
        let gate = self.reconciler.try_begin()?;
        self.refresh_pending.store(false, Ordering::SeqCst);
        let fetched = self.fetch_into_projection(&gate).await;
        drop(gate);
        self.refresh_if_pending().await;
        fetched
    }

    async fn fetch_into_projection(&self, gate: &ReconcileBatch<'_>) -> Result<(), ReorderError> {
        let records = self
            .store
            .list_categories()
            .await
            .map_err(|source| ReorderError::Load { source })?;
        debug!(count = records.len(), batch_id = %gate.id(), "categories reloaded");
        self.initialize(records.clone()).await;
        let _ = self.events.send(ClientEvent::OrderChanged(records));
        Ok(())
    }

    /// Runs a refetch requested while the gate was held. Whoever releases the
    /// gate calls this, so a request is never stranded.
    async fn refresh_if_pending(&self) {
        loop {
            let Ok(gate) = self.reconciler.try_begin() else {
                return;
            };
            if !self.refresh_pending.swap(false, Ordering::SeqCst) {
                return;
            }
            if let Err(err) = self.fetch_into_projection(&gate).await {
                warn!(error = %err, "failed to refresh categories");
                let _ = self.events.send(ClientEvent::Error(err.to_string()));
                return;
            }
        }
    }

    pub async fn begin_drag(
        &self,
        origin: usize,
        layout: Vec<ItemRect>,
    ) -> Result<(), ReorderError> {
        if self.is_persisting() {
            return Err(ReorderError::PersistInFlight);
        }
        let items = self.projection.read().await.len();
        if layout.len() != items {
            return Err(ReorderError::LayoutMismatch {
                layout: layout.len(),
                items,
            });
        }
        self.drag.lock().await.begin(origin, layout)?;
        debug!(origin, "drag started");
        Ok(())
    }

    pub async fn pointer_moved(&self, pointer: Point) -> Result<usize, ReorderError> {
        self.drag.lock().await.pointer_moved(pointer)
    }

    pub async fn key_step(&self, step: KeyStep) -> Result<usize, ReorderError> {
        self.drag.lock().await.key_step(step)
    }

    pub async fn drag_state(&self) -> DragState {
        self.drag.lock().await.state()
    }

    /// Where every item would sit if the drag were released now.
    pub async fn preview_order(&self) -> Vec<Category> {
        let projection = self.projection.read().await;
        self.drag
            .lock()
            .await
            .preview_order(projection.current_order())
    }

    pub async fn item_offset(&self, index: usize) -> Point {
        self.drag.lock().await.item_offset(index)
    }

    pub async fn cancel_drag(&self) -> bool {
        self.drag.lock().await.cancel().is_some()
    }

    /// Completes the drag. A cancelled drop returns `Ok(None)` without writes or
    /// notifications; a committed drop returns the persistence report.
    ///
    /// While another batch or a reload holds the gate the drag stays active and
    /// `PersistInFlight` is returned.
    pub async fn release(&self) -> Result<Option<ReconcileReport>, ReorderError> {
        let batch = self.reconciler.try_begin()?;
        let result = self.commit_drop(&batch).await;
        drop(batch);
        self.refresh_if_pending().await;
        result
    }

    async fn commit_drop(
        &self,
        batch: &ReconcileBatch<'_>,
    ) -> Result<Option<ReconcileReport>, ReorderError> {
        let outcome = self.drag.lock().await.release()?;
        let (origin, destination) = match outcome {
            DropOutcome::Cancelled { origin } => {
                debug!(origin, "drop cancelled");
                return Ok(None);
            }
            DropOutcome::Dropped {
                origin,
                destination,
            } => (origin, destination),
        };

        let (previous, reordered) = {
            let mut projection = self.projection.write().await;
            let previous = projection.current_order().to_vec();
            let reordered = move_item(&previous, origin, destination)?;
            projection.replace(reordered.clone());
            (previous, reordered)
        };
        info!(origin, destination, batch_id = %batch.id(), "category moved");
        let _ = self
            .events
            .send(ClientEvent::OrderChanged(reordered.clone()));

        let writes = plan_sort_order_writes(&reordered);
        Ok(Some(self.persist_batch(batch, &writes, previous).await))
    }

    /// Re-issues writes for items whose stored ordinal still differs from their index,
    /// e.g. after a failed batch once the store is reachable again.
    pub async fn retry_pending(&self) -> Result<Option<ReconcileReport>, ReorderError> {
        let batch = self.reconciler.try_begin()?;
        let current = self.current_order().await;
        let writes = plan_sort_order_writes(&current);
        let report = if writes.is_empty() {
            None
        } else {
            info!(
                pending = writes.len(),
                batch_id = %batch.id(),
                "retrying pending sort order writes"
            );
            Some(self.persist_batch(&batch, &writes, current).await)
        };
        drop(batch);
        self.refresh_if_pending().await;
        Ok(report)
    }

    /// Rebroadcasts server pushes and refetches when another client changed the list.
    ///
    /// Updates that match the local ordinal are echoes of this list's own writes
    /// and are not refetched.
    pub fn spawn_server_sync(
        self: &Arc<Self>,
        mut server_events: mpsc::Receiver<ServerEvent>,
    ) -> JoinHandle<()> {
        let list = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = server_events.recv().await {
                let stale = match &event {
                    ServerEvent::CategoryUpdated { category, .. } => {
                        let projection = list.projection.read().await;
                        match projection.index_of(&category.key) {
                            Some(index) => {
                                projection.current_order()[index].sort_order != category.sort_order
                                    || projection.current_order()[index].label != category.label
                            }
                            None => true,
                        }
                    }
                    ServerEvent::CategoryCreated { .. } | ServerEvent::CategoryDeleted { .. } => {
                        true
                    }
                    ServerEvent::Error(_) => false,
                };
                if stale {
                    list.refresh_pending.store(true, Ordering::SeqCst);
                }
                let _ = list.events.send(ClientEvent::Server(event));
                if stale {
                    list.refresh_if_pending().await;
                }
            }
            debug!("server event stream closed");
        })
    }

    async fn persist_batch(
        &self,
        batch: &ReconcileBatch<'_>,
        writes: &[SortOrderWrite],
        previous: Vec<Category>,
    ) -> ReconcileReport {
        let report = batch.persist(self.store.as_ref(), writes).await;

        let restored = {
            let mut projection = self.projection.write().await;
            if report.reverted {
                projection.replace(previous);
                // Compensation that did not land leaves the new ordinal in the store.
                for failure in &report.compensation_failures {
                    projection.set_sort_order(&failure.write.key, failure.write.position);
                }
            } else {
                for write in &report.applied {
                    projection.set_sort_order(&write.key, write.position);
                }
            }
            projection.current_order().to_vec()
        };

        if report.is_success() {
            let _ = self.events.send(ClientEvent::Notice(Notice::Saved {
                writes: report.applied.len(),
            }));
            return report;
        }

        let failed = report
            .failures
            .iter()
            .map(|failure| failure.write.key.clone())
            .collect();
        let message = report
            .failures
            .first()
            .map(|failure| failure.message.clone())
            .unwrap_or_default();
        warn!(
            batch_id = %report.batch_id,
            failures = report.failures.len(),
            reverted = report.reverted,
            compensation_failures = report.compensation_failures.len(),
            "category order only partially persisted"
        );
        let _ = self
            .events
            .send(ClientEvent::Notice(Notice::SaveFailed { failed, message }));

        if report.reverted {
            let count = restored.len();
            let _ = self.events.send(ClientEvent::OrderChanged(restored));
            let notice = match report.compensation_failures.first() {
                None => Notice::Reverted { restored: count },
                Some(first) => Notice::RevertFailed {
                    stuck: report
                        .compensation_failures
                        .iter()
                        .map(|failure| failure.write.key.clone())
                        .collect(),
                    message: first.message.clone(),
                },
            };
            let _ = self.events.send(ClientEvent::Notice(notice));
        }
        report
    }
}

#[cfg(test)]
#[path = "tests/list_tests.rs"]
mod tests;
