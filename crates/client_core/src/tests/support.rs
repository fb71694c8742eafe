use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::domain::{Category, CategoryKey};
use tokio::sync::Notify;

use crate::store::CategoryStore;

pub(crate) fn categories(keys: &[&str]) -> Vec<Category> {
    keys.iter()
        .enumerate()
        .map(|(index, key)| Category {
            key: CategoryKey::from(*key),
            label: key.to_uppercase(),
            icon: "tag".into(),
            sort_order: index as i64,
            is_system: false,
        })
        .collect()
}

pub(crate) fn keys(items: &[Category]) -> Vec<String> {
    items.iter().map(|c| c.key.0.clone()).collect()
}

/// Pauses every write until the test releases it.
pub(crate) struct WriteGate {
    pub started: Notify,
    pub release: Notify,
}

/// In-memory store that records every write attempt in arrival order.
#[derive(Default)]
pub(crate) struct RecordingStore {
    pub listing: Mutex<Vec<Category>>,
    pub calls: Mutex<Vec<(String, i64)>>,
    pub log: Mutex<Vec<String>>,
    pub fail_keys: Mutex<HashSet<String>>,
    pub fail_writes: Mutex<HashSet<(String, i64)>>,
    pub gate: Option<Arc<WriteGate>>,
    pub list_gate: Option<Arc<WriteGate>>,
}

impl RecordingStore {
    pub fn with_listing(listing: Vec<Category>) -> Self {
        Self {
            listing: Mutex::new(listing),
            ..Self::default()
        }
    }

    pub fn failing_on(self, keys: &[&str]) -> Self {
        self.fail_keys
            .lock()
            .expect("fail keys")
            .extend(keys.iter().map(|k| k.to_string()));
        self
    }

    /// Fails only the write of `sort_order` to `key`.
    pub fn failing_write(self, key: &str, sort_order: i64) -> Self {
        self.fail_writes
            .lock()
            .expect("fail writes")
            .insert((key.to_string(), sort_order));
        self
    }

    pub fn gated_listing(mut self, gate: Arc<WriteGate>) -> Self {
        self.list_gate = Some(gate);
        self
    }

    pub fn gated(mut self, gate: Arc<WriteGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> Vec<(String, i64)> {
        self.calls.lock().expect("calls").clone()
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().expect("log").clone()
    }

    pub fn heal(&self) {
        self.fail_keys.lock().expect("fail keys").clear();
        self.fail_writes.lock().expect("fail writes").clear();
    }
}

#[async_trait]
impl CategoryStore for RecordingStore {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        if let Some(gate) = &self.list_gate {
            gate.started.notify_one();
            gate.release.notified().await;
        }
        Ok(self.listing.lock().expect("listing").clone())
    }

    async fn update_category_sort_order(&self, key: &CategoryKey, sort_order: i64) -> Result<()> {
        self.log.lock().expect("log").push(format!("start:{key}"));
        self.calls
            .lock()
            .expect("calls")
            .push((key.0.clone(), sort_order));

        if let Some(gate) = &self.gate {
            gate.started.notify_one();
            gate.release.notified().await;
        }
        tokio::task::yield_now().await;

        self.log.lock().expect("log").push(format!("end:{key}"));
        let failing = self.fail_keys.lock().expect("fail keys").contains(key.as_str())
            || self
                .fail_writes
                .lock()
                .expect("fail writes")
                .contains(&(key.0.clone(), sort_order));
        if failing {
            return Err(anyhow!("simulated failure for {key}"));
        }
        Ok(())
    }
}
