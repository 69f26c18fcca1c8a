// TestDependencies - in-memory implementations for testing
//
// MemoryOpportunityStore and FixedClock stand in for Postgres and the wall
// clock so the sync can be exercised without a database.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use super::BaseClock;
use crate::common::Learn2EarnId;
use crate::domains::learn2earn::{AdminLog, BaseOpportunityStore, Learn2Earn, Learn2EarnStatus};

// =============================================================================
// Fixed Clock
// =============================================================================

pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl BaseClock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

// =============================================================================
// Memory Opportunity Store
// =============================================================================

/// Scans in id order, like the Postgres store.
#[derive(Default)]
pub struct MemoryOpportunityStore {
    records: Mutex<BTreeMap<Learn2EarnId, Learn2Earn>>,
    audit: Mutex<Vec<AdminLog>>,
    status_writes: Mutex<u64>,
    update_calls: Mutex<u64>,
    failing_updates: Mutex<HashSet<Learn2EarnId>>,
    transient_update_failures: Mutex<u32>,
    failing_audits: Mutex<HashSet<Learn2EarnId>>,
    scan_failure_after: Mutex<Option<usize>>,
}

impl MemoryOpportunityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<Learn2Earn>) -> Self {
        let store = Self::new();
        for record in records {
            store.put(record);
        }
        store
    }

    /// Insert or replace a record, as the web app would
    pub fn put(&self, record: Learn2Earn) {
        self.records.lock().unwrap().insert(record.id, record);
    }

    pub fn get(&self, id: Learn2EarnId) -> Option<Learn2Earn> {
        self.records.lock().unwrap().get(&id).cloned()
    }

    pub fn audit_entries(&self) -> Vec<AdminLog> {
        self.audit.lock().unwrap().clone()
    }

    /// Number of status updates applied so far
    pub fn status_writes(&self) -> u64 {
        *self.status_writes.lock().unwrap()
    }

    /// Number of status update calls, failed ones included
    pub fn update_calls(&self) -> u64 {
        *self.update_calls.lock().unwrap()
    }

    /// Make every status update for `id` fail
    pub fn fail_updates_for(&self, id: Learn2EarnId) {
        self.failing_updates.lock().unwrap().insert(id);
    }

    /// Make the next `count` status updates fail, whatever the record
    pub fn fail_next_updates(&self, count: u32) {
        *self.transient_update_failures.lock().unwrap() = count;
    }

    /// Make every audit append for `id` fail
    pub fn fail_audits_for(&self, id: Learn2EarnId) {
        self.failing_audits.lock().unwrap().insert(id);
    }

    /// Yield `count` records from each scan, then an error instead of the rest
    pub fn fail_scan_after(&self, count: usize) {
        *self.scan_failure_after.lock().unwrap() = Some(count);
    }
}

#[async_trait]
impl BaseOpportunityStore for MemoryOpportunityStore {
    fn scan(&self) -> BoxStream<'_, Result<Learn2Earn>> {
        let snapshot: Vec<Learn2Earn> = self.records.lock().unwrap().values().cloned().collect();
        let items: Vec<Result<Learn2Earn>> = match *self.scan_failure_after.lock().unwrap() {
            Some(count) if count < snapshot.len() => snapshot
                .into_iter()
                .take(count)
                .map(Ok)
                .chain(std::iter::once(Err(anyhow::anyhow!(
                    "simulated read failure after {} records",
                    count
                ))))
                .collect(),
            _ => snapshot.into_iter().map(Ok).collect(),
        };
        stream::iter(items).boxed()
    }

    async fn find(&self, id: Learn2EarnId) -> Result<Option<Learn2Earn>> {
        Ok(self.get(id))
    }

    async fn update_status(
        &self,
        id: Learn2EarnId,
        status: Learn2EarnStatus,
        at: DateTime<Utc>,
    ) -> Result<()> {
        *self.update_calls.lock().unwrap() += 1;

        {
            let mut transient = self.transient_update_failures.lock().unwrap();
            if *transient > 0 {
                *transient -= 1;
                anyhow::bail!("simulated transient write failure for {}", id);
            }
        }
        if self.failing_updates.lock().unwrap().contains(&id) {
            anyhow::bail!("simulated write failure for {}", id);
        }

        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("opportunity {} no longer exists", id))?;
        record.status = status;
        record.updated_at = at;
        *self.status_writes.lock().unwrap() += 1;
        Ok(())
    }

    async fn append_audit(&self, entry: &AdminLog) -> Result<()> {
        if self
            .failing_audits
            .lock()
            .unwrap()
            .contains(&entry.learn2earn_id)
        {
            anyhow::bail!("simulated audit failure for {}", entry.learn2earn_id);
        }
        self.audit.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn audit_history(&self, id: Learn2EarnId) -> Result<Vec<AdminLog>> {
        Ok(self
            .audit
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.learn2earn_id == id)
            .cloned()
            .collect())
    }
}
