//! The status sync.
//!
//! ```text
//! run_sync()
//!     │
//!     └─► store.scan()                      (lazy, one record at a time)
//!             ├─► anchored on-chain?         → skip
//!             ├─► derive_status(record, now)
//!             ├─► resolve_transition(stored, derived, policy)
//!             └─► on change: update_status → append_audit
//! ```
//!
//! Records are handled sequentially. The first store error aborts the run; the
//! scheduler retries the whole run, which is safe because derivation is a
//! pure function of each record and the clock.

use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;

use super::error::SyncError;
use super::models::{AdminLog, Learn2EarnStatus};
use super::status::{derive_status, resolve_transition, CompletionPolicy, Transition};
use super::store::BaseOpportunityStore;
use crate::common::Learn2EarnId;
use crate::kernel::{BaseClock, SyncDeps};

/// One status change applied (or, in a dry run, that would be applied)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusChange {
    pub id: Learn2EarnId,
    pub title: String,
    pub from: Learn2EarnStatus,
    pub to: Learn2EarnStatus,
}

/// Summary of a sync run
///
/// `changed` counts status changes found; in a dry run none of them were written.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
    pub scanned: u64,
    pub skipped_anchored: u64,
    pub unchanged: u64,
    pub changed: u64,
    pub held_terminal: u64,
    pub dry_run: bool,
    pub changes: Vec<StatusChange>,
}

pub struct StatusSynchronizer {
    store: Arc<dyn BaseOpportunityStore>,
    clock: Arc<dyn BaseClock>,
    policy: CompletionPolicy,
    dry_run: bool,
}

impl StatusSynchronizer {
    pub fn new(deps: &SyncDeps, policy: CompletionPolicy) -> Self {
        Self {
            store: deps.store.clone(),
            clock: deps.clock.clone(),
            policy,
            dry_run: false,
        }
    }

    /// Compute the report without writing anything
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn policy(&self) -> CompletionPolicy {
        self.policy
    }

    /// Bring every unanchored opportunity's stored status in line with its
    /// derived status, writing one audit entry per change.
    pub async fn run_sync(&self) -> Result<SyncReport, SyncError> {
        let now = self.clock.now();
        let mut report = SyncReport {
            dry_run: self.dry_run,
            ..Default::default()
        };

        tracing::info!(
            now = %now,
            policy = %self.policy,
            dry_run = self.dry_run,
            "Running Learn2Earn status sync"
        );

        let mut records = self.store.scan();
        let mut last_read = None;
        while let Some(record) = records.next().await {
            let opportunity = record.map_err(|source| SyncError::Scan {
                after: last_read,
                source,
            })?;
            last_read = Some(opportunity.id);
            report.scanned += 1;

            if opportunity.is_anchored() {
                tracing::debug!(
                    id = %opportunity.id,
                    contract_id = ?opportunity.contract_id,
                    "Skipping opportunity managed by its contract"
                );
                report.skipped_anchored += 1;
                continue;
            }

            let derived = derive_status(&opportunity, now);
            match resolve_transition(opportunity.status, derived, self.policy) {
                Transition::Unchanged => report.unchanged += 1,
                Transition::HeldTerminal { derived } => {
                    tracing::debug!(
                        id = %opportunity.id,
                        title = %opportunity.title,
                        derived = %derived,
                        "Keeping completed opportunity closed"
                    );
                    report.held_terminal += 1;
                }
                Transition::Change { from, to } => {
                    if !self.dry_run {
                        self.store
                            .update_status(opportunity.id, to, now)
                            .await
                            .map_err(|source| SyncError::Update {
                                id: opportunity.id,
                                source,
                            })?;

                        let entry = AdminLog::status_change(&opportunity, from, to, now);
                        self.store
                            .append_audit(&entry)
                            .await
                            .map_err(|source| SyncError::Audit {
                                id: opportunity.id,
                                source,
                            })?;
                    }

                    tracing::info!(
                        id = %opportunity.id,
                        title = %opportunity.title,
                        from = %from,
                        to = %to,
                        dry_run = self.dry_run,
                        "Learn2Earn status changed"
                    );

                    report.changed += 1;
                    report.changes.push(StatusChange {
                        id: opportunity.id,
                        title: opportunity.title,
                        from,
                        to,
                    });
                }
            }
        }

        tracing::info!(
            scanned = report.scanned,
            changed = report.changed,
            skipped_anchored = report.skipped_anchored,
            held_terminal = report.held_terminal,
            "Learn2Earn status sync complete"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::learn2earn::models::Learn2Earn;
    use crate::kernel::{FixedClock, MemoryOpportunityStore};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 15, 9, 0, 0).unwrap()
    }

    fn setup(records: Vec<Learn2Earn>) -> (Arc<MemoryOpportunityStore>, SyncDeps) {
        let store = Arc::new(MemoryOpportunityStore::with_records(records));
        let deps = SyncDeps::new(store.clone(), Arc::new(FixedClock::new(now())));
        (store, deps)
    }

    fn running(status: Learn2EarnStatus) -> Learn2Earn {
        Learn2Earn::builder()
            .title("Smart contract security".to_string())
            .start_date(Some((now() - Duration::days(1)).to_rfc3339()))
            .end_date(Some((now() + Duration::days(1)).to_rfc3339()))
            .status(status)
            .build()
    }

    #[tokio::test]
    async fn test_draft_in_window_becomes_active_with_audit() {
        let record = running(Learn2EarnStatus::Draft);
        let id = record.id;
        let (store, deps) = setup(vec![record]);

        let report = StatusSynchronizer::new(&deps, CompletionPolicy::Terminal)
            .run_sync()
            .await
            .unwrap();

        assert_eq!(report.scanned, 1);
        assert_eq!(report.changed, 1);
        assert_eq!(store.get(id).unwrap().status, Learn2EarnStatus::Active);

        let audit = store.audit_entries();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].learn2earn_id, id);
        assert_eq!(audit[0].old_status, Learn2EarnStatus::Draft);
        assert_eq!(audit[0].new_status, Learn2EarnStatus::Active);
        assert_eq!(audit[0].created_at, now());
    }

    #[tokio::test]
    async fn test_full_cap_completes_active() {
        let record = Learn2Earn::builder()
            .title("Capped".to_string())
            .start_date(Some((now() - Duration::days(3)).to_rfc3339()))
            .max_participants(Some(10))
            .total_participants(10)
            .status(Learn2EarnStatus::Active)
            .build();
        let id = record.id;
        let (store, deps) = setup(vec![record]);

        StatusSynchronizer::new(&deps, CompletionPolicy::Terminal)
            .run_sync()
            .await
            .unwrap();

        assert_eq!(store.get(id).unwrap().status, Learn2EarnStatus::Completed);
        assert_eq!(store.audit_entries().len(), 1);
    }

    #[tokio::test]
    async fn test_anchored_record_is_untouched() {
        let mut record = running(Learn2EarnStatus::Draft);
        record.contract_id = Some("0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string());
        let id = record.id;
        let (store, deps) = setup(vec![record]);

        let report = StatusSynchronizer::new(&deps, CompletionPolicy::Terminal)
            .run_sync()
            .await
            .unwrap();

        assert_eq!(report.skipped_anchored, 1);
        assert_eq!(report.changed, 0);
        assert_eq!(store.get(id).unwrap().status, Learn2EarnStatus::Draft);
        assert!(store.audit_entries().is_empty());
        assert_eq!(store.status_writes(), 0);
    }

    #[tokio::test]
    async fn test_second_run_is_a_no_op() {
        let (store, deps) = setup(vec![
            running(Learn2EarnStatus::Draft),
            running(Learn2EarnStatus::Completed),
            Learn2Earn::builder().title("No dates".to_string()).build(),
        ]);
        let sync = StatusSynchronizer::new(&deps, CompletionPolicy::Rederive);

        let first = sync.run_sync().await.unwrap();
        assert_eq!(first.changed, 2);
        let writes_after_first = store.status_writes();

        let second = sync.run_sync().await.unwrap();
        assert_eq!(second.changed, 0);
        assert_eq!(second.unchanged, 3);
        assert_eq!(store.status_writes(), writes_after_first);
        assert_eq!(store.audit_entries().len(), 2);
    }

    #[tokio::test]
    async fn test_terminal_policy_keeps_completed() {
        let record = running(Learn2EarnStatus::Completed);
        let id = record.id;
        let (store, deps) = setup(vec![record]);

        let report = StatusSynchronizer::new(&deps, CompletionPolicy::Terminal)
            .run_sync()
            .await
            .unwrap();

        assert_eq!(report.held_terminal, 1);
        assert_eq!(store.get(id).unwrap().status, Learn2EarnStatus::Completed);
        assert!(store.audit_entries().is_empty());
    }

    #[tokio::test]
    async fn test_rederive_policy_reopens_completed() {
        let record = running(Learn2EarnStatus::Completed);
        let id = record.id;
        let (store, deps) = setup(vec![record]);

        StatusSynchronizer::new(&deps, CompletionPolicy::Rederive)
            .run_sync()
            .await
            .unwrap();

        assert_eq!(store.get(id).unwrap().status, Learn2EarnStatus::Active);
        let audit = store.audit_entries();
        assert_eq!(audit[0].old_status, Learn2EarnStatus::Completed);
        assert_eq!(audit[0].new_status, Learn2EarnStatus::Active);
    }

    #[tokio::test]
    async fn test_dry_run_reports_without_writing() {
        let record = running(Learn2EarnStatus::Draft);
        let id = record.id;
        let (store, deps) = setup(vec![record]);

        let report = StatusSynchronizer::new(&deps, CompletionPolicy::Terminal)
            .with_dry_run(true)
            .run_sync()
            .await
            .unwrap();

        assert!(report.dry_run);
        assert_eq!(report.changed, 1);
        assert_eq!(
            report.changes,
            vec![StatusChange {
                id,
                title: "Smart contract security".to_string(),
                from: Learn2EarnStatus::Draft,
                to: Learn2EarnStatus::Active,
            }]
        );
        assert_eq!(store.get(id).unwrap().status, Learn2EarnStatus::Draft);
        assert_eq!(store.status_writes(), 0);
        assert!(store.audit_entries().is_empty());
    }

    #[tokio::test]
    async fn test_update_failure_aborts_remaining_records() {
        let (failing, later) = two_in_scan_order();
        let failing_id = failing.id;
        let later_id = later.id;
        let (store, deps) = setup(vec![failing, later]);
        store.fail_updates_for(failing_id);

        let err = StatusSynchronizer::new(&deps, CompletionPolicy::Terminal)
            .run_sync()
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Update { id, .. } if id == failing_id));
        assert_eq!(store.get(later_id).unwrap().status, Learn2EarnStatus::Draft);
        assert!(store.audit_entries().is_empty());
    }

    /// Two running drafts, returned in scan (id) order.
    fn two_in_scan_order() -> (Learn2Earn, Learn2Earn) {
        let a = running(Learn2EarnStatus::Draft);
        let b = running(Learn2EarnStatus::Draft);
        if a.id < b.id {
            (a, b)
        } else {
            (b, a)
        }
    }

    #[tokio::test]
    async fn test_scan_failure_aborts_remaining_records() {
        let (first, later) = two_in_scan_order();
        let first_id = first.id;
        let later_id = later.id;
        let (store, deps) = setup(vec![first, later]);
        store.fail_scan_after(1);

        let err = StatusSynchronizer::new(&deps, CompletionPolicy::Terminal)
            .run_sync()
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Scan { after: Some(id), .. } if id == first_id));
        // Records read before the failure were synced, the rest were never seen
        assert_eq!(store.get(first_id).unwrap().status, Learn2EarnStatus::Active);
        assert_eq!(store.get(later_id).unwrap().status, Learn2EarnStatus::Draft);
        assert_eq!(store.audit_entries().len(), 1);
    }

    #[tokio::test]
    async fn test_scan_failure_on_first_read_has_no_last_record() {
        let (store, deps) = setup(vec![running(Learn2EarnStatus::Draft)]);
        store.fail_scan_after(0);

        let err = StatusSynchronizer::new(&deps, CompletionPolicy::Terminal)
            .run_sync()
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Scan { after: None, .. }));
        assert_eq!(store.update_calls(), 0);
    }

    #[tokio::test]
    async fn test_audit_failure_keeps_status_write_and_aborts() {
        let (failing, later) = two_in_scan_order();
        let failing_id = failing.id;
        let later_id = later.id;
        let (store, deps) = setup(vec![failing, later]);
        store.fail_audits_for(failing_id);

        let err = StatusSynchronizer::new(&deps, CompletionPolicy::Terminal)
            .run_sync()
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Audit { id, .. } if id == failing_id));
        // Status is written before the audit append, so the change sticks without a log row
        assert_eq!(store.get(failing_id).unwrap().status, Learn2EarnStatus::Active);
        assert!(store.audit_entries().is_empty());
        assert_eq!(store.get(later_id).unwrap().status, Learn2EarnStatus::Draft);
        assert_eq!(store.status_writes(), 1);
    }

    #[tokio::test]
    async fn test_retry_after_audit_failure_does_not_relog() {
        let record = running(Learn2EarnStatus::Draft);
        let id = record.id;
        let (store, deps) = setup(vec![record]);
        store.fail_audits_for(id);
        let sync = StatusSynchronizer::new(&deps, CompletionPolicy::Terminal);

        assert!(sync.run_sync().await.is_err());
        let retry = sync.run_sync().await.unwrap();

        assert_eq!(retry.changed, 0);
        assert_eq!(retry.unchanged, 1);
        assert!(store.audit_entries().is_empty());
    }
}
