//! Sync orchestration across mailbox accounts
//!
//! Drives the per-mailbox remote sync calls strictly one at a time, in
//! the order the targets were given, records each mailbox's status
//! transitions, and aggregates the batch outcome. A failure on one
//! mailbox never aborts the remaining mailboxes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::engine::EngineEvent;
use crate::error::{EngineError, EngineResult};
use crate::remote::MailboxSyncApi;

/// Per-mailbox sync lifecycle. Transitions are strictly
/// `Idle -> Syncing -> (Success | Error)` within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Idle,
    Syncing,
    Success,
    Error,
}

/// Sync state for one mailbox (or the derived `all` scope).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncState {
    pub status: SyncStatus,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            status: SyncStatus::Idle,
            last_synced_at: None,
            error: None,
        }
    }
}

/// Aggregate outcome of one sync batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Total messages newly inserted across succeeding mailboxes.
    pub inserted: u64,
}

impl SyncReport {
    pub fn nothing_attempted(&self) -> bool {
        self.attempted == 0
    }

    pub fn all_failed(&self) -> bool {
        self.attempted > 0 && self.succeeded == 0
    }

    /// User-facing summary line for the batch notification.
    pub fn summary(&self) -> String {
        if self.nothing_attempted() {
            "Nothing to sync".to_string()
        } else if self.failed == 0 {
            format!(
                "Synced {} of {} mailboxes, {} new messages",
                self.succeeded, self.attempted, self.inserted
            )
        } else if self.succeeded == 0 {
            format!("Sync failed for all {} mailboxes", self.attempted)
        } else {
            format!(
                "{} of {} mailboxes synced, {} new messages, {} failed",
                self.succeeded, self.attempted, self.inserted, self.failed
            )
        }
    }
}

/// Sequences per-mailbox sync calls and owns the SyncState map.
pub struct SyncOrchestrator {
    states: HashMap<String, SyncState>,
    events: mpsc::Sender<EngineEvent>,
}

impl SyncOrchestrator {
    pub fn new(events: mpsc::Sender<EngineEvent>) -> Self {
        Self {
            states: HashMap::new(),
            events,
        }
    }

    /// State for a mailbox; mailboxes never synced report `Idle`.
    pub fn state(&self, mailbox_id: &str) -> SyncState {
        self.states.get(mailbox_id).cloned().unwrap_or_default()
    }

    /// Derived state for a set of mailboxes (the `all` entry). Never
    /// set independently: syncing if any member is syncing, error if
    /// any member errored, success once every member succeeded.
    pub fn aggregate(&self, mailbox_ids: &[String]) -> SyncState {
        let members: Vec<SyncState> = mailbox_ids.iter().map(|id| self.state(id)).collect();
        let last_synced_at = members.iter().filter_map(|s| s.last_synced_at).max();

        let status = if members.iter().any(|s| s.status == SyncStatus::Syncing) {
            SyncStatus::Syncing
        } else if members.iter().any(|s| s.status == SyncStatus::Error) {
            SyncStatus::Error
        } else if !members.is_empty() && members.iter().all(|s| s.status == SyncStatus::Success) {
            SyncStatus::Success
        } else {
            SyncStatus::Idle
        };

        let error = members.iter().find_map(|s| s.error.clone());
        SyncState {
            status,
            last_synced_at,
            error,
        }
    }

    /// Run one sync batch over the given targets.
    ///
    /// An empty target list is a no-op reported as "nothing to sync".
    /// A missing credential means no call could even be attempted and
    /// is reported distinctly from "all targets failed".
    pub async fn sync_mailboxes<A: MailboxSyncApi + ?Sized>(
        &mut self,
        api: &A,
        targets: &[String],
        credential: Option<&str>,
        fetch_limit: u32,
    ) -> EngineResult<SyncReport> {
        if targets.is_empty() {
            info!("sync requested with no targets");
            let report = SyncReport::default();
            let _ = self
                .events
                .send(EngineEvent::Notification {
                    message: report.summary(),
                })
                .await;
            return Ok(report);
        }

        let credential = credential
            .ok_or_else(|| EngineError::SyncUnavailable("no sync credential configured".into()))?;

        // All targets become syncing before the first network call.
        for mailbox_id in targets {
            self.states.insert(
                mailbox_id.clone(),
                SyncState {
                    status: SyncStatus::Syncing,
                    ..self.state(mailbox_id)
                },
            );
            let _ = self
                .events
                .send(EngineEvent::SyncStarted {
                    mailbox_id: mailbox_id.clone(),
                })
                .await;
        }

        let mut report = SyncReport {
            attempted: targets.len(),
            ..Default::default()
        };

        // One mailbox at a time, in the order the targets were given.
        for mailbox_id in targets {
            match api.trigger_sync(mailbox_id, fetch_limit, credential).await {
                Ok(outcome) => {
                    info!(
                        mailbox = %mailbox_id,
                        processed = outcome.processed,
                        inserted = outcome.inserted,
                        skipped = outcome.skipped,
                        "mailbox synced"
                    );
                    self.states.insert(
                        mailbox_id.clone(),
                        SyncState {
                            status: SyncStatus::Success,
                            last_synced_at: Some(Utc::now()),
                            error: None,
                        },
                    );
                    report.succeeded += 1;
                    report.inserted += outcome.inserted;
                    let _ = self
                        .events
                        .send(EngineEvent::SyncCompleted {
                            mailbox_id: mailbox_id.clone(),
                            inserted: outcome.inserted,
                        })
                        .await;
                }
                Err(e) => {
                    warn!(mailbox = %mailbox_id, error = %e, "mailbox sync failed");
                    self.states.insert(
                        mailbox_id.clone(),
                        SyncState {
                            status: SyncStatus::Error,
                            error: Some(e.to_string()),
                            ..self.state(mailbox_id)
                        },
                    );
                    report.failed += 1;
                    let _ = self
                        .events
                        .send(EngineEvent::SyncFailed {
                            mailbox_id: mailbox_id.clone(),
                            error: e.to_string(),
                        })
                        .await;
                }
            }
        }

        let _ = self
            .events
            .send(EngineEvent::Notification {
                message: report.summary(),
            })
            .await;

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RemoteError, RemoteResult};
    use crate::remote::SyncOutcome;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scripted sync backend recording call order.
    struct FakeSyncApi {
        outcomes: HashMap<String, Result<SyncOutcome, String>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeSyncApi {
        fn new(outcomes: Vec<(&str, Result<SyncOutcome, String>)>) -> Self {
            Self {
                outcomes: outcomes
                    .into_iter()
                    .map(|(id, o)| (id.to_string(), o))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MailboxSyncApi for FakeSyncApi {
        async fn trigger_sync(
            &self,
            mailbox_id: &str,
            _fetch_limit: u32,
            _credential: &str,
        ) -> RemoteResult<SyncOutcome> {
            self.calls.lock().unwrap().push(mailbox_id.to_string());
            match self.outcomes.get(mailbox_id) {
                Some(Ok(outcome)) => Ok(*outcome),
                Some(Err(message)) => Err(RemoteError::new(message.clone())),
                None => Err(RemoteError::new("unknown mailbox")),
            }
        }
    }

    fn outcome(inserted: u64) -> SyncOutcome {
        SyncOutcome {
            processed: inserted + 2,
            inserted,
            skipped: 2,
        }
    }

    fn orchestrator() -> (SyncOrchestrator, mpsc::Receiver<EngineEvent>) {
        let (tx, rx) = mpsc::channel(100);
        (SyncOrchestrator::new(tx), rx)
    }

    #[tokio::test]
    async fn test_partial_batch_two_of_three() {
        let api = FakeSyncApi::new(vec![
            ("mb1", Ok(outcome(4))),
            ("mb2", Err("connection refused".to_string())),
            ("mb3", Ok(outcome(3))),
        ]);
        let (mut orch, _rx) = orchestrator();
        let targets = vec!["mb1".to_string(), "mb2".to_string(), "mb3".to_string()];

        let report = orch
            .sync_mailboxes(&api, &targets, Some("token"), 100)
            .await
            .unwrap();

        assert_eq!(report.attempted, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.inserted, 7);
        assert_eq!(
            report.summary(),
            "2 of 3 mailboxes synced, 7 new messages, 1 failed"
        );

        // Calls ran in target order, one at a time.
        assert_eq!(*api.calls.lock().unwrap(), targets);

        // Succeeding mailboxes got a timestamp; the failing one kept
        // none and retains a non-empty error.
        assert!(orch.state("mb1").last_synced_at.is_some());
        assert!(orch.state("mb3").last_synced_at.is_some());
        let failed = orch.state("mb2");
        assert_eq!(failed.status, SyncStatus::Error);
        assert!(failed.last_synced_at.is_none());
        assert!(!failed.error.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_state_transitions_observed_in_order() {
        let api = FakeSyncApi::new(vec![
            ("mb1", Ok(outcome(1))),
            ("mb2", Err("boom".to_string())),
        ]);
        let (mut orch, mut rx) = orchestrator();
        let targets = vec!["mb1".to_string(), "mb2".to_string()];

        orch.sync_mailboxes(&api, &targets, Some("token"), 50)
            .await
            .unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }

        // Both mailboxes marked syncing before any terminal event.
        assert!(matches!(&events[0], EngineEvent::SyncStarted { mailbox_id } if mailbox_id == "mb1"));
        assert!(matches!(&events[1], EngineEvent::SyncStarted { mailbox_id } if mailbox_id == "mb2"));
        assert!(matches!(&events[2], EngineEvent::SyncCompleted { mailbox_id, inserted: 1 } if mailbox_id == "mb1"));
        assert!(matches!(&events[3], EngineEvent::SyncFailed { mailbox_id, .. } if mailbox_id == "mb2"));
        assert!(matches!(&events[4], EngineEvent::Notification { .. }));
    }

    #[tokio::test]
    async fn test_empty_targets_is_a_noop() {
        let api = FakeSyncApi::new(vec![]);
        let (mut orch, _rx) = orchestrator();

        let report = orch
            .sync_mailboxes(&api, &[], Some("token"), 100)
            .await
            .unwrap();

        assert!(report.nothing_attempted());
        assert_eq!(report.summary(), "Nothing to sync");
        assert!(api.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_credential_reported_distinctly() {
        let api = FakeSyncApi::new(vec![("mb1", Ok(outcome(1)))]);
        let (mut orch, _rx) = orchestrator();
        let targets = vec!["mb1".to_string()];

        let err = orch
            .sync_mailboxes(&api, &targets, None, 100)
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::SyncUnavailable(_)));
        // Nothing was attempted and no state was touched.
        assert!(api.calls.lock().unwrap().is_empty());
        assert_eq!(orch.state("mb1").status, SyncStatus::Idle);
    }

    #[tokio::test]
    async fn test_aggregate_is_derived_from_members() {
        let api = FakeSyncApi::new(vec![
            ("mb1", Ok(outcome(1))),
            ("mb2", Err("boom".to_string())),
        ]);
        let (mut orch, _rx) = orchestrator();
        let targets = vec!["mb1".to_string(), "mb2".to_string()];

        assert_eq!(orch.aggregate(&targets).status, SyncStatus::Idle);

        orch.sync_mailboxes(&api, &targets, Some("token"), 50)
            .await
            .unwrap();

        let all = orch.aggregate(&targets);
        assert_eq!(all.status, SyncStatus::Error);
        assert!(all.last_synced_at.is_some());
        assert!(all.error.is_some());

        // Only successes: aggregate becomes success.
        let ok_only = vec!["mb1".to_string()];
        assert_eq!(orch.aggregate(&ok_only).status, SyncStatus::Success);
    }
}
