//! Optimistic bulk mutations with rollback and undo
//!
//! Every bulk action snapshots the affected cache state, applies the
//! change locally so readers see it immediately, then persists it
//! remotely. A remote failure rolls the cache back; a successful action
//! leaves its snapshot on the undo stack.

use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};
use crate::message::Folder;
use crate::remote::MessageApi;
use crate::store::{MessageStore, MutationSnapshot};

/// A bulk state change over a set of message ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    /// Move out of the active projection (folder reassignment)
    Archive,
    MarkRead,
    MarkUnread,
    /// Local annotation only; no remote call
    Assign,
}

impl BulkAction {
    pub fn label(&self) -> &'static str {
        match self {
            BulkAction::Archive => "archived",
            BulkAction::MarkRead => "marked read",
            BulkAction::MarkUnread => "marked unread",
            BulkAction::Assign => "assigned",
        }
    }
}

/// Applies optimistic transformations and keeps the undo stack.
#[derive(Default)]
pub struct MutationEngine {
    undo_stack: Vec<MutationSnapshot>,
}

impl MutationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Apply a bulk action to the given ids.
    ///
    /// The local cache is transformed before the remote call resolves.
    /// On remote failure the pre-mutation snapshot is restored and the
    /// error surfaced. The snapshot is retained for undo either way.
    /// Returns the number of ids acted on.
    pub async fn apply_bulk<A: MessageApi + ?Sized>(
        &mut self,
        store: &mut MessageStore,
        api: &A,
        ids: &[String],
        action: BulkAction,
    ) -> EngineResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let snapshot = store.snapshot(ids);
        let count = snapshot.len();
        debug!(count, ?action, "applying bulk action");

        // Optimistic local transformation.
        match action {
            BulkAction::Archive => store.set_folder(ids, &Folder::Archive),
            BulkAction::MarkRead => store.set_read(ids, true),
            BulkAction::MarkUnread => store.set_read(ids, false),
            BulkAction::Assign => store.assign(ids),
        }

        // Remote persistence; assignment is a purely local annotation.
        let persisted = match action {
            BulkAction::Archive => api.move_to_folder(ids, &Folder::Archive).await,
            BulkAction::MarkRead => api.set_read(ids, true).await,
            BulkAction::MarkUnread => api.set_read(ids, false).await,
            BulkAction::Assign => Ok(()),
        };

        // The undo affordance is offered whether the remote call
        // committed or not.
        if let Err(e) = persisted {
            warn!(count, ?action, error = %e, "persistence failed, rolling back");
            store.restore(snapshot.clone());
            self.undo_stack.push(snapshot);
            return Err(EngineError::MutationFailed {
                count,
                message: e.to_string(),
            });
        }

        self.undo_stack.push(snapshot);
        Ok(count)
    }

    /// Restore the most recent snapshot into the local cache.
    ///
    /// This reverts the cache only; it does not issue a compensating
    /// remote write, so an already-committed mutation leaves cache and
    /// server inconsistent until the next refetch. Returns the number
    /// of records restored.
    pub fn undo(&mut self, store: &mut MessageStore) -> Option<usize> {
        let snapshot = self.undo_stack.pop()?;
        let count = snapshot.len();
        store.restore(snapshot);
        Some(count)
    }

    /// Drop the most recent snapshot without restoring it (the user
    /// dismissed the undo affordance).
    pub fn dismiss(&mut self) {
        self.undo_stack.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RemoteError, RemoteResult};
    use crate::filter::QueryScope;
    use crate::message::Message;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    /// Flag persistence fake; fails every call when `fail` is set.
    struct FakeMessageApi {
        fail: bool,
        calls: Mutex<Vec<String>>,
    }

    impl FakeMessageApi {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn check(&self, call: String) -> RemoteResult<()> {
            self.calls.lock().unwrap().push(call);
            if self.fail {
                Err(RemoteError::new("persistence unavailable"))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl MessageApi for FakeMessageApi {
        async fn list_messages(
            &self,
            _scope: &QueryScope,
            _offset: usize,
            _limit: usize,
        ) -> RemoteResult<Vec<Message>> {
            Ok(Vec::new())
        }

        async fn set_read(&self, ids: &[String], read: bool) -> RemoteResult<()> {
            self.check(format!("set_read:{}:{read}", ids.len()))
        }

        async fn move_to_folder(&self, ids: &[String], folder: &Folder) -> RemoteResult<()> {
            self.check(format!("move:{}:{folder:?}", ids.len()))
        }
    }

    fn msg(id: &str, minute: u32, read: bool) -> Message {
        Message {
            id: id.to_string(),
            mailbox_id: "mb1".to_string(),
            from: "a@x.com".to_string(),
            to: "me@y.com".to_string(),
            subject: Some("Proposal".to_string()),
            body: None,
            date: Utc.with_ymd_and_hms(2024, 5, 1, 10, minute, 0).unwrap(),
            folder: Folder::Inbox,
            read,
            sequence_id: 1,
        }
    }

    fn seeded_store() -> (MessageStore, Vec<String>) {
        let mut store = MessageStore::new();
        store.ingest(vec![msg("a", 3, false), msg("b", 2, false), msg("c", 1, false)]);
        (store, vec!["a".to_string(), "b".to_string()])
    }

    #[tokio::test]
    async fn test_optimistic_archive_then_undo() {
        let (mut store, ids) = seeded_store();
        let api = FakeMessageApi::new(false);
        let mut engine = MutationEngine::new();

        let before: Vec<String> = store.active().iter().map(|m| m.id.clone()).collect();

        let count = engine
            .apply_bulk(&mut store, &api, &ids, BulkAction::Archive)
            .await
            .unwrap();
        assert_eq!(count, 2);

        // Archived ids leave the active projection immediately.
        let active: Vec<String> = store.active().iter().map(|m| m.id.clone()).collect();
        assert_eq!(active, vec!["c".to_string()]);

        // Undo restores the exact original set in the same date order.
        assert_eq!(engine.undo(&mut store), Some(2));
        let restored: Vec<String> = store.active().iter().map(|m| m.id.clone()).collect();
        assert_eq!(restored, before);
        assert!(!engine.can_undo());
    }

    #[tokio::test]
    async fn test_rollback_on_persistence_failure() {
        let (mut store, ids) = seeded_store();
        let api = FakeMessageApi::new(true);
        let mut engine = MutationEngine::new();

        let err = engine
            .apply_bulk(&mut store, &api, &ids, BulkAction::MarkRead)
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::MutationFailed { count: 2, .. }));
        // Cache rolled back: nothing is read.
        assert!(store.active().iter().all(|m| !m.read));
        // The undo affordance still exists; invoking it is a no-op
        // restore of the already-reverted state.
        assert!(engine.can_undo());
        assert_eq!(engine.undo(&mut store), Some(2));
        assert!(store.active().iter().all(|m| !m.read));
    }

    #[tokio::test]
    async fn test_mark_unread_then_read_is_idempotent() {
        let mut store = MessageStore::new();
        let ids: Vec<String> = (0..5).map(|i| format!("m{i}")).collect();
        store.ingest(
            ids.iter()
                .enumerate()
                .map(|(i, id)| msg(id, i as u32, true))
                .collect(),
        );
        let api = FakeMessageApi::new(false);
        let mut engine = MutationEngine::new();

        engine
            .apply_bulk(&mut store, &api, &ids, BulkAction::MarkUnread)
            .await
            .unwrap();
        engine
            .apply_bulk(&mut store, &api, &ids, BulkAction::MarkRead)
            .await
            .unwrap();

        // Terminal state: all five read, regardless of call order.
        assert!(ids.iter().all(|id| store.get(id).unwrap().read));
    }

    #[tokio::test]
    async fn test_assign_is_local_only() {
        let (mut store, ids) = seeded_store();
        let api = FakeMessageApi::new(true);
        let mut engine = MutationEngine::new();

        // Succeeds even though the remote would fail: no call is made.
        engine
            .apply_bulk(&mut store, &api, &ids, BulkAction::Assign)
            .await
            .unwrap();
        assert!(api.calls.lock().unwrap().is_empty());
        assert!(store.is_assigned("a"));

        // Undo reverts the annotation.
        engine.undo(&mut store);
        assert!(!store.is_assigned("a"));
    }

    #[tokio::test]
    async fn test_dismiss_drops_snapshot_without_restore() {
        let (mut store, ids) = seeded_store();
        let api = FakeMessageApi::new(false);
        let mut engine = MutationEngine::new();

        engine
            .apply_bulk(&mut store, &api, &ids, BulkAction::Archive)
            .await
            .unwrap();
        engine.dismiss();

        assert!(!engine.can_undo());
        assert_eq!(store.active().len(), 1);
    }
}
