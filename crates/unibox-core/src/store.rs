//! In-memory message cache
//!
//! Single shared mutable structure of the engine. All writers go through
//! the merge function so concurrent writers to disjoint ids never
//! interfere; the store grows monotonically within a session (no
//! eviction beyond page de-duplication).

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::message::{Folder, Message};

/// Immutable copy of the records a bulk mutation touches, plus the
/// local annotation sets. Retained on the undo stack until the user
/// dismisses the undo affordance.
#[derive(Debug, Clone)]
pub struct MutationSnapshot {
    records: Vec<Message>,
    starred: HashSet<String>,
    assigned: HashSet<String>,
}

impl MutationSnapshot {
    /// Ids captured by this snapshot.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|m| m.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Id-keyed record cache fed by paged ingestion and sync refetches.
#[derive(Debug, Default)]
pub struct MessageStore {
    records: HashMap<String, Message>,
    /// Locally-tracked derived flags; not persisted remotely.
    starred: HashSet<String>,
    assigned: HashSet<String>,
}

/// Merge an incoming record over the existing one for the same id.
/// Last write wins on duplicate id.
fn merge_record(_existing: Option<&Message>, incoming: Message) -> Message {
    incoming
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a fetched page into the cache. Returns how many records
    /// were new to the store.
    pub fn ingest(&mut self, page: Vec<Message>) -> usize {
        let mut inserted = 0;
        for incoming in page {
            let id = incoming.id.clone();
            let existing = self.records.get(&id);
            if existing.is_none() {
                inserted += 1;
            }
            let merged = merge_record(existing, incoming);
            self.records.insert(id, merged);
        }
        debug!(inserted, total = self.records.len(), "ingested page");
        inserted
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// Materialize the records for the given ids, in the given order,
    /// keeping only messages still in the active (non-archived)
    /// projection.
    pub fn active_by_ids<'a>(&'a self, ids: &'a [String]) -> Vec<&'a Message> {
        ids.iter()
            .filter_map(|id| self.records.get(id))
            .filter(|m| m.folder.is_active())
            .collect()
    }

    /// All active records, date descending. Used when the rendered list
    /// is derived from the whole cache rather than a page order.
    pub fn active(&self) -> Vec<&Message> {
        let mut out: Vec<&Message> = self
            .records
            .values()
            .filter(|m| m.folder.is_active())
            .collect();
        out.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
        out
    }

    pub fn is_starred(&self, id: &str) -> bool {
        self.starred.contains(id)
    }

    pub fn is_assigned(&self, id: &str) -> bool {
        self.assigned.contains(id)
    }

    pub fn toggle_starred(&mut self, id: &str) {
        if !self.starred.remove(id) {
            self.starred.insert(id.to_string());
        }
    }

    /// Add ids to the locally-tracked assigned set. Purely a local
    /// annotation; no remote call is involved.
    pub fn assign(&mut self, ids: &[String]) {
        for id in ids {
            self.assigned.insert(id.clone());
        }
    }

    /// Flip the read flag on the given ids.
    pub fn set_read(&mut self, ids: &[String], read: bool) {
        for id in ids {
            if let Some(msg) = self.records.get_mut(id) {
                msg.read = read;
            }
        }
    }

    /// Reassign the folder on the given ids.
    pub fn set_folder(&mut self, ids: &[String], folder: &Folder) {
        for id in ids {
            if let Some(msg) = self.records.get_mut(id) {
                msg.folder = folder.clone();
            }
        }
    }

    /// Capture the pre-mutation state of the given ids together with
    /// the annotation sets.
    pub fn snapshot(&self, ids: &[String]) -> MutationSnapshot {
        MutationSnapshot {
            records: ids
                .iter()
                .filter_map(|id| self.records.get(id).cloned())
                .collect(),
            starred: self.starred.clone(),
            assigned: self.assigned.clone(),
        }
    }

    /// Restore a snapshot into the cache, reverting the records it
    /// captured and both annotation sets.
    pub fn restore(&mut self, snapshot: MutationSnapshot) {
        debug!(count = snapshot.records.len(), "restoring snapshot");
        for record in snapshot.records {
            self.records.insert(record.id.clone(), record);
        }
        self.starred = snapshot.starred;
        self.assigned = snapshot.assigned;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn msg(id: &str, date_min: u32) -> Message {
        Message {
            id: id.to_string(),
            mailbox_id: "mb1".to_string(),
            from: "a@x.com".to_string(),
            to: "me@y.com".to_string(),
            subject: Some(format!("subject {id}")),
            body: None,
            date: Utc.with_ymd_and_hms(2024, 5, 1, 12, date_min, 0).unwrap(),
            folder: Folder::Inbox,
            read: false,
            sequence_id: 1,
        }
    }

    #[test]
    fn test_ingest_deduplicates_by_id() {
        let mut store = MessageStore::new();
        assert_eq!(store.ingest(vec![msg("a", 0), msg("b", 1)]), 2);
        // Same id again: last write wins, not a new record.
        let mut updated = msg("a", 0);
        updated.read = true;
        assert_eq!(store.ingest(vec![updated]), 0);
        assert_eq!(store.len(), 2);
        assert!(store.get("a").unwrap().read);
    }

    #[test]
    fn test_active_projection_excludes_archived() {
        let mut store = MessageStore::new();
        store.ingest(vec![msg("a", 0), msg("b", 1)]);
        store.set_folder(&["a".to_string()], &Folder::Archive);
        let active = store.active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "b");
    }

    #[test]
    fn test_snapshot_restore_reverts_records_and_flags() {
        let mut store = MessageStore::new();
        store.ingest(vec![msg("a", 0), msg("b", 1)]);
        store.toggle_starred("a");

        let ids = vec!["a".to_string(), "b".to_string()];
        let snapshot = store.snapshot(&ids);

        store.set_read(&ids, true);
        store.set_folder(&ids, &Folder::Archive);
        store.assign(&ids);
        assert!(store.active().is_empty());

        store.restore(snapshot);
        assert_eq!(store.active().len(), 2);
        assert!(!store.get("a").unwrap().read);
        assert!(store.is_starred("a"));
        assert!(!store.is_assigned("a"));
    }

    #[test]
    fn test_active_order_is_date_descending() {
        let mut store = MessageStore::new();
        store.ingest(vec![msg("old", 0), msg("new", 30), msg("mid", 15)]);
        let ids: Vec<&str> = store.active().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }
}
