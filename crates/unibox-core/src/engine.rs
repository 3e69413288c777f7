//! Engine composition
//!
//! `InboxEngine` wires the message store, pagination controller, sync
//! orchestrator, mutation engine, and viewport/selection state into one
//! orchestration context. All remote I/O suspends here; everything
//! derived (threads, filters, windows) stays synchronous and pure.

use std::collections::HashSet;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};
use crate::filter::{MailboxScope, MessageFilter, QueryScope, SavedView};
use crate::message::Message;
use crate::mutate::{BulkAction, MutationEngine};
use crate::pagination::{FetchTicket, Paginator, PAGE_SIZE};
use crate::remote::{MailboxSyncApi, MessageApi};
use crate::store::MessageStore;
use crate::sync::{SyncOrchestrator, SyncReport, SyncState};
use crate::threads::{group_threads, ungrouped, Thread};
use crate::view::{compute_visible_range, RowProfile, Selection, VisibleRange};

/// Events sent from the engine to subscribers
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A mailbox entered the syncing state
    SyncStarted { mailbox_id: String },
    /// A mailbox finished syncing
    SyncCompleted { mailbox_id: String, inserted: u64 },
    /// A mailbox sync failed; the batch continues
    SyncFailed { mailbox_id: String, error: String },
    /// A page was merged into the cache
    PageLoaded {
        scope_key: String,
        page_index: usize,
        records: usize,
        has_more: bool,
    },
    /// User-facing summary for a completed action
    Notification { message: String },
}

/// Channel capacity for engine events
const EVENT_CHANNEL_SIZE: usize = 100;

/// Default per-mailbox fetch limit passed to the sync backend
const DEFAULT_SYNC_FETCH_LIMIT: u32 = 100;

/// The inbox aggregation engine over one remote store.
pub struct InboxEngine<R: MessageApi + MailboxSyncApi> {
    remote: R,
    store: MessageStore,
    scope: QueryScope,
    paginator: Paginator,
    sync: SyncOrchestrator,
    mutations: MutationEngine,
    selection: Selection,
    profile: RowProfile,
    threading_enabled: bool,
    /// Fetched id order for the current scope, de-duplicated
    materialized: Vec<String>,
    events: mpsc::Sender<EngineEvent>,
    /// Bearer credential for the sync backend
    credential: Option<String>,
    sync_fetch_limit: u32,
}

impl<R: MessageApi + MailboxSyncApi> InboxEngine<R> {
    /// Create an engine and the receiver for its event stream.
    pub fn new(remote: R) -> (Self, mpsc::Receiver<EngineEvent>) {
        let (events, receiver) = mpsc::channel(EVENT_CHANNEL_SIZE);
        let scope = QueryScope::default();
        let paginator = Paginator::new(scope.key());
        let engine = Self {
            remote,
            store: MessageStore::new(),
            scope,
            paginator,
            sync: SyncOrchestrator::new(events.clone()),
            mutations: MutationEngine::new(),
            selection: Selection::new(),
            profile: RowProfile::Compact,
            threading_enabled: true,
            materialized: Vec::new(),
            events,
            credential: None,
            sync_fetch_limit: DEFAULT_SYNC_FETCH_LIMIT,
        };
        (engine, receiver)
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    pub fn scope(&self) -> &QueryScope {
        &self.scope
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn can_undo(&self) -> bool {
        self.mutations.can_undo()
    }

    pub fn has_more(&self) -> bool {
        self.paginator.has_more()
    }

    pub fn set_credential(&mut self, credential: Option<String>) {
        self.credential = credential;
    }

    pub fn set_threading(&mut self, enabled: bool) {
        self.threading_enabled = enabled;
    }

    pub fn set_profile(&mut self, profile: RowProfile) {
        self.profile = profile;
    }

    pub fn sync_state(&self, mailbox_id: &str) -> SyncState {
        self.sync.state(mailbox_id)
    }

    pub fn aggregate_sync_state(&self, mailbox_ids: &[String]) -> SyncState {
        self.sync.aggregate(mailbox_ids)
    }

    /// Switch to a new query scope. A changed scope key resets to page
    /// zero and fetches it, logically cancelling any in-flight fetch
    /// for the previous key. A change that only touches the local
    /// ad-hoc filter layer re-derives without refetching.
    pub async fn set_scope(&mut self, scope: QueryScope) -> EngineResult<usize> {
        let rekey = scope.key() != self.paginator.scope_key();
        self.scope = scope;
        if !rekey {
            self.prune_selection();
            return Ok(0);
        }
        debug!(key = %self.scope.key(), "query scope changed");
        self.paginator.reset(self.scope.key());
        self.materialized.clear();
        self.fetch_next_page().await
    }

    /// Commit a debounced search term.
    pub async fn set_search(&mut self, term: impl Into<String>) -> EngineResult<usize> {
        let mut scope = self.scope.clone();
        scope.search = term.into();
        self.set_scope(scope).await
    }

    pub async fn set_view(&mut self, view: SavedView) -> EngineResult<usize> {
        let mut scope = self.scope.clone();
        scope.view = view;
        self.set_scope(scope).await
    }

    pub async fn set_mailboxes(&mut self, mailboxes: MailboxScope) -> EngineResult<usize> {
        let mut scope = self.scope.clone();
        scope.mailboxes = mailboxes;
        self.set_scope(scope).await
    }

    pub async fn set_filter(&mut self, filter: MessageFilter) -> EngineResult<usize> {
        let mut scope = self.scope.clone();
        scope.filter = filter;
        self.set_scope(scope).await
    }

    /// Fetch the next page for the current scope and merge it into the
    /// cache. Returns the number of records received; a stale result
    /// (scope changed while in flight) is dropped and counts as zero.
    pub async fn fetch_next_page(&mut self) -> EngineResult<usize> {
        let Some(ticket) = self.paginator.begin() else {
            return Ok(0);
        };

        let result = self
            .remote
            .list_messages(&self.scope, ticket.offset(), PAGE_SIZE)
            .await;

        let records = match result {
            Ok(records) => records,
            Err(e) => {
                self.paginator.fail(&ticket);
                return Err(EngineError::FetchFailed {
                    page: ticket.page_index,
                    message: e.to_string(),
                });
            }
        };

        Ok(self.commit_page(ticket, records))
    }

    fn commit_page(&mut self, ticket: FetchTicket, records: Vec<Message>) -> usize {
        let count = records.len();
        if !self.paginator.commit(&ticket, count) {
            return 0;
        }

        for record in &records {
            if !self.materialized.iter().any(|id| id == &record.id) {
                self.materialized.push(record.id.clone());
            }
        }
        self.store.ingest(records);
        self.prune_selection();

        let _ = self.events.try_send(EngineEvent::PageLoaded {
            scope_key: ticket.scope_key,
            page_index: ticket.page_index,
            records: count,
            has_more: self.paginator.has_more(),
        });
        count
    }

    /// The render-ready list: materialized records narrowed by the
    /// active projection, saved view, and ad-hoc filters, grouped into
    /// threads (or one thread per message when threading is off).
    pub fn rendered(&self) -> Vec<Thread> {
        let messages: Vec<Message> = self
            .store
            .active_by_ids(&self.materialized)
            .into_iter()
            .filter(|m| self.scope.matches(m, &self.store))
            .cloned()
            .collect();
        if self.threading_enabled {
            group_threads(messages)
        } else {
            ungrouped(messages)
        }
    }

    fn prune_selection(&mut self) {
        let threads = self.rendered();
        let ids: HashSet<String> = threads
            .iter()
            .flat_map(|t| t.messages.iter().map(|m| m.id.clone()))
            .collect();
        self.selection.prune(&ids, threads.len());
    }

    /// Visible row window for the rendered list.
    pub fn visible_range(&self, scroll_offset: u32, viewport_height: u32) -> Option<VisibleRange> {
        compute_visible_range(
            scroll_offset,
            viewport_height,
            self.profile.row_height(),
            self.rendered().len(),
        )
    }

    /// React to a viewport report: request the next page when the
    /// window is within the lookahead threshold of the end of the
    /// rendered list. Rendered rows, not raw message ids: threading
    /// collapses a page into fewer rows.
    pub async fn on_viewport(&mut self, range: VisibleRange) -> EngineResult<usize> {
        if self
            .paginator
            .should_prefetch(range.stop, self.rendered().len())
        {
            self.fetch_next_page().await
        } else {
            Ok(0)
        }
    }

    /// Move the active selection, clamped to the rendered list. Moving
    /// toward the end of the materialized data triggers a prefetch
    /// rather than silently stopping.
    pub async fn move_selection(&mut self, delta: i64) -> EngineResult<Option<usize>> {
        let len = self.rendered().len();
        let index = self.selection.move_by(delta, len);
        if let Some(index) = index {
            if self.paginator.should_prefetch(index, len) {
                self.fetch_next_page().await?;
            }
        }
        Ok(index)
    }

    pub fn select(&mut self, index: usize, id: impl Into<String>) {
        self.selection.select(index, id);
    }

    pub fn toggle_selected(&mut self, id: &str) {
        self.selection.toggle(id);
    }

    /// Run a sync batch over the given mailboxes. When at least one
    /// succeeded the current page is refetched in full (no incremental
    /// merge).
    pub async fn sync_mailboxes(&mut self, targets: &[String]) -> EngineResult<SyncReport> {
        let report = self
            .sync
            .sync_mailboxes(
                &self.remote,
                targets,
                self.credential.as_deref(),
                self.sync_fetch_limit,
            )
            .await?;

        if report.succeeded > 0 {
            self.refetch().await?;
        }
        Ok(report)
    }

    /// Full refetch of the current page. Also the response to a change
    /// notification: the push channel carries no payload detail.
    pub async fn refetch(&mut self) -> EngineResult<usize> {
        info!(key = %self.scope.key(), "refetching current page");
        self.paginator.reset(self.scope.key());
        self.materialized.clear();
        self.fetch_next_page().await
    }

    /// Handle a payload-less "something changed" notice.
    pub async fn on_change_notice(&mut self) -> EngineResult<usize> {
        self.refetch().await
    }

    /// Apply a bulk action to the multi-selection. The selection is
    /// cleared whether the action commits or rolls back; it only
    /// repopulates through an explicit gesture.
    pub async fn apply_bulk(&mut self, action: BulkAction) -> EngineResult<usize> {
        let mut ids: Vec<String> = self.selection.selected_ids().iter().cloned().collect();
        ids.sort_unstable();
        self.selection.clear();

        let result = self
            .mutations
            .apply_bulk(&mut self.store, &self.remote, &ids, action)
            .await;

        let message = match &result {
            Ok(count) => format!("{count} messages {}", action.label()),
            Err(e) => e.to_string(),
        };
        let _ = self
            .events
            .send(EngineEvent::Notification { message })
            .await;
        result
    }

    /// Restore the most recent mutation snapshot into the local cache.
    /// No compensating remote write is issued; an already-committed
    /// mutation stays committed server-side until the next refetch.
    pub fn undo(&mut self) -> Option<usize> {
        self.mutations.undo(&mut self.store)
    }

    /// Drop the most recent undo affordance.
    pub fn dismiss_undo(&mut self) {
        self.mutations.dismiss();
    }
}
