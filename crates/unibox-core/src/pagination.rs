//! Pagination controller
//!
//! Tracks cursor state for the current query scope and decides when the
//! next page is needed. There is no explicit abort of in-flight fetches:
//! superseding a fetch happens by changing the scope key, and a stale
//! result is dropped when it resolves against a newer key.

use tracing::debug;

/// Fixed page size for message list fetches.
pub const PAGE_SIZE: usize = 50;

/// How close (in rows) the visible window may get to the end of the
/// rendered list before the next page is requested.
pub const PREFETCH_LOOKAHEAD: usize = 8;

/// Handle for one in-flight fetch, carrying the scope key it was issued
/// under so a stale resolution can be detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub scope_key: String,
    pub page_index: usize,
}

impl FetchTicket {
    /// Offset of the first record in this page.
    pub fn offset(&self) -> usize {
        self.page_index * PAGE_SIZE
    }
}

/// Cursor/page state for one logical query.
#[derive(Debug)]
pub struct Paginator {
    scope_key: String,
    next_page: usize,
    has_more: bool,
    in_flight: bool,
}

impl Paginator {
    pub fn new(scope_key: String) -> Self {
        Self {
            scope_key,
            next_page: 0,
            has_more: true,
            in_flight: false,
        }
    }

    pub fn scope_key(&self) -> &str {
        &self.scope_key
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Pages committed so far for the current key.
    pub fn loaded_pages(&self) -> usize {
        self.next_page
    }

    /// Switch to a new scope key, resetting to page zero. Any fetch
    /// still in flight for the previous key is logically cancelled: its
    /// ticket will no longer match when it resolves.
    pub fn reset(&mut self, scope_key: String) {
        debug!(from = %self.scope_key, to = %scope_key, "paginator reset");
        self.scope_key = scope_key;
        self.next_page = 0;
        self.has_more = true;
        self.in_flight = false;
    }

    /// Whether the next page should be requested given the last visible
    /// row and the number of rendered rows.
    pub fn should_prefetch(&self, last_visible: usize, rows: usize) -> bool {
        self.has_more && !self.in_flight && rows > 0 && last_visible + PREFETCH_LOOKAHEAD >= rows
    }

    /// Begin a fetch for the next page. Returns `None` when a fetch is
    /// already in flight or there is nothing more to load.
    pub fn begin(&mut self) -> Option<FetchTicket> {
        if self.in_flight || !self.has_more {
            return None;
        }
        self.in_flight = true;
        Some(FetchTicket {
            scope_key: self.scope_key.clone(),
            page_index: self.next_page,
        })
    }

    /// Commit a resolved fetch. Returns `false` when the result is
    /// stale (issued under a superseded key) and must be discarded.
    /// A full page implies more data is available.
    pub fn commit(&mut self, ticket: &FetchTicket, records_len: usize) -> bool {
        if ticket.scope_key != self.scope_key {
            debug!(stale = %ticket.scope_key, current = %self.scope_key, "dropping stale page");
            return false;
        }
        self.in_flight = false;
        self.has_more = records_len == PAGE_SIZE;
        self.next_page = ticket.page_index + 1;
        debug!(
            page = ticket.page_index,
            records = records_len,
            has_more = self.has_more,
            "page committed"
        );
        true
    }

    /// Record a failed fetch. Previously loaded pages stay intact and
    /// the page remains requestable.
    pub fn fail(&mut self, ticket: &FetchTicket) {
        if ticket.scope_key == self.scope_key {
            self.in_flight = false;
        }
    }
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(String::new())
    }
}
