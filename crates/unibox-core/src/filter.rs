//! Saved views, ad-hoc filters, and query scope
//!
//! Pure predicates over cached messages. The saved view selects the
//! base subset; ad-hoc filters are AND-combined on top of it.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::Message;
use crate::store::MessageStore;
use crate::threads::looks_like_a_reply;

/// Body keywords the has-attachment heuristic matches on. This is a
/// text heuristic, not real attachment metadata.
const ATTACHMENT_MARKERS: &[&str] = &["attachment", "attached", "see attach"];

/// The set of mailbox accounts included in list and sync operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailboxScope {
    /// Every configured mailbox
    All,
    /// A single mailbox
    Single(String),
    /// Every mailbox except the excluded set
    AllExcept(HashSet<String>),
}

impl MailboxScope {
    pub fn includes(&self, mailbox_id: &str) -> bool {
        match self {
            MailboxScope::All => true,
            MailboxScope::Single(id) => id == mailbox_id,
            MailboxScope::AllExcept(excluded) => !excluded.contains(mailbox_id),
        }
    }

    /// Stable key fragment for scope-key comparison.
    fn key(&self) -> String {
        match self {
            MailboxScope::All => "all".to_string(),
            MailboxScope::Single(id) => format!("one:{id}"),
            MailboxScope::AllExcept(excluded) => {
                let mut ids: Vec<&str> = excluded.iter().map(String::as_str).collect();
                ids.sort_unstable();
                format!("all-except:{}", ids.join(","))
            }
        }
    }
}

/// A named predicate selecting a subset of messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SavedView {
    All,
    Unread,
    NeedsReply,
    Assigned,
    Starred,
}

impl SavedView {
    pub fn tag(&self) -> &'static str {
        match self {
            SavedView::All => "all",
            SavedView::Unread => "unread",
            SavedView::NeedsReply => "needsReply",
            SavedView::Assigned => "assigned",
            SavedView::Starred => "starred",
        }
    }

    /// Whether a message belongs to this view. The assigned and starred
    /// views consult the store's locally-tracked annotation sets.
    pub fn matches(&self, message: &Message, store: &MessageStore) -> bool {
        match self {
            SavedView::All => true,
            SavedView::Unread => !message.read,
            SavedView::NeedsReply => {
                !message.read && !looks_like_a_reply(message.subject.as_deref())
            }
            SavedView::Assigned => store.is_assigned(&message.id),
            SavedView::Starred => store.is_starred(&message.id),
        }
    }
}

/// Ad-hoc filters applied as an additional AND-combined layer on top of
/// the saved view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageFilter {
    pub from_contains: Option<String>,
    pub subject_contains: Option<String>,
    /// Keyword heuristic on body text, not attachment metadata.
    pub has_attachment: bool,
    pub after: Option<DateTime<Utc>>,
    pub before: Option<DateTime<Utc>>,
}

impl MessageFilter {
    pub fn matches(&self, message: &Message) -> bool {
        if let Some(needle) = &self.from_contains {
            if !contains_ignore_case(&message.from, needle) {
                return false;
            }
        }
        if let Some(needle) = &self.subject_contains {
            let subject = message.subject.as_deref().unwrap_or("");
            if !contains_ignore_case(subject, needle) {
                return false;
            }
        }
        if self.has_attachment {
            let body = message.body.as_deref().unwrap_or("");
            let lower = body.to_lowercase();
            if !ATTACHMENT_MARKERS.iter().any(|m| lower.contains(m)) {
                return false;
            }
        }
        if let Some(after) = self.after {
            if message.date < after {
                return false;
            }
        }
        if let Some(before) = self.before {
            if message.date > before {
                return false;
            }
        }
        true
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// The logical query the engine is currently rendering: mailbox scope,
/// saved view, committed search term, plus the local ad-hoc filter
/// layer. Passed explicitly through pagination, sync, and filtering
/// rather than held as ambient state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryScope {
    pub mailboxes: MailboxScope,
    pub view: SavedView,
    /// Debounced free-text search; key changes only when the committed
    /// term changes.
    pub search: String,
    pub filter: MessageFilter,
}

impl Default for QueryScope {
    fn default() -> Self {
        Self {
            mailboxes: MailboxScope::All,
            view: SavedView::All,
            search: String::new(),
            filter: MessageFilter::default(),
        }
    }
}

impl QueryScope {
    /// Composite key identifying the remote query. In-flight fetches
    /// for a superseded key are dropped when they resolve. The ad-hoc
    /// filter layer is local-only and does not participate.
    pub fn key(&self) -> String {
        format!(
            "{}|{}|{}",
            self.mailboxes.key(),
            self.view.tag(),
            self.search
        )
    }

    /// Full local predicate: scope membership, saved view, ad-hoc
    /// filters.
    pub fn matches(&self, message: &Message, store: &MessageStore) -> bool {
        self.mailboxes.includes(&message.mailbox_id)
            && self.view.matches(message, store)
            && self.filter.matches(message)
    }
}
