//! Conversation thread grouping
//!
//! Pure functions deriving threads from a message set. Recomputed
//! whenever the underlying filtered set changes; threads are never
//! mutated directly.

use std::collections::HashMap;

use crate::message::Message;

/// Separator between the normalized subject and the sender address in a
/// thread key.
const KEY_SEPARATOR: &str = "::";

/// A derived grouping of messages sharing a normalized subject and
/// sender. `messages` is ordered date descending.
#[derive(Debug, Clone)]
pub struct Thread {
    pub key: String,
    pub messages: Vec<Message>,
}

impl Thread {
    /// The newest message in the thread. Always the maximum date among
    /// `messages`.
    pub fn latest(&self) -> &Message {
        &self.messages[0]
    }

    pub fn count(&self) -> usize {
        self.messages.len()
    }
}

/// Strip a single leading `re:`/`fwd:`/`fw:` marker (case-insensitive),
/// trim, lowercase.
pub fn normalize_subject(subject: &str) -> String {
    let trimmed = subject.trim();
    let lower = trimmed.to_lowercase();
    let stripped = ["re:", "fwd:", "fw:"]
        .iter()
        .find_map(|marker| lower.strip_prefix(marker))
        .unwrap_or(&lower);
    stripped.trim().to_string()
}

/// Whether a subject looks like a reply (starts with `re:`).
pub fn looks_like_a_reply(subject: Option<&str>) -> bool {
    subject
        .map(|s| s.trim().to_lowercase().starts_with("re:"))
        .unwrap_or(false)
}

/// Thread key for a message: normalized subject joined with the sender
/// address as provided (the address is deliberately not normalized).
pub fn thread_key(message: &Message) -> String {
    let subject = normalize_subject(message.subject.as_deref().unwrap_or(""));
    format!("{subject}{KEY_SEPARATOR}{}", message.from)
}

/// Group a message set into conversation threads.
///
/// The grouping is order-independent: the same input set yields the
/// same set of groups regardless of input order. Within each thread
/// messages are sorted date descending; threads are sorted by their
/// latest message's date descending.
pub fn group_threads(messages: Vec<Message>) -> Vec<Thread> {
    let mut groups: HashMap<String, Vec<Message>> = HashMap::new();
    for message in messages {
        groups.entry(thread_key(&message)).or_default().push(message);
    }

    let mut threads: Vec<Thread> = groups
        .into_iter()
        .map(|(key, mut messages)| {
            messages.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
            Thread { key, messages }
        })
        .collect();

    threads.sort_by(|a, b| {
        b.latest()
            .date
            .cmp(&a.latest().date)
            .then_with(|| a.key.cmp(&b.key))
    });
    threads
}

/// The render list when threading is disabled: one thread per message,
/// in the order given.
pub fn ungrouped(messages: Vec<Message>) -> Vec<Thread> {
    messages
        .into_iter()
        .map(|message| Thread {
            key: thread_key(&message),
            messages: vec![message],
        })
        .collect()
}
