//! Inbox aggregation and synchronization engine for Unibox
//!
//! Merges messages from independently-synchronized mailbox accounts
//! into one paginated, filterable, virtualized view, groups them into
//! conversation threads, and applies bulk state changes optimistically
//! with rollback.

mod context;
mod engine;
mod error;
mod filter;
mod message;
mod mutate;
mod pagination;
mod store;
mod sync;
mod threads;
mod view;

pub mod remote;

pub use context::{ContextPanel, SenderContext};
pub use engine::{EngineEvent, InboxEngine};
pub use error::{EngineError, EngineResult, RemoteError, RemoteResult};
pub use filter::{MailboxScope, MessageFilter, QueryScope, SavedView};
pub use message::{Folder, MailboxConfig, Message};
pub use mutate::{BulkAction, MutationEngine};
pub use pagination::{FetchTicket, Paginator, PAGE_SIZE, PREFETCH_LOOKAHEAD};
pub use store::{MessageStore, MutationSnapshot};
pub use sync::{SyncOrchestrator, SyncReport, SyncState, SyncStatus};
pub use threads::{group_threads, looks_like_a_reply, normalize_subject, thread_key, ungrouped, Thread};
pub use view::{compute_visible_range, RowProfile, Selection, VisibleRange};
