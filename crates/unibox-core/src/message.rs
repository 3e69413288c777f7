//! Message and mailbox data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Folder a message currently lives in.
///
/// Archiving reassigns the folder; it never destroys the record
/// server-side, but archived messages leave the active projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Folder {
    Inbox,
    Archive,
    Sent,
    Trash,
    #[serde(untagged)]
    Other(String),
}

impl Folder {
    /// Whether messages in this folder belong to the active projection.
    pub fn is_active(&self) -> bool {
        !matches!(self, Folder::Archive | Folder::Trash)
    }
}

/// A message record as cached by the engine.
///
/// Immutable except for `read` and `folder`, which change only through
/// the mutation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier
    pub id: String,
    /// Owning mailbox account
    pub mailbox_id: String,
    /// Sender address
    pub from: String,
    /// Recipient address
    pub to: String,
    /// Subject line, absent for some ingested mail
    pub subject: Option<String>,
    /// Body, HTML or plain text
    pub body: Option<String>,
    /// Delivery timestamp
    pub date: DateTime<Utc>,
    pub folder: Folder,
    /// Wire-nullable; absent means unread
    pub read: bool,
    /// Provider-assigned ordinal
    pub sequence_id: i64,
}

/// A configured mailbox account.
///
/// Created and edited by an external configuration surface; the engine
/// consumes it read-only. Sync status lives in the orchestrator's state
/// map, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailboxConfig {
    pub id: String,
    /// Display label for the account
    pub label: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_active_projection() {
        assert!(Folder::Inbox.is_active());
        assert!(Folder::Sent.is_active());
        assert!(Folder::Other("newsletters".into()).is_active());
        assert!(!Folder::Archive.is_active());
        assert!(!Folder::Trash.is_active());
    }
}
