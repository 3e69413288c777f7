use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use unibox_core::remote::{CampaignRef, Opportunity, SyncOutcome};
use unibox_core::{Folder, Message};

/// Response wrapper for list endpoints
#[derive(Debug, Deserialize)]
pub struct ListResponse<T> {
    pub records: Vec<T>,
}

/// A message record on the wire
#[derive(Debug, Clone, Deserialize)]
pub struct WireMessage {
    pub id: String,
    #[serde(rename = "mailboxId")]
    pub mailbox_id: String,
    pub from: String,
    pub to: String,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub date: DateTime<Utc>,
    pub folder: Folder,
    /// Nullable on the wire; absent means unread
    #[serde(default)]
    pub read: Option<bool>,
    #[serde(rename = "sequenceId")]
    pub sequence_id: i64,
}

impl From<WireMessage> for Message {
    fn from(wire: WireMessage) -> Self {
        Message {
            id: wire.id,
            mailbox_id: wire.mailbox_id,
            from: wire.from,
            to: wire.to,
            subject: wire.subject,
            body: wire.body,
            date: wire.date,
            folder: wire.folder,
            read: wire.read.unwrap_or(false),
            sequence_id: wire.sequence_id,
        }
    }
}

/// Request body for a read-flag update
#[derive(Debug, Serialize)]
pub struct FlagRequest<'a> {
    pub ids: &'a [String],
    pub read: bool,
}

/// Request body for a folder reassignment (archive)
#[derive(Debug, Serialize)]
pub struct MoveRequest<'a> {
    pub ids: &'a [String],
    pub destination: &'a Folder,
}

/// Request body for a per-mailbox sync trigger
#[derive(Debug, Serialize)]
pub struct SyncRequest {
    #[serde(rename = "fetchLimit")]
    pub fetch_limit: u32,
}

/// Response from the sync backend
#[derive(Debug, Deserialize)]
pub struct SyncResponse {
    pub success: bool,
    #[serde(default)]
    pub processed: u64,
    #[serde(default)]
    pub inserted: u64,
    #[serde(default)]
    pub skipped: u64,
    #[serde(default)]
    pub error: Option<String>,
}

impl SyncResponse {
    pub fn outcome(&self) -> SyncOutcome {
        SyncOutcome {
            processed: self.processed,
            inserted: self.inserted,
            skipped: self.skipped,
        }
    }
}

/// An opportunity on the wire
#[derive(Debug, Clone, Deserialize)]
pub struct WireOpportunity {
    pub id: String,
    #[serde(rename = "pipelineId")]
    pub pipeline_id: String,
    pub email: String,
    pub name: String,
    pub value: Option<f64>,
    #[serde(rename = "campaignId")]
    pub campaign_id: Option<String>,
}

impl From<WireOpportunity> for Opportunity {
    fn from(wire: WireOpportunity) -> Self {
        Opportunity {
            id: wire.id,
            pipeline_id: wire.pipeline_id,
            email: wire.email,
            name: wire.name,
            value: wire.value,
            campaign_id: wire.campaign_id,
        }
    }
}

/// A campaign on the wire
#[derive(Debug, Clone, Deserialize)]
pub struct WireCampaign {
    pub id: String,
    pub name: String,
}

impl From<WireCampaign> for CampaignRef {
    fn from(wire: WireCampaign) -> Self {
        CampaignRef {
            id: wire.id,
            name: wire.name,
        }
    }
}

/// Suggested-value lookup response
#[derive(Debug, Deserialize)]
pub struct SuggestedValueResponse {
    pub value: Option<f64>,
}

/// One entry from the change feed
#[derive(Debug, Clone, Deserialize)]
pub struct WireChange {
    #[serde(rename = "mailboxId")]
    pub mailbox_id: Option<String>,
}

/// Response from the change feed poll
#[derive(Debug, Deserialize)]
pub struct ChangesResponse {
    pub cursor: u64,
    #[serde(default)]
    pub changes: Vec<WireChange>,
}
