//! Remote-store boundary
//!
//! Async traits the engine suspends on: message listing and flag
//! persistence, per-mailbox sync triggering, change notifications, and
//! the pipeline/CRM context calls. `unibox-api` implements these over
//! HTTP; tests implement them in memory.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::RemoteResult;
use crate::filter::QueryScope;
use crate::message::{Folder, Message};

/// Outcome of one per-mailbox sync call. Safely repeatable with respect
/// to already-ingested messages.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub processed: u64,
    pub inserted: u64,
    pub skipped: u64,
}

/// Payload-less change signal. The correct response is a full refetch
/// of the current page, not incremental patching.
#[derive(Debug, Clone)]
pub struct ChangeNotice {
    pub mailbox_id: Option<String>,
}

/// An opportunity record in the external pipeline. This engine does not
/// own opportunity data; it only triggers calls and displays results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: String,
    pub pipeline_id: String,
    pub email: String,
    pub name: String,
    pub value: Option<f64>,
    pub campaign_id: Option<String>,
}

/// Fields for creating an opportunity from the context panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityDraft {
    pub pipeline_id: String,
    pub email: String,
    pub name: String,
    pub value: Option<f64>,
    pub campaign_id: Option<String>,
}

/// Partial update to an existing opportunity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityPatch {
    pub name: Option<String>,
    pub value: Option<f64>,
    pub campaign_id: Option<String>,
}

/// A campaign reference for associating a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignRef {
    pub id: String,
    pub name: String,
}

/// Message listing and flag persistence.
#[async_trait]
pub trait MessageApi: Send + Sync {
    /// One page of messages, date descending, filtered by the scope's
    /// mailbox set, saved view, and search term.
    async fn list_messages(
        &self,
        scope: &QueryScope,
        offset: usize,
        limit: usize,
    ) -> RemoteResult<Vec<Message>>;

    /// Persist a read-flag change for the given ids. Idempotent.
    async fn set_read(&self, ids: &[String], read: bool) -> RemoteResult<()>;

    /// Reassign the folder for the given ids (archive). Idempotent.
    async fn move_to_folder(&self, ids: &[String], folder: &Folder) -> RemoteResult<()>;
}

/// Per-mailbox sync trigger on the upstream sync backend.
#[async_trait]
pub trait MailboxSyncApi: Send + Sync {
    async fn trigger_sync(
        &self,
        mailbox_id: &str,
        fetch_limit: u32,
        credential: &str,
    ) -> RemoteResult<SyncOutcome>;
}

/// Push/subscription channel keyed by user.
#[async_trait]
pub trait ChangeNotifications: Send + Sync {
    async fn subscribe(&self, user_id: &str) -> RemoteResult<mpsc::Receiver<ChangeNotice>>;
}

/// Pipeline/CRM context calls issued when the user edits the context
/// panel for the selected message's sender.
#[async_trait]
pub trait PipelineApi: Send + Sync {
    async fn find_opportunity_by_email(
        &self,
        pipeline_id: &str,
        email: &str,
    ) -> RemoteResult<Option<Opportunity>>;

    async fn create_opportunity(&self, draft: &OpportunityDraft) -> RemoteResult<Opportunity>;

    async fn update_opportunity(
        &self,
        id: &str,
        patch: &OpportunityPatch,
    ) -> RemoteResult<Opportunity>;

    async fn delete_opportunity(&self, id: &str) -> RemoteResult<()>;

    /// Suggested opportunity value derived from a campaign's metrics.
    async fn suggest_value_from_campaign(&self, campaign_id: &str) -> RemoteResult<Option<f64>>;
}

/// Campaign lookup for conversation association.
#[async_trait]
pub trait CampaignApi: Send + Sync {
    async fn list_campaigns(&self) -> RemoteResult<Vec<CampaignRef>>;
}
