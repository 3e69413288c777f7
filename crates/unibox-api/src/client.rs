use async_trait::async_trait;
use tracing::{debug, info};

use unibox_core::remote::{
    CampaignApi, CampaignRef, MailboxSyncApi, MessageApi, Opportunity, OpportunityDraft,
    OpportunityPatch, PipelineApi, SyncOutcome,
};
use unibox_core::{Folder, MailboxScope, Message, QueryScope, RemoteResult};

use crate::error::{ApiError, ApiResult};
use crate::types::*;

/// HTTP client for the Unibox remote store.
pub struct InboxClient {
    pub(crate) http: reqwest::Client,
    pub(crate) base_url: String,
    pub(crate) access_token: String,
}

impl InboxClient {
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn checked(response: reqwest::Response) -> ApiResult<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::Api { status, body })
        }
    }

    fn scope_params(scope: &QueryScope) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        match &scope.mailboxes {
            MailboxScope::All => params.push(("scope", "all".to_string())),
            MailboxScope::Single(id) => {
                params.push(("scope", "one".to_string()));
                params.push(("mailboxId", id.clone()));
            }
            MailboxScope::AllExcept(excluded) => {
                params.push(("scope", "all".to_string()));
                let mut ids: Vec<&str> = excluded.iter().map(String::as_str).collect();
                ids.sort_unstable();
                params.push(("exclude", ids.join(",")));
            }
        }
        params.push(("view", scope.view.tag().to_string()));
        if !scope.search.is_empty() {
            params.push(("search", scope.search.clone()));
        }
        params
    }

    /// One page of messages, date descending.
    pub async fn list_page(
        &self,
        scope: &QueryScope,
        offset: usize,
        limit: usize,
    ) -> ApiResult<Vec<Message>> {
        let mut params = Self::scope_params(scope);
        params.push(("offset", offset.to_string()));
        params.push(("limit", limit.to_string()));
        debug!(offset, limit, "listing messages");

        let response = self
            .http
            .get(self.url("/api/messages"))
            .bearer_auth(&self.access_token)
            .query(&params)
            .send()
            .await?;
        let response = Self::checked(response).await?;

        let list: ListResponse<WireMessage> = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;
        debug!(records = list.records.len(), "got message page");
        Ok(list.records.into_iter().map(Message::from).collect())
    }

    /// Persist a read-flag change. Idempotent.
    pub async fn update_flags(&self, ids: &[String], read: bool) -> ApiResult<()> {
        debug!(count = ids.len(), read, "updating read flags");
        let response = self
            .http
            .patch(self.url("/api/messages/flags"))
            .bearer_auth(&self.access_token)
            .json(&FlagRequest { ids, read })
            .send()
            .await?;
        Self::checked(response).await?;
        Ok(())
    }

    /// Reassign the folder for a set of messages. Idempotent.
    pub async fn move_messages(&self, ids: &[String], destination: &Folder) -> ApiResult<()> {
        debug!(count = ids.len(), ?destination, "moving messages");
        let response = self
            .http
            .post(self.url("/api/messages/move"))
            .bearer_auth(&self.access_token)
            .json(&MoveRequest { ids, destination })
            .send()
            .await?;
        Self::checked(response).await?;
        Ok(())
    }

    /// Trigger a sync run for one mailbox on the sync backend. The
    /// bearer credential is per-call, not the client token.
    pub async fn sync_mailbox(
        &self,
        mailbox_id: &str,
        fetch_limit: u32,
        credential: &str,
    ) -> ApiResult<SyncOutcome> {
        info!(mailbox = %mailbox_id, fetch_limit, "triggering mailbox sync");
        let response = self
            .http
            .post(self.url(&format!("/api/mailboxes/{mailbox_id}/sync")))
            .bearer_auth(credential)
            .json(&SyncRequest { fetch_limit })
            .send()
            .await?;
        let response = Self::checked(response).await?;

        let sync: SyncResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;
        if !sync.success {
            return Err(ApiError::SyncRejected(
                sync.error.unwrap_or_else(|| "sync rejected".to_string()),
            ));
        }
        info!(
            mailbox = %mailbox_id,
            processed = sync.processed,
            inserted = sync.inserted,
            skipped = sync.skipped,
            "mailbox sync finished"
        );
        Ok(sync.outcome())
    }

    pub async fn find_opportunity(
        &self,
        pipeline_id: &str,
        email: &str,
    ) -> ApiResult<Option<Opportunity>> {
        debug!(pipeline = %pipeline_id, email, "looking up opportunity");
        let response = self
            .http
            .get(self.url(&format!("/api/pipelines/{pipeline_id}/opportunities")))
            .bearer_auth(&self.access_token)
            .query(&[("email", email)])
            .send()
            .await?;
        let response = Self::checked(response).await?;

        let list: ListResponse<WireOpportunity> = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;
        Ok(list.records.into_iter().next().map(Opportunity::from))
    }

    pub async fn create_opportunity(&self, draft: &OpportunityDraft) -> ApiResult<Opportunity> {
        let response = self
            .http
            .post(self.url("/api/opportunities"))
            .bearer_auth(&self.access_token)
            .json(draft)
            .send()
            .await?;
        let response = Self::checked(response).await?;

        let created: WireOpportunity = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;
        Ok(created.into())
    }

    pub async fn update_opportunity(
        &self,
        id: &str,
        patch: &OpportunityPatch,
    ) -> ApiResult<Opportunity> {
        let response = self
            .http
            .patch(self.url(&format!("/api/opportunities/{id}")))
            .bearer_auth(&self.access_token)
            .json(patch)
            .send()
            .await?;
        let response = Self::checked(response).await?;

        let updated: WireOpportunity = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;
        Ok(updated.into())
    }

    pub async fn delete_opportunity(&self, id: &str) -> ApiResult<()> {
        let response = self
            .http
            .delete(self.url(&format!("/api/opportunities/{id}")))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        Self::checked(response).await?;
        Ok(())
    }

    pub async fn suggested_value(&self, campaign_id: &str) -> ApiResult<Option<f64>> {
        let response = self
            .http
            .get(self.url(&format!("/api/campaigns/{campaign_id}/suggested-value")))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let response = Self::checked(response).await?;

        let suggested: SuggestedValueResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;
        Ok(suggested.value)
    }

    pub async fn campaigns(&self) -> ApiResult<Vec<CampaignRef>> {
        let response = self
            .http
            .get(self.url("/api/campaigns"))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let response = Self::checked(response).await?;

        let list: ListResponse<WireCampaign> = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;
        Ok(list.records.into_iter().map(CampaignRef::from).collect())
    }
}

#[async_trait]
impl MessageApi for InboxClient {
    async fn list_messages(
        &self,
        scope: &QueryScope,
        offset: usize,
        limit: usize,
    ) -> RemoteResult<Vec<Message>> {
        Ok(self.list_page(scope, offset, limit).await?)
    }

    async fn set_read(&self, ids: &[String], read: bool) -> RemoteResult<()> {
        Ok(self.update_flags(ids, read).await?)
    }

    async fn move_to_folder(&self, ids: &[String], folder: &Folder) -> RemoteResult<()> {
        Ok(self.move_messages(ids, folder).await?)
    }
}

#[async_trait]
impl MailboxSyncApi for InboxClient {
    async fn trigger_sync(
        &self,
        mailbox_id: &str,
        fetch_limit: u32,
        credential: &str,
    ) -> RemoteResult<SyncOutcome> {
        Ok(self.sync_mailbox(mailbox_id, fetch_limit, credential).await?)
    }
}

#[async_trait]
impl PipelineApi for InboxClient {
    async fn find_opportunity_by_email(
        &self,
        pipeline_id: &str,
        email: &str,
    ) -> RemoteResult<Option<Opportunity>> {
        Ok(self.find_opportunity(pipeline_id, email).await?)
    }

    async fn create_opportunity(&self, draft: &OpportunityDraft) -> RemoteResult<Opportunity> {
        Ok(InboxClient::create_opportunity(self, draft).await?)
    }

    async fn update_opportunity(
        &self,
        id: &str,
        patch: &OpportunityPatch,
    ) -> RemoteResult<Opportunity> {
        Ok(InboxClient::update_opportunity(self, id, patch).await?)
    }

    async fn delete_opportunity(&self, id: &str) -> RemoteResult<()> {
        Ok(InboxClient::delete_opportunity(self, id).await?)
    }

    async fn suggest_value_from_campaign(&self, campaign_id: &str) -> RemoteResult<Option<f64>> {
        Ok(self.suggested_value(campaign_id).await?)
    }
}

#[async_trait]
impl CampaignApi for InboxClient {
    async fn list_campaigns(&self) -> RemoteResult<Vec<CampaignRef>> {
        Ok(self.campaigns().await?)
    }
}
