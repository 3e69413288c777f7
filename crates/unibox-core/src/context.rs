//! Sender context panel coordination
//!
//! Thin async coordinator over the external pipeline/CRM and campaign
//! calls for the currently selected message's sender. The engine never
//! owns opportunity data; it looks it up, relays edits, and caches the
//! result per sender while the selection rests there.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::error::EngineResult;
use crate::remote::{
    CampaignApi, CampaignRef, Opportunity, OpportunityDraft, OpportunityPatch, PipelineApi,
};

/// Context for one sender address.
#[derive(Debug, Clone)]
pub struct SenderContext {
    pub email: String,
    pub opportunity: Option<Opportunity>,
}

/// Caches per-sender pipeline lookups and relays context-panel edits.
#[derive(Default)]
pub struct ContextPanel {
    cache: HashMap<String, SenderContext>,
}

impl ContextPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for a sender, fetching on first access.
    pub async fn load<P: PipelineApi + ?Sized>(
        &mut self,
        api: &P,
        pipeline_id: &str,
        email: &str,
    ) -> EngineResult<&SenderContext> {
        if !self.cache.contains_key(email) {
            debug!(email, "looking up sender opportunity");
            let opportunity = api.find_opportunity_by_email(pipeline_id, email).await?;
            self.cache.insert(
                email.to_string(),
                SenderContext {
                    email: email.to_string(),
                    opportunity,
                },
            );
        }
        Ok(&self.cache[email])
    }

    /// Create an opportunity for a sender and cache it.
    pub async fn create<P: PipelineApi + ?Sized>(
        &mut self,
        api: &P,
        draft: OpportunityDraft,
    ) -> EngineResult<Opportunity> {
        let created = api.create_opportunity(&draft).await?;
        info!(email = %draft.email, id = %created.id, "opportunity created");
        self.cache.insert(
            draft.email.clone(),
            SenderContext {
                email: draft.email,
                opportunity: Some(created.clone()),
            },
        );
        Ok(created)
    }

    /// Relay a partial update and refresh the cached entry.
    pub async fn update<P: PipelineApi + ?Sized>(
        &mut self,
        api: &P,
        id: &str,
        patch: OpportunityPatch,
    ) -> EngineResult<Opportunity> {
        let updated = api.update_opportunity(id, &patch).await?;
        self.cache.insert(
            updated.email.clone(),
            SenderContext {
                email: updated.email.clone(),
                opportunity: Some(updated.clone()),
            },
        );
        Ok(updated)
    }

    /// Delete an opportunity and drop it from the cache.
    pub async fn delete<P: PipelineApi + ?Sized>(
        &mut self,
        api: &P,
        id: &str,
        email: &str,
    ) -> EngineResult<()> {
        api.delete_opportunity(id).await?;
        self.cache.remove(email);
        Ok(())
    }

    /// Suggested opportunity value from a campaign's metrics.
    pub async fn suggest_value<P: PipelineApi + ?Sized>(
        &self,
        api: &P,
        campaign_id: &str,
    ) -> EngineResult<Option<f64>> {
        Ok(api.suggest_value_from_campaign(campaign_id).await?)
    }

    /// Campaigns available for association.
    pub async fn campaigns<C: CampaignApi + ?Sized>(
        &self,
        api: &C,
    ) -> EngineResult<Vec<CampaignRef>> {
        Ok(api.list_campaigns().await?)
    }

    /// Forget a cached sender (the selection moved away).
    pub fn evict(&mut self, email: &str) {
        self.cache.remove(email);
    }
}
