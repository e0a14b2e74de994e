use std::sync::Arc;

use tracing::{info, warn};

use super::domain::{Campaign, CampaignId, CampaignStatus};
use super::repository::{CampaignStore, RepositoryError};

/// Result of an attempt to take one unit of campaign inventory.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotReservation {
    Reserved(Campaign),
    Exhausted(Campaign),
}

/// Guards `approved_count <= inventory` for every campaign.
///
/// The capacity check and the increment happen inside one store mutation, so two approvals
/// racing for the last unit cannot both succeed.
pub struct InventoryController<S> {
    store: Arc<S>,
}

impl<S> Clone for InventoryController<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> InventoryController<S>
where
    S: CampaignStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn reserve(&self, campaign_id: &CampaignId) -> Result<SlotReservation, RepositoryError> {
        let (campaign, reserved) = self
            .store
            .modify_campaign(campaign_id, |campaign| {
                if !campaign.has_open_slot() {
                    return false;
                }
                campaign.approved_count += 1;
                if campaign.approved_count >= campaign.inventory
                    && campaign.status == CampaignStatus::Active
                {
                    campaign.status = CampaignStatus::Full;
                }
                true
            })
            .await?;

        if !reserved {
            return Ok(SlotReservation::Exhausted(campaign));
        }

        if campaign.status == CampaignStatus::Full && campaign.approved_count == campaign.inventory {
            info!(campaign_id = %campaign.id, inventory = campaign.inventory, "campaign is now full");
        }
        Ok(SlotReservation::Reserved(campaign))
    }

    /// Returns one unit of inventory, reopening a campaign that had been marked full.
    pub async fn release(&self, campaign_id: &CampaignId) -> Result<Campaign, RepositoryError> {
        let (campaign, _) = self
            .store
            .modify_campaign(campaign_id, |campaign| {
                campaign.approved_count = campaign.approved_count.saturating_sub(1);
                if campaign.status == CampaignStatus::Full && campaign.has_open_slot() {
                    campaign.status = CampaignStatus::Active;
                }
            })
            .await?;
        Ok(campaign)
    }

    /// Recounts inventory-holding applications and rewrites the cached counter.
    pub async fn reconcile(&self, campaign_id: &CampaignId) -> Result<Campaign, RepositoryError> {
        let holding = self
            .store
            .applications_for_campaign(campaign_id)
            .await?
            .iter()
            .filter(|application| application.status.holds_inventory())
            .count();
        let holding = u32::try_from(holding).unwrap_or(u32::MAX);

        let (campaign, previous) = self
            .store
            .modify_campaign(campaign_id, move |campaign| {
                let previous = campaign.approved_count;
                campaign.approved_count = holding;
                match campaign.status {
                    CampaignStatus::Active if !campaign.has_open_slot() => {
                        campaign.status = CampaignStatus::Full;
                    }
                    CampaignStatus::Full if campaign.has_open_slot() => {
                        campaign.status = CampaignStatus::Active;
                    }
                    _ => {}
                }
                previous
            })
            .await?;

        if previous != campaign.approved_count {
            warn!(
                campaign_id = %campaign.id,
                cached = previous,
                actual = campaign.approved_count,
                "approved count drifted; cache rewritten"
            );
        }
        if campaign.approved_count > campaign.inventory {
            warn!(
                campaign_id = %campaign.id,
                approved = campaign.approved_count,
                inventory = campaign.inventory,
                "campaign is over-committed"
            );
        }
        Ok(campaign)
    }
}
