use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use super::domain::{
    AdminId, Application, ApplicationId, ApplicationStatus, Campaign, CampaignId, CampaignStatus,
    CampaignType, Creator, CreatorId, CreatorProfile, LedgerContext, LedgerEntry, PenaltyReason,
    ScoreReason, ShipmentDetails, Shipping,
};
use super::inventory::{InventoryController, SlotReservation};
use super::ledger::{
    ReputationLedger, DEADLINE_MISSED_PENALTY, DEFAULT_UPLOAD_POINTS, FIRST_GHOSTING_PENALTY,
    FIRST_UPLOAD_BONUS, SIGNUP_BASELINE_SCORE,
};
use super::repository::{CampaignStore, Notification, NotificationKind, Notifier, RepositoryError};
use super::tier::celebrated_upgrade;

/// Service composing the application state machine, reputation ledger, and inventory controller.
pub struct CampaignService<S, N> {
    store: Arc<S>,
    notifier: Arc<N>,
    ledger: ReputationLedger<S>,
    inventory: InventoryController<S>,
}

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static CAMPAIGN_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("app-{id:06}"))
}

fn next_campaign_id() -> CampaignId {
    let id = CAMPAIGN_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    CampaignId(format!("campaign-{id:06}"))
}

/// Admin input for a new campaign; campaigns always start as drafts.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCampaign {
    pub title: String,
    pub campaign_type: CampaignType,
    pub inventory: u32,
    #[serde(default)]
    pub application_deadline: Option<DateTime<Utc>>,
}

/// Admin toggles for account-level sanctions; `None` leaves a flag unchanged.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct AccountFlags {
    #[serde(default)]
    pub suspended: Option<bool>,
    #[serde(default)]
    pub blocked: Option<bool>,
}

impl<S, N> CampaignService<S, N>
where
    S: CampaignStore + 'static,
    N: Notifier + 'static,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>) -> Self {
        let ledger = ReputationLedger::new(Arc::clone(&store));
        let inventory = InventoryController::new(Arc::clone(&store));
        Self {
            store,
            notifier,
            ledger,
            inventory,
        }
    }

    pub fn ledger(&self) -> &ReputationLedger<S> {
        &self.ledger
    }

    pub fn inventory(&self) -> &InventoryController<S> {
        &self.inventory
    }

    // ----- creators -------------------------------------------------------------------------

    /// Registers a creator and grants the baseline score through the ledger.
    pub async fn register_creator(
        &self,
        id: CreatorId,
        profile: CreatorProfile,
    ) -> Result<Creator, CampaignError> {
        let creator = Creator::new(id, profile, Utc::now());
        let creator = self.store.insert_creator(creator).await.map_err(|err| match err {
            RepositoryError::Conflict => CampaignError::CreatorExists,
            other => other.into(),
        })?;

        let creator = self
            .ledger
            .add_score_event(
                &creator.id,
                SIGNUP_BASELINE_SCORE,
                ScoreReason::SignupBaseline,
                LedgerContext::default(),
            )
            .await?;
        info!(creator_id = %creator.id, score = creator.score, "creator registered");
        Ok(creator)
    }

    pub async fn creator(&self, id: &CreatorId) -> Result<Creator, CampaignError> {
        self.store
            .fetch_creator(id)
            .await?
            .ok_or(CampaignError::NotFound { entity: "creator" })
    }

    pub async fn ledger_history(&self, id: &CreatorId) -> Result<Vec<LedgerEntry>, CampaignError> {
        self.creator(id).await?;
        Ok(self.ledger.history(id).await?)
    }

    pub async fn adjust_score(
        &self,
        admin: &AdminId,
        creator_id: &CreatorId,
        delta: i32,
        display_reason: Option<String>,
    ) -> Result<Creator, CampaignError> {
        let context = LedgerContext::default()
            .by_admin(admin)
            .with_display_reason(display_reason);
        self.ledger
            .add_score_event(creator_id, delta, ScoreReason::AdminAdjustment, context)
            .await
            .map_err(missing("creator"))
    }

    pub async fn add_penalty(
        &self,
        admin: &AdminId,
        creator_id: &CreatorId,
        delta: i32,
        display_reason: Option<String>,
    ) -> Result<Creator, CampaignError> {
        let context = LedgerContext::default()
            .by_admin(admin)
            .with_display_reason(display_reason);
        self.ledger
            .add_penalty_event(creator_id, delta, PenaltyReason::AdminPenalty, context)
            .await
            .map_err(missing("creator"))
    }

    pub async fn unlock(
        &self,
        admin: &AdminId,
        creator_id: &CreatorId,
    ) -> Result<Creator, CampaignError> {
        self.ledger
            .unlock(creator_id, admin)
            .await
            .map_err(missing("creator"))
    }

    pub async fn set_account_flags(
        &self,
        admin: &AdminId,
        creator_id: &CreatorId,
        flags: AccountFlags,
    ) -> Result<Creator, CampaignError> {
        let (creator, _) = self
            .store
            .update_standing(creator_id, move |standing| {
                if let Some(suspended) = flags.suspended {
                    standing.suspended = suspended;
                }
                if let Some(blocked) = flags.blocked {
                    standing.blocked = blocked;
                }
            })
            .await
            .map_err(missing("creator"))?;

        info!(
            creator_id = %creator.id,
            admin_id = %admin,
            suspended = creator.suspended,
            blocked = creator.blocked,
            "account flags updated"
        );
        Ok(creator)
    }

    /// Clears the one-shot tier celebration once the creator has seen it.
    pub async fn acknowledge_tier_upgrade(
        &self,
        actor: &CreatorId,
        creator_id: &CreatorId,
    ) -> Result<Creator, CampaignError> {
        if actor != creator_id {
            return Err(CampaignError::Forbidden);
        }
        let (creator, _) = self
            .store
            .update_standing(creator_id, |standing| {
                standing.pending_tier_upgrade = None;
            })
            .await
            .map_err(missing("creator"))?;
        Ok(creator)
    }

    pub async fn applications_for_creator(
        &self,
        creator_id: &CreatorId,
        include_dismissed: bool,
    ) -> Result<Vec<Application>, CampaignError> {
        let applications = self.store.applications_for_creator(creator_id).await?;
        Ok(applications
            .into_iter()
            .filter(|application| include_dismissed || !application.is_dismissed())
            .collect())
    }

    // ----- campaigns ------------------------------------------------------------------------

    pub async fn create_campaign(
        &self,
        admin: &AdminId,
        request: NewCampaign,
    ) -> Result<Campaign, CampaignError> {
        let campaign = Campaign {
            id: next_campaign_id(),
            title: request.title,
            campaign_type: request.campaign_type,
            inventory: request.inventory,
            approved_count: 0,
            status: CampaignStatus::Draft,
            application_deadline: request.application_deadline,
            created_at: Utc::now(),
        };
        let campaign = self.store.insert_campaign(campaign).await?;
        info!(campaign_id = %campaign.id, admin_id = %admin, inventory = campaign.inventory, "campaign created");
        Ok(campaign)
    }

    pub async fn campaign(&self, id: &CampaignId) -> Result<Campaign, CampaignError> {
        self.store
            .fetch_campaign(id)
            .await?
            .ok_or(CampaignError::NotFound { entity: "campaign" })
    }

    /// Moves a campaign between admin-controlled statuses; `full` is owned by the inventory.
    pub async fn set_campaign_status(
        &self,
        admin: &AdminId,
        id: &CampaignId,
        status: CampaignStatus,
    ) -> Result<Campaign, CampaignError> {
        if status == CampaignStatus::Full {
            return Err(CampaignError::InvalidCampaignStatus { status });
        }

        let (campaign, _) = self
            .store
            .modify_campaign(id, move |campaign| {
                campaign.status = if status == CampaignStatus::Active && !campaign.has_open_slot() {
                    CampaignStatus::Full
                } else {
                    status
                };
            })
            .await
            .map_err(missing("campaign"))?;

        info!(campaign_id = %campaign.id, admin_id = %admin, status = %campaign.status, "campaign status set");
        Ok(campaign)
    }

    pub async fn reconcile_inventory(
        &self,
        admin: &AdminId,
        id: &CampaignId,
    ) -> Result<Campaign, CampaignError> {
        let campaign = self
            .inventory
            .reconcile(id)
            .await
            .map_err(missing("campaign"))?;
        info!(campaign_id = %campaign.id, admin_id = %admin, approved = campaign.approved_count, "inventory reconciled");
        Ok(campaign)
    }

    // ----- applications ---------------------------------------------------------------------

    pub async fn application(&self, id: &ApplicationId) -> Result<Application, CampaignError> {
        self.store
            .fetch_application(id)
            .await?
            .ok_or(CampaignError::NotFound {
                entity: "application",
            })
    }

    /// Creates an application; VIP creators are approved immediately when inventory allows.
    pub async fn apply(
        &self,
        creator_id: &CreatorId,
        campaign_id: &CampaignId,
    ) -> Result<Application, CampaignError> {
        let creator = self.creator(creator_id).await?;
        if !creator.profile.is_complete() {
            return Err(CampaignError::ProfileIncomplete);
        }
        if creator.blocked {
            return Err(CampaignError::AccountBlocked);
        }
        if creator.restricted {
            return Err(CampaignError::AccountRestricted);
        }
        if creator.suspended {
            return Err(CampaignError::AccountSuspended);
        }

        let campaign = self.campaign(campaign_id).await?;
        if campaign.status != CampaignStatus::Active {
            return Err(CampaignError::CampaignNotActive {
                status: campaign.status,
            });
        }
        let now = Utc::now();
        if campaign.deadline_passed(now) {
            return Err(CampaignError::ApplicationDeadlinePassed);
        }
        if campaign.campaign_type.requires_paypal() && !creator.profile.has_paypal() {
            return Err(CampaignError::PaypalRequired);
        }

        let history = self.store.applications_for_creator(creator_id).await?;
        if history
            .iter()
            .any(|application| &application.campaign_id == campaign_id)
        {
            return Err(CampaignError::DuplicateApplication);
        }

        let tier = creator.tier();
        if tier.limits_concurrent_applications()
            && history
                .iter()
                .any(|application| !application.status.is_settled())
        {
            return Err(CampaignError::StartingTierLimit);
        }

        let first_time = !history
            .iter()
            .any(|application| application.status.is_completion());
        let application = Application::pending(
            next_application_id(),
            creator_id.clone(),
            campaign_id.clone(),
            first_time,
            now,
        );
        let application = self
            .store
            .insert_application(application)
            .await
            .map_err(|err| match err {
                RepositoryError::Conflict => CampaignError::DuplicateApplication,
                other => other.into(),
            })?;

        info!(
            application_id = %application.id,
            creator_id = %creator_id,
            campaign_id = %campaign_id,
            sequence = application.sequence_number,
            tier = %tier,
            first_time,
            "application created"
        );

        if !tier.auto_approves() {
            return Ok(application);
        }

        match self.approve_pending(&application).await {
            Ok(approved) => {
                info!(application_id = %approved.id, "vip application auto-approved");
                self.notify(
                    Notification::new(NotificationKind::ApplicationApproved, creator_id.clone())
                        .detail("application_id", approved.id.0.clone())
                        .detail("auto_approved", "true"),
                )
                .await;
                Ok(approved)
            }
            Err(CampaignError::CampaignFull) => {
                info!(application_id = %application.id, "campaign full; vip application left pending");
                Ok(application)
            }
            Err(err) => Err(err),
        }
    }

    pub async fn approve(
        &self,
        admin: &AdminId,
        id: &ApplicationId,
    ) -> Result<Application, CampaignError> {
        let application = self.application(id).await?;
        ensure_approvable(application.status)?;

        let application = self.approve_pending(&application).await?;
        info!(application_id = %application.id, admin_id = %admin, "application approved");
        self.notify(
            Notification::new(
                NotificationKind::ApplicationApproved,
                application.creator_id.clone(),
            )
            .detail("application_id", application.id.0.clone()),
        )
        .await;
        Ok(application)
    }

    /// Takes an inventory slot, then flips the row; the slot is returned if the row moved on.
    async fn approve_pending(&self, application: &Application) -> Result<Application, CampaignError> {
        match self
            .inventory
            .reserve(&application.campaign_id)
            .await
            .map_err(missing("campaign"))?
        {
            SlotReservation::Reserved(_) => {}
            SlotReservation::Exhausted(_) => return Err(CampaignError::CampaignFull),
        }

        let now = Utc::now();
        let approved = self
            .store
            .update_application::<_, CampaignError>(&application.id, move |application| {
                ensure_approvable(application.status)?;
                application.status = ApplicationStatus::Approved;
                application.approved_at = Some(now);
                if application.shipping.is_none() {
                    application.shipping = Some(Shipping::awaiting_dispatch(now));
                }
                Ok(())
            })
            .await;

        if approved.is_err() {
            if let Err(err) = self.inventory.release(&application.campaign_id).await {
                warn!(
                    campaign_id = %application.campaign_id,
                    error = %err,
                    "failed to return inventory slot after a lost approval"
                );
            }
        }
        approved.map_err(not_found_application)
    }

    pub async fn reject(
        &self,
        admin: &AdminId,
        id: &ApplicationId,
    ) -> Result<Application, CampaignError> {
        let now = Utc::now();
        let application = self
            .transition(id, "reject", move |application| {
                if application.status != ApplicationStatus::Pending {
                    return Err(CampaignError::AlreadyRejected);
                }
                application.status = ApplicationStatus::Rejected;
                application.rejected_at = Some(now);
                Ok(())
            })
            .await?;

        info!(application_id = %application.id, admin_id = %admin, "application rejected");
        self.notify(
            Notification::new(
                NotificationKind::ApplicationRejected,
                application.creator_id.clone(),
            )
            .detail("application_id", application.id.0.clone()),
        )
        .await;
        Ok(application)
    }

    pub async fn revoke(
        &self,
        admin: &AdminId,
        id: &ApplicationId,
    ) -> Result<Application, CampaignError> {
        let application = self
            .transition(id, "revoke", |application| {
                require(application, ApplicationStatus::Approved, "revoke")?;
                application.status = ApplicationStatus::Pending;
                application.approved_at = None;
                Ok(())
            })
            .await?;

        self.inventory
            .release(&application.campaign_id)
            .await
            .map_err(missing("campaign"))?;
        info!(application_id = %application.id, admin_id = %admin, "approval revoked");
        Ok(application)
    }

    pub async fn ship(
        &self,
        admin: &AdminId,
        id: &ApplicationId,
        details: ShipmentDetails,
    ) -> Result<Application, CampaignError> {
        let now = Utc::now();
        let application = self
            .transition(id, "ship", move |application| {
                require(application, ApplicationStatus::Approved, "ship")?;
                application.status = ApplicationStatus::Shipped;
                application.shipped_at = Some(now);
                let shipping = application
                    .shipping
                    .get_or_insert_with(|| Shipping::awaiting_dispatch(now));
                if details.carrier.is_some() {
                    shipping.carrier = details.carrier;
                }
                if details.tracking_number.is_some() {
                    shipping.tracking_number = details.tracking_number;
                }
                Ok(())
            })
            .await?;

        info!(application_id = %application.id, admin_id = %admin, "product shipped");
        let mut notification = Notification::new(
            NotificationKind::ProductShipped,
            application.creator_id.clone(),
        )
        .detail("application_id", application.id.0.clone());
        if let Some(tracking) = application
            .shipping
            .as_ref()
            .and_then(|shipping| shipping.tracking_number.clone())
        {
            notification = notification.detail("tracking_number", tracking);
        }
        self.notify(notification).await;
        Ok(application)
    }

    pub async fn deliver(
        &self,
        admin: &AdminId,
        id: &ApplicationId,
    ) -> Result<Application, CampaignError> {
        let now = Utc::now();
        let application = self
            .transition(id, "deliver", move |application| {
                require(application, ApplicationStatus::Shipped, "deliver")?;
                application.status = ApplicationStatus::Delivered;
                application.delivered_at = Some(now);
                Ok(())
            })
            .await?;
        info!(application_id = %application.id, admin_id = %admin, "product delivered");
        Ok(application)
    }

    pub async fn undo_deliver(
        &self,
        admin: &AdminId,
        id: &ApplicationId,
    ) -> Result<Application, CampaignError> {
        let application = self
            .transition(id, "undo_deliver", |application| {
                require(application, ApplicationStatus::Delivered, "undo_deliver")?;
                application.status = ApplicationStatus::Shipped;
                application.delivered_at = None;
                Ok(())
            })
            .await?;
        info!(application_id = %application.id, admin_id = %admin, "delivery undone");
        Ok(application)
    }

    /// Verifies an upload, awards points, and announces a tier crossing at most once.
    pub async fn mark_uploaded(
        &self,
        admin: &AdminId,
        id: &ApplicationId,
        points: Option<i32>,
    ) -> Result<Application, CampaignError> {
        let points = points.unwrap_or(DEFAULT_UPLOAD_POINTS);
        if points < 0 {
            return Err(CampaignError::InvalidPoints(points));
        }

        let now = Utc::now();
        let application = self
            .transition(id, "mark_uploaded", move |application| {
                match application.status {
                    ApplicationStatus::Uploaded | ApplicationStatus::Completed => {
                        return Err(CampaignError::AlreadyUploaded)
                    }
                    ApplicationStatus::Pending | ApplicationStatus::Rejected => {
                        return Err(CampaignError::InvalidTransition {
                            action: "mark_uploaded",
                            status: application.status,
                        })
                    }
                    _ => {}
                }
                application.status = ApplicationStatus::Uploaded;
                application.uploaded_at = Some(now);
                application.points_awarded = Some(points);
                Ok(())
            })
            .await?;

        let creator_id = application.creator_id.clone();
        let before = self.creator(&creator_id).await?.tier();
        let context = LedgerContext::for_application(&application).by_admin(admin);

        self.ledger
            .add_score_event(
                &creator_id,
                points,
                ScoreReason::UploadSuccess,
                context.clone(),
            )
            .await?;
        if application.first_time {
            self.ledger
                .add_score_event(
                    &creator_id,
                    FIRST_UPLOAD_BONUS,
                    ScoreReason::FirstUpload,
                    context,
                )
                .await?;
        }

        let (creator, _) = self
            .store
            .update_standing(&creator_id, |standing| {
                standing.completed_campaigns += 1;
            })
            .await?;
        let after = creator.tier();

        info!(
            application_id = %application.id,
            admin_id = %admin,
            points,
            first_time = application.first_time,
            score = creator.score,
            completed = creator.completed_campaigns,
            "upload verified"
        );

        self.notify(
            Notification::new(NotificationKind::UploadVerified, creator_id.clone())
                .detail("application_id", application.id.0.clone())
                .detail("points", points.to_string()),
        )
        .await;

        if let Some(tier) = celebrated_upgrade(before, after) {
            self.store
                .update_standing(&creator_id, move |standing| {
                    standing.pending_tier_upgrade = Some(tier);
                })
                .await?;
            info!(creator_id = %creator_id, from = %before, to = %tier, "tier upgrade");
            self.notify(
                Notification::new(NotificationKind::TierUpgrade, creator_id)
                    .detail("tier", tier.label()),
            )
            .await;
        }

        Ok(application)
    }

    /// Marks a delivered application as ghosted; first-time ghosting costs the full threshold.
    pub async fn mark_missed(
        &self,
        admin: &AdminId,
        id: &ApplicationId,
    ) -> Result<Application, CampaignError> {
        let current = self.application(id).await?;
        require(&current, ApplicationStatus::Delivered, "mark_missed")?;

        let has_prior_completion = self
            .store
            .applications_for_creator(&current.creator_id)
            .await?
            .iter()
            .any(|application| application.id != current.id && application.status.is_completion());
        let (amount, reason) = if has_prior_completion {
            (DEADLINE_MISSED_PENALTY, PenaltyReason::DeadlineMissed)
        } else {
            (FIRST_GHOSTING_PENALTY, PenaltyReason::FirstGhosting)
        };

        let now = Utc::now();
        let application = self
            .transition(id, "mark_missed", move |application| {
                require(application, ApplicationStatus::Delivered, "mark_missed")?;
                application.status = ApplicationStatus::DeadlineMissed;
                application.deadline_missed_at = Some(now);
                application.missed_penalty = Some(amount.unsigned_abs());
                Ok(())
            })
            .await?;

        let context = LedgerContext::for_application(&application).by_admin(admin);
        let creator = self
            .ledger
            .add_penalty_event(&application.creator_id, amount, reason, context)
            .await?;

        info!(
            application_id = %application.id,
            admin_id = %admin,
            penalty = amount,
            reason = reason.label(),
            restricted = creator.restricted,
            "deadline missed"
        );
        self.notify(
            Notification::new(
                NotificationKind::DeadlineMissed,
                application.creator_id.clone(),
            )
            .detail("application_id", application.id.0.clone())
            .detail("penalty", amount.to_string()),
        )
        .await;
        Ok(application)
    }

    /// Reverts a missed deadline and compensates the penalty it applied.
    ///
    /// The restriction latch stays set; only [`Self::unlock`] clears it.
    pub async fn undo_missed(
        &self,
        admin: &AdminId,
        id: &ApplicationId,
    ) -> Result<Application, CampaignError> {
        let current = self.application(id).await?;
        require(&current, ApplicationStatus::DeadlineMissed, "undo_missed")?;
        let applied = current.missed_penalty.unwrap_or(0);

        let application = self
            .transition(id, "undo_missed", |application| {
                require(application, ApplicationStatus::DeadlineMissed, "undo_missed")?;
                application.status = ApplicationStatus::Delivered;
                application.deadline_missed_at = None;
                application.missed_penalty = None;
                Ok(())
            })
            .await?;

        if applied > 0 {
            let delta = -i32::try_from(applied).unwrap_or(i32::MAX);
            let context = LedgerContext::for_application(&application)
                .by_admin(admin)
                .with_display_reason(Some("missed deadline reverted".to_string()));
            self.ledger
                .add_penalty_event(
                    &application.creator_id,
                    delta,
                    PenaltyReason::Rollback,
                    context,
                )
                .await?;
        }

        info!(application_id = %application.id, admin_id = %admin, compensated = applied, "missed deadline undone");
        Ok(application)
    }

    pub async fn complete(
        &self,
        admin: &AdminId,
        id: &ApplicationId,
    ) -> Result<Application, CampaignError> {
        let now = Utc::now();
        let application = self
            .transition(id, "complete", move |application| {
                require(application, ApplicationStatus::Uploaded, "complete")?;
                application.status = ApplicationStatus::Completed;
                application.completed_at = Some(now);
                Ok(())
            })
            .await?;
        info!(application_id = %application.id, admin_id = %admin, "application completed");
        Ok(application)
    }

    /// Withdraws a pending application by deleting it.
    pub async fn cancel(
        &self,
        creator_id: &CreatorId,
        id: &ApplicationId,
    ) -> Result<Application, CampaignError> {
        let owner = creator_id.clone();
        let removed = self
            .store
            .remove_application::<_, CampaignError>(id, move |application| {
                if application.creator_id != owner {
                    return Err(CampaignError::Forbidden);
                }
                require(application, ApplicationStatus::Pending, "cancel")
            })
            .await
            .map_err(not_found_application)?;

        info!(application_id = %removed.id, creator_id = %creator_id, "application cancelled");
        Ok(removed)
    }

    /// Hides a settled application from the creator's view without altering its history.
    pub async fn dismiss(
        &self,
        creator_id: &CreatorId,
        id: &ApplicationId,
    ) -> Result<Application, CampaignError> {
        let owner = creator_id.clone();
        let now = Utc::now();
        self.transition(id, "dismiss", move |application| {
            if application.creator_id != owner {
                return Err(CampaignError::Forbidden);
            }
            if !application.status.is_dismissable() {
                return Err(CampaignError::InvalidTransition {
                    action: "dismiss",
                    status: application.status,
                });
            }
            if application.dismissed_at.is_none() {
                application.dismissed_at = Some(now);
            }
            Ok(())
        })
        .await
    }

    async fn transition<F>(
        &self,
        id: &ApplicationId,
        action: &'static str,
        mutate: F,
    ) -> Result<Application, CampaignError>
    where
        F: FnOnce(&mut Application) -> Result<(), CampaignError> + Send + 'static,
    {
        let application = self
            .store
            .update_application::<_, CampaignError>(id, mutate)
            .await
            .map_err(not_found_application)?;
        info!(application_id = %application.id, action, status = %application.status, "application transitioned");
        Ok(application)
    }

    async fn notify(&self, notification: Notification) {
        let kind = notification.kind;
        let recipient = notification.recipient.clone();
        if let Err(err) = self.notifier.send(notification).await {
            warn!(?kind, recipient = %recipient, error = %err, "notification failed");
        }
    }
}

fn require(
    application: &Application,
    expected: ApplicationStatus,
    action: &'static str,
) -> Result<(), CampaignError> {
    if application.status == expected {
        Ok(())
    } else {
        Err(CampaignError::InvalidTransition {
            action,
            status: application.status,
        })
    }
}

fn ensure_approvable(status: ApplicationStatus) -> Result<(), CampaignError> {
    match status {
        ApplicationStatus::Pending => Ok(()),
        ApplicationStatus::Rejected => Err(CampaignError::InvalidTransition {
            action: "approve",
            status,
        }),
        _ => Err(CampaignError::AlreadyApproved),
    }
}

fn missing(entity: &'static str) -> impl Fn(RepositoryError) -> CampaignError {
    move |err| match err {
        RepositoryError::NotFound => CampaignError::NotFound { entity },
        other => CampaignError::Repository(other),
    }
}

fn not_found_application(err: CampaignError) -> CampaignError {
    match err {
        CampaignError::Repository(RepositoryError::NotFound) => CampaignError::NotFound {
            entity: "application",
        },
        other => other,
    }
}

/// How a failed operation should be surfaced to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Precondition,
    NotFound,
    Capacity,
    Forbidden,
    Internal,
}

impl ErrorClass {
    pub const fn status_code(self) -> StatusCode {
        match self {
            ErrorClass::Precondition => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorClass::Capacity => StatusCode::CONFLICT,
            ErrorClass::NotFound => StatusCode::NOT_FOUND,
            ErrorClass::Forbidden => StatusCode::FORBIDDEN,
            ErrorClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error raised by the campaign service.
#[derive(Debug, thiserror::Error)]
pub enum CampaignError {
    #[error("creator profile is incomplete")]
    ProfileIncomplete,
    #[error("account is restricted after repeated penalties")]
    AccountRestricted,
    #[error("account is suspended")]
    AccountSuspended,
    #[error("account is blocked")]
    AccountBlocked,
    #[error("campaign is not accepting applications (status: {status})")]
    CampaignNotActive { status: CampaignStatus },
    #[error("application deadline has passed")]
    ApplicationDeadlinePassed,
    #[error("a PayPal address is required for paid campaigns")]
    PaypalRequired,
    #[error("creator already applied to this campaign")]
    DuplicateApplication,
    #[error("starting-tier creators may only hold one active application")]
    StartingTierLimit,
    #[error("application is already approved")]
    AlreadyApproved,
    #[error("application is already rejected")]
    AlreadyRejected,
    #[error("upload is already verified")]
    AlreadyUploaded,
    #[error("campaign inventory is exhausted")]
    CampaignFull,
    #[error("cannot {action} an application that is {status}")]
    InvalidTransition {
        action: &'static str,
        status: ApplicationStatus,
    },
    #[error("campaign status cannot be set to {status}")]
    InvalidCampaignStatus { status: CampaignStatus },
    #[error("upload points must be non-negative (got {0})")]
    InvalidPoints(i32),
    #[error("creator already registered")]
    CreatorExists,
    #[error("actor may not perform this operation")]
    Forbidden,
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl CampaignError {
    pub fn class(&self) -> ErrorClass {
        match self {
            CampaignError::CampaignFull => ErrorClass::Capacity,
            CampaignError::Forbidden => ErrorClass::Forbidden,
            CampaignError::NotFound { .. } | CampaignError::Repository(RepositoryError::NotFound) => {
                ErrorClass::NotFound
            }
            CampaignError::Repository(RepositoryError::Conflict) => ErrorClass::Precondition,
            CampaignError::Repository(RepositoryError::Unavailable(_)) => ErrorClass::Internal,
            _ => ErrorClass::Precondition,
        }
    }
}
