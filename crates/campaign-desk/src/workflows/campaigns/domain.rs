use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tier::{tier_for, Tier};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier wrapper for creators.
    CreatorId
);
string_id!(
    /// Identifier wrapper for campaigns.
    CampaignId
);
string_id!(
    /// Identifier wrapper for campaign applications.
    ApplicationId
);
string_id!(
    /// Identifier wrapper for support chat rooms.
    ChatRoomId
);
string_id!(
    /// Identifier of the admin attributed with a manual action.
    AdminId
);

/// Role supplied by the upstream auth layer alongside the actor id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Creator,
    Admin,
}

/// Authenticated caller of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub role: ActorRole,
}

impl Actor {
    pub fn creator(id: &CreatorId) -> Self {
        Self {
            id: id.0.clone(),
            role: ActorRole::Creator,
        }
    }

    pub fn admin(id: &AdminId) -> Self {
        Self {
            id: id.0.clone(),
            role: ActorRole::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == ActorRole::Admin
    }

    pub fn as_creator(&self) -> Option<CreatorId> {
        match self.role {
            ActorRole::Creator => Some(CreatorId(self.id.clone())),
            ActorRole::Admin => None,
        }
    }

    pub fn as_admin(&self) -> Option<AdminId> {
        match self.role {
            ActorRole::Admin => Some(AdminId(self.id.clone())),
            ActorRole::Creator => None,
        }
    }
}

/// Contact and payout details a creator maintains on their profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorProfile {
    pub display_name: String,
    pub email: String,
    #[serde(default)]
    pub instagram_handle: Option<String>,
    #[serde(default)]
    pub shipping_address: Option<String>,
    #[serde(default)]
    pub paypal_email: Option<String>,
}

impl CreatorProfile {
    /// A profile is complete once products can be shipped and content attributed.
    pub fn is_complete(&self) -> bool {
        let filled = |value: &Option<String>| {
            value
                .as_deref()
                .map(|inner| !inner.trim().is_empty())
                .unwrap_or(false)
        };

        !self.display_name.trim().is_empty()
            && !self.email.trim().is_empty()
            && filled(&self.instagram_handle)
            && filled(&self.shipping_address)
    }

    pub fn has_paypal(&self) -> bool {
        self.paypal_email
            .as_deref()
            .map(|email| !email.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Creator record with the reputation cache maintained by the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Creator {
    pub id: CreatorId,
    pub profile: CreatorProfile,
    pub score: u8,
    pub penalty: u32,
    pub completed_campaigns: u32,
    pub restricted: bool,
    pub suspended: bool,
    pub blocked: bool,
    pub pending_tier_upgrade: Option<Tier>,
    pub created_at: DateTime<Utc>,
}

impl Creator {
    /// Fresh creator with an empty reputation; the baseline score is granted by the ledger.
    pub fn new(id: CreatorId, profile: CreatorProfile, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            profile,
            score: 0,
            penalty: 0,
            completed_campaigns: 0,
            restricted: false,
            suspended: false,
            blocked: false,
            pending_tier_upgrade: None,
            created_at,
        }
    }

    pub fn tier(&self) -> Tier {
        tier_for(self.completed_campaigns, self.score)
    }

    pub fn standing(&self) -> CreatorStanding {
        CreatorStanding {
            completed_campaigns: self.completed_campaigns,
            suspended: self.suspended,
            blocked: self.blocked,
            pending_tier_upgrade: self.pending_tier_upgrade,
        }
    }

    pub fn apply_standing(&mut self, standing: CreatorStanding) {
        self.completed_campaigns = standing.completed_campaigns;
        self.suspended = standing.suspended;
        self.blocked = standing.blocked;
        self.pending_tier_upgrade = standing.pending_tier_upgrade;
    }
}

/// The creator fields that may change outside the reputation ledger.
///
/// `score`, `penalty` and `restricted` only move through ledger appends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatorStanding {
    pub completed_campaigns: u32,
    pub suspended: bool,
    pub blocked: bool,
    pub pending_tier_upgrade: Option<Tier>,
}

/// Compensation model of a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignType {
    Gifted,
    Paid,
    GiftedPlusPaid,
}

impl CampaignType {
    pub const fn requires_paypal(self) -> bool {
        matches!(self, CampaignType::Paid | CampaignType::GiftedPlusPaid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    Active,
    Full,
    Closed,
    Archived,
}

impl CampaignStatus {
    pub const fn label(self) -> &'static str {
        match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Active => "active",
            CampaignStatus::Full => "full",
            CampaignStatus::Closed => "closed",
            CampaignStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Campaign with its fixed product inventory and the cached approval counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub title: String,
    pub campaign_type: CampaignType,
    pub inventory: u32,
    pub approved_count: u32,
    pub status: CampaignStatus,
    pub application_deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    pub fn has_open_slot(&self) -> bool {
        self.approved_count < self.inventory
    }

    pub fn deadline_passed(&self, now: DateTime<Utc>) -> bool {
        self.application_deadline
            .map(|deadline| deadline < now)
            .unwrap_or(false)
    }
}

/// Position of an application in the campaign lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Shipped,
    Delivered,
    Uploaded,
    Completed,
    Rejected,
    DeadlineMissed,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Shipped => "shipped",
            ApplicationStatus::Delivered => "delivered",
            ApplicationStatus::Uploaded => "uploaded",
            ApplicationStatus::Completed => "completed",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::DeadlineMissed => "deadline_missed",
        }
    }

    /// Statuses holding one unit of campaign inventory.
    pub const fn holds_inventory(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Approved
                | ApplicationStatus::Shipped
                | ApplicationStatus::Delivered
                | ApplicationStatus::Uploaded
                | ApplicationStatus::Completed
                | ApplicationStatus::DeadlineMissed
        )
    }

    /// Statuses that no longer count against the starting-tier concurrency limit.
    pub const fn is_settled(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Rejected
                | ApplicationStatus::Uploaded
                | ApplicationStatus::Completed
                | ApplicationStatus::DeadlineMissed
        )
    }

    /// A successful delivery of content, used for first-time and ghosting lookups.
    pub const fn is_completion(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Uploaded | ApplicationStatus::Completed
        )
    }

    pub const fn is_dismissable(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Rejected | ApplicationStatus::Uploaded | ApplicationStatus::Completed
        )
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Shipping sub-record created lazily when an application is approved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipping {
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Shipping {
    pub fn awaiting_dispatch(created_at: DateTime<Utc>) -> Self {
        Self {
            carrier: None,
            tracking_number: None,
            created_at,
        }
    }
}

/// Carrier details supplied when an admin marks a product as shipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentDetails {
    #[serde(default)]
    pub carrier: Option<String>,
    #[serde(default)]
    pub tracking_number: Option<String>,
}

/// A creator's application to a single campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub creator_id: CreatorId,
    pub campaign_id: CampaignId,
    pub sequence_number: u64,
    pub status: ApplicationStatus,
    pub first_time: bool,
    pub points_awarded: Option<i32>,
    pub missed_penalty: Option<u32>,
    pub shipping: Option<Shipping>,
    pub applied_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub uploaded_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub deadline_missed_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub dismissed_at: Option<DateTime<Utc>>,
}

impl Application {
    pub fn pending(
        id: ApplicationId,
        creator_id: CreatorId,
        campaign_id: CampaignId,
        first_time: bool,
        applied_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            creator_id,
            campaign_id,
            sequence_number: 0,
            status: ApplicationStatus::Pending,
            first_time,
            points_awarded: None,
            missed_penalty: None,
            shipping: None,
            applied_at,
            approved_at: None,
            shipped_at: None,
            delivered_at: None,
            uploaded_at: None,
            completed_at: None,
            deadline_missed_at: None,
            rejected_at: None,
            dismissed_at: None,
        }
    }

    pub fn is_dismissed(&self) -> bool {
        self.dismissed_at.is_some()
    }
}

/// Reason codes recorded on score ledger rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreReason {
    SignupBaseline,
    UploadSuccess,
    FirstUpload,
    AdminAdjustment,
}

impl ScoreReason {
    pub const fn label(self) -> &'static str {
        match self {
            ScoreReason::SignupBaseline => "signup_baseline",
            ScoreReason::UploadSuccess => "upload_success",
            ScoreReason::FirstUpload => "first_upload",
            ScoreReason::AdminAdjustment => "admin_adjustment",
        }
    }
}

/// Reason codes recorded on penalty ledger rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyReason {
    FirstGhosting,
    DeadlineMissed,
    AdminPenalty,
    Rollback,
}

impl PenaltyReason {
    pub const fn label(self) -> &'static str {
        match self {
            PenaltyReason::FirstGhosting => "first_ghosting",
            PenaltyReason::DeadlineMissed => "deadline_missed",
            PenaltyReason::AdminPenalty => "admin_penalty",
            PenaltyReason::Rollback => "rollback",
        }
    }
}

/// Optional scoping and attribution shared by score and penalty rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerContext {
    pub campaign_id: Option<CampaignId>,
    pub application_id: Option<ApplicationId>,
    pub display_reason: Option<String>,
    pub created_by_admin_id: Option<AdminId>,
}

impl LedgerContext {
    pub fn for_application(application: &Application) -> Self {
        Self {
            campaign_id: Some(application.campaign_id.clone()),
            application_id: Some(application.id.clone()),
            ..Self::default()
        }
    }

    pub fn by_admin(mut self, admin: &AdminId) -> Self {
        self.created_by_admin_id = Some(admin.clone());
        self
    }

    pub fn with_display_reason(mut self, display_reason: Option<String>) -> Self {
        self.display_reason = display_reason;
        self
    }
}

/// Immutable score ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEvent {
    pub creator_id: CreatorId,
    pub delta: i32,
    pub reason: ScoreReason,
    #[serde(flatten)]
    pub context: LedgerContext,
    pub created_at: DateTime<Utc>,
}

/// Immutable penalty ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltyEvent {
    pub creator_id: CreatorId,
    pub delta: i32,
    pub reason: PenaltyReason,
    #[serde(flatten)]
    pub context: LedgerContext,
    pub created_at: DateTime<Utc>,
}

/// One row of a creator's reputation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerEntry {
    Score(ScoreEvent),
    Penalty(PenaltyEvent),
}

impl LedgerEntry {
    pub fn creator_id(&self) -> &CreatorId {
        match self {
            LedgerEntry::Score(event) => &event.creator_id,
            LedgerEntry::Penalty(event) => &event.creator_id,
        }
    }

    pub fn delta(&self) -> i32 {
        match self {
            LedgerEntry::Score(event) => event.delta,
            LedgerEntry::Penalty(event) => event.delta,
        }
    }

    pub fn reason_label(&self) -> &'static str {
        match self {
            LedgerEntry::Score(event) => event.reason.label(),
            LedgerEntry::Penalty(event) => event.reason.label(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRoomStatus {
    Active,
    Ended,
    Expired,
}

/// Ephemeral support chat between a creator and the admin team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRoom {
    pub id: ChatRoomId,
    pub creator_id: CreatorId,
    pub status: ChatRoomStatus,
    pub expires_at: DateTime<Utc>,
    pub admin_unread_count: u32,
    pub ended_at: Option<DateTime<Utc>>,
    pub ended_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ChatRoom {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == ChatRoomStatus::Active && self.expires_at <= now
    }
}
