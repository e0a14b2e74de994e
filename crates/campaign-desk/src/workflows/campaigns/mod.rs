//! Creator campaign coordination: applications, reputation, inventory, and chat cleanup.
//!
//! [`CampaignService`] is the only entry point that moves an application through its
//! lifecycle. It consults the tier engine, reserves inventory through the
//! [`InventoryController`], and records every reputation change in the
//! [`ReputationLedger`]. The [`ChatReaper`] runs independently on a timer.

pub mod domain;
pub mod inventory;
pub mod ledger;
pub mod memory;
pub mod reaper;
pub mod repository;
pub mod router;
pub mod service;
pub mod tier;

#[cfg(test)]
mod tests;

pub use domain::{
    Actor, ActorRole, AdminId, Application, ApplicationId, ApplicationStatus, Campaign,
    CampaignId, CampaignStatus, CampaignType, ChatRoom, ChatRoomId, ChatRoomStatus, Creator,
    CreatorId, CreatorProfile, CreatorStanding, LedgerContext, LedgerEntry, PenaltyEvent,
    PenaltyReason, ScoreEvent, ScoreReason, ShipmentDetails, Shipping,
};
pub use inventory::{InventoryController, SlotReservation};
pub use ledger::ReputationLedger;
pub use memory::MemoryStore;
pub use reaper::{ChatReaper, ReaperSettings, SkipReason, SweepOutcome, SweepReport};
pub use repository::{
    CampaignStore, ChatRoomStore, JobLeaseStore, Notification, NotificationError,
    NotificationKind, Notifier, RepositoryError, RoomFileStore, StorageError,
};
pub use router::campaign_router;
pub use service::{AccountFlags, CampaignError, CampaignService, ErrorClass, NewCampaign};
pub use tier::{tier_for, Tier};
