use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    Application, ApplicationId, Campaign, CampaignId, ChatRoom, ChatRoomId, Creator, CreatorId,
    CreatorStanding, LedgerEntry,
};

/// Storage abstraction for creators, campaigns, applications, and the reputation ledger.
///
/// Every `modify_*`/`update_*` method runs its closure while the row is held exclusively, so
/// implementations backed by a database must use a row lock or a conditional update.
#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn insert_creator(&self, creator: Creator) -> Result<Creator, RepositoryError>;
    async fn fetch_creator(&self, id: &CreatorId) -> Result<Option<Creator>, RepositoryError>;

    /// Changes counters and account flags; reputation fields are out of reach here.
    async fn update_standing<F, T>(
        &self,
        id: &CreatorId,
        mutate: F,
    ) -> Result<(Creator, T), RepositoryError>
    where
        F: FnOnce(&mut CreatorStanding) -> T + Send + 'static,
        T: Send + 'static;

    /// Appends the entry produced by `apply` and persists the mutated creator in one step.
    async fn append_ledger_entry<F>(
        &self,
        id: &CreatorId,
        apply: F,
    ) -> Result<(Creator, LedgerEntry), RepositoryError>
    where
        F: FnOnce(&mut Creator) -> LedgerEntry + Send + 'static;

    async fn ledger_for(&self, id: &CreatorId) -> Result<Vec<LedgerEntry>, RepositoryError>;

    async fn insert_campaign(&self, campaign: Campaign) -> Result<Campaign, RepositoryError>;
    async fn fetch_campaign(&self, id: &CampaignId) -> Result<Option<Campaign>, RepositoryError>;

    async fn modify_campaign<F, T>(
        &self,
        id: &CampaignId,
        mutate: F,
    ) -> Result<(Campaign, T), RepositoryError>
    where
        F: FnOnce(&mut Campaign) -> T + Send + 'static,
        T: Send + 'static;

    /// Stores a new application, assigning the next per-campaign sequence number.
    ///
    /// Fails with [`RepositoryError::Conflict`] when the creator already applied to the campaign.
    async fn insert_application(
        &self,
        application: Application,
    ) -> Result<Application, RepositoryError>;

    async fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError>;

    /// Applies `mutate` to the stored row; an `Err` leaves the row untouched.
    async fn update_application<F, E>(&self, id: &ApplicationId, mutate: F) -> Result<Application, E>
    where
        F: FnOnce(&mut Application) -> Result<(), E> + Send + 'static,
        E: From<RepositoryError> + Send + 'static;

    /// Hard-deletes the row when `check` accepts it.
    async fn remove_application<F, E>(&self, id: &ApplicationId, check: F) -> Result<Application, E>
    where
        F: FnOnce(&Application) -> Result<(), E> + Send + 'static,
        E: From<RepositoryError> + Send + 'static;

    async fn applications_for_creator(
        &self,
        id: &CreatorId,
    ) -> Result<Vec<Application>, RepositoryError>;

    async fn applications_for_campaign(
        &self,
        id: &CampaignId,
    ) -> Result<Vec<Application>, RepositoryError>;
}

/// Storage for support chat rooms swept by the reaper.
#[async_trait]
pub trait ChatRoomStore: Send + Sync {
    async fn insert_chat_room(&self, room: ChatRoom) -> Result<ChatRoom, RepositoryError>;
    async fn fetch_chat_room(&self, id: &ChatRoomId) -> Result<Option<ChatRoom>, RepositoryError>;
    async fn expired_active_rooms(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ChatRoom>, RepositoryError>;

    /// Moves an active room to `ended`; returns `false` if the room was no longer active.
    async fn end_chat_room(
        &self,
        id: &ChatRoomId,
        ended_by: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;
}

/// Claim rows used to keep a background job single-flight across processes.
#[async_trait]
pub trait JobLeaseStore: Send + Sync {
    /// Claims `job` for `holder` unless another holder owns an unexpired lease.
    async fn try_acquire_lease(
        &self,
        job: &str,
        holder: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;

    async fn release_lease(&self, job: &str, holder: &str) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound notification hook (e-mail or in-app adapters).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<(), NotificationError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ApplicationApproved,
    ApplicationRejected,
    ProductShipped,
    UploadVerified,
    DeadlineMissed,
    TierUpgrade,
}

/// Notification payload so routes/tests can assert integration boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub recipient: CreatorId,
    pub details: BTreeMap<String, String>,
}

impl Notification {
    pub fn new(kind: NotificationKind, recipient: CreatorId) -> Self {
        Self {
            kind,
            recipient,
            details: BTreeMap::new(),
        }
    }

    pub fn detail(mut self, key: &str, value: impl Into<String>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Object storage holding chat attachments.
#[async_trait]
pub trait RoomFileStore: Send + Sync {
    async fn delete_room_files(&self, room: &ChatRoomId) -> Result<(), StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object storage unavailable: {0}")]
    Unavailable(String),
}
