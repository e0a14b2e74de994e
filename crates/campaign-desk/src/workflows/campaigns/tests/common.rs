use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::{Duration, Utc};
use serde_json::Value;

use crate::workflows::campaigns::domain::{
    AdminId, Application, ApplicationId, Campaign, CampaignId, CampaignStatus, CampaignType,
    ChatRoom, ChatRoomId, ChatRoomStatus, Creator, CreatorId, CreatorProfile,
};
use crate::workflows::campaigns::memory::MemoryStore;
use crate::workflows::campaigns::repository::{
    CampaignStore, ChatRoomStore, Notification, NotificationError, NotificationKind, Notifier,
    RoomFileStore, StorageError,
};
use crate::workflows::campaigns::service::CampaignService;

pub(super) type TestService = CampaignService<MemoryStore, RecordingNotifier>;

pub(super) fn admin() -> AdminId {
    AdminId::from("admin-1")
}

pub(super) fn complete_profile(name: &str) -> CreatorProfile {
    CreatorProfile {
        display_name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        instagram_handle: Some(format!("@{}", name.to_lowercase())),
        shipping_address: Some("12 Market Street, Springfield".to_string()),
        paypal_email: None,
    }
}

pub(super) fn build_service() -> (TestService, Arc<MemoryStore>, Arc<RecordingNotifier>) {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let service = CampaignService::new(store.clone(), notifier.clone());
    (service, store, notifier)
}

/// Inserts a creator with a hand-picked reputation, bypassing registration.
pub(super) async fn seed_creator(
    store: &MemoryStore,
    id: &str,
    completed_campaigns: u32,
    score: u8,
) -> Creator {
    let mut creator = Creator::new(CreatorId::from(id), complete_profile(id), Utc::now());
    creator.completed_campaigns = completed_campaigns;
    creator.score = score;
    store
        .insert_creator(creator)
        .await
        .expect("creator inserted")
}

pub(super) async fn seed_campaign(
    store: &MemoryStore,
    id: &str,
    inventory: u32,
    campaign_type: CampaignType,
) -> Campaign {
    store
        .insert_campaign(Campaign {
            id: CampaignId::from(id),
            title: format!("Campaign {id}"),
            campaign_type,
            inventory,
            approved_count: 0,
            status: CampaignStatus::Active,
            application_deadline: Some(Utc::now() + Duration::days(7)),
            created_at: Utc::now(),
        })
        .await
        .expect("campaign inserted")
}

pub(super) async fn gifted_campaign(store: &MemoryStore, id: &str, inventory: u32) -> Campaign {
    seed_campaign(store, id, inventory, CampaignType::Gifted).await
}

pub(super) async fn campaign(store: &MemoryStore, id: &str) -> Campaign {
    store
        .fetch_campaign(&CampaignId::from(id))
        .await
        .expect("fetch succeeds")
        .expect("campaign present")
}

pub(super) async fn creator(store: &MemoryStore, id: &str) -> Creator {
    store
        .fetch_creator(&CreatorId::from(id))
        .await
        .expect("fetch succeeds")
        .expect("creator present")
}

/// Applies, approves, ships, and delivers so the application awaits content.
pub(super) async fn delivered_application(
    service: &TestService,
    creator_id: &str,
    campaign_id: &str,
) -> Application {
    let application = service
        .apply(&CreatorId::from(creator_id), &CampaignId::from(campaign_id))
        .await
        .expect("application created");
    if application.status == crate::workflows::campaigns::ApplicationStatus::Pending {
        service
            .approve(&admin(), &application.id)
            .await
            .expect("approved");
    }
    service
        .ship(&admin(), &application.id, Default::default())
        .await
        .expect("shipped");
    service
        .deliver(&admin(), &application.id)
        .await
        .expect("delivered")
}

#[derive(Default)]
pub(super) struct RecordingNotifier {
    events: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub(super) fn events(&self) -> Vec<Notification> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }

    pub(super) fn count(&self, kind: NotificationKind) -> usize {
        self.events()
            .iter()
            .filter(|notification| notification.kind == kind)
            .count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotificationError> {
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(super) struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, _notification: Notification) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp relay offline".to_string()))
    }
}

/// File store that records purged rooms and fails for a configured set of rooms.
#[derive(Default)]
pub(super) struct RecordingFiles {
    deleted: Mutex<Vec<ChatRoomId>>,
    failing: Mutex<HashSet<ChatRoomId>>,
}

impl RecordingFiles {
    pub(super) fn fail_for(&self, room: &str) {
        self.failing
            .lock()
            .expect("files mutex poisoned")
            .insert(ChatRoomId::from(room));
    }

    pub(super) fn deleted(&self) -> Vec<ChatRoomId> {
        self.deleted.lock().expect("files mutex poisoned").clone()
    }
}

#[async_trait]
impl RoomFileStore for RecordingFiles {
    async fn delete_room_files(&self, room: &ChatRoomId) -> Result<(), StorageError> {
        if self
            .failing
            .lock()
            .expect("files mutex poisoned")
            .contains(room)
        {
            return Err(StorageError::Unavailable("bucket unreachable".to_string()));
        }
        self.deleted
            .lock()
            .expect("files mutex poisoned")
            .push(room.clone());
        Ok(())
    }
}

pub(super) async fn seed_room(store: &MemoryStore, id: &str, expires_in: Duration) -> ChatRoom {
    let now = Utc::now();
    store
        .insert_chat_room(ChatRoom {
            id: ChatRoomId::from(id),
            creator_id: CreatorId::from("creator-chat"),
            status: ChatRoomStatus::Active,
            expires_at: now + expires_in,
            admin_unread_count: 2,
            ended_at: None,
            ended_by: None,
            created_at: now - Duration::hours(1),
        })
        .await
        .expect("room inserted")
}

pub(super) async fn room(store: &MemoryStore, id: &str) -> ChatRoom {
    store
        .fetch_chat_room(&ChatRoomId::from(id))
        .await
        .expect("fetch succeeds")
        .expect("room present")
}

pub(super) async fn application(store: &MemoryStore, id: &ApplicationId) -> Option<Application> {
    store.fetch_application(id).await.expect("fetch succeeds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
