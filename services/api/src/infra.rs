use async_trait::async_trait;
use campaign_desk::workflows::campaigns::{
    ChatRoomId, Notification, NotificationError, Notifier, RoomFileStore, StorageError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub readiness: Arc<AtomicBool>,
    pub metrics: Arc<PrometheusHandle>,
}

/// Notifier for the running server: records each notification in the log and keeps nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotificationError> {
        info!(
            kind = ?notification.kind,
            recipient = %notification.recipient,
            details = ?notification.details,
            "notification dispatched"
        );
        Ok(())
    }
}

/// Notifier that logs each notification and keeps it until [`OutboxNotifier::drain`].
#[derive(Default, Clone)]
pub struct OutboxNotifier {
    outbox: Arc<Mutex<Vec<Notification>>>,
}

impl OutboxNotifier {
    /// Removes and returns everything queued so far.
    pub fn drain(&self) -> Vec<Notification> {
        match self.outbox.lock() {
            Ok(mut guard) => guard.drain(..).collect(),
            Err(_) => Vec::new(),
        }
    }
}

#[async_trait]
impl Notifier for OutboxNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotificationError> {
        info!(
            kind = ?notification.kind,
            recipient = %notification.recipient,
            "notification queued"
        );
        self.outbox
            .lock()
            .map_err(|_| NotificationError::Transport("outbox mutex poisoned".to_string()))?
            .push(notification);
        Ok(())
    }
}

/// Chat attachment storage kept in process memory.
#[derive(Default, Clone)]
pub struct InMemoryRoomFiles {
    files: Arc<Mutex<HashMap<ChatRoomId, Vec<String>>>>,
}

impl InMemoryRoomFiles {
    pub fn attach(&self, room: &ChatRoomId, name: impl Into<String>) -> Result<(), StorageError> {
        self.files
            .lock()
            .map_err(|_| StorageError::Unavailable("file index mutex poisoned".to_string()))?
            .entry(room.clone())
            .or_default()
            .push(name.into());
        Ok(())
    }

    pub fn files_for(&self, room: &ChatRoomId) -> Vec<String> {
        self.files
            .lock()
            .ok()
            .and_then(|guard| guard.get(room).cloned())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RoomFileStore for InMemoryRoomFiles {
    async fn delete_room_files(&self, room: &ChatRoomId) -> Result<(), StorageError> {
        let removed = self
            .files
            .lock()
            .map_err(|_| StorageError::Unavailable("file index mutex poisoned".to_string()))?
            .remove(room)
            .map(|files| files.len())
            .unwrap_or(0);
        info!(room_id = %room, removed, "chat attachments purged");
        Ok(())
    }
}
