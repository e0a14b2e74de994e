//! Mutex-backed store used by the demo, the default server wiring, and tests.
//!
//! A single lock guards every table, which makes each trait call atomic in the same way a
//! row lock or conditional `UPDATE ... RETURNING` would on a relational backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::domain::{
    Application, ApplicationId, Campaign, CampaignId, ChatRoom, ChatRoomId, ChatRoomStatus,
    Creator, CreatorId, CreatorStanding, LedgerEntry,
};
use super::repository::{CampaignStore, ChatRoomStore, JobLeaseStore, RepositoryError};

#[derive(Default)]
struct StoreState {
    creators: HashMap<CreatorId, Creator>,
    ledger: Vec<LedgerEntry>,
    campaigns: HashMap<CampaignId, Campaign>,
    sequences: HashMap<CampaignId, u64>,
    applications: HashMap<ApplicationId, Application>,
    chat_rooms: HashMap<ChatRoomId, ChatRoom>,
    leases: HashMap<String, Lease>,
}

struct Lease {
    holder: String,
    expires_at: DateTime<Utc>,
}

#[derive(Default, Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }
}

fn sorted_applications<'a>(iter: impl Iterator<Item = &'a Application>) -> Vec<Application> {
    let mut applications: Vec<Application> = iter.cloned().collect();
    applications.sort_by(|left, right| {
        left.applied_at
            .cmp(&right.applied_at)
            .then_with(|| left.id.cmp(&right.id))
    });
    applications
}

#[async_trait]
impl CampaignStore for MemoryStore {
    async fn insert_creator(&self, creator: Creator) -> Result<Creator, RepositoryError> {
        let mut state = self.state()?;
        if state.creators.contains_key(&creator.id) {
            return Err(RepositoryError::Conflict);
        }
        state.creators.insert(creator.id.clone(), creator.clone());
        Ok(creator)
    }

    async fn fetch_creator(&self, id: &CreatorId) -> Result<Option<Creator>, RepositoryError> {
        Ok(self.state()?.creators.get(id).cloned())
    }

    async fn update_standing<F, T>(
        &self,
        id: &CreatorId,
        mutate: F,
    ) -> Result<(Creator, T), RepositoryError>
    where
        F: FnOnce(&mut CreatorStanding) -> T + Send + 'static,
        T: Send + 'static,
    {
        let mut state = self.state()?;
        let creator = state
            .creators
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        let mut standing = creator.standing();
        let output = mutate(&mut standing);
        creator.apply_standing(standing);
        Ok((creator.clone(), output))
    }

    async fn append_ledger_entry<F>(
        &self,
        id: &CreatorId,
        apply: F,
    ) -> Result<(Creator, LedgerEntry), RepositoryError>
    where
        F: FnOnce(&mut Creator) -> LedgerEntry + Send + 'static,
    {
        let mut state = self.state()?;
        let creator = state
            .creators
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        let entry = apply(creator);
        let updated = creator.clone();
        state.ledger.push(entry.clone());
        Ok((updated, entry))
    }

    async fn ledger_for(&self, id: &CreatorId) -> Result<Vec<LedgerEntry>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .ledger
            .iter()
            .filter(|entry| entry.creator_id() == id)
            .cloned()
            .collect())
    }

    async fn insert_campaign(&self, campaign: Campaign) -> Result<Campaign, RepositoryError> {
        let mut state = self.state()?;
        if state.campaigns.contains_key(&campaign.id) {
            return Err(RepositoryError::Conflict);
        }
        state.campaigns.insert(campaign.id.clone(), campaign.clone());
        Ok(campaign)
    }

    async fn fetch_campaign(&self, id: &CampaignId) -> Result<Option<Campaign>, RepositoryError> {
        Ok(self.state()?.campaigns.get(id).cloned())
    }

    async fn modify_campaign<F, T>(
        &self,
        id: &CampaignId,
        mutate: F,
    ) -> Result<(Campaign, T), RepositoryError>
    where
        F: FnOnce(&mut Campaign) -> T + Send + 'static,
        T: Send + 'static,
    {
        let mut state = self.state()?;
        let campaign = state
            .campaigns
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        let output = mutate(campaign);
        Ok((campaign.clone(), output))
    }

    async fn insert_application(
        &self,
        mut application: Application,
    ) -> Result<Application, RepositoryError> {
        let mut state = self.state()?;
        let duplicate = state.applications.contains_key(&application.id)
            || state.applications.values().any(|existing| {
                existing.creator_id == application.creator_id
                    && existing.campaign_id == application.campaign_id
            });
        if duplicate {
            return Err(RepositoryError::Conflict);
        }

        let sequence = state
            .sequences
            .entry(application.campaign_id.clone())
            .or_insert(0);
        *sequence += 1;
        application.sequence_number = *sequence;

        state
            .applications
            .insert(application.id.clone(), application.clone());
        Ok(application)
    }

    async fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        Ok(self.state()?.applications.get(id).cloned())
    }

    async fn update_application<F, E>(&self, id: &ApplicationId, mutate: F) -> Result<Application, E>
    where
        F: FnOnce(&mut Application) -> Result<(), E> + Send + 'static,
        E: From<RepositoryError> + Send + 'static,
    {
        let mut state = self.state()?;
        let stored = state
            .applications
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;

        let mut candidate = stored.clone();
        mutate(&mut candidate)?;
        *stored = candidate.clone();
        Ok(candidate)
    }

    async fn remove_application<F, E>(&self, id: &ApplicationId, check: F) -> Result<Application, E>
    where
        F: FnOnce(&Application) -> Result<(), E> + Send + 'static,
        E: From<RepositoryError> + Send + 'static,
    {
        let mut state = self.state()?;
        let stored = state
            .applications
            .get(id)
            .ok_or(RepositoryError::NotFound)?;
        check(stored)?;
        state
            .applications
            .remove(id)
            .ok_or_else(|| RepositoryError::NotFound.into())
    }

    async fn applications_for_creator(
        &self,
        id: &CreatorId,
    ) -> Result<Vec<Application>, RepositoryError> {
        let state = self.state()?;
        Ok(sorted_applications(
            state
                .applications
                .values()
                .filter(|application| &application.creator_id == id),
        ))
    }

    async fn applications_for_campaign(
        &self,
        id: &CampaignId,
    ) -> Result<Vec<Application>, RepositoryError> {
        let state = self.state()?;
        Ok(sorted_applications(
            state
                .applications
                .values()
                .filter(|application| &application.campaign_id == id),
        ))
    }
}

#[async_trait]
impl ChatRoomStore for MemoryStore {
    async fn insert_chat_room(&self, room: ChatRoom) -> Result<ChatRoom, RepositoryError> {
        let mut state = self.state()?;
        if state.chat_rooms.contains_key(&room.id) {
            return Err(RepositoryError::Conflict);
        }
        state.chat_rooms.insert(room.id.clone(), room.clone());
        Ok(room)
    }

    async fn fetch_chat_room(&self, id: &ChatRoomId) -> Result<Option<ChatRoom>, RepositoryError> {
        Ok(self.state()?.chat_rooms.get(id).cloned())
    }

    async fn expired_active_rooms(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ChatRoom>, RepositoryError> {
        let state = self.state()?;
        let mut rooms: Vec<ChatRoom> = state
            .chat_rooms
            .values()
            .filter(|room| room.is_expired(now))
            .cloned()
            .collect();
        rooms.sort_by(|left, right| left.expires_at.cmp(&right.expires_at));
        Ok(rooms)
    }

    async fn end_chat_room(
        &self,
        id: &ChatRoomId,
        ended_by: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state()?;
        let room = state
            .chat_rooms
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        if room.status != ChatRoomStatus::Active {
            return Ok(false);
        }
        room.status = ChatRoomStatus::Ended;
        room.ended_at = Some(now);
        room.ended_by = Some(ended_by.to_string());
        Ok(true)
    }
}

#[async_trait]
impl JobLeaseStore for MemoryStore {
    async fn try_acquire_lease(
        &self,
        job: &str,
        holder: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|err| RepositoryError::Unavailable(format!("invalid lease ttl: {err}")))?;
        let mut state = self.state()?;

        if let Some(lease) = state.leases.get(job) {
            if lease.holder != holder && lease.expires_at > now {
                return Ok(false);
            }
        }

        state.leases.insert(
            job.to_string(),
            Lease {
                holder: holder.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(true)
    }

    async fn release_lease(&self, job: &str, holder: &str) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        if state
            .leases
            .get(job)
            .map(|lease| lease.holder == holder)
            .unwrap_or(false)
        {
            state.leases.remove(job);
        }
        Ok(())
    }
}
