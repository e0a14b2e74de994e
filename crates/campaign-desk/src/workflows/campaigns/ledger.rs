//! Append-only reputation ledger.
//!
//! `score` and `penalty` on a [`Creator`] are caches of this ledger. They are only ever
//! changed by appending a [`ScoreEvent`] or [`PenaltyEvent`] through [`ReputationLedger`],
//! and the append and the cache update are committed together by the store.
//!
//! The score cache uses an iterated clamp: each append clamps `current + delta` into
//! `0..=100`, so a burst that saturates at the ceiling does not "bank" the overflow.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use super::domain::{
    AdminId, Creator, CreatorId, LedgerContext, LedgerEntry, PenaltyEvent, PenaltyReason,
    ScoreEvent, ScoreReason,
};
use super::repository::{CampaignStore, RepositoryError};

pub const SCORE_CEILING: u8 = 100;
/// Cumulative penalty that latches `restricted`.
pub const RESTRICTION_THRESHOLD: u32 = 5;
/// Score granted when a creator account is registered.
pub const SIGNUP_BASELINE_SCORE: i32 = 50;
pub const DEFAULT_UPLOAD_POINTS: i32 = 5;
pub const FIRST_UPLOAD_BONUS: i32 = 5;
pub const FIRST_GHOSTING_PENALTY: i32 = 5;
pub const DEADLINE_MISSED_PENALTY: i32 = 1;

pub fn clamp_score(current: u8, delta: i32) -> u8 {
    let next = i64::from(current) + i64::from(delta);
    next.clamp(0, i64::from(SCORE_CEILING)) as u8
}

pub fn floor_penalty(current: u32, delta: i32) -> u32 {
    let next = i64::from(current) + i64::from(delta);
    next.clamp(0, i64::from(u32::MAX)) as u32
}

/// Applies a penalty delta, latching `restricted` once the threshold is reached.
fn apply_penalty(creator: &mut Creator, delta: i32) {
    creator.penalty = floor_penalty(creator.penalty, delta);
    if creator.penalty >= RESTRICTION_THRESHOLD {
        creator.restricted = true;
    }
}

pub struct ReputationLedger<S> {
    store: Arc<S>,
}

impl<S> Clone for ReputationLedger<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> ReputationLedger<S>
where
    S: CampaignStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn add_score_event(
        &self,
        creator_id: &CreatorId,
        delta: i32,
        reason: ScoreReason,
        context: LedgerContext,
    ) -> Result<Creator, RepositoryError> {
        let event_creator = creator_id.clone();
        let (creator, _) = self
            .store
            .append_ledger_entry(creator_id, move |creator| {
                creator.score = clamp_score(creator.score, delta);
                LedgerEntry::Score(ScoreEvent {
                    creator_id: event_creator,
                    delta,
                    reason,
                    context,
                    created_at: Utc::now(),
                })
            })
            .await?;

        debug!(
            creator_id = %creator.id,
            delta,
            reason = reason.label(),
            score = creator.score,
            "score event appended"
        );
        Ok(creator)
    }

    pub async fn add_penalty_event(
        &self,
        creator_id: &CreatorId,
        delta: i32,
        reason: PenaltyReason,
        context: LedgerContext,
    ) -> Result<Creator, RepositoryError> {
        let event_creator = creator_id.clone();
        let (creator, _) = self
            .store
            .append_ledger_entry(creator_id, move |creator| {
                apply_penalty(creator, delta);
                LedgerEntry::Penalty(PenaltyEvent {
                    creator_id: event_creator,
                    delta,
                    reason,
                    context,
                    created_at: Utc::now(),
                })
            })
            .await?;

        info!(
            creator_id = %creator.id,
            delta,
            reason = reason.label(),
            penalty = creator.penalty,
            restricted = creator.restricted,
            "penalty event appended"
        );
        Ok(creator)
    }

    /// Clears the restriction latch and zeroes the penalty with a compensating rollback row.
    pub async fn unlock(
        &self,
        creator_id: &CreatorId,
        admin: &AdminId,
    ) -> Result<Creator, RepositoryError> {
        let event_creator = creator_id.clone();
        let context = LedgerContext::default().by_admin(admin);
        let (creator, entry) = self
            .store
            .append_ledger_entry(creator_id, move |creator| {
                let cleared = i32::try_from(creator.penalty).unwrap_or(i32::MAX);
                creator.penalty = 0;
                creator.restricted = false;
                LedgerEntry::Penalty(PenaltyEvent {
                    creator_id: event_creator,
                    delta: -cleared,
                    reason: PenaltyReason::Rollback,
                    context,
                    created_at: Utc::now(),
                })
            })
            .await?;

        info!(
            creator_id = %creator.id,
            admin_id = %admin,
            cleared = -entry.delta(),
            "creator unlocked"
        );
        Ok(creator)
    }

    pub async fn history(&self, creator_id: &CreatorId) -> Result<Vec<LedgerEntry>, RepositoryError> {
        self.store.ledger_for(creator_id).await
    }
}
