//! Background sweep that ends expired support chat rooms and purges their attachments.
//!
//! Two guards keep the sweep single-flight: an in-process busy flag, and a lease row in the
//! store so that several service instances never sweep at the same time. The lease is renewed
//! before every room after the first; a sweep that loses it stops where it is.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::repository::{ChatRoomStore, JobLeaseStore, RepositoryError, RoomFileStore};

pub const REAPER_JOB: &str = "chat_room_reaper";
pub const SYSTEM_ACTOR: &str = "system";
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_LEASE_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
pub struct ReaperSettings {
    pub interval: Duration,
    pub lease_ttl: Duration,
    pub holder: String,
}

impl Default for ReaperSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SWEEP_INTERVAL,
            lease_ttl: DEFAULT_LEASE_TTL,
            holder: format!("reaper-{}", std::process::id()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A sweep is already running in this process.
    InProgress,
    /// Another instance holds the reaper lease.
    LeaseHeld,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub ended: usize,
    pub failed: usize,
    /// Rooms that were ended by someone else between the scan and the update.
    pub raced: usize,
    /// The lease could not be renewed, so the remaining rooms were left for the next sweep.
    pub lease_lost: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepOutcome {
    Completed(SweepReport),
    Skipped(SkipReason),
}

/// Clears the busy flag when the sweep finishes, including on early return.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct Running {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

pub struct ChatReaper<S, F> {
    store: Arc<S>,
    files: Arc<F>,
    settings: ReaperSettings,
    busy: AtomicBool,
    running: Mutex<Option<Running>>,
}

impl<S, F> ChatReaper<S, F>
where
    S: ChatRoomStore + JobLeaseStore + 'static,
    F: RoomFileStore + 'static,
{
    pub fn new(store: Arc<S>, files: Arc<F>, settings: ReaperSettings) -> Self {
        Self {
            store,
            files,
            settings,
            busy: AtomicBool::new(false),
            running: Mutex::new(None),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .map(|running| running.is_some())
            .unwrap_or(false)
    }

    /// Spawns the periodic sweep loop; returns `false` if it was already started.
    pub fn start(self: &Arc<Self>) -> bool {
        let mut running = match self.running.lock() {
            Ok(guard) => guard,
            Err(_) => {
                error!("reaper state mutex poisoned; not starting");
                return false;
            }
        };
        if running.is_some() {
            warn!("chat reaper already running");
            return false;
        }

        let (shutdown, mut stop) = watch::channel(false);
        let reaper = Arc::clone(self);
        let period = self.settings.interval;
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(err) = reaper.sweep().await {
                            error!(error = %err, "chat reaper sweep failed");
                        }
                    }
                    _ = stop.changed() => {
                        info!("chat reaper stopped");
                        break;
                    }
                }
            }
        });

        info!(interval_secs = period.as_secs(), holder = %self.settings.holder, "chat reaper started");
        *running = Some(Running { shutdown, handle });
        true
    }

    /// Stops scheduling new sweeps. An in-flight sweep runs to completion.
    pub fn stop(&self) -> Option<JoinHandle<()>> {
        let running = self.running.lock().ok()?.take()?;
        let _ = running.shutdown.send(true);
        Some(running.handle)
    }

    pub async fn sweep(&self) -> Result<SweepOutcome, RepositoryError> {
        self.sweep_at(Utc::now()).await
    }

    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<SweepOutcome, RepositoryError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("chat reaper sweep already in progress");
            return Ok(SweepOutcome::Skipped(SkipReason::InProgress));
        }
        let _busy = BusyGuard(&self.busy);

        let holder = self.settings.holder.as_str();
        if !self
            .store
            .try_acquire_lease(REAPER_JOB, holder, self.settings.lease_ttl, now)
            .await?
        {
            debug!("chat reaper lease held by another instance");
            return Ok(SweepOutcome::Skipped(SkipReason::LeaseHeld));
        }

        let report = self.reap_expired(now).await;
        if let Err(err) = self.store.release_lease(REAPER_JOB, holder).await {
            warn!(error = %err, "failed to release chat reaper lease");
        }

        let report = report?;
        if report.ended > 0 || report.failed > 0 || report.lease_lost {
            info!(
                ended = report.ended,
                failed = report.failed,
                raced = report.raced,
                lease_lost = report.lease_lost,
                "chat reaper sweep finished"
            );
        }
        Ok(SweepOutcome::Completed(report))
    }

    async fn reap_expired(&self, now: DateTime<Utc>) -> Result<SweepReport, RepositoryError> {
        let rooms = self.store.expired_active_rooms(now).await?;
        let mut report = SweepReport::default();
        let started = Instant::now();

        for (index, room) in rooms.into_iter().enumerate() {
            if index > 0 && !self.renew_lease(now, started).await {
                report.lease_lost = true;
                break;
            }
            if let Err(err) = self.files.delete_room_files(&room.id).await {
                warn!(room_id = %room.id, error = %err, "failed to purge chat attachments; room left active");
                report.failed += 1;
                continue;
            }

            match self.store.end_chat_room(&room.id, SYSTEM_ACTOR, now).await {
                Ok(true) => {
                    debug!(room_id = %room.id, "chat room ended");
                    report.ended += 1;
                }
                Ok(false) => report.raced += 1,
                Err(err) => {
                    warn!(room_id = %room.id, error = %err, "failed to end chat room");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Extends the lease from the sweep's logical start by the wall time spent so far.
    async fn renew_lease(&self, now: DateTime<Utc>, started: Instant) -> bool {
        let elapsed =
            chrono::Duration::from_std(started.elapsed()).unwrap_or_else(|_| chrono::Duration::zero());
        let holder = self.settings.holder.as_str();
        match self
            .store
            .try_acquire_lease(REAPER_JOB, holder, self.settings.lease_ttl, now + elapsed)
            .await
        {
            Ok(true) => true,
            Ok(false) => {
                warn!(holder, "chat reaper lease taken over mid-sweep; stopping");
                false
            }
            Err(err) => {
                warn!(error = %err, "failed to renew chat reaper lease; stopping");
                false
            }
        }
    }
}
