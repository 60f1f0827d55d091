//! # Auto-Backup Scheduler
//!
//! Background task that snapshots the database every
//! `auto_backup_interval` hours while auto-backup is enabled.
//!
//! ## Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  loop {                                                                │
//! │      select! {                                                         │
//! │          interval.tick()        ──► reload settings ──► auto_backup    │
//! │          bus: SettingsSaved     ──► rebuild interval from settings     │
//! │          bus: missed events     ──► rebuild interval from settings     │
//! │          shutdown_rx.recv()     ──► break                              │
//! │      }                                                                 │
//! │  }                                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! With auto-backup disabled there is no interval at all; the task only
//! waits for a settings change or shutdown. If the subscription lags, a
//! `SettingsSaved` may be among the dropped events, so the interval is
//! rebuilt as if one had arrived.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::{BackupInfo, BackupManager};
use crate::error::{AppError, AppResult};
use crate::state::{AppEvent, Delivery, SettingsStore, Subscription};

const HOUR: Duration = Duration::from_secs(60 * 60);

/// Runs automatic backups.
pub struct BackupScheduler {
    manager: BackupManager,
    settings: SettingsStore,
    events: Subscription,
    shutdown_rx: mpsc::Receiver<()>,
    /// Length of one "hour" of `auto_backup_interval`.
    unit: Duration,
}

/// Handle for stopping the scheduler.
#[derive(Debug)]
pub struct BackupSchedulerHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl BackupSchedulerHandle {
    /// Stops the scheduler and waits for the task to finish.
    pub async fn shutdown(self) -> AppResult<()> {
        // A send error means the task already ended.
        let _ = self.shutdown_tx.send(()).await;
        self.task
            .await
            .map_err(|e| AppError::internal(format!("Backup scheduler task failed: {}", e)))
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl BackupScheduler {
    /// Creates a scheduler. It subscribes to the event bus immediately so no
    /// settings change made after this call is missed.
    pub fn new(manager: BackupManager, settings: SettingsStore, events: Subscription) -> (Self, mpsc::Sender<()>) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let scheduler = BackupScheduler {
            manager,
            settings,
            events,
            shutdown_rx,
            unit: HOUR,
        };
        (scheduler, shutdown_tx)
    }

    /// Shortens the interval unit. Only useful in tests.
    pub fn with_unit(mut self, unit: Duration) -> Self {
        self.unit = unit;
        self
    }

    /// Spawns the scheduler as a tokio task.
    pub fn spawn(self, shutdown_tx: mpsc::Sender<()>) -> BackupSchedulerHandle {
        let task = tokio::spawn(self.run());
        BackupSchedulerHandle { shutdown_tx, task }
    }

    /// Convenience for `new` + `spawn`.
    pub fn start(manager: BackupManager, settings: SettingsStore, events: Subscription) -> BackupSchedulerHandle {
        let (scheduler, shutdown_tx) = Self::new(manager, settings, events);
        scheduler.spawn(shutdown_tx)
    }

    /// Runs the scheduler loop until shutdown.
    pub async fn run(mut self) {
        info!("Backup scheduler starting");
        let mut ticker = self.build_interval();

        loop {
            tokio::select! {
                _ = tick(&mut ticker) => {
                    if let Err(e) = self.run_once().await {
                        error!(error = %e, "Automatic backup failed");
                    }
                }

                delivery = self.events.next() => match delivery {
                    Some(Delivery::Event(AppEvent::SettingsSaved)) => {
                        debug!("Settings changed, rescheduling auto-backup");
                        ticker = self.build_interval();
                    }
                    Some(Delivery::Missed(skipped)) => {
                        warn!(skipped, "Missed events, rescheduling auto-backup from settings");
                        ticker = self.build_interval();
                    }
                    Some(Delivery::Event(_)) => {}
                    None => {
                        info!("Event bus closed");
                        break;
                    }
                },

                _ = self.shutdown_rx.recv() => {
                    info!("Backup scheduler shutting down");
                    break;
                }
            }
        }

        info!("Backup scheduler stopped");
    }

    /// Performs one scheduled backup if settings allow it.
    ///
    /// Settings are re-read every time, so a disabled flag or a changed
    /// folder takes effect on the next tick.
    pub async fn run_once(&self) -> AppResult<Option<BackupInfo>> {
        let settings = self.settings.load()?;
        match settings.backup_dir() {
            Some(dir) if settings.auto_backup => self.manager.auto_backup(&dir).await,
            _ => {
                debug!("Auto-backup disabled, skipping");
                Ok(None)
            }
        }
    }

    fn build_interval(&self) -> Option<Interval> {
        let settings = match self.settings.load() {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "Could not read settings; auto-backup paused");
                return None;
            }
        };

        if !settings.auto_backup_enabled() {
            info!("Auto-backup disabled");
            return None;
        }

        let period = self.unit * settings.auto_backup_interval;
        info!(hours = settings.auto_backup_interval, "Auto-backup scheduled");

        // First backup after one full period, not at startup
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Some(interval)
    }
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
