//! # Event Bus
//!
//! Change notifications from commands to whatever is currently on screen.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Event Bus                                        │
//! │                                                                         │
//! │  create_sales_invoice ──► COMMIT ──► publish(DataChanged{sales})       │
//! │                                            │                            │
//! │                        broadcast::channel(256)                          │
//! │                  ┌─────────────────┼─────────────────┐                  │
//! │                  ▼                 ▼                 ▼                  │
//! │            Dashboard view    Price list view   BackupScheduler          │
//! │            (Subscription)    (Subscription)    (SettingsSaved only)     │
//! │                                                                         │
//! │  A view subscribes when it opens and drops its Subscription when it    │
//! │  closes. Events are published only after the transaction commits.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use invpro_core::Section;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Buffered events per subscriber before the slowest one starts lagging.
pub const EVENT_BUS_CAPACITY: usize = 256;

/// What kind of change a command made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
    StockAdjusted,
}

/// An application event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    /// Rows in a section changed; views showing that section should reload.
    DataChanged { section: Section, change: ChangeKind },

    /// settings.json was rewritten.
    SettingsSaved,

    /// A role's permission set changed; sessions holding it should refresh.
    PermissionsUpdated { role_id: i64 },

    /// A backup finished.
    BackupCompleted { path: PathBuf, automatic: bool },
}

impl AppEvent {
    pub fn data_changed(section: Section, change: ChangeKind) -> Self {
        AppEvent::DataChanged { section, change }
    }
}

/// Broadcast bus owned by the shell.
///
/// Cloning is cheap; every clone publishes into the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AppEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(EVENT_BUS_CAPACITY)
    }

    /// A bus that keeps at most `capacity` unread events per subscriber.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        EventBus { tx }
    }

    /// Publishes an event to every current subscriber.
    ///
    /// Having no subscribers is normal (no view open) and not an error.
    pub fn publish(&self, event: AppEvent) {
        debug!(?event, "Publishing event");
        let _ = self.tx.send(event);
    }

    /// Registers a new subscriber. Dropping the subscription unsubscribes.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Number of live subscriptions.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// What a subscriber receives next.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Event(AppEvent),
    /// The subscriber fell behind and this many events were dropped.
    Missed(u64),
}

/// One subscriber's end of the bus.
#[derive(Debug)]
pub struct Subscription {
    rx: broadcast::Receiver<AppEvent>,
}

impl Subscription {
    /// Waits for the next event or a report of lost events.
    ///
    /// For subscribers that keep state derived from events: on `Missed`
    /// that state has to be rebuilt from its source. Returns `None` once
    /// every [`EventBus`] clone has been dropped.
    pub async fn next(&mut self) -> Option<Delivery> {
        match self.rx.recv().await {
            Ok(event) => Some(Delivery::Event(event)),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Event subscriber lagged");
                Some(Delivery::Missed(skipped))
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }

    /// Waits for the next event.
    ///
    /// Skips over events lost to lag. Returns `None` once every
    /// [`EventBus`] clone has been dropped.
    pub async fn recv(&mut self) -> Option<AppEvent> {
        loop {
            match self.next().await? {
                Delivery::Event(event) => return Some(event),
                Delivery::Missed(_) => continue,
            }
        }
    }

    /// Returns the next already-published event without waiting.
    pub fn try_recv(&mut self) -> Option<AppEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event subscriber lagged");
                    continue;
                }
                Err(_) => return None,
            }
        }
    }
}
