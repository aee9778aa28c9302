//! Background handling of event save notifications.
//!
//! The main components are:
//! - `RegenerationState`: a clonable, thread-safe handle injected into the
//!   Actix application state. It holds the live status of every event that was
//!   notified since startup and the sender used to queue new requests.
//! - `RegenerationRequest`: one save notification, queued by the
//!   `/api/events/{id}/saved` endpoint.
//! - `start_regeneration_worker`: a long-running task that receives requests,
//!   waits for the save to settle and runs the `Regenerator` on the blocking
//!   pool, publishing `Pending → Running → Completed | Skipped | Failed`.

use crate::regeneration::{RegenerationOutcome, Regenerator};
use chrono::Utc;
use common::jobs::RegenerationStatus;
use common::model::event::EventId;
use common::requests::SaveAction;
use log::{debug, error, info};
use std::time::Duration;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{mpsc, RwLock};

const QUEUE_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct RegenerationState {
    /// Latest known status per event. Read by the status endpoint, written by
    /// the notifier and the worker.
    pub statuses: Arc<RwLock<HashMap<EventId, RegenerationStatus>>>,
    pub tx: mpsc::Sender<RegenerationRequest>,
}

#[derive(Debug)]
pub struct RegenerationRequest {
    pub(crate) event_id: EventId,
    pub(crate) action: SaveAction,
}

impl RegenerationState {
    /// Creates the shared state and the receiving end for the worker.
    pub fn new() -> (RegenerationState, mpsc::Receiver<RegenerationRequest>) {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let state = RegenerationState {
            statuses: Arc::new(RwLock::new(HashMap::new())),
            tx,
        };
        (state, rx)
    }

    pub async fn status(&self, event_id: EventId) -> Option<RegenerationStatus> {
        self.statuses.read().await.get(&event_id).cloned()
    }

    async fn set_status(&self, event_id: EventId, status: RegenerationStatus) {
        let mut statuses = self.statuses.write().await;
        statuses.insert(event_id, status);
    }

    /// Queues a regeneration for a saved event and marks it pending.
    pub async fn notify(&self, event_id: EventId, action: SaveAction) -> Result<(), String> {
        self.set_status(event_id, RegenerationStatus::Pending).await;
        self.tx
            .send(RegenerationRequest { event_id, action })
            .await
            .map_err(|e| format!("regeneration queue closed: {}", e))
    }
}

/// How long to wait after a save before regenerating.
#[derive(Debug, Clone, Copy)]
pub struct SettleDelays {
    pub created: Duration,
    pub updated: Duration,
}

impl Default for SettleDelays {
    fn default() -> Self {
        SettleDelays {
            created: Duration::from_millis(2000),
            updated: Duration::from_millis(1000),
        }
    }
}

impl SettleDelays {
    pub fn for_action(&self, action: SaveAction) -> Duration {
        match action {
            SaveAction::Created => self.created,
            SaveAction::Updated => self.updated,
        }
    }
}

/// Receives save notifications until every sender is dropped.
///
/// Each request runs on its own task, so different events regenerate in
/// parallel. Overlapping requests for one event are left to the debounce
/// policy.
pub async fn start_regeneration_worker(
    state: RegenerationState,
    mut rx: mpsc::Receiver<RegenerationRequest>,
    regenerator: Arc<Regenerator>,
    delays: SettleDelays,
) {
    while let Some(RegenerationRequest { event_id, action }) = rx.recv().await {
        debug!("Event {}: {:?} notification received", event_id, action);
        let state = state.clone();
        let regenerator = regenerator.clone();
        let delay = delays.for_action(action);

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            state.set_status(event_id, RegenerationStatus::Running).await;

            let outcome =
                tokio::task::spawn_blocking(move || regenerator.regenerate(event_id, Utc::now()))
                    .await;
            let status = match outcome {
                Ok(RegenerationOutcome::Generated { path }) => RegenerationStatus::Completed(path),
                Ok(RegenerationOutcome::Skipped) => RegenerationStatus::Skipped,
                Ok(RegenerationOutcome::Failed(message)) => RegenerationStatus::Failed(message),
                Err(e) => {
                    error!("Event {}: regeneration task panicked: {}", event_id, e);
                    RegenerationStatus::Failed(e.to_string())
                }
            };
            info!("Event {}: regeneration finished: {:?}", event_id, status);
            state.set_status(event_id, status).await;
        });
    }
    info!("Regeneration worker stopped");
}
