///! Connection registry - client tracking and broadcast loop lifecycle
use super::broadcaster::PositionBroadcaster;
use super::types::PositionReport;
use std::collections::HashSet;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Tracks connected clients and owns the broadcast loop handle
///
/// The loop starts when the first client connects and at most one
/// instance ever runs in the process, however many clients connect
/// concurrently. The guarantee is per process.
pub struct ConnectionRegistry {
    broadcaster: PositionBroadcaster,
    clients: RwLock<HashSet<Uuid>>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionRegistry {
    pub fn new(broadcaster: PositionBroadcaster) -> Self {
        Self {
            broadcaster,
            clients: RwLock::new(HashSet::new()),
            loop_handle: Mutex::new(None),
        }
    }

    /// Register a client and hand it a report subscription
    ///
    /// Subscribes before the loop can start, so the first client observes
    /// the first report the loop ever emits.
    pub async fn on_connect(&self, client_id: Uuid) -> broadcast::Receiver<PositionReport> {
        let report_rx = self.broadcaster.subscribe();

        {
            let mut clients = self.clients.write().await;
            clients.insert(client_id);
            tracing::info!("Client {} connected ({} active)", client_id, clients.len());
        }

        self.ensure_started().await;

        report_rx
    }

    /// Remove a client
    ///
    /// The broadcast loop keeps running even when the last client leaves.
    // TODO: abort the loop when the set empties and respawn it on the next connect
    pub async fn on_disconnect(&self, client_id: Uuid) {
        let mut clients = self.clients.write().await;
        if clients.remove(&client_id) {
            tracing::info!("Client {} disconnected ({} active)", client_id, clients.len());
        }
    }

    /// Start the broadcast loop unless it is already running
    ///
    /// The handle slot doubles as the started flag; holding its lock makes
    /// the check-and-spawn atomic under concurrent connects.
    async fn ensure_started(&self) {
        let mut loop_handle = self.loop_handle.lock().await;
        if loop_handle.is_none() {
            *loop_handle = Some(self.broadcaster.start());
        }
    }

    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn is_broadcasting(&self) -> bool {
        self.loop_handle.lock().await.is_some()
    }
}
