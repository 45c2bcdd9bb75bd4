///! Position broadcaster - the shared polling loop feeding all clients
use super::api_client::PositionSource;
use super::types::PositionReport;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

const BROADCAST_CHANNEL_CAPACITY: usize = 64;

/// Polls the position source and fans reports out to all subscribers
///
/// One broadcaster backs the whole process. Subscribers that fall more
/// than the channel capacity behind skip to fresh reports; they never
/// slow the loop down.
pub struct PositionBroadcaster {
    source: Arc<dyn PositionSource>,
    poll_interval: Duration,
    report_tx: broadcast::Sender<PositionReport>,
}

impl PositionBroadcaster {
    pub fn new(source: Arc<dyn PositionSource>, poll_interval: Duration) -> Self {
        let (report_tx, _) = broadcast::channel(BROADCAST_CHANNEL_CAPACITY);

        Self {
            source,
            poll_interval,
            report_tx,
        }
    }

    /// Subscribe to position reports
    ///
    /// The receiver observes only reports emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<PositionReport> {
        self.report_tx.subscribe()
    }

    /// Spawn the polling loop
    ///
    /// Fetches and broadcasts one report per tick, sleeping for the poll
    /// interval between emissions, so consecutive reports are spaced by
    /// at least the interval plus whatever the fetch took. The task never
    /// terminates on its own: failures are broadcast as error reports and
    /// polling continues, with or without subscribers.
    ///
    /// Each call spawns a fresh task; `ConnectionRegistry` guarantees at
    /// most one is ever started.
    pub fn start(&self) -> JoinHandle<()> {
        tracing::info!(
            "Starting position broadcast loop (interval: {:?})",
            self.poll_interval
        );

        let source = Arc::clone(&self.source);
        let poll_interval = self.poll_interval;
        let report_tx = self.report_tx.clone();

        tokio::spawn(async move {
            loop {
                let report = source.fetch().await;

                if let Some(error) = &report.error {
                    tracing::warn!("✗ Broadcasting error report: {}", error);
                } else {
                    tracing::debug!(
                        "✓ Broadcasting position {:?},{:?} ({:?}) to {} subscriber(s)",
                        report.latitude,
                        report.longitude,
                        report.country_code,
                        report_tx.receiver_count()
                    );
                }

                // No subscribers is fine, the loop keeps polling
                if report_tx.send(report).is_err() {
                    tracing::debug!("No connected clients, report dropped");
                }

                tokio::time::sleep(poll_interval).await;
            }
        })
    }
}
