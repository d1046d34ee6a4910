use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::queue::{self, EventQueue};
use crate::message::Event;
use crate::message::Formatter;
use crate::message::events::{EntityKey, EventsGroup};
use crate::webhook::Deliver;

pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(3);

/// Outcome of one non-empty flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    pub events: usize,
    pub groups: usize,
    /// `None` when the window rendered to nothing and no delivery was attempted.
    pub delivered: Option<bool>,
}

/// Batches events over a fixed window and hands each window to the
/// formatter and then the sender.
pub struct Aggregator<D> {
    rx: UnboundedReceiver<Event>,
    formatter: Formatter,
    sender: D,
    interval: Duration,
    cancel: CancellationToken,
    buffer: Vec<Event>,
    listener: Option<UnboundedSender<FlushReport>>,
}

impl<D: Deliver> Aggregator<D> {
    pub fn new(
        formatter: Formatter,
        sender: D,
        interval: Duration,
        cancel: CancellationToken,
    ) -> (Self, EventQueue) {
        let (queue, rx) = queue::channel();
        let aggregator = Self {
            rx,
            formatter,
            sender,
            interval,
            cancel,
            buffer: Vec::new(),
            listener: None,
        };
        (aggregator, queue)
    }

    /// Reports every completed flush on `tx`.
    pub fn with_flush_listener(mut self, tx: UnboundedSender<FlushReport>) -> Self {
        self.listener = Some(tx);
        self
    }

    pub async fn run(mut self) {
        info!("Aggregator started, flushing every {:?}", self.interval);
        let mut flush_interval = tokio::time::interval(self.interval);
        flush_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        flush_interval.tick().await;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    // Refuse new pushes, then take everything already accepted
                    self.rx.close();
                    while let Some(event) = self.rx.recv().await {
                        self.buffer.push(event);
                    }
                    info!("Shutdown requested, flushing {} pending events", self.buffer.len());
                    self.flush().await;
                    break;
                }
                maybe_event = self.rx.recv() => {
                    match maybe_event {
                        Some(event) => self.buffer.push(event),
                        None => {
                            info!("Event channel closed, flushing remaining events");
                            self.flush().await;
                            break;
                        }
                    }
                }
                _ = flush_interval.tick() => self.flush().await,
            }
        }
        info!("Aggregator stopped");
    }

    async fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }

        let start = Instant::now();
        let batch = std::mem::take(&mut self.buffer);
        let events = batch.len();
        let groups = self.formatter.group(batch);
        let group_count = groups.len();

        let delivered = match compose(&mut self.formatter, groups) {
            Some(digest) => match self.sender.deliver(&digest).await {
                Ok(()) => {
                    info!("Delivered digest of {events} events across {group_count} groups");
                    Some(true)
                }
                Err(e) => {
                    error!("Failed to deliver digest of {events} events: {e}");
                    Some(false)
                }
            },
            None => {
                debug!("Window of {events} events rendered to nothing");
                None
            }
        };

        let duration = start.elapsed();
        if duration > self.interval {
            warn!("Flush took {:?}, longer than the flush interval", duration);
        }

        if let Some(listener) = &self.listener {
            let _ = listener.send(FlushReport {
                events,
                groups: group_count,
                delivered,
            });
        }
    }
}

/// Renders every group of a window into one message, startup notice first.
fn compose(
    formatter: &mut Formatter,
    mut groups: HashMap<EntityKey, EventsGroup>,
) -> Option<String> {
    let startup = groups.remove(&EntityKey::Startup);
    let digests: Vec<String> = startup
        .iter()
        .chain(groups.values())
        .filter_map(|group| formatter.render(group))
        .collect();

    (!digests.is_empty()).then(|| digests.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::events::{ContainerEvent, EventKind, StartupInfo};
    use crate::webhook::DeliveryError;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;

    #[derive(Clone, Default)]
    struct Recorder {
        digests: Arc<Mutex<Vec<String>>>,
        fail: bool,
        delay: Option<Duration>,
    }

    impl Recorder {
        fn digests(&self) -> Vec<String> {
            self.digests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Deliver for Recorder {
        async fn deliver(&self, digest: &str) -> Result<(), DeliveryError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.digests.lock().unwrap().push(digest.to_string());
            if self.fail {
                return Err(DeliveryError::Status(reqwest::StatusCode::BAD_GATEWAY));
            }
            Ok(())
        }
    }

    fn at() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn container(id: &str, action: &str, name: &str) -> Event {
        Event::new(
            action,
            at(),
            EventKind::Container(ContainerEvent {
                id: id.to_string(),
                name: name.to_string(),
                image: if name.is_empty() { String::new() } else { "nginx".to_string() },
                ..Default::default()
            }),
        )
    }

    fn startup() -> Event {
        Event::new(
            "start",
            at(),
            EventKind::Info(StartupInfo {
                runtime_version: "24.0.7".to_string(),
                ..Default::default()
            }),
        )
    }

    struct Harness {
        queue: EventQueue,
        reports: mpsc::UnboundedReceiver<FlushReport>,
        cancel: CancellationToken,
        handle: tokio::task::JoinHandle<()>,
    }

    fn start(recorder: &Recorder) -> Harness {
        let cancel = CancellationToken::new();
        let formatter = Formatter::new("edge-01", 128).unwrap();
        let (aggregator, queue) = Aggregator::new(
            formatter,
            recorder.clone(),
            DEFAULT_FLUSH_INTERVAL,
            cancel.clone(),
        );
        let (tx, reports) = mpsc::unbounded_channel();
        let handle = tokio::spawn(aggregator.with_flush_listener(tx).run());
        Harness {
            queue,
            reports,
            cancel,
            handle,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_windows_never_deliver() {
        let recorder = Recorder::default();
        let mut harness = start(&recorder);

        tokio::time::sleep(Duration::from_secs(10)).await;
        harness.cancel.cancel();
        harness.handle.await.unwrap();

        assert!(recorder.digests().is_empty());
        assert!(harness.reports.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drains_pending_events_once() {
        let recorder = Recorder::default();
        let harness = start(&recorder);

        harness.queue.push(container("c1", "create", "web"));
        harness.queue.push(container("c2", "create", "db"));
        harness.cancel.cancel();
        harness.handle.await.unwrap();

        let digests = recorder.digests();
        assert_eq!(digests.len(), 1);
        assert!(digests[0].contains("> `c1`"));
        assert!(digests[0].contains("> `c2`"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_windows_share_metadata_cache() {
        let recorder = Recorder::default();
        let mut harness = start(&recorder);

        harness.queue.push(container("c1", "create", "web"));
        let first = harness.reports.recv().await.unwrap();
        assert_eq!(
            first,
            FlushReport {
                events: 1,
                groups: 1,
                delivered: Some(true)
            }
        );

        harness.queue.push(container("c1", "kill", ""));
        harness.reports.recv().await.unwrap();

        harness.cancel.cancel();
        harness.handle.await.unwrap();

        let digests = recorder.digests();
        assert_eq!(digests.len(), 2);
        assert!(digests[1].contains("*web* `nginx`"));
        assert!(digests[1].contains("*Kill*"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_delivery_does_not_stop_the_loop() {
        let recorder = Recorder {
            fail: true,
            ..Default::default()
        };
        let mut harness = start(&recorder);

        harness.queue.push(container("c1", "start", "web"));
        assert_eq!(harness.reports.recv().await.unwrap().delivered, Some(false));

        harness.queue.push(container("c1", "stop", "web"));
        assert_eq!(harness.reports.recv().await.unwrap().delivered, Some(false));

        harness.cancel.cancel();
        harness.handle.await.unwrap();
        assert_eq!(recorder.digests().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_during_final_flush_is_refused() {
        let recorder = Recorder {
            delay: Some(Duration::from_secs(1)),
            ..Default::default()
        };
        let mut harness = start(&recorder);

        assert!(harness.queue.push(container("c1", "create", "web")));
        harness.cancel.cancel();
        // The final flush is still delivering c1
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(!harness.queue.push(container("c2", "create", "db")));

        harness.handle.await.unwrap();
        assert_eq!(harness.reports.recv().await.unwrap().events, 1);

        let digests = recorder.digests();
        assert_eq!(digests.len(), 1);
        assert!(digests[0].contains("> `c1`"));
        assert!(!digests[0].contains("> `c2`"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_notice_is_delivered_first() {
        let recorder = Recorder::default();
        let harness = start(&recorder);

        harness.queue.push(container("c1", "create", "web"));
        harness.queue.push(startup());
        harness.cancel.cancel();
        harness.handle.await.unwrap();

        let digests = recorder.digests();
        assert_eq!(digests.len(), 1);
        assert!(digests[0].starts_with("*Docker events watcher started*"));
        assert!(digests[0].contains("\n\n*@*_edge-01_ *web*"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_during_flush_go_to_next_window() {
        let recorder = Recorder {
            delay: Some(Duration::from_secs(1)),
            ..Default::default()
        };
        let mut harness = start(&recorder);

        harness.queue.push(container("c1", "start", "web"));
        // The first flush starts at 3s and is still delivering at 3.5s
        tokio::time::sleep(Duration::from_millis(3500)).await;
        harness.queue.push(container("c2", "start", "db"));

        let first = harness.reports.recv().await.unwrap();
        assert_eq!(first.events, 1);
        let second = harness.reports.recv().await.unwrap();
        assert_eq!(second.events, 1);

        harness.cancel.cancel();
        harness.handle.await.unwrap();

        let digests = recorder.digests();
        assert_eq!(digests.len(), 2);
        assert!(digests[0].contains("> `c1`") && !digests[0].contains("> `c2`"));
        assert!(digests[1].contains("> `c2`"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_channel_flushes_and_stops() {
        let recorder = Recorder::default();
        let harness = start(&recorder);

        harness.queue.push(container("c1", "create", "web"));
        drop(harness.queue);
        harness.handle.await.unwrap();

        assert_eq!(recorder.digests().len(), 1);
    }
}
