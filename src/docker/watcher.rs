//! Turns the Docker event stream into pipeline events.

use std::collections::HashMap;

use bollard::Docker;
use bollard::models::{ContainerSummary, EventMessage, EventMessageTypeEnum};
use bollard::query_parameters::{EventsOptionsBuilder, ListContainersOptionsBuilder};
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use crate::config::DockerConfig;
use crate::message::events::{ContainerEvent, NetworkEvent, StartupInfo, VolumeEvent};
use crate::message::{Event, EventKind};
use crate::pipeline::EventQueue;

/// Action attached to containers announced at startup with `show_running`.
const RUNNING_ACTION: &str = "running";

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("Docker API error: {0}")]
    DockerApi(#[from] bollard::errors::Error),
    #[error("Docker event stream ended unexpectedly")]
    StreamClosed,
}

/// Feeds Docker events into `queue` until `cancel` fires.
///
/// Returns `Ok(())` on cancellation, or when the aggregator is gone.
pub async fn watch(
    docker: &Docker,
    queue: &EventQueue,
    config: &DockerConfig,
    cancel: &CancellationToken,
) -> Result<(), WatchError> {
    announce_startup(docker, queue).await?;

    if config.show_running {
        announce_running(docker, queue).await?;
    }

    let types = config.listen.event_types();
    if types.is_empty() {
        warn!("All Docker event listeners are disabled");
        cancel.cancelled().await;
        return Ok(());
    }

    let mut filters = HashMap::new();
    filters.insert("type", types.clone());
    let options = EventsOptionsBuilder::new().filters(&filters).build();
    let mut stream = Box::pin(docker.events(Some(options)));

    info!("Listening for Docker {} events", types.join(", "));

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Stopping Docker event watcher");
                return Ok(());
            }
            item = stream.next() => match item {
                Some(Ok(message)) => {
                    if let Some(event) = from_message(message) {
                        if !queue.push(event) {
                            return Ok(());
                        }
                    }
                }
                Some(Err(e)) => return Err(e.into()),
                None => return Err(WatchError::StreamClosed),
            }
        }
    }
}

async fn announce_startup(docker: &Docker, queue: &EventQueue) -> Result<(), WatchError> {
    let version = docker.version().await?;
    let info = StartupInfo {
        runtime_version: version.version.unwrap_or_default(),
        api_version: version.api_version.unwrap_or_default(),
        os: version.os.unwrap_or_default(),
        kernel_version: version.kernel_version.unwrap_or_default(),
    };
    info!(
        "Connected to Docker {} (API {})",
        info.runtime_version, info.api_version
    );
    queue.push(Event::new("start", Utc::now(), EventKind::Info(info)));
    Ok(())
}

async fn announce_running(docker: &Docker, queue: &EventQueue) -> Result<(), WatchError> {
    let options = ListContainersOptionsBuilder::new().all(false).build();
    let containers = docker.list_containers(Some(options)).await?;
    info!("Announcing {} running containers", containers.len());

    let now = Utc::now();
    for summary in containers {
        queue.push(Event::new(
            RUNNING_ACTION,
            now,
            EventKind::Container(running_container(summary)),
        ));
    }
    Ok(())
}

fn running_container(summary: ContainerSummary) -> ContainerEvent {
    let name = summary
        .names
        .and_then(|names| names.into_iter().next())
        .map(|name| name.trim_start_matches('/').to_string())
        .unwrap_or_default();
    ContainerEvent {
        id: summary.id.unwrap_or_default(),
        name,
        image: summary.image.unwrap_or_default(),
        ..Default::default()
    }
}

/// Maps one Docker event message. Message types the pipeline does not
/// describe yield `None`.
fn from_message(message: EventMessage) -> Option<Event> {
    let time = message_time(&message);
    let action = message.action.unwrap_or_default();
    let actor = message.actor.unwrap_or_default();
    let id = actor.id.unwrap_or_default();
    let mut attributes = actor.attributes.unwrap_or_default();
    let mut attr = |key: &str| attributes.remove(key).unwrap_or_default();

    let kind = match message.typ {
        Some(EventMessageTypeEnum::CONTAINER) => EventKind::Container(ContainerEvent {
            id,
            name: attr("name"),
            image: attr("image"),
            exit_code: attr("exitCode"),
            signal: attr("signal"),
        }),
        Some(EventMessageTypeEnum::VOLUME) => EventKind::Volume(VolumeEvent {
            id,
            container_id: attr("container"),
            destination: attr("destination"),
            propagation: attr("propagation"),
        }),
        Some(EventMessageTypeEnum::NETWORK) => EventKind::Network(NetworkEvent {
            id,
            container_id: attr("container"),
            name: attr("name"),
            network_type: attr("type"),
        }),
        other => {
            debug!("Ignoring Docker event of type {other:?} ({action})");
            return None;
        }
    };

    Some(Event::new(action, time, kind))
}

fn message_time(message: &EventMessage) -> DateTime<Utc> {
    message
        .time_nano
        .map(DateTime::from_timestamp_nanos)
        .or_else(|| message.time.and_then(|secs| DateTime::from_timestamp(secs, 0)))
        .unwrap_or_else(Utc::now)
}
