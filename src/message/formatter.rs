use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};

use super::cache::{CacheError, MetadataCache};
use super::events::{ContainerMeta, EntityKey, Event, EventKind, EventsGroup, StartupInfo};
use super::template::{Slot, Values};
use super::templates::{self, CONTINUATION, FOOTER, STARTUP, TITLE};

/// Turns a window of events into digests.
///
/// The formatter owns the metadata cache. It must be driven from a single
/// task, which the aggregator guarantees by owning the formatter.
pub struct Formatter {
    cache: MetadataCache,
    node_name: String,
}

impl Formatter {
    pub fn new(node_name: impl Into<String>, cache_capacity: usize) -> Result<Self, CacheError> {
        Ok(Self {
            cache: MetadataCache::new(cache_capacity)?,
            node_name: node_name.into(),
        })
    }

    /// Partitions a window of events by the entity they describe.
    ///
    /// Startup notices go to the reserved key and the latest one wins.
    /// Container events refresh the group's name and image as well as the
    /// metadata cache.
    pub fn group(&mut self, events: Vec<Event>) -> HashMap<EntityKey, EventsGroup> {
        let mut groups: HashMap<EntityKey, EventsGroup> = HashMap::new();

        for event in events {
            let key = event.key();

            if let EventKind::Info(info) = event.kind {
                groups.insert(key, EventsGroup::startup(info));
                continue;
            }

            let group = groups
                .entry(key)
                .or_insert_with_key(|key| EventsGroup::new(key.id()));

            if let EventKind::Container(container) = &event.kind {
                // A payload without a name must not wipe what we already know
                if !container.name.is_empty() {
                    let meta = ContainerMeta {
                        name: container.name.clone(),
                        image: container.image.clone(),
                    };
                    self.cache.put(container.id.clone(), meta.clone());
                    group.meta = meta;
                }
            }

            group.events.push(event);
        }

        groups
    }

    /// Renders one group. Returns `None` when there is nothing to say.
    pub fn render(&mut self, group: &EventsGroup) -> Option<String> {
        let mut out = match &group.startup {
            Some(info) if !info.is_empty() => self.startup_message(info),
            _ => String::new(),
        };

        if group.events.is_empty() {
            return (!out.is_empty()).then_some(out);
        }

        let mut meta = group.meta.clone();
        if meta.name.is_empty() {
            if let Some(cached) = self.cache.get(&group.id) {
                meta = cached;
            }
        }

        let node = match self.node_name.as_str() {
            "" => String::new(),
            name => format!("*@*_{name}_ "),
        };
        let first = &group.events[0];
        TITLE.render_into(
            &mut out,
            &Values::new()
                .set(Slot::Node, node)
                .set(Slot::Name, meta.name.as_str())
                .set(Slot::Image, meta.image.as_str())
                .set(Slot::Time, format_time(first.meta.time)),
        );

        let last = group.events.len() - 1;
        for (idx, event) in group.events.iter().enumerate() {
            let template = templates::event_template(&event.kind, &event.meta.action);
            if let Some(template) = template {
                template.render_into(&mut out, &event_values(event));
            }

            if idx != last {
                out.push_str(CONTINUATION);
            }
        }

        FOOTER.render_into(&mut out, &Values::new().set(Slot::Id, group.id.as_str()));

        Some(out)
    }

    fn startup_message(&self, info: &StartupInfo) -> String {
        STARTUP.render(
            &Values::new()
                .set(Slot::Node, self.node_name.as_str())
                .set(Slot::RuntimeVersion, info.runtime_version.as_str())
                .set(Slot::ApiVersion, info.api_version.as_str())
                .set(Slot::Os, info.os.as_str())
                .set(Slot::KernelVersion, info.kernel_version.as_str()),
        )
    }
}

fn event_values(event: &Event) -> Values<'_> {
    let values = Values::new()
        .set(Slot::Action, title_case(&event.meta.action))
        .set(Slot::Time, format_time(event.meta.time));

    match &event.kind {
        EventKind::Container(c) => values
            .set(Slot::Id, c.id.as_str())
            .set(Slot::Name, c.name.as_str())
            .set(Slot::Image, c.image.as_str())
            .set(Slot::ExitCode, c.exit_code.as_str())
            .set(Slot::Signal, c.signal.as_str()),
        EventKind::Volume(v) => values
            .set(Slot::Id, v.id.as_str())
            .set(Slot::Destination, v.destination.as_str())
            .set(Slot::Propagation, v.propagation.as_str()),
        EventKind::Network(n) => values
            .set(Slot::Id, n.id.as_str())
            .set(Slot::NetworkName, n.name.as_str())
            .set(Slot::NetworkType, n.network_type.as_str()),
        EventKind::Info(_) => values,
    }
}

fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Upper-cases the first letter of every word.
///
/// Letters, digits and underscores continue a word; anything else starts a
/// new one, so `exec_start: sh` becomes `Exec_start: Sh`.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !(c.is_alphanumeric() || c == '_');
    }
    out
}
