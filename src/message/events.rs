use chrono::{DateTime, Utc};

/// Fields shared by every event regardless of its variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaData {
    pub action: String,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerEvent {
    pub id: String,
    pub name: String,
    pub image: String,
    pub exit_code: String,
    pub signal: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumeEvent {
    pub id: String,
    /// Container the volume was mounted into or unmounted from. May be empty.
    pub container_id: String,
    pub destination: String,
    pub propagation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkEvent {
    pub id: String,
    /// Container that was connected or disconnected. May be empty.
    pub container_id: String,
    pub name: String,
    pub network_type: String,
}

/// Runtime details announced once when the watcher starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartupInfo {
    pub runtime_version: String,
    pub api_version: String,
    pub os: String,
    pub kernel_version: String,
}

impl StartupInfo {
    pub fn is_empty(&self) -> bool {
        self.runtime_version.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Container(ContainerEvent),
    Volume(VolumeEvent),
    Network(NetworkEvent),
    Info(StartupInfo),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub meta: MetaData,
    pub kind: EventKind,
}

impl Event {
    pub fn new(action: impl Into<String>, time: DateTime<Utc>, kind: EventKind) -> Self {
        Self {
            meta: MetaData {
                action: action.into(),
                time,
            },
            kind,
        }
    }

    /// The runtime's name for the variant of this event.
    pub fn entity_type(&self) -> &'static str {
        match self.kind {
            EventKind::Container(_) => "container",
            EventKind::Volume(_) => "volume",
            EventKind::Network(_) => "network",
            EventKind::Info(_) => "info",
        }
    }

    /// Key of the group this event belongs to within a flush window.
    ///
    /// Volume and network events are keyed by the container they touched
    /// when the runtime reports one, so they land next to that container's
    /// own lifecycle events.
    pub fn key(&self) -> EntityKey {
        let id = match &self.kind {
            EventKind::Info(_) => return EntityKey::Startup,
            EventKind::Container(c) => &c.id,
            EventKind::Volume(v) if !v.container_id.is_empty() => &v.container_id,
            EventKind::Volume(v) => &v.id,
            EventKind::Network(n) if !n.container_id.is_empty() => &n.container_id,
            EventKind::Network(n) => &n.id,
        };
        EntityKey::Entity(id.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKey {
    /// Reserved for runtime startup notices. Never shared with an entity.
    Startup,
    Entity(String),
}

impl EntityKey {
    pub fn id(&self) -> &str {
        match self {
            Self::Startup => "",
            Self::Entity(id) => id,
        }
    }
}

/// Last known descriptive metadata of a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerMeta {
    pub name: String,
    pub image: String,
}

/// Everything that happened to one entity during one flush window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventsGroup {
    pub id: String,
    pub meta: ContainerMeta,
    pub startup: Option<StartupInfo>,
    pub events: Vec<Event>,
}

impl EventsGroup {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn startup(info: StartupInfo) -> Self {
        Self {
            startup: Some(info),
            ..Default::default()
        }
    }
}
