use super::events::EventKind;
use super::template::{Piece::Slot as S, Piece::Text as T, Slot, Template};

pub const STARTUP: Template = Template::new(&[
    T("*Docker events watcher started* on _"),
    S(Slot::Node),
    T("_\n\tDocker version: "),
    S(Slot::RuntimeVersion),
    T("\n\tAPI version: "),
    S(Slot::ApiVersion),
    T("\n\tOS: "),
    S(Slot::Os),
    T("\n\tKernel: "),
    S(Slot::KernelVersion),
    T("\n"),
]);

pub const TITLE: Template = Template::new(&[
    S(Slot::Node),
    T("*"),
    S(Slot::Name),
    T("* `"),
    S(Slot::Image),
    T("` "),
    S(Slot::Time),
    T("\n"),
]);

pub const FOOTER: Template = Template::new(&[T("> `"), S(Slot::Id), T("`\n")]);

pub const CONTINUATION: &str = "> \n";

const CONTAINER_KILL: Template = Template::new(&[
    T("> *"),
    S(Slot::Action),
    T("* with signal `"),
    S(Slot::Signal),
    T("` at "),
    S(Slot::Time),
    T("\n"),
]);

const CONTAINER_DIE: Template = Template::new(&[
    T("> *"),
    S(Slot::Action),
    T("* with exit code `"),
    S(Slot::ExitCode),
    T("` at "),
    S(Slot::Time),
    T("\n"),
]);

const CONTAINER_DEFAULT: Template = Template::new(&[
    T("> *"),
    S(Slot::Action),
    T("* at "),
    S(Slot::Time),
    T("\n"),
]);

const VOLUME_MOUNT: Template = Template::new(&[
    T("> *"),
    S(Slot::Action),
    T("* volume `"),
    S(Slot::Id),
    T("` on `"),
    S(Slot::Destination),
    T("` "),
    S(Slot::Propagation),
    T("\n"),
]);

const VOLUME_UNMOUNT: Template = Template::new(&[
    T("> *"),
    S(Slot::Action),
    T("* volume `"),
    S(Slot::Id),
    T("` from `"),
    S(Slot::Destination),
    T("`\n"),
]);

const VOLUME_DEFAULT: Template = Template::new(&[
    T("> *"),
    S(Slot::Action),
    T("* volume `"),
    S(Slot::Id),
    T("`\n"),
]);

const NETWORK_DEFAULT: Template = Template::new(&[
    T("> *"),
    S(Slot::Action),
    T("* network *"),
    S(Slot::NetworkName),
    T("* ("),
    S(Slot::NetworkType),
    T(") `"),
    S(Slot::Id),
    T("`\n"),
]);

/// Picks the line template for an event.
///
/// Container and volume events have action specific templates and fall back
/// to a generic line for any other action. Network events always use the
/// generic line. Startup notices have no event line.
pub fn event_template(kind: &EventKind, action: &str) -> Option<Template> {
    let template = match kind {
        EventKind::Container(_) => match action {
            "kill" => CONTAINER_KILL,
            "die" => CONTAINER_DIE,
            _ => CONTAINER_DEFAULT,
        },
        EventKind::Volume(_) => match action {
            "mount" => VOLUME_MOUNT,
            "unmount" => VOLUME_UNMOUNT,
            _ => VOLUME_DEFAULT,
        },
        EventKind::Network(_) => NETWORK_DEFAULT,
        EventKind::Info(_) => return None,
    };
    Some(template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::events::{ContainerEvent, NetworkEvent, StartupInfo, VolumeEvent};

    fn container() -> EventKind {
        EventKind::Container(ContainerEvent::default())
    }

    fn volume() -> EventKind {
        EventKind::Volume(VolumeEvent::default())
    }

    #[test]
    fn test_container_actions_select_specific_templates() {
        assert_eq!(event_template(&container(), "kill"), Some(CONTAINER_KILL));
        assert_eq!(event_template(&container(), "die"), Some(CONTAINER_DIE));
        assert_eq!(event_template(&container(), "start"), Some(CONTAINER_DEFAULT));
    }

    #[test]
    fn test_volume_falls_back_to_generic_line() {
        assert_eq!(event_template(&volume(), "mount"), Some(VOLUME_MOUNT));
        assert_eq!(event_template(&volume(), "unmount"), Some(VOLUME_UNMOUNT));
        assert_eq!(event_template(&volume(), "destroy"), Some(VOLUME_DEFAULT));
    }

    #[test]
    fn test_action_names_do_not_cross_kinds() {
        // "die" only means something for containers
        assert_eq!(event_template(&volume(), "die"), Some(VOLUME_DEFAULT));
        let network = EventKind::Network(NetworkEvent::default());
        assert_eq!(event_template(&network, "mount"), Some(NETWORK_DEFAULT));
    }

    #[test]
    fn test_info_has_no_event_line() {
        let info = EventKind::Info(StartupInfo::default());
        assert_eq!(event_template(&info, "start"), None);
    }
}
