pub mod cache;
pub mod events;
pub mod formatter;
pub mod template;
pub mod templates;

pub use events::{Event, EventKind};
pub use formatter::Formatter;
