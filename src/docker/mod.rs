pub mod client;
pub mod watcher;

pub use watcher::watch;
