pub mod aggregator;
pub mod queue;

pub use aggregator::Aggregator;
pub use queue::EventQueue;
