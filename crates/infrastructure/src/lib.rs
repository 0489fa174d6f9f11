pub mod context;
pub mod observability;
pub mod queue;
pub mod queue_controller;
pub mod queue_factory;

pub use context::SchedulerContext;
pub use observability::init_logging;
pub use queue::InMemoryQueue;
pub use queue_controller::{ChannelState, QueueController, WaitOutcome};
pub use queue_factory::{InMemoryQueueFactory, QueueFactory};
