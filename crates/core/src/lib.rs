pub mod config;

pub use config::{AppConfig, ChannelConfig, QueueSettings};
pub use pipeline_errors::{PipelineError, PipelineResult};
