pub mod entities;
pub mod jobs;
pub mod messaging;
pub mod topology;

pub use entities::*;
pub use jobs::*;
pub use messaging::*;
pub use pipeline_errors::{PipelineError, PipelineResult};
pub use topology::*;
