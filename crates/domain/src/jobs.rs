use serde::{Deserialize, Serialize};

/// Capability interface for a schedulable job instance.
///
/// A job declares at most one input queue it consumes from and any number of
/// output queues it produces to. The topology resolver works purely on these
/// declarations, never on runtime queue contents.
pub trait JobInstance: Send + Sync {
    fn name(&self) -> &str;
    fn input_queue(&self) -> Option<&str>;
    fn output_queues(&self) -> &[String];
}

/// Plain value implementation of [`JobInstance`], used by scheduler setup
/// code to declare pipelines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    pub name: String,
    pub input_queue: Option<String>,
    pub output_queues: Vec<String>,
}

impl JobSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input_queue: None,
            output_queues: Vec::new(),
        }
    }

    pub fn with_input(mut self, queue: impl Into<String>) -> Self {
        self.input_queue = Some(queue.into());
        self
    }

    pub fn with_outputs<I, S>(mut self, queues: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_queues = queues.into_iter().map(Into::into).collect();
        self
    }
}

impl JobInstance for JobSpec {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_queue(&self) -> Option<&str> {
        self.input_queue.as_deref()
    }

    fn output_queues(&self) -> &[String] {
        &self.output_queues
    }
}
