use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("队列已结束: {queue}")]
    QueueFinished { queue: String },
    #[error("队列为空: {queue}")]
    QueueEmpty { queue: String },
    #[error("队列已满 (容量上限 {capacity})")]
    QueueFull { capacity: usize },
    #[error("队列 {queue} 已配置严格消费者, 操作必须提供消费者名称")]
    ConsumerRequired { queue: String },
    #[error("未注册的消费者: 队列 {queue} 不存在消费者 {consumer}")]
    UnknownConsumer { queue: String, consumer: String },
    #[error("无法结束队列 {queue}: 仍有 {remaining} 个已注册消费者")]
    ConsumersRemain { queue: String, remaining: usize },
    #[error("通道未找到: {0}")]
    ChannelNotFound(String),
    #[error("序列化错误: {0}")]
    Serialization(String),
    #[error("配置错误: {0}")]
    Configuration(String),
    #[error("内部错误: {0}")]
    Internal(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    pub fn queue_finished<S: Into<String>>(queue: S) -> Self {
        Self::QueueFinished {
            queue: queue.into(),
        }
    }
    pub fn queue_empty<S: Into<String>>(queue: S) -> Self {
        Self::QueueEmpty {
            queue: queue.into(),
        }
    }
    pub fn unknown_consumer<S: Into<String>, C: Into<String>>(queue: S, consumer: C) -> Self {
        Self::UnknownConsumer {
            queue: queue.into(),
            consumer: consumer.into(),
        }
    }
    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
    /// 队列生命周期终止信号，迭代协议以此作为正常结束条件
    pub fn is_queue_end(&self) -> bool {
        matches!(
            self,
            PipelineError::QueueFinished { .. } | PipelineError::QueueEmpty { .. }
        )
    }
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PipelineError::QueueEmpty { .. } | PipelineError::QueueFull { .. }
        )
    }
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::Internal(_) | PipelineError::Configuration(_)
        )
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for PipelineError {
    fn from(err: anyhow::Error) -> Self {
        PipelineError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests;
