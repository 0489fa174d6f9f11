use async_trait::async_trait;
use pipeline_core::QueueSettings;
use pipeline_domain::entities::QueueDefinition;
use pipeline_domain::messaging::JobQueue;
use pipeline_errors::PipelineResult;
use std::sync::Arc;
use tracing::debug;

use crate::queue::InMemoryQueue;

/// 为通道定义构建底层队列的注入接口
#[async_trait]
pub trait QueueFactory<T: Send + 'static>: Send + Sync {
    async fn create(&self, definition: &QueueDefinition) -> PipelineResult<Arc<dyn JobQueue<T>>>;
}

pub struct InMemoryQueueFactory {
    settings: QueueSettings,
}

impl InMemoryQueueFactory {
    pub fn new(settings: QueueSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl<T: Send + 'static> QueueFactory<T> for InMemoryQueueFactory {
    async fn create(&self, definition: &QueueDefinition) -> PipelineResult<Arc<dyn JobQueue<T>>> {
        let capacity = definition.capacity.unwrap_or(self.settings.default_capacity);
        debug!(
            "creating in-memory queue for channel '{}' (capacity: {})",
            definition.name, capacity
        );
        Ok(Arc::new(InMemoryQueue::with_capacity(capacity)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_capacity_overrides_default() {
        let factory = InMemoryQueueFactory::new(QueueSettings {
            default_capacity: 2,
            ..Default::default()
        });

        let queue: Arc<dyn JobQueue<i32>> = factory
            .create(&QueueDefinition::new("small"))
            .await
            .unwrap();
        queue.enqueue(1).await.unwrap();
        queue.enqueue(2).await.unwrap();
        assert!(queue.enqueue(3).await.is_err());

        let queue: Arc<dyn JobQueue<i32>> = factory
            .create(&QueueDefinition::new("wide").with_capacity(3))
            .await
            .unwrap();
        queue.enqueue_all(vec![1, 2, 3]).await.unwrap();
        assert!(queue.enqueue(4).await.is_err());
    }
}
