use async_trait::async_trait;
use pipeline_domain::messaging::JobQueue;
use pipeline_errors::{PipelineError, PipelineResult};
use std::collections::VecDeque;
use tokio::sync::Mutex;
use tracing::debug;

/// 内存FIFO队列实现
///
/// 每个队列控制器独占持有一个实例。容量溢出直接拒绝而不是阻塞，
/// 背压处理交给上层调用方。
#[derive(Debug)]
pub struct InMemoryQueue<T> {
    items: Mutex<VecDeque<T>>,
    /// 队列最大容量（0表示无限制）
    capacity: usize,
}

impl<T: Send + 'static> InMemoryQueue<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            capacity,
        }
    }

    fn check_room(&self, queued: usize, incoming: usize) -> PipelineResult<()> {
        if self.capacity > 0 && queued + incoming > self.capacity {
            debug!(
                "queue at capacity ({}/{}), rejecting {} item(s)",
                queued, self.capacity, incoming
            );
            return Err(PipelineError::QueueFull {
                capacity: self.capacity,
            });
        }
        Ok(())
    }
}

impl<T: Send + 'static> Default for InMemoryQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Send + 'static> JobQueue<T> for InMemoryQueue<T> {
    async fn enqueue(&self, item: T) -> PipelineResult<()> {
        let mut items = self.items.lock().await;
        self.check_room(items.len(), 1)?;
        items.push_back(item);
        Ok(())
    }

    async fn enqueue_all(&self, incoming: Vec<T>) -> PipelineResult<()> {
        let mut items = self.items.lock().await;
        self.check_room(items.len(), incoming.len())?;
        items.extend(incoming);
        Ok(())
    }

    async fn dequeue(&self) -> PipelineResult<Option<T>> {
        Ok(self.items.lock().await.pop_front())
    }

    async fn dequeue_up_to(&self, count: usize) -> PipelineResult<Vec<T>> {
        let mut items = self.items.lock().await;
        let take = count.min(items.len());
        Ok(items.drain(..take).collect())
    }

    async fn len(&self) -> usize {
        self.items.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = InMemoryQueue::new();
        queue.enqueue(1).await.unwrap();
        queue.enqueue_all(vec![2, 3]).await.unwrap();

        assert_eq!(queue.len().await, 3);
        assert_eq!(queue.dequeue().await.unwrap(), Some(1));
        assert_eq!(queue.dequeue().await.unwrap(), Some(2));
        assert_eq!(queue.dequeue().await.unwrap(), Some(3));
        assert_eq!(queue.dequeue().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_capacity_rejection() {
        let queue = InMemoryQueue::with_capacity(2);
        queue.enqueue("a").await.unwrap();
        queue.enqueue("b").await.unwrap();

        let err = queue.enqueue("c").await.unwrap_err();
        assert!(matches!(err, PipelineError::QueueFull { capacity: 2 }));

        // Bulk enqueue is all-or-nothing
        let queue = InMemoryQueue::with_capacity(2);
        queue.enqueue("a").await.unwrap();
        assert!(queue.enqueue_all(vec!["b", "c"]).await.is_err());
        assert_eq!(queue.len().await, 1);
    }

    #[tokio::test]
    async fn test_dequeue_up_to() {
        let queue = InMemoryQueue::new();
        queue.enqueue_all(vec![1, 2, 3]).await.unwrap();

        assert_eq!(queue.dequeue_up_to(2).await.unwrap(), vec![1, 2]);
        assert_eq!(queue.dequeue_up_to(5).await.unwrap(), vec![3]);
        assert!(queue.dequeue_up_to(1).await.unwrap().is_empty());
    }
}
