use async_trait::async_trait;
use pipeline_errors::PipelineResult;

/// 队列控制器独占持有的底层FIFO存储接口
#[async_trait]
pub trait JobQueue<T: Send + 'static>: Send + Sync {
    /// 入队单个元素
    async fn enqueue(&self, item: T) -> PipelineResult<()>;

    /// 批量入队，作为单次操作执行
    async fn enqueue_all(&self, items: Vec<T>) -> PipelineResult<()>;

    /// 出队单个元素，队列为空时返回 None
    async fn dequeue(&self) -> PipelineResult<Option<T>>;

    /// 批量出队最多 count 个元素
    async fn dequeue_up_to(&self, count: usize) -> PipelineResult<Vec<T>>;

    /// 当前排队元素数量
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
