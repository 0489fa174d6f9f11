use futures::Stream;
use pipeline_domain::entities::QueueDefinition;
use pipeline_domain::messaging::JobQueue;
use pipeline_errors::{PipelineError, PipelineResult};
use std::collections::HashSet;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 通道生命周期状态
///
/// 数据就绪信号由队列长度派生，结束信号由状态本身表达，
/// 两者不再是独立维护的布尔标志。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// 接受写入
    Open,
    /// finish 已成功但仍有未消费数据，写入被拒绝，读取继续排空
    Draining,
    /// 终止且已排空
    Finished,
}

impl ChannelState {
    /// finish 已经生效，不再接受写入
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ChannelState::Open)
    }
}

/// `wait` 返回的信号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    DataReady,
    Finished,
    TimedOut,
}

/// 队列控制器
///
/// 包装一个底层FIFO队列，提供命名消费者注册（严格消费者校验）、
/// 阻塞等待数据、终止语义和异步迭代。同一控制器可被多个异步任务
/// 并发调用；入队/出队与状态迁移的组合在内部互斥锁下对每个调用方
/// 表现为原子操作。
pub struct QueueController<T: Send + 'static> {
    queue: Arc<dyn JobQueue<T>>,
    definition: QueueDefinition,
    name: String,
    inner: Mutex<ControllerInner>,
    notify: Notify,
}

impl<T: Send + 'static> std::fmt::Debug for QueueController<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueController")
            .field("definition", &self.definition)
            .field("name", &self.name)
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

/// 对返回的流做透明包装，仅为其补上 `Debug`（委托内部流的轮询，行为不变）。
struct DebugStream<'a, T>(Pin<Box<dyn Stream<Item = T> + 'a>>);

impl<'a, T> std::fmt::Debug for DebugStream<'a, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream").finish_non_exhaustive()
    }
}

impl<'a, T> Stream for DebugStream<'a, T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.get_mut().0.as_mut().poll_next(cx)
    }
}

#[derive(Debug)]
struct ControllerInner {
    state: ChannelState,
    consumers: HashSet<String>,
}

impl ControllerInner {
    fn check_consumer(&self, consumer: Option<&str>, queue: &str) -> PipelineResult<()> {
        if self.consumers.is_empty() {
            return Ok(());
        }
        match consumer {
            None => Err(PipelineError::ConsumerRequired {
                queue: queue.to_string(),
            }),
            Some(name) if !self.consumers.contains(name) => {
                Err(PipelineError::unknown_consumer(queue, name))
            }
            Some(_) => Ok(()),
        }
    }
}

impl<T: Send + 'static> QueueController<T> {
    /// 创建控制器。定义中的名称为空时生成唯一名称，
    /// 定义中声明的消费者被预先注册为严格消费者。
    pub fn new(queue: Arc<dyn JobQueue<T>>, definition: QueueDefinition) -> Self {
        let name = if definition.name.is_empty() {
            format!("queue-{}", &Uuid::new_v4().to_string()[..8])
        } else {
            definition.name.clone()
        };
        let consumers: HashSet<String> = definition.consumers.iter().cloned().collect();
        debug!(
            "created queue controller '{}' ({} declared consumer(s))",
            name,
            consumers.len()
        );
        Self {
            queue,
            definition,
            name,
            inner: Mutex::new(ControllerInner {
                state: ChannelState::Open,
                consumers,
            }),
            notify: Notify::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> &QueueDefinition {
        &self.definition
    }

    pub async fn state(&self) -> ChannelState {
        self.inner.lock().await.state
    }

    pub async fn consumer_count(&self) -> usize {
        self.inner.lock().await.consumers.len()
    }

    /// 当前排队元素数量，无任何校验
    pub async fn qsize(&self) -> usize {
        self.queue.len().await
    }

    /// 入队单个元素。终止后的写入被拒绝；配置了严格消费者时
    /// 必须提供已注册的消费者名称。
    pub async fn put(&self, item: T, consumer: Option<&str>) -> PipelineResult<()> {
        let inner = self.inner.lock().await;
        if inner.state.is_terminal() {
            warn!("rejecting put on finished queue '{}'", self.name);
            return Err(PipelineError::queue_finished(&self.name));
        }
        inner.check_consumer(consumer, &self.name)?;
        self.queue.enqueue(item).await?;
        self.notify.notify_waiters();
        Ok(())
    }

    /// 批量入队，作为单次操作执行，校验规则与 `put` 相同
    pub async fn put_iter(&self, items: Vec<T>, consumer: Option<&str>) -> PipelineResult<()> {
        let inner = self.inner.lock().await;
        if inner.state.is_terminal() {
            warn!("rejecting bulk put on finished queue '{}'", self.name);
            return Err(PipelineError::queue_finished(&self.name));
        }
        inner.check_consumer(consumer, &self.name)?;
        self.queue.enqueue_all(items).await?;
        self.notify.notify_waiters();
        Ok(())
    }

    /// 出队单个元素。
    ///
    /// `wait = true` 时挂起直到数据可用或队列结束；终止且排空的
    /// 队列返回 `QueueFinished`，未结束的空队列在 `wait = false`
    /// 时返回 `QueueEmpty`。
    pub async fn get(&self, consumer: Option<&str>, wait: bool) -> PipelineResult<T> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut inner = self.inner.lock().await;
                inner.check_consumer(consumer, &self.name)?;

                if let Some(item) = self.queue.dequeue().await? {
                    if inner.state == ChannelState::Draining && self.queue.len().await == 0 {
                        inner.state = ChannelState::Finished;
                        self.notify.notify_waiters();
                    }
                    return Ok(item);
                }

                match inner.state {
                    ChannelState::Open => {
                        if !wait {
                            return Err(PipelineError::queue_empty(&self.name));
                        }
                    }
                    ChannelState::Draining | ChannelState::Finished => {
                        inner.state = ChannelState::Finished;
                        return Err(PipelineError::queue_finished(&self.name));
                    }
                }
            }
            notified.await;
        }
    }

    /// 批量出队最多 `count` 个元素。
    ///
    /// 终止且排空的队列返回 `QueueEmpty` 信号，迭代协议以此作为
    /// 正常结束条件；未结束的空队列返回空集合。
    pub async fn get_iter(&self, count: usize, consumer: Option<&str>) -> PipelineResult<Vec<T>> {
        let mut inner = self.inner.lock().await;
        inner.check_consumer(consumer, &self.name)?;

        let items = self.queue.dequeue_up_to(count).await?;
        if items.is_empty() && inner.state.is_terminal() {
            inner.state = ChannelState::Finished;
            return Err(PipelineError::queue_empty(&self.name));
        }
        if inner.state == ChannelState::Draining && self.queue.len().await == 0 {
            inner.state = ChannelState::Finished;
            self.notify.notify_waiters();
        }
        debug!(
            "dequeued {} item(s) from queue '{}'",
            items.len(),
            self.name
        );
        Ok(items)
    }

    /// 惰性异步序列，内部重复执行阻塞式 `get` 直到队列结束。
    ///
    /// 序列自然终止，不向调用方抛出结束信号。每次调用产生新的序列，
    /// 中途丢弃后再次调用会从当前队首继续。`consumer` 为 None 即
    /// 普通迭代协议，不携带消费者身份，因此在配置了严格消费者时
    /// 被拒绝。
    pub async fn stream(
        &self,
        consumer: Option<&str>,
    ) -> PipelineResult<impl Stream<Item = T> + std::fmt::Debug + '_> {
        {
            let inner = self.inner.lock().await;
            inner.check_consumer(consumer, &self.name)?;
        }
        let consumer = consumer.map(str::to_string);
        Ok(DebugStream(Box::pin(futures::stream::unfold(
            consumer,
            move |consumer| async move {
                match self.get(consumer.as_deref(), true).await {
                    Ok(item) => Some((item, consumer)),
                    Err(err) => {
                        if !err.is_queue_end() {
                            warn!("stream on queue '{}' terminated: {}", self.name, err);
                        }
                        None
                    }
                }
            },
        ))))
    }

    /// 注册严格消费者，集合语义天然幂等
    pub async fn register(&self, consumer: impl Into<String>) {
        let consumer = consumer.into();
        let mut inner = self.inner.lock().await;
        if inner.consumers.insert(consumer.clone()) {
            debug!(
                "registered consumer '{}' on queue '{}'",
                consumer, self.name
            );
        }
    }

    /// 注销严格消费者，不存在时静默返回
    pub async fn unregister(&self, consumer: &str) {
        let mut inner = self.inner.lock().await;
        if inner.consumers.remove(consumer) {
            debug!(
                "unregistered consumer '{}' from queue '{}'",
                consumer, self.name
            );
        }
    }

    /// 结束队列（不可逆）。
    ///
    /// 配置了严格消费者时调用方必须是成员；只有最后一个消费者
    /// 允许结束，它在结束时被注销。已终止的队列上重复调用为幂等
    /// 空操作。
    pub async fn finish(&self, consumer: Option<&str>) -> PipelineResult<()> {
        let mut inner = self.inner.lock().await;
        if !inner.consumers.is_empty() {
            let name = consumer.ok_or_else(|| PipelineError::ConsumerRequired {
                queue: self.name.clone(),
            })?;
            if !inner.consumers.contains(name) {
                return Err(PipelineError::unknown_consumer(&self.name, name));
            }
            if inner.consumers.len() > 1 {
                return Err(PipelineError::ConsumersRemain {
                    queue: self.name.clone(),
                    remaining: inner.consumers.len() - 1,
                });
            }
            inner.consumers.remove(name);
            debug!(
                "last consumer '{}' unregistered by finish on queue '{}'",
                name, self.name
            );
        }

        if inner.state == ChannelState::Open {
            let pending = self.queue.len().await;
            inner.state = if pending == 0 {
                ChannelState::Finished
            } else {
                ChannelState::Draining
            };
            info!(
                "queue '{}' finished ({} item(s) left to drain)",
                self.name, pending
            );
        }
        self.notify.notify_waiters();
        Ok(())
    }

    /// 挂起直到数据就绪或队列结束。两个信号同时成立时优先报告
    /// 数据就绪。超时不是错误，返回 `TimedOut` 后可以重试。
    pub async fn wait(&self, timeout: Option<Duration>) -> WaitOutcome {
        match timeout {
            None => self.wait_signal().await,
            Some(duration) => tokio::time::timeout(duration, self.wait_signal())
                .await
                .unwrap_or(WaitOutcome::TimedOut),
        }
    }

    async fn wait_signal(&self) -> WaitOutcome {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let inner = self.inner.lock().await;
                if self.queue.len().await > 0 {
                    return WaitOutcome::DataReady;
                }
                if inner.state.is_terminal() {
                    return WaitOutcome::Finished;
                }
            }
            notified.await;
        }
    }
}
