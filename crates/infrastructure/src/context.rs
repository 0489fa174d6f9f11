use pipeline_core::{AppConfig, ChannelConfig};
use pipeline_domain::entities::{Message, QueueDefinition};
use pipeline_errors::{PipelineError, PipelineResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::queue_controller::{QueueController, WaitOutcome};
use crate::queue_factory::QueueFactory;

/// 调度器上下文
///
/// 显式持有配置、队列工厂和存活的通道控制器，取代进程级全局注册表。
/// 依赖全部通过构造函数注入，生命周期由 `init`/`teardown` 界定。
pub struct SchedulerContext {
    config: AppConfig,
    factory: Arc<dyn QueueFactory<Message>>,
    channels: RwLock<HashMap<String, Arc<QueueController<Message>>>>,
    initialized: AtomicBool,
}

impl SchedulerContext {
    pub fn new(config: AppConfig, factory: Arc<dyn QueueFactory<Message>>) -> Self {
        Self {
            config,
            factory,
            channels: RwLock::new(HashMap::new()),
            initialized: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// 按配置创建所有声明的通道。重复初始化是配置错误。
    pub async fn init(&self) -> PipelineResult<()> {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return Err(PipelineError::config_error(
                "scheduler context already initialized",
            ));
        }
        for channel in &self.config.channels {
            self.create_channel(Self::definition_from(channel)).await?;
        }
        info!(
            "scheduler context initialized with {} channel(s)",
            self.config.channels.len()
        );
        Ok(())
    }

    /// 动态创建通道，名称冲突被拒绝
    pub async fn create_channel(
        &self,
        definition: QueueDefinition,
    ) -> PipelineResult<Arc<QueueController<Message>>> {
        let mut channels = self.channels.write().await;
        if !definition.name.is_empty() && channels.contains_key(&definition.name) {
            return Err(PipelineError::config_error(format!(
                "channel '{}' already exists",
                definition.name
            )));
        }
        let queue = self.factory.create(&definition).await?;
        let controller = Arc::new(QueueController::new(queue, definition));
        channels.insert(controller.name().to_string(), Arc::clone(&controller));
        debug!("channel '{}' created", controller.name());
        Ok(controller)
    }

    pub async fn channel(&self, name: &str) -> PipelineResult<Arc<QueueController<Message>>> {
        self.channels
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| PipelineError::ChannelNotFound(name.to_string()))
    }

    /// 使用配置的默认超时等待通道信号
    pub async fn wait_channel(&self, name: &str) -> PipelineResult<WaitOutcome> {
        let controller = self.channel(name).await?;
        let timeout = Duration::from_millis(self.config.queue.wait_timeout_ms);
        Ok(controller.wait(Some(timeout)).await)
    }

    pub async fn channel_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.channels.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// 结束并释放所有通道。
    ///
    /// 仍有严格消费者注册的通道无法在这里结束，随最后一个持有者
    /// 释放；这里只记录并继续。
    pub async fn teardown(&self) {
        let mut channels = self.channels.write().await;
        for (name, controller) in channels.drain() {
            if let Err(err) = controller.finish(None).await {
                debug!("channel '{}' not finished during teardown: {}", name, err);
            }
        }
        info!("scheduler context torn down");
    }

    fn definition_from(channel: &ChannelConfig) -> QueueDefinition {
        let mut definition = QueueDefinition::new(&channel.name)
            .with_consumers(channel.consumers.iter().cloned());
        definition.capacity = channel.capacity;
        definition.meta = channel.meta.clone();
        definition
    }
}
