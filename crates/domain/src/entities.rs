use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// 逻辑通道定义
///
/// 描述一条队列通道的静态属性：名称、容量、预先声明的严格消费者
/// 以及自由格式的元数据。调度器在装配阶段为每个定义创建一个队列控制器。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueDefinition {
    pub name: String,
    /// 队列最大容量（None 表示使用全局默认值）
    pub capacity: Option<usize>,
    /// 预先声明的严格消费者；为空时通道不做消费者身份校验
    pub consumers: Vec<String>,
    pub meta: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl QueueDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capacity: None,
            consumers: Vec::new(),
            meta: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn with_consumers<I, S>(mut self, consumers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.consumers = consumers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Option<String>,
}

impl Message {
    pub fn new(payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            payload,
            timestamp: Utc::now(),
            correlation_id: None,
        }
    }

    pub fn with_correlation(payload: serde_json::Value, correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: Some(correlation_id.into()),
            ..Self::new(payload)
        }
    }
}
