use crate::*;

#[test]
fn test_pipeline_error_display() {
    let finished = PipelineError::queue_finished("tasks");
    assert_eq!(finished.to_string(), "队列已结束: tasks");

    let empty = PipelineError::queue_empty("tasks");
    assert_eq!(empty.to_string(), "队列为空: tasks");

    let full = PipelineError::QueueFull { capacity: 16 };
    assert_eq!(full.to_string(), "队列已满 (容量上限 16)");

    let unknown = PipelineError::unknown_consumer("tasks", "ghost");
    assert_eq!(unknown.to_string(), "未注册的消费者: 队列 tasks 不存在消费者 ghost");

    let remain = PipelineError::ConsumersRemain {
        queue: "tasks".to_string(),
        remaining: 2,
    };
    assert_eq!(remain.to_string(), "无法结束队列 tasks: 仍有 2 个已注册消费者");

    let not_found = PipelineError::ChannelNotFound("events".to_string());
    assert_eq!(not_found.to_string(), "通道未找到: events");

    let config = PipelineError::config_error("missing channel name");
    assert_eq!(config.to_string(), "配置错误: missing channel name");
}

#[test]
fn test_error_classification() {
    assert!(PipelineError::queue_finished("q").is_queue_end());
    assert!(PipelineError::queue_empty("q").is_queue_end());
    assert!(!PipelineError::internal("boom").is_queue_end());

    assert!(PipelineError::queue_empty("q").is_retryable());
    assert!(PipelineError::QueueFull { capacity: 1 }.is_retryable());
    assert!(!PipelineError::queue_finished("q").is_retryable());

    assert!(PipelineError::internal("boom").is_fatal());
    assert!(PipelineError::config_error("bad").is_fatal());
    assert!(!PipelineError::unknown_consumer("q", "c").is_fatal());
}

#[test]
fn test_from_serde_json_error() {
    let json_err = serde_json::from_str::<serde_json::Value>("{invalid").unwrap_err();
    let err: PipelineError = json_err.into();
    assert!(matches!(err, PipelineError::Serialization(_)));
}

#[test]
fn test_from_anyhow_error() {
    let err: PipelineError = anyhow::anyhow!("unexpected").into();
    assert!(matches!(err, PipelineError::Internal(_)));
    assert_eq!(err.to_string(), "内部错误: unexpected");
}
