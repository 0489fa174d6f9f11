use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use pipeline_errors::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// System configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub queue: QueueSettings,
    pub channels: Vec<ChannelConfig>,
}

/// Queue-wide defaults applied to channels that do not override them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    /// 队列最大容量（0表示无限制）
    pub default_capacity: usize,
    /// 等待数据的默认超时时间（毫秒）
    pub wait_timeout_ms: u64,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            default_capacity: 10000, // 默认最大10000条消息
            wait_timeout_ms: 5000,   // 5秒等待超时
        }
    }
}

/// One declared channel the scheduler context creates at init time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub name: String,
    /// 通道容量，未设置时使用 queue.default_capacity
    pub capacity: Option<usize>,
    /// 预先声明的严格消费者
    pub consumers: Vec<String>,
    pub meta: HashMap<String, String>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            capacity: None,
            consumers: Vec::new(),
            meta: HashMap::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from config file and environment variables
    ///
    /// Load order:
    /// 1. Default configuration
    /// 2. Config file (TOML format)
    /// 3. Environment variable overrides (prefix: PIPELINE_)
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
        } else {
            let default_paths = ["config/pipeline.toml", "pipeline.toml"];
            for path in &default_paths {
                if Path::new(path).exists() {
                    builder = builder.add_source(File::new(path, FileFormat::Toml));
                    break;
                }
            }
        }

        // Environment variable overrides (prefix: PIPELINE_) - highest priority
        builder = builder.add_source(
            Environment::with_prefix("PIPELINE")
                .separator("_")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("解析TOML配置失败")?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置为TOML失败")
    }

    pub fn validate(&self) -> PipelineResult<()> {
        self.queue.validate()?;

        let mut seen: HashSet<&str> = HashSet::new();
        for channel in &self.channels {
            channel.validate()?;
            if !seen.insert(channel.name.as_str()) {
                return Err(PipelineError::config_error(format!(
                    "duplicate channel name: {}",
                    channel.name
                )));
            }
        }

        Ok(())
    }
}

impl QueueSettings {
    pub fn validate(&self) -> PipelineResult<()> {
        if self.wait_timeout_ms == 0 {
            return Err(PipelineError::config_error(
                "queue.wait_timeout_ms must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl ChannelConfig {
    pub fn validate(&self) -> PipelineResult<()> {
        if self.name.trim().is_empty() {
            return Err(PipelineError::config_error("channel name must not be empty"));
        }
        if self.capacity == Some(0) {
            return Err(PipelineError::config_error(format!(
                "channel '{}' capacity must be greater than 0 when set",
                self.name
            )));
        }
        for consumer in &self.consumers {
            if consumer.trim().is_empty() {
                return Err(PipelineError::config_error(format!(
                    "channel '{}' declares an empty consumer name",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.queue.default_capacity, 10000);
        assert_eq!(config.queue.wait_timeout_ms, 5000);
        assert!(config.channels.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml() {
        let config = AppConfig::from_toml(
            r#"
            [queue]
            default_capacity = 128

            [[channels]]
            name = "tasks"
            consumers = ["worker-a", "worker-b"]

            [[channels]]
            name = "results"
            capacity = 16
            "#,
        )
        .unwrap();

        assert_eq!(config.queue.default_capacity, 128);
        assert_eq!(config.queue.wait_timeout_ms, 5000);
        assert_eq!(config.channels.len(), 2);
        assert_eq!(config.channels[0].name, "tasks");
        assert_eq!(config.channels[0].consumers.len(), 2);
        assert_eq!(config.channels[1].capacity, Some(16));
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = AppConfig::default();
        config.channels.push(ChannelConfig {
            name: "tasks".to_string(),
            capacity: Some(32),
            consumers: vec!["w1".to_string()],
            meta: HashMap::new(),
        });

        let rendered = config.to_toml().unwrap();
        let parsed = AppConfig::from_toml(&rendered).unwrap();
        assert_eq!(parsed.channels.len(), 1);
        assert_eq!(parsed.channels[0].capacity, Some(32));
    }

    #[test]
    fn test_validation_rejects_bad_channels() {
        let mut config = AppConfig::default();
        config.channels.push(ChannelConfig {
            name: "".to_string(),
            ..Default::default()
        });
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.channels.push(ChannelConfig {
            name: "tasks".to_string(),
            capacity: Some(0),
            ..Default::default()
        });
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.channels.push(ChannelConfig {
            name: "tasks".to_string(),
            ..Default::default()
        });
        config.channels.push(ChannelConfig {
            name: "tasks".to_string(),
            ..Default::default()
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            r#"
            [queue]
            default_capacity = 77

            [[channels]]
            name = "events"
            "#
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path().to_str().unwrap())).unwrap();
        assert_eq!(config.queue.default_capacity, 77);
        assert_eq!(config.channels.len(), 1);
        assert_eq!(config.channels[0].name, "events");
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(AppConfig::load(Some("/nonexistent/pipeline.toml")).is_err());
    }
}
