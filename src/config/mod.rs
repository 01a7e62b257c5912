// ==========================================
// 碳排放数据导入系统 - 配置层
// ==========================================
// 职责: 管道参数管理,支持 config_kv 覆写 + 环境变量
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod error;
pub mod pipeline_config_trait;
pub mod pipeline_settings;

// 重导出
pub use config_manager::{config_keys, ConfigManager};
pub use error::ConfigError;
pub use pipeline_config_trait::PipelineConfigReader;
pub use pipeline_settings::{LlmSettings, PipelineSettings, Thresholds};
