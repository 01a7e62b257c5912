// ==========================================
// 碳排放数据导入系统 - 管道配置读取 Trait
// ==========================================
// 职责: 定义导入管道所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::error::ConfigError;
use crate::config::pipeline_settings::PipelineSettings;
use async_trait::async_trait;

// ==========================================
// PipelineConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）、PipelineSettings（静态配置）
#[async_trait]
pub trait PipelineConfigReader: Send + Sync {
    /// 读取完整管道参数（未配置项取默认值）
    async fn load_settings(&self) -> Result<PipelineSettings, ConfigError>;

    /// AI 兜底阈值（0 表示禁用）
    ///
    /// # 默认值
    /// - 0.5
    async fn get_ai_processing_threshold(&self) -> Result<f64, ConfigError> {
        Ok(self.load_settings().await?.ai_processing_threshold)
    }
}

#[async_trait]
impl PipelineConfigReader for PipelineSettings {
    async fn load_settings(&self) -> Result<PipelineSettings, ConfigError> {
        Ok(self.clone())
    }
}
