// ==========================================
// 碳排放数据导入系统 - 管道参数
// ==========================================
// 职责: 置信度阈值 / 检索规模 / 超时 / 模型调用参数
// 说明: 阈值是策略参数，不是推导常量，全部可覆写
// ==========================================

use crate::config::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 模型 API Key 环境变量
pub const ENV_LLM_API_KEY: &str = "EMISSION_LLM_API_KEY";
/// 模型服务地址环境变量
pub const ENV_LLM_BASE_URL: &str = "EMISSION_LLM_BASE_URL";
/// 模型名称环境变量
pub const ENV_LLM_MODEL: &str = "EMISSION_LLM_MODEL";

// ==========================================
// Thresholds - 置信度分层阈值
// ==========================================
// confidence > auto_match        → 自动匹配
// review < confidence ≤ auto_match → 人工复核
// confidence ≤ review             → AI 兜底 / 未匹配
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub auto_match: f64,
    pub review: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            auto_match: 0.8,
            review: 0.5,
        }
    }
}

// ==========================================
// LlmSettings - 生成式模型调用参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            temperature: 0.1,
            max_tokens: 500,
        }
    }
}

impl LlmSettings {
    /// 从环境变量覆写（未设置的保持原值）
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(ENV_LLM_API_KEY) {
            let key = key.trim();
            if !key.is_empty() {
                self.api_key = Some(key.to_string());
            }
        }
        if let Ok(url) = std::env::var(ENV_LLM_BASE_URL) {
            let url = url.trim();
            if !url.is_empty() {
                self.base_url = url.trim_end_matches('/').to_string();
            }
        }
        if let Ok(model) = std::env::var(ENV_LLM_MODEL) {
            let model = model.trim();
            if !model.is_empty() {
                self.model = model.to_string();
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

// ==========================================
// PipelineSettings - 管道全量参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub thresholds: Thresholds,
    pub ai_processing_threshold: f64, // 0 = 禁用 AI 兜底
    pub candidate_limit: usize,       // 模糊匹配候选数
    pub preview_row_limit: usize,     // 预览模式返回行数上限
    pub bulk_concurrency: usize,      // 批量模式并发上限
    pub store_timeout_ms: u64,        // 参考库/缓存调用超时
    pub ai_timeout_ms: u64,           // 模型调用超时
    pub llm: LlmSettings,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            ai_processing_threshold: 0.5,
            candidate_limit: 5,
            preview_row_limit: 50,
            bulk_concurrency: 4,
            store_timeout_ms: 5_000,
            ai_timeout_ms: 30_000,
            llm: LlmSettings::default(),
        }
    }
}

impl PipelineSettings {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn ai_timeout(&self) -> Duration {
        Duration::from_millis(self.ai_timeout_ms)
    }

    /// 参数合法性校验
    pub fn validate(&self) -> Result<(), ConfigError> {
        let in_unit_range = |v: f64| (0.0..=1.0).contains(&v);

        if !in_unit_range(self.thresholds.auto_match) || !in_unit_range(self.thresholds.review) {
            return Err(ConfigError::InvalidValue {
                key: "thresholds".to_string(),
                value: format!("{:?}", self.thresholds),
                message: "阈值必须位于 [0, 1]".to_string(),
            });
        }
        if self.thresholds.review > self.thresholds.auto_match {
            return Err(ConfigError::InvalidValue {
                key: "thresholds".to_string(),
                value: format!("{:?}", self.thresholds),
                message: "复核阈值不能高于自动匹配阈值".to_string(),
            });
        }
        if !in_unit_range(self.ai_processing_threshold) {
            return Err(ConfigError::InvalidValue {
                key: "ai_processing_threshold".to_string(),
                value: self.ai_processing_threshold.to_string(),
                message: "AI 阈值必须位于 [0, 1]".to_string(),
            });
        }
        if self.candidate_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "candidate_limit".to_string(),
                value: "0".to_string(),
                message: "候选数必须大于 0".to_string(),
            });
        }
        if self.bulk_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                key: "bulk_concurrency".to_string(),
                value: "0".to_string(),
                message: "并发上限必须大于 0".to_string(),
            });
        }
        Ok(())
    }
}
