// ==========================================
// 碳排放数据导入系统 - 生成式模型层
// ==========================================
// 职责: 定义文本补全接口 + OpenAI 兼容实现
// 红线: 不解析业务 JSON，不写缓存（由 AiClassifier 负责）
// ==========================================

pub mod error;
pub mod openai_client;

pub use error::{LlmError, LlmResult};
pub use openai_client::OpenAiCompatibleClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ==========================================
// CompletionRequest - 单次补全请求
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

// ==========================================
// GenerativeModel Trait
// ==========================================
// 实现者: OpenAiCompatibleClient、DisabledModel、测试桩
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// 返回模型输出的原始文本
    async fn complete(&self, request: &CompletionRequest) -> LlmResult<String>;
}

/// 未配置 API Key 时使用，每次调用都返回 NotConfigured
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledModel;

#[async_trait]
impl GenerativeModel for DisabledModel {
    async fn complete(&self, _request: &CompletionRequest) -> LlmResult<String> {
        Err(LlmError::NotConfigured(
            "未设置 EMISSION_LLM_API_KEY".to_string(),
        ))
    }
}
