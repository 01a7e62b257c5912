// ==========================================
// 碳排放数据导入系统 - 生成式模型错误类型
// ==========================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("模型未配置: {0}")]
    NotConfigured(String),

    #[error("模型请求失败: {0}")]
    Request(String),

    #[error("模型服务返回错误 {status}: {body}")]
    Api { status: u16, body: String },

    #[error("模型响应格式错误: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Request(err.to_string())
    }
}

/// Result 类型别名
pub type LlmResult<T> = Result<T, LlmError>;
