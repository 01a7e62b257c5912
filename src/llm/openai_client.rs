// ==========================================
// 碳排放数据导入系统 - OpenAI 兼容补全客户端
// ==========================================
// 协议: POST {base_url}/chat/completions, Bearer 认证
// 输出: choices[0].message.content
// ==========================================

use crate::config::LlmSettings;
use crate::llm::error::{LlmError, LlmResult};
use crate::llm::{CompletionRequest, GenerativeModel};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Debug)]
pub struct OpenAiCompatibleClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl OpenAiCompatibleClient {
    /// 创建客户端
    ///
    /// # 错误
    /// - 未配置 api_key 时返回 NotConfigured
    pub fn new(settings: &LlmSettings, timeout: Duration) -> LlmResult<Self> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| LlmError::NotConfigured("缺少 API Key".to_string()))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Request(format!("HTTP 客户端创建失败: {}", e)))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key,
        })
    }

    fn build_body(&self, request: &CompletionRequest) -> Value {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system_prompt {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": request.prompt }));

        json!({
            "model": self.model,
            "messages": messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        })
    }
}

/// 提取 choices[0].message.content
pub(crate) fn extract_content(response: &Value) -> LlmResult<String> {
    response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
        .map(str::to_string)
        .ok_or_else(|| LlmError::InvalidResponse("缺少 choices[0].message.content".to_string()))
}

#[async_trait]
impl GenerativeModel for OpenAiCompatibleClient {
    #[instrument(skip(self, request), fields(model = %self.model))]
    async fn complete(&self, request: &CompletionRequest) -> LlmResult<String> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(url = %url, "发送模型补全请求");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.build_body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        extract_content(&payload)
    }
}
