// ==========================================
// 碳排放数据导入系统 - AI 兜底分类引擎
// ==========================================
// 职责: 物料库无法匹配时，调用生成式模型给出分类
// 流程: 缓存查询 → 构造提示词 → 模型调用 → JSON 提取 → 写缓存
// 红线: 永不向上抛错；任何失败返回 confidence = 0.1 的兜底结果
// 红线: 兜底结果不写缓存
// ==========================================

use crate::config::PipelineSettings;
use crate::domain::material::{
    normalize_description, AiClassificationResult, ClassificationOutcome,
};
use crate::llm::{CompletionRequest, GenerativeModel};
use crate::repository::classification_cache_repo::ClassificationCache;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// 兜底结果置信度
pub const FALLBACK_CONFIDENCE: f64 = 0.1;
/// 兜底类别
pub const FALLBACK_CATEGORY: &str = "Uncategorized";
/// 调用方未提供单位时的兜底单位
pub const FALLBACK_UNIT: &str = "unit";

const SYSTEM_PROMPT: &str = "You are a carbon accounting assistant. \
Classify activity or material descriptions into emission categories and \
respond with a single JSON object only.";

pub struct AiClassifier {
    model: Arc<dyn GenerativeModel>,
    cache: Arc<dyn ClassificationCache>,
    settings: PipelineSettings,
}

impl AiClassifier {
    pub fn new(
        model: Arc<dyn GenerativeModel>,
        cache: Arc<dyn ClassificationCache>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            model,
            cache,
            settings,
        }
    }

    /// 分类（不返回过程信息）
    pub async fn process_material(
        &self,
        description: &str,
        quantity: Option<f64>,
        unit: Option<&str>,
    ) -> AiClassificationResult {
        self.classify(description, quantity, unit).await.0
    }

    /// 分类并返回过程结果（缓存命中 / 模型分类 / 降级）
    #[instrument(skip(self, quantity, unit))]
    pub async fn classify(
        &self,
        description: &str,
        quantity: Option<f64>,
        unit: Option<&str>,
    ) -> (AiClassificationResult, ClassificationOutcome) {
        let cache_key = normalize_description(description);
        let store_timeout = self.settings.store_timeout();

        match timeout(store_timeout, self.cache.get(&cache_key)).await {
            Ok(Ok(Some(cached))) => {
                debug!(cache_key = %cache_key, "AI 分类缓存命中");
                return (cached, ClassificationOutcome::CacheHit);
            }
            Ok(Ok(None)) => {}
            // 缓存不可用时继续调用模型
            Ok(Err(e)) => warn!(error = %e, "AI 分类缓存读取失败"),
            Err(_) => warn!("AI 分类缓存读取超时"),
        }

        let request = CompletionRequest {
            prompt: build_prompt(description, quantity, unit),
            system_prompt: Some(SYSTEM_PROMPT.to_string()),
            temperature: self.settings.llm.temperature,
            max_tokens: self.settings.llm.max_tokens,
        };

        let raw = match timeout(self.settings.ai_timeout(), self.model.complete(&request)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                warn!(error = %e, "模型调用失败，返回兜底分类");
                return degraded(description, unit, format!("模型调用失败: {}", e));
            }
            Err(_) => {
                warn!(timeout_ms = self.settings.ai_timeout_ms, "模型调用超时，返回兜底分类");
                return degraded(description, unit, "模型调用超时".to_string());
            }
        };

        let result = match parse_classification(&raw) {
            Ok(result) => result,
            Err(reason) => {
                warn!(reason = %reason, "模型输出无法解析，返回兜底分类");
                return degraded(description, unit, reason);
            }
        };

        match timeout(store_timeout, self.cache.upsert(&cache_key, &result, Utc::now())).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "AI 分类缓存写入失败"),
            Err(_) => warn!("AI 分类缓存写入超时"),
        }

        info!(
            material_name = %result.material_name,
            category = %result.category,
            confidence = result.confidence,
            "AI 分类完成"
        );
        (result, ClassificationOutcome::Classified)
    }
}

/// 兜底结果: 名称沿用原描述，单位沿用调用方单位
pub fn fallback_result(description: &str, unit: Option<&str>) -> AiClassificationResult {
    let unit = unit
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .unwrap_or(FALLBACK_UNIT);

    AiClassificationResult {
        id: new_result_id(),
        material_name: description.to_string(),
        category: FALLBACK_CATEGORY.to_string(),
        standard_unit: unit.to_string(),
        emission_factor: 0.0,
        confidence: FALLBACK_CONFIDENCE,
    }
}

fn degraded(
    description: &str,
    unit: Option<&str>,
    reason: String,
) -> (AiClassificationResult, ClassificationOutcome) {
    (
        fallback_result(description, unit),
        ClassificationOutcome::Degraded(reason),
    )
}

fn new_result_id() -> String {
    format!("ai-{}", Uuid::new_v4())
}

/// 构造分类提示词
pub fn build_prompt(description: &str, quantity: Option<f64>, unit: Option<&str>) -> String {
    let quantity = quantity
        .map(|q| q.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let unit = unit
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .unwrap_or("unknown");

    format!(
        "Classify the following item for carbon emission accounting.\n\
         Description: {description}\n\
         Quantity: {quantity}\n\
         Unit: {unit}\n\n\
         Respond with JSON using exactly these fields:\n\
         {{\"material_name\": string, \"category\": string, \"standard_unit\": string, \
         \"emission_factor\": number (kgCO2e per standard unit), \
         \"confidence\": number between 0 and 1}}"
    )
}

/// 定位第一个配平的 `{...}` 片段（跳过字符串内的括号）
pub fn extract_json_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// 解析模型输出为分类结果
///
/// 数值字段同时接受数字和数字字符串
pub fn parse_classification(raw: &str) -> Result<AiClassificationResult, String> {
    let block = extract_json_block(raw).ok_or_else(|| "模型输出中没有 JSON 对象".to_string())?;
    let value: Value =
        serde_json::from_str(block).map_err(|e| format!("模型输出 JSON 解析失败: {}", e))?;

    let material_name = required_text(&value, "material_name")?;
    let category = required_text(&value, "category")?;
    let standard_unit = required_text(&value, "standard_unit")?;
    let emission_factor = required_number(&value, "emission_factor")?;
    let confidence = required_number(&value, "confidence")?.clamp(0.0, 1.0);

    Ok(AiClassificationResult {
        id: new_result_id(),
        material_name,
        category,
        standard_unit,
        emission_factor,
        confidence,
    })
}

fn required_text(value: &Value, field: &str) -> Result<String, String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| format!("缺少字段 {}", field))
}

fn required_number(value: &Value, field: &str) -> Result<f64, String> {
    let number = match value.get(field) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number
        .filter(|n| n.is_finite())
        .ok_or_else(|| format!("字段 {} 不是有效数值", field))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_block_skips_prose_and_string_braces() {
        let raw = r#"Sure! {"material_name": "Steel {rebar}", "x": {"y": 1}} trailing }"#;
        assert_eq!(
            extract_json_block(raw),
            Some(r#"{"material_name": "Steel {rebar}", "x": {"y": 1}}"#)
        );
        assert_eq!(extract_json_block("no json here"), None);
        assert_eq!(extract_json_block("{ unbalanced"), None);
    }

    #[test]
    fn test_extract_json_block_handles_escaped_quote() {
        let raw = r#"{"material_name": "6\" pipe }"}"#;
        assert_eq!(extract_json_block(raw), Some(raw));
    }

    #[test]
    fn test_parse_classification_accepts_numeric_strings() {
        let raw = "```json\n{\"material_name\":\"Cement\",\"category\":\"Materials\",\
                   \"standard_unit\":\"kg\",\"emission_factor\":\"0.9\",\"confidence\":1.4}\n```";
        let result = parse_classification(raw).unwrap();
        assert_eq!(result.material_name, "Cement");
        assert_eq!(result.emission_factor, 0.9);
        assert_eq!(result.confidence, 1.0);
        assert!(result.id.starts_with("ai-"));
    }

    #[test]
    fn test_parse_classification_missing_field() {
        let raw = r#"{"material_name":"Cement","category":"Materials","standard_unit":"kg"}"#;
        assert!(parse_classification(raw).is_err());
    }

    #[test]
    fn test_fallback_result() {
        let result = fallback_result("mystery widget", None);
        assert_eq!(result.material_name, "mystery widget");
        assert_eq!(result.standard_unit, "unit");
        assert_eq!(result.category, "Uncategorized");
        assert_eq!(result.emission_factor, 0.0);
        assert_eq!(result.confidence, 0.1);

        assert_eq!(fallback_result("x", Some(" kg ")).standard_unit, "kg");
    }

    #[test]
    fn test_build_prompt_mentions_inputs() {
        let prompt = build_prompt("Recycled paper", Some(12.5), Some("kg"));
        assert!(prompt.contains("Recycled paper"));
        assert!(prompt.contains("12.5"));
        assert!(prompt.contains("Unit: kg"));
    }
}
