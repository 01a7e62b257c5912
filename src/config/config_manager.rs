// ==========================================
// 碳排放数据导入系统 - 配置管理器
// ==========================================
// 职责: 管道配置加载、查询、覆写
// 存储: config_kv 表 (scope_id = 'global')
// ==========================================

use crate::config::error::ConfigError;
use crate::config::pipeline_config_trait::PipelineConfigReader;
use crate::config::pipeline_settings::PipelineSettings;
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// 配置键
pub mod config_keys {
    pub const AUTO_MATCH_THRESHOLD: &str = "pipeline/auto_match_threshold";
    pub const REVIEW_THRESHOLD: &str = "pipeline/review_threshold";
    pub const AI_PROCESSING_THRESHOLD: &str = "pipeline/ai_processing_threshold";
    pub const CANDIDATE_LIMIT: &str = "pipeline/candidate_limit";
    pub const PREVIEW_ROW_LIMIT: &str = "pipeline/preview_row_limit";
    pub const BULK_CONCURRENCY: &str = "pipeline/bulk_concurrency";
    pub const STORE_TIMEOUT_MS: &str = "pipeline/store_timeout_ms";
    pub const AI_TIMEOUT_MS: &str = "pipeline/ai_timeout_ms";
    pub const LLM_BASE_URL: &str = "llm/base_url";
    pub const LLM_MODEL: &str = "llm/model";
    pub const LLM_TEMPERATURE: &str = "llm/temperature";
    pub const LLM_MAX_TOKENS: &str = "llm/max_tokens";
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, ConfigError> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    pub fn get_config_value(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ConfigError::LockError(e.to_string()))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(value)
    }

    /// 写入配置值（scope_id='global'）
    pub fn set_config_value(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ConfigError::LockError(e.to_string()))?;

        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES ('global', ?1, ?2, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// 读取全部 global 配置
    pub fn get_all_values(&self) -> Result<HashMap<String, String>, ConfigError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ConfigError::LockError(e.to_string()))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut values = HashMap::new();
        for row in rows {
            let (key, value) = row?;
            values.insert(key, value);
        }
        Ok(values)
    }
}

/// 解析配置值，格式错误时返回 InvalidValue
fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
            message: e.to_string(),
        })
}

/// 在默认参数上应用 config_kv 覆写
fn apply_overrides(
    mut settings: PipelineSettings,
    values: &HashMap<String, String>,
) -> Result<PipelineSettings, ConfigError> {
    use config_keys::*;

    for (key, raw) in values {
        match key.as_str() {
            AUTO_MATCH_THRESHOLD => settings.thresholds.auto_match = parse_value(key, raw)?,
            REVIEW_THRESHOLD => settings.thresholds.review = parse_value(key, raw)?,
            AI_PROCESSING_THRESHOLD => settings.ai_processing_threshold = parse_value(key, raw)?,
            CANDIDATE_LIMIT => settings.candidate_limit = parse_value(key, raw)?,
            PREVIEW_ROW_LIMIT => settings.preview_row_limit = parse_value(key, raw)?,
            BULK_CONCURRENCY => settings.bulk_concurrency = parse_value(key, raw)?,
            STORE_TIMEOUT_MS => settings.store_timeout_ms = parse_value(key, raw)?,
            AI_TIMEOUT_MS => settings.ai_timeout_ms = parse_value(key, raw)?,
            LLM_BASE_URL => settings.llm.base_url = raw.trim().trim_end_matches('/').to_string(),
            LLM_MODEL => settings.llm.model = raw.trim().to_string(),
            LLM_TEMPERATURE => settings.llm.temperature = parse_value(key, raw)?,
            LLM_MAX_TOKENS => settings.llm.max_tokens = parse_value(key, raw)?,
            _ => debug!(key = %key, "忽略未识别的配置键"),
        }
    }

    settings.validate()?;
    Ok(settings)
}

#[async_trait]
impl PipelineConfigReader for ConfigManager {
    async fn load_settings(&self) -> Result<PipelineSettings, ConfigError> {
        let values = self.get_all_values()?;
        let mut settings = apply_overrides(PipelineSettings::default(), &values)?;
        settings.llm.apply_env();
        Ok(settings)
    }
}
