// ==========================================
// 碳排放数据导入系统 - AI 分类缓存 Repository 实现
// ==========================================
// 职责: ai_classification_cache 表读写（使用 rusqlite）
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::material::AiClassificationResult;
use crate::repository::classification_cache_repo::ClassificationCache;
use crate::repository::blocking::with_connection;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// ClassificationCacheRepositoryImpl
// ==========================================
pub struct ClassificationCacheRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl ClassificationCacheRepositoryImpl {
    /// 创建新的 Repository 实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 统计缓存条目数
    pub fn count(&self) -> RepositoryResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM ai_classification_cache",
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

#[async_trait]
impl ClassificationCache for ClassificationCacheRepositoryImpl {
    async fn get(
        &self,
        normalized_description: &str,
    ) -> RepositoryResult<Option<AiClassificationResult>> {
        let key = normalized_description.to_string();

        with_connection(&self.conn, move |conn| {
            let result = conn
                .query_row(
                    r#"
                    SELECT result_id, material_name, category, standard_unit, emission_factor, confidence
                    FROM ai_classification_cache
                    WHERE cache_key = ?1
                    "#,
                    params![key],
                    |row| {
                        Ok(AiClassificationResult {
                            id: row.get(0)?,
                            material_name: row.get(1)?,
                            category: row.get(2)?,
                            standard_unit: row.get(3)?,
                            emission_factor: row.get(4)?,
                            confidence: row.get(5)?,
                        })
                    },
                )
                .optional()?;
            Ok(result)
        })
        .await
    }

    async fn upsert(
        &self,
        normalized_description: &str,
        result: &AiClassificationResult,
        timestamp: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let key = normalized_description.to_string();
        let result = result.clone();
        let ts = timestamp.to_rfc3339();

        with_connection(&self.conn, move |conn| {
            conn.execute(
                r#"
                INSERT INTO ai_classification_cache (
                    cache_key, result_id, material_name, category, standard_unit,
                    emission_factor, confidence, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
                ON CONFLICT(cache_key) DO UPDATE SET
                    result_id = excluded.result_id,
                    material_name = excluded.material_name,
                    category = excluded.category,
                    standard_unit = excluded.standard_unit,
                    emission_factor = excluded.emission_factor,
                    confidence = excluded.confidence,
                    updated_at = excluded.updated_at
                "#,
                params![
                    key,
                    result.id,
                    result.material_name,
                    result.category,
                    result.standard_unit,
                    result.emission_factor,
                    result.confidence,
                    ts,
                ],
            )?;
            Ok(())
        })
        .await
    }
}
