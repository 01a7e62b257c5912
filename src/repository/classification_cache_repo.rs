// ==========================================
// 碳排放数据导入系统 - AI 分类缓存 Repository Trait
// ==========================================
// 职责: 按归一化描述读写 AI 分类结果
// 红线: 缓存键只由归一化描述决定；同键只允许 upsert 覆盖
// ==========================================

use crate::domain::material::AiClassificationResult;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

// ==========================================
// ClassificationCache Trait
// ==========================================
// 实现者: ClassificationCacheRepositoryImpl（使用 rusqlite）
#[async_trait]
pub trait ClassificationCache: Send + Sync {
    /// 读取缓存
    ///
    /// # 参数
    /// - normalized_description: 归一化后的描述（缓存键）
    async fn get(
        &self,
        normalized_description: &str,
    ) -> RepositoryResult<Option<AiClassificationResult>>;

    /// 写入或覆盖缓存
    ///
    /// # 参数
    /// - normalized_description: 缓存键
    /// - result: 分类结果
    /// - timestamp: 写入时间
    async fn upsert(
        &self,
        normalized_description: &str,
        result: &AiClassificationResult,
        timestamp: DateTime<Utc>,
    ) -> RepositoryResult<()>;
}
