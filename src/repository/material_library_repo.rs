// ==========================================
// 碳排放数据导入系统 - 物料库 Repository Trait
// ==========================================
// 职责: 定义物料库只读查询接口（不包含匹配逻辑）
// 红线: Repository 不含业务规则，只做数据访问
// ==========================================

use crate::domain::material::MaterialLibraryEntry;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// MaterialRepository Trait
// ==========================================
// 用途: 物料匹配器的参考库读取接口
// 实现者: MaterialLibraryRepositoryImpl（使用 rusqlite）
#[async_trait]
pub trait MaterialRepository: Send + Sync {
    /// 按规范名称或别名精确查找（不区分大小写；名称命中优先于别名）
    ///
    /// # 返回
    /// - Ok(Some(entry)): 命中
    /// - Ok(None): 未命中
    async fn find_by_name_or_alias(
        &self,
        name_or_alias: &str,
    ) -> RepositoryResult<Option<MaterialLibraryEntry>>;

    /// 文本检索候选条目（按名称）
    ///
    /// # 参数
    /// - normalized_query: 已归一化的查询文本（小写、去首尾空白）
    /// - limit: 候选数量上限
    ///
    /// # 返回
    /// - 候选条目列表，按检索相关度排序
    async fn text_search(
        &self,
        normalized_query: &str,
        limit: usize,
    ) -> RepositoryResult<Vec<MaterialLibraryEntry>>;
}
