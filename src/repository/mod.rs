// ==========================================
// 碳排放数据导入系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供物料库与 AI 缓存访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

mod blocking;
pub mod classification_cache_repo;
pub mod classification_cache_repo_impl;
pub mod error;
pub mod material_library_repo;
pub mod material_library_repo_impl;

// 重导出核心仓储
pub use classification_cache_repo::ClassificationCache;
pub use classification_cache_repo_impl::ClassificationCacheRepositoryImpl;
pub use error::{RepositoryError, RepositoryResult};
pub use material_library_repo::MaterialRepository;
pub use material_library_repo_impl::MaterialLibraryRepositoryImpl;
