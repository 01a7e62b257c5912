// ==========================================
// 碳排放数据导入系统 - 应用层
// ==========================================
// 职责: 组件装配，供 CLI / 上层服务调用
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState, ENV_DB_PATH};
