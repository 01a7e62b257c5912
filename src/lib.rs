// ==========================================
// 碳排放数据导入系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite + tokio
// 系统定位: 上传文件 → 物料识别 → 单位标准化 → 分区待审
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 物料库 / AI 缓存
pub mod repository;

// 引擎层 - 换算 / 匹配 / AI 兜底
pub mod engine;

// 生成式模型客户端
pub mod llm;

// 导入层 - 解析 / 映射 / 对账
pub mod importer;

// 配置层 - 管道参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// 应用层 - 组件装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{FileFormat, ProcessingMode, RecordBucket, UnitDimension};

// 领域实体
pub use domain::{
    AiClassificationResult, CanonicalRecord, FileInput, MaterialLibraryEntry, MaterialMatch,
    ProcessedRecord, ProcessingOptions, ProcessingResult,
};

// 引擎
pub use engine::{AiClassifier, MaterialMatcher, UnitConverter};

// 导入
pub use importer::{FileProcessor, FileProcessorImpl};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "碳排放数据导入系统";
