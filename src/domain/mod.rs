// ==========================================
// 碳排放数据导入系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod material;
pub mod record;
pub mod types;

// 重导出核心类型
pub use material::{
    normalize_description, AiClassificationResult, ClassificationOutcome, MatchOutcome,
    MaterialLibraryEntry, MaterialMatch,
};
pub use record::{
    CanonicalRecord, FileInput, ParsedFile, ParsedRecord, ProcessedRecord, ProcessingOptions,
    ProcessingResult,
};
pub use types::{FileFormat, ProcessingMode, RecordBucket, UnitDimension};
