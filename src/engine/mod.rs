// ==========================================
// 碳排放数据导入系统 - 引擎层
// ==========================================
// 职责: 单位换算 / 相似度 / 物料匹配 / AI 兜底分类
// 红线: Engine 不拼 SQL，数据访问经 repository trait 注入
// ==========================================

pub mod ai_classifier;
pub mod material_matcher;
pub mod similarity;
pub mod unit_converter;

// 重导出核心引擎
pub use ai_classifier::AiClassifier;
pub use material_matcher::MaterialMatcher;
pub use similarity::{levenshtein_distance, similarity};
pub use unit_converter::{ConversionResult, QuantityInput, UnitConverter, UnitGroup};
