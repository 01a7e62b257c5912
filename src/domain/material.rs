// ==========================================
// 碳排放数据导入系统 - 物料领域模型
// ==========================================
// 职责: 物料库条目 / 匹配结果 / AI 分类结果
// 红线: 物料库对导入管道只读
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// MaterialLibraryEntry - 物料库条目
// ==========================================
// 用途: 参考数据（由管理端维护），管道只读
// 对齐: material_library + material_alias 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialLibraryEntry {
    pub id: String,            // 物料标识
    pub name: String,          // 规范名称
    pub aliases: Vec<String>,  // 别名（0..n）
    pub category: String,      // 类别
    pub standard_unit: String, // 标准单位（本层不区分维度）
    pub emission_factor: f64,  // 排放因子（kgCO2e / 标准单位）
}

// ==========================================
// MaterialMatch - 物料匹配结果
// ==========================================
// confidence = 1.0 表示名称/别名精确命中
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialMatch {
    pub id: String,
    pub name: String,
    pub category: String,
    pub standard_unit: String,
    pub emission_factor: f64,
    pub confidence: f64,
}

impl MaterialMatch {
    /// 精确命中（confidence = 1.0）
    pub fn exact(entry: &MaterialLibraryEntry) -> Self {
        Self::scored(entry, 1.0)
    }

    /// 模糊命中（confidence 取相似度）
    pub fn scored(entry: &MaterialLibraryEntry, confidence: f64) -> Self {
        Self {
            id: entry.id.clone(),
            name: entry.name.clone(),
            category: entry.category.clone(),
            standard_unit: entry.standard_unit.clone(),
            emission_factor: entry.emission_factor,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

// ==========================================
// MatchOutcome - 匹配过程的显式结果
// ==========================================
// Degraded: 参考库不可达/超时，调用方按"未匹配"处理，但可以知道原因
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Found(MaterialMatch),
    NotFound,
    Degraded(String),
}

impl MatchOutcome {
    /// 折叠为 Option（NotFound 与 Degraded 均为 None）
    pub fn into_match(self) -> Option<MaterialMatch> {
        match self {
            MatchOutcome::Found(m) => Some(m),
            MatchOutcome::NotFound | MatchOutcome::Degraded(_) => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, MatchOutcome::Degraded(_))
    }
}

// ==========================================
// AiClassificationResult - AI 分类结果
// ==========================================
// id 为新生成的标识（ai- 前缀），不是物料库主键
// 缓存键: normalize_description(描述)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiClassificationResult {
    pub id: String,
    pub material_name: String,
    pub category: String,
    pub standard_unit: String,
    pub emission_factor: f64,
    pub confidence: f64,
}

// ==========================================
// ClassificationOutcome - 分类过程的显式结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum ClassificationOutcome {
    CacheHit,         // 缓存命中，未调用模型
    Classified,       // 模型返回并解析成功（已写缓存）
    Degraded(String), // 调用/解析失败，返回低置信度兜底结果
}

impl ClassificationOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, ClassificationOutcome::Degraded(_))
    }
}

/// 描述归一化（TRIM + 小写），同时作为 AI 缓存键
pub fn normalize_description(description: &str) -> String {
    description.trim().to_lowercase()
}
