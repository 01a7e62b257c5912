// ==========================================
// 碳排放数据导入系统 - 领域类型定义
// ==========================================
// 职责: 计量维度 / 处理模式 / 文件格式 / 分区枚举
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 计量维度 (Unit Dimension)
// ==========================================
// 红线: 每个单位只属于一个维度，换算只在同维度内进行
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitDimension {
    Mass,     // 质量
    Volume,   // 体积
    Energy,   // 能量
    Distance, // 距离
    Area,     // 面积
}

impl UnitDimension {
    /// 全部维度（固定顺序，用于单位清单展示）
    pub const ALL: [UnitDimension; 5] = [
        UnitDimension::Mass,
        UnitDimension::Volume,
        UnitDimension::Energy,
        UnitDimension::Distance,
        UnitDimension::Area,
    ];

    /// 维度的标准单位（换算中间单位）
    pub fn standard_unit(&self) -> &'static str {
        match self {
            UnitDimension::Mass => "kg",
            UnitDimension::Volume => "m³",
            UnitDimension::Energy => "kWh",
            UnitDimension::Distance => "km",
            UnitDimension::Area => "m²",
        }
    }
}

impl fmt::Display for UnitDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitDimension::Mass => write!(f, "mass"),
            UnitDimension::Volume => write!(f, "volume"),
            UnitDimension::Energy => write!(f, "energy"),
            UnitDimension::Distance => write!(f, "distance"),
            UnitDimension::Area => write!(f, "area"),
        }
    }
}

// ==========================================
// 处理模式 (Processing Mode)
// ==========================================
// Preview: 只解析不对账
// Standard: 逐行顺序对账
// Bulk: 有界并发对账（保持输入顺序）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    Preview,
    #[default]
    Standard,
    Bulk,
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingMode::Preview => write!(f, "preview"),
            ProcessingMode::Standard => write!(f, "standard"),
            ProcessingMode::Bulk => write!(f, "bulk"),
        }
    }
}

impl FromStr for ProcessingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "preview" => Ok(ProcessingMode::Preview),
            "standard" => Ok(ProcessingMode::Standard),
            "bulk" => Ok(ProcessingMode::Bulk),
            other => Err(format!("未知处理模式: {}", other)),
        }
    }
}

// ==========================================
// 文件格式 (File Format)
// ==========================================
// 仅按扩展名判定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileFormat {
    Delimited,   // csv / tsv / txt
    Spreadsheet, // xlsx / xlsm / xls / xlsb / ods
    Json,        // json
    Document,    // pdf（暂不支持解析）
}

impl FileFormat {
    /// 根据文件名扩展名推断格式
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let ext = file_name.rsplit_once('.')?.1.trim().to_lowercase();
        match ext.as_str() {
            "csv" | "tsv" | "txt" => Some(FileFormat::Delimited),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Some(FileFormat::Spreadsheet),
            "json" => Some(FileFormat::Json),
            "pdf" => Some(FileFormat::Document),
            _ => None,
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::Delimited => write!(f, "DELIMITED"),
            FileFormat::Spreadsheet => write!(f, "SPREADSHEET"),
            FileFormat::Json => write!(f, "JSON"),
            FileFormat::Document => write!(f, "DOCUMENT"),
        }
    }
}

// ==========================================
// 结果分区 (Record Bucket)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordBucket {
    Matched,     // 自动导入
    NeedsReview, // 人工复核
    Unmatched,   // 未匹配
}

impl fmt::Display for RecordBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordBucket::Matched => write!(f, "MATCHED"),
            RecordBucket::NeedsReview => write!(f, "NEEDS_REVIEW"),
            RecordBucket::Unmatched => write!(f, "UNMATCHED"),
        }
    }
}
