// ==========================================
// 碳排放数据导入系统 - 导入记录模型
// ==========================================
// 流程: 文件 → ParsedRecord → CanonicalRecord → ProcessedRecord
// 红线: 对账逻辑只读取 CanonicalRecord，不直接按源列名分支
// ==========================================

use crate::domain::types::ProcessingMode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// 解析器输出的原始行（列名 → 值），列名随源文件变化
pub type ParsedRecord = HashMap<String, String>;

// ==========================================
// FileInput - 上传文件
// ==========================================
// 文件名只用于按扩展名判定格式
#[derive(Debug, Clone)]
pub struct FileInput {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl FileInput {
    pub fn from_bytes(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// 异步读取磁盘文件
    pub async fn from_path<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        Ok(Self { file_name, bytes })
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// 小写扩展名（无扩展名返回空串）
    pub fn extension(&self) -> String {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.trim().to_lowercase())
            .unwrap_or_default()
    }
}

// ==========================================
// ParsedFile - 解析器输出
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedFile {
    pub records: Vec<ParsedRecord>,
    pub columns: Vec<String>,  // 表头顺序
    pub warnings: Vec<String>, // 可容忍的行级问题
}

// ==========================================
// CanonicalRecord - 列映射后的固定结构
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub row_number: usize,             // 数据行号（从 1 开始）
    pub material: Option<String>,      // 物料/活动描述
    pub quantity: Option<String>,      // 数量（原始文本）
    pub unit: Option<String>,          // 计量单位（原始文本）
    pub extra: HashMap<String, String>, // 其余已映射字段
}

// ==========================================
// ProcessedRecord - 对账后的记录
// ==========================================
// 生命周期: 每个输入行生成一次，放入唯一分区后不再修改
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    pub record: CanonicalRecord,

    // ===== 物料身份（来自物料库或 AI 分类）=====
    pub material_id: Option<String>,
    pub material_name: Option<String>,
    pub category: Option<String>,
    pub emission_factor: Option<f64>,
    pub match_confidence: Option<f64>,

    // ===== 标准化数量 =====
    pub standard_quantity: Option<f64>,
    pub standard_unit: Option<String>,

    // ===== 复核标记 =====
    pub needs_review: bool,
    pub needs_uom_review: bool,
    pub ai_processed: bool,
    pub review_reasons: Vec<String>,
}

impl ProcessedRecord {
    pub fn new(record: CanonicalRecord) -> Self {
        Self {
            record,
            ..Default::default()
        }
    }
}

// ==========================================
// ProcessingOptions - 单次处理的调用参数
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingOptions {
    #[serde(default)]
    pub mode: ProcessingMode,
    pub selected_sheet: Option<String>,
    pub column_mappings: Option<HashMap<String, String>>, // 源列名 → 标准字段名
    pub default_uom: Option<HashMap<String, String>>,     // 物料名 → 默认单位
    pub ai_processing_threshold: Option<f64>,             // [0,1]，0 表示禁用 AI
}

impl ProcessingOptions {
    pub fn with_mode(mode: ProcessingMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }
}

// ==========================================
// ProcessingResult - 单次处理的汇总结果
// ==========================================
// 红线: success=true 带分区 / success=false 带错误，二者互斥
// sheets 仅在多工作表需要调用方选择时填充
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub success: bool,
    pub matched: Vec<ProcessedRecord>,
    pub needs_review: Vec<ProcessedRecord>,
    pub unmatched: Vec<ProcessedRecord>,
    pub preview_records: Vec<ParsedRecord>,
    pub sheets: Option<Vec<String>>,
    pub columns: Option<Vec<String>>,
    pub ai_processed_count: usize,
    pub total_records: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ProcessingResult {
    /// 校验失败 / 结构性错误
    pub fn failure(errors: Vec<String>) -> Self {
        Self {
            success: false,
            errors,
            ..Default::default()
        }
    }

    /// 多工作表暂停：等待调用方选择工作表后重新调用
    pub fn paused(sheets: Vec<String>) -> Self {
        let message = format!(
            "文件包含 {} 个工作表，请选择要导入的工作表: {}",
            sheets.len(),
            sheets.join(", ")
        );
        Self {
            success: false,
            sheets: Some(sheets),
            errors: vec![message],
            ..Default::default()
        }
    }

    pub fn is_paused(&self) -> bool {
        !self.success && self.sheets.is_some()
    }

    /// 各分区记录数之和
    pub fn partitioned_count(&self) -> usize {
        self.matched.len() + self.needs_review.len() + self.unmatched.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_input_extension() {
        let file = FileInput::from_bytes("Energy Usage.XLSX", vec![1, 2, 3]);
        assert_eq!(file.extension(), "xlsx");
        assert_eq!(file.size(), 3);

        let bare = FileInput::from_bytes("README", Vec::new());
        assert_eq!(bare.extension(), "");
    }

    #[test]
    fn test_paused_result_is_not_failure_without_sheets() {
        let paused = ProcessingResult::paused(vec!["Jan".to_string(), "Feb".to_string()]);
        assert!(paused.is_paused());
        assert_eq!(paused.errors.len(), 1);
        assert!(paused.errors[0].contains("Jan"));

        let failed = ProcessingResult::failure(vec!["boom".to_string()]);
        assert!(!failed.is_paused());
        assert!(!failed.success);
    }
}
