// ==========================================
// 碳排放数据导入系统 - 文件导入 Trait
// ==========================================
// 职责: 定义解析 / 列映射 / 处理编排接口（不包含实现）
// ==========================================

use crate::domain::record::{
    CanonicalRecord, FileInput, ParsedFile, ParsedRecord, ProcessingOptions, ProcessingResult,
};
use crate::importer::error::ImportResult;
use async_trait::async_trait;
use std::collections::HashMap;

// ==========================================
// FileProcessor Trait
// ==========================================
// 用途: 文件导入主接口
// 实现者: FileProcessorImpl
#[async_trait]
pub trait FileProcessor: Send + Sync {
    /// 处理单个上传文件
    ///
    /// # 参数
    /// - file: 文件名 + 字节内容
    /// - options: 处理模式 / 工作表 / 列映射 / 默认单位 / AI 阈值
    ///
    /// # 返回
    /// - ProcessingResult（不返回 Err）:
    ///   - success=false + errors: 格式不支持 / 结构性解析失败
    ///   - success=false + sheets: 多工作表，等待调用方选择
    ///   - success=true + preview_records: 预览模式
    ///   - success=true + 三个分区: 标准/批量模式
    ///
    /// # 处理流程
    /// 1. 格式识别
    /// 2. 解析（多工作表暂停）
    /// 3. 预览短路
    /// 4. 列映射
    /// 5. 逐行对账（匹配 → 单位换算 → 置信度分层 → AI 兜底）
    /// 6. 汇总
    async fn process_file(&self, file: FileInput, options: ProcessingOptions) -> ProcessingResult;
}

// ==========================================
// RecordParser Trait
// ==========================================
// 用途: 单表格式解析（CSV / JSON / 文档）
// 实现者: CsvParser, JsonParser, DocumentParser
pub trait RecordParser: Send + Sync {
    /// 解析为行记录 + 表头 + 行级警告
    fn parse(&self, file: &FileInput) -> ImportResult<ParsedFile>;
}

// ==========================================
// SpreadsheetParser Trait
// ==========================================
// 用途: 多工作表格式解析
// 实现者: ExcelParser
pub trait SpreadsheetParser: Send + Sync {
    /// 列出工作表名称（不解码单元格）
    fn sheet_names(&self, file: &FileInput) -> ImportResult<Vec<String>>;

    /// 解析指定工作表（None 表示第一个）
    fn parse_sheet(&self, file: &FileInput, sheet: Option<&str>) -> ImportResult<ParsedFile>;
}

// ==========================================
// ColumnMapper Trait
// ==========================================
// 用途: 源列名 → 标准字段投影
// 实现者: FieldMapper
pub trait ColumnMapper: Send + Sync {
    /// 将原始行投影为 CanonicalRecord
    ///
    /// # 参数
    /// - row: 原始行（列名随源文件变化）
    /// - row_number: 数据行号（从 1 开始）
    /// - mappings: 源列名 → 标准字段名；None 时按常见表头同义词识别
    fn map_record(
        &self,
        row: &ParsedRecord,
        row_number: usize,
        mappings: Option<&HashMap<String, String>>,
    ) -> CanonicalRecord;
}
