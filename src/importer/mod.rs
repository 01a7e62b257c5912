// ==========================================
// 碳排放数据导入系统 - 导入层
// ==========================================
// 职责: 上传文件 → 标准化记录 → 三个结果分区
// 支持: CSV/TSV, Excel 系列, JSON；PDF 仅识别不解析
// ==========================================

// 模块声明
pub mod data_cleaner;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod file_processor_impl;
pub mod file_processor_trait;
pub mod json_parser;
pub mod reconciler;

// 重导出核心类型
pub use data_cleaner::DataCleaner;
pub use error::{ImportError, ImportResult};
pub use field_mapper::FieldMapper;
pub use file_parser::{CsvParser, DocumentParser, ExcelParser};
pub use file_processor_impl::{FileProcessorImpl, ParserRegistry};
pub use json_parser::JsonParser;
pub use reconciler::{ReconcileContext, Reconciled, RecordReconciler};

// 重导出 Trait 接口
pub use file_processor_trait::{ColumnMapper, FileProcessor, RecordParser, SpreadsheetParser};
