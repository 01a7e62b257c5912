// ==========================================
// 碳排放数据导入系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 仅描述文件级（结构性）错误，行级问题记为警告/复核标记
// ==========================================

use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件格式不支持: {0}（支持 .csv/.tsv/.txt/.xlsx/.xls/.xlsm/.xlsb/.ods/.json/.pdf）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("文件为空: {0}")]
    EmptyFile(String),

    // ===== 解析错误 =====
    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("JSON 格式错误: {0}")]
    JsonFormatError(String),

    #[error("工作表不存在: {0}")]
    SheetNotFound(String),

    #[error("暂不支持文档解析: {0}")]
    DocumentNotSupported(String),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

// 实现 From<serde_json::Error>
impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::JsonFormatError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
