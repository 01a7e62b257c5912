// ==========================================
// 碳排放数据导入系统 - JSON 解析器
// ==========================================
// 接受的结构:
// - 顶层对象数组 [{...}, {...}]
// - 单个对象 {...}
// - 包装对象，数组位于 data / records / items / rows 之一（按此顺序取第一个）
// ==========================================

use crate::domain::record::{FileInput, ParsedFile, ParsedRecord};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_processor_trait::RecordParser;
use serde_json::{Map, Value};
use tracing::debug;

/// 包装对象中承载记录数组的键
pub const NESTED_ARRAY_KEYS: [&str; 4] = ["data", "records", "items", "rows"];

pub struct JsonParser;

impl JsonParser {
    /// 定位记录对象列表
    fn locate_records(root: Value) -> ImportResult<Vec<Value>> {
        match root {
            Value::Array(items) => Ok(items),
            Value::Object(mut object) => {
                for key in NESTED_ARRAY_KEYS {
                    if matches!(object.get(key), Some(Value::Array(_))) {
                        if let Some(Value::Array(items)) = object.remove(key) {
                            return Ok(items);
                        }
                    }
                }
                Ok(vec![Value::Object(object)])
            }
            other => Err(ImportError::JsonFormatError(format!(
                "顶层必须是对象或对象数组，实际为 {}",
                json_kind(&other)
            ))),
        }
    }

    fn flatten_object(object: Map<String, Value>, columns: &mut Vec<String>) -> ParsedRecord {
        let mut row = ParsedRecord::new();
        for (key, value) in object {
            let key = key.trim().to_string();
            if !columns.contains(&key) {
                columns.push(key.clone());
            }
            row.insert(key, stringify(value));
        }
        row
    }
}

/// 标量转文本（null → ""），嵌套值序列化为 JSON 文本
fn stringify(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        nested @ (Value::Array(_) | Value::Object(_)) => nested.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl RecordParser for JsonParser {
    fn parse(&self, file: &FileInput) -> ImportResult<ParsedFile> {
        if file.bytes.is_empty() {
            return Err(ImportError::EmptyFile(file.file_name.clone()));
        }

        let root: Value = serde_json::from_slice(&file.bytes)?;
        let items = Self::locate_records(root)?;

        let mut parsed = ParsedFile::default();
        for (idx, item) in items.into_iter().enumerate() {
            match item {
                Value::Object(object) => {
                    let row = Self::flatten_object(object, &mut parsed.columns);
                    if row.values().any(|v| !v.is_empty()) {
                        parsed.records.push(row);
                    }
                }
                other => {
                    return Err(ImportError::JsonFormatError(format!(
                        "第 {} 条记录不是对象（{}）",
                        idx + 1,
                        json_kind(&other)
                    )))
                }
            }
        }

        debug!(
            file_name = %file.file_name,
            rows = parsed.records.len(),
            "JSON 解析完成"
        );
        Ok(parsed)
    }
}
