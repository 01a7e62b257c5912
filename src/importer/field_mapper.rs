// ==========================================
// 碳排放数据导入系统 - 字段映射器实现
// ==========================================
// 职责: 源列名 → 标准字段 (material / quantity / unit) 投影 + 基础清洗
// 规则:
// - 提供 column_mappings 时只保留已映射的列，未映射列丢弃
// - 未提供时按表头同义词识别（不区分大小写），其余列进入 extra
// ==========================================

use crate::domain::record::{CanonicalRecord, ParsedRecord};
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::file_processor_trait::ColumnMapper;
use std::collections::HashMap;

/// 标准字段名
pub const FIELD_MATERIAL: &str = "material";
pub const FIELD_QUANTITY: &str = "quantity";
pub const FIELD_UNIT: &str = "unit";

/// 表头同义词（按优先级）
const MATERIAL_SYNONYMS: [&str; 5] = ["material", "description", "activity", "item", "name"];
const QUANTITY_SYNONYMS: [&str; 5] = ["quantity", "amount", "qty", "value", "usage"];
const UNIT_SYNONYMS: [&str; 4] = ["unit", "uom", "units", "unit_of_measure"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CanonicalField {
    Material,
    Quantity,
    Unit,
}

/// 将列名归入标准字段（不区分大小写，空格/连字符视同下划线）
fn canonical_field(column: &str) -> Option<CanonicalField> {
    let key = column.trim().to_lowercase().replace([' ', '-'], "_");
    if MATERIAL_SYNONYMS.contains(&key.as_str()) {
        Some(CanonicalField::Material)
    } else if QUANTITY_SYNONYMS.contains(&key.as_str()) {
        Some(CanonicalField::Quantity)
    } else if UNIT_SYNONYMS.contains(&key.as_str()) {
        Some(CanonicalField::Unit)
    } else {
        None
    }
}

/// 同义词优先级（越小越优先）
fn synonym_rank(column: &str) -> usize {
    let key = column.trim().to_lowercase().replace([' ', '-'], "_");
    MATERIAL_SYNONYMS
        .iter()
        .chain(QUANTITY_SYNONYMS.iter())
        .chain(UNIT_SYNONYMS.iter())
        .position(|s| *s == key)
        .unwrap_or(usize::MAX)
}

pub struct FieldMapper {
    cleaner: DataCleaner,
}

impl Default for FieldMapper {
    fn default() -> Self {
        Self {
            cleaner: DataCleaner,
        }
    }
}

impl FieldMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取各候选列中第一个非空值
    fn first_value<'a>(row: &'a ParsedRecord, columns: &[&String]) -> Option<&'a str> {
        columns
            .iter()
            .filter_map(|c| row.get(c.as_str()))
            .map(String::as_str)
            .find(|v| !v.trim().is_empty())
    }

    fn assemble(
        &self,
        row: &ParsedRecord,
        row_number: usize,
        assignments: Vec<(&String, String)>, // (源列, 目标字段名)
    ) -> CanonicalRecord {
        let mut material_cols = Vec::new();
        let mut quantity_cols = Vec::new();
        let mut unit_cols = Vec::new();
        let mut extra = HashMap::new();

        for (source, target) in assignments {
            match canonical_field(&target) {
                Some(CanonicalField::Material) => material_cols.push(source),
                Some(CanonicalField::Quantity) => quantity_cols.push(source),
                Some(CanonicalField::Unit) => unit_cols.push(source),
                None => {
                    if let Some(value) = row.get(source) {
                        extra.insert(target, self.cleaner.clean_text(value));
                    }
                }
            }
        }

        CanonicalRecord {
            row_number,
            material: self
                .cleaner
                .clean_description(Self::first_value(row, &material_cols)),
            quantity: self
                .cleaner
                .clean_quantity(Self::first_value(row, &quantity_cols)),
            unit: self.cleaner.clean_unit(Self::first_value(row, &unit_cols)),
            extra,
        }
    }
}

impl ColumnMapper for FieldMapper {
    fn map_record(
        &self,
        row: &ParsedRecord,
        row_number: usize,
        mappings: Option<&HashMap<String, String>>,
    ) -> CanonicalRecord {
        let mut assignments: Vec<(&String, String)> = match mappings {
            Some(mappings) => row
                .keys()
                .filter_map(|source| {
                    mappings
                        .get(source)
                        .map(|target| (source, target.trim().to_string()))
                })
                .collect(),
            None => row.keys().map(|source| (source, source.clone())).collect(),
        };

        // 多列映射到同一字段时按同义词优先级、再按列名取值，保证结果确定
        assignments.sort_by(|a, b| {
            synonym_rank(a.0)
                .cmp(&synonym_rank(b.0))
                .then_with(|| a.0.cmp(b.0))
        });

        self.assemble(row, row_number, assignments)
    }
}
