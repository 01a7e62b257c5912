// ==========================================
// 碳排放数据导入系统 - 数据清洗器实现
// ==========================================
// 职责: TRIM / NULL 标准化 / 描述空白折叠 / 数量千分位去除
// ==========================================

pub struct DataCleaner;

impl DataCleaner {
    /// 透传列: 仅 TRIM，保留空串与占位符原样
    pub fn clean_text(&self, value: &str) -> String {
        value.trim().to_string()
    }

    /// 空白及常见空值占位符 → None
    pub fn normalize_null(&self, value: Option<&str>) -> Option<String> {
        value.and_then(|v| {
            let trimmed = v.trim();
            match trimmed.to_ascii_lowercase().as_str() {
                "" | "null" | "n/a" | "na" | "-" => None,
                _ => Some(trimmed.to_string()),
            }
        })
    }

    /// 物料描述: 连续空白折叠为单个空格
    pub fn clean_description(&self, value: Option<&str>) -> Option<String> {
        self.normalize_null(value)
            .map(|v| v.split_whitespace().collect::<Vec<_>>().join(" "))
    }

    /// 数量: 去除千分位逗号、内部空格（"1,234.5" → "1234.5"）
    pub fn clean_quantity(&self, value: Option<&str>) -> Option<String> {
        self.normalize_null(value).map(|v| {
            v.chars()
                .filter(|c| *c != ',' && !c.is_whitespace())
                .collect()
        })
    }

    pub fn clean_unit(&self, value: Option<&str>) -> Option<String> {
        self.normalize_null(value)
    }
}
