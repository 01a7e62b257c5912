// ==========================================
// 碳排放数据导入系统 - 文件解析器实现
// ==========================================
// 支持: 分隔文本 (.csv/.tsv/.txt) / Excel 系列 (.xlsx/.xls/.xlsm/.xlsb/.ods) / PDF（占位）
// 输入: 内存字节（上传文件不落盘）
// ==========================================

use crate::domain::record::{FileInput, ParsedFile, ParsedRecord};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_processor_trait::{RecordParser, SpreadsheetParser};
use calamine::{open_workbook_auto_from_rs, Reader};
use csv::ReaderBuilder;
use std::io::Cursor;
use tracing::debug;

/// 表头清洗: TRIM + 去 BOM，空表头以列序号命名，重名表头追加序号（unit, unit_2）
fn clean_headers<I>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut headers: Vec<String> = Vec::new();
    for (idx, header) in raw.into_iter().enumerate() {
        let header = header.trim_start_matches('\u{feff}').trim().to_string();
        let base = if header.is_empty() {
            format!("column_{}", idx + 1)
        } else {
            header
        };

        let mut name = base.clone();
        let mut suffix = 2;
        while headers.iter().any(|h| h.eq_ignore_ascii_case(&name)) {
            name = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        headers.push(name);
    }
    headers
}

/// 按表头组装一行（多余单元格丢弃，缺失单元格不补）
fn build_row<I>(headers: &[String], cells: I) -> Option<ParsedRecord>
where
    I: IntoIterator<Item = String>,
{
    let mut row_map = ParsedRecord::new();
    for (col_idx, value) in cells.into_iter().enumerate() {
        if let Some(header) = headers.get(col_idx) {
            row_map.insert(header.clone(), value.trim().to_string());
        }
    }

    // 跳过完全空白的行
    if row_map.values().all(|v| v.is_empty()) {
        return None;
    }
    Some(row_map)
}

fn decode_cell(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn ensure_not_empty(file: &FileInput) -> ImportResult<()> {
    if file.bytes.is_empty() {
        return Err(ImportError::EmptyFile(file.file_name.clone()));
    }
    Ok(())
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl CsvParser {
    /// 分隔符: .tsv 用制表符；.txt 首行含制表符且不含逗号时用制表符；其余用逗号
    fn delimiter_for(file: &FileInput) -> u8 {
        match file.extension().as_str() {
            "tsv" => b'\t',
            "txt" => {
                let first_line = file
                    .bytes
                    .split(|b| *b == b'\n')
                    .next()
                    .unwrap_or_default();
                if first_line.contains(&b'\t') && !first_line.contains(&b',') {
                    b'\t'
                } else {
                    b','
                }
            }
            _ => b',',
        }
    }
}

impl RecordParser for CsvParser {
    fn parse(&self, file: &FileInput) -> ImportResult<ParsedFile> {
        ensure_not_empty(file)?;

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .delimiter(Self::delimiter_for(file))
            .from_reader(file.bytes.as_slice());

        // 读取表头（失败即拒绝整个文件）
        let headers = clean_headers(reader.byte_headers()?.iter().map(decode_cell));

        let mut parsed = ParsedFile {
            columns: headers.clone(),
            ..Default::default()
        };

        for (row_idx, result) in reader.byte_records().enumerate() {
            // 行号含表头
            let line = row_idx + 2;
            match result {
                Ok(record) => {
                    // 非 UTF-8 单元格按替换字符解码，行保留并记警告
                    if record.iter().any(|cell| std::str::from_utf8(cell).is_err()) {
                        parsed
                            .warnings
                            .push(format!("第 {} 行包含非 UTF-8 字符，已按替换字符解码", line));
                    }
                    if let Some(row) = build_row(&headers, record.iter().map(decode_cell)) {
                        parsed.records.push(row);
                    }
                }
                Err(e) => {
                    parsed
                        .warnings
                        .push(format!("第 {} 行解析失败，已跳过: {}", line, e));
                }
            }
        }

        debug!(
            file_name = %file.file_name,
            rows = parsed.records.len(),
            warnings = parsed.warnings.len(),
            "CSV 解析完成"
        );
        Ok(parsed)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl ExcelParser {
    fn open(file: &FileInput) -> ImportResult<calamine::Sheets<Cursor<Vec<u8>>>> {
        ensure_not_empty(file)?;
        Ok(open_workbook_auto_from_rs(Cursor::new(file.bytes.clone()))?)
    }
}

impl SpreadsheetParser for ExcelParser {
    fn sheet_names(&self, file: &FileInput) -> ImportResult<Vec<String>> {
        let workbook = Self::open(file)?;
        Ok(workbook.sheet_names())
    }

    fn parse_sheet(&self, file: &FileInput, sheet: Option<&str>) -> ImportResult<ParsedFile> {
        let mut workbook = Self::open(file)?;
        let sheet_names = workbook.sheet_names();

        let sheet_name = match sheet {
            Some(name) => sheet_names
                .iter()
                .find(|s| s.as_str() == name)
                .cloned()
                .ok_or_else(|| ImportError::SheetNotFound(name.to_string()))?,
            None => sheet_names
                .first()
                .cloned()
                .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?,
        };

        let range = workbook.worksheet_range(&sheet_name)?;

        // 提取表头（第一行）
        let mut rows = range.rows();
        let header_row = match rows.next() {
            Some(row) => row,
            None => {
                return Ok(ParsedFile {
                    warnings: vec![format!("工作表 {} 为空", sheet_name)],
                    ..Default::default()
                })
            }
        };
        let headers = clean_headers(header_row.iter().map(|cell| cell.to_string()));

        // 读取数据行（空单元格显示为 ""）
        let records: Vec<ParsedRecord> = rows
            .filter_map(|data_row| build_row(&headers, data_row.iter().map(|c| c.to_string())))
            .collect();

        debug!(
            file_name = %file.file_name,
            sheet = %sheet_name,
            rows = records.len(),
            "工作表解析完成"
        );

        Ok(ParsedFile {
            records,
            columns: headers,
            warnings: Vec::new(),
        })
    }
}

// ==========================================
// 文档解析器（占位）
// ==========================================
// PDF 等文档需要 OCR/版面分析，当前直接拒绝
pub struct DocumentParser;

impl RecordParser for DocumentParser {
    fn parse(&self, file: &FileInput) -> ImportResult<ParsedFile> {
        Err(ImportError::DocumentNotSupported(file.file_name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csv_file(name: &str, content: &str) -> FileInput {
        FileInput::from_bytes(name, content.as_bytes().to_vec())
    }

    #[test]
    fn test_csv_parser_valid_file() {
        let file = csv_file(
            "usage.csv",
            " Material , Quantity,Unit\nDiesel,120,l\nElectricity,5000,kWh\n",
        );
        let parsed = CsvParser.parse(&file).unwrap();

        assert_eq!(parsed.columns, vec!["Material", "Quantity", "Unit"]);
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[0].get("Material"), Some(&"Diesel".to_string()));
        assert_eq!(parsed.records[1].get("Unit"), Some(&"kWh".to_string()));
    }

    #[test]
    fn test_csv_parser_skip_empty_rows() {
        let file = csv_file("usage.csv", "Material,Quantity\nDiesel,2.5\n,\nPetrol,3.0\n");
        let parsed = CsvParser.parse(&file).unwrap();

        // 应跳过空行
        assert_eq!(parsed.records.len(), 2);
    }

    #[test]
    fn test_csv_parser_tab_delimited() {
        let file = csv_file("usage.tsv", "Material\tQuantity\nSteel, rebar\t10\n");
        let parsed = CsvParser.parse(&file).unwrap();
        assert_eq!(
            parsed.records[0].get("Material"),
            Some(&"Steel, rebar".to_string())
        );

        let txt = csv_file("usage.txt", "Material\tQuantity\nSteel\t10\n");
        assert_eq!(CsvParser::delimiter_for(&txt), b'\t');
    }

    #[test]
    fn test_csv_parser_invalid_utf8_row_is_kept_with_warning() {
        let mut bytes = b"Material,Quantity\nDiesel,1\n".to_vec();
        bytes.extend_from_slice(&[b'C', b'a', b'f', 0xe9, b',', b'2', b'\n']);
        bytes.extend_from_slice(b"Petrol,3\n");
        let parsed = CsvParser.parse(&FileInput::from_bytes("bad.csv", bytes)).unwrap();

        assert_eq!(parsed.records.len(), 3);
        assert_eq!(
            parsed.records[1].get("Material"),
            Some(&"Caf\u{fffd}".to_string())
        );
        assert_eq!(parsed.records[1].get("Quantity"), Some(&"2".to_string()));
        assert_eq!(parsed.warnings.len(), 1);
        assert!(parsed.warnings[0].contains("第 3 行"));
    }

    #[test]
    fn test_duplicate_headers_keep_both_cells() {
        let file = csv_file("usage.csv", "material,unit,quantity,Unit\nDiesel,l,5,\n");
        let parsed = CsvParser.parse(&file).unwrap();

        assert_eq!(parsed.columns, vec!["material", "unit", "quantity", "Unit_2"]);
        assert_eq!(parsed.records[0].get("unit"), Some(&"l".to_string()));
        assert_eq!(parsed.records[0].get("Unit_2"), Some(&"".to_string()));
    }

    #[test]
    fn test_csv_parser_empty_file() {
        let err = CsvParser.parse(&csv_file("empty.csv", "")).unwrap_err();
        assert!(matches!(err, ImportError::EmptyFile(_)));
    }

    #[test]
    fn test_blank_header_gets_positional_name() {
        let file = csv_file("usage.csv", "Material,,Unit\nDiesel,5,l\n");
        let parsed = CsvParser.parse(&file).unwrap();
        assert_eq!(parsed.columns[1], "column_2");
        assert_eq!(parsed.records[0].get("column_2"), Some(&"5".to_string()));
    }

    #[test]
    fn test_excel_parser_rejects_garbage() {
        let file = FileInput::from_bytes("book.xlsx", b"not a workbook".to_vec());
        assert!(ExcelParser.sheet_names(&file).is_err());
    }

    #[test]
    fn test_document_parser_not_supported() {
        let file = FileInput::from_bytes("invoice.pdf", b"%PDF-1.4".to_vec());
        let err = DocumentParser.parse(&file).unwrap_err();
        assert!(matches!(err, ImportError::DocumentNotSupported(_)));
    }
}
