// ==========================================
// 碳排放数据导入系统 - Excel 解析集成测试
// ==========================================
// 夹具: tests/fixtures/monthly_usage.xlsx（工作表 Jan / Feb）
// - Jan: material,quantity,unit / Diesel,10,l
// - Feb: material,quantity,unit,site
//        Electricity (Grid Average),250,kWh,(空)
//        Steel Rebar,(空),t,Depot
// ==========================================

mod test_helpers;

use emission_import::importer::{ExcelParser, FileProcessor, ImportError, SpreadsheetParser};
use emission_import::{FileInput, ProcessingMode, ProcessingOptions};
use test_helpers::*;

const FIXTURE: &str = "tests/fixtures/monthly_usage.xlsx";

async fn workbook() -> FileInput {
    FileInput::from_path(FIXTURE).await.expect("读取 Excel 夹具失败")
}

#[tokio::test]
async fn test_excel_sheet_names_in_workbook_order() {
    let file = workbook().await;
    assert_eq!(ExcelParser.sheet_names(&file).unwrap(), vec!["Jan", "Feb"]);
}

#[tokio::test]
async fn test_excel_parse_named_sheet_with_blank_cells() {
    let file = workbook().await;
    let parsed = ExcelParser.parse_sheet(&file, Some("Feb")).unwrap();

    assert_eq!(parsed.columns, vec!["material", "quantity", "unit", "site"]);
    assert_eq!(parsed.records.len(), 2);

    let electricity = &parsed.records[0];
    assert_eq!(
        electricity.get("material"),
        Some(&"Electricity (Grid Average)".to_string())
    );
    assert_eq!(electricity.get("quantity"), Some(&"250".to_string()));
    assert_eq!(electricity.get("site"), Some(&"".to_string()));

    let steel = &parsed.records[1];
    assert_eq!(steel.get("quantity"), Some(&"".to_string()));
    assert_eq!(steel.get("site"), Some(&"Depot".to_string()));
}

#[tokio::test]
async fn test_excel_parse_defaults_to_first_sheet() {
    let file = workbook().await;
    let parsed = ExcelParser.parse_sheet(&file, None).unwrap();

    assert_eq!(parsed.records.len(), 1);
    assert_eq!(parsed.records[0].get("material"), Some(&"Diesel".to_string()));
    assert_eq!(parsed.records[0].get("quantity"), Some(&"10".to_string()));
}

#[tokio::test]
async fn test_excel_unknown_sheet_is_rejected() {
    let file = workbook().await;
    let err = ExcelParser.parse_sheet(&file, Some("Mar")).unwrap_err();
    assert!(matches!(err, ImportError::SheetNotFound(ref name) if name == "Mar"));
}

#[tokio::test]
async fn test_workbook_import_pauses_then_imports_selected_sheet() {
    let h = harness();
    let file = workbook().await;

    let paused = h
        .processor
        .process_file(file.clone(), ProcessingOptions::default())
        .await;
    assert!(!paused.success);
    assert!(paused.is_paused());
    assert_eq!(
        paused.sheets,
        Some(vec!["Jan".to_string(), "Feb".to_string()])
    );
    assert_eq!(paused.partitioned_count(), 0);

    let options = ProcessingOptions {
        mode: ProcessingMode::Standard,
        selected_sheet: Some("Feb".to_string()),
        ai_processing_threshold: Some(0.0),
        ..Default::default()
    };
    let result = h.processor.process_file(file, options).await;

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.total_records, 2);

    assert_eq!(result.matched.len(), 1);
    assert_eq!(result.matched[0].standard_quantity, Some(250.0));
    assert_eq!(result.matched[0].standard_unit.as_deref(), Some("kWh"));

    // 数量为空 → 单位复核
    assert_eq!(result.needs_review.len(), 1);
    let steel = &result.needs_review[0];
    assert_eq!(steel.material_id.as_deref(), Some("mat-steel"));
    assert!(steel.needs_uom_review);
    assert!(steel.review_reasons.iter().any(|r| r.contains("缺少数量")));
    assert_eq!(steel.record.extra.get("site"), Some(&"Depot".to_string()));
}
