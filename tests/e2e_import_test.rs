// ==========================================
// 碳排放数据导入系统 - 端到端导入测试
// ==========================================
// 链路: AppState(SQLite) → FileInput::from_path → FileProcessor → 分区结果
// ==========================================

mod test_helpers;

use emission_import::app::AppState;
use emission_import::config::config_keys;
use emission_import::{FileInput, ProcessingMode, ProcessingOptions};
use std::io::Write;
use test_helpers::*;

const USAGE_CSV: &str = "\
Material,Quantity,Unit
Electricity (Grid Average),1200,kWh
Electricity (Grid Average),2.5,MWh
grid electricity,\"1,300\",kWh
Diesel Oil,50,l
Unobtainium,5,kg
";

/// 建库、写入物料库，并关闭 AI 兜底（阈值覆写为 0）
async fn seeded_state() -> (tempfile::NamedTempFile, AppState) {
    emission_import::logging::init_test();
    let temp_db = tempfile::NamedTempFile::new().expect("创建临时数据库失败");
    let db_path = temp_db.path().to_str().unwrap().to_string();

    {
        let state = AppState::new(db_path.clone()).await.expect("初始化失败");
        for entry in sample_library() {
            state.material_repo.upsert_entry(&entry).unwrap();
        }
        state
            .config_manager
            .set_config_value(config_keys::AI_PROCESSING_THRESHOLD, "0")
            .unwrap();
    }

    let state = AppState::new(db_path).await.expect("重新初始化失败");
    (temp_db, state)
}

fn write_temp_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("创建临时文件失败");
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[tokio::test]
async fn test_csv_import_end_to_end() {
    let (_temp_db, state) = seeded_state().await;
    assert_eq!(state.settings.ai_processing_threshold, 0.0);

    let csv_file = write_temp_file(".csv", USAGE_CSV);
    let input = FileInput::from_path(csv_file.path()).await.unwrap();

    let result = state
        .import_file(input, ProcessingOptions::with_mode(ProcessingMode::Bulk))
        .await;

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.total_records, 5);
    assert_eq!(result.partitioned_count(), 5);
    assert_eq!(result.ai_processed_count, 0);

    let quantities: Vec<f64> = result
        .matched
        .iter()
        .map(|r| r.standard_quantity.unwrap())
        .collect();
    assert_eq!(quantities, vec![1200.0, 2500.0, 1300.0]);
    assert!(result
        .matched
        .iter()
        .all(|r| r.material_id.as_deref() == Some("mat-elec")
            && r.standard_unit.as_deref() == Some("kWh")
            && r.match_confidence == Some(1.0)));

    assert_eq!(result.needs_review.len(), 1);
    let diesel = &result.needs_review[0];
    assert_eq!(diesel.material_id.as_deref(), Some("mat-diesel"));
    assert!(diesel.needs_review);
    assert_eq!(diesel.standard_quantity, Some(50.0));

    assert_eq!(result.unmatched.len(), 1);
    let unknown = &result.unmatched[0];
    assert_eq!(unknown.record.material.as_deref(), Some("Unobtainium"));
    assert!(!unknown.ai_processed);
    assert_eq!(unknown.standard_quantity, Some(5.0));
    assert_eq!(unknown.standard_unit.as_deref(), Some("kg"));
}

#[tokio::test]
async fn test_preview_then_standard_import() {
    let (_temp_db, state) = seeded_state().await;
    let csv_file = write_temp_file(".csv", USAGE_CSV);
    let input = FileInput::from_path(csv_file.path()).await.unwrap();

    let preview = state
        .import_file(input.clone(), ProcessingOptions::with_mode(ProcessingMode::Preview))
        .await;
    assert!(preview.success);
    assert_eq!(
        preview.columns,
        Some(vec![
            "Material".to_string(),
            "Quantity".to_string(),
            "Unit".to_string()
        ])
    );
    assert_eq!(preview.preview_records.len(), 5);

    let standard = state
        .import_file(input, ProcessingOptions::default())
        .await;
    assert!(standard.success);
    assert_eq!(standard.matched.len(), 3);
}

#[tokio::test]
async fn test_tsv_and_json_files_from_disk() {
    let (_temp_db, state) = seeded_state().await;

    let tsv = write_temp_file(".tsv", "item\tamount\tuom\nSteel Rebar\t2\tt\n");
    let result = state
        .import_file(
            FileInput::from_path(tsv.path()).await.unwrap(),
            ProcessingOptions::default(),
        )
        .await;
    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.matched[0].standard_quantity, Some(2000.0));
    assert_eq!(result.matched[0].standard_unit.as_deref(), Some("kg"));

    let json = write_temp_file(
        ".json",
        r#"{"records": [{"material": "Natural Gas", "quantity": 12, "unit": "m3"}]}"#,
    );
    let result = state
        .import_file(
            FileInput::from_path(json.path()).await.unwrap(),
            ProcessingOptions::default(),
        )
        .await;
    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.matched[0].material_id.as_deref(), Some("mat-gas"));
    assert_eq!(result.matched[0].standard_quantity, Some(12.0));
}

#[tokio::test]
async fn test_unsupported_file_reports_failure() {
    let (_temp_db, state) = seeded_state().await;
    let docx = write_temp_file(".docx", "binary");

    let result = state
        .import_file(
            FileInput::from_path(docx.path()).await.unwrap(),
            ProcessingOptions::default(),
        )
        .await;

    assert!(!result.success);
    assert!(!result.errors.is_empty());
    assert_eq!(result.partitioned_count(), 0);
}
