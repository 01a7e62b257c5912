// ==========================================
// 碳排放数据导入系统 - 命令行入口
// ==========================================
// 用法:
//   emission-import <file> [--db PATH] [--sheet NAME]
//                   [--mode preview|standard|bulk] [--ai-threshold X]
//                   [--map SOURCE=FIELD]... [--default-uom MATERIAL=UNIT]...
//                   [--log-json]
// 输出: ProcessingResult（JSON，stdout）；日志输出到 stderr
// ==========================================

use anyhow::{anyhow, bail, Context, Result};
use emission_import::app::{get_default_db_path, AppState};
use emission_import::{logging, FileInput, ProcessingMode, ProcessingOptions};
use std::collections::HashMap;

#[derive(Debug)]
struct CliArgs {
    file: String,
    db_path: Option<String>,
    options: ProcessingOptions,
    log_json: bool,
}

fn usage() -> &'static str {
    "用法: emission-import <file> [--db PATH] [--sheet NAME] \
     [--mode preview|standard|bulk] [--ai-threshold X] \
     [--map SOURCE=FIELD]... [--default-uom MATERIAL=UNIT]... [--log-json]"
}

/// 解析 KEY=VALUE
fn split_pair(flag: &str, raw: &str) -> Result<(String, String)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("{} 需要 KEY=VALUE 格式，实际为 {}", flag, raw))?;
    Ok((key.trim().to_string(), value.trim().to_string()))
}

fn parse_args<I: Iterator<Item = String>>(mut args: I) -> Result<CliArgs> {
    let mut file = None;
    let mut db_path = None;
    let mut log_json = false;
    let mut options = ProcessingOptions::default();
    let mut mappings: HashMap<String, String> = HashMap::new();
    let mut default_uom: HashMap<String, String> = HashMap::new();

    while let Some(arg) = args.next() {
        let mut value_for = |flag: &str| {
            args.next()
                .ok_or_else(|| anyhow!("{} 缺少参数值\n{}", flag, usage()))
        };

        match arg.as_str() {
            "--db" => db_path = Some(value_for("--db")?),
            "--sheet" => options.selected_sheet = Some(value_for("--sheet")?),
            "--mode" => {
                options.mode = value_for("--mode")?
                    .parse::<ProcessingMode>()
                    .map_err(|e| anyhow!(e))?
            }
            "--ai-threshold" => {
                let raw = value_for("--ai-threshold")?;
                let threshold = raw
                    .parse::<f64>()
                    .with_context(|| format!("--ai-threshold 不是数值: {}", raw))?;
                options.ai_processing_threshold = Some(threshold);
            }
            "--map" => {
                let (source, field) = split_pair("--map", &value_for("--map")?)?;
                mappings.insert(source, field);
            }
            "--default-uom" => {
                let (material, unit) = split_pair("--default-uom", &value_for("--default-uom")?)?;
                default_uom.insert(material, unit);
            }
            "--log-json" => log_json = true,
            "-h" | "--help" => bail!("{}", usage()),
            other if other.starts_with("--") => bail!("未知参数 {}\n{}", other, usage()),
            other => {
                if file.is_some() {
                    bail!("只能指定一个文件\n{}", usage());
                }
                file = Some(other.to_string());
            }
        }
    }

    if !mappings.is_empty() {
        options.column_mappings = Some(mappings);
    }
    if !default_uom.is_empty() {
        options.default_uom = Some(default_uom);
    }

    Ok(CliArgs {
        file: file.ok_or_else(|| anyhow!("缺少文件参数\n{}", usage()))?,
        db_path,
        options,
        log_json,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args(std::env::args().skip(1))?;

    if args.log_json {
        logging::init_json();
    } else {
        logging::init();
    }
    tracing::info!("碳排放数据导入系统 v{}", emission_import::VERSION);

    let db_path = args.db_path.unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path).await.map_err(|e| anyhow!(e))?;

    let file = FileInput::from_path(&args.file)
        .await
        .with_context(|| format!("无法读取文件 {}", args.file))?;

    let result = state.import_file(file, args.options).await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.success && !result.is_paused() {
        std::process::exit(1);
    }
    Ok(())
}
