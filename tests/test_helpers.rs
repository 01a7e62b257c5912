// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库 / 内存版物料库 / 内存版 AI 缓存 / 脚本化模型 / 假工作簿
// ==========================================
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use emission_import::config::PipelineSettings;
use emission_import::domain::{
    normalize_description, AiClassificationResult, FileInput, MaterialLibraryEntry, ParsedFile,
    ParsedRecord,
};
use emission_import::importer::{
    FileProcessorImpl, ImportError, ImportResult, ParserRegistry, SpreadsheetParser,
};
use emission_import::llm::{CompletionRequest, GenerativeModel, LlmError, LlmResult};
use emission_import::repository::{
    ClassificationCache, MaterialRepository, RepositoryError, RepositoryResult,
};
use rusqlite::Connection;
use std::collections::HashMap;
use std::error::Error;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().ok_or("非 UTF-8 路径")?.to_string();

    let conn = Connection::open(&db_path)?;
    emission_import::db::init_schema(&conn)?;

    Ok((temp_file, db_path))
}

pub fn entry(
    id: &str,
    name: &str,
    aliases: &[&str],
    category: &str,
    standard_unit: &str,
    emission_factor: f64,
) -> MaterialLibraryEntry {
    MaterialLibraryEntry {
        id: id.to_string(),
        name: name.to_string(),
        aliases: aliases.iter().map(|a| a.to_string()).collect(),
        category: category.to_string(),
        standard_unit: standard_unit.to_string(),
        emission_factor,
    }
}

/// 测试物料库
pub fn sample_library() -> Vec<MaterialLibraryEntry> {
    vec![
        entry(
            "mat-elec",
            "Electricity (Grid Average)",
            &["grid electricity"],
            "Energy",
            "kWh",
            0.233,
        ),
        entry(
            "mat-diesel",
            "Diesel",
            &["diesel fuel", "gas oil"],
            "Fuel",
            "l",
            2.68,
        ),
        entry("mat-gas", "Natural Gas", &[], "Fuel", "m³", 2.02),
        entry("mat-steel", "Steel Rebar", &["rebar"], "Materials", "kg", 1.99),
        entry(
            "mat-freight",
            "Freight Transport (HGV)",
            &[],
            "Transport",
            "tonne-km",
            0.107,
        ),
    ]
}

// ==========================================
// InMemoryMaterialRepository - 内存版物料库
// ==========================================
pub struct InMemoryMaterialRepository {
    entries: Vec<MaterialLibraryEntry>,
    pub exact_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
    failing: AtomicBool,
    delay: Option<Duration>,
}

impl InMemoryMaterialRepository {
    pub fn new(entries: Vec<MaterialLibraryEntry>) -> Self {
        Self {
            entries,
            exact_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            delay: None,
        }
    }

    /// 每次调用都返回错误
    pub fn failing(entries: Vec<MaterialLibraryEntry>) -> Self {
        let repo = Self::new(entries);
        repo.failing.store(true, Ordering::SeqCst);
        repo
    }

    /// 每次调用前休眠
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn search_count(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    async fn before_call(&self) -> RepositoryResult<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::DatabaseConnectionError(
                "物料库不可用".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl MaterialRepository for InMemoryMaterialRepository {
    async fn find_by_name_or_alias(
        &self,
        name_or_alias: &str,
    ) -> RepositoryResult<Option<MaterialLibraryEntry>> {
        self.exact_calls.fetch_add(1, Ordering::SeqCst);
        self.before_call().await?;

        let needle = name_or_alias.trim();
        Ok(self
            .entries
            .iter()
            .find(|e| {
                e.name.eq_ignore_ascii_case(needle)
                    || e.aliases.iter().any(|a| a.eq_ignore_ascii_case(needle))
            })
            .cloned())
    }

    async fn text_search(
        &self,
        normalized_query: &str,
        limit: usize,
    ) -> RepositoryResult<Vec<MaterialLibraryEntry>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.before_call().await?;

        let tokens: Vec<&str> = normalized_query
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.chars().count() >= 2)
            .collect();

        Ok(self
            .entries
            .iter()
            .filter(|e| {
                let labels: Vec<String> = std::iter::once(&e.name)
                    .chain(e.aliases.iter())
                    .map(|l| l.to_lowercase())
                    .collect();
                tokens
                    .iter()
                    .any(|t| labels.iter().any(|l| l.contains(t)))
            })
            .take(limit)
            .cloned()
            .collect())
    }
}

// ==========================================
// InMemoryClassificationCache - 内存版 AI 缓存
// ==========================================
#[derive(Default)]
pub struct InMemoryClassificationCache {
    entries: Mutex<HashMap<String, AiClassificationResult>>,
    pub upserts: AtomicUsize,
}

impl InMemoryClassificationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn get_sync(&self, description: &str) -> Option<AiClassificationResult> {
        self.entries
            .lock()
            .ok()
            .and_then(|m| m.get(&normalize_description(description)).cloned())
    }
}

#[async_trait]
impl ClassificationCache for InMemoryClassificationCache {
    async fn get(
        &self,
        normalized_description: &str,
    ) -> RepositoryResult<Option<AiClassificationResult>> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        Ok(entries.get(normalized_description).cloned())
    }

    async fn upsert(
        &self,
        normalized_description: &str,
        result: &AiClassificationResult,
        _timestamp: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        entries.insert(normalized_description.to_string(), result.clone());
        Ok(())
    }
}

// ==========================================
// ScriptedModel - 脚本化生成式模型
// ==========================================
pub struct ScriptedModel {
    reply: Result<String, String>,
    delay: Option<Duration>,
    pub calls: AtomicUsize,
    pub last_prompt: Mutex<Option<String>>,
}

impl ScriptedModel {
    /// 固定返回文本
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            reply: Ok(text.into()),
            delay: None,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    /// 固定返回分类 JSON
    pub fn classifying(
        material_name: &str,
        category: &str,
        standard_unit: &str,
        emission_factor: f64,
        confidence: f64,
    ) -> Self {
        Self::replying(
            serde_json::json!({
                "material_name": material_name,
                "category": category,
                "standard_unit": standard_unit,
                "emission_factor": emission_factor,
                "confidence": confidence,
            })
            .to_string(),
        )
    }

    /// 固定返回请求错误
    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            delay: None,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn complete(&self, request: &CompletionRequest) -> LlmResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_prompt.lock() {
            *last = Some(request.prompt.clone());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reply.clone().map_err(LlmError::Request)
    }
}

// ==========================================
// FakeWorkbook - 内存工作簿（多工作表场景）
// ==========================================
pub struct FakeWorkbook {
    sheets: Vec<(String, Vec<Vec<String>>)>,
}

impl FakeWorkbook {
    pub fn new(sheets: Vec<(&str, Vec<Vec<&str>>)>) -> Self {
        Self {
            sheets: sheets
                .into_iter()
                .map(|(name, rows)| {
                    (
                        name.to_string(),
                        rows.into_iter()
                            .map(|r| r.into_iter().map(str::to_string).collect())
                            .collect(),
                    )
                })
                .collect(),
        }
    }
}

impl SpreadsheetParser for FakeWorkbook {
    fn sheet_names(&self, _file: &FileInput) -> ImportResult<Vec<String>> {
        Ok(self.sheets.iter().map(|(name, _)| name.clone()).collect())
    }

    fn parse_sheet(&self, _file: &FileInput, sheet: Option<&str>) -> ImportResult<ParsedFile> {
        let (_, rows) = match sheet {
            Some(name) => self
                .sheets
                .iter()
                .find(|(n, _)| n == name)
                .ok_or_else(|| ImportError::SheetNotFound(name.to_string()))?,
            None => self
                .sheets
                .first()
                .ok_or_else(|| ImportError::ExcelParseError("无工作表".to_string()))?,
        };

        let mut iter = rows.iter();
        let columns = iter.next().cloned().unwrap_or_default();
        let records = iter
            .map(|row| {
                columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect::<ParsedRecord>()
            })
            .collect();

        Ok(ParsedFile {
            records,
            columns,
            warnings: Vec::new(),
        })
    }
}

// ==========================================
// 处理器装配
// ==========================================
pub struct Harness {
    pub repo: Arc<InMemoryMaterialRepository>,
    pub cache: Arc<InMemoryClassificationCache>,
    pub model: Arc<ScriptedModel>,
    pub processor: FileProcessorImpl,
}

pub fn harness_with(
    repo: InMemoryMaterialRepository,
    model: ScriptedModel,
    settings: PipelineSettings,
) -> Harness {
    emission_import::logging::init_test();
    let repo = Arc::new(repo);
    let cache = Arc::new(InMemoryClassificationCache::new());
    let model = Arc::new(model);
    let processor = FileProcessorImpl::new(repo.clone(), cache.clone(), model.clone(), settings);
    Harness {
        repo,
        cache,
        model,
        processor,
    }
}

/// 默认物料库 + 返回无效内容的模型
pub fn harness() -> Harness {
    harness_with(
        InMemoryMaterialRepository::new(sample_library()),
        ScriptedModel::replying("not json"),
        PipelineSettings::default(),
    )
}

/// 替换为假工作簿
pub fn with_workbook(processor: FileProcessorImpl, workbook: FakeWorkbook) -> FileProcessorImpl {
    processor.with_parsers(ParserRegistry {
        spreadsheet: Box::new(workbook),
        ..ParserRegistry::default()
    })
}

pub fn csv_input(name: &str, content: &str) -> FileInput {
    FileInput::from_bytes(name, content.as_bytes().to_vec())
}
