// ==========================================
// 碳排放数据导入系统 - 文件处理器实现
// ==========================================
// 职责: 整合导入流程，从上传文件到三个结果分区
// 流程: 格式识别 → 解析 → (多工作表暂停) → (预览短路) → 列映射 → 对账 → 汇总
// 红线: process_file 不返回 Err；结构性错误折叠为 failure 结果
// ==========================================

use crate::config::PipelineSettings;
use crate::domain::record::{
    CanonicalRecord, FileInput, ParsedFile, ProcessingOptions, ProcessingResult,
};
use crate::domain::types::{FileFormat, ProcessingMode, RecordBucket};
use crate::engine::ai_classifier::AiClassifier;
use crate::engine::material_matcher::MaterialMatcher;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::FieldMapper;
use crate::importer::file_parser::{CsvParser, DocumentParser, ExcelParser};
use crate::importer::file_processor_trait::{
    ColumnMapper, FileProcessor, RecordParser, SpreadsheetParser,
};
use crate::importer::json_parser::JsonParser;
use crate::importer::reconciler::{ReconcileContext, Reconciled, RecordReconciler};
use crate::llm::GenerativeModel;
use crate::repository::classification_cache_repo::ClassificationCache;
use crate::repository::material_library_repo::MaterialRepository;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

// ==========================================
// ParserRegistry - 按格式分派的解析器集合
// ==========================================
pub struct ParserRegistry {
    pub delimited: Box<dyn RecordParser>,
    pub spreadsheet: Box<dyn SpreadsheetParser>,
    pub json: Box<dyn RecordParser>,
    pub document: Box<dyn RecordParser>,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self {
            delimited: Box::new(CsvParser),
            spreadsheet: Box::new(ExcelParser),
            json: Box::new(JsonParser),
            document: Box::new(DocumentParser),
        }
    }
}

/// 解析阶段输出
enum ParseStage {
    Parsed(ParsedFile),
    NeedsSheetSelection(Vec<String>),
}

// ==========================================
// FileProcessorImpl - 文件处理器实现
// ==========================================
pub struct FileProcessorImpl {
    // 解析与映射组件
    parsers: ParserRegistry,
    column_mapper: Box<dyn ColumnMapper>,

    // 对账（匹配 + 换算 + AI 兜底）
    reconciler: RecordReconciler,

    settings: PipelineSettings,
}

impl FileProcessorImpl {
    /// 创建新的 FileProcessor 实例
    ///
    /// # 参数
    /// - material_repo: 物料库（只读）
    /// - cache: AI 分类缓存
    /// - model: 生成式模型
    /// - settings: 管道参数
    pub fn new(
        material_repo: Arc<dyn MaterialRepository>,
        cache: Arc<dyn ClassificationCache>,
        model: Arc<dyn GenerativeModel>,
        settings: PipelineSettings,
    ) -> Self {
        let matcher = MaterialMatcher::from_settings(material_repo, &settings);
        let classifier = AiClassifier::new(model, cache, settings.clone());
        let reconciler = RecordReconciler::new(matcher, classifier, settings.thresholds);

        Self {
            parsers: ParserRegistry::default(),
            column_mapper: Box::new(FieldMapper::new()),
            reconciler,
            settings,
        }
    }

    /// 替换解析器集合
    pub fn with_parsers(mut self, parsers: ParserRegistry) -> Self {
        self.parsers = parsers;
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// 阶段 1-2: 按格式解析
    fn parse(
        &self,
        file: &FileInput,
        format: FileFormat,
        selected_sheet: Option<&str>,
    ) -> ImportResult<ParseStage> {
        if file.bytes.is_empty() {
            return Err(ImportError::EmptyFile(file.file_name.clone()));
        }

        let parsed = match format {
            FileFormat::Delimited => self.parsers.delimited.parse(file)?,
            FileFormat::Json => self.parsers.json.parse(file)?,
            FileFormat::Document => self.parsers.document.parse(file)?,
            FileFormat::Spreadsheet => {
                let sheets = self.parsers.spreadsheet.sheet_names(file)?;
                debug!(sheets = ?sheets, "工作表列表");

                let sheet = match selected_sheet.map(str::trim).filter(|s| !s.is_empty()) {
                    Some(name) => {
                        if !sheets.iter().any(|s| s == name) {
                            return Err(ImportError::SheetNotFound(name.to_string()));
                        }
                        Some(name)
                    }
                    None if sheets.len() > 1 => {
                        return Ok(ParseStage::NeedsSheetSelection(sheets));
                    }
                    None => None,
                };
                self.parsers.spreadsheet.parse_sheet(file, sheet)?
            }
        };
        Ok(ParseStage::Parsed(parsed))
    }

    /// 阶段 5: 对账（标准模式顺序执行，批量模式有界并发且保持输入顺序）
    async fn reconcile_all(
        &self,
        records: Vec<CanonicalRecord>,
        mode: ProcessingMode,
        ctx: &ReconcileContext<'_>,
    ) -> Vec<Reconciled> {
        match mode {
            ProcessingMode::Bulk => {
                let concurrency = self.settings.bulk_concurrency.max(1);
                debug!(concurrency, "批量模式对账");
                stream::iter(records)
                    .map(|record| self.reconciler.reconcile(record, ctx))
                    .buffered(concurrency)
                    .collect()
                    .await
            }
            _ => {
                let mut results = Vec::with_capacity(records.len());
                for record in records {
                    results.push(self.reconciler.reconcile(record, ctx).await);
                }
                results
            }
        }
    }
}

#[async_trait]
impl FileProcessor for FileProcessorImpl {
    #[instrument(skip(self, file, options), fields(file_name = %file.file_name, mode = %options.mode))]
    async fn process_file(&self, file: FileInput, options: ProcessingOptions) -> ProcessingResult {
        let start_time = Instant::now();
        info!(size = file.size(), "开始处理导入文件");

        // AI 阈值校验
        let ai_threshold = options
            .ai_processing_threshold
            .unwrap_or(self.settings.ai_processing_threshold);
        if !(0.0..=1.0).contains(&ai_threshold) {
            warn!(ai_threshold, "AI 阈值超出范围");
            return ProcessingResult::failure(vec![format!(
                "AI 处理阈值必须位于 [0, 1]，实际为 {}",
                ai_threshold
            )]);
        }

        // 阶段 1: 格式识别
        let Some(format) = FileFormat::from_file_name(&file.file_name) else {
            let err = ImportError::UnsupportedFormat(file.extension());
            warn!(error = %err, "文件格式不支持");
            return ProcessingResult::failure(vec![err.to_string()]);
        };

        // 阶段 2: 解析
        let parsed = match self.parse(&file, format, options.selected_sheet.as_deref()) {
            Ok(ParseStage::Parsed(parsed)) => parsed,
            Ok(ParseStage::NeedsSheetSelection(sheets)) => {
                info!(sheet_count = sheets.len(), "文件包含多个工作表，等待选择");
                return ProcessingResult::paused(sheets);
            }
            Err(e) => {
                warn!(error = %e, "文件解析失败");
                return ProcessingResult::failure(vec![e.to_string()]);
            }
        };

        let ParsedFile {
            records,
            columns,
            mut warnings,
        } = parsed;
        let total_records = records.len();
        if total_records == 0 {
            warnings.push("文件中没有数据行".to_string());
        }

        // 阶段 3: 预览短路
        if options.mode == ProcessingMode::Preview {
            let preview_records: Vec<_> = records
                .into_iter()
                .take(self.settings.preview_row_limit)
                .collect();
            info!(
                total_records,
                preview_rows = preview_records.len(),
                "预览完成"
            );
            return ProcessingResult {
                success: true,
                preview_records,
                columns: Some(columns),
                total_records,
                warnings,
                ..Default::default()
            };
        }

        // 阶段 4: 列映射
        let canonical: Vec<CanonicalRecord> = records
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                self.column_mapper
                    .map_record(row, idx + 1, options.column_mappings.as_ref())
            })
            .collect();

        // 阶段 5: 对账
        let ctx = ReconcileContext {
            default_uom: options.default_uom.as_ref(),
            ai_threshold,
        };
        let reconciled = self.reconcile_all(canonical, options.mode, &ctx).await;

        // 阶段 6: 汇总
        let mut result = ProcessingResult {
            success: true,
            columns: Some(columns),
            total_records,
            warnings,
            ..Default::default()
        };
        for Reconciled { record, bucket } in reconciled {
            if record.ai_processed {
                result.ai_processed_count += 1;
            }
            match bucket {
                RecordBucket::Matched => result.matched.push(record),
                RecordBucket::NeedsReview => result.needs_review.push(record),
                RecordBucket::Unmatched => result.unmatched.push(record),
            }
        }

        info!(
            total_records,
            matched = result.matched.len(),
            needs_review = result.needs_review.len(),
            unmatched = result.unmatched.len(),
            ai_processed = result.ai_processed_count,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "导入文件处理完成"
        );
        result
    }
}
