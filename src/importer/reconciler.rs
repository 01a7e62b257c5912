// ==========================================
// 碳排放数据导入系统 - 记录对账器
// ==========================================
// 职责: 单行对账 = 物料匹配 → 单位标准化 → 置信度分层 → AI 兜底
// 红线: 单行失败不抛错，只落入分区并记录原因
// 红线: 每行只落入一个分区
// ==========================================
// 分层规则（auto = 0.8, review = 0.5 为默认值）:
// - conf > auto 且单位正常        → Matched
// - conf > auto 但单位需复核      → NeedsReview（needs_review = true）
// - review < conf ≤ auto          → NeedsReview
// - 其余: AI 阈值 > 0 时调用 AI
//   - AI conf ≥ AI 阈值           → Matched（> auto 且单位正常）/ NeedsReview
//   - AI conf < AI 阈值           → Unmatched（ai_processed = true）
// - AI 阈值 = 0                   → Unmatched，不调用 AI
// ==========================================

use crate::config::Thresholds;
use crate::domain::material::{ClassificationOutcome, MatchOutcome};
use crate::domain::record::{CanonicalRecord, ProcessedRecord};
use crate::domain::types::RecordBucket;
use crate::engine::ai_classifier::AiClassifier;
use crate::engine::material_matcher::MaterialMatcher;
use crate::engine::unit_converter::{QuantityInput, UnitConverter};
use std::collections::HashMap;
use tracing::{debug, instrument};

/// 单次处理的对账参数
#[derive(Debug, Clone, Copy)]
pub struct ReconcileContext<'a> {
    pub default_uom: Option<&'a HashMap<String, String>>,
    pub ai_threshold: f64,
}

impl<'a> ReconcileContext<'a> {
    /// 物料的默认单位（键不区分大小写）
    fn default_uom_for(&self, material: &str) -> Option<&'a str> {
        let defaults = self.default_uom?;
        defaults
            .get(material)
            .or_else(|| {
                defaults
                    .iter()
                    .find(|(k, _)| k.trim().eq_ignore_ascii_case(material))
                    .map(|(_, v)| v)
            })
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// 对账输出
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub record: ProcessedRecord,
    pub bucket: RecordBucket,
}

pub struct RecordReconciler {
    matcher: MaterialMatcher,
    classifier: AiClassifier,
    converter: UnitConverter,
    thresholds: Thresholds,
}

impl RecordReconciler {
    pub fn new(matcher: MaterialMatcher, classifier: AiClassifier, thresholds: Thresholds) -> Self {
        Self {
            matcher,
            classifier,
            converter: UnitConverter::new(),
            thresholds,
        }
    }

    #[instrument(skip(self, record, ctx), fields(row = record.row_number))]
    pub async fn reconcile(
        &self,
        record: CanonicalRecord,
        ctx: &ReconcileContext<'_>,
    ) -> Reconciled {
        let mut processed = ProcessedRecord::new(record);

        let Some(material) = processed.record.material.clone() else {
            processed.review_reasons.push("缺少物料描述".to_string());
            return Reconciled {
                record: processed,
                bucket: RecordBucket::Unmatched,
            };
        };

        // 源单位: 行内单位优先，其次默认单位
        let default_uom = ctx.default_uom_for(&material);
        let source_unit = processed
            .record
            .unit
            .clone()
            .or_else(|| default_uom.map(str::to_string));

        // 1. 物料库匹配
        let outcome = self.matcher.resolve(&material).await;
        if let MatchOutcome::Degraded(reason) = &outcome {
            processed.review_reasons.push(reason.clone());
        }

        if let Some(m) = outcome.into_match() {
            if m.confidence > self.thresholds.review {
                processed.material_id = Some(m.id.clone());
                processed.material_name = Some(m.name.clone());
                processed.category = Some(m.category.clone());
                processed.emission_factor = Some(m.emission_factor);
                processed.match_confidence = Some(m.confidence);

                // 2. 换算到物料标准单位
                self.normalize_quantity(
                    &mut processed,
                    source_unit.as_deref(),
                    Some(m.standard_unit.as_str()),
                );

                // 3. 分层
                let bucket = self.tier(&mut processed, m.confidence);
                debug!(confidence = m.confidence, bucket = %bucket, "物料库匹配完成");
                return Reconciled {
                    record: processed,
                    bucket,
                };
            }
            processed
                .review_reasons
                .push(format!("物料库最佳匹配置信度 {:.2} 过低", m.confidence));
        }

        // 4. AI 兜底
        if ctx.ai_threshold <= 0.0 {
            self.normalize_quantity(&mut processed, source_unit.as_deref(), default_uom);
            processed.review_reasons.push("未匹配到物料库条目".to_string());
            return Reconciled {
                record: processed,
                bucket: RecordBucket::Unmatched,
            };
        }

        let quantity = processed
            .record
            .quantity
            .as_deref()
            .and_then(|q| QuantityInput::from(q).to_f64());
        let (ai, ai_outcome) = self
            .classifier
            .classify(&material, quantity, source_unit.as_deref())
            .await;
        processed.ai_processed = true;
        if let ClassificationOutcome::Degraded(reason) = &ai_outcome {
            processed.review_reasons.push(format!("AI 分类降级: {}", reason));
        }

        if ai.confidence < ctx.ai_threshold {
            self.normalize_quantity(&mut processed, source_unit.as_deref(), default_uom);
            processed.match_confidence = Some(ai.confidence);
            processed.review_reasons.push(format!(
                "AI 置信度 {:.2} 低于阈值 {:.2}",
                ai.confidence, ctx.ai_threshold
            ));
            return Reconciled {
                record: processed,
                bucket: RecordBucket::Unmatched,
            };
        }

        processed.material_id = Some(ai.id.clone());
        processed.material_name = Some(ai.material_name.clone());
        processed.category = Some(ai.category.clone());
        processed.emission_factor = Some(ai.emission_factor);
        processed.match_confidence = Some(ai.confidence);
        self.normalize_quantity(
            &mut processed,
            source_unit.as_deref(),
            Some(ai.standard_unit.as_str()),
        );

        let bucket = self.tier(&mut processed, ai.confidence);
        debug!(confidence = ai.confidence, bucket = %bucket, "AI 分类对账完成");
        Reconciled {
            record: processed,
            bucket,
        }
    }

    /// 置信度分层（已超过复核阈值的情况）
    ///
    /// 落入 NeedsReview 的行一律置 needs_review（物料库与 AI 两条路径相同）
    fn tier(&self, processed: &mut ProcessedRecord, confidence: f64) -> RecordBucket {
        if confidence > self.thresholds.auto_match && !processed.needs_uom_review {
            return RecordBucket::Matched;
        }
        processed.needs_review = true;
        if confidence <= self.thresholds.auto_match {
            processed
                .review_reasons
                .push(format!("匹配置信度 {:.2} 需人工确认", confidence));
        }
        RecordBucket::NeedsReview
    }

    /// 数量标准化
    ///
    /// - target 为可识别单位: 按维度换算
    /// - target 无法识别: 仅当源单位与之相同（不区分大小写）时原样保留
    /// - target 为 None: 换算到源单位所在维度的标准单位
    fn normalize_quantity(
        &self,
        processed: &mut ProcessedRecord,
        source_unit: Option<&str>,
        target: Option<&str>,
    ) {
        let Some(raw_quantity) = processed.record.quantity.clone() else {
            self.flag_uom(processed, "缺少数量".to_string());
            return;
        };
        let Some(source_unit) = source_unit else {
            self.flag_uom(processed, "缺少计量单位".to_string());
            return;
        };

        if let Some(target) = target.filter(|t| !self.converter.is_supported(t)) {
            match QuantityInput::from(raw_quantity.as_str()).to_f64() {
                Some(amount) if source_unit.trim().eq_ignore_ascii_case(target.trim()) => {
                    processed.standard_quantity = Some(amount);
                    processed.standard_unit = Some(target.trim().to_string());
                }
                Some(_) => self.flag_uom(
                    processed,
                    format!("无法将 {} 换算为 {}", source_unit, target),
                ),
                None => self.flag_uom(processed, format!("数量无法解析: {}", raw_quantity)),
            }
            return;
        }

        let result = self
            .converter
            .convert(raw_quantity.as_str(), source_unit, target);
        if result.success {
            processed.standard_quantity = Some(result.value);
            processed.standard_unit = Some(result.to_unit);
        } else {
            let error = result.error.unwrap_or_else(|| "单位换算失败".to_string());
            self.flag_uom(processed, error);
        }
    }

    fn flag_uom(&self, processed: &mut ProcessedRecord, reason: String) {
        processed.needs_uom_review = true;
        processed.review_reasons.push(reason);
    }
}
