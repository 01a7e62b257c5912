// ==========================================
// 碳排放数据导入系统 - 物料匹配引擎
// ==========================================
// 职责: 将自由文本描述解析为物料库条目
// 流程: 精确命中（名称/别名）→ 候选检索 → 编辑距离打分
// 红线: 只读参考库；参考库故障不向上抛错，降级为 Degraded
// ==========================================

use crate::config::PipelineSettings;
use crate::domain::material::{
    normalize_description, MatchOutcome, MaterialLibraryEntry, MaterialMatch,
};
use crate::engine::similarity::similarity;
use crate::repository::material_library_repo::MaterialRepository;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

pub struct MaterialMatcher {
    repo: Arc<dyn MaterialRepository>,
    candidate_limit: usize,
    store_timeout: Duration,
}

impl MaterialMatcher {
    pub fn new(
        repo: Arc<dyn MaterialRepository>,
        candidate_limit: usize,
        store_timeout: Duration,
    ) -> Self {
        Self {
            repo,
            candidate_limit: candidate_limit.max(1),
            store_timeout,
        }
    }

    pub fn from_settings(repo: Arc<dyn MaterialRepository>, settings: &PipelineSettings) -> Self {
        Self::new(repo, settings.candidate_limit, settings.store_timeout())
    }

    /// 查找最佳匹配（未命中与降级均返回 None）
    pub async fn find_match(&self, description: &str) -> Option<MaterialMatch> {
        self.resolve(description).await.into_match()
    }

    /// 查找最佳匹配，保留降级原因
    #[instrument(skip(self), fields(limit = self.candidate_limit))]
    pub async fn resolve(&self, description: &str) -> MatchOutcome {
        let description = description.trim();
        if description.is_empty() {
            return MatchOutcome::NotFound;
        }

        // 1. 精确命中
        match timeout(self.store_timeout, self.repo.find_by_name_or_alias(description)).await {
            Ok(Ok(Some(entry))) => {
                debug!(material_id = %entry.id, "物料精确命中");
                return MatchOutcome::Found(MaterialMatch::exact(&entry));
            }
            Ok(Ok(None)) => {}
            Ok(Err(e)) => {
                warn!(error = %e, "物料库精确查询失败");
                return MatchOutcome::Degraded(format!("物料库查询失败: {}", e));
            }
            Err(_) => {
                warn!(timeout_ms = self.store_timeout.as_millis() as u64, "物料库精确查询超时");
                return MatchOutcome::Degraded("物料库查询超时".to_string());
            }
        }

        // 2. 候选检索 + 打分
        let normalized = normalize_description(description);
        let candidates = match timeout(
            self.store_timeout,
            self.repo.text_search(&normalized, self.candidate_limit),
        )
        .await
        {
            Ok(Ok(candidates)) => candidates,
            Ok(Err(e)) => {
                warn!(error = %e, "物料库候选检索失败");
                return MatchOutcome::Degraded(format!("物料库检索失败: {}", e));
            }
            Err(_) => {
                warn!(timeout_ms = self.store_timeout.as_millis() as u64, "物料库候选检索超时");
                return MatchOutcome::Degraded("物料库检索超时".to_string());
            }
        };

        match best_candidate(&normalized, &candidates) {
            Some((entry, score)) => {
                debug!(material_id = %entry.id, score, "物料模糊命中");
                MatchOutcome::Found(MaterialMatch::scored(entry, score))
            }
            None => MatchOutcome::NotFound,
        }
    }
}

/// 候选得分 = 名称与各别名相似度的最大值
fn candidate_score(normalized: &str, entry: &MaterialLibraryEntry) -> f64 {
    std::iter::once(&entry.name)
        .chain(entry.aliases.iter())
        .map(|label| similarity(normalized, &label.to_lowercase()))
        .fold(0.0, f64::max)
}

/// 得分最高者；同分保持检索顺序
fn best_candidate<'a>(
    normalized: &str,
    candidates: &'a [MaterialLibraryEntry],
) -> Option<(&'a MaterialLibraryEntry, f64)> {
    let mut scored: Vec<(&MaterialLibraryEntry, f64)> = candidates
        .iter()
        .map(|entry| (entry, candidate_score(normalized, entry)))
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.into_iter().next()
}
