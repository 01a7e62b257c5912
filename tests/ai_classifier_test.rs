// ==========================================
// 碳排放数据导入系统 - AiClassifier 集成测试
// ==========================================
// 覆盖: 缓存幂等 / 降级兜底 / 超时 / 提示词内容
// ==========================================

mod test_helpers;

use emission_import::config::PipelineSettings;
use emission_import::domain::ClassificationOutcome;
use emission_import::engine::AiClassifier;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use test_helpers::*;

fn classifier(model: ScriptedModel) -> (AiClassifier, Arc<ScriptedModel>, Arc<InMemoryClassificationCache>) {
    classifier_with(model, PipelineSettings::default())
}

fn classifier_with(
    model: ScriptedModel,
    settings: PipelineSettings,
) -> (AiClassifier, Arc<ScriptedModel>, Arc<InMemoryClassificationCache>) {
    let model = Arc::new(model);
    let cache = Arc::new(InMemoryClassificationCache::new());
    (
        AiClassifier::new(model.clone(), cache.clone(), settings),
        model,
        cache,
    )
}

#[tokio::test]
async fn test_repeat_classification_hits_cache() {
    let (classifier, model, cache) = classifier(ScriptedModel::classifying(
        "Cement", "Materials", "kg", 0.93, 0.85,
    ));

    let (first, first_outcome) = classifier.classify("Portland Cement", Some(10.0), Some("t")).await;
    let (second, second_outcome) = classifier.classify("  portland cement ", None, None).await;

    assert_eq!(first_outcome, ClassificationOutcome::Classified);
    assert_eq!(second_outcome, ClassificationOutcome::CacheHit);
    assert_eq!(first, second);
    assert_eq!(model.call_count(), 1);
    assert_eq!(cache.upserts.load(Ordering::SeqCst), 1);
    assert_eq!(first.material_name, "Cement");
    assert_eq!(first.confidence, 0.85);
}

#[tokio::test]
async fn test_model_error_returns_fallback() {
    let (classifier, _model, cache) = classifier(ScriptedModel::failing("connection refused"));

    let (result, outcome) = classifier.classify("Mystery widget", Some(3.0), Some("kg")).await;

    assert!(outcome.is_degraded());
    assert_eq!(result.material_name, "Mystery widget");
    assert_eq!(result.category, "Uncategorized");
    assert_eq!(result.standard_unit, "kg");
    assert_eq!(result.emission_factor, 0.0);
    assert_eq!(result.confidence, 0.1);
    assert!(result.id.starts_with("ai-"));
    assert_eq!(cache.len(), 0);
}

#[tokio::test]
async fn test_unparseable_output_returns_fallback_and_retries_next_time() {
    let (classifier, model, _cache) =
        classifier(ScriptedModel::replying("I think this is probably steel."));

    let first = classifier.process_material("Steel beam", None, None).await;
    let second = classifier.process_material("Steel beam", None, None).await;

    assert_eq!(first.confidence, 0.1);
    assert_eq!(first.standard_unit, "unit");
    assert_ne!(first.id, second.id);
    assert_eq!(model.call_count(), 2);
}

#[tokio::test]
async fn test_json_wrapped_in_prose_is_accepted() {
    let (classifier, _model, _cache) = classifier(ScriptedModel::replying(
        "Here is the classification:\n```json\n{\"material_name\": \"Office Paper\", \
         \"category\": \"Materials\", \"standard_unit\": \"kg\", \
         \"emission_factor\": \"0.92\", \"confidence\": 0.7}\n```",
    ));

    let (result, outcome) = classifier.classify("A4 paper", Some(5.0), Some("kg")).await;

    assert_eq!(outcome, ClassificationOutcome::Classified);
    assert_eq!(result.material_name, "Office Paper");
    assert_eq!(result.emission_factor, 0.92);
}

#[tokio::test]
async fn test_slow_model_times_out() {
    let settings = PipelineSettings {
        ai_timeout_ms: 20,
        ..Default::default()
    };
    let (classifier, _model, _cache) = classifier_with(
        ScriptedModel::classifying("Cement", "Materials", "kg", 0.93, 0.85)
            .with_delay(Duration::from_millis(500)),
        settings,
    );

    let (result, outcome) = classifier.classify("Cement", None, Some("t")).await;

    assert!(matches!(outcome, ClassificationOutcome::Degraded(ref r) if r.contains("超时")));
    assert_eq!(result.confidence, 0.1);
    assert_eq!(result.standard_unit, "t");
}

#[tokio::test]
async fn test_prompt_carries_description_quantity_and_unit() {
    let (classifier, model, _cache) = classifier(ScriptedModel::classifying(
        "Cement", "Materials", "kg", 0.93, 0.85,
    ));

    classifier.classify("Ready-mix concrete", Some(12.5), Some("m3")).await;

    let prompt = model.last_prompt.lock().unwrap().clone().unwrap();
    assert!(prompt.contains("Ready-mix concrete"));
    assert!(prompt.contains("12.5"));
    assert!(prompt.contains("m3"));
}
