use chrono::Utc;
use readiness_cache::*;
use readiness_core::{
    AnalysisMode, AnalysisReport, AnalysisSummary, BusinessContext, Clock, Depth, KnowledgeItem,
    LLMConfig, ManualClock,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn service() -> (Arc<ManualClock>, CacheService) {
    let clock = Arc::new(ManualClock::default());
    let service = CacheService::new(clock.clone() as Arc<dyn Clock>);
    (clock, service)
}

fn config_with_ttl(hours: i64) -> LLMConfig {
    let mut config = LLMConfig::default();
    config.cost_optimization.cache_ttl_hours = hours;
    config
}

fn report(id: &str) -> AnalysisReport {
    AnalysisReport {
        validation_id: id.to_string(),
        feature: "checkout".to_string(),
        mode: AnalysisMode::Auto,
        depth: Depth::Medium,
        summary: AnalysisSummary::default(),
        checklist: Vec::new(),
        layer_analysis: BTreeMap::new(),
        end_to_end_flows: Vec::new(),
        hub_url: String::new(),
        created_at: Utc::now(),
        completed_at: None,
    }
}

fn context() -> BusinessContext {
    BusinessContext {
        rules: vec![KnowledgeItem {
            id: "r1".to_string(),
            title: "Orders must have a total".to_string(),
            content: "Every order must have a positive total".to_string(),
        }],
        journeys: Vec::new(),
    }
}

#[test]
fn test_result_roundtrip_within_ttl() {
    let (clock, cache) = service();
    let config = config_with_ttl(1);
    let key = ResultKey::new("p1", "abc", Depth::Medium, AnalysisMode::Auto);

    cache.results.set(key.clone(), report("VAL-1"), &config);
    assert_eq!(cache.cache_size("p1"), 1);

    clock.advance(Duration::from_secs(59 * 60));
    let cached = cache.results.get(&key, &config).expect("entry within ttl");
    assert_eq!(cached.validation_id, "VAL-1");
    assert_eq!(cache.cache_hits("p1"), 1);
    assert_eq!(cache.cache_misses("p1"), 0);
}

#[test]
fn test_expired_result_is_miss_and_decrements_once() {
    let (clock, cache) = service();
    let config = config_with_ttl(1);
    let key = ResultKey::new("p1", "abc", Depth::Deep, AnalysisMode::Manual);

    cache.results.set(key.clone(), report("VAL-1"), &config);
    clock.advance(Duration::from_secs(2 * 3600));

    assert!(cache.results.get(&key, &config).is_none());
    assert_eq!(cache.cache_size("p1"), 0);
    // a second read of the same key must not push the counter below zero
    assert!(cache.results.get(&key, &config).is_none());
    assert_eq!(cache.cache_size("p1"), 0);
    assert_eq!(cache.cache_misses("p1"), 2);
}

#[test]
fn test_concurrent_reads_of_expired_keys_decrement_once_each() {
    const EXPIRED: usize = 16;
    const LIVE: usize = 4;
    const READERS: usize = 8;

    let (clock, cache) = service();
    let config = config_with_ttl(1);
    let expired: Vec<ResultKey> = (0..EXPIRED)
        .map(|i| ResultKey::new("p1", &format!("old-{i}"), Depth::Medium, AnalysisMode::Auto))
        .collect();
    for key in &expired {
        cache.results.set(key.clone(), report("VAL-old"), &config);
    }
    clock.advance(Duration::from_secs(2 * 3600));

    // live entries keep the counter above zero, so a second decrement would show
    for i in 0..LIVE {
        let key = ResultKey::new("p1", &format!("new-{i}"), Depth::Medium, AnalysisMode::Auto);
        cache.results.set(key, report("VAL-new"), &config);
    }
    assert_eq!(cache.cache_size("p1"), (EXPIRED + LIVE) as u64);

    std::thread::scope(|scope| {
        for _ in 0..READERS {
            scope.spawn(|| {
                for key in &expired {
                    assert!(cache.results.get(key, &config).is_none());
                }
            });
        }
    });

    assert_eq!(cache.cache_size("p1"), LIVE as u64);
    assert_eq!(cache.results.len(), LIVE);
    assert_eq!(cache.cache_misses("p1"), (EXPIRED * READERS) as u64);
    assert_eq!(cache.cache_hits("p1"), 0);
}

#[test]
fn test_overwrite_does_not_double_count() {
    let (_clock, cache) = service();
    let config = LLMConfig::default();
    let key = ResultKey::new("p1", "abc", Depth::Medium, AnalysisMode::Auto);

    cache.results.set(key.clone(), report("VAL-1"), &config);
    cache.results.set(key.clone(), report("VAL-2"), &config);
    assert_eq!(cache.cache_size("p1"), 1);
    assert_eq!(cache.results.get(&key, &config).unwrap().validation_id, "VAL-2");
}

#[test]
fn test_use_cache_disabled_records_miss_and_stores_nothing() {
    let (_clock, cache) = service();
    let mut config = LLMConfig::default();
    config.cost_optimization.use_cache = false;
    let key = ResultKey::new("p1", "abc", Depth::Medium, AnalysisMode::Auto);

    cache.results.set(key.clone(), report("VAL-1"), &config);
    assert!(cache.results.is_empty());
    assert!(cache.results.get(&key, &config).is_none());
    assert_eq!(cache.cache_misses("p1"), 1);
    assert_eq!(cache.cache_size("p1"), 0);
}

#[test]
fn test_non_positive_ttl_defaults_to_a_day() {
    let (clock, cache) = service();
    let config = config_with_ttl(0);
    let key = ContextKey::new("p1", "hash");

    cache.contexts.set(key.clone(), context(), &config);
    clock.advance(Duration::from_secs(23 * 3600));
    assert!(cache.contexts.get(&key, &config).is_some());
    clock.advance(Duration::from_secs(2 * 3600));
    assert!(cache.contexts.get(&key, &config).is_none());
}

#[test]
fn test_context_and_result_share_size_counter() {
    let (_clock, cache) = service();
    let config = LLMConfig::default();

    cache
        .contexts
        .set(ContextKey::new("p1", "hash"), context(), &config);
    cache.results.set(
        ResultKey::new("p1", "abc", Depth::Medium, AnalysisMode::Auto),
        report("VAL-1"),
        &config,
    );
    cache.responses.set(
        ResponseKey::new("fn main() {}", "logic", Depth::Medium),
        CachedResponse {
            text: "{}".to_string(),
            tokens_used: 10,
            model: "gpt-4".to_string(),
        },
        &config,
    );

    assert_eq!(cache.cache_size("p1"), 2);
    assert_eq!(cache.cache_size("p2"), 0);
}

#[test]
fn test_response_cache_key_is_content_addressed() {
    let (_clock, cache) = service();
    let config = LLMConfig::default();
    let response = CachedResponse {
        text: "{\"issues\":[]}".to_string(),
        tokens_used: 42,
        model: "gpt-3.5-turbo".to_string(),
    };

    cache.responses.set(
        ResponseKey::new("code", "logic_analysis", Depth::Medium),
        response.clone(),
        &config,
    );

    let same = ResponseKey::new("code", "logic_analysis", Depth::Medium);
    let other_depth = ResponseKey::new("code", "logic_analysis", Depth::Deep);
    assert_eq!(cache.responses.get("p1", &same, &config), Some(response));
    assert_eq!(cache.responses.get("p1", &other_depth, &config), None);
    assert_eq!(cache.hit_rate("p1"), 0.5);
}

#[test]
fn test_key_formats() {
    let result = ResultKey::new("p1", "abc", Depth::Deep, AnalysisMode::Manual);
    assert_eq!(result.to_string(), "analysis:p1:abc:deep:manual");
    let context = ContextKey::new("p1", "hash");
    assert_eq!(context.to_string(), "business:p1:hash");
}

#[test]
fn test_purge_expired_adjusts_size() {
    let (clock, cache) = service();
    let config = config_with_ttl(1);
    cache
        .contexts
        .set(ContextKey::new("p1", "old"), context(), &config);
    clock.advance(Duration::from_secs(30 * 60));
    cache
        .contexts
        .set(ContextKey::new("p1", "new"), context(), &config);
    clock.advance(Duration::from_secs(45 * 60));

    assert_eq!(cache.purge_expired(), 1);
    assert_eq!(cache.cache_size("p1"), 1);
}

#[tokio::test]
async fn test_janitor_sweeps_until_shutdown() {
    let clock = Arc::new(ManualClock::default());
    let cache = Arc::new(CacheService::new(clock.clone() as Arc<dyn Clock>));
    let config = config_with_ttl(1);
    cache.results.set(
        ResultKey::new("p1", "abc", Depth::Medium, AnalysisMode::Auto),
        report("VAL-1"),
        &config,
    );
    clock.advance(Duration::from_secs(2 * 3600));

    let shutdown = CancellationToken::new();
    let handle = CacheJanitor::new(cache.clone(), Duration::from_millis(10)).spawn(shutdown.clone());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(cache.results.is_empty());
    assert_eq!(cache.cache_size("p1"), 0);

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_janitor_with_zero_interval_still_runs() {
    let (_clock, cache) = service();
    let shutdown = CancellationToken::new();
    let handle = CacheJanitor::new(Arc::new(cache), Duration::ZERO).spawn(shutdown.clone());

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!handle.is_finished());

    shutdown.cancel();
    handle.await.unwrap();
}
