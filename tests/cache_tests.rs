// tests/cache_tests.rs

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use sprig_lang::cache::SWEEP_BATCH_SIZE;
use sprig_lang::{ApplyOptions, Engine, EngineConfig, Value};

fn transforms() -> Value {
    json!({"out": {"sum": "(: $a + $b :)", "label": "(: uc($name) :)"}}).into()
}

fn input() -> Value {
    json!({"a": 0.1, "b": 0.2, "name": "sprig"}).into()
}

#[test]
fn test_apply_fills_cache() {
    let engine = Engine::new();
    engine.apply(&input(), &transforms(), None, &ApplyOptions::default()).unwrap();
    assert_eq!(engine.cache().len(), 2);
    assert!(engine.cache().contains(" $a + $b "));
}

#[test]
fn test_clearing_cache_keeps_results() {
    let engine = Engine::new();
    let before = engine.apply(&input(), &transforms(), None, &ApplyOptions::default()).unwrap();
    engine.clear_expression_cache();
    assert!(engine.cache().is_empty());
    let after = engine.apply(&input(), &transforms(), None, &ApplyOptions::default()).unwrap();
    assert_eq!(before, after);
    assert_eq!(engine.cache().len(), 2);
}

#[test]
fn test_disabled_cache() {
    let engine = Engine::with_config(EngineConfig {
        use_expression_cache: false,
        ..EngineConfig::default()
    });
    let result = engine.apply(&input(), &transforms(), None, &ApplyOptions::default()).unwrap();
    assert_eq!(serde_json::Value::from(result), json!({"sum": 0.3, "label": "SPRIG"}));
    assert!(engine.cache().is_empty());

    engine.set_expression_cache(true);
    engine.evaluate("1 + 1", &Value::Null).unwrap();
    assert_eq!(engine.cache().len(), 1);
}

#[test]
fn test_parse_reuses_cached_ast() {
    let engine = Engine::new();
    let first = engine.parse("$a * 2").unwrap();
    let second = engine.parse("$a * 2").unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn test_discard_keeps_recent_entries() {
    let engine = Engine::new();
    engine.evaluate("1 + 1", &Value::Null).unwrap();
    let removed = engine.discard_expressions_older_than(Duration::from_secs(3600)).await;
    assert_eq!(removed, 0);
    assert_eq!(engine.cache().len(), 1);
}

#[tokio::test]
async fn test_discard_drops_stale_entries() {
    let engine = Engine::new();
    for i in 0..(SWEEP_BATCH_SIZE * 2 + 10) {
        engine.parse(&format!("{} + 1", i)).unwrap();
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
    engine.evaluate("'fresh'", &Value::Null).unwrap();

    let removed = engine.discard_expressions_older_than(Duration::from_millis(10)).await;
    assert_eq!(removed, SWEEP_BATCH_SIZE * 2 + 10);
    assert_eq!(engine.cache().len(), 1);
    assert!(engine.cache().contains("'fresh'"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sweep_runs_beside_evaluation() {
    let engine = std::sync::Arc::new(Engine::new());
    for i in 0..(SWEEP_BATCH_SIZE * 3) {
        engine.parse(&i.to_string()).unwrap();
    }

    let sweeper = {
        let engine = std::sync::Arc::clone(&engine);
        tokio::spawn(async move { engine.discard_expressions_older_than(Duration::ZERO).await })
    };
    let result = engine.evaluate("2 * 21", &Value::Null).unwrap();
    assert_eq!(result, Value::from(42));

    let removed = sweeper.await.unwrap();
    assert!(removed <= SWEEP_BATCH_SIZE * 3 + 1);
}
