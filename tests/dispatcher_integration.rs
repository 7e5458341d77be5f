//! End-to-end tests for the request dispatcher.
//!
//! Every test builds its own dispatcher over the built-in knowledge with a
//! `ManualClock`, so time only moves when a test advances it.

use ink_router::config::{parse_config, Config};
use ink_router::dispatcher::RequestDispatcher;
use ink_router::error::DispatchError;
use ink_router_core::{
    ConversationTurn, KnowledgeStore, ManualClock, PipelineCategory, Query, QueryContext, Role,
};
use std::sync::Arc;
use std::time::Duration;

const START_MS: u64 = 1_700_000_000_000;

fn setup(config: &Config) -> (RequestDispatcher, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(START_MS));
    let knowledge = Arc::new(KnowledgeStore::builtin().unwrap());
    let dispatcher = RequestDispatcher::new(config, knowledge, clock.clone());
    (dispatcher, clock)
}

fn default_setup() -> (RequestDispatcher, Arc<ManualClock>) {
    setup(&Config::minimal())
}

fn ctx() -> QueryContext {
    QueryContext::default()
}

// ─── Scenarios ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_style_question_answered_from_knowledge() {
    let (dispatcher, _clock) = default_setup();

    let outcome = dispatcher
        .process("tattoo_knowledge", "what is traditional tattoo style?", &ctx(), "c1")
        .await;

    assert!(outcome.success, "dispatch failed: {:?}", outcome.error);
    let result = outcome.result.unwrap();
    assert_eq!(result.category, PipelineCategory::Knowledge);
    assert!(result.answer.to_lowercase().contains("traditional"));
    assert!(result.confidence > 0.8);
    assert!(result.sources.iter().any(|s| s == "styles.traditional"));
    assert_eq!(outcome.metadata.category, Some(PipelineCategory::Knowledge));
    assert!(!outcome.metadata.cache_hit);
}

#[tokio::test]
async fn test_booking_question_routes_to_service_ops() {
    let (dispatcher, _clock) = default_setup();

    let outcome = dispatcher
        .process("tattoo_knowledge", "I want to book an appointment", &ctx(), "c1")
        .await;

    let result = outcome.result.unwrap();
    assert_eq!(result.category, PipelineCategory::ServiceOps);
    assert_ne!(result.category, PipelineCategory::Knowledge);
}

#[tokio::test]
async fn test_second_identical_call_is_cache_hit() {
    let (dispatcher, _clock) = default_setup();
    let q = "what is traditional tattoo style?";

    let first = dispatcher.process("tattoo_knowledge", q, &ctx(), "c1").await;
    let second = dispatcher.process("tattoo_knowledge", q, &ctx(), "c1").await;

    assert!(!first.metadata.cache_hit);
    assert!(second.metadata.cache_hit);
    assert!(second.metadata.elapsed_ms <= first.metadata.elapsed_ms);
    assert_eq!(first.result, second.result);
    assert_ne!(first.metadata.request_id, second.metadata.request_id);
}

#[tokio::test]
async fn test_101st_call_is_rate_limited() {
    let (dispatcher, _clock) = default_setup();

    for i in 0..100 {
        let outcome = dispatcher
            .process("tattoo_knowledge", "hello", &ctx(), "c1")
            .await;
        assert!(outcome.success, "call {} refused", i + 1);
    }

    let outcome = dispatcher
        .process("tattoo_knowledge", "hello", &ctx(), "c1")
        .await;
    assert!(!outcome.success);
    assert!(outcome.result.is_none());
    assert_eq!(outcome.metadata.rate_limit_remaining, Some(0));
    match outcome.error {
        Some(DispatchError::RateLimited {
            pipeline,
            reset_at_ms,
        }) => {
            assert_eq!(pipeline, "tattoo_knowledge");
            assert_eq!(reset_at_ms, START_MS + 3_600_000);
        }
        other => panic!("expected RateLimited, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unknown_pipeline_has_no_side_effects() {
    let (dispatcher, _clock) = default_setup();

    let outcome = dispatcher
        .process("nonexistent_pipeline", "hi", &ctx(), "c1")
        .await;

    assert!(!outcome.success);
    assert_eq!(
        outcome.error,
        Some(DispatchError::PipelineNotFound {
            pipeline: "nonexistent_pipeline".to_string()
        })
    );
    assert_eq!(outcome.metadata.rate_limit_remaining, None);
    assert_eq!(outcome.metadata.category, None);
    assert_eq!(dispatcher.rate_limit_windows(), 0);
    assert_eq!(dispatcher.cache_stats().size, 0);
}

// ─── Cache behaviour ────────────────────────────────────────────────

#[tokio::test]
async fn test_cache_entry_expires_after_ttl() {
    let (dispatcher, clock) = default_setup();
    let q = "how do I care for a new tattoo?";

    dispatcher.process("tattoo_knowledge", q, &ctx(), "c1").await;

    clock.advance(300_000);
    let at_ttl = dispatcher.process("tattoo_knowledge", q, &ctx(), "c1").await;
    assert!(at_ttl.metadata.cache_hit, "entry exactly at TTL is still valid");

    clock.advance(1);
    let after = dispatcher.process("tattoo_knowledge", q, &ctx(), "c1").await;
    assert!(!after.metadata.cache_hit);
}

#[tokio::test]
async fn test_cache_disabled_pipeline_never_hits() {
    let (dispatcher, _clock) = default_setup();

    for _ in 0..3 {
        let outcome = dispatcher.process("studio_chat", "hello", &ctx(), "c1").await;
        assert!(!outcome.metadata.cache_hit);
    }
    assert_eq!(dispatcher.cache_stats().size, 0);
}

#[tokio::test]
async fn test_cache_key_normalises_whitespace_and_case() {
    let (dispatcher, _clock) = default_setup();

    dispatcher
        .process("tattoo_knowledge", "What is Blackwork?", &ctx(), "c1")
        .await;
    let second = dispatcher
        .process("tattoo_knowledge", "  what   is blackwork? ", &ctx(), "c2")
        .await;

    assert!(second.metadata.cache_hit);
    let stats = dispatcher.cache_stats();
    assert_eq!(stats.size, 1);
    assert!(stats.keys[0].starts_with("tattoo_knowledge:"));
    assert!((stats.average_hit_rate - 1.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_mobile_context_caps_suggestions_and_splits_cache() {
    let (dispatcher, _clock) = default_setup();
    let q = "what is traditional tattoo style?";
    let mobile = QueryContext {
        mobile: true,
        ..QueryContext::default()
    };

    let desktop = dispatcher.process("tattoo_knowledge", q, &ctx(), "c1").await;
    let phone = dispatcher.process("tattoo_knowledge", q, &mobile, "c1").await;

    assert!(!phone.metadata.cache_hit);
    assert_eq!(desktop.result.unwrap().suggestions.len(), 4);
    assert_eq!(phone.result.unwrap().suggestions.len(), 3);
    assert_eq!(dispatcher.cache_stats().size, 2);
}

#[tokio::test]
async fn test_cache_evicts_oldest_at_capacity() {
    let mut config = Config::minimal();
    config.cache.max_size = 2;
    let (dispatcher, _clock) = setup(&config);

    for q in ["what is blackwork?", "what is realism?", "what is tribal?"] {
        dispatcher.process("tattoo_knowledge", q, &ctx(), "c1").await;
    }

    assert_eq!(dispatcher.cache_stats().size, 2);
    let again = dispatcher
        .process("tattoo_knowledge", "what is blackwork?", &ctx(), "c1")
        .await;
    assert!(!again.metadata.cache_hit);
    let newest = dispatcher
        .process("tattoo_knowledge", "what is tribal?", &ctx(), "c1")
        .await;
    assert!(newest.metadata.cache_hit);
}

#[tokio::test]
async fn test_clear_cache() {
    let (dispatcher, _clock) = default_setup();
    dispatcher.process("tattoo_knowledge", "hello", &ctx(), "c1").await;
    assert_eq!(dispatcher.cache_stats().size, 1);

    dispatcher.clear_cache();
    assert_eq!(dispatcher.cache_stats().size, 0);
    let outcome = dispatcher.process("tattoo_knowledge", "hello", &ctx(), "c1").await;
    assert!(!outcome.metadata.cache_hit);
}

// ─── Routing and pipelines ──────────────────────────────────────────

#[tokio::test]
async fn test_pinned_category_skips_routing() {
    let (dispatcher, _clock) = default_setup();

    let outcome = dispatcher
        .process("sales_assistant", "what is traditional tattoo style?", &ctx(), "c1")
        .await;

    assert_eq!(outcome.result.unwrap().category, PipelineCategory::Sales);
}

#[tokio::test]
async fn test_tie_routes_to_conversation() {
    let (dispatcher, _clock) = default_setup();

    let outcome = dispatcher
        .process("tattoo_knowledge", "book a watercolor", &ctx(), "c1")
        .await;

    assert_eq!(
        outcome.result.unwrap().category,
        PipelineCategory::Conversation
    );
}

#[tokio::test]
async fn test_routed_pipeline_reaches_every_domain() {
    let (dispatcher, _clock) = default_setup();
    let cases = [
        ("How do I care for a new tattoo?", PipelineCategory::Knowledge, "aftercare"),
        ("Is it normal for my tattoo to peel?", PipelineCategory::Knowledge, "aftercare"),
        ("What is dotwork?", PipelineCategory::Knowledge, "styles.geometric"),
        ("Tell me about irezumi", PipelineCategory::Knowledge, "styles.japanese"),
        ("Who are your artists?", PipelineCategory::ServiceOps, "studio"),
        ("Can a gift card cover the deposit?", PipelineCategory::Sales, "sales"),
    ];

    for (text, category, source) in cases {
        let outcome = dispatcher.process("tattoo_knowledge", text, &ctx(), "c1").await;
        let result = outcome.result.unwrap();
        assert_eq!(result.category, category, "{}", text);
        assert_eq!(result.sources, [source], "{}", text);
        assert!(result.confidence >= 0.8, "{}", text);
    }
}

#[tokio::test]
async fn test_empty_query_is_answered() {
    let (dispatcher, _clock) = default_setup();

    for pipeline in ["tattoo_knowledge", "studio_services", "sales_assistant", "studio_chat"] {
        let outcome = dispatcher.process(pipeline, "", &ctx(), "c1").await;
        let result = outcome.result.unwrap();
        assert!(!result.answer.is_empty());
        assert!((0.0..=1.0).contains(&result.confidence));
        assert!(result.suggestions.len() <= 4);
    }
}

#[tokio::test]
async fn test_history_changes_greeting() {
    let (dispatcher, _clock) = default_setup();
    let returning = QueryContext {
        history: vec![ConversationTurn {
            role: Role::User,
            content: "what is blackwork?".to_string(),
        }],
        mobile: false,
    };

    let first = dispatcher.process("studio_chat", "hello", &ctx(), "c1").await;
    let again = dispatcher.process("studio_chat", "hello", &returning, "c1").await;

    assert!(first.result.unwrap().answer.starts_with("Hi there!"));
    assert!(again.result.unwrap().answer.starts_with("Welcome back!"));
}

#[tokio::test]
async fn test_process_query_convenience() {
    let (dispatcher, _clock) = default_setup();
    let query = Query::new("do you sell gift cards?", "c9");

    let outcome = dispatcher.process_query("sales_assistant", &query).await;

    assert!(outcome.success);
    assert_eq!(outcome.metadata.pipeline, "sales_assistant");
    assert_eq!(outcome.metadata.timestamp_ms, START_MS);
    assert!(outcome.metadata.timestamp.starts_with("2023-11-14T"));
}

#[tokio::test]
async fn test_pipeline_info_and_list() {
    let (dispatcher, _clock) = default_setup();

    let info = dispatcher.pipeline_info("studio_services").unwrap();
    assert_eq!(info.category, Some(PipelineCategory::ServiceOps));
    assert!(dispatcher.pipeline_info("missing").is_none());

    let names: Vec<&str> = dispatcher.list_pipelines().iter().map(|(n, _)| *n).collect();
    assert_eq!(
        names,
        ["sales_assistant", "studio_chat", "studio_services", "tattoo_knowledge"]
    );
}

// ─── Rate limiting ──────────────────────────────────────────────────

#[tokio::test]
async fn test_rate_limit_from_config_and_window_reset() {
    let config = parse_config(
        r#"
        [rate_limit]
        window_secs = 1

        [pipelines.quotes]
        category = "sales"
        rate_limit = 3
        "#,
    )
    .unwrap();
    let (dispatcher, clock) = setup(&config);

    let mut allowed = Vec::new();
    for _ in 0..4 {
        let outcome = dispatcher.process("quotes", "price?", &ctx(), "c1").await;
        allowed.push(outcome.success);
    }
    assert_eq!(allowed, [true, true, true, false]);

    clock.advance(1_001);
    let outcome = dispatcher.process("quotes", "price?", &ctx(), "c1").await;
    assert!(outcome.success);
    assert_eq!(outcome.metadata.rate_limit_remaining, Some(2));
}

#[tokio::test]
async fn test_clients_are_limited_independently() {
    let config = parse_config("[pipelines.quotes]\ncategory = \"sales\"\nrate_limit = 1\n").unwrap();
    let (dispatcher, _clock) = setup(&config);

    assert!(dispatcher.process("quotes", "price?", &ctx(), "a").await.success);
    assert!(!dispatcher.process("quotes", "price?", &ctx(), "a").await.success);
    assert!(dispatcher.process("quotes", "price?", &ctx(), "b").await.success);
    assert_eq!(dispatcher.rate_limit_windows(), 2);
}

#[tokio::test]
async fn test_concurrent_requests_share_limits() {
    let config = parse_config("[pipelines.busy]\nrate_limit = 25\n").unwrap();
    let (dispatcher, _clock) = setup(&config);
    let dispatcher = Arc::new(dispatcher);

    let mut handles = Vec::new();
    for i in 0..40 {
        let d = dispatcher.clone();
        handles.push(tokio::spawn(async move {
            d.process("busy", &format!("hello {}", i), &QueryContext::default(), "c1")
                .await
                .success
        }));
    }

    let mut admitted = 0;
    for h in handles {
        if h.await.unwrap() {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 25);
}

// ─── Cleanup ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_sweep_removes_expired_entries_and_windows() {
    let (dispatcher, clock) = default_setup();
    dispatcher.process("tattoo_knowledge", "hello", &ctx(), "c1").await;

    clock.advance(3_600_001);
    let report = dispatcher.sweep();

    assert_eq!(report.expired_entries, 1);
    assert_eq!(report.pruned_windows, 1);
    assert_eq!(dispatcher.cache_stats().size, 0);
    assert_eq!(dispatcher.rate_limit_windows(), 0);
}

#[tokio::test]
async fn test_spawned_cleanup_runs_periodically() {
    let (dispatcher, clock) = default_setup();
    dispatcher.process("tattoo_knowledge", "hello", &ctx(), "c1").await;
    clock.advance(300_001);

    let handle = dispatcher.spawn_cleanup(Duration::from_millis(10));
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.abort();

    assert_eq!(dispatcher.cache_stats().size, 0);
}
