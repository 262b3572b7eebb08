use crate::classify::{category_for, classify, priority_for, rec_type_for, title_for};
use crate::error::EngineError;
use crate::render::render;
use crate::runner::{RuleRunner, SystemContext};
use crate::{ConditionEvaluator, RecommendationSink, RuleCatalog};
use agrimon_common::types::{
    ActionType, Category, GeneratedItem, Hit, Priority, Rule, Severity, WriteStats,
};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn make_rule(code: &str, severity: Severity, action_type: ActionType, template: &str) -> Rule {
    Rule {
        id: format!("id-{code}"),
        code: code.to_string(),
        name: format!("Règle {code}"),
        condition_sql: "SELECT 1".to_string(),
        message_template: template.to_string(),
        severity,
        action_type,
    }
}

fn make_hit(producer_id: &str, fields: &[(&str, Value)]) -> Hit {
    let mut map = Map::new();
    map.insert("producer_id".to_string(), json!(producer_id));
    for (k, v) in fields {
        map.insert(k.to_string(), v.clone());
    }
    Hit {
        producer_id: producer_id.to_string(),
        fields: map,
    }
}

// ---- Port fakes ----

struct StaticCatalog(Vec<Rule>);

#[async_trait]
impl RuleCatalog for StaticCatalog {
    async fn list_active_rules(&self) -> Result<Vec<Rule>> {
        Ok(self.0.clone())
    }
}

struct FailingCatalog;

#[async_trait]
impl RuleCatalog for FailingCatalog {
    async fn list_active_rules(&self) -> Result<Vec<Rule>> {
        Err(anyhow!("connection refused"))
    }
}

#[derive(Default)]
struct FakeEvaluator {
    hits: HashMap<String, Vec<Hit>>,
    failing: HashSet<String>,
    slow: HashSet<String>,
}

impl FakeEvaluator {
    fn with_hits(code: &str, hits: Vec<Hit>) -> Self {
        let mut ev = Self::default();
        ev.hits.insert(code.to_string(), hits);
        ev
    }

    fn add_hits(mut self, code: &str, hits: Vec<Hit>) -> Self {
        self.hits.insert(code.to_string(), hits);
        self
    }

    fn add_failing(mut self, code: &str) -> Self {
        self.failing.insert(code.to_string());
        self
    }

    fn add_slow(mut self, code: &str) -> Self {
        self.slow.insert(code.to_string());
        self
    }
}

#[async_trait]
impl ConditionEvaluator for FakeEvaluator {
    async fn evaluate(&self, rule: &Rule) -> Result<Vec<Hit>> {
        if self.failing.contains(&rule.code) {
            return Err(anyhow!("no such column: emergence_percent"));
        }
        if self.slow.contains(&rule.code) {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        Ok(self.hits.get(&rule.code).cloned().unwrap_or_default())
    }
}

/// In-memory sink mirroring the store's dedup policy: one pending row per
/// (rule_code, producer_id).
#[derive(Default)]
struct MemorySink {
    rows: Mutex<Vec<GeneratedItem>>,
}

#[async_trait]
impl RecommendationSink for MemorySink {
    async fn write_all(&self, _generated_by: &str, items: &[GeneratedItem]) -> WriteStats {
        let mut rows = self.rows.lock().unwrap();
        let mut stats = WriteStats::default();
        for item in items {
            let duplicate = rows
                .iter()
                .any(|r| r.rule_code == item.rule_code && r.producer_id == item.producer_id);
            if duplicate {
                stats.duplicates += 1;
            } else {
                rows.push(item.clone());
                stats.written += 1;
            }
        }
        stats
    }
}

fn make_runner(
    catalog: impl RuleCatalog + 'static,
    evaluator: impl ConditionEvaluator + 'static,
    sink: Arc<MemorySink>,
) -> RuleRunner {
    RuleRunner::new(
        Arc::new(catalog),
        Arc::new(evaluator),
        sink,
        Duration::from_secs(5),
        SystemContext::new("engine-test"),
    )
}

// ---- Classifier ----

#[test]
fn severity_maps_to_priority() {
    assert_eq!(priority_for(Severity::Critical), Priority::Urgent);
    assert_eq!(priority_for(Severity::High), Priority::High);
    assert_eq!(priority_for(Severity::Medium), Priority::Medium);
    assert_eq!(priority_for(Severity::Info), Priority::Low);
}

#[test]
fn unrecognized_severity_parses_to_medium_default() {
    // The catalog adapter parses leniently; anything unknown lands on
    // medium and therefore on medium priority.
    let severity: Severity = "tres-grave".parse().unwrap_or(Severity::Medium);
    assert_eq!(severity, Severity::Medium);
    assert_eq!(priority_for(severity), Priority::Medium);
}

#[test]
fn explicit_alert_action_forces_alert_category() {
    let rule = make_rule("R-1", Severity::High, ActionType::Alert, "m");
    assert_eq!(category_for(&rule), Category::Alert);
}

#[test]
fn critical_severity_forces_alert_even_for_recommendation_action() {
    let rule = make_rule("R-2", Severity::Critical, ActionType::Recommendation, "m");
    let c = classify(&rule);
    assert_eq!(c.category, Category::Alert);
    assert_eq!(c.priority, Priority::Urgent);
}

#[test]
fn non_critical_non_alert_is_recommendation() {
    for action in [
        ActionType::Notification,
        ActionType::Warning,
        ActionType::Recommendation,
    ] {
        for severity in [Severity::Info, Severity::Medium, Severity::High] {
            let rule = make_rule("R-3", severity, action, "m");
            assert_eq!(category_for(&rule), Category::Recommendation);
        }
    }
}

#[test]
fn title_prefix_always_agrees_with_category() {
    for action in [
        ActionType::Alert,
        ActionType::Notification,
        ActionType::Warning,
        ActionType::Recommendation,
    ] {
        for severity in [
            Severity::Info,
            Severity::Medium,
            Severity::High,
            Severity::Critical,
        ] {
            let rule = make_rule("R-4", severity, action, "m");
            let category = category_for(&rule);
            let title = title_for(&rule, category);
            assert!(
                title.starts_with(category.title_prefix()),
                "title '{title}' must start with '{}'",
                category.title_prefix()
            );
        }
    }
}

#[test]
fn rec_type_buckets_are_total() {
    assert_eq!(rec_type_for(ActionType::Alert), "traitement");
    assert_eq!(rec_type_for(ActionType::Warning), "surveillance");
    assert_eq!(rec_type_for(ActionType::Notification), "information");
    assert_eq!(rec_type_for(ActionType::Recommendation), "fertilisation");
}

// ---- Renderer ----

#[test]
fn render_substitutes_hit_fields() {
    let hit = make_hit(
        "P1",
        &[
            ("producer_name", json!("Awa Diallo")),
            ("crop_name", json!("Maïs")),
            ("emergence_percent", json!(42.5)),
        ],
    );
    let message = render(
        "Levée de {emergence_percent}% sur {crop_name} chez {producer_name}",
        &hit,
    );
    assert_eq!(message, "Levée de 42.5% sur Maïs chez Awa Diallo");
}

#[test]
fn render_falls_back_for_missing_context_fields() {
    let hit = make_hit("P1", &[]);
    let message = render("Surveillez {crop_name} sur {plot_name}", &hit);
    assert!(!message.is_empty());
    assert!(message.contains("Culture"));
    assert!(message.contains("Parcelle"));
}

#[test]
fn render_falls_back_when_context_field_is_null() {
    let hit = make_hit("P1", &[("crop_name", json!(null))]);
    let message = render("Culture affectée : {crop_name}", &hit);
    assert!(message.contains("Culture"));
}

#[test]
fn render_leaves_unknown_placeholders_untouched() {
    let hit = make_hit("P1", &[("crop_name", json!("Riz"))]);
    let message = render("{crop_name} / {champ_inconnu}", &hit);
    assert_eq!(message, "Riz / {champ_inconnu}");
}

// ---- Runner ----

#[tokio::test]
async fn single_hit_generates_classified_alert() {
    let rule = make_rule(
        "R-EMERGENCE-LOW",
        Severity::High,
        ActionType::Alert,
        "Levée faible sur {crop_name}",
    );
    let hit = make_hit("P1", &[("crop_name", json!("Maize"))]);
    let sink = Arc::new(MemorySink::default());
    let runner = make_runner(
        StaticCatalog(vec![rule]),
        FakeEvaluator::with_hits("R-EMERGENCE-LOW", vec![hit]),
        sink.clone(),
    );

    let summary = runner.run().await.unwrap();
    assert_eq!(summary.rules_evaluated, 1);
    assert_eq!(summary.total_generated, 1);
    assert_eq!(summary.alerts_generated, 1);
    assert_eq!(summary.recommendations_generated, 0);
    assert_eq!(summary.written, 1);

    let rows = sink.rows.lock().unwrap();
    let item = &rows[0];
    assert_eq!(item.category, Category::Alert);
    assert_eq!(item.priority, Priority::High);
    assert!(item.title.starts_with("🚨 ALERTE"));
    assert!(item.message.contains("Maize"));
    assert_eq!(item.rule_code, "R-EMERGENCE-LOW");
    assert_eq!(item.producer_id, "P1");
}

#[tokio::test]
async fn second_run_suppresses_duplicates() {
    let rule = make_rule("R-PEST-01", Severity::High, ActionType::Alert, "m");
    let hit = make_hit("P1", &[]);
    let sink = Arc::new(MemorySink::default());
    let runner = make_runner(
        StaticCatalog(vec![rule]),
        FakeEvaluator::with_hits("R-PEST-01", vec![hit]),
        sink.clone(),
    );

    let first = runner.run().await.unwrap();
    assert_eq!(first.written, 1);
    assert_eq!(first.duplicates_skipped, 0);

    // Unchanged dataset: the item is still "would-generate" but not
    // persisted a second time.
    let second = runner.run().await.unwrap();
    assert_eq!(second.total_generated, 1);
    assert_eq!(second.written, 0);
    assert_eq!(second.duplicates_skipped, 1);
    assert_eq!(sink.rows.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn zero_hit_rule_contributes_nothing_and_is_not_an_error() {
    let rule = make_rule("R-QUIET", Severity::Info, ActionType::Notification, "m");
    let sink = Arc::new(MemorySink::default());
    let runner = make_runner(
        StaticCatalog(vec![rule]),
        FakeEvaluator::default(),
        sink.clone(),
    );

    let summary = runner.run().await.unwrap();
    assert_eq!(summary.rules_evaluated, 1);
    assert_eq!(summary.total_generated, 0);
    assert_eq!(summary.alerts_generated, 0);
    assert_eq!(summary.recommendations_generated, 0);
    assert!(summary.rules[0].skipped.is_none());
}

#[tokio::test]
async fn failing_rule_is_isolated_from_siblings() {
    let broken = make_rule("R-BROKEN", Severity::High, ActionType::Alert, "m");
    let healthy = make_rule("R-OK", Severity::Medium, ActionType::Recommendation, "m");
    let sink = Arc::new(MemorySink::default());
    let evaluator = FakeEvaluator::with_hits("R-OK", vec![make_hit("P2", &[])]).add_failing("R-BROKEN");
    let runner = make_runner(StaticCatalog(vec![broken, healthy]), evaluator, sink.clone());

    let summary = runner.run().await.unwrap();
    assert_eq!(summary.rules_evaluated, 2);
    assert_eq!(summary.total_generated, 1);
    assert_eq!(summary.written, 1);

    let broken_detail = summary.rules.iter().find(|r| r.code == "R-BROKEN").unwrap();
    assert!(broken_detail.skipped.is_some());
    assert_eq!(broken_detail.generated, 0);

    let ok_detail = summary.rules.iter().find(|r| r.code == "R-OK").unwrap();
    assert!(ok_detail.skipped.is_none());
    assert_eq!(ok_detail.generated, 1);
    assert_eq!(sink.rows.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn catalog_failure_aborts_the_run() {
    let sink = Arc::new(MemorySink::default());
    let runner = make_runner(FailingCatalog, FakeEvaluator::default(), sink);

    let err = runner.run().await.unwrap_err();
    assert!(matches!(err, EngineError::CatalogUnavailable(_)));
    assert!(err.to_string().contains("connection refused"));
}

#[tokio::test]
async fn slow_evaluation_times_out_and_skips_the_rule() {
    let slow = make_rule("R-SLOW", Severity::Medium, ActionType::Warning, "m");
    let fast = make_rule("R-FAST", Severity::Info, ActionType::Notification, "m");
    let sink = Arc::new(MemorySink::default());
    let evaluator = FakeEvaluator::with_hits("R-FAST", vec![make_hit("P3", &[])]).add_slow("R-SLOW");
    let runner = RuleRunner::new(
        Arc::new(StaticCatalog(vec![slow, fast])),
        Arc::new(evaluator),
        sink.clone(),
        Duration::from_millis(50),
        SystemContext::new("engine-test"),
    );

    let summary = runner.run().await.unwrap();
    assert_eq!(summary.rules_evaluated, 2);
    let slow_detail = summary.rules.iter().find(|r| r.code == "R-SLOW").unwrap();
    assert!(slow_detail.skipped.as_deref().unwrap().contains("timed out"));
    assert_eq!(summary.written, 1);
}

#[tokio::test]
async fn cancelled_run_stops_issuing_evaluations() {
    let rules = vec![
        make_rule("R-A", Severity::Medium, ActionType::Recommendation, "m"),
        make_rule("R-B", Severity::Medium, ActionType::Recommendation, "m"),
    ];
    let sink = Arc::new(MemorySink::default());
    let evaluator = FakeEvaluator::default()
        .add_hits("R-A", vec![make_hit("P1", &[])])
        .add_hits("R-B", vec![make_hit("P2", &[])]);
    let runner = make_runner(StaticCatalog(rules), evaluator, sink.clone());

    let cancel = AtomicBool::new(true);
    let summary = runner.run_with_cancel(&cancel).await.unwrap();

    assert_eq!(summary.rules_evaluated, 2);
    assert_eq!(summary.total_generated, 0);
    assert!(summary
        .rules
        .iter()
        .all(|r| r.skipped.as_deref() == Some("cancelled")));
    assert!(sink.rows.lock().unwrap().is_empty());
}
