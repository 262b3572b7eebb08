use crate::store::{FarmStore, RecommendationFilter, RuleFilter, RuleRow, RuleUpdate};
use crate::StorageError;
use agrimon_common::types::{
    ActionType, Category, GeneratedItem, Priority, RecommendationStatus, Rule, Severity,
};
use agrimon_engine::{ConditionEvaluator, RuleCatalog};
use chrono::Utc;
use sea_orm::ConnectionTrait;
use tempfile::TempDir;

async fn setup() -> (TempDir, FarmStore) {
    agrimon_common::id::init(1, 1);
    let dir = TempDir::new().unwrap();
    let db_url = format!("sqlite://{}/agrimon.db?mode=rwc", dir.path().display());
    let store = FarmStore::new(&db_url).await.unwrap();
    (dir, store)
}

fn make_rule_row(code: &str, severity: &str, action_type: &str, condition_sql: &str) -> RuleRow {
    let now = Utc::now();
    RuleRow {
        id: agrimon_common::id::next_id(),
        code: code.to_string(),
        name: format!("Règle {code}"),
        description: None,
        condition_sql: condition_sql.to_string(),
        message_template: "Message pour {producer_name}".to_string(),
        severity: severity.to_string(),
        action_type: action_type.to_string(),
        enabled: true,
        source: "test".to_string(),
        created_at: now,
        updated_at: now,
    }
}

fn make_item(rule_code: &str, producer_id: &str) -> GeneratedItem {
    GeneratedItem {
        title: format!("🚨 ALERTE {rule_code} : test"),
        message: "Message de test".to_string(),
        producer_id: producer_id.to_string(),
        rule_code: rule_code.to_string(),
        category: Category::Alert,
        priority: Priority::High,
        rec_type: "traitement".to_string(),
        status: RecommendationStatus::Pending,
    }
}

/// Seed a minimal farm dataset: two producers, a plot each, one
/// low-emergence observation for the first producer.
async fn seed_dataset(store: &FarmStore) {
    store
        .db()
        .execute_unprepared(
            "
        INSERT INTO producers (id, name, phone, cooperative, created_at, updated_at) VALUES
            ('P1', 'Awa Diallo', '+221770000001', 'Coop Nord', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z'),
            ('P2', 'Moussa Ba', '+221770000002', 'Coop Sud', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z');
        INSERT INTO plots (id, producer_id, name, crop_name, area_ha, sowing_date, created_at, updated_at) VALUES
            ('PL1', 'P1', 'Parcelle Est', 'Maïs', 1.5, '2026-06-01', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z'),
            ('PL2', 'P2', 'Parcelle Ouest', 'Riz', 2.0, '2026-06-10', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z');
        INSERT INTO observations (id, producer_id, plot_id, observed_at, emergence_percent, pest_severity, disease_severity, soil_moisture_percent, notes, created_at, updated_at) VALUES
            ('O1', 'P1', 'PL1', '2026-07-01T08:00:00Z', 42.0, 1.0, 0.0, 35.0, NULL, '2026-07-01T08:00:00Z', '2026-07-01T08:00:00Z'),
            ('O2', 'P2', 'PL2', '2026-07-01T09:00:00Z', 85.0, 0.0, 0.0, 40.0, NULL, '2026-07-01T09:00:00Z', '2026-07-01T09:00:00Z');
        ",
        )
        .await
        .unwrap();
}

const LOW_EMERGENCE_SQL: &str = "
    SELECT p.id AS producer_id, p.name AS producer_name,
           pl.crop_name AS crop_name, pl.name AS plot_name,
           o.emergence_percent AS emergence_percent
    FROM observations o
    JOIN plots pl ON pl.id = o.plot_id
    JOIN producers p ON p.id = o.producer_id
    WHERE o.emergence_percent IS NOT NULL AND o.emergence_percent < 60";

// ---- Rule catalog ----

#[tokio::test]
async fn insert_and_list_enabled_rules() {
    let (_dir, store) = setup().await;

    store
        .insert_rule(&make_rule_row("R-B", "high", "alert", "SELECT 1"))
        .await
        .unwrap();
    let mut disabled = make_rule_row("R-A", "info", "notification", "SELECT 1");
    disabled.enabled = false;
    store.insert_rule(&disabled).await.unwrap();

    let enabled = store.list_enabled_rules().await.unwrap();
    assert_eq!(enabled.len(), 1);
    assert_eq!(enabled[0].code, "R-B");

    let rules: Vec<Rule> = store.list_active_rules().await.unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].severity, Severity::High);
    assert_eq!(rules[0].action_type, ActionType::Alert);
}

#[tokio::test]
async fn unknown_severity_and_action_parse_leniently() {
    let (_dir, store) = setup().await;
    store
        .insert_rule(&make_rule_row("R-X", "grave", "panique", "SELECT 1"))
        .await
        .unwrap();

    let rules = store.list_active_rules().await.unwrap();
    assert_eq!(rules[0].severity, Severity::Medium);
    assert_eq!(rules[0].action_type, ActionType::Recommendation);
}

#[tokio::test]
async fn update_rule_preserves_code() {
    let (_dir, store) = setup().await;
    let inserted = store
        .insert_rule(&make_rule_row("R-U", "medium", "warning", "SELECT 1"))
        .await
        .unwrap();

    let update = RuleUpdate {
        name: Some("Nom mis à jour".to_string()),
        enabled: Some(false),
        ..Default::default()
    };
    let updated = store.update_rule(&inserted.id, &update).await.unwrap().unwrap();
    assert_eq!(updated.code, "R-U");
    assert_eq!(updated.name, "Nom mis à jour");
    assert!(!updated.enabled);

    let filter = RuleFilter {
        enabled_eq: Some(false),
        ..Default::default()
    };
    assert_eq!(store.count_rules(&filter).await.unwrap(), 1);
}

#[tokio::test]
async fn delete_rule_returns_whether_found() {
    let (_dir, store) = setup().await;
    let inserted = store
        .insert_rule(&make_rule_row("R-D", "info", "notification", "SELECT 1"))
        .await
        .unwrap();
    assert!(store.delete_rule(&inserted.id).await.unwrap());
    assert!(!store.delete_rule(&inserted.id).await.unwrap());
}

// ---- Recommendation writer ----

#[tokio::test]
async fn write_generated_suppresses_pending_duplicates() {
    let (_dir, store) = setup().await;
    let items = vec![make_item("R-PEST-01", "P1")];

    let first = store.write_generated("engine-test", &items).await;
    assert_eq!(first.written, 1);
    assert_eq!(first.duplicates, 0);

    let second = store.write_generated("engine-test", &items).await;
    assert_eq!(second.written, 0);
    assert_eq!(second.duplicates, 1);

    let total = store
        .count_recommendations(&RecommendationFilter::default())
        .await
        .unwrap();
    assert_eq!(total, 1);
}

#[tokio::test]
async fn resolved_rows_do_not_block_new_pending_entries() {
    let (_dir, store) = setup().await;
    let items = vec![make_item("R-PEST-01", "P1")];

    store.write_generated("engine-test", &items).await;
    let pending = store
        .list_recommendations(&RecommendationFilter::default(), 10, 0)
        .await
        .unwrap();
    store
        .set_recommendation_status(&pending[0].id, RecommendationStatus::Done)
        .await
        .unwrap();

    // The pair is no longer live, so the engine may surface it again.
    let again = store.write_generated("engine-test", &items).await;
    assert_eq!(again.written, 1);

    let total = store
        .count_recommendations(&RecommendationFilter::default())
        .await
        .unwrap();
    assert_eq!(total, 2);
}

#[tokio::test]
async fn different_producers_never_collide() {
    let (_dir, store) = setup().await;
    let items = vec![make_item("R-PEST-01", "P1"), make_item("R-PEST-01", "P2")];
    let stats = store.write_generated("engine-test", &items).await;
    assert_eq!(stats.written, 2);
    assert_eq!(stats.duplicates, 0);
}

#[tokio::test]
async fn set_status_on_missing_row_is_not_found() {
    let (_dir, store) = setup().await;
    let err = store
        .set_recommendation_status("missing", RecommendationStatus::Dismissed)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
}

#[tokio::test]
async fn list_recommendations_filters_by_status_and_category() {
    let (_dir, store) = setup().await;
    store
        .write_generated(
            "engine-test",
            &[make_item("R-1", "P1"), make_item("R-2", "P1")],
        )
        .await;
    let rows = store
        .list_recommendations(&RecommendationFilter::default(), 10, 0)
        .await
        .unwrap();
    store
        .set_recommendation_status(&rows[0].id, RecommendationStatus::Dismissed)
        .await
        .unwrap();

    let pending = RecommendationFilter {
        status_eq: Some("pending".to_string()),
        ..Default::default()
    };
    assert_eq!(store.count_recommendations(&pending).await.unwrap(), 1);

    let alerts = RecommendationFilter {
        category_eq: Some("alert".to_string()),
        ..Default::default()
    };
    assert_eq!(store.count_recommendations(&alerts).await.unwrap(), 2);
}

#[tokio::test]
async fn summary_tallies_by_status_category_priority() {
    let (_dir, store) = setup().await;
    store
        .write_generated(
            "engine-test",
            &[make_item("R-1", "P1"), make_item("R-2", "P2")],
        )
        .await;

    let summary = store.recommendation_summary().await.unwrap();
    assert_eq!(summary.total, 2);
    assert_eq!(summary.by_status.get("pending"), Some(&2));
    assert_eq!(summary.by_category.get("alert"), Some(&2));
    assert_eq!(summary.by_priority.get("high"), Some(&2));
}

// ---- Condition evaluator ----

fn make_domain_rule(code: &str, condition_sql: &str) -> Rule {
    Rule {
        id: format!("id-{code}"),
        code: code.to_string(),
        name: format!("Règle {code}"),
        condition_sql: condition_sql.to_string(),
        message_template: String::new(),
        severity: Severity::High,
        action_type: ActionType::Alert,
    }
}

#[tokio::test]
async fn evaluator_maps_matching_rows_to_hits() {
    let (_dir, store) = setup().await;
    seed_dataset(&store).await;
    let evaluator = store.condition_evaluator();

    let rule = make_domain_rule("R-LEVEE-01", LOW_EMERGENCE_SQL);
    let hits = evaluator.evaluate(&rule).await.unwrap();

    assert_eq!(hits.len(), 1);
    let hit = &hits[0];
    assert_eq!(hit.producer_id, "P1");
    assert_eq!(hit.field_text("producer_name").as_deref(), Some("Awa Diallo"));
    assert_eq!(hit.field_text("crop_name").as_deref(), Some("Maïs"));
    assert_eq!(hit.field_text("plot_name").as_deref(), Some("Parcelle Est"));
    assert_eq!(hit.field_text("emergence_percent").as_deref(), Some("42.0"));
}

#[tokio::test]
async fn evaluator_zero_matches_is_success() {
    let (_dir, store) = setup().await;
    seed_dataset(&store).await;
    let evaluator = store.condition_evaluator();

    let rule = make_domain_rule(
        "R-NONE",
        "SELECT id AS producer_id FROM producers WHERE name = 'personne'",
    );
    let hits = evaluator.evaluate(&rule).await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn evaluator_drops_rows_without_producer_id() {
    let (_dir, store) = setup().await;
    seed_dataset(&store).await;
    let evaluator = store.condition_evaluator();

    let rule = make_domain_rule("R-NOPID", "SELECT name FROM producers");
    let hits = evaluator.evaluate(&rule).await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn evaluator_surfaces_malformed_sql_as_error() {
    let (_dir, store) = setup().await;
    let evaluator = store.condition_evaluator();

    let rule = make_domain_rule("R-BAD", "SELECT nope FROM missing_table");
    assert!(evaluator.evaluate(&rule).await.is_err());
}
