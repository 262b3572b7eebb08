use agrimon_storage::{FarmStore, RuleFilter, RuleRow};
use chrono::Utc;

/// Default monitoring rule definitions for first-time startup.
struct RuleDef {
    code: &'static str,
    name: &'static str,
    description: &'static str,
    condition_sql: &'static str,
    message_template: &'static str,
    severity: &'static str,
    action_type: &'static str,
}

const DEFAULT_RULES: &[RuleDef] = &[
    RuleDef {
        code: "R-LEVEE-01",
        name: "Levée insuffisante",
        description: "Taux de levée observé sous 60% sur les 7 derniers jours",
        condition_sql: "
            SELECT p.id AS producer_id, p.name AS producer_name,
                   pl.crop_name AS crop_name, pl.name AS plot_name,
                   o.emergence_percent AS emergence_percent
            FROM observations o
            JOIN plots pl ON pl.id = o.plot_id
            JOIN producers p ON p.id = o.producer_id
            WHERE o.emergence_percent IS NOT NULL
              AND o.emergence_percent < 60
              AND julianday('now') - julianday(o.observed_at) <= 7",
        message_template: "Levée de {emergence_percent}% seulement sur la parcelle {plot_name} ({crop_name}). Un re-semis partiel est à envisager pour {producer_name}.",
        severity: "high",
        action_type: "alert",
    },
    RuleDef {
        code: "R-RAVAGEUR-01",
        name: "Pression ravageurs élevée",
        description: "Sévérité ravageurs >= 3 sur les 7 derniers jours",
        condition_sql: "
            SELECT p.id AS producer_id, p.name AS producer_name,
                   pl.crop_name AS crop_name, pl.name AS plot_name,
                   MAX(o.pest_severity) AS pest_severity
            FROM observations o
            JOIN plots pl ON pl.id = o.plot_id
            JOIN producers p ON p.id = o.producer_id
            WHERE o.pest_severity >= 3
              AND julianday('now') - julianday(o.observed_at) <= 7
            GROUP BY p.id, pl.id",
        message_template: "Pression ravageurs de niveau {pest_severity} détectée sur {plot_name} ({crop_name}). Un traitement rapide est recommandé.",
        severity: "critical",
        action_type: "alert",
    },
    RuleDef {
        code: "R-MALADIE-01",
        name: "Symptômes de maladie",
        description: "Sévérité maladie >= 2 sur les 7 derniers jours",
        condition_sql: "
            SELECT p.id AS producer_id, p.name AS producer_name,
                   pl.crop_name AS crop_name, pl.name AS plot_name,
                   MAX(o.disease_severity) AS disease_severity
            FROM observations o
            JOIN plots pl ON pl.id = o.plot_id
            JOIN producers p ON p.id = o.producer_id
            WHERE o.disease_severity >= 2
              AND julianday('now') - julianday(o.observed_at) <= 7
            GROUP BY p.id, pl.id",
        message_template: "Symptômes de maladie (niveau {disease_severity}) relevés sur {plot_name} ({crop_name}). Surveillez l'évolution et isolez les plants atteints.",
        severity: "high",
        action_type: "warning",
    },
    RuleDef {
        code: "R-IRRIGATION-01",
        name: "Stress hydrique",
        description: "Humidité du sol sous 20% sur les 3 derniers jours",
        condition_sql: "
            SELECT p.id AS producer_id, p.name AS producer_name,
                   pl.crop_name AS crop_name, pl.name AS plot_name,
                   MIN(o.soil_moisture_percent) AS soil_moisture_percent
            FROM observations o
            JOIN plots pl ON pl.id = o.plot_id
            JOIN producers p ON p.id = o.producer_id
            WHERE o.soil_moisture_percent IS NOT NULL
              AND o.soil_moisture_percent < 20
              AND julianday('now') - julianday(o.observed_at) <= 3
            GROUP BY p.id, pl.id",
        message_template: "Humidité du sol à {soil_moisture_percent}% sur {plot_name} ({crop_name}). Une irrigation est conseillée pour {producer_name}.",
        severity: "medium",
        action_type: "recommendation",
    },
    RuleDef {
        code: "R-SUIVI-01",
        name: "Parcelle sans observation récente",
        description: "Aucune observation depuis 14 jours",
        condition_sql: "
            SELECT p.id AS producer_id, p.name AS producer_name,
                   pl.crop_name AS crop_name, pl.name AS plot_name
            FROM plots pl
            JOIN producers p ON p.id = pl.producer_id
            WHERE NOT EXISTS (
                SELECT 1 FROM observations o
                WHERE o.plot_id = pl.id
                  AND julianday('now') - julianday(o.observed_at) <= 14
            )",
        message_template: "Aucune observation depuis deux semaines sur la parcelle {plot_name} ({crop_name}). Pensez à effectuer une visite de suivi.",
        severity: "info",
        action_type: "notification",
    },
];

/// Initialize default monitoring rules if the catalog is empty.
///
/// Only seeds when `count_rules() == 0`, so operator-managed catalogs are
/// never touched.
pub async fn init_default_rules(store: &FarmStore) -> anyhow::Result<usize> {
    let count = store.count_rules(&RuleFilter::default()).await?;
    if count > 0 {
        tracing::debug!(
            existing = count,
            "Monitoring rules already exist, skipping seed initialization"
        );
        return Ok(0);
    }

    let now = Utc::now();
    let mut inserted = 0usize;

    for def in DEFAULT_RULES {
        let row = RuleRow {
            id: agrimon_common::id::next_id(),
            code: def.code.to_string(),
            name: def.name.to_string(),
            description: Some(def.description.to_string()),
            condition_sql: def.condition_sql.to_string(),
            message_template: def.message_template.to_string(),
            severity: def.severity.to_string(),
            action_type: def.action_type.to_string(),
            enabled: true,
            source: "seed".to_string(),
            created_at: now,
            updated_at: now,
        };
        match store.insert_rule(&row).await {
            Ok(_) => {
                inserted += 1;
                tracing::info!(code = %def.code, name = %def.name, "Seeded monitoring rule");
            }
            Err(e) => {
                tracing::warn!(code = %def.code, error = %e, "Failed to seed monitoring rule");
            }
        }
    }

    tracing::info!(
        inserted,
        total = DEFAULT_RULES.len(),
        "Default monitoring rules initialized"
    );
    Ok(inserted)
}
