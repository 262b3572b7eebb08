use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m001_initial_schema"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.get_connection().execute_unprepared(UP_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(DOWN_SQL)
            .await?;
        Ok(())
    }
}

const UP_SQL: &str = "
PRAGMA journal_mode=WAL;

CREATE TABLE IF NOT EXISTS producers (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    phone TEXT,
    cooperative TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_producers_cooperative ON producers(cooperative);

CREATE TABLE IF NOT EXISTS plots (
    id TEXT PRIMARY KEY NOT NULL,
    producer_id TEXT NOT NULL,
    name TEXT NOT NULL,
    crop_name TEXT,
    area_ha REAL,
    sowing_date TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_plots_producer ON plots(producer_id);

CREATE TABLE IF NOT EXISTS observations (
    id TEXT PRIMARY KEY NOT NULL,
    producer_id TEXT NOT NULL,
    plot_id TEXT NOT NULL,
    observed_at TEXT NOT NULL,
    emergence_percent REAL,
    pest_severity REAL,
    disease_severity REAL,
    soil_moisture_percent REAL,
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_observations_plot ON observations(plot_id);
CREATE INDEX IF NOT EXISTS idx_observations_producer ON observations(producer_id);
CREATE INDEX IF NOT EXISTS idx_observations_observed_at ON observations(observed_at DESC);

CREATE TABLE IF NOT EXISTS monitoring_rules (
    id TEXT PRIMARY KEY NOT NULL,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    description TEXT,
    condition_sql TEXT NOT NULL,
    message_template TEXT NOT NULL,
    severity TEXT NOT NULL DEFAULT 'medium',
    action_type TEXT NOT NULL DEFAULT 'recommendation',
    enabled INTEGER NOT NULL DEFAULT 1,
    source TEXT NOT NULL DEFAULT 'api',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_monitoring_rules_code ON monitoring_rules(code);
CREATE INDEX IF NOT EXISTS idx_monitoring_rules_enabled ON monitoring_rules(enabled);

CREATE TABLE IF NOT EXISTS recommendations (
    id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    message TEXT NOT NULL,
    producer_id TEXT NOT NULL,
    rule_code TEXT NOT NULL,
    category TEXT NOT NULL,
    priority TEXT NOT NULL,
    rec_type TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    generated_by TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_recommendations_producer ON recommendations(producer_id);
CREATE INDEX IF NOT EXISTS idx_recommendations_status ON recommendations(status);
CREATE INDEX IF NOT EXISTS idx_recommendations_created_at ON recommendations(created_at DESC);

-- Authoritative dedup guard: at most one live (pending) entry per
-- (rule_code, producer_id). Resolved rows never collide.
CREATE UNIQUE INDEX IF NOT EXISTS idx_recommendations_pending_uniq
    ON recommendations(rule_code, producer_id) WHERE status = 'pending';
";

const DOWN_SQL: &str = "
DROP INDEX IF EXISTS idx_recommendations_pending_uniq;
DROP TABLE IF EXISTS recommendations;
DROP TABLE IF EXISTS monitoring_rules;
DROP TABLE IF EXISTS observations;
DROP TABLE IF EXISTS plots;
DROP TABLE IF EXISTS producers;
";
