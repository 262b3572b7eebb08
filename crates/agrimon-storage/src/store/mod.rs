use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection};

pub mod recommendation;
pub mod rule;

// ---- Public row types (re-exported from submodules) ----
pub use recommendation::{RecommendationFilter, RecommendationRow, RecommendationSummary};
pub use rule::{RuleFilter, RuleRow, RuleUpdate};

/// Unified access layer for the platform database.
///
/// All methods are `async fn` on top of SeaORM. The same store backs the
/// rule catalog, the recommendation writer, and (through
/// [`crate::evaluator::SqlConditionEvaluator`]) the condition executor,
/// so a single connection pool serves the whole engine.
pub struct FarmStore {
    pub(crate) db: DatabaseConnection,
}

impl FarmStore {
    /// Connect and initialize the database.
    ///
    /// `db_url` is a full connection URL supplied by the server config.
    /// SQLite example: `sqlite:///data/agrimon.db?mode=rwc`.
    ///
    /// Runs all pending `sea-orm-migration` migrations so the schema,
    /// including the pending-dedup unique index, is always current.
    pub async fn new(db_url: &str) -> Result<Self> {
        let db = Database::connect(db_url).await?;

        // WAL mode only applies to SQLite
        if db_url.starts_with("sqlite:") {
            db.execute_unprepared("PRAGMA journal_mode=WAL;").await?;
        }

        Migrator::up(&db, None).await?;

        tracing::info!(db_url = %db_url, "Initialized farm store (SeaORM)");
        Ok(Self { db })
    }

    /// Underlying connection reference, for submodules and the evaluator.
    pub(crate) fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Production condition evaluator bound to this store's connection.
    pub fn condition_evaluator(&self) -> crate::evaluator::SqlConditionEvaluator {
        crate::evaluator::SqlConditionEvaluator::new(self.db.clone())
    }
}
