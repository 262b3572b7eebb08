use agrimon_common::types::{value_text, Hit, Rule};
use agrimon_engine::ConditionEvaluator;
use anyhow::Result;
use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseConnection, FromQueryResult, JsonValue, Statement};

/// Production condition executor: runs a rule's `condition_sql` through
/// the database's own query engine and maps each returned row to a
/// [`Hit`].
///
/// This is a pass-through evaluator by design. Conditions are authored by
/// administrators with system-level access and must be read-only SELECTs;
/// the engine does not interpret them.
pub struct SqlConditionEvaluator {
    db: DatabaseConnection,
}

impl SqlConditionEvaluator {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ConditionEvaluator for SqlConditionEvaluator {
    async fn evaluate(&self, rule: &Rule) -> Result<Vec<Hit>> {
        let stmt = Statement::from_string(
            self.db.get_database_backend(),
            rule.condition_sql.clone(),
        );
        let rows = JsonValue::find_by_statement(stmt).all(&self.db).await?;

        let mut hits = Vec::with_capacity(rows.len());
        for row in rows {
            let JsonValue::Object(fields) = row else {
                continue;
            };
            let producer_id = fields.get("producer_id").and_then(value_text);
            match producer_id {
                Some(producer_id) if !producer_id.is_empty() => {
                    hits.push(Hit {
                        producer_id,
                        fields,
                    });
                }
                _ => {
                    // A hit without a producer is unusable; drop it loudly
                    // so the rule author can fix the condition.
                    tracing::warn!(
                        rule_code = %rule.code,
                        "Condition row has no producer_id, dropping hit"
                    );
                }
            }
        }
        Ok(hits)
    }
}
