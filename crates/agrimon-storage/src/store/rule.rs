use agrimon_common::types::{ActionType, Rule, Severity};
use agrimon_engine::RuleCatalog;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};

use crate::entities::monitoring_rule::{self, Column, Entity};
use crate::store::FarmStore;

/// Monitoring rule row (monitoring_rules table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleRow {
    pub id: String,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub condition_sql: String,
    pub message_template: String,
    pub severity: String,
    pub action_type: String,
    pub enabled: bool,
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RuleRow {
    /// Convert a stored row into the engine's rule type.
    ///
    /// Severity and action type are stored as free text; unknown values
    /// parse leniently (medium severity, recommendation action) so a
    /// mistyped catalog entry degrades instead of breaking the run.
    pub fn to_rule(&self) -> Rule {
        let severity = self.severity.parse().unwrap_or_else(|_| {
            tracing::warn!(
                code = %self.code,
                severity = %self.severity,
                "Unknown severity, defaulting to medium"
            );
            Severity::Medium
        });
        let action_type = self.action_type.parse().unwrap_or_else(|_| {
            tracing::warn!(
                code = %self.code,
                action_type = %self.action_type,
                "Unknown action type, defaulting to recommendation"
            );
            ActionType::Recommendation
        });
        Rule {
            id: self.id.clone(),
            code: self.code.clone(),
            name: self.name.clone(),
            condition_sql: self.condition_sql.clone(),
            message_template: self.message_template.clone(),
            severity,
            action_type,
        }
    }
}

/// Rule update request; `None` fields are left unchanged. `code` is
/// immutable by design, it is the dedup and traceability key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub condition_sql: Option<String>,
    pub message_template: Option<String>,
    pub severity: Option<String>,
    pub action_type: Option<String>,
    pub enabled: Option<bool>,
}

/// Rule list filter.
#[derive(Debug, Clone, Default)]
pub struct RuleFilter {
    pub code_contains: Option<String>,
    pub name_contains: Option<String>,
    pub severity_eq: Option<String>,
    pub action_type_eq: Option<String>,
    pub enabled_eq: Option<bool>,
}

fn to_row(m: monitoring_rule::Model) -> RuleRow {
    RuleRow {
        id: m.id,
        code: m.code,
        name: m.name,
        description: m.description,
        condition_sql: m.condition_sql,
        message_template: m.message_template,
        severity: m.severity,
        action_type: m.action_type,
        enabled: m.enabled,
        source: m.source,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

fn apply_filter(
    mut q: sea_orm::Select<Entity>,
    filter: &RuleFilter,
) -> sea_orm::Select<Entity> {
    if let Some(v) = &filter.code_contains {
        q = q.filter(Column::Code.contains(v));
    }
    if let Some(v) = &filter.name_contains {
        q = q.filter(Column::Name.contains(v));
    }
    if let Some(v) = &filter.severity_eq {
        q = q.filter(Column::Severity.eq(v));
    }
    if let Some(v) = &filter.action_type_eq {
        q = q.filter(Column::ActionType.eq(v));
    }
    if let Some(v) = filter.enabled_eq {
        q = q.filter(Column::Enabled.eq(v));
    }
    q
}

impl FarmStore {
    pub async fn insert_rule(&self, row: &RuleRow) -> Result<RuleRow> {
        let now = Utc::now().fixed_offset();
        let am = monitoring_rule::ActiveModel {
            id: Set(row.id.clone()),
            code: Set(row.code.clone()),
            name: Set(row.name.clone()),
            description: Set(row.description.clone()),
            condition_sql: Set(row.condition_sql.clone()),
            message_template: Set(row.message_template.clone()),
            severity: Set(row.severity.clone()),
            action_type: Set(row.action_type.clone()),
            enabled: Set(row.enabled),
            source: Set(row.source.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        Ok(to_row(model))
    }

    pub async fn get_rule_by_id(&self, id: &str) -> Result<Option<RuleRow>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        Ok(model.map(to_row))
    }

    pub async fn get_rule_by_code(&self, code: &str) -> Result<Option<RuleRow>> {
        let model = Entity::find()
            .filter(Column::Code.eq(code))
            .one(self.db())
            .await?;
        Ok(model.map(to_row))
    }

    pub async fn list_rules(
        &self,
        filter: &RuleFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<RuleRow>> {
        let rows = apply_filter(Entity::find(), filter)
            .order_by(Column::CreatedAt, Order::Desc)
            .limit(limit as u64)
            .offset(offset as u64)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(to_row).collect())
    }

    pub async fn count_rules(&self, filter: &RuleFilter) -> Result<u64> {
        Ok(apply_filter(Entity::find(), filter).count(self.db()).await?)
    }

    pub async fn update_rule(&self, id: &str, update: &RuleUpdate) -> Result<Option<RuleRow>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        if let Some(m) = model {
            let now = Utc::now().fixed_offset();
            let mut am: monitoring_rule::ActiveModel = m.into();
            if let Some(v) = &update.name {
                am.name = Set(v.clone());
            }
            if let Some(v) = &update.description {
                am.description = Set(v.clone());
            }
            if let Some(v) = &update.condition_sql {
                am.condition_sql = Set(v.clone());
            }
            if let Some(v) = &update.message_template {
                am.message_template = Set(v.clone());
            }
            if let Some(v) = &update.severity {
                am.severity = Set(v.clone());
            }
            if let Some(v) = &update.action_type {
                am.action_type = Set(v.clone());
            }
            if let Some(v) = update.enabled {
                am.enabled = Set(v);
            }
            am.updated_at = Set(now);
            let updated = am.update(self.db()).await?;
            Ok(Some(to_row(updated)))
        } else {
            Ok(None)
        }
    }

    pub async fn delete_rule(&self, id: &str) -> Result<bool> {
        let res = Entity::delete_by_id(id).exec(self.db()).await?;
        Ok(res.rows_affected > 0)
    }

    /// All enabled rules, ordered by code for stable reporting.
    pub async fn list_enabled_rules(&self) -> Result<Vec<RuleRow>> {
        let rows = Entity::find()
            .filter(Column::Enabled.eq(true))
            .order_by(Column::Code, Order::Asc)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(to_row).collect())
    }
}

#[async_trait]
impl RuleCatalog for FarmStore {
    async fn list_active_rules(&self) -> Result<Vec<Rule>> {
        let rows = self.list_enabled_rules().await?;
        Ok(rows.iter().map(RuleRow::to_rule).collect())
    }
}
