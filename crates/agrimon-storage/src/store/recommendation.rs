use agrimon_common::types::{GeneratedItem, RecommendationStatus, WriteStats};
use agrimon_engine::error::EngineError;
use agrimon_engine::RecommendationSink;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, SqlErr,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::entities::recommendation::{self, Column, Entity};
use crate::error::StorageError;
use crate::store::FarmStore;

/// Persisted recommendation/alert row (recommendations table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRow {
    pub id: String,
    pub title: String,
    pub message: String,
    pub producer_id: String,
    pub rule_code: String,
    pub category: String,
    pub priority: String,
    pub rec_type: String,
    pub status: String,
    pub generated_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Recommendation list filter.
#[derive(Debug, Clone, Default)]
pub struct RecommendationFilter {
    pub status_eq: Option<String>,
    pub category_eq: Option<String>,
    pub priority_eq: Option<String>,
    pub producer_id_eq: Option<String>,
    pub rule_code_eq: Option<String>,
}

/// Recommendation counts grouped by status, category, and priority.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationSummary {
    pub total: u64,
    pub by_status: HashMap<String, u64>,
    pub by_category: HashMap<String, u64>,
    pub by_priority: HashMap<String, u64>,
}

fn to_row(m: recommendation::Model) -> RecommendationRow {
    RecommendationRow {
        id: m.id,
        title: m.title,
        message: m.message,
        producer_id: m.producer_id,
        rule_code: m.rule_code,
        category: m.category,
        priority: m.priority,
        rec_type: m.rec_type,
        status: m.status,
        generated_by: m.generated_by,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

fn apply_filter(
    mut q: sea_orm::Select<Entity>,
    filter: &RecommendationFilter,
) -> sea_orm::Select<Entity> {
    if let Some(v) = &filter.status_eq {
        q = q.filter(Column::Status.eq(v));
    }
    if let Some(v) = &filter.category_eq {
        q = q.filter(Column::Category.eq(v));
    }
    if let Some(v) = &filter.priority_eq {
        q = q.filter(Column::Priority.eq(v));
    }
    if let Some(v) = &filter.producer_id_eq {
        q = q.filter(Column::ProducerId.eq(v));
    }
    if let Some(v) = &filter.rule_code_eq {
        q = q.filter(Column::RuleCode.eq(v));
    }
    q
}

impl FarmStore {
    /// True when a live (pending) row already exists for the pair.
    pub async fn exists_pending(&self, rule_code: &str, producer_id: &str) -> Result<bool, StorageError> {
        let count = Entity::find()
            .filter(Column::RuleCode.eq(rule_code))
            .filter(Column::ProducerId.eq(producer_id))
            .filter(Column::Status.eq(RecommendationStatus::Pending.to_string()))
            .count(self.db())
            .await?;
        Ok(count > 0)
    }

    /// Insert one generated item as a pending recommendation, enforcing the
    /// dedup policy.
    ///
    /// The pre-insert lookup is an optimization; the partial unique index
    /// on (rule_code, producer_id) WHERE status = 'pending' is the
    /// authoritative guard, so a unique violation raised by a concurrent
    /// run is reported as [`StorageError::DuplicatePending`] as well.
    pub async fn insert_pending_checked(
        &self,
        generated_by: &str,
        item: &GeneratedItem,
    ) -> Result<RecommendationRow, StorageError> {
        if self.exists_pending(&item.rule_code, &item.producer_id).await? {
            return Err(StorageError::DuplicatePending {
                rule_code: item.rule_code.clone(),
                producer_id: item.producer_id.clone(),
            });
        }

        let now = Utc::now().fixed_offset();
        let am = recommendation::ActiveModel {
            id: Set(agrimon_common::id::next_id()),
            title: Set(item.title.clone()),
            message: Set(item.message.clone()),
            producer_id: Set(item.producer_id.clone()),
            rule_code: Set(item.rule_code.clone()),
            category: Set(item.category.to_string()),
            priority: Set(item.priority.to_string()),
            rec_type: Set(item.rec_type.clone()),
            status: Set(item.status.to_string()),
            generated_by: Set(generated_by.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        match am.insert(self.db()).await {
            Ok(model) => Ok(to_row(model)),
            Err(e) => match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => Err(StorageError::DuplicatePending {
                    rule_code: item.rule_code.clone(),
                    producer_id: item.producer_id.clone(),
                }),
                _ => Err(StorageError::Db(e)),
            },
        }
    }

    /// Persist a batch of generated items. Item-level failures never abort
    /// the batch: duplicates and errors are tallied and logged, the rest
    /// of the batch proceeds.
    pub async fn write_generated(
        &self,
        generated_by: &str,
        items: &[GeneratedItem],
    ) -> WriteStats {
        let mut stats = WriteStats::default();
        for item in items {
            match self.insert_pending_checked(generated_by, item).await {
                Ok(_) => stats.written += 1,
                Err(StorageError::DuplicatePending {
                    rule_code,
                    producer_id,
                }) => {
                    tracing::debug!(
                        rule_code = %rule_code,
                        producer_id = %producer_id,
                        "Duplicate pending recommendation skipped"
                    );
                    stats.duplicates += 1;
                }
                Err(e) => {
                    let err = EngineError::WriteFailed {
                        rule_code: item.rule_code.clone(),
                        producer_id: item.producer_id.clone(),
                        cause: e.to_string(),
                    };
                    tracing::error!(error = %err, "Recommendation write failed");
                    stats.failures += 1;
                }
            }
        }
        stats
    }

    pub async fn get_recommendation_by_id(&self, id: &str) -> Result<Option<RecommendationRow>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        Ok(model.map(to_row))
    }

    pub async fn list_recommendations(
        &self,
        filter: &RecommendationFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<RecommendationRow>> {
        let rows = apply_filter(Entity::find(), filter)
            .order_by(Column::CreatedAt, Order::Desc)
            .limit(limit as u64)
            .offset(offset as u64)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(to_row).collect())
    }

    pub async fn count_recommendations(&self, filter: &RecommendationFilter) -> Result<u64> {
        Ok(apply_filter(Entity::find(), filter).count(self.db()).await?)
    }

    /// Transition a recommendation's lifecycle status (done / dismissed).
    /// Called on behalf of the downstream UI; the engine itself never
    /// updates rows.
    pub async fn set_recommendation_status(
        &self,
        id: &str,
        status: RecommendationStatus,
    ) -> Result<RecommendationRow, StorageError> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        let Some(m) = model else {
            return Err(StorageError::NotFound {
                entity: "recommendation",
                id: id.to_string(),
            });
        };
        let now = Utc::now().fixed_offset();
        let mut am: recommendation::ActiveModel = m.into();
        am.status = Set(status.to_string());
        am.updated_at = Set(now);
        let updated = am.update(self.db()).await?;
        Ok(to_row(updated))
    }

    /// Counts by status/category/priority for the dashboard.
    pub async fn recommendation_summary(&self) -> Result<RecommendationSummary> {
        let rows: Vec<(String, String, String)> = Entity::find()
            .select_only()
            .column(Column::Status)
            .column(Column::Category)
            .column(Column::Priority)
            .into_tuple()
            .all(self.db())
            .await?;

        let mut summary = RecommendationSummary {
            total: rows.len() as u64,
            by_status: HashMap::new(),
            by_category: HashMap::new(),
            by_priority: HashMap::new(),
        };
        for (status, category, priority) in rows {
            *summary.by_status.entry(status).or_insert(0) += 1;
            *summary.by_category.entry(category).or_insert(0) += 1;
            *summary.by_priority.entry(priority).or_insert(0) += 1;
        }
        Ok(summary)
    }
}

#[async_trait]
impl RecommendationSink for FarmStore {
    async fn write_all(&self, generated_by: &str, items: &[GeneratedItem]) -> WriteStats {
        self.write_generated(generated_by, items).await
    }
}
