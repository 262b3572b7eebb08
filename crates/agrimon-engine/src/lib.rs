//! Rule evaluation engine for the agrimon farm-monitoring platform.
//!
//! Given the catalog of active monitoring rules and the current farm
//! dataset, the engine evaluates each rule's condition, renders a message
//! for every matching producer, classifies the result as an alert or a
//! routine recommendation, and hands the batch to an idempotent writer.
//! The three collaborators are injected behind the ports below so the
//! orchestrator never talks to a concrete data store.

pub mod classify;
pub mod error;
pub mod render;
pub mod runner;

#[cfg(test)]
mod tests;

use agrimon_common::types::{GeneratedItem, Hit, Rule, WriteStats};
use anyhow::Result;
use async_trait::async_trait;

/// Read access to the rule catalog.
///
/// The engine never mutates rules; administration happens elsewhere. A
/// failure here is fatal for the whole run, since without a catalog there
/// is nothing meaningful to report.
#[async_trait]
pub trait RuleCatalog: Send + Sync {
    /// Returns every active rule, in any order.
    async fn list_active_rules(&self) -> Result<Vec<Rule>>;
}

/// Executes a rule's condition against the dataset.
///
/// This is a pass-through to the data store's own query engine, not an
/// interpreter: the condition is written in the store's native query
/// language. Conditions must be read-only. Zero hits is a normal,
/// successful evaluation.
#[async_trait]
pub trait ConditionEvaluator: Send + Sync {
    async fn evaluate(&self, rule: &Rule) -> Result<Vec<Hit>>;
}

/// Persists generated items, enforcing the dedup policy: no second
/// `pending` row for the same (rule_code, producer_id).
///
/// Item-level failures never abort the batch; they are reported through
/// [`WriteStats::failures`] and logged by the implementation with enough
/// context to be actionable.
#[async_trait]
pub trait RecommendationSink: Send + Sync {
    async fn write_all(&self, generated_by: &str, items: &[GeneratedItem]) -> WriteStats;
}
