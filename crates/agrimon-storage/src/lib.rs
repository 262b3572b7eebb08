//! Persistence layer for the agrimon platform.
//!
//! A single [`store::FarmStore`] wraps the SeaORM connection and exposes
//! typed row accessors for the rule catalog and the recommendation store.
//! It also provides the production adapters for the engine's ports:
//! catalog reads, the SQL condition evaluator, and the idempotent
//! recommendation sink backed by a partial unique index.

pub mod entities;
pub mod error;
pub mod evaluator;
pub mod store;

#[cfg(test)]
mod tests;

pub use error::StorageError;
pub use evaluator::SqlConditionEvaluator;
pub use store::{
    FarmStore, RecommendationFilter, RecommendationRow, RecommendationSummary, RuleFilter,
    RuleRow, RuleUpdate,
};
