/// Errors produced by the rule evaluation engine.
///
/// Only [`EngineError::CatalogUnavailable`] aborts a run. Per-rule and
/// per-item failures are isolated: the offending rule or item is skipped
/// and the rest of the run proceeds.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The rule catalog could not be read. Fatal for the run.
    #[error("rule catalog unavailable: {0}")]
    CatalogUnavailable(anyhow::Error),

    /// A single rule's condition failed to evaluate (malformed SQL,
    /// transient store error, or timeout). The rule is skipped.
    #[error("evaluation of rule '{rule_code}' failed: {cause}")]
    RuleEvaluationFailed { rule_code: String, cause: String },

    /// A single generated item could not be persisted. The item is dropped
    /// from the written count; remaining writes proceed.
    #[error("write failed for rule '{rule_code}', producer '{producer_id}': {cause}")]
    WriteFailed {
        rule_code: String,
        producer_id: String,
        cause: String,
    },
}
