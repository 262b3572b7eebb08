/// Typed errors for store operations where the caller branches on the
/// outcome. Bulk query methods keep returning `anyhow::Result`; these
/// variants cover the cases the HTTP layer and the writer must
/// distinguish.
///
/// # Examples
///
/// ```rust
/// use agrimon_storage::StorageError;
///
/// let err = StorageError::NotFound {
///     entity: "recommendation",
///     id: "rec-99".to_string(),
/// };
/// assert!(err.to_string().contains("recommendation"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A required record was not found in the database.
    #[error("storage: {entity} not found (id={id})")]
    NotFound { entity: &'static str, id: String },

    /// A pending recommendation for the same (rule_code, producer_id)
    /// already exists, either seen by the pre-insert check or raised by
    /// the partial unique index under a concurrent run.
    #[error("storage: pending recommendation already exists for rule '{rule_code}', producer '{producer_id}'")]
    DuplicatePending {
        rule_code: String,
        producer_id: String,
    },

    /// An underlying database error.
    #[error("storage: database error: {0}")]
    Db(#[from] sea_orm::DbErr),
}
