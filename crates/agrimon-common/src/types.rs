use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Rule severity declared in the catalog, ordered from lowest to highest.
///
/// # Examples
///
/// ```
/// use agrimon_common::types::Severity;
///
/// let sev: Severity = "high".parse().unwrap();
/// assert_eq!(sev, Severity::High);
/// assert_eq!(sev.to_string(), "high");
/// assert!(Severity::Critical > Severity::Info);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// How the rule author wants a match surfaced downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Alert,
    Notification,
    Warning,
    Recommendation,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Alert => write!(f, "alert"),
            ActionType::Notification => write!(f, "notification"),
            ActionType::Warning => write!(f, "warning"),
            ActionType::Recommendation => write!(f, "recommendation"),
        }
    }
}

impl std::str::FromStr for ActionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "alert" => Ok(ActionType::Alert),
            "notification" => Ok(ActionType::Notification),
            "warning" => Ok(ActionType::Warning),
            "recommendation" => Ok(ActionType::Recommendation),
            _ => Err(format!("unknown action type: {s}")),
        }
    }
}

/// Display category of a generated item. Alerts are the higher-urgency
/// subset; everything else is a routine recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Alert,
    Recommendation,
}

impl Category {
    /// Title prefix shown in the mobile/web UI. Must always agree with the
    /// category itself.
    pub fn title_prefix(&self) -> &'static str {
        match self {
            Category::Alert => "🚨 ALERTE",
            Category::Recommendation => "💡 RECOMMANDATION",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Alert => write!(f, "alert"),
            Category::Recommendation => write!(f, "recommendation"),
        }
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "alert" => Ok(Category::Alert),
            "recommendation" => Ok(Category::Recommendation),
            _ => Err(format!("unknown category: {s}")),
        }
    }
}

/// Priority level attached to a generated item, derived from severity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
            Priority::Urgent => write!(f, "urgent"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            _ => Err(format!("unknown priority: {s}")),
        }
    }
}

/// Lifecycle of a persisted recommendation record. The engine only ever
/// creates `pending` rows; `done` and `dismissed` transitions come from the
/// downstream UI through the HTTP API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationStatus {
    Pending,
    Done,
    Dismissed,
}

impl std::fmt::Display for RecommendationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecommendationStatus::Pending => write!(f, "pending"),
            RecommendationStatus::Done => write!(f, "done"),
            RecommendationStatus::Dismissed => write!(f, "dismissed"),
        }
    }
}

impl std::str::FromStr for RecommendationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(RecommendationStatus::Pending),
            "done" => Ok(RecommendationStatus::Done),
            "dismissed" => Ok(RecommendationStatus::Dismissed),
            _ => Err(format!("unknown recommendation status: {s}")),
        }
    }
}

/// A monitoring rule as the engine sees it: condition, template, and
/// classification signals. `code` is the stable identity used for dedup and
/// traceability; it never changes once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub code: String,
    pub name: String,
    /// SQL SELECT evaluated against the farm dataset. Each returned row is a
    /// hit and must expose at least a `producer_id` column.
    pub condition_sql: String,
    pub message_template: String,
    pub severity: Severity,
    pub action_type: ActionType,
}

/// One match produced by evaluating a rule's condition. Ephemeral; turned
/// into a [`GeneratedItem`] and discarded.
#[derive(Debug, Clone)]
pub struct Hit {
    pub producer_id: String,
    /// All other columns of the matching row, keyed by column name.
    pub fields: Map<String, Value>,
}

impl Hit {
    /// Returns the named field rendered as display text, if present and
    /// renderable (strings, numbers, booleans).
    pub fn field_text(&self, name: &str) -> Option<String> {
        self.fields.get(name).and_then(value_text)
    }
}

/// Render a JSON value as display text for message substitution.
///
/// # Examples
///
/// ```
/// use agrimon_common::types::value_text;
/// use serde_json::json;
///
/// assert_eq!(value_text(&json!("Maïs")), Some("Maïs".to_string()));
/// assert_eq!(value_text(&json!(42.5)), Some("42.5".to_string()));
/// assert_eq!(value_text(&json!(null)), None);
/// ```
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// The rendered, classified output of one (rule, hit) pair, ready to be
/// persisted by the recommendation writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedItem {
    pub title: String,
    pub message: String,
    pub producer_id: String,
    pub rule_code: String,
    pub category: Category,
    pub priority: Priority,
    /// Display sub-type used only for downstream filtering UI
    /// (traitement / surveillance / information / fertilisation).
    pub rec_type: String,
    pub status: RecommendationStatus,
}

/// Outcome counters from a single writer batch.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WriteStats {
    /// Rows actually inserted.
    pub written: usize,
    /// Items skipped because a pending row for the same
    /// (rule_code, producer_id) already exists.
    pub duplicates: usize,
    /// Items dropped on a write error. Never aborts the batch.
    pub failures: usize,
}

impl WriteStats {
    pub fn absorb(&mut self, other: WriteStats) {
        self.written += other.written;
        self.duplicates += other.duplicates;
        self.failures += other.failures;
    }
}

/// Per-rule entry in the run summary breakdown.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RuleRunDetail {
    pub code: String,
    pub name: String,
    pub severity: Severity,
    pub action_type: ActionType,
    /// Rows matched by the condition.
    pub hits: usize,
    /// Items generated from those hits (before dedup).
    pub generated: usize,
    /// Present when the rule was skipped (evaluation failure, timeout, or
    /// run cancellation); the reason is free text for the logs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
}

/// Aggregated result of one orchestrator invocation.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RunSummary {
    /// Number of active rules the run attempted, including skipped ones.
    pub rules_evaluated: usize,
    /// Items generated across all rules, whether or not they were written
    /// (duplicates still count here).
    pub total_generated: usize,
    pub alerts_generated: usize,
    pub recommendations_generated: usize,
    /// Rows actually inserted this run.
    pub written: usize,
    pub duplicates_skipped: usize,
    pub write_failures: usize,
    pub timestamp: DateTime<Utc>,
    pub rules: Vec<RuleRunDetail>,
}
