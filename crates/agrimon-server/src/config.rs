use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// CORS allowed origins; empty allows every origin (development mode).
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,

    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Full connection URL. SQLite example: `sqlite://data/agrimon.db?mode=rwc`.
    #[serde(default = "default_db_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_db_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Whether the periodic scheduler runs the engine on its own.
    /// HTTP-triggered runs work either way.
    #[serde(default = "default_engine_enabled")]
    pub enabled: bool,
    /// Seconds between scheduled engine runs.
    #[serde(default = "default_engine_interval_secs")]
    pub interval_secs: u64,
    /// Per-rule evaluation timeout. A rule that exceeds it is skipped,
    /// never the whole run.
    #[serde(default = "default_rule_timeout_secs")]
    pub rule_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled: default_engine_enabled(),
            interval_secs: default_engine_interval_secs(),
            rule_timeout_secs: default_rule_timeout_secs(),
        }
    }
}

fn default_http_port() -> u16 {
    8080
}

fn default_db_url() -> String {
    "sqlite://data/agrimon.db?mode=rwc".to_string()
}

fn default_engine_enabled() -> bool {
    true
}

fn default_engine_interval_secs() -> u64 {
    3600
}

fn default_rule_timeout_secs() -> u64 {
    30
}

// ---- Rules seed file types (used by the `init-rules` CLI subcommand) ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesSeedFile {
    #[serde(default)]
    pub rules: Vec<SeedRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedRule {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub condition_sql: String,
    pub message_template: String,
    #[serde(default = "default_seed_severity")]
    pub severity: String,
    #[serde(default = "default_seed_action_type")]
    pub action_type: String,
    #[serde(default = "default_seed_enabled")]
    pub enabled: bool,
}

fn default_seed_severity() -> String {
    "medium".to_string()
}

fn default_seed_action_type() -> String {
    "recommendation".to_string()
}

fn default_seed_enabled() -> bool {
    true
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config.http_port, 8080);
        assert!(config.engine.enabled);
        assert_eq!(config.engine.interval_secs, 3600);
        assert_eq!(config.engine.rule_timeout_secs, 30);
        assert!(config.database.url.starts_with("sqlite://"));
    }

    #[test]
    fn partial_engine_section_fills_missing_fields() {
        let config: ServerConfig = toml::from_str(
            "
            [engine]
            interval_secs = 600
            ",
        )
        .unwrap();
        assert_eq!(config.engine.interval_secs, 600);
        assert_eq!(config.engine.rule_timeout_secs, 30);
    }
}
