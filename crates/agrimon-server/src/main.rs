use anyhow::Result;
use chrono::Utc;
use agrimon_server::app;
use agrimon_server::config::{self, ServerConfig};
use agrimon_server::rule_seed;
use agrimon_server::scheduler::EngineScheduler;
use agrimon_server::state::AppState;
use agrimon_storage::{FarmStore, RuleRow};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  agrimon-server [config.toml]                          Start the server");
    eprintln!("  agrimon-server run-once <config.toml>                 Run the engine once and print the summary");
    eprintln!("  agrimon-server init-rules <config.toml> <seed.json>   Initialize monitoring rules from a seed file");
}

#[tokio::main]
async fn main() -> Result<()> {
    agrimon_common::id::init(1, 1);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("agrimon=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("init-rules") => {
            let config_path = args.get(2).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("init-rules requires <config.toml> and <seed.json> arguments")
            })?;
            let seed_path = args.get(3).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("init-rules requires <seed.json> argument")
            })?;
            run_init_rules(config_path, seed_path).await
        }
        Some("run-once") => {
            let config_path = args.get(2).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("run-once requires <config.toml> argument")
            })?;
            run_once(config_path).await
        }
        Some("--help" | "-h") => {
            print_usage();
            Ok(())
        }
        _ => {
            let config_path = args
                .get(1)
                .map(|s| s.as_str())
                .unwrap_or("config/server.toml");
            run_server(config_path).await
        }
    }
}

/// Initialize monitoring rules from a JSON seed file.
async fn run_init_rules(config_path: &str, seed_path: &str) -> Result<()> {
    let config = ServerConfig::load(config_path)?;
    let store = FarmStore::new(&config.database.url).await?;

    let seed_content = std::fs::read_to_string(seed_path)
        .map_err(|e| anyhow::anyhow!("Failed to read seed file '{}': {}", seed_path, e))?;
    let seed: config::RulesSeedFile = serde_json::from_str(&seed_content)
        .map_err(|e| anyhow::anyhow!("Failed to parse seed file '{}': {}", seed_path, e))?;

    let mut created = 0u32;
    let mut skipped = 0u32;

    for r in &seed.rules {
        match store.get_rule_by_code(&r.code).await {
            Ok(Some(_)) => {
                tracing::warn!(code = %r.code, "Monitoring rule already exists, skipping");
                skipped += 1;
                continue;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(code = %r.code, error = %e, "Failed to check rule code");
                continue;
            }
        }

        let row = RuleRow {
            id: agrimon_common::id::next_id(),
            code: r.code.clone(),
            name: r.name.clone(),
            description: r.description.clone(),
            condition_sql: r.condition_sql.clone(),
            message_template: r.message_template.clone(),
            severity: r.severity.clone(),
            action_type: r.action_type.clone(),
            enabled: r.enabled,
            source: "seed".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        match store.insert_rule(&row).await {
            Ok(inserted) => {
                tracing::info!(code = %r.code, id = %inserted.id, "Monitoring rule created");
                created += 1;
            }
            Err(e) => {
                tracing::error!(code = %r.code, error = %e, "Failed to create monitoring rule");
            }
        }
    }

    tracing::info!(created, skipped, "init-rules completed");
    Ok(())
}

/// Run the engine once against the configured database and print the
/// summary as JSON. Intended for cron-style invocation.
#[allow(clippy::print_stdout)]
async fn run_once(config_path: &str) -> Result<()> {
    let config = ServerConfig::load(config_path)?;
    let store = Arc::new(FarmStore::new(&config.database.url).await?);
    let state = AppState::new(store, config);

    let summary = state
        .runner
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("engine run failed: {e}"))?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn run_server(config_path: &str) -> Result<()> {
    let config = ServerConfig::load(config_path)?;

    tracing::info!(
        http_port = config.http_port,
        db = %config.database.url,
        engine_enabled = config.engine.enabled,
        "agrimon-server starting"
    );

    let store = Arc::new(FarmStore::new(&config.database.url).await?);

    // Seed default monitoring rules (only when the catalog is empty)
    if let Err(e) = rule_seed::init_default_rules(&store).await {
        tracing::error!(error = %e, "Failed to initialize default monitoring rules");
    }

    let state = AppState::new(store, config.clone());

    // Periodic engine scheduler
    let scheduler_handle = if config.engine.enabled {
        let scheduler = EngineScheduler::new(state.runner.clone(), config.engine.interval_secs);
        Some(tokio::spawn(async move {
            scheduler.run().await;
        }))
    } else {
        tracing::info!("Engine scheduler disabled");
        None
    };

    // HTTP/REST server
    let http_addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let app = app::build_http_app(state);
    let http_listener = tokio::net::TcpListener::bind(http_addr).await?;

    tracing::info!(http = %http_addr, "Server started");

    let http_server = axum::serve(http_listener, app);
    tokio::select! {
        result = http_server.with_graceful_shutdown(async { signal::ctrl_c().await.ok(); }) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server error");
            }
        }
        _ = signal::ctrl_c() => {
            tracing::info!("Shutting down gracefully");
        }
    }

    if let Some(h) = scheduler_handle {
        h.abort();
    }
    tracing::info!("Server stopped");

    Ok(())
}
