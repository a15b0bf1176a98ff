//! disttrace-console - Entry Point
//!
//! Logs in to the master with the configured credentials and prints the
//! requested state slices as JSON on stdout.

use anyhow::{anyhow, bail};
use disttrace_console::{Config, ConsoleStore, HistoryNavigator, Navigator};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const SLICES: [&str; 5] = ["status", "slaves", "targets", "users", "traces"];

/// Level used when `RUST_LOG` is unset or unparseable
const DEFAULT_LOG_FILTER: &str = "warn";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Parse args
    let args: Vec<String> = std::env::args().collect();
    let help_mode = args.iter().any(|a| a == "--help" || a == "-h");
    let json_logs = args.iter().any(|a| a == "--json-logs");

    if help_mode {
        println!("disttrace-console v{}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Usage: disttrace-console [OPTIONS]");
        println!();
        println!("Options:");
        println!("  --status           Print master status");
        println!("  --slaves           Print slaves");
        println!("  --targets          Print targets");
        println!("  --users            Print users");
        println!("  --traces           Print trace history");
        println!("  --limit N          List limit (default: DISTTRACE_DEFAULT_LIMIT)");
        println!("  --json-logs        Log as JSON");
        println!("  --help, -h         Show this help");
        println!();
        println!("Without a slice option the whole store snapshot is printed.");
        println!();
        println!("Environment variables:");
        println!("  DISTTRACE_API_URL          API base URL (default: http://localhost:8990/api)");
        println!("  DISTTRACE_USER             Login user");
        println!("  DISTTRACE_PASSWORD         Login password");
        println!("  DISTTRACE_DEFAULT_LIMIT    Default list limit (default: 50)");
        println!("  DISTTRACE_SEQUENCED_FETCH  Discard stale list responses (default: true)");
        return Ok(());
    }

    // Logs go to stderr, stdout carries the JSON output
    let filter = log_filter(std::env::var("RUST_LOG").ok().as_deref());

    if json_logs {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    let config = Config::from_env()?;
    let limit = match args.iter().position(|a| a == "--limit") {
        Some(idx) => args
            .get(idx + 1)
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| anyhow!("--limit needs a number"))?,
        None => config.default_limit,
    };

    let credentials = config
        .credentials()
        .ok_or_else(|| anyhow!("DISTTRACE_USER and DISTTRACE_PASSWORD must be set"))?;

    let navigator = Arc::new(HistoryNavigator::new(&config.login_route));
    let store = ConsoleStore::new(config, navigator.clone());

    if !store.login(&credentials).await {
        bail!("Login failed for user {}", credentials.user);
    }
    navigator.push("/");
    info!("Connected to {}", store.config().api_url);

    let selected: Vec<&str> = SLICES
        .iter()
        .copied()
        .filter(|slice| args.iter().any(|a| a == &format!("--{}", slice)))
        .collect();

    let output = if selected.is_empty() {
        let report = store.refresh_all(limit).await;
        if !report.all_ok() {
            tracing::warn!(?report, "Some slices could not be refreshed");
        }
        serde_json::to_value(store.snapshot())?
    } else {
        let mut out = Map::new();
        for slice in selected {
            out.insert(slice.to_string(), fetch_slice(&store, slice, limit).await?);
        }
        Value::Object(out)
    };

    if !store.is_authorized() {
        bail!("Session expired while fetching, now at {}", navigator.current_path());
    }

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn fetch_slice(store: &ConsoleStore, slice: &str, limit: u32) -> anyhow::Result<Value> {
    let value = match slice {
        "status" => {
            store.status().fetch_status().await;
            serde_json::to_value(store.status().status())?
        }
        "slaves" => {
            store.slaves().fetch(limit).await;
            serde_json::to_value(store.slaves().items())?
        }
        "targets" => {
            store.targets().fetch(limit).await;
            serde_json::to_value(store.targets().items())?
        }
        "users" => {
            store.users().fetch(limit).await;
            serde_json::to_value(store.users().items())?
        }
        "traces" => {
            store.traces().fetch_traces(limit).await;
            serde_json::to_value(store.traces().traces())?
        }
        other => bail!("Unknown slice: {}", other),
    };
    Ok(value)
}

/// `RUST_LOG` directives, e.g. `debug` or `disttrace_console=trace`
fn log_filter(raw: Option<&str>) -> EnvFilter {
    raw.filter(|s| !s.trim().is_empty())
        .and_then(|s| EnvFilter::try_new(s).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_defaults_to_warn() {
        assert_eq!(log_filter(None).to_string(), "warn");
        assert_eq!(log_filter(Some("")).to_string(), "warn");
    }

    #[test]
    fn test_log_filter_accepts_directives() {
        assert_eq!(log_filter(Some("debug")).to_string(), "debug");
        assert_eq!(
            log_filter(Some("disttrace_console=trace")).to_string(),
            "disttrace_console=trace"
        );
    }

    #[test]
    fn test_log_filter_rejects_bad_level() {
        assert_eq!(log_filter(Some("disttrace_console=loud")).to_string(), "warn");
    }
}
