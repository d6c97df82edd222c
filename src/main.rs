use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use casino_reports::api::{self, state::AppState, Pagination};
use casino_reports::config::AppConfig;
use casino_reports::models::{EntityAllowlist, LeaderboardKind, RecordStatus, RecordType};
use casino_reports::parse_day;
use casino_reports::report::{ReportEngine, ReportError, TransactionQuery};
use casino_reports::storage::{JsonlTransactionalStore, ParquetAnalyticalStore, StorageConfig};

#[derive(Parser)]
#[command(name = "casino-reports")]
#[command(about = "Dual-store reconciliation and reporting for casino activity")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: String,

    /// Data directory path (overrides the config file)
    #[arg(long)]
    data_dir: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Bind address
        #[arg(long)]
        host: Option<String>,

        /// Port number
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print the daily report for a day (YYYY-MM-DD)
    Daily {
        #[arg(long)]
        date: String,
    },

    /// Print the daily report with previous-day and month comparisons
    Enhanced {
        #[arg(long)]
        date: String,
    },

    /// Print the seven-day report starting at a day
    Weekly {
        #[arg(long)]
        week_start: String,

        /// Restrict to these entity ids (repeat or comma-separate)
        #[arg(long, value_delimiter = ',')]
        entity: Vec<String>,
    },

    /// Print the report for a calendar month
    Monthly {
        #[arg(long)]
        year: i32,

        #[arg(long)]
        month: u32,
    },

    /// Print one row per day over an inclusive range
    Table {
        #[arg(long)]
        from: String,

        #[arg(long)]
        to: String,

        #[arg(long, value_delimiter = ',')]
        entity: Vec<String>,
    },

    /// Print a game or player leaderboard
    Top {
        /// games or players
        kind: String,

        /// Named range (today, yesterday, last_week, last_30_days, last_90_days)
        #[arg(long)]
        range: Option<String>,

        #[arg(long)]
        from: Option<String>,

        #[arg(long)]
        to: Option<String>,

        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Print one entity's transactions, newest first
    Transactions {
        entity_id: String,

        #[arg(long)]
        range: Option<String>,

        #[arg(long)]
        from: Option<String>,

        #[arg(long)]
        to: Option<String>,

        /// Record type, e.g. bet or deposit
        #[arg(long = "type")]
        record_type: Option<String>,

        #[arg(long)]
        status: Option<String>,

        #[arg(long)]
        game_id: Option<String>,

        #[arg(long, default_value = "1")]
        page: u32,

        #[arg(long, default_value = "50")]
        page_size: u32,
    },
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let path = PathBuf::from(&cli.config);
    let mut config = if path.exists() {
        AppConfig::from_file(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?
    } else {
        AppConfig::default()
    };

    if let Some(dir) = &cli.data_dir {
        config.data_dir = PathBuf::from(dir);
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    Ok(config)
}

fn build_engine(config: &AppConfig) -> ReportEngine {
    let storage = StorageConfig::new(config.data_dir.clone());
    ReportEngine::new(
        Arc::new(ParquetAnalyticalStore::new(storage.clone())),
        Arc::new(JsonlTransactionalStore::new(storage)),
        config.reports.settings(),
    )
}

fn day_arg(name: &str, value: &str) -> Result<NaiveDate> {
    parse_day(value).ok_or_else(|| anyhow!("Invalid --{} (expected YYYY-MM-DD): {}", name, value))
}

fn allowlist_arg(ids: Vec<String>) -> Option<EntityAllowlist> {
    let ids: EntityAllowlist = ids
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    (!ids.is_empty()).then_some(ids)
}

async fn run_report<T, F>(limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T, ReportError>>,
{
    Ok(api::with_deadline(limit, fut).await?)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting casino-reports v{}", env!("CARGO_PKG_VERSION"));

    let engine = build_engine(&config);
    let timeout = config.reports.timeout();

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);

            let state = AppState::new(engine, timeout)
                .with_cors_origin(config.server.cors_origin.clone());
            let app = api::build_router(state);
            let addr = format!("{}:{}", host, port);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!(data_dir = %config.data_dir.display(), "Listening on http://{}", addr);
            axum::serve(listener, app).await?;
        }
        Commands::Daily { date } => {
            let date = day_arg("date", &date)?;
            print_json(&run_report(timeout, engine.daily(date)).await?)?;
        }
        Commands::Enhanced { date } => {
            let date = day_arg("date", &date)?;
            print_json(&run_report(timeout, engine.enhanced_daily(date)).await?)?;
        }
        Commands::Weekly { week_start, entity } => {
            let week_start = day_arg("week-start", &week_start)?;
            let allowlist = allowlist_arg(entity);
            let report = run_report(timeout, engine.weekly(week_start, allowlist.as_ref())).await?;
            print_json(&report)?;
        }
        Commands::Monthly { year, month } => {
            print_json(&run_report(timeout, engine.monthly(year, month)).await?)?;
        }
        Commands::Table { from, to, entity } => {
            let from = day_arg("from", &from)?;
            let to = day_arg("to", &to)?;
            let allowlist = allowlist_arg(entity);
            let table = run_report(timeout, engine.data_table(from, to, allowlist.as_ref())).await?;
            print_json(&table)?;
        }
        Commands::Top {
            kind,
            range,
            from,
            to,
            limit,
        } => {
            let kind: LeaderboardKind = kind.parse().map_err(anyhow::Error::msg)?;
            let window = api::resolve_window(
                range.as_deref(),
                from.as_deref(),
                to.as_deref(),
                Utc::now().date_naive(),
            )?;
            print_json(&run_report(timeout, engine.top_entities(kind, &window, limit)).await?)?;
        }
        Commands::Transactions {
            entity_id,
            range,
            from,
            to,
            record_type,
            status,
            game_id,
            page,
            page_size,
        } => {
            let record_type = record_type
                .as_deref()
                .map(str::parse::<RecordType>)
                .transpose()
                .map_err(anyhow::Error::msg)?;
            let status = status
                .as_deref()
                .map(str::parse::<RecordStatus>)
                .transpose()
                .map_err(anyhow::Error::msg)?;
            let window = api::resolve_window(
                range.as_deref(),
                from.as_deref(),
                to.as_deref(),
                Utc::now().date_naive(),
            )?;
            let pagination = Pagination::new(Some(page), Some(page_size));
            let query = TransactionQuery {
                window,
                record_type,
                status,
                game_id,
                offset: pagination.offset(),
                limit: pagination.page_size as usize,
            };
            let page = run_report(timeout, engine.entity_transactions(&entity_id, &query)).await?;
            print_json(&page)?;
        }
    }

    Ok(())
}
