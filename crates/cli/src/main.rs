//! mailfiler CLI
//!
//! Runs cabinet loading, predictions and quick search against a filing
//! backend using a pre-seeded session from the config file.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mailfiler_core::{
    load_config, open_storage, validate_config, ActivityLog, AuthProvider, CabinetService,
    ClientInfo, Config, HttpPipeline, ItemDigest, OAuthProvider, PredictionCoordinator,
    RequestOutcome, ReqwestTransport, RetryPolicy, SanitizedConfig, SearchCoordinator,
    SessionContext,
};

#[derive(Parser)]
#[command(name = "mailfiler")]
#[command(about = "Predict and search filing locations for mail items", long_about = None)]
struct Args {
    /// Config file (default: $MAILFILER_CONFIG or mailfiler.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the user's cabinets
    Cabinets,

    /// Predict filing locations for a mail item
    Predict {
        /// Cabinet to predict in
        #[arg(long)]
        cabinet: String,

        /// JSON file with the item digest
        #[arg(long)]
        digest: PathBuf,
    },

    /// Quick search for filing locations
    Search {
        /// Cabinet to search in
        #[arg(long)]
        cabinet: String,

        query: String,
    },

    /// Print the interactive login URL for a host
    LoginUrl {
        /// Host key (default: the first configured host)
        #[arg(long)]
        host: Option<String>,
    },

    /// Print the effective configuration with tokens redacted
    Config,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let config_path = args
        .config
        .or_else(|| std::env::var("MAILFILER_CONFIG").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("mailfiler.toml"));

    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Configuration validation failed")?;

    let auth = Arc::new(
        OAuthProvider::new(&config.api, &config.auth, config.http.timeout_secs)
            .context("Failed to create auth provider")?,
    );

    let outcome = match args.command {
        Command::Config => {
            return print_json(&serde_json::to_value(SanitizedConfig::from(&config))?);
        }
        Command::LoginUrl { host } => {
            let host = match host.or_else(|| config.api.hosts.first().map(|h| h.id.clone())) {
                Some(host) => host,
                None => bail!("No hosts configured"),
            };
            println!("{}", auth.login_request_url(&host)?);
            return Ok(());
        }
        Command::Cabinets => {
            let (pipeline, activity) = connect(&config, auth).await?;
            let storage = open_storage(&config.storage).context("Failed to open storage")?;
            activity.info("cli -> cabinets", None);
            let outcome = CabinetService::from_config(pipeline, storage, &config)
                .load_cabinets()
                .await;
            activity.flush().await;
            outcome
        }
        Command::Predict { cabinet, digest } => {
            let text = std::fs::read_to_string(&digest)
                .with_context(|| format!("Failed to read digest from {:?}", digest))?;
            let digest: ItemDigest =
                serde_json::from_str(&text).context("Failed to parse item digest")?;
            let (pipeline, activity) = connect(&config, auth).await?;
            activity.info("cli -> predict", Some(json!(cabinet)));
            let outcome = PredictionCoordinator::new(pipeline)
                .load_predictions(&cabinet, &digest)
                .await;
            activity.flush().await;
            outcome
        }
        Command::Search { cabinet, query } => {
            let (pipeline, activity) = connect(&config, auth).await?;
            activity.info("cli -> search", Some(json!({ "cabinet": cabinet, "query": query })));
            let outcome = SearchCoordinator::new(pipeline).search(&cabinet, &query).await;
            activity.flush().await;
            outcome
        }
    };

    print_outcome(outcome)
}

/// Build the pipeline over the configured session and the activity log shipping through it.
async fn connect(config: &Config, auth: Arc<OAuthProvider>) -> Result<(Arc<HttpPipeline>, ActivityLog)> {
    let transport = Arc::new(
        ReqwestTransport::new(config.http.timeout_secs).context("Failed to create HTTP client")?,
    );
    let session = Arc::new(SessionContext::from_config(config));
    if !session.is_signed_in().await {
        bail!("No session configured; add a [session] section with an access token");
    }

    let pipeline = Arc::new(HttpPipeline::new(
        transport,
        auth,
        session,
        RetryPolicy::from_config(&config.http),
    ));
    let activity = ActivityLog::new(config.logging.clone(), client_info(config))
        .with_pipeline(pipeline.clone());
    Ok((pipeline, activity))
}

fn client_info(config: &Config) -> ClientInfo {
    ClientInfo {
        user_id: config
            .session
            .as_ref()
            .map(|s| s.host_key.clone())
            .unwrap_or_default(),
        host: "cli".to_string(),
        platform: std::env::consts::OS.to_string(),
    }
}

fn print_outcome(outcome: RequestOutcome) -> Result<()> {
    let Some(result) = outcome.into_result() else {
        bail!("Request was cancelled");
    };

    print_json(&json!({
        "status": result.status_code(),
        "successful": result.is_successful(),
        "executionTimeSeconds": result.execution_time_seconds(),
        "body": result.body(),
    }))?;

    if !result.is_successful() {
        bail!("Request failed with status {}", result.status_code());
    }
    Ok(())
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
