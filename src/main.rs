use anyhow::{Context, Result};
use background_service::{ActionDispatcher, BackgroundService};
use chrono::Utc;
use clap::{Parser, Subcommand};
use llm_interface::{DraftGenerator, GeneratorSettings, OpenAiProvider};
use replybot_core::{credential_presence, AccountProfile, BotConfig, Credentials};
use social_client::{RetryConfig, RetryExecutor, SocialApiClient, SocialPlatform};
use stats_store::StatsStore;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "replybot=info,background_service=info,social_client=info,\
llm_interface=info,engagement_engine=info,stats_store=info,replybot_core=info";

#[derive(Parser)]
#[command(name = "replybot", version)]
#[command(about = "Reply to relevant posts from a list of accounts", long_about = None)]
struct Cli {
    /// Path to a TOML config file (built-in defaults when omitted)
    #[arg(long, global = true, env = "REPLYBOT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Poll the target accounts and reply until interrupted (default)
    Run,
    /// Report which credential variables are set, without printing them
    CheckKeys,
    /// Generate and publish one original post
    Post,
    /// Print today's counters
    Stats,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::CheckKeys => {
            check_keys();
            Ok(())
        }
        Commands::Stats => show_stats(&load_config(cli.config.as_deref())?).await,
        Commands::Post => post(load_config(cli.config.as_deref())?).await,
        Commands::Run => run(load_config(cli.config.as_deref())?).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<BotConfig> {
    let config = BotConfig::load(path).context("Failed to load configuration")?;
    tracing::debug!("Loaded config for {} target accounts", config.target_accounts.len());
    Ok(config)
}

fn check_keys() {
    println!("Checking API keys...");
    for (name, present) in credential_presence() {
        let mark = if present { "✓" } else { "✗" };
        println!("{} {}", mark, name);
    }
}

async fn show_stats(config: &BotConfig) -> Result<()> {
    let store = StatsStore::new(config.stats_path.clone());
    let stats = store.load(Utc::now().date_naive()).await?;

    println!("Date:      {}", stats.date);
    println!("Replies:   {}/{}", stats.replies, config.limits.max_replies_per_day);
    println!("Posts:     {}/{}", stats.tweets_posted(), config.limits.max_tweets_per_day);
    if let Some(followers) = stats.followers {
        println!("Followers: {}", followers);
    }
    if let Some(following) = stats.following {
        println!("Following: {}", following);
    }
    Ok(())
}

/// Build the clients and run the startup connection test. Bad credentials
/// stop the process here.
async fn connect(
    config: &BotConfig,
) -> Result<(SocialApiClient, OpenAiProvider, AccountProfile)> {
    let credentials = Credentials::from_env().context("Missing credentials")?;
    let client = SocialApiClient::new(&credentials, &config.api)?;
    let provider = OpenAiProvider::new(credentials.openai_api_key.clone(), &config.llm)?;

    let profile = client
        .verify_credentials()
        .await
        .context("Connection test failed")?;
    tracing::info!("Connected as @{} ({})", profile.username, profile.id);

    Ok((client, provider, profile))
}

async fn build_service(
    config: BotConfig,
) -> Result<BackgroundService<SocialApiClient, OpenAiProvider>> {
    let (client, provider, _profile) = connect(&config).await?;

    let store = StatsStore::new(config.stats_path.clone());
    let retry = RetryExecutor::new(RetryConfig::with_backoff(config.timing.throttle_backoff()));
    let dispatcher = ActionDispatcher::new(client, store, config.limits.clone(), retry).await;
    let generator = DraftGenerator::new(provider, GeneratorSettings::from_config(&config));

    Ok(BackgroundService::new(config, generator, dispatcher))
}

async fn run(config: BotConfig) -> Result<()> {
    tracing::info!("Starting replybot");
    let mut service = build_service(config).await?;

    tokio::select! {
        result = service.run() => result.context("Poll loop stopped")?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted, shutting down"),
    }

    let stats = service.dispatcher().stats();
    tracing::info!(
        "Replied {} times today, {} original posts",
        stats.replies,
        stats.tweets_posted()
    );
    Ok(())
}

async fn post(config: BotConfig) -> Result<()> {
    let mut service = build_service(config).await?;

    match service.post_original().await {
        Some(post_id) => println!("Published {}", post_id),
        None => println!("Nothing published"),
    }
    Ok(())
}
