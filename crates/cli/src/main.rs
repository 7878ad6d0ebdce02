mod health;

use std::sync::Arc;

use {
    clap::Parser,
    tracing::{error, info},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    birdwatch_config::Config,
    birdwatch_relay::{Clock, Notifier, Poller, PollerConfig, PostSource, SeenStore, TokioClock},
    birdwatch_source::TwitterClient,
    birdwatch_telegram::TelegramNotifier,
};

#[derive(Parser)]
#[command(name = "birdwatch", about = "Relay new posts from watched accounts to a Telegram chat")]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "birdwatch starting");

    // Fatal startup condition: a missing or malformed variable ends the
    // process here, before anything is spawned.
    let config = Config::from_env()?;
    info!(
        accounts = config.accounts.len(),
        poll_interval_secs = config.poll_interval.as_secs(),
        persistent = config.seen_db_url.is_some(),
        "configuration loaded"
    );

    if let Some(port) = config.health_port {
        tokio::spawn(async move {
            if let Err(err) = health::serve(port).await {
                error!(error = %err, "liveness endpoint failed");
            }
        });
    }

    let store: Arc<dyn SeenStore> = match config.seen_db_url {
        Some(ref url) => Arc::new(birdwatch_relay::SqliteSeenStore::new(url).await?),
        None => Arc::new(birdwatch_relay::MemorySeenStore::new()),
    };

    let source: Arc<dyn PostSource> =
        Arc::new(TwitterClient::new(config.twitter_bearer.clone())?);
    let notifier: Arc<dyn Notifier> =
        Arc::new(TelegramNotifier::new(&config.telegram_token, config.chat_id)?);
    let clock: Arc<dyn Clock> = Arc::new(TokioClock);

    let poller = Poller::new(
        source,
        notifier,
        store,
        clock,
        PollerConfig {
            accounts: config.accounts.clone(),
            poll_interval: config.poll_interval,
            rate_limit_cooldown: config.rate_limit_cooldown,
        },
    );

    poller.announce_startup().await;
    poller.run_forever().await;

    Ok(())
}
