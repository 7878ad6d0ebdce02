//! Environment-sourced configuration.
//!
//! All settings are read once at startup; a missing or malformed value is
//! a fatal condition surfaced as [`Error`]. Secrets are held in
//! [`secrecy::Secret`] and redacted from `Debug` output.

use std::time::Duration;

use {
    secrecy::Secret,
    thiserror::Error,
};

/// Default sleep between poll passes.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 20 * 60;

/// Default pause after a source rate-limit signal.
pub const DEFAULT_RATE_LIMIT_COOLDOWN_SECS: u64 = 60 * 60;

#[derive(Debug, Error)]
pub enum Error {
    #[error("missing required environment variable: {name}")]
    Missing { name: &'static str },

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone)]
pub struct Config {
    /// Destination bot credential.
    pub telegram_token: Secret<String>,
    /// Destination chat.
    pub chat_id: i64,
    /// Source API bearer token.
    pub twitter_bearer: Secret<String>,
    /// Handles to watch, normalized (trimmed, `@` stripped, empties
    /// dropped), in configured order.
    pub accounts: Vec<String>,
    /// Sleep between poll passes.
    pub poll_interval: Duration,
    /// Pause after a source rate-limit signal.
    pub rate_limit_cooldown: Duration,
    /// SQLite URL for the persistent seen store; `None` selects the
    /// bounded in-memory store.
    pub seen_db_url: Option<String>,
    /// Port for the liveness endpoint; `None` disables it.
    pub health_port: Option<u16>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("telegram_token", &"[REDACTED]")
            .field("chat_id", &self.chat_id)
            .field("twitter_bearer", &"[REDACTED]")
            .field("accounts", &self.accounts)
            .field("poll_interval", &self.poll_interval)
            .field("rate_limit_cooldown", &self.rate_limit_cooldown)
            .field("seen_db_url", &self.seen_db_url)
            .field("health_port", &self.health_port)
            .finish()
    }
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through a lookup function (tests inject one instead of
    /// mutating the process environment).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let telegram_token = require(&lookup, "TELEGRAM_BOT_TOKEN")?;
        let chat_id = parse_required(&lookup, "TELEGRAM_CHAT_ID")?;
        let twitter_bearer = require(&lookup, "TWITTER_BEARER")?;
        let accounts = parse_handles(&require(&lookup, "TWITTER_USERS")?)?;

        let poll_interval = Duration::from_secs(parse_or(
            &lookup,
            "POLL_INTERVAL_SECS",
            DEFAULT_POLL_INTERVAL_SECS,
        )?);
        let rate_limit_cooldown = Duration::from_secs(parse_or(
            &lookup,
            "RATE_LIMIT_COOLDOWN_SECS",
            DEFAULT_RATE_LIMIT_COOLDOWN_SECS,
        )?);

        let seen_db_url = lookup("SEEN_DB_URL").filter(|v| !v.trim().is_empty());
        let health_port = match lookup("HEALTH_PORT") {
            Some(raw) => Some(parse("HEALTH_PORT", &raw)?),
            None => None,
        };

        Ok(Self {
            telegram_token: Secret::new(telegram_token),
            chat_id,
            twitter_bearer: Secret::new(twitter_bearer),
            accounts,
            poll_interval,
            rate_limit_cooldown,
            seen_db_url,
            health_port,
        })
    }
}

fn require(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String> {
    lookup(name)
        .filter(|v| !v.trim().is_empty())
        .ok_or(Error::Missing { name })
}

fn parse<T: std::str::FromStr>(name: &'static str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| Error::Invalid {
        name,
        value: raw.to_string(),
    })
}

fn parse_required<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<T> {
    parse(name, &require(lookup, name)?)
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T> {
    match lookup(name) {
        Some(raw) => parse(name, &raw),
        None => Ok(default),
    }
}

/// Split the comma-separated handle list, trimming whitespace and a
/// leading `@`. An effectively empty list is a configuration error.
fn parse_handles(raw: &str) -> Result<Vec<String>> {
    let handles: Vec<String> = raw
        .split(',')
        .map(|h| h.trim().trim_start_matches('@').to_string())
        .filter(|h| !h.is_empty())
        .collect();
    if handles.is_empty() {
        return Err(Error::Invalid {
            name: "TWITTER_USERS",
            value: raw.to_string(),
        });
    }
    Ok(handles)
}
