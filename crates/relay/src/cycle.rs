//! The poll cycle: fetch recent posts per account, drop already-delivered
//! ones, forward the rest oldest-first, sleep, repeat forever.

use std::{sync::Arc, time::Duration};

use tracing::{debug, error, info, warn};

use crate::{
    Result,
    clock::Clock,
    ports::{Notifier, PostSource, SourceError},
    store::SeenStore,
};

/// Cycle tunables. All delays are fixed constants at runtime; the cycle
/// itself applies no backoff or jitter.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Handles to watch, in processing order. Loaded once at startup.
    pub accounts: Vec<String>,
    /// Sleep between passes.
    pub poll_interval: Duration,
    /// Pause applied to the whole pass when the source reports its rate
    /// limit exceeded.
    pub rate_limit_cooldown: Duration,
}

/// Outcome of processing one account within a pass.
enum AccountOutcome {
    /// New posts delivered (possibly zero).
    Delivered(usize),
    /// A per-account error was reported; the account's remaining work for
    /// this pass is abandoned.
    Failed,
    /// The source rate limit tripped; the pass must pause before touching
    /// the next account.
    RateLimited,
}

/// Drives the fetch → dedupe → deliver cycle over all configured accounts,
/// serially. Accounts are never processed in parallel: delivery order
/// stays deterministic and the source rate limit is global to the process.
pub struct Poller {
    source: Arc<dyn PostSource>,
    notifier: Arc<dyn Notifier>,
    store: Arc<dyn SeenStore>,
    clock: Arc<dyn Clock>,
    config: PollerConfig,
}

impl Poller {
    pub fn new(
        source: Arc<dyn PostSource>,
        notifier: Arc<dyn Notifier>,
        store: Arc<dyn SeenStore>,
        clock: Arc<dyn Clock>,
        config: PollerConfig,
    ) -> Self {
        Self {
            source,
            notifier,
            store,
            clock,
            config,
        }
    }

    /// Send the one-time startup summary listing the watched accounts.
    pub async fn announce_startup(&self) {
        let list = self
            .config
            .accounts
            .iter()
            .map(|handle| format!("• @{handle}"))
            .collect::<Vec<_>>()
            .join("\n");
        let text = format!("birdwatch is up and watching:\n\n{list}");
        if let Err(err) = self.notifier.notify_text(&text).await {
            warn!(error = %err, "startup notice delivery failed");
        }
    }

    /// Run passes forever. Per-account errors are handled inside the
    /// pass; anything that escapes it is logged, mirrored to the chat,
    /// and the loop goes back to sleep.
    pub async fn run_forever(&self) {
        loop {
            match self.run_pass().await {
                Ok(delivered) => info!(delivered, "poll pass complete"),
                Err(err) => {
                    error!(error = %err, "poll pass failed");
                    self.report(&format!("Unexpected error in the poll cycle: {err}"))
                        .await;
                },
            }
            self.clock.sleep(self.config.poll_interval).await;
        }
    }

    /// One full pass over all accounts. Returns the number of posts
    /// delivered.
    pub async fn run_pass(&self) -> Result<usize> {
        let mut delivered = 0;
        for handle in &self.config.accounts {
            match self.process_account(handle).await? {
                AccountOutcome::Delivered(count) => delivered += count,
                AccountOutcome::Failed => {},
                AccountOutcome::RateLimited => {
                    let cooldown = self.config.rate_limit_cooldown;
                    warn!(
                        handle,
                        cooldown_secs = cooldown.as_secs(),
                        "source rate limit hit, pausing pass"
                    );
                    self.report(&format!(
                        "Source rate limit hit while checking @{handle}. Pausing for {} minutes.",
                        cooldown.as_secs() / 60
                    ))
                    .await;
                    self.clock.sleep(cooldown).await;
                },
            }
        }
        Ok(delivered)
    }

    async fn process_account(&self, handle: &str) -> Result<AccountOutcome> {
        let page = match self.source.recent_posts(handle).await {
            Ok(page) => page,
            Err(SourceError::RateLimited) => return Ok(AccountOutcome::RateLimited),
            Err(err) => {
                warn!(handle, error = %err, "account check failed");
                self.report(&format!("Error while checking @{handle}: {err}"))
                    .await;
                return Ok(AccountOutcome::Failed);
            },
        };

        debug!(handle, count = page.len(), "fetched recent posts");

        let mut delivered = 0;
        // The source returns newest-first; deliver oldest-first so the
        // chat reads chronologically.
        for post in page.iter().rev() {
            if self.store.is_seen(handle, &post.id).await? {
                continue;
            }
            if let Err(err) = self.notifier.notify_post(post).await {
                error!(handle, post_id = %post.id, error = %err, "delivery failed");
                self.report(&format!(
                    "Error delivering post {} from @{handle}: {err}",
                    post.id
                ))
                .await;
                // Not marked seen, so the next pass retries this post.
                return Ok(AccountOutcome::Failed);
            }
            // Mark only after confirmed delivery.
            self.store.mark_seen(handle, &post.id).await?;
            delivered += 1;
            info!(handle, post_id = %post.id, "post delivered");
        }

        Ok(AccountOutcome::Delivered(delivered))
    }

    /// Mirror an error notice into the destination chat. Failure to
    /// deliver the notice itself is only logged.
    async fn report(&self, text: &str) {
        if let Err(err) = self.notifier.notify_text(text).await {
            debug!(error = %err, "error notice delivery failed");
        }
    }
}
