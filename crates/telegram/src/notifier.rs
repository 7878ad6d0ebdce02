//! Outbound delivery to the destination chat.

use std::{future::Future, time::Duration};

use {
    anyhow::Result as AnyhowResult,
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    teloxide::{
        RequestError,
        payloads::SendMessageSetters,
        prelude::*,
        types::{ChatId, InputFile, InputMedia, InputMediaPhoto, ParseMode},
    },
    tracing::{debug, info, warn},
};

use birdwatch_relay::{Notifier, Post};

use crate::{
    Result,
    error::Error,
    format::{self, TELEGRAM_CAPTION_LIMIT, TELEGRAM_MAX_MESSAGE_LEN},
};

/// Destination-imposed maximum number of items in one grouped message.
pub const MEDIA_GROUP_LIMIT: usize = 10;

const RETRY_AFTER_MAX_RETRIES: usize = 4;

/// Client timeout for Bot API calls, so a hung call cannot stall the
/// cycle indefinitely.
const API_TIMEOUT: Duration = Duration::from_secs(45);

/// Sends posts and operator notices to one fixed chat.
pub struct TelegramNotifier {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramNotifier {
    pub fn new(token: &Secret<String>, chat_id: i64) -> Result<Self> {
        let client = teloxide::net::default_reqwest_settings()
            .timeout(API_TIMEOUT)
            .build()?;
        Ok(Self {
            bot: Bot::with_client(token.expose_secret(), client),
            chat_id: ChatId(chat_id),
        })
    }

    async fn send_post(&self, post: &Post) -> Result<()> {
        let photos: Vec<&str> = post.photo_urls().collect();

        if photos.is_empty() {
            let caption = format::build_caption(post, TELEGRAM_MAX_MESSAGE_LEN);
            self.run_with_retry("send message", || {
                let req = self
                    .bot
                    .send_message(self.chat_id, &caption)
                    .parse_mode(ParseMode::Html);
                async move { req.await }
            })
            .await?;
            info!(post_id = %post.id, author = %post.author, "post sent as text");
            return Ok(());
        }

        if photos.len() > MEDIA_GROUP_LIMIT {
            debug!(
                post_id = %post.id,
                dropped = photos.len() - MEDIA_GROUP_LIMIT,
                "media group over the destination cap, dropping excess"
            );
        }

        let caption = format::build_caption(post, TELEGRAM_CAPTION_LIMIT);
        let group = build_media_group(&photos, &caption)?;
        self.run_with_retry("send media group", || {
            let req = self.bot.send_media_group(self.chat_id, group.clone());
            async move { req.await }
        })
        .await?;
        info!(
            post_id = %post.id,
            author = %post.author,
            items = photos.len().min(MEDIA_GROUP_LIMIT),
            "post sent as media group"
        );
        Ok(())
    }

    async fn send_text(&self, text: &str) -> Result<()> {
        let body = format::escape_html(text);
        let body = format::truncate_at_char_boundary(&body, TELEGRAM_MAX_MESSAGE_LEN);
        self.run_with_retry("send notice", || {
            let req = self
                .bot
                .send_message(self.chat_id, body)
                .parse_mode(ParseMode::Html);
            async move { req.await }
        })
        .await?;
        Ok(())
    }

    /// Run a Bot API request, honoring `RetryAfter` responses up to a
    /// small bounded retry count.
    async fn run_with_retry<T, F, Fut>(
        &self,
        operation: &'static str,
        mut request: F,
    ) -> std::result::Result<T, RequestError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, RequestError>>,
    {
        let mut retries = 0usize;

        loop {
            match request().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let Some(wait) = retry_after_duration(&err) else {
                        return Err(err);
                    };

                    if retries >= RETRY_AFTER_MAX_RETRIES {
                        warn!(
                            chat_id = self.chat_id.0,
                            operation,
                            retries,
                            retry_after_secs = wait.as_secs(),
                            "telegram rate limit persisted after retries"
                        );
                        return Err(err);
                    }

                    retries += 1;
                    warn!(
                        chat_id = self.chat_id.0,
                        operation,
                        retries,
                        retry_after_secs = wait.as_secs(),
                        "telegram rate limited, waiting before retry"
                    );
                    tokio::time::sleep(wait).await;
                },
            }
        }
    }
}

/// Build the grouped-media payload: up to [`MEDIA_GROUP_LIMIT`] photos,
/// with the caption attached to the first item only.
fn build_media_group(urls: &[&str], caption: &str) -> Result<Vec<InputMedia>> {
    urls.iter()
        .take(MEDIA_GROUP_LIMIT)
        .enumerate()
        .map(|(i, raw)| {
            let url = raw.parse().map_err(|source| Error::InvalidMediaUrl {
                url: (*raw).to_string(),
                source,
            })?;
            let mut photo = InputMediaPhoto::new(InputFile::url(url));
            if i == 0 {
                photo = photo.caption(caption).parse_mode(ParseMode::Html);
            }
            Ok(InputMedia::Photo(photo))
        })
        .collect()
}

fn retry_after_duration(error: &RequestError) -> Option<Duration> {
    match error {
        RequestError::RetryAfter(wait) => Some(wait.duration()),
        _ => None,
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify_post(&self, post: &Post) -> AnyhowResult<()> {
        Ok(self.send_post(post).await?)
    }

    async fn notify_text(&self, text: &str) -> AnyhowResult<()> {
        Ok(self.send_text(text).await?)
    }
}
