//! Trait seams for the two external collaborators: the source API the
//! cycle fetches from and the destination chat it delivers to.

use {async_trait::async_trait, thiserror::Error};

use crate::types::Post;

/// Errors a [`PostSource`] can surface. The poll cycle branches on the
/// distinguished variants: `RateLimited` pauses the whole pass, everything
/// else is a per-account failure.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source API reported its global rate limit exceeded.
    #[error("source rate limit exceeded")]
    RateLimited,

    /// The handle does not resolve to an account.
    #[error("unknown handle: {handle}")]
    UnknownHandle { handle: String },

    /// The source answered with something we could not interpret.
    #[error("unexpected source response: {message}")]
    Response { message: String },

    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl SourceError {
    #[must_use]
    pub fn unknown_handle(handle: impl Into<String>) -> Self {
        Self::UnknownHandle {
            handle: handle.into(),
        }
    }

    #[must_use]
    pub fn response(message: impl Into<String>) -> Self {
        Self::Response {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

/// Read side: fetch the most recent posts of one account, newest-first,
/// with attachments resolved.
#[async_trait]
pub trait PostSource: Send + Sync {
    async fn recent_posts(&self, handle: &str) -> Result<Vec<Post>, SourceError>;
}

/// Write side: deliver posts and operator notices to the destination chat.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one post (text plus any photo attachments).
    async fn notify_post(&self, post: &Post) -> anyhow::Result<()>;

    /// Deliver a plain operator notice (startup summary, error mirror).
    async fn notify_text(&self, text: &str) -> anyhow::Result<()>;
}
