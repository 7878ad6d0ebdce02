//! Persistence trait for delivered-post bookkeeping.

use async_trait::async_trait;

use crate::Result;

/// Record of which post ids have already been delivered, scoped per
/// account. Mutated only by the poll cycle, and only after a confirmed
/// delivery; an id present here is never redelivered.
#[async_trait]
pub trait SeenStore: Send + Sync {
    async fn is_seen(&self, handle: &str, post_id: &str) -> Result<bool>;

    /// Must be durable before it returns: a crash after `mark_seen`
    /// resolves may not resurrect the post.
    async fn mark_seen(&self, handle: &str, post_id: &str) -> Result<()>;
}
