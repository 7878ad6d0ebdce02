//! Telegram delivery for birdwatch.
//!
//! Implements the relay's `Notifier` port using the teloxide library:
//! plain HTML messages for text-only posts, grouped media messages for
//! posts with photo attachments, and operator notices.

pub mod error;
pub mod format;
pub mod notifier;

pub use {
    error::{Error, Result},
    notifier::TelegramNotifier,
};
