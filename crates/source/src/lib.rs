//! Twitter/X v2 client for birdwatch.
//!
//! Resolves handles to account ids and fetches recent-post pages with
//! media expansions, implementing the relay's `PostSource` port.

pub mod client;

pub use client::{PAGE_SIZE, TwitterClient};
