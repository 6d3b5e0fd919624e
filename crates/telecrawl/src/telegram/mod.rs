//! Telegram access.
//!
//! [`MessagingClient`] is the seam the crawler talks to. [`WebPreviewClient`]
//! implements it over the public `t.me` web pages, which expose entity
//! metadata and the recent posts of public channels without a login.

mod client;
mod parser;
mod preview;

pub use client::{Entity, MessagingClient, RemoteMessage};
pub use parser::{PreviewPage, PreviewParser};
pub use preview::{PreviewConfig, WebPreviewClient};
