//! Channel link extraction and normalization.
//!
//! Messages reference other channels with `t.me/<name>` or
//! `t.me/joinchat/<hash>` links. This module finds those references and turns
//! them into canonical [`ChannelId`]s used as frontier keys.

mod codec;

pub use codec::{extract_references, normalize, ChannelId, ChannelKind};
