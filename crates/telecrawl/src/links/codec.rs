//! Link pattern matching and canonical channel identifiers.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Prefix of the canonical invite-link form.
const INVITE_PREFIX: &str = "https://t.me/joinchat/";

/// Channel references inside free text.
static REFERENCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"t\.me/(?:joinchat/)?[A-Za-z0-9_-]{5,}").expect("Invalid reference pattern")
});

/// The identifier segment of a link; group 1 marks an invite path.
static LINK_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"t\.me/(joinchat/)?([A-Za-z0-9_-]+)").expect("Invalid link segment pattern")
});

/// A bare username.
static BARE_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]{5,}$").expect("Invalid identifier pattern"));

/// Invite hashes are the same alphabet as usernames plus `-`.
static INVITE_HASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{5,}$").expect("Invalid invite hash pattern"));

/// How a channel is addressed, which decides how it is joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Public username, resolvable and readable without an invitation.
    Username,
    /// Private invite hash.
    Invite,
}

/// Canonical channel identifier: a bare username or a full invite link.
///
/// Two references that normalize to the same string are the same channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    fn username(name: &str) -> Self {
        Self(name.to_string())
    }

    fn invite(hash: &str) -> Self {
        Self(format!("{INVITE_PREFIX}{hash}"))
    }

    /// Canonical string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is a username or an invite link.
    #[must_use]
    pub fn kind(&self) -> ChannelKind {
        if self.0.starts_with(INVITE_PREFIX) {
            ChannelKind::Invite
        } else {
            ChannelKind::Username
        }
    }

    /// The invite hash, for invite identifiers.
    #[must_use]
    pub fn invite_hash(&self) -> Option<&str> {
        self.0.strip_prefix(INVITE_PREFIX)
    }

    /// The username, for username identifiers.
    #[must_use]
    pub fn username_str(&self) -> Option<&str> {
        match self.kind() {
            ChannelKind::Username => Some(&self.0),
            ChannelKind::Invite => None,
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Find every channel reference in `text`.
///
/// Returns the raw matched substrings in order of appearance.
pub fn extract_references(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    REFERENCE_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Normalize a raw reference into a canonical identifier.
///
/// Anything from the first `)` on is dropped (links are often written as
/// `(t.me/name)`), then whitespace is trimmed. Bare usernames are returned as
/// is. Links are reduced to their identifier segment, keeping the full invite
/// form for `joinchat` links. `None` means the reference is not recognizable
/// and should be skipped.
pub fn normalize(raw: &str) -> Option<ChannelId> {
    let trimmed = raw.split(')').next().unwrap_or_default().trim();
    if trimmed.is_empty() {
        return None;
    }

    if BARE_IDENTIFIER.is_match(trimmed) {
        return Some(ChannelId::username(trimmed));
    }

    if let Some(hash) = trimmed.strip_prefix(INVITE_PREFIX) {
        return INVITE_HASH.is_match(hash).then(|| ChannelId::invite(hash));
    }

    let captures = LINK_SEGMENT.captures(trimmed)?;
    let segment = captures.get(2)?.as_str();

    if captures.get(1).is_some() {
        return INVITE_HASH
            .is_match(segment)
            .then(|| ChannelId::invite(segment));
    }

    // `t.me/joinchat` is the invite path itself, not a channel
    if segment == "joinchat" {
        return None;
    }

    BARE_IDENTIFIER
        .is_match(segment)
        .then(|| ChannelId::username(segment))
}
