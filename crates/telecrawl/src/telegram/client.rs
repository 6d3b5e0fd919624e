//! Messaging client abstraction and entity types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::links::ChannelId;

/// A resolved platform entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Entity {
    /// A user account. Nothing to join.
    User {
        id: String,
        username: Option<String>,
    },
    /// A broadcast channel.
    Channel {
        id: String,
        title: Option<String>,
        username: Option<String>,
    },
    /// A group chat.
    Chat {
        id: String,
        title: Option<String>,
        username: Option<String>,
    },
}

impl Entity {
    /// Human-readable name used in logs and records.
    #[must_use]
    pub fn display_name(&self) -> String {
        match self {
            Entity::User { id, username } => match username {
                Some(name) => format!("@{name}"),
                None => format!("User({id})"),
            },
            Entity::Channel { id, title, .. } | Entity::Chat { id, title, .. } => {
                match title.as_deref().filter(|t| !t.is_empty()) {
                    Some(title) => title.to_string(),
                    None => format!("Channel({id})"),
                }
            }
        }
    }

    /// Public username, if any.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        match self {
            Entity::User { username, .. }
            | Entity::Channel { username, .. }
            | Entity::Chat { username, .. } => username.as_deref(),
        }
    }

    /// Whether this entity is a user account.
    #[must_use]
    pub fn is_user(&self) -> bool {
        matches!(self, Entity::User { .. })
    }
}

/// A message as delivered by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteMessage {
    /// Sender identifier, when the platform exposes one.
    pub sender: Option<String>,
    /// When the message was posted.
    pub timestamp: DateTime<Utc>,
    /// Text content; `None` for media-only posts.
    pub text: Option<String>,
}

/// Remote capability used by the crawler.
///
/// Implementations signal throttling with [`CrawlError::RateLimited`],
/// private or missing entities with [`CrawlError::EntityUnavailable`] and
/// anything else with [`CrawlError::Transient`].
///
/// [`CrawlError::RateLimited`]: crate::error::CrawlError::RateLimited
/// [`CrawlError::EntityUnavailable`]: crate::error::CrawlError::EntityUnavailable
/// [`CrawlError::Transient`]: crate::error::CrawlError::Transient
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Resolve an identifier to an entity.
    async fn resolve(&self, id: &ChannelId) -> Result<Entity>;

    /// Join a channel or chat.
    async fn join(&self, entity: &Entity) -> Result<()>;

    /// Lazily iterate the most recent messages, newest first, up to `limit`.
    fn recent_messages<'a>(
        &'a self,
        entity: &'a Entity,
        limit: usize,
    ) -> BoxStream<'a, Result<RemoteMessage>>;
}
