//! `MessagingClient` over the public `t.me` web pages.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::{future, StreamExt};
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};

use crate::error::{CrawlError, Result};
use crate::links::{ChannelId, ChannelKind};

use super::client::{Entity, MessagingClient, RemoteMessage};
use super::parser::{PreviewPage, PreviewParser};

const TELEGRAM_WEB_BASE: &str = "https://t.me";

/// Settings for the web preview client.
#[derive(Debug, Clone)]
pub struct PreviewConfig {
    /// Origin serving the entity and preview pages.
    pub base_url: String,
    /// User agent sent with every request.
    pub user_agent: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Wait assumed when a 429 carries no usable `Retry-After`.
    pub default_rate_limit_wait: Duration,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            base_url: TELEGRAM_WEB_BASE.to_string(),
            user_agent: format!("telecrawl/{}", env!("CARGO_PKG_VERSION")),
            timeout: Duration::from_secs(30),
            default_rate_limit_wait: Duration::from_secs(30),
        }
    }
}

/// Paging position while walking a preview backwards in time.
#[derive(Debug, Clone, Copy)]
enum Cursor {
    Start,
    Before(u64),
    Done,
}

/// Reads public channels through `t.me/<name>` and `t.me/s/<name>`.
///
/// No login is involved, so joining a public channel is a no-op and
/// invite-only channels are reported as unavailable.
pub struct WebPreviewClient {
    client: Client,
    config: PreviewConfig,
}

impl WebPreviewClient {
    /// Create a client with the given settings.
    pub fn new(config: PreviewConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()?;

        Ok(Self { client, config })
    }

    fn base(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// GET a page, mapping throttling and missing pages to crawl errors.
    ///
    /// Returns the final URL path (after redirects) and the body.
    async fn fetch(&self, url: &str) -> Result<(String, String)> {
        tracing::debug!(url, "Fetching page");

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let wait = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map_or(self.config.default_rate_limit_wait, Duration::from_secs);
            return Err(CrawlError::RateLimited { wait });
        }

        if status == StatusCode::NOT_FOUND {
            return Err(CrawlError::EntityUnavailable(format!("{url} not found")));
        }

        if !status.is_success() {
            return Err(CrawlError::Transient(format!("HTTP {status} from {url}")));
        }

        let path = response.url().path().to_string();
        let body = response.text().await?;
        Ok((path, body))
    }

    async fn fetch_preview_page(&self, username: &str, before: Option<u64>) -> Result<PreviewPage> {
        let mut url = format!("{}/s/{username}", self.base());
        if let Some(before) = before {
            url.push_str(&format!("?before={before}"));
        }

        let (path, body) = self.fetch(&url).await?;

        // t.me redirects to the landing page when the preview is disabled
        if !path.starts_with("/s/") {
            return Err(CrawlError::EntityUnavailable(format!(
                "{username} has no public preview"
            )));
        }

        let mut page = PreviewParser::parse_preview(&body);
        if before.is_none() && page.title.is_none() && page.posts.is_empty() {
            return Err(CrawlError::EntityUnavailable(format!(
                "{username} has no public preview"
            )));
        }

        page.posts.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(page)
    }
}

#[async_trait]
impl MessagingClient for WebPreviewClient {
    async fn resolve(&self, id: &ChannelId) -> Result<Entity> {
        let (url, key, username) = match id.kind() {
            ChannelKind::Username => {
                let name = id.as_str();
                (format!("{}/{name}", self.base()), name, Some(name))
            }
            ChannelKind::Invite => {
                let hash = id.invite_hash().unwrap_or_default();
                (format!("{}/joinchat/{hash}", self.base()), hash, None)
            }
        };

        let (_, body) = self.fetch(&url).await?;

        let entity = PreviewParser::parse_entity(&body, key, username)
            .ok_or_else(|| CrawlError::EntityUnavailable(format!("{id} does not exist")))?;

        tracing::debug!(channel = %id, entity = %entity.display_name(), "Resolved entity");
        Ok(entity)
    }

    async fn join(&self, entity: &Entity) -> Result<()> {
        if entity.username().is_some() {
            tracing::debug!(
                entity = %entity.display_name(),
                "Public entity, reading preview anonymously"
            );
            return Ok(());
        }

        Err(CrawlError::EntityUnavailable(format!(
            "{} is invite-only and needs an authenticated session",
            entity.display_name()
        )))
    }

    fn recent_messages<'a>(
        &'a self,
        entity: &'a Entity,
        limit: usize,
    ) -> BoxStream<'a, Result<RemoteMessage>> {
        let Some(username) = entity.username() else {
            let err = CrawlError::EntityUnavailable(format!(
                "{} has no public preview",
                entity.display_name()
            ));
            return stream::once(future::ready(Err(err))).boxed();
        };

        if limit == 0 {
            return stream::empty().boxed();
        }

        stream::unfold(Cursor::Start, move |cursor| async move {
            let before = match cursor {
                Cursor::Done => return None,
                Cursor::Start => None,
                Cursor::Before(id) => Some(id),
            };

            match self.fetch_preview_page(username, before).await {
                Ok(page) if page.posts.is_empty() => None,
                Ok(page) => {
                    let next = match page.oldest_post_id() {
                        Some(oldest) if oldest > 1 && before.is_none_or(|b| oldest < b) => {
                            Cursor::Before(oldest)
                        }
                        _ => Cursor::Done,
                    };
                    let messages: Vec<RemoteMessage> =
                        page.posts.into_iter().map(|(_, message)| message).collect();
                    Some((Ok(messages), next))
                }
                Err(e) => Some((Err(e), Cursor::Done)),
            }
        })
        .flat_map(|page| match page {
            Ok(messages) => stream::iter(messages.into_iter().map(Ok)).left_stream(),
            Err(e) => stream::once(future::ready(Err(e))).right_stream(),
        })
        .take(limit)
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::links::normalize;
    use futures::TryStreamExt;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> WebPreviewClient {
        WebPreviewClient::new(PreviewConfig {
            base_url: server.uri(),
            ..Default::default()
        })
        .unwrap()
    }

    fn post(id: u64, text: &str) -> String {
        format!(
            r#"<div class="tgme_widget_message" data-post="sec_feed/{id}">
                <div class="tgme_widget_message_text">{text}</div>
                <a class="tgme_widget_message_date"><time datetime="2024-05-0{}T08:00:00+00:00"></time></a>
            </div>"#,
            id % 9 + 1
        )
    }

    fn preview_page(posts: &[(u64, &str)]) -> String {
        let body: String = posts.iter().map(|(id, text)| post(*id, text)).collect();
        format!(
            r#"<html><body><div class="tgme_channel_info_header_title">Sec Feed</div>{body}</body></html>"#
        )
    }

    #[tokio::test]
    async fn test_resolve_public_channel() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sec_feed"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<div class="tgme_page_title">Sec Feed</div><div class="tgme_page_extra">900 subscribers</div>"#,
            ))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let entity = client
            .resolve(&normalize("t.me/sec_feed").unwrap())
            .await
            .unwrap();

        assert_eq!(entity.display_name(), "Sec Feed");
        assert_eq!(entity.username(), Some("sec_feed"));
        client.join(&entity).await.unwrap();
    }

    #[tokio::test]
    async fn test_resolve_unknown_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ghost_channel"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client
            .resolve(&normalize("ghost_channel").unwrap())
            .await;

        assert!(matches!(result, Err(CrawlError::EntityUnavailable(_))));
    }

    #[tokio::test]
    async fn test_rate_limit_carries_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/busy_channel"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "12"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .resolve(&normalize("busy_channel").unwrap())
            .await
            .unwrap_err();

        assert_eq!(err.rate_limit_wait(), Some(Duration::from_secs(12)));
    }

    #[tokio::test]
    async fn test_invite_only_cannot_be_joined() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/joinchat/AbC123"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<div class="tgme_page_title">Private Ops</div><div class="tgme_page_extra">40 members</div>"#,
            ))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let entity = client
            .resolve(&normalize("t.me/joinchat/AbC123").unwrap())
            .await
            .unwrap();

        assert!(matches!(entity, Entity::Chat { .. }));
        assert!(matches!(
            client.join(&entity).await,
            Err(CrawlError::EntityUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_recent_messages_pages_newest_first() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/s/sec_feed"))
            .and(query_param("before", "101"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(preview_page(&[(99, "older"), (100, "old")])),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/s/sec_feed"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(preview_page(&[(101, "recent"), (102, "latest")])),
            )
            .with_priority(10)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let entity = Entity::Channel {
            id: "sec_feed".to_string(),
            title: Some("Sec Feed".to_string()),
            username: Some("sec_feed".to_string()),
        };

        let messages: Vec<RemoteMessage> = client
            .recent_messages(&entity, 3)
            .try_collect()
            .await
            .unwrap();

        let texts: Vec<_> = messages.iter().filter_map(|m| m.text.as_deref()).collect();
        assert_eq!(texts, vec!["latest", "recent", "old"]);
    }

    #[tokio::test]
    async fn test_disabled_preview_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/s/quiet_channel"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("Location", format!("{}/quiet_channel", server.uri())),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/quiet_channel"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let entity = Entity::Channel {
            id: "quiet_channel".to_string(),
            title: None,
            username: Some("quiet_channel".to_string()),
        };

        let first = client.recent_messages(&entity, 10).next().await.unwrap();
        assert!(matches!(first, Err(CrawlError::EntityUnavailable(_))));
    }
}
