//! HTML parsing for `t.me` entity pages and public channel previews.

use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};

use super::client::{Entity, RemoteMessage};

/// One parsed preview page (`t.me/s/<name>`).
#[derive(Debug, Clone, Default)]
pub struct PreviewPage {
    /// Channel title from the preview header.
    pub title: Option<String>,
    /// Posts in page order (oldest first), with their numeric post ids.
    pub posts: Vec<(u64, RemoteMessage)>,
}

impl PreviewPage {
    /// Smallest post id on the page, used as the `before` cursor.
    #[must_use]
    pub fn oldest_post_id(&self) -> Option<u64> {
        self.posts.iter().map(|(id, _)| *id).min()
    }
}

/// Parser for `t.me` HTML.
pub struct PreviewParser;

impl PreviewParser {
    /// Parse the entity landing page (`t.me/<name>` or `t.me/joinchat/<hash>`).
    ///
    /// Returns `None` when the page carries no entity (unknown username or
    /// expired invite).
    pub fn parse_entity(html: &str, id: &str, username: Option<&str>) -> Option<Entity> {
        let document = Html::parse_document(html);
        let title_selector = Selector::parse(".tgme_page_title").expect("Invalid title selector");
        let extra_selector = Selector::parse(".tgme_page_extra").expect("Invalid extra selector");

        let title = document
            .select(&title_selector)
            .next()
            .map(|el| collapse_whitespace(&element_text(el)))
            .filter(|t| !t.is_empty())?;

        let extra = document
            .select(&extra_selector)
            .next()
            .map(|el| collapse_whitespace(&element_text(el)))
            .unwrap_or_default()
            .to_lowercase();

        let id = id.to_string();
        let username = username.map(ToString::to_string);

        let entity = if extra.contains("subscriber") {
            Entity::Channel {
                id,
                title: Some(title),
                username,
            }
        } else if extra.contains("member") {
            Entity::Chat {
                id,
                title: Some(title),
                username,
            }
        } else if extra.starts_with('@') {
            Entity::User { id, username }
        } else {
            tracing::debug!(id, extra, "Unrecognized entity page, assuming channel");
            Entity::Channel {
                id,
                title: Some(title),
                username,
            }
        };

        Some(entity)
    }

    /// Parse a public preview page into posts.
    pub fn parse_preview(html: &str) -> PreviewPage {
        let document = Html::parse_document(html);

        let header_selector = Selector::parse(".tgme_channel_info_header_title")
            .expect("Invalid header selector");
        let message_selector =
            Selector::parse(".tgme_widget_message[data-post]").expect("Invalid message selector");
        let text_selector =
            Selector::parse(".tgme_widget_message_text").expect("Invalid text selector");
        let author_selector = Selector::parse(".tgme_widget_message_from_author")
            .expect("Invalid author selector");
        let time_selector = Selector::parse(".tgme_widget_message_date time[datetime]")
            .expect("Invalid time selector");

        let title = document
            .select(&header_selector)
            .next()
            .map(|el| collapse_whitespace(&element_text(el)))
            .filter(|t| !t.is_empty());

        let mut posts = Vec::new();
        for message in document.select(&message_selector) {
            let data_post = message.value().attr("data-post").unwrap_or_default();
            let Some((channel, post_id)) = parse_data_post(data_post) else {
                tracing::debug!(data_post, "Could not parse post reference, skipping");
                continue;
            };

            let text = message
                .select(&text_selector)
                .next()
                .map(|el| message_text(el).trim().to_string())
                .filter(|t| !t.is_empty());

            let sender = message
                .select(&author_selector)
                .next()
                .map(|el| collapse_whitespace(&element_text(el)))
                .filter(|a| !a.is_empty())
                .or_else(|| Some(channel.to_string()));

            let timestamp = message
                .select(&time_selector)
                .next()
                .and_then(|el| el.value().attr("datetime"))
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .map_or_else(Utc::now, |dt| dt.with_timezone(&Utc));

            posts.push((
                post_id,
                RemoteMessage {
                    sender,
                    timestamp,
                    text,
                },
            ));
        }

        tracing::debug!(count = posts.len(), "Parsed preview posts");
        PreviewPage { title, posts }
    }
}

/// Split `channel/123` into its parts.
fn parse_data_post(value: &str) -> Option<(&str, u64)> {
    let (channel, id) = value.rsplit_once('/')?;
    let id = id.parse().ok()?;
    (!channel.is_empty()).then_some((channel, id))
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>()
}

/// Post body text with line breaks kept and hidden `t.me` link targets
/// appended after their anchor text.
fn message_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    push_message_text(el, &mut out);
    out
}

fn push_message_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            continue;
        }
        let Some(child) = ElementRef::wrap(child) else {
            continue;
        };

        match child.value().name() {
            "br" => out.push('\n'),
            "a" => {
                let start = out.len();
                push_message_text(child, out);
                let target = child.value().attr("href").and_then(channel_link_target);
                if let Some(target) = target {
                    if !out[start..].contains(target) {
                        out.push_str(" (");
                        out.push_str(target);
                        out.push(')');
                    }
                }
            }
            _ => push_message_text(child, out),
        }
    }
}

/// `t.me/...` part of an href pointing at Telegram, without the scheme.
fn channel_link_target(href: &str) -> Option<&str> {
    let target = href
        .strip_prefix("https://")
        .or_else(|| href.strip_prefix("http://"))
        .unwrap_or(href);
    target.starts_with("t.me/").then_some(target)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::links::{extract_references, normalize};

    const CHANNEL_PAGE: &str = r#"<html><body>
        <div class="tgme_page_title"><span dir="auto">Threat Intel Daily</span></div>
        <div class="tgme_page_extra">12 345 subscribers</div>
    </body></html>"#;

    const PREVIEW_PAGE: &str = r#"<html><body>
        <div class="tgme_channel_info_header_title"><span>Threat Intel Daily</span></div>
        <div class="tgme_widget_message js-widget_message" data-post="threat_intel/101">
            <div class="tgme_widget_message_text js-message_text">New ransomware strain, see t.me/leak_watch</div>
            <a class="tgme_widget_message_date" href="https://t.me/threat_intel/101">
                <time datetime="2024-03-01T10:00:00+00:00" class="time">10:00</time>
            </a>
        </div>
        <div class="tgme_widget_message js-widget_message" data-post="threat_intel/102">
            <span class="tgme_widget_message_from_author">Alice</span>
            <a class="tgme_widget_message_date" href="https://t.me/threat_intel/102">
                <time datetime="2024-03-01T11:00:00+00:00" class="time">11:00</time>
            </a>
        </div>
    </body></html>"#;

    #[test]
    fn test_parse_channel_entity() {
        let entity = PreviewParser::parse_entity(CHANNEL_PAGE, "threat_intel", Some("threat_intel"))
            .unwrap();
        assert_eq!(
            entity,
            Entity::Channel {
                id: "threat_intel".to_string(),
                title: Some("Threat Intel Daily".to_string()),
                username: Some("threat_intel".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_user_and_group_entities() {
        let user_page = r#"<div class="tgme_page_title">Bob</div><div class="tgme_page_extra">@bob_sec</div>"#;
        let entity = PreviewParser::parse_entity(user_page, "bob_sec", Some("bob_sec")).unwrap();
        assert!(entity.is_user());
        assert_eq!(entity.display_name(), "@bob_sec");

        let group_page = r#"<div class="tgme_page_title">Red Team</div><div class="tgme_page_extra">1 200 members, 30 online</div>"#;
        let entity = PreviewParser::parse_entity(group_page, "redteam", None).unwrap();
        assert!(matches!(entity, Entity::Chat { .. }));
    }

    #[test]
    fn test_parse_missing_entity() {
        let page = r#"<html><body><div class="tgme_page_description">If you have Telegram, you can contact</div></body></html>"#;
        assert!(PreviewParser::parse_entity(page, "nobody", Some("nobody")).is_none());
    }

    #[test]
    fn test_parse_preview_posts() {
        let page = PreviewParser::parse_preview(PREVIEW_PAGE);
        assert_eq!(page.title.as_deref(), Some("Threat Intel Daily"));
        assert_eq!(page.posts.len(), 2);
        assert_eq!(page.oldest_post_id(), Some(101));

        let (id, first) = &page.posts[0];
        assert_eq!(*id, 101);
        assert_eq!(
            first.text.as_deref(),
            Some("New ransomware strain, see t.me/leak_watch")
        );
        assert_eq!(first.sender.as_deref(), Some("threat_intel"));
        assert_eq!(first.timestamp.to_rfc3339(), "2024-03-01T10:00:00+00:00");

        let (_, second) = &page.posts[1];
        assert!(second.text.is_none());
        assert_eq!(second.sender.as_deref(), Some("Alice"));
    }

    fn post_text(body: &str) -> String {
        let html = format!(
            r#"<div class="tgme_widget_message" data-post="leak_feed/7">
                <div class="tgme_widget_message_text">{body}</div>
            </div>"#
        );
        let page = PreviewParser::parse_preview(&html);
        page.posts[0].1.text.clone().unwrap()
    }

    #[test]
    fn test_line_breaks_separate_links() {
        let text = post_text("mirror t.me/leak_watch<br/>Stay safe");
        assert_eq!(text, "mirror t.me/leak_watch\nStay safe");
        assert_eq!(extract_references(&text), vec!["t.me/leak_watch"]);
    }

    #[test]
    fn test_anchor_targets_are_kept() {
        let text = post_text(r#"Join <a href="https://t.me/leak_watch">our backup</a>"#);
        assert_eq!(text, "Join our backup (t.me/leak_watch)");
        assert_eq!(extract_references(&text), vec!["t.me/leak_watch"]);
        assert_eq!(
            normalize(&extract_references(&text)[0]).unwrap().as_str(),
            "leak_watch"
        );

        // Visible links are not repeated, other sites are ignored
        let text = post_text(
            r#"<a href="https://t.me/leak_watch">t.me/leak_watch</a> and <a href="https://example.com/x">docs</a>"#,
        );
        assert_eq!(text, "t.me/leak_watch and docs");
    }

    #[test]
    fn test_parse_data_post() {
        assert_eq!(parse_data_post("chan/15"), Some(("chan", 15)));
        assert_eq!(parse_data_post("chan/abc"), None);
        assert_eq!(parse_data_post("/15"), None);
        assert_eq!(parse_data_post("15"), None);
    }
}
