//! Now-playing notification and the bridge from notification clicks to pages.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use tuneverse_core::Error;

use super::platform::{Clients, Notifications};

/// Tag shared by every now-playing notification, so a new one replaces the old.
pub const NOW_PLAYING_TAG: &str = "now-playing";

const DEFAULT_TITLE: &str = "Now Playing";
const DEFAULT_ICON: &str = "/logo.svg";
const BADGE: &str = "/logo.svg";

/// Descriptor a page sends with `SHOW_NOW_PLAYING`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct NowPlaying {
    pub title: Option<String>,
    pub artist: Option<String>,
    /// Media URL the page is playing.
    pub url: Option<String>,
    pub thumbnail: Option<String>,
    pub is_playing: bool,
}

/// Buttons on the now-playing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum NotificationAction {
    Rewind,
    Playpause,
    Forward,
    Close,
}

impl NotificationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationAction::Rewind => "rewind",
            NotificationAction::Playpause => "playpause",
            NotificationAction::Forward => "forward",
            NotificationAction::Close => "close",
        }
    }
}

impl fmt::Display for NotificationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rewind" => Ok(NotificationAction::Rewind),
            "playpause" => Ok(NotificationAction::Playpause),
            "forward" => Ok(NotificationAction::Forward),
            "close" => Ok(NotificationAction::Close),
            other => Err(Error::InvalidInput(format!("unknown notification action: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ActionButton {
    pub action: NotificationAction,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct NotificationData {
    pub url: Option<String>,
}

/// A system notification as handed to the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub tag: String,
    pub renotify: bool,
    pub require_interaction: bool,
    pub data: NotificationData,
    pub actions: Vec<ActionButton>,
}

/// Blank strings count as missing.
fn non_empty_or(value: &Option<String>, default: &str) -> String {
    match value.as_deref() {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}

impl Notification {
    pub fn now_playing(descriptor: &NowPlaying) -> Self {
        let playpause = if descriptor.is_playing { "⏸ Pause" } else { "▶ Play" };
        let button = |action, title: &str| ActionButton { action, title: title.to_string() };

        Self {
            title: non_empty_or(&descriptor.title, DEFAULT_TITLE),
            body: non_empty_or(&descriptor.artist, ""),
            icon: non_empty_or(&descriptor.thumbnail, DEFAULT_ICON),
            badge: BADGE.to_string(),
            tag: NOW_PLAYING_TAG.to_string(),
            renotify: true,
            require_interaction: false,
            data: NotificationData { url: descriptor.url.clone() },
            actions: vec![
                button(NotificationAction::Rewind, "⏪ 10s"),
                button(NotificationAction::Playpause, playpause),
                button(NotificationAction::Forward, "10s ⏩"),
                button(NotificationAction::Close, "✕ Close"),
            ],
        }
    }
}

/// Messages the worker sends to pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Broadcast {
    NotificationAction { action: NotificationAction },
}

/// What a notification click did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct ClickOutcome {
    /// Pages the action was delivered to.
    pub broadcast_to: Vec<String>,
    pub focused: Option<String>,
    /// Page opened because none was open.
    pub opened_window: Option<String>,
}

/// Shows the now-playing notification and relays its buttons to pages.
#[derive(Clone)]
pub struct NotificationBridge {
    clients: Arc<dyn Clients>,
    notifications: Arc<dyn Notifications>,
    root: Url,
}

impl NotificationBridge {
    pub fn new(clients: Arc<dyn Clients>, notifications: Arc<dyn Notifications>, root: Url) -> Self {
        Self { clients, notifications, root }
    }

    /// Show or replace the now-playing notification.
    ///
    /// Returns `false` when the platform has notifications blocked.
    pub async fn show_now_playing(&self, descriptor: &NowPlaying) -> Result<bool, Error> {
        match self.notifications.show(Notification::now_playing(descriptor)).await {
            Ok(()) => Ok(true),
            Err(Error::PermissionDenied(reason)) => {
                tracing::debug!(%reason, "notification permission not granted");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Handle a click on the now-playing notification.
    pub async fn on_click(&self, action: Option<NotificationAction>) -> Result<ClickOutcome, Error> {
        self.notifications.close(NOW_PLAYING_TAG).await?;

        let pages = self.clients.match_all(true).await?;
        let mut outcome = ClickOutcome::default();

        if let Some(action) = action {
            let message = Broadcast::NotificationAction { action };
            for page in &pages {
                match self.clients.post_message(&page.id, &message).await {
                    Ok(()) => outcome.broadcast_to.push(page.id.clone()),
                    Err(e) => tracing::warn!(client = %page.id, error = %e, "failed to deliver notification action"),
                }
            }
            tracing::debug!(%action, pages = outcome.broadcast_to.len(), "relayed notification action");
        }

        match pages.first() {
            Some(first) => {
                self.clients.focus(&first.id).await?;
                outcome.focused = Some(first.id.clone());
            }
            None => {
                let id = self.clients.open_window(&self.root).await?;
                tracing::info!(url = %self.root, "opened application window");
                outcome.opened_window = Some(id);
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::testing::url;
    use crate::worker::platform::{InMemoryClients, InMemoryNotifications};

    fn bridge(clients: Arc<InMemoryClients>, tray: Arc<InMemoryNotifications>) -> NotificationBridge {
        NotificationBridge::new(clients, tray, url("/"))
    }

    #[test]
    fn test_defaults() {
        let n = Notification::now_playing(&NowPlaying::default());
        assert_eq!(n.title, "Now Playing");
        assert_eq!(n.body, "");
        assert_eq!(n.icon, "/logo.svg");
        assert_eq!(n.badge, "/logo.svg");
        assert_eq!(n.tag, "now-playing");
        assert!(n.renotify);
        assert!(!n.require_interaction);
        assert_eq!(n.data.url, None);
        assert_eq!(n.actions[1].title, "▶ Play");
    }

    #[test]
    fn test_blank_fields_fall_back_to_defaults() {
        let descriptor = NowPlaying {
            title: Some(String::new()),
            artist: Some(String::new()),
            thumbnail: Some(String::new()),
            ..Default::default()
        };
        let n = Notification::now_playing(&descriptor);
        assert_eq!(n.title, "Now Playing");
        assert_eq!(n.body, "");
        assert_eq!(n.icon, "/logo.svg");
    }

    #[test]
    fn test_from_descriptor() {
        let descriptor: NowPlaying = serde_json::from_value(json!({
            "title": "Midnight City",
            "artist": "M83",
            "url": "/api/play/m83.mp3",
            "thumbnail": "https://i.ytimg.com/vi/x/hq.jpg",
            "isPlaying": true,
        }))
        .unwrap();
        let n = Notification::now_playing(&descriptor);
        assert_eq!(n.title, "Midnight City");
        assert_eq!(n.body, "M83");
        assert_eq!(n.icon, "https://i.ytimg.com/vi/x/hq.jpg");
        assert_eq!(n.data.url.as_deref(), Some("/api/play/m83.mp3"));

        let labels: Vec<_> = n.actions.iter().map(|a| (a.action.as_str(), a.title.as_str())).collect();
        assert_eq!(
            labels,
            vec![("rewind", "⏪ 10s"), ("playpause", "⏸ Pause"), ("forward", "10s ⏩"), ("close", "✕ Close")]
        );
    }

    #[test]
    fn test_broadcast_wire_shape() {
        let message = Broadcast::NotificationAction { action: NotificationAction::Playpause };
        assert_eq!(serde_json::to_value(&message).unwrap(), json!({ "type": "NOTIFICATION_ACTION", "action": "playpause" }));
    }

    #[test]
    fn test_action_from_str() {
        assert_eq!("forward".parse::<NotificationAction>().unwrap(), NotificationAction::Forward);
        assert!("skip".parse::<NotificationAction>().is_err());
    }

    #[tokio::test]
    async fn test_denied_is_not_an_error() {
        let b = bridge(Arc::new(InMemoryClients::new()), Arc::new(InMemoryNotifications::denied()));
        assert!(!b.show_now_playing(&NowPlaying::default()).await.unwrap());
    }

    #[tokio::test]
    async fn test_action_reaches_every_page() {
        let clients = Arc::new(InMemoryClients::new());
        clients.add_client("a", "http://localhost:5000/player.html", true).await;
        clients.add_client("b", "http://localhost:5000/", false).await;
        let tray = Arc::new(InMemoryNotifications::granted());
        let b = bridge(clients.clone(), tray.clone());
        b.show_now_playing(&NowPlaying::default()).await.unwrap();

        let outcome = b.on_click(Some(NotificationAction::Forward)).await.unwrap();
        assert_eq!(outcome.broadcast_to, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(outcome.focused.as_deref(), Some("a"));
        assert!(outcome.opened_window.is_none());
        assert!(tray.open().await.is_empty());

        let messages = clients.messages().await;
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().all(|(_, m)| *m == Broadcast::NotificationAction { action: NotificationAction::Forward }));
    }

    #[tokio::test]
    async fn test_body_click_only_focuses() {
        let clients = Arc::new(InMemoryClients::new());
        clients.add_client("a", "http://localhost:5000/", true).await;
        let b = bridge(clients.clone(), Arc::new(InMemoryNotifications::granted()));

        let outcome = b.on_click(None).await.unwrap();
        assert!(outcome.broadcast_to.is_empty());
        assert!(clients.messages().await.is_empty());
        assert_eq!(clients.focused().await.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_no_pages_opens_root() {
        let clients = Arc::new(InMemoryClients::new());
        let b = bridge(clients.clone(), Arc::new(InMemoryNotifications::granted()));

        let outcome = b.on_click(Some(NotificationAction::Playpause)).await.unwrap();
        assert!(outcome.broadcast_to.is_empty());
        assert!(outcome.opened_window.is_some());
        assert_eq!(clients.opened().await, vec![url("/")]);
    }
}
