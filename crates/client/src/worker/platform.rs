//! Platform collaborators: open pages and system notifications.
//!
//! The worker only talks to pages and the notification tray through these
//! traits. Hosts embed real implementations; the in-memory ones back the
//! binary's simulated platform and the tests.

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;
use url::Url;

use tuneverse_core::Error;

use super::notify::{Broadcast, Notification};

/// An open page as the platform reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct ClientInfo {
    pub id: String,
    pub url: String,
    /// Whether this worker controls the page.
    pub controlled: bool,
    pub focused: bool,
}

/// Open pages.
#[async_trait]
pub trait Clients: Send + Sync {
    /// Every open page, optionally including pages this worker does not control.
    async fn match_all(&self, include_uncontrolled: bool) -> Result<Vec<ClientInfo>, Error>;

    async fn post_message(&self, client_id: &str, message: &Broadcast) -> Result<(), Error>;

    async fn focus(&self, client_id: &str) -> Result<(), Error>;

    /// Open a new page at `url`. Returns the new page's id.
    async fn open_window(&self, url: &Url) -> Result<String, Error>;

    /// Take control of every open page. Returns how many were claimed.
    async fn claim(&self) -> Result<usize, Error>;
}

/// Notification permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Permission {
    #[default]
    Granted,
    Denied,
}

/// System notifications, keyed by tag.
#[async_trait]
pub trait Notifications: Send + Sync {
    /// Show `notification`, replacing any notification with the same tag.
    async fn show(&self, notification: Notification) -> Result<(), Error>;

    /// Close the notification with `tag`. Returns whether one was open.
    async fn close(&self, tag: &str) -> Result<bool, Error>;
}

/// Pages held in memory.
#[derive(Debug, Default)]
pub struct InMemoryClients {
    pages: Mutex<Vec<ClientInfo>>,
    messages: Mutex<Vec<(String, Broadcast)>>,
    opened: Mutex<Vec<Url>>,
}

impl InMemoryClients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an open page.
    pub async fn add_client(&self, id: &str, url: &str, controlled: bool) {
        self.pages.lock().await.push(ClientInfo {
            id: id.to_string(),
            url: url.to_string(),
            controlled,
            focused: false,
        });
    }

    /// Messages delivered so far, as `(client id, message)`.
    pub async fn messages(&self) -> Vec<(String, Broadcast)> {
        self.messages.lock().await.clone()
    }

    /// URLs passed to `open_window` so far.
    pub async fn opened(&self) -> Vec<Url> {
        self.opened.lock().await.clone()
    }

    pub async fn focused(&self) -> Option<String> {
        self.pages.lock().await.iter().find(|p| p.focused).map(|p| p.id.clone())
    }
}

#[async_trait]
impl Clients for InMemoryClients {
    async fn match_all(&self, include_uncontrolled: bool) -> Result<Vec<ClientInfo>, Error> {
        let pages = self.pages.lock().await;
        Ok(pages.iter().filter(|p| include_uncontrolled || p.controlled).cloned().collect())
    }

    async fn post_message(&self, client_id: &str, message: &Broadcast) -> Result<(), Error> {
        if !self.pages.lock().await.iter().any(|p| p.id == client_id) {
            return Err(Error::Platform(format!("no such client: {client_id}")));
        }
        self.messages.lock().await.push((client_id.to_string(), message.clone()));
        Ok(())
    }

    async fn focus(&self, client_id: &str) -> Result<(), Error> {
        let mut pages = self.pages.lock().await;
        if !pages.iter().any(|p| p.id == client_id) {
            return Err(Error::Platform(format!("no such client: {client_id}")));
        }
        for page in pages.iter_mut() {
            page.focused = page.id == client_id;
        }
        Ok(())
    }

    async fn open_window(&self, url: &Url) -> Result<String, Error> {
        let mut pages = self.pages.lock().await;
        let id = format!("window-{}", pages.len() + 1);
        for page in pages.iter_mut() {
            page.focused = false;
        }
        pages.push(ClientInfo { id: id.clone(), url: url.to_string(), controlled: true, focused: true });
        self.opened.lock().await.push(url.clone());
        Ok(id)
    }

    async fn claim(&self) -> Result<usize, Error> {
        let mut pages = self.pages.lock().await;
        let mut claimed = 0;
        for page in pages.iter_mut().filter(|p| !p.controlled) {
            page.controlled = true;
            claimed += 1;
        }
        Ok(claimed)
    }
}

/// Notification tray held in memory.
#[derive(Debug, Default)]
pub struct InMemoryNotifications {
    permission: Permission,
    shown: Mutex<Vec<Notification>>,
}

impl InMemoryNotifications {
    pub fn granted() -> Self {
        Self::default()
    }

    pub fn denied() -> Self {
        Self { permission: Permission::Denied, ..Default::default() }
    }

    /// Every notification currently open.
    pub async fn open(&self) -> Vec<Notification> {
        self.shown.lock().await.clone()
    }
}

#[async_trait]
impl Notifications for InMemoryNotifications {
    async fn show(&self, notification: Notification) -> Result<(), Error> {
        if self.permission == Permission::Denied {
            return Err(Error::PermissionDenied("notifications are blocked".to_string()));
        }
        let mut shown = self.shown.lock().await;
        shown.retain(|n| n.tag != notification.tag);
        shown.push(notification);
        Ok(())
    }

    async fn close(&self, tag: &str) -> Result<bool, Error> {
        let mut shown = self.shown.lock().await;
        let before = shown.len();
        shown.retain(|n| n.tag != tag);
        Ok(shown.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::notify::{NotificationAction, NowPlaying};

    #[tokio::test]
    async fn test_match_all_filters_uncontrolled() {
        let clients = InMemoryClients::new();
        clients.add_client("a", "http://localhost:5000/", true).await;
        clients.add_client("b", "http://localhost:5000/player.html", false).await;

        assert_eq!(clients.match_all(false).await.unwrap().len(), 1);
        assert_eq!(clients.match_all(true).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_claim_takes_uncontrolled_pages() {
        let clients = InMemoryClients::new();
        clients.add_client("a", "http://localhost:5000/", true).await;
        clients.add_client("b", "http://localhost:5000/user.html", false).await;

        assert_eq!(clients.claim().await.unwrap(), 1);
        assert_eq!(clients.match_all(false).await.unwrap().len(), 2);
        assert_eq!(clients.claim().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_post_to_unknown_client_fails() {
        let clients = InMemoryClients::new();
        let message = Broadcast::NotificationAction { action: NotificationAction::Forward };
        assert!(clients.post_message("ghost", &message).await.is_err());
    }

    #[tokio::test]
    async fn test_show_replaces_by_tag() {
        let tray = InMemoryNotifications::granted();
        let playing = NowPlaying { title: Some("A".into()), is_playing: true, ..Default::default() };
        let paused = NowPlaying { title: Some("B".into()), ..Default::default() };

        tray.show(Notification::now_playing(&playing)).await.unwrap();
        tray.show(Notification::now_playing(&paused)).await.unwrap();

        let open = tray.open().await;
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].title, "B");
    }

    #[tokio::test]
    async fn test_denied_permission() {
        let tray = InMemoryNotifications::denied();
        let err = tray.show(Notification::now_playing(&NowPlaying::default())).await.unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));
        assert!(tray.open().await.is_empty());
    }
}
