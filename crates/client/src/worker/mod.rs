//! The worker: entry points for fetch, message, lifecycle and notification
//! events.
//!
//! Each entry point is an independent invocation. The only state shared
//! between them is the cache storage and the lifecycle phase.

pub mod control;
pub mod lifecycle;
pub mod notify;
pub mod platform;

#[cfg(test)]
mod scenarios;

use std::sync::Arc;

use tuneverse_core::classify::{classify, route};
use tuneverse_core::{AppConfig, CacheStorage, Error, Generation, Request, Response, Tier};

use crate::fetch::Network;
use crate::lifetime::Lifetime;
use crate::strategy::Strategies;

pub use control::{ControlMessage, PendingMessage, Reply};
pub use lifecycle::{InstallReport, Lifecycle, LifecycleState};
pub use notify::{Broadcast, ClickOutcome, Notification, NotificationAction, NotificationBridge, NowPlaying};
pub use platform::{ClientInfo, Clients, InMemoryClients, InMemoryNotifications, Notifications};

/// Tiers emptied by `CLEAR_CACHE`. The static shell survives.
const CLEARABLE_TIERS: [Tier; 2] = [Tier::Runtime, Tier::Api];

/// Platform collaborators the worker talks to.
#[derive(Clone)]
pub struct Platform {
    pub clients: Arc<dyn Clients>,
    pub notifications: Arc<dyn Notifications>,
}

impl Platform {
    pub fn new(clients: Arc<dyn Clients>, notifications: Arc<dyn Notifications>) -> Self {
        Self { clients, notifications }
    }
}

pub struct ServiceWorker {
    config: Arc<AppConfig>,
    generation: Generation,
    storage: Arc<dyn CacheStorage>,
    strategies: Strategies,
    lifecycle: Lifecycle,
    bridge: NotificationBridge,
    lifetime: Lifetime,
}

impl ServiceWorker {
    /// Build a worker for the generation named by `config`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` if the application root cannot be derived
    /// from the configured origin.
    pub fn new(
        config: Arc<AppConfig>, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>, platform: Platform,
    ) -> Result<Self, Error> {
        let root = config.resolve("/").map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let lifetime = Lifetime::new();

        Ok(Self {
            generation: Generation::from_config(&config),
            strategies: Strategies::new(config.clone(), storage.clone(), network.clone(), lifetime.clone()),
            lifecycle: Lifecycle::new(config.clone(), storage.clone(), network, platform.clients.clone()),
            bridge: NotificationBridge::new(platform.clients, platform.notifications, root),
            config,
            storage,
            lifetime,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn generation(&self) -> &Generation {
        &self.generation
    }

    pub fn lifetime(&self) -> &Lifetime {
        &self.lifetime
    }

    /// Wait for detached cache writes to finish.
    pub async fn settled(&self) {
        self.lifetime.settled().await;
    }

    pub async fn state(&self) -> LifecycleState {
        self.lifecycle.state().await
    }

    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.lifecycle.install().await
    }

    pub async fn advance(&self) -> Result<Option<Vec<String>>, Error> {
        self.lifecycle.advance().await
    }

    pub async fn skip_waiting(&self) -> Result<Option<Vec<String>>, Error> {
        self.lifecycle.skip_waiting().await
    }

    /// Answer a page request.
    ///
    /// Returns `None` for requests the worker does not intercept (cross-origin
    /// or non-GET); those go to the network untouched.
    pub async fn handle_fetch(&self, request: Request) -> Option<Response> {
        let class = classify(&request, &self.config)?;
        let route = route(class, &request, &self.config);
        let store = self.generation.store_name(route.tier);
        tracing::debug!(url = %request.url, ?class, store, "intercepted request");

        Some(self.strategies.run(&request, route, &store).await)
    }

    /// Dispatch a control message. Exactly one reply is sent when the sender
    /// attached a reply channel.
    pub async fn handle_message(&self, message: PendingMessage) {
        let (message, responder) = message.into_parts();

        let reply = match message {
            ControlMessage::SkipWaiting => {
                if let Err(e) = self.lifecycle.skip_waiting().await {
                    tracing::warn!(error = %e, "skip waiting failed");
                }
                Reply::Ack
            }
            ControlMessage::ClearCache => {
                let success = match self.clear_runtime_caches().await {
                    Ok(deleted) => {
                        tracing::info!(deleted = ?deleted, "cleared runtime caches");
                        true
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to clear runtime caches");
                        false
                    }
                };
                Reply::CacheCleared { success }
            }
            ControlMessage::GetCacheSize => {
                let size = self.cache_size().await.unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "failed to measure cache size");
                    0
                });
                Reply::CacheSize { size }
            }
            ControlMessage::ShowNowPlaying(descriptor) => {
                if let Err(e) = self.bridge.show_now_playing(&descriptor).await {
                    tracing::warn!(error = %e, "failed to show now-playing notification");
                }
                Reply::Ack
            }
            ControlMessage::Unknown => {
                tracing::debug!("ignoring unknown control message");
                Reply::Ignored
            }
        };

        responder.send(reply);
    }

    pub async fn handle_notification_click(&self, action: Option<NotificationAction>) -> Result<ClickOutcome, Error> {
        self.bridge.on_click(action).await
    }

    /// Total body bytes across every store.
    pub async fn cache_size(&self) -> Result<u64, Error> {
        self.storage.total_size().await
    }

    /// Delete the current runtime and api tiers. Returns the names that
    /// existed; the first failure is returned after every tier was tried.
    pub async fn clear_runtime_caches(&self) -> Result<Vec<String>, Error> {
        let mut deleted = Vec::new();
        let mut first_error = None;

        for tier in CLEARABLE_TIERS {
            let name = self.generation.store_name(tier);
            match self.storage.delete_store(&name).await {
                Ok(true) => deleted.push(name),
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(store = %name, error = %e, "failed to delete store");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(deleted),
        }
    }
}
