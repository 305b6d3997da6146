//! Install and activation.
//!
//! A worker moves `Installing → Waiting → Activating → Active`. Installing
//! pre-caches the static manifest into the current generation's static tier;
//! activating deletes every store that does not belong to the current
//! generation and takes control of open pages.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use tuneverse_core::{AppConfig, CacheStorage, Destination, Error, Generation, Request, Tier};

use super::platform::Clients;
use crate::fetch::Network;
use crate::strategy::{Race, race};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Installing,
    Waiting,
    Activating,
    Active,
}

/// Result of pre-caching the static manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct InstallReport {
    /// Manifest paths stored in the static tier.
    pub cached: Vec<String>,
    /// Manifest paths that could not be fetched or stored.
    pub failed: Vec<String>,
    /// Whether installation went straight on to activation.
    pub activated: bool,
}

#[derive(Debug)]
struct Phase {
    state: LifecycleState,
    skip_requested: bool,
}

pub struct Lifecycle {
    config: Arc<AppConfig>,
    generation: Generation,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    clients: Arc<dyn Clients>,
    phase: Mutex<Phase>,
}

impl Lifecycle {
    pub fn new(
        config: Arc<AppConfig>, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>, clients: Arc<dyn Clients>,
    ) -> Self {
        Self {
            generation: Generation::from_config(&config),
            config,
            storage,
            network,
            clients,
            phase: Mutex::new(Phase { state: LifecycleState::Installing, skip_requested: false }),
        }
    }

    pub async fn state(&self) -> LifecycleState {
        self.phase.lock().await.state
    }

    /// Pre-cache every manifest asset, one by one. A missing asset is logged
    /// and skipped; it never aborts installation.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        let state = self.state().await;
        if state != LifecycleState::Installing {
            return Err(Error::InvalidState(format!("install requested while {state:?}")));
        }

        let store = self.generation.store_name(Tier::Static);
        self.storage.open_store(&store).await?;

        let mut report = InstallReport::default();
        for path in &self.config.static_manifest {
            match self.precache(&store, path).await {
                Ok(()) => report.cached.push(path.clone()),
                Err(e) => {
                    tracing::warn!(path, error = %e, "failed to pre-cache asset");
                    report.failed.push(path.clone());
                }
            }
        }

        tracing::info!(
            store,
            cached = report.cached.len(),
            failed = report.failed.len(),
            "installed static manifest"
        );

        let skip = {
            let mut phase = self.phase.lock().await;
            phase.state = LifecycleState::Waiting;
            phase.skip_requested || self.config.skip_waiting_on_install
        };

        if skip {
            report.activated = self.activate_if_waiting().await?.is_some();
        }

        Ok(report)
    }

    async fn precache(&self, store: &str, path: &str) -> Result<(), Error> {
        let url = self.config.resolve(path).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let destination = if path == "/" || path.ends_with(".html") { Destination::Document } else { Destination::Empty };
        let request = Request::get(url).with_destination(destination);

        let timeout = self.config.network_timeout();
        let incoming = match race(self.network.fetch(&request), timeout).await {
            Race::Settled(result) => result?,
            Race::TimedOut => return Err(Error::FetchTimeout(format!("{} after {}ms", request.url, timeout.as_millis()))),
        };

        if !(200..300).contains(&incoming.status()) {
            return Err(Error::Network(format!("{} answered {}", request.url, incoming.status())));
        }

        let response = incoming.read().await?;
        self.storage.put(store, &request, response).await
    }

    /// Activate now if waiting; remember the request if still installing.
    ///
    /// Returns the deleted store names when activation ran.
    pub async fn skip_waiting(&self) -> Result<Option<Vec<String>>, Error> {
        {
            let mut phase = self.phase.lock().await;
            if phase.state == LifecycleState::Installing {
                tracing::debug!("skip waiting requested during install");
                phase.skip_requested = true;
                return Ok(None);
            }
        }
        self.activate_if_waiting().await
    }

    /// The platform's own move out of `Waiting`, once no older worker controls
    /// any page.
    pub async fn advance(&self) -> Result<Option<Vec<String>>, Error> {
        self.activate_if_waiting().await
    }

    async fn activate_if_waiting(&self) -> Result<Option<Vec<String>>, Error> {
        {
            let mut phase = self.phase.lock().await;
            if phase.state != LifecycleState::Waiting {
                return Ok(None);
            }
            phase.state = LifecycleState::Activating;
        }

        match self.activate().await {
            Ok(deleted) => {
                self.phase.lock().await.state = LifecycleState::Active;
                Ok(Some(deleted))
            }
            Err(e) => {
                self.phase.lock().await.state = LifecycleState::Waiting;
                Err(e)
            }
        }
    }

    /// Delete stale generations, then claim open pages.
    async fn activate(&self) -> Result<Vec<String>, Error> {
        let mut deleted = Vec::new();
        for name in self.storage.store_names().await? {
            if self.generation.is_current(&name) {
                continue;
            }
            match self.storage.delete_store(&name).await {
                Ok(true) => deleted.push(name),
                Ok(false) => {}
                Err(e) => tracing::warn!(store = %name, error = %e, "failed to delete stale store"),
            }
        }

        let claimed = match self.clients.claim().await {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(error = %e, "failed to claim open pages");
                0
            }
        };

        tracing::info!(version = self.generation.version(), deleted = ?deleted, claimed, "activated");
        Ok(deleted)
    }
}
