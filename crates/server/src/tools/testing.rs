//! Worker fixtures for tool tests.

use std::sync::Arc;

use url::Url;

use tuneverse_client::worker::{InMemoryClients, InMemoryNotifications};
use tuneverse_client::{FetchConfig, HttpNetwork, Platform, ServiceWorker};
use tuneverse_core::{AppConfig, CacheDb};

/// Nothing listens on the discard port, so every fetch is refused at once.
const UNREACHABLE_ORIGIN: &str = "http://127.0.0.1:9";

pub(crate) struct Fixture {
    pub worker: Arc<ServiceWorker>,
    pub db: Arc<CacheDb>,
    pub clients: Arc<InMemoryClients>,
    pub tray: Arc<InMemoryNotifications>,
}

pub(crate) async fn fixture() -> Fixture {
    let origin = Url::parse(UNREACHABLE_ORIGIN).unwrap();
    let config = Arc::new(AppConfig { origin: origin.clone(), static_manifest: vec![], ..Default::default() });
    let db = Arc::new(CacheDb::open_in_memory().await.unwrap());
    let network = Arc::new(HttpNetwork::new(FetchConfig::from_app(&config), origin).unwrap());
    let clients = Arc::new(InMemoryClients::new());
    let tray = Arc::new(InMemoryNotifications::granted());
    let platform = Platform::new(clients.clone(), tray.clone());
    let worker = Arc::new(ServiceWorker::new(config, db.clone(), network, platform).unwrap());
    Fixture { worker, db, clients, tray }
}

pub(crate) async fn offline_worker() -> Arc<ServiceWorker> {
    fixture().await.worker
}
