//! Test doubles shared by the strategy and worker tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use url::{Position, Url};

use tuneverse_core::{AppConfig, CacheDb, CacheStorage, Error, Request, Response};

use crate::fetch::{Incoming, Network};

pub(crate) fn origin() -> Url {
    Url::parse("http://localhost:5000").unwrap()
}

pub(crate) fn url(path: &str) -> Url {
    origin().join(path).unwrap()
}

pub(crate) fn config() -> Arc<AppConfig> {
    Arc::new(AppConfig::default())
}

enum Scripted {
    Respond { response: Response, delay: Duration, body_delay: Duration },
    Fail,
}

/// Network that answers from a per-path script. Unscripted paths fail as if
/// the device were offline.
#[derive(Default)]
pub(crate) struct ScriptedNetwork {
    script: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedNetwork {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn respond(&self, path: &str, response: Response) {
        self.respond_after(path, response, Duration::ZERO);
    }

    pub(crate) fn respond_after(&self, path: &str, response: Response, delay: Duration) {
        self.script
            .lock()
            .unwrap()
            .insert(path.to_string(), Scripted::Respond { response, delay, body_delay: Duration::ZERO });
    }

    /// Head arrives at once; the body only after `body_delay`.
    pub(crate) fn trickle(&self, path: &str, response: Response, body_delay: Duration) {
        self.script
            .lock()
            .unwrap()
            .insert(path.to_string(), Scripted::Respond { response, delay: Duration::ZERO, body_delay });
    }

    pub(crate) fn fail(&self, path: &str) {
        self.script.lock().unwrap().insert(path.to_string(), Scripted::Fail);
    }

    /// Drop every scripted answer.
    pub(crate) fn go_offline(&self) {
        self.script.lock().unwrap().clear();
    }

    pub(crate) fn calls(&self, path: &str) -> usize {
        self.calls.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> Result<Incoming, Error> {
        let path = request.url[Position::BeforePath..Position::AfterQuery].to_string();
        *self.calls.lock().unwrap().entry(path.clone()).or_default() += 1;

        let answer = match self.script.lock().unwrap().get(&path) {
            Some(Scripted::Respond { response, delay, body_delay }) => {
                Some((response.duplicate(), *delay, *body_delay))
            }
            Some(Scripted::Fail) => None,
            None => return Err(Error::Network(format!("{path}: offline"))),
        };

        match answer {
            Some((response, delay, body_delay)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                if body_delay.is_zero() {
                    return Ok(Incoming::ready(response));
                }
                let mut head = response;
                let body = std::mem::take(&mut head.body);
                Ok(Incoming::streaming(head, async move {
                    tokio::time::sleep(body_delay).await;
                    Ok::<_, Error>(body)
                }))
            }
            None => Err(Error::Network(format!("{path}: connection reset"))),
        }
    }
}

/// Storage that reads from an in-memory database but refuses every write.
pub(crate) struct FailingStorage {
    pub(crate) inner: CacheDb,
}

impl FailingStorage {
    pub(crate) async fn new() -> Arc<Self> {
        Arc::new(Self { inner: CacheDb::open_in_memory().await.unwrap() })
    }
}

#[async_trait]
impl CacheStorage for FailingStorage {
    async fn open_store(&self, name: &str) -> Result<(), Error> {
        self.inner.open_store(name).await
    }

    async fn has_store(&self, name: &str) -> Result<bool, Error> {
        self.inner.has_store(name).await
    }

    async fn store_names(&self) -> Result<Vec<String>, Error> {
        self.inner.store_names().await
    }

    async fn delete_store(&self, name: &str) -> Result<bool, Error> {
        self.inner.delete_store(name).await
    }

    async fn put(&self, _store: &str, _request: &Request, _response: Response) -> Result<(), Error> {
        Err(Error::CorruptEntry("quota exceeded".to_string()))
    }

    async fn match_in(&self, store: &str, request: &Request) -> Result<Option<Response>, Error> {
        self.inner.match_in(store, request).await
    }

    async fn match_any(&self, request: &Request) -> Result<Option<Response>, Error> {
        self.inner.match_any(request).await
    }

    async fn total_size(&self) -> Result<u64, Error> {
        self.inner.total_size().await
    }
}
