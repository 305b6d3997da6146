//! Store and entry operations on the SQLite backend.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};

use super::connection::CacheDb;
use super::storage::CacheStorage;
use crate::Error;
use crate::http::{Headers, Request, Response};

/// Entry count and byte size of one store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StoreSummary {
    pub name: String,
    pub entries: u64,
    pub bytes: u64,
}

/// Identity and size of a cached entry, without its body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EntryMeta {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub bytes: u64,
    pub stored_at: String,
}

/// Row shape shared by every lookup.
struct RawEntry {
    status: i64,
    status_text: String,
    response_type: String,
    headers_json: String,
    body: Vec<u8>,
}

impl RawEntry {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            status: row.get(0)?,
            status_text: row.get(1)?,
            response_type: row.get(2)?,
            headers_json: row.get(3)?,
            body: row.get(4)?,
        })
    }

    fn into_response(self) -> Result<Response, Error> {
        let status = u16::try_from(self.status).map_err(|_| Error::CorruptEntry(format!("status {}", self.status)))?;
        let headers: Headers = serde_json::from_str(&self.headers_json)?;
        Ok(Response {
            status,
            status_text: self.status_text,
            headers,
            body: Bytes::from(self.body),
            response_type: self.response_type.parse()?,
        })
    }
}

const ENTRY_COLUMNS: &str = "e.status, e.status_text, e.response_type, e.headers_json, e.body";

#[async_trait]
impl CacheStorage for CacheDb {
    async fn open_store(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO stores (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn has_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool =
                    conn.query_row("SELECT EXISTS(SELECT 1 FROM stores WHERE name = ?1)", params![name], |row| {
                        row.get(0)
                    })?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    async fn store_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM stores ORDER BY rowid")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM stores WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn put(&self, store: &str, request: &Request, response: Response) -> Result<(), Error> {
        if response.is_partial() {
            return Err(Error::InvalidInput(format!("refusing to store partial response for {}", request.url)));
        }

        let store = store.to_string();
        let key = request.key();
        let method = request.method.as_str();
        let url = request.url.to_string();
        let headers_json = serde_json::to_string(&response.headers)?;
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO stores (name, created_at) VALUES (?1, ?2)",
                    params![store, now],
                )?;
                tx.execute(
                    "INSERT INTO entries (
                        store, key, method, url, status, status_text,
                        response_type, headers_json, body, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                    ON CONFLICT(store, key) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status = excluded.status,
                        status_text = excluded.status_text,
                        response_type = excluded.response_type,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![
                        store,
                        key,
                        method,
                        url,
                        response.status,
                        response.status_text,
                        response.response_type.as_str(),
                        headers_json,
                        &response.body[..],
                        now,
                    ],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn match_in(&self, store: &str, request: &Request) -> Result<Option<Response>, Error> {
        let store = store.to_string();
        let key = request.key();
        let raw = self
            .conn
            .call(move |conn| -> Result<Option<RawEntry>, Error> {
                let sql = format!("SELECT {ENTRY_COLUMNS} FROM entries e WHERE e.store = ?1 AND e.key = ?2");
                let raw = conn
                    .query_row(&sql, params![store, key], RawEntry::from_row)
                    .optional()?;
                Ok(raw)
            })
            .await
            .map_err(Error::from)?;

        raw.map(RawEntry::into_response).transpose()
    }

    async fn match_any(&self, request: &Request) -> Result<Option<Response>, Error> {
        let key = request.key();
        let raw = self
            .conn
            .call(move |conn| -> Result<Option<RawEntry>, Error> {
                let sql = format!(
                    "SELECT {ENTRY_COLUMNS} FROM entries e
                     JOIN stores s ON s.name = e.store
                     WHERE e.key = ?1
                     ORDER BY s.rowid LIMIT 1"
                );
                let raw = conn.query_row(&sql, params![key], RawEntry::from_row).optional()?;
                Ok(raw)
            })
            .await
            .map_err(Error::from)?;

        raw.map(RawEntry::into_response).transpose()
    }

    async fn total_size(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let total: i64 = conn.query_row("SELECT COALESCE(SUM(LENGTH(body)), 0) FROM entries", [], |row| {
                    row.get(0)
                })?;
                Ok(total.max(0) as u64)
            })
            .await
            .map_err(Error::from)
    }
}

impl CacheDb {
    /// Entry count and byte size of every store, in creation order.
    pub async fn store_summaries(&self) -> Result<Vec<StoreSummary>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<StoreSummary>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT s.name, COUNT(e.key), COALESCE(SUM(LENGTH(e.body)), 0)
                     FROM stores s LEFT JOIN entries e ON e.store = s.name
                     GROUP BY s.name
                     ORDER BY s.rowid",
                )?;
                let summaries = stmt
                    .query_map([], |row| {
                        Ok(StoreSummary {
                            name: row.get(0)?,
                            entries: row.get::<_, i64>(1)?.max(0) as u64,
                            bytes: row.get::<_, i64>(2)?.max(0) as u64,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(summaries)
            })
            .await
            .map_err(Error::from)
    }

    /// Entries of one store, oldest write first.
    pub async fn keys(&self, store: &str) -> Result<Vec<EntryMeta>, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<EntryMeta>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, status, LENGTH(body), stored_at
                     FROM entries WHERE store = ?1
                     ORDER BY stored_at, url",
                )?;
                let entries = stmt
                    .query_map(params![store], |row| {
                        Ok(EntryMeta {
                            method: row.get(0)?,
                            url: row.get(1)?,
                            status: row.get(2)?,
                            bytes: row.get::<_, i64>(3)?.max(0) as u64,
                            stored_at: row.get(4)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(entries)
            })
            .await
            .map_err(Error::from)
    }
}
