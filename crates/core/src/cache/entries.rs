//! Entry operations within a single named store.
//!
//! Only GET requests are stored. `put` overwrites, so re-populating a store
//! never duplicates entries.

use super::connection::CacheDb;
use super::hash::compute_request_key;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A response as held in a cache store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub status: u16,
    /// Header name/value pairs in the order they were received.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// RFC 3339 timestamp of the write; `None` until the response is stored.
    pub stored_at: Option<String>,
}

impl StoredResponse {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self { status, headers, body, stored_at: None }
    }

    /// First value of a header, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Handle to one named store.
#[derive(Clone, Debug)]
pub struct CacheStore {
    db: CacheDb,
    name: String,
}

fn is_get(method: &str) -> bool {
    method.eq_ignore_ascii_case("GET")
}

fn insert_entry(
    conn: &rusqlite::Connection, store: &str, url: &str, response: &StoredResponse, now: &str,
) -> Result<(), Error> {
    let headers_json = serde_json::to_string(&response.headers)?;
    conn.execute(
        "INSERT INTO cache_entries (store, key_hash, method, url, status, headers_json, body, stored_at)
         VALUES (?1, ?2, 'GET', ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(store, key_hash) DO UPDATE SET
            status = excluded.status,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![store, compute_request_key("GET", url), url, response.status, headers_json, response.body, now],
    )?;
    Ok(())
}

impl CacheStore {
    pub(crate) fn new(db: CacheDb, name: String) -> Self {
        Self { db, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up the stored response for a request.
    ///
    /// Non-GET requests never match and do not touch the database.
    pub async fn match_request(&self, method: &str, url: &str) -> Result<Option<StoredResponse>, Error> {
        if !is_get(method) {
            return Ok(None);
        }

        let store = self.name.clone();
        let key = compute_request_key(method, url);
        self.db
            .conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                let result = conn.query_row(
                    "SELECT status, headers_json, body, stored_at FROM cache_entries
                     WHERE store = ?1 AND key_hash = ?2",
                    params![store, key],
                    |row| {
                        Ok((
                            row.get::<_, u16>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, Vec<u8>>(2)?,
                            row.get::<_, String>(3)?,
                        ))
                    },
                );

                match result {
                    Ok((status, headers_json, body, stored_at)) => Ok(Some(StoredResponse {
                        status,
                        headers: serde_json::from_str(&headers_json)?,
                        body,
                        stored_at: Some(stored_at),
                    })),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Store a response for a request, replacing any previous entry.
    ///
    /// Recreates the store if it was deleted in the meantime.
    pub async fn put(&self, method: &str, url: &str, response: &StoredResponse) -> Result<(), Error> {
        if !is_get(method) {
            return Err(Error::UnsupportedMethod(method.to_string()));
        }

        let store = self.name.clone();
        let url = url.to_string();
        let response = response.clone();
        let now = chrono::Utc::now().to_rfc3339();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO cache_stores (name, created_at) VALUES (?1, ?2)",
                    params![store, now],
                )?;
                insert_entry(&tx, &store, &url, &response, &now)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Store several GET responses atomically: either all land or none do.
    pub async fn put_all(&self, entries: Vec<(String, StoredResponse)>) -> Result<usize, Error> {
        let store = self.name.clone();
        let now = chrono::Utc::now().to_rfc3339();
        self.db
            .conn
            .call(move |conn| -> Result<usize, Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO cache_stores (name, created_at) VALUES (?1, ?2)",
                    params![store, now],
                )?;
                for (url, response) in &entries {
                    insert_entry(&tx, &store, url, response, &now)?;
                }
                tx.commit()?;
                Ok(entries.len())
            })
            .await
            .map_err(Error::from)
    }

    /// Remove the entry for a request. Returns false if nothing was stored.
    pub async fn delete(&self, method: &str, url: &str) -> Result<bool, Error> {
        if !is_get(method) {
            return Ok(false);
        }

        let store = self.name.clone();
        let key = compute_request_key(method, url);
        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted =
                    conn.execute("DELETE FROM cache_entries WHERE store = ?1 AND key_hash = ?2", params![store, key])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// URLs of every stored request, in insertion order.
    pub async fn keys(&self) -> Result<Vec<String>, Error> {
        let store = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM cache_entries WHERE store = ?1 ORDER BY rowid ASC")?;
                let urls = stmt
                    .query_map(params![store], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in this store.
    pub async fn len(&self) -> Result<usize, Error> {
        let store = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<usize, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM cache_entries WHERE store = ?1", params![store], |row| {
                        row.get(0)
                    })?;
                Ok(count as usize)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len().await? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn html(body: &str) -> StoredResponse {
        StoredResponse::new(200, vec![("content-type".into(), "text/html".into())], body.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("blindguide-v4").await.unwrap();

        store.put("GET", "https://example.com/", &html("<h1>hi</h1>")).await.unwrap();

        let hit = store.match_request("GET", "https://example.com/").await.unwrap().unwrap();
        assert_eq!(hit.status, 200);
        assert_eq!(hit.body, b"<h1>hi</h1>");
        assert_eq!(hit.header("Content-Type"), Some("text/html"));
        assert!(hit.stored_at.is_some());
    }

    #[tokio::test]
    async fn test_match_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("blindguide-v4").await.unwrap();
        assert!(store.match_request("GET", "https://example.com/").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("blindguide-v4").await.unwrap();

        store.put("GET", "https://example.com/", &html("one")).await.unwrap();
        store.put("GET", "https://example.com/", &html("two")).await.unwrap();

        assert_eq!(store.len().await.unwrap(), 1);
        let hit = store.match_request("GET", "https://example.com/").await.unwrap().unwrap();
        assert_eq!(hit.body, b"two");
    }

    #[tokio::test]
    async fn test_non_get_rejected() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("blindguide-v4").await.unwrap();

        let result = store.put("POST", "https://example.com/", &html("x")).await;
        assert!(matches!(result, Err(Error::UnsupportedMethod(m)) if m == "POST"));

        store.put("GET", "https://example.com/", &html("x")).await.unwrap();
        assert!(store.match_request("POST", "https://example.com/").await.unwrap().is_none());
        assert!(!store.delete("POST", "https://example.com/").await.unwrap());
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stores_are_isolated() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let v3 = db.open_store("blindguide-v3").await.unwrap();
        let v4 = db.open_store("blindguide-v4").await.unwrap();

        v3.put("GET", "https://example.com/", &html("old")).await.unwrap();

        assert!(v4.match_request("GET", "https://example.com/").await.unwrap().is_none());
        assert!(v4.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_put_all_and_keys_order() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("blindguide-v4").await.unwrap();

        let stored = store
            .put_all(vec![
                ("https://example.com/".into(), html("root")),
                ("https://example.com/index.html".into(), html("index")),
            ])
            .await
            .unwrap();

        assert_eq!(stored, 2);
        assert_eq!(
            store.keys().await.unwrap(),
            vec!["https://example.com/".to_string(), "https://example.com/index.html".to_string()]
        );
    }

    #[tokio::test]
    async fn test_put_recreates_deleted_store() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("blindguide-v4").await.unwrap();
        db.delete_store("blindguide-v4").await.unwrap();

        store.put("GET", "https://example.com/", &html("x")).await.unwrap();

        assert!(db.has_store("blindguide-v4").await.unwrap());
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_entry() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("blindguide-v4").await.unwrap();
        store.put("GET", "https://example.com/", &html("x")).await.unwrap();

        assert!(store.delete("GET", "https://example.com/").await.unwrap());
        assert!(!store.delete("GET", "https://example.com/").await.unwrap());
        assert!(store.is_empty().await.unwrap());
    }
}
