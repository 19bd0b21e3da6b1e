//! Connection to `Dragonfly` and JSON document commands.
//!
//! Documents are plain `SET`/`GET` strings holding JSON. There is no
//! expiry: a document lives until it is overwritten or removed.

use fred::prelude::*;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::DbError;

/// Shared client for one `Dragonfly` (Redis-compatible) server.
///
/// Cloning is cheap; clones share the underlying connection.
#[derive(Clone)]
pub struct DragonflyPool {
    client: Client,
}

impl DragonflyPool {
    /// Open a connection to `url` (`redis://host:port[/db]`).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidUrl`] for a malformed URL and
    /// [`DbError::Command`] if the server cannot be reached.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let config = Config::from_url(url).map_err(|e| DbError::InvalidUrl {
            url: url.to_owned(),
            reason: e.to_string(),
        })?;
        let client = Builder::from_config(config).build()?;
        client.init().await?;

        info!(url, "Connected to Dragonfly");
        Ok(Self { client })
    }

    /// Write `value` as the JSON document at `key`.
    pub async fn put_json<T>(&self, key: &str, value: &T) -> Result<(), DbError>
    where
        T: Serialize + Sync,
    {
        let json = serde_json::to_string(value).map_err(|source| DbError::Encode {
            key: key.to_owned(),
            source,
        })?;
        let _: () = self
            .client
            .set(key, json.as_str(), None, None, false)
            .await?;
        debug!(key, bytes = json.len(), "Document written");
        Ok(())
    }

    /// Read the JSON document at `key`, or `None` if nothing is stored.
    pub async fn fetch_json<T>(&self, key: &str) -> Result<Option<T>, DbError>
    where
        T: DeserializeOwned,
    {
        let raw: Option<String> = self.client.get(key).await?;
        raw.map(|json| {
            serde_json::from_str(&json).map_err(|source| DbError::Decode {
                key: key.to_owned(),
                source,
            })
        })
        .transpose()
    }

    /// Remove the document at `key`. Returns whether one existed.
    pub async fn remove(&self, key: &str) -> Result<bool, DbError> {
        let removed: u32 = self.client.del(key).await?;
        Ok(removed > 0)
    }
}
