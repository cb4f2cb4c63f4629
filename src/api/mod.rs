//!
//! Remote transport
//! ----------------
//! Thin typed wrapper over the hosted page/database REST API. Exactly four
//! capabilities are consumed: discover databases, retrieve a database schema,
//! query a database with filter/sort/pagination, and create a page. All bodies
//! travel as `serde_json::Value`; decoding into domain shapes happens in the
//! catalog/table/property layers.
//!
//! `Remote` dispatches between the real HTTP backend and the in-memory mock
//! used by the test suite.

use serde_json::json;
use tracing::debug;

use crate::error::{Error, Result};

#[cfg(test)]
pub mod mock;

/// API version pinned on every request.
pub const NOTION_VERSION: &str = "2022-06-28";

const DEFAULT_BASE: &str = "https://api.notion.com";

/// HTTP backend: base URL, connection pool, bearer credential.
#[derive(Clone, Debug)]
pub struct HttpApi {
    base: String,
    client: reqwest::Client,
    token: String,
}

impl HttpApi {
    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self {
            base: DEFAULT_BASE.to_string(),
            client: reqwest::Client::new(),
            token: api_key.into(),
        }
    }

    /// Discovery call: all database-kind resources visible to the credential.
    pub async fn search_databases(&self) -> Result<serde_json::Value> {
        debug!(target: "notion_db::api", "search: kind=database");
        let resp = self
            .client
            .post(format!("{}/v1/search", self.base))
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
            .json(&json!({
                "filter": {"property": "object", "value": "database"}
            }))
            .send()
            .await?;
        read_json(resp).await
    }

    /// Schema fetch: property name -> declared type, under `properties`.
    pub async fn retrieve_database(&self, database_id: &str) -> Result<serde_json::Value> {
        debug!(target: "notion_db::api", "retrieve: database_id={}", database_id);
        let resp = self
            .client
            .get(format!("{}/v1/databases/{}", self.base, database_id))
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
            .send()
            .await?;
        read_json(resp).await
    }

    /// One page of a filtered/sorted query. The body carries
    /// `filter?`, `sorts?`, `start_cursor?` and `page_size`.
    pub async fn query_database(&self, database_id: &str, body: serde_json::Value) -> Result<serde_json::Value> {
        debug!(target: "notion_db::api", "query: database_id={}", database_id);
        let resp = self
            .client
            .post(format!("{}/v1/databases/{}/query", self.base, database_id))
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
            .json(&body)
            .send()
            .await?;
        read_json(resp).await
    }

    /// Create one child record; the body carries `parent` and `properties`.
    pub async fn create_page(&self, body: serde_json::Value) -> Result<serde_json::Value> {
        debug!(target: "notion_db::api", "create page");
        let resp = self
            .client
            .post(format!("{}/v1/pages", self.base))
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
            .json(&body)
            .send()
            .await?;
        read_json(resp).await
    }
}

/// Parse the response body, mapping non-2xx statuses to the API's structured
/// `{code, message}` error shape.
async fn read_json(resp: reqwest::Response) -> Result<serde_json::Value> {
    let status = resp.status();
    let body: serde_json::Value = resp.json().await.unwrap_or(json!({}));
    if !status.is_success() {
        let code = body.get("code").and_then(|c| c.as_str()).unwrap_or("unknown").to_string();
        let message = body.get("message").and_then(|m| m.as_str()).unwrap_or_default().to_string();
        return Err(Error::Api { status: status.as_u16(), code, message });
    }
    Ok(body)
}

/// Backend dispatch for the four remote capabilities.
#[derive(Debug)]
pub enum Remote {
    Http(HttpApi),
    #[cfg(test)]
    Mock(mock::MockApi),
}

impl Remote {
    pub async fn search_databases(&self) -> Result<serde_json::Value> {
        match self {
            Remote::Http(h) => h.search_databases().await,
            #[cfg(test)]
            Remote::Mock(m) => m.search_databases(),
        }
    }

    pub async fn retrieve_database(&self, database_id: &str) -> Result<serde_json::Value> {
        match self {
            Remote::Http(h) => h.retrieve_database(database_id).await,
            #[cfg(test)]
            Remote::Mock(m) => m.retrieve_database(database_id),
        }
    }

    pub async fn query_database(&self, database_id: &str, body: serde_json::Value) -> Result<serde_json::Value> {
        match self {
            Remote::Http(h) => h.query_database(database_id, body).await,
            #[cfg(test)]
            Remote::Mock(m) => m.query_database(database_id, body),
        }
    }

    pub async fn create_page(&self, body: serde_json::Value) -> Result<serde_json::Value> {
        match self {
            Remote::Http(h) => h.create_page(body).await,
            #[cfg(test)]
            Remote::Mock(m) => m.create_page(body),
        }
    }
}
