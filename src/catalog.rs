//!
//! Catalog
//! -------
//! Resolves human-readable database titles to remote database ids. The title
//! map is owned by the Catalog value, populated exactly once by `initialize`,
//! and read-only afterwards; every `Table` handed out by `from` shares the
//! transport handle but never the map.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::api::{HttpApi, Remote};
use crate::error::{Error, Result};
use crate::table::Table;

pub struct Catalog {
    remote: Arc<Remote>,
    databases: HashMap<String, String>,
}

impl Catalog {
    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self {
            remote: Arc::new(Remote::Http(HttpApi::new(api_key))),
            databases: HashMap::new(),
        }
    }

    /// Credential from `NOTION_API_KEY`. The library does no dotenv loading;
    /// the variable must already be in the process environment.
    pub fn from_env() -> Result<Self> {
        let key = std::env::var("NOTION_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or(Error::MissingApiKey)?;
        Ok(Self::new(key))
    }

    #[cfg(test)]
    pub(crate) fn with_remote(remote: Remote) -> Self {
        Self { remote: Arc::new(remote), databases: HashMap::new() }
    }

    /// Run discovery once and index every visible database by display title
    /// (first text segment). First resource wins on duplicate titles. Must be
    /// awaited before any `from` call.
    pub async fn initialize(&mut self) -> Result<()> {
        let body = self.remote.search_databases().await?;
        let results = body.get("results").and_then(|r| r.as_array()).cloned().unwrap_or_default();
        for db in &results {
            let id = db.get("id").and_then(|v| v.as_str());
            let title = db
                .get("title")
                .and_then(|t| t.as_array())
                .and_then(|a| a.first())
                .and_then(|seg| seg.get("plain_text"))
                .and_then(|t| t.as_str());
            match (id, title) {
                (Some(id), Some(title)) => {
                    if self.databases.contains_key(title) {
                        debug!(
                            target: "notion_db::catalog",
                            "duplicate database title '{}', keeping first id",
                            title
                        );
                    } else {
                        self.databases.insert(title.to_string(), id.to_string());
                    }
                }
                _ => {
                    debug!(target: "notion_db::catalog", "skipping database without readable title: {:?}", id);
                }
            }
        }
        debug!(target: "notion_db::catalog", "databases initialized: {} entries", self.databases.len());
        Ok(())
    }

    /// Pure lookup; a missing name always fails with the not-found error,
    /// whether discovery never ran or the title is genuinely absent.
    pub fn from(&self, database_name: &str) -> Result<Table> {
        let id = self
            .databases
            .get(database_name)
            .ok_or_else(|| Error::not_found(database_name))?;
        Ok(Table::new(self.remote.clone(), id.clone()))
    }

    /// Titles currently registered, in no particular order.
    pub fn database_names(&self) -> Vec<&str> {
        self.databases.keys().map(|s| s.as_str()).collect()
    }
}
