//!
//! Table accessor and query builder
//! --------------------------------
//! A `Table` is bound to one resolved database id and accumulates filter,
//! sort, limit and projection state through chained calls. Execution flushes
//! the accumulated state into a sequential pagination loop against the remote
//! query endpoint, then formats every raw record into a flat `Page`.
//!
//! The accumulated state is taken out of the accessor before the first remote
//! call, so it resets whether execution succeeds or fails and the same
//! accessor can be reused for a fresh query.
//!
//! Two propagation policies coexist: `select` returns its `Result` for the
//! caller to inspect, while `insert` and `initialize` propagate with `?`.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, error, warn};

use crate::api::Remote;
use crate::error::{Error, Result};
use crate::property::{self, flatten_page, Page, PropertyKind, PropertyValue};

/// Maximum records the remote returns per query call.
const MAX_PAGE_SIZE: usize = 100;

/// Comparison operator of a filter clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
}

impl FilterOp {
    /// Condition key used by the remote filter grammar.
    fn wire_key(self) -> &'static str {
        match self {
            FilterOp::Eq => "equals",
            FilterOp::Neq => "does_not_equal",
            FilterOp::Gt => "greater_than",
            FilterOp::Gte => "greater_than_or_equal_to",
            FilterOp::Lt => "less_than",
            FilterOp::Lte => "less_than_or_equal_to",
            FilterOp::Contains => "contains",
        }
    }
}

#[derive(Debug, Clone)]
struct FilterClause {
    op: FilterOp,
    operand: serde_json::Value,
}

/// Accumulated builder state, consumed whole by one execution.
#[derive(Debug, Default)]
struct QueryState {
    // Keyed by property name: one clause per property, last write wins.
    filters: BTreeMap<String, FilterClause>,
    sorts: Vec<(String, bool)>,
    limit: Option<usize>,
    projection: Option<Vec<String>>,
}

impl QueryState {
    /// AND of one condition per clause; absent when no clauses are set.
    fn build_filter(&self) -> Option<serde_json::Value> {
        if self.filters.is_empty() {
            return None;
        }
        let conditions: Vec<serde_json::Value> = self
            .filters
            .iter()
            .map(|(property, clause)| {
                let mut cond = serde_json::Map::new();
                cond.insert("property".to_string(), json!(property));
                cond.insert(clause.op.wire_key().to_string(), clause.operand.clone());
                serde_json::Value::Object(cond)
            })
            .collect();
        Some(json!({ "and": conditions }))
    }

    fn build_sorts(&self) -> Vec<serde_json::Value> {
        self.sorts
            .iter()
            .map(|(property, ascending)| {
                json!({
                    "property": property,
                    "direction": if *ascending { "ascending" } else { "descending" },
                })
            })
            .collect()
    }
}

#[derive(Debug)]
pub struct Table {
    remote: Arc<Remote>,
    database_id: String,
    schema: HashMap<String, PropertyKind>,
    state: QueryState,
}

impl Table {
    pub(crate) fn new(remote: Arc<Remote>, database_id: String) -> Self {
        Self {
            remote,
            database_id,
            schema: HashMap::new(),
            state: QueryState::default(),
        }
    }

    pub fn database_id(&self) -> &str { &self.database_id }

    /// Fetch and cache the database schema (property name -> declared type).
    /// Idempotent; `insert` calls this lazily when the cache is empty.
    pub async fn initialize(&mut self) -> Result<()> {
        let body = self.remote.retrieve_database(&self.database_id).await?;
        if let Some(props) = body.get("properties").and_then(|p| p.as_object()) {
            for (name, prop) in props.iter() {
                let tag = prop.get("type").and_then(|t| t.as_str()).unwrap_or("");
                self.schema.insert(name.clone(), PropertyKind::from_tag(tag));
            }
        }
        debug!(
            target: "notion_db::table",
            "schema loaded for {}: {} properties",
            self.database_id,
            self.schema.len()
        );
        Ok(())
    }

    fn clause<V: Into<serde_json::Value>>(&mut self, column: &str, op: FilterOp, value: V) -> &mut Self {
        self.state.filters.insert(column.to_string(), FilterClause { op, operand: value.into() });
        self
    }

    pub fn eq<V: Into<serde_json::Value>>(&mut self, column: &str, value: V) -> &mut Self {
        self.clause(column, FilterOp::Eq, value)
    }

    pub fn neq<V: Into<serde_json::Value>>(&mut self, column: &str, value: V) -> &mut Self {
        self.clause(column, FilterOp::Neq, value)
    }

    pub fn gt<V: Into<serde_json::Value>>(&mut self, column: &str, value: V) -> &mut Self {
        self.clause(column, FilterOp::Gt, value)
    }

    pub fn gte<V: Into<serde_json::Value>>(&mut self, column: &str, value: V) -> &mut Self {
        self.clause(column, FilterOp::Gte, value)
    }

    pub fn lt<V: Into<serde_json::Value>>(&mut self, column: &str, value: V) -> &mut Self {
        self.clause(column, FilterOp::Lt, value)
    }

    pub fn lte<V: Into<serde_json::Value>>(&mut self, column: &str, value: V) -> &mut Self {
        self.clause(column, FilterOp::Lte, value)
    }

    pub fn contains<V: Into<serde_json::Value>>(&mut self, column: &str, value: V) -> &mut Self {
        self.clause(column, FilterOp::Contains, value)
    }

    /// Append a sort clause; order of addition is the remote's tie-break
    /// order, first clause is the primary key.
    pub fn order(&mut self, column: &str, ascending: bool) -> &mut Self {
        self.state.sorts.push((column.to_string(), ascending));
        self
    }

    /// Hard cap on total records returned across all pages.
    pub fn limit(&mut self, value: usize) -> &mut Self {
        self.state.limit = Some(value);
        self
    }

    /// Record the projection hint and execute the accumulated query.
    /// The hint marks columns of interest; it does not restrict the fetch.
    pub async fn select(&mut self, columns: &[&str]) -> Result<Vec<Page>> {
        if !columns.is_empty() {
            self.state.projection = Some(columns.iter().map(|c| c.to_string()).collect());
        }
        self.execute().await
    }

    async fn execute(&mut self) -> Result<Vec<Page>> {
        // Taking the state up front resets the builder on every outcome path.
        let state = std::mem::take(&mut self.state);
        let filter = state.build_filter();
        let sorts = match state.build_sorts() {
            s if s.is_empty() => None,
            s => Some(serde_json::Value::Array(s)),
        };
        let page_size = state.limit.map(|l| l.min(MAX_PAGE_SIZE)).unwrap_or(MAX_PAGE_SIZE);

        let mut results: Vec<serde_json::Value> = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut body = json!({ "page_size": page_size });
            if let Some(f) = &filter {
                body["filter"] = f.clone();
            }
            if let Some(s) = &sorts {
                body["sorts"] = s.clone();
            }
            if let Some(c) = &cursor {
                body["start_cursor"] = json!(c);
            }
            let resp = self.remote.query_database(&self.database_id, body).await?;
            if let Some(records) = resp.get("results").and_then(|r| r.as_array()) {
                results.extend(records.iter().cloned());
            }
            if let Some(limit) = state.limit {
                if results.len() >= limit {
                    results.truncate(limit);
                    break;
                }
            }
            let has_more = resp.get("has_more").and_then(|h| h.as_bool()).unwrap_or(false);
            cursor = resp.get("next_cursor").and_then(|c| c.as_str()).map(|c| c.to_string());
            if !has_more || cursor.is_none() {
                break;
            }
        }
        debug!(target: "notion_db::table", "query on {} returned {} records", self.database_id, results.len());
        Ok(results.iter().map(flatten_page).collect())
    }

    /// Convert the given properties through the schema and create one record.
    /// Returns the new record's id. Failures always surface to the caller.
    pub async fn insert(&mut self, properties: &[(&str, PropertyValue)]) -> Result<String> {
        if self.schema.is_empty() {
            self.initialize().await?;
        }
        let converted = self.convert_properties(properties);
        let body = json!({
            "parent": {"type": "database_id", "database_id": self.database_id},
            "properties": converted,
        });
        match self.remote.create_page(body).await {
            Ok(resp) => resp
                .get("id")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
                .ok_or_else(|| Error::malformed("created page has no id")),
            Err(err) => {
                match &err {
                    Error::Api { status, code, message } => error!(
                        target: "notion_db::table",
                        "insert failed: HTTP {} {}: {}",
                        status, code, message
                    ),
                    other => error!(target: "notion_db::table", "insert failed: {}", other),
                }
                Err(err)
            }
        }
    }

    /// Case-insensitive match of application keys against schema property
    /// names; unmatched keys are dropped, matched keys dispatch on the
    /// declared kind.
    fn convert_properties(&self, properties: &[(&str, PropertyValue)]) -> serde_json::Map<String, serde_json::Value> {
        let mut out = serde_json::Map::new();
        for (key, value) in properties {
            let matched = self.schema.iter().find(|(name, _)| name.eq_ignore_ascii_case(key));
            let Some((schema_key, kind)) = matched else {
                warn!(target: "notion_db::table", "property '{}' not found in database schema, skipping", key);
                continue;
            };
            out.insert(schema_key.clone(), property::to_wire(schema_key, kind, value));
        }
        out
    }
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod table_tests;
