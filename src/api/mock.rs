//! In-memory backend for the test suite. Serves canned discovery results,
//! a canned schema, and a paginated page set; records every query body so
//! tests can assert on emitted filters, sorts and call counts. `create_page`
//! echoes the remote's behavior closely enough for round-trip tests: stored
//! segments gain `plain_text` and each property gains its `type` tag.

use parking_lot::Mutex;
use serde_json::json;

use crate::error::{Error, Result};

#[derive(Debug)]
pub struct MockApi {
    search_results: Vec<serde_json::Value>,
    schema: serde_json::Value,
    pages: Mutex<Vec<serde_json::Value>>,
    pub query_calls: Mutex<Vec<serde_json::Value>>,
    fail_queries: bool,
    fail_create: bool,
}

impl MockApi {
    pub fn new() -> Self {
        Self {
            search_results: Vec::new(),
            schema: json!({}),
            pages: Mutex::new(Vec::new()),
            query_calls: Mutex::new(Vec::new()),
            fail_queries: false,
            fail_create: false,
        }
    }

    pub fn with_database(mut self, title: &str, id: &str) -> Self {
        self.search_results.push(json!({
            "object": "database",
            "id": id,
            "title": [{"type": "text", "plain_text": title, "text": {"content": title}}]
        }));
        self
    }

    /// A discovery result with no readable title segment.
    pub fn with_untitled_database(mut self, id: &str) -> Self {
        self.search_results.push(json!({
            "object": "database",
            "id": id,
            "title": []
        }));
        self
    }

    /// Schema as (property name, type tag) pairs.
    pub fn with_schema(mut self, props: &[(&str, &str)]) -> Self {
        let mut properties = serde_json::Map::new();
        for (name, tag) in props {
            properties.insert(name.to_string(), json!({"type": tag, (*tag): {}}));
        }
        self.schema = json!({ "properties": properties });
        self
    }

    pub fn with_pages(self, pages: Vec<serde_json::Value>) -> Self {
        *self.pages.lock() = pages;
        self
    }

    pub fn failing_queries(mut self) -> Self {
        self.fail_queries = true;
        self
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn page_count(&self) -> usize {
        self.pages.lock().len()
    }

    pub fn last_page(&self) -> Option<serde_json::Value> {
        self.pages.lock().last().cloned()
    }

    pub fn query_call_count(&self) -> usize {
        self.query_calls.lock().len()
    }

    pub fn search_databases(&self) -> Result<serde_json::Value> {
        Ok(json!({ "results": self.search_results }))
    }

    pub fn retrieve_database(&self, _database_id: &str) -> Result<serde_json::Value> {
        Ok(self.schema.clone())
    }

    pub fn query_database(&self, _database_id: &str, body: serde_json::Value) -> Result<serde_json::Value> {
        if self.fail_queries {
            return Err(Error::Api {
                status: 500,
                code: "internal_server_error".into(),
                message: "mock query failure".into(),
            });
        }
        let start = body
            .get("start_cursor")
            .and_then(|c| c.as_str())
            .and_then(|c| c.parse::<usize>().ok())
            .unwrap_or(0);
        let page_size = body.get("page_size").and_then(|p| p.as_u64()).unwrap_or(100) as usize;
        self.query_calls.lock().push(body);

        let pages = self.pages.lock();
        let start = start.min(pages.len());
        let end = (start + page_size).min(pages.len());
        let slice: Vec<serde_json::Value> = pages[start..end].to_vec();
        let has_more = end < pages.len();
        Ok(json!({
            "results": slice,
            "has_more": has_more,
            "next_cursor": if has_more { json!(end.to_string()) } else { serde_json::Value::Null },
        }))
    }

    pub fn create_page(&self, body: serde_json::Value) -> Result<serde_json::Value> {
        if self.fail_create {
            return Err(Error::Api {
                status: 400,
                code: "validation_error".into(),
                message: "mock create failure".into(),
            });
        }
        let id = uuid::Uuid::new_v4().to_string();
        let mut properties = serde_json::Map::new();
        if let Some(props) = body.get("properties").and_then(|p| p.as_object()) {
            for (name, wire) in props.iter() {
                properties.insert(name.clone(), normalize_stored_property(wire));
            }
        }
        let page = json!({
            "object": "page",
            "id": id,
            "created_time": "2025-01-01T00:00:00.000Z",
            "last_edited_time": "2025-01-01T00:00:00.000Z",
            "properties": properties,
        });
        self.pages.lock().push(page.clone());
        Ok(page)
    }
}

/// What the remote does on write: tag the property with its type and give
/// text segments a `plain_text` projection of their content.
fn normalize_stored_property(wire: &serde_json::Value) -> serde_json::Value {
    let Some(obj) = wire.as_object() else { return wire.clone() };
    let Some((tag, payload)) = obj.iter().next() else { return wire.clone() };
    let payload = if tag == "title" || tag == "rich_text" {
        let segments: Vec<serde_json::Value> = payload
            .as_array()
            .map(|segs| {
                segs.iter()
                    .map(|seg| {
                        let content = seg
                            .get("text")
                            .and_then(|t| t.get("content"))
                            .and_then(|c| c.as_str())
                            .unwrap_or("");
                        json!({"type": "text", "text": {"content": content}, "plain_text": content})
                    })
                    .collect()
            })
            .unwrap_or_default();
        json!(segments)
    } else {
        payload.clone()
    };
    json!({ "type": tag, (tag.as_str()): payload })
}
