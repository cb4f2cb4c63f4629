//!
//! Property-value marshalling
//! --------------------------
//! Remote records carry typed property payloads: every property value embeds a
//! declared type tag (`title`, `rich_text`, `number`, ...) and nests its actual
//! content under a key of the same name. This module owns both directions of
//! the translation:
//!
//! - read side: flatten a raw page object into a `Page` whose fields hold plain
//!   scalars/lists, dispatching on each value's own embedded tag;
//! - write side: convert an application-facing `PropertyValue` into the wire
//!   shape demanded by a schema-declared `PropertyKind`.
//!
//! Both directions degrade rather than fail: unknown kinds pass through (read)
//! or fall back to rich text (write), and unparseable dates fall back to the
//! current time. Every degraded path logs a warning.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Map;
use tracing::warn;

/// Declared property type as reported by the database schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyKind {
    Title,
    RichText,
    Number,
    Select,
    MultiSelect,
    Date,
    Checkbox,
    /// Any tag this client has no dedicated handling for (people, relation,
    /// formula, ...). The tag string is kept so read-side passthrough and
    /// write-side fallback can still name it.
    Other(String),
}

impl PropertyKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "title" => PropertyKind::Title,
            "rich_text" => PropertyKind::RichText,
            "number" => PropertyKind::Number,
            "select" => PropertyKind::Select,
            "multi_select" => PropertyKind::MultiSelect,
            "date" => PropertyKind::Date,
            "checkbox" => PropertyKind::Checkbox,
            other => PropertyKind::Other(other.to_string()),
        }
    }

    pub fn as_tag(&self) -> &str {
        match self {
            PropertyKind::Title => "title",
            PropertyKind::RichText => "rich_text",
            PropertyKind::Number => "number",
            PropertyKind::Select => "select",
            PropertyKind::MultiSelect => "multi_select",
            PropertyKind::Date => "date",
            PropertyKind::Checkbox => "checkbox",
            PropertyKind::Other(tag) => tag.as_str(),
        }
    }
}

/// Application-facing value for the write path.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Date(DateTime<Utc>),
    List(Vec<String>),
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self { PropertyValue::Text(v.to_string()) }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self { PropertyValue::Text(v) }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self { PropertyValue::Number(v) }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self { PropertyValue::Number(v as f64) }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self { PropertyValue::Number(v as f64) }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self { PropertyValue::Bool(v) }
}

impl From<DateTime<Utc>> for PropertyValue {
    fn from(v: DateTime<Utc>) -> Self { PropertyValue::Date(v) }
}

impl From<Vec<String>> for PropertyValue {
    fn from(v: Vec<String>) -> Self { PropertyValue::List(v) }
}

impl From<Vec<&str>> for PropertyValue {
    fn from(v: Vec<&str>) -> Self { PropertyValue::List(v.into_iter().map(|s| s.to_string()).collect()) }
}

/// A formatted record from the read path: envelope metadata plus a flat map
/// from property name to extracted value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    pub created_time: String,
    pub last_edited_time: String,
    #[serde(flatten)]
    pub fields: Map<String, serde_json::Value>,
}

impl Page {
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> { self.fields.get(name) }
}

/// Flatten a raw page object into a `Page`, extracting each property by its
/// own embedded type tag and copying envelope metadata verbatim.
pub fn flatten_page(raw: &serde_json::Value) -> Page {
    let mut fields = Map::new();
    if let Some(props) = raw.get("properties").and_then(|p| p.as_object()) {
        for (name, prop) in props.iter() {
            let tag = prop.get("type").and_then(|t| t.as_str()).unwrap_or("");
            fields.insert(name.clone(), extract_value(&PropertyKind::from_tag(tag), prop));
        }
    }
    Page {
        id: text_at(raw, "id"),
        created_time: text_at(raw, "created_time"),
        last_edited_time: text_at(raw, "last_edited_time"),
        fields,
    }
}

fn text_at(raw: &serde_json::Value, key: &str) -> String {
    raw.get(key).and_then(|v| v.as_str()).unwrap_or_default().to_string()
}

fn extract_value(kind: &PropertyKind, prop: &serde_json::Value) -> serde_json::Value {
    match kind {
        PropertyKind::Title | PropertyKind::RichText => {
            serde_json::Value::String(first_plain_text(prop.get(kind.as_tag())))
        }
        // May legitimately be null for an empty cell.
        PropertyKind::Number => prop.get("number").cloned().unwrap_or(serde_json::Value::Null),
        PropertyKind::Select => {
            let name = prop
                .get("select")
                .and_then(|s| s.get("name"))
                .and_then(|n| n.as_str())
                .unwrap_or("");
            serde_json::Value::String(name.to_string())
        }
        PropertyKind::MultiSelect => {
            let names: Vec<serde_json::Value> = prop
                .get("multi_select")
                .and_then(|m| m.as_array())
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|item| item.get("name").and_then(|n| n.as_str()))
                        .map(|n| serde_json::Value::String(n.to_string()))
                        .collect()
                })
                .unwrap_or_default();
            serde_json::Value::Array(names)
        }
        PropertyKind::Date => {
            let start = prop
                .get("date")
                .and_then(|d| d.get("start"))
                .and_then(|s| s.as_str())
                .unwrap_or("");
            serde_json::Value::String(start.to_string())
        }
        PropertyKind::Checkbox => prop.get("checkbox").cloned().unwrap_or(serde_json::Value::Null),
        // Unknown kind: pass the nested payload through unmodified.
        PropertyKind::Other(tag) => prop.get(tag.as_str()).cloned().unwrap_or(serde_json::Value::Null),
    }
}

fn first_plain_text(segments: Option<&serde_json::Value>) -> String {
    segments
        .and_then(|s| s.as_array())
        .and_then(|a| a.first())
        .and_then(|seg| seg.get("plain_text"))
        .and_then(|t| t.as_str())
        .unwrap_or("")
        .to_string()
}

/// Convert an application value into the wire shape for a declared kind.
/// Kinds without a dedicated shape fall back to rich text, lossy but
/// non-fatal.
pub fn to_wire(name: &str, kind: &PropertyKind, value: &PropertyValue) -> serde_json::Value {
    match kind {
        PropertyKind::Title => serde_json::json!({
            "title": [{"text": {"content": stringify(value)}}]
        }),
        PropertyKind::RichText => rich_text_shape(value),
        PropertyKind::Number => serde_json::json!({ "number": coerce_number(value) }),
        PropertyKind::Checkbox => serde_json::json!({ "checkbox": coerce_bool(value) }),
        PropertyKind::Date => serde_json::json!({
            "date": {"start": normalize_date(value).to_rfc3339()}
        }),
        PropertyKind::MultiSelect => {
            let options: Vec<serde_json::Value> = match value {
                PropertyValue::List(items) => items
                    .iter()
                    .map(|item| serde_json::json!({"name": item}))
                    .collect(),
                scalar => vec![serde_json::json!({"name": stringify(scalar)})],
            };
            serde_json::json!({ "multi_select": options })
        }
        PropertyKind::Select | PropertyKind::Other(_) => {
            warn!(
                target: "notion_db::property",
                "unsupported property type '{}' for '{}', treating as rich_text",
                kind.as_tag(),
                name
            );
            rich_text_shape(value)
        }
    }
}

fn rich_text_shape(value: &PropertyValue) -> serde_json::Value {
    serde_json::json!({
        "rich_text": [{"text": {"content": stringify(value)}}]
    })
}

pub fn stringify(value: &PropertyValue) -> String {
    match value {
        PropertyValue::Text(s) => s.clone(),
        PropertyValue::Number(n) => {
            if n.fract() == 0.0 && n.is_finite() {
                format!("{}", *n as i64)
            } else {
                n.to_string()
            }
        }
        PropertyValue::Bool(b) => b.to_string(),
        PropertyValue::Date(d) => d.to_rfc3339(),
        PropertyValue::List(items) => items.join(","),
    }
}

fn coerce_number(value: &PropertyValue) -> f64 {
    match value {
        PropertyValue::Number(n) => *n,
        PropertyValue::Text(s) => s.trim().parse::<f64>().unwrap_or_else(|_| {
            warn!(target: "notion_db::property", "non-numeric value '{}' for number property, using 0", s);
            0.0
        }),
        PropertyValue::Bool(b) => {
            if *b { 1.0 } else { 0.0 }
        }
        PropertyValue::Date(d) => d.timestamp_millis() as f64,
        PropertyValue::List(_) => {
            warn!(target: "notion_db::property", "list value for number property, using 0");
            0.0
        }
    }
}

fn coerce_bool(value: &PropertyValue) -> bool {
    match value {
        PropertyValue::Bool(b) => *b,
        PropertyValue::Text(s) => match s.to_ascii_lowercase().as_str() {
            "true" => true,
            "false" => false,
            other => !other.is_empty(),
        },
        PropertyValue::Number(n) => *n != 0.0,
        PropertyValue::Date(_) => true,
        PropertyValue::List(items) => !items.is_empty(),
    }
}

/// Resolve a value into a concrete timestamp for a date property.
/// Text runs through the parse ladder; numbers are epoch milliseconds.
/// Anything unparseable falls back to now rather than failing the insert.
pub fn normalize_date(value: &PropertyValue) -> DateTime<Utc> {
    match value {
        PropertyValue::Date(d) => *d,
        PropertyValue::Text(s) => parse_datetime(s).unwrap_or_else(|| {
            warn!(target: "notion_db::property", "invalid date value '{}', using current time", s);
            Utc::now()
        }),
        PropertyValue::Number(n) => DateTime::from_timestamp_millis(*n as i64).unwrap_or_else(|| {
            warn!(target: "notion_db::property", "out-of-range date millis {}, using current time", n);
            Utc::now()
        }),
        other => {
            warn!(
                target: "notion_db::property",
                "unsupported date value {:?}, using current time",
                other
            );
            Utc::now()
        }
    }
}

/// Accept RFC 3339 and common variants without timezone (assume UTC).
fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc));
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc));
    }
    // Date-only at midnight UTC
    if let Ok(nd) = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(ndt) = nd.and_hms_opt(0, 0, 0) {
            return Some(DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc));
        }
    }
    None
}
