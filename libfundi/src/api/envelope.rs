//! Decoding of the `success` / `message` / `data` response envelope
//!
//! The marketplace API wraps most bodies as
//! `{"success": true, "message": "...", "data": ...}`. A body without a
//! `success` key is treated as a bare payload. `success: false` becomes
//! [`ApiError::Rejected`] carrying the server's message.
//!
//! Paginated lists come in two shapes:
//!
//! - `data` is an array and pagination metadata sits next to it under
//!   `meta` or `pagination`
//! - `data` is an object holding the records under `data`, `items` or
//!   `results`, with the metadata either inline or under `meta`

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{ApiError, ApiResult};
use crate::types::Page;

const ITEM_KEYS: [&str; 3] = ["data", "items", "results"];
const META_KEYS: [&str; 2] = ["meta", "pagination"];

/// Unwrapped response body
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub message: Option<String>,
    pub data: Value,
    /// Sibling pagination block, when the server sends one
    pub meta: Option<Value>,
}

/// Strip the envelope from a response body
pub fn unwrap_envelope(body: Value) -> ApiResult<Envelope> {
    let mut object = match body {
        Value::Object(object) if object.contains_key("success") => object,
        other => {
            return Ok(Envelope {
                message: None,
                data: other,
                meta: None,
            })
        }
    };

    let success = object
        .get("success")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let message = object
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string);

    if !success {
        return Err(ApiError::Rejected(
            message.unwrap_or_else(|| "The request could not be completed".to_string()),
        ));
    }

    let meta = META_KEYS.iter().find_map(|key| object.remove(*key));
    let data = object.remove("data").unwrap_or(Value::Null);

    Ok(Envelope { message, data, meta })
}

/// Decode a single record from the envelope's data
pub fn decode<T: DeserializeOwned>(envelope: Envelope, what: &str) -> ApiResult<T> {
    serde_json::from_value(envelope.data)
        .map_err(|e| ApiError::Parse(format!("Failed to parse {}: {}", what, e)))
}

/// Decode a list that is never paginated (e.g. categories)
pub fn decode_list<T: DeserializeOwned>(envelope: Envelope, what: &str) -> ApiResult<Vec<T>> {
    let items = match envelope.data {
        Value::Object(mut object) => take_items(&mut object).unwrap_or(Value::Null),
        other => other,
    };
    if items.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(items)
        .map_err(|e| ApiError::Parse(format!("Failed to parse {} list: {}", what, e)))
}

/// Decode one page of records plus its pagination metadata
///
/// `requested_page` and `per_page` fill in whatever the server leaves out.
/// Without any metadata the returned page is treated as the last one.
pub fn decode_page<T: DeserializeOwned>(
    envelope: Envelope,
    requested_page: u32,
    per_page: u32,
    what: &str,
) -> ApiResult<Page<T>> {
    let (items, meta) = match envelope.data {
        Value::Array(items) => (Value::Array(items), envelope.meta),
        Value::Object(mut object) => {
            let items = take_items(&mut object).ok_or_else(|| {
                ApiError::Parse(format!("Failed to parse {} page: no records field", what))
            })?;
            let meta = META_KEYS
                .iter()
                .find_map(|key| object.remove(*key))
                .or(envelope.meta)
                .or(Some(Value::Object(object)));
            (items, meta)
        }
        Value::Null => (Value::Array(Vec::new()), envelope.meta),
        other => {
            return Err(ApiError::Parse(format!(
                "Failed to parse {} page: expected a list, got {}",
                what,
                kind(&other)
            )))
        }
    };

    let items: Vec<T> = serde_json::from_value(items)
        .map_err(|e| ApiError::Parse(format!("Failed to parse {} page: {}", what, e)))?;

    let meta = meta.unwrap_or(Value::Null);
    let current_page = read_u64(&meta, &["current_page", "page"])
        .map(|n| n as u32)
        .unwrap_or(requested_page)
        .max(1);
    let per_page = read_u64(&meta, &["per_page", "page_size", "limit"])
        .map(|n| n as u32)
        .filter(|n| *n > 0)
        .unwrap_or(per_page);
    let total = read_u64(&meta, &["total", "total_count"]);
    let total_pages = read_u64(&meta, &["last_page", "total_pages", "pages"])
        .map(|n| n as u32)
        .or_else(|| total.map(|total| total.div_ceil(u64::from(per_page.max(1))) as u32))
        .unwrap_or(current_page);

    Ok(Page {
        items,
        current_page,
        total_pages,
        total,
        per_page,
    })
}

fn take_items(object: &mut Map<String, Value>) -> Option<Value> {
    ITEM_KEYS.iter().find_map(|key| match object.get(*key) {
        Some(Value::Array(_)) => object.remove(*key),
        _ => None,
    })
}

fn read_u64(meta: &Value, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|key| match meta.get(*key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    })
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
