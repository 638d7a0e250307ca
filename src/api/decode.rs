//! Response body normalization.
//!
//! A body that is not a JSON array is a decode failure for the whole
//! response. Inside an array, elements that do not decode (unknown status,
//! missing id) are dropped one by one so a single bad row cannot blank a
//! surface.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{FeedError, Result};
use crate::types::{Comment, Issue};

/// Decode the issue collection returned by the explore endpoint.
pub fn decode_collection(endpoint: &str, body: Value) -> Result<Vec<Issue>> {
    decode_list(endpoint, "issue", body)
}

/// Decode a comment list.
pub fn decode_comments(endpoint: &str, body: Value) -> Result<Vec<Comment>> {
    decode_list(endpoint, "comment", body)
}

fn decode_list<T: DeserializeOwned>(endpoint: &str, item_name: &str, body: Value) -> Result<Vec<T>> {
    let Value::Array(rows) = body else {
        return Err(FeedError::Decode {
            endpoint: endpoint.to_string(),
            reason: format!("expected an array, got {}", json_kind(&body)),
        });
    };

    let total = rows.len();
    let items: Vec<T> = rows
        .into_iter()
        .enumerate()
        .filter_map(|(index, row)| match serde_json::from_value(row) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!("Dropping {item_name} #{index} from {endpoint}: {e}");
                None
            }
        })
        .collect();

    if items.len() < total {
        tracing::debug!(
            "Decoded {} of {} {item_name} rows from {endpoint}",
            items.len(),
            total
        );
    }
    Ok(items)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
