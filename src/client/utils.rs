//! Helpers shared by the client.
//!
//! - Status code classification
//! - Unwrapping of paginated list responses

use serde_json::Value;

/// Check if status code indicates retryable error
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 425 | 429 | 500 | 502 | 503 | 504)
}

/// Check if status code indicates access denied
pub fn is_access_denied_status(status: u16) -> bool {
    matches!(status, 401 | 403)
}

/// One page of a list endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Records on this page
    pub results: Vec<Value>,
    /// Absolute URL of the next page, if any
    pub next: Option<String>,
}

/// Split a list response into records and the next page link.
///
/// The cloud wraps lists as `{"count", "next", "previous", "results"}`;
/// bare arrays are accepted as a single page. Anything else is treated as a
/// single record.
///
/// # Examples
///
/// ```
/// use iotile_cloud::client::unwrap_page;
/// use serde_json::json;
///
/// let page = unwrap_page(json!({"next": null, "results": [{"slug": "d--0001"}]}));
/// assert_eq!(page.results.len(), 1);
/// assert!(page.next.is_none());
/// ```
pub fn unwrap_page(body: Value) -> Page {
    match body {
        Value::Object(mut obj) if obj.contains_key("results") => {
            let next = match obj.remove("next") {
                Some(Value::String(next)) if !next.is_empty() => Some(next),
                _ => None,
            };
            let results = match obj.remove("results") {
                Some(Value::Array(items)) => items,
                Some(Value::Null) | None => Vec::new(),
                Some(other) => vec![other],
            };
            Page { results, next }
        }
        Value::Array(items) => Page {
            results: items,
            next: None,
        },
        other => Page {
            results: vec![other],
            next: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_retryable_status() {
        assert!(is_retryable_status(503));
        assert!(is_retryable_status(429));
        assert!(!is_retryable_status(404));
        assert!(!is_retryable_status(409));
    }

    #[test]
    fn test_is_access_denied_status() {
        assert!(is_access_denied_status(401));
        assert!(!is_access_denied_status(400));
    }

    #[test]
    fn test_unwrap_page_with_next() {
        let page = unwrap_page(json!({
            "count": 3,
            "next": "https://iotile.cloud/api/v1/device/?page=2",
            "previous": null,
            "results": [{"slug": "d--0001"}, {"slug": "d--0002"}]
        }));
        assert_eq!(page.results.len(), 2);
        assert_eq!(
            page.next.as_deref(),
            Some("https://iotile.cloud/api/v1/device/?page=2")
        );
    }

    #[test]
    fn test_unwrap_bare_array() {
        let page = unwrap_page(json!([{"slug": "d--0001"}]));
        assert_eq!(page.results, vec![json!({"slug": "d--0001"})]);
        assert!(page.next.is_none());
    }
}
