//! Request contract for serving traces over HTTP
//!
//! Any HTTP layer can wrap [`handle_request`]: it takes the raw request body
//! and returns the status code and JSON body to answer with.

use super::run;
use serde::Deserialize;
use serde_json::json;

/// Body of a trace request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TraceRequest {
    #[serde(default)]
    pub code: Option<String>,
}

/// Answer a `{"code": ...}` request.
///
/// Blank code is a client error; every other failure is reported as a 200
/// carrying `{"error": ...}` so the front end keeps working.
pub fn handle_request(body: &str) -> (u16, serde_json::Value) {
    let request: TraceRequest = match serde_json::from_str(body) {
        Ok(request) => request,
        Err(err) => {
            tracing::debug!(error = %err, "malformed request body");
            return (200, json!({ "error": err.to_string() }));
        }
    };
    let code = request.code.unwrap_or_default();
    if code.trim().is_empty() {
        return (400, json!({ "error": "No code provided." }));
    }
    match serde_json::to_value(run(&code)) {
        Ok(trace) => (200, trace),
        Err(err) => (200, json!({ "error": err.to_string() })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_code_is_rejected() {
        assert_eq!(
            handle_request(r#"{"code": "   \n"}"#),
            (400, json!({"error": "No code provided."}))
        );
        assert_eq!(handle_request("{}"), (400, json!({"error": "No code provided."})));
    }

    #[test]
    fn test_trace_is_returned() {
        let (status, body) = handle_request(r#"{"code": "x = 1\ny = x + 1\n"}"#);
        assert_eq!(status, 200);
        let entries = body.as_array().expect("trace array");
        assert!(!entries.is_empty());
        assert_eq!(entries[0]["event"], "line");
    }

    #[test]
    fn test_malformed_body_is_reported() {
        let (status, body) = handle_request("not json");
        assert_eq!(status, 200);
        assert!(body["error"].is_string());
    }
}
