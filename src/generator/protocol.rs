//! NDJSON protocol spoken with the generator worker.
//!
//! One JSON object per line in each direction:
//!
//! ```text
//! -> {"id":"…","method":"generate","params":{"prompt":"…","question":"…","schema":"…"}}
//! <- {"id":"…","success":true,"result":{"sql":"SELECT …"}}
//! <- {"id":"…","success":false,"error":{"code":"…","message":"…"}}
//! ```

use serde::{Deserialize, Serialize};

// ============================================================================
// Request/Response Envelope
// ============================================================================

/// Request envelope sent to the worker.
#[derive(Debug, Clone, Serialize)]
pub struct RequestEnvelope {
    /// Unique request ID for correlation.
    pub id: String,
    pub method: String,
    pub params: serde_json::Value,
}

/// Response envelope received from the worker.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseEnvelope {
    /// Request ID this response corresponds to.
    pub id: String,
    pub success: bool,
    /// Present if success = true.
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    /// Present if success = false.
    #[serde(default)]
    pub error: Option<ErrorInfo>,
}

/// Error information in a failed response.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

// ============================================================================
// Generation
// ============================================================================

/// Parameters for `generate`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GenerateParams {
    /// Full instruction prompt.
    pub prompt: String,
    /// The raw question, for workers that build their own prompt.
    pub question: String,
    /// The raw schema text.
    pub schema: String,
}

/// Response from `generate`.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    pub sql: String,
}

/// Worker method names.
pub mod methods {
    pub const GENERATE: &str = "generate";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_envelope_serialization() {
        let request = RequestEnvelope {
            id: "req-1".to_string(),
            method: methods::GENERATE.to_string(),
            params: serde_json::to_value(GenerateParams {
                prompt: "p".into(),
                question: "q".into(),
                schema: "users(id)".into(),
            })
            .unwrap(),
        };

        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(
            json,
            r#"{"id":"req-1","method":"generate","params":{"prompt":"p","question":"q","schema":"users(id)"}}"#
        );
    }

    #[test]
    fn test_success_response() {
        let json = r#"{"id": "req-1", "success": true, "result": {"sql": "SELECT 1"}}"#;
        let response: ResponseEnvelope = serde_json::from_str(json).unwrap();
        assert!(response.success);
        let result: GenerateResponse = serde_json::from_value(response.result.unwrap()).unwrap();
        assert_eq!(result.sql, "SELECT 1");
    }

    #[test]
    fn test_error_response() {
        let json = r#"{"id": "req-2", "success": false, "error": {"code": "MODEL_FAILED", "message": "out of memory"}}"#;
        let response: ResponseEnvelope = serde_json::from_str(json).unwrap();
        assert!(!response.success);
        assert!(response.result.is_none());
        assert_eq!(response.error.unwrap().code, "MODEL_FAILED");
    }
}
