//! OCPP-J message framing
//!
//! Wire tuples exchanged with the central system:
//!
//! - **Call**       `[2, "<uniqueId>", "<action>", {<payload>}]`
//! - **CallResult** `[3, "<uniqueId>", {<payload>}]`
//! - **CallError**  `[4, "<uniqueId>", {"errorCode": .., "errorDescription": ..}]`
//!
//! Inbound CallErrors are also accepted in the long form
//! `[4, "<uniqueId>", "<errorCode>", "<errorDescription>", {<details>}]`.

use serde_json::{json, Value};
use thiserror::Error;

// ── Message-type constants ─────────────────────────────────────

pub const MSG_TYPE_CALL: u64 = 2;
pub const MSG_TYPE_CALL_RESULT: u64 = 3;
pub const MSG_TYPE_CALL_ERROR: u64 = 4;

// ── OcppFrame ──────────────────────────────────────────────────

/// A decoded OCPP-J frame. Positional access ends here; everything
/// downstream works with the named fields.
#[derive(Debug, Clone, PartialEq)]
pub enum OcppFrame {
    Call {
        unique_id: String,
        action: String,
        payload: Value,
    },
    CallResult {
        unique_id: String,
        payload: Value,
    },
    CallError {
        unique_id: String,
        error_code: String,
        error_description: String,
    },
}

impl OcppFrame {
    // ── Parsing ────────────────────────────────────────────

    /// Parse raw JSON text into an `OcppFrame`.
    pub fn parse(text: &str) -> Result<Self, OcppFrameError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| OcppFrameError::InvalidJson(e.to_string()))?;
        Self::from_value(&value)
    }

    /// Decode an already-parsed JSON value.
    pub fn from_value(value: &Value) -> Result<Self, OcppFrameError> {
        let arr = value.as_array().ok_or(OcppFrameError::NotAnArray)?;

        let msg_type = arr
            .first()
            .ok_or(OcppFrameError::EmptyArray)?
            .as_u64()
            .ok_or(OcppFrameError::InvalidMessageType)?;

        match msg_type {
            MSG_TYPE_CALL => Self::parse_call(arr),
            MSG_TYPE_CALL_RESULT => Self::parse_call_result(arr),
            MSG_TYPE_CALL_ERROR => Self::parse_call_error(arr),
            other => Err(OcppFrameError::UnknownMessageType(other)),
        }
    }

    fn unique_id_of(arr: &[Value]) -> Result<String, OcppFrameError> {
        arr.get(1)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(OcppFrameError::FieldTypeMismatch("uniqueId must be a string"))
    }

    fn parse_call(arr: &[Value]) -> Result<Self, OcppFrameError> {
        if arr.len() < 3 {
            return Err(OcppFrameError::MissingFields {
                expected: 4,
                got: arr.len(),
            });
        }

        let unique_id = Self::unique_id_of(arr)?;
        let action = arr[2]
            .as_str()
            .ok_or(OcppFrameError::FieldTypeMismatch("action must be a string"))?
            .to_string();
        let payload = match arr.get(3) {
            Some(Value::Null) | None => json!({}),
            Some(p) => p.clone(),
        };

        Ok(Self::Call {
            unique_id,
            action,
            payload,
        })
    }

    fn parse_call_result(arr: &[Value]) -> Result<Self, OcppFrameError> {
        if arr.len() < 2 {
            return Err(OcppFrameError::MissingFields {
                expected: 3,
                got: arr.len(),
            });
        }

        let unique_id = Self::unique_id_of(arr)?;
        let payload = match arr.get(2) {
            Some(Value::Null) | None => json!({}),
            Some(p) => p.clone(),
        };

        Ok(Self::CallResult { unique_id, payload })
    }

    fn parse_call_error(arr: &[Value]) -> Result<Self, OcppFrameError> {
        if arr.len() < 3 {
            return Err(OcppFrameError::MissingFields {
                expected: 3,
                got: arr.len(),
            });
        }

        let unique_id = Self::unique_id_of(arr)?;

        let (error_code, error_description) = match &arr[2] {
            Value::Object(obj) => (
                obj.get("errorCode")
                    .and_then(Value::as_str)
                    .unwrap_or("GenericError")
                    .to_string(),
                obj.get("errorDescription")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string(),
            ),
            Value::String(code) => (
                code.clone(),
                arr.get(3)
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string(),
            ),
            _ => {
                return Err(OcppFrameError::FieldTypeMismatch(
                    "error must be an object or an error code string",
                ))
            }
        };

        Ok(Self::CallError {
            unique_id,
            error_code,
            error_description,
        })
    }

    // ── Serialization ──────────────────────────────────────

    /// The frame as a JSON array value.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Call {
                unique_id,
                action,
                payload,
            } => json!([MSG_TYPE_CALL, unique_id, action, payload]),

            Self::CallResult { unique_id, payload } => {
                json!([MSG_TYPE_CALL_RESULT, unique_id, payload])
            }

            Self::CallError {
                unique_id,
                error_code,
                error_description,
            } => json!([
                MSG_TYPE_CALL_ERROR,
                unique_id,
                {
                    "errorCode": error_code,
                    "errorDescription": error_description,
                }
            ]),
        }
    }
}

// ── Errors ─────────────────────────────────────────────────────

/// Errors that can occur when decoding an OCPP-J frame.
#[derive(Debug, Error, PartialEq)]
pub enum OcppFrameError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),
    #[error("OCPP message is not a JSON array")]
    NotAnArray,
    #[error("Empty OCPP message array")]
    EmptyArray,
    #[error("Message type is not a number")]
    InvalidMessageType,
    #[error("Unknown message type: {0}")]
    UnknownMessageType(u64),
    #[error("Expected at least {expected} fields, got {got}")]
    MissingFields { expected: usize, got: usize },
    #[error("Field type mismatch: {0}")]
    FieldTypeMismatch(&'static str),
}
