//! OCPP-J message envelope
//!
//! Every frame on the wire is a positional JSON array, discriminant first:
//!
//! - **Call**       `[2, "<uniqueId>", "<action>", {<payload>}]`
//! - **CallResult** `[3, "<uniqueId>", {<payload>}]`
//! - **CallError**  `[4, "<uniqueId>", "<errorCode>", "<errorDescription>", {<errorDetails>}]`
//!
//! Only the shape of the envelope is checked here. Payload contents are
//! interpreted by the action handlers.

use serde_json::Value;
use thiserror::Error;

// ── Message-type constants ─────────────────────────────────────

const MSG_TYPE_CALL: u64 = 2;
const MSG_TYPE_CALL_RESULT: u64 = 3;
const MSG_TYPE_CALL_ERROR: u64 = 4;

const CALL_ARITY: usize = 4;
const CALL_RESULT_ARITY: usize = 3;
const CALL_ERROR_ARITY: usize = 5;

// ── OcppFrame ──────────────────────────────────────────────────

/// A decoded OCPP-J frame.
#[derive(Debug, Clone, PartialEq)]
pub enum OcppFrame {
    /// `[2, uniqueId, action, payload]`
    Call {
        unique_id: String,
        action: String,
        payload: Value,
    },
    /// `[3, uniqueId, payload]`
    CallResult { unique_id: String, payload: Value },
    /// `[4, uniqueId, errorCode, errorDescription, errorDetails]`
    CallError {
        unique_id: String,
        error_code: String,
        error_description: String,
        error_details: Value,
    },
}

impl OcppFrame {
    // ── Parsing ────────────────────────────────────────────

    /// Parse a raw text frame.
    pub fn parse(text: &str) -> Result<Self, OcppFrameError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| OcppFrameError::InvalidJson(e.to_string()))?;

        let Value::Array(arr) = value else {
            return Err(OcppFrameError::NotAnArray);
        };

        let Some(first) = arr.first() else {
            return Err(OcppFrameError::EmptyArray);
        };

        let msg_type = first.as_u64().ok_or(OcppFrameError::InvalidMessageType)?;

        match msg_type {
            MSG_TYPE_CALL => Self::parse_call(arr),
            MSG_TYPE_CALL_RESULT => Self::parse_call_result(arr),
            MSG_TYPE_CALL_ERROR => Self::parse_call_error(arr),
            _ => Err(OcppFrameError::UnknownMessageType(msg_type)),
        }
    }

    fn parse_call(arr: Vec<Value>) -> Result<Self, OcppFrameError> {
        let [_, unique_id, action, payload] = expect_arity::<CALL_ARITY>(arr)?;

        Ok(Self::Call {
            unique_id: string_field(unique_id, "uniqueId must be a string")?,
            action: string_field(action, "action must be a string")?,
            payload,
        })
    }

    fn parse_call_result(arr: Vec<Value>) -> Result<Self, OcppFrameError> {
        let [_, unique_id, payload] = expect_arity::<CALL_RESULT_ARITY>(arr)?;

        Ok(Self::CallResult {
            unique_id: string_field(unique_id, "uniqueId must be a string")?,
            payload,
        })
    }

    fn parse_call_error(arr: Vec<Value>) -> Result<Self, OcppFrameError> {
        let [_, unique_id, error_code, error_description, error_details] =
            expect_arity::<CALL_ERROR_ARITY>(arr)?;

        Ok(Self::CallError {
            unique_id: string_field(unique_id, "uniqueId must be a string")?,
            error_code: string_field(error_code, "errorCode must be a string")?,
            error_description: string_field(
                error_description,
                "errorDescription must be a string",
            )?,
            error_details,
        })
    }

    // ── Serialization ──────────────────────────────────────

    /// Serialize this frame to its positional JSON text.
    pub fn serialize(&self) -> String {
        let arr = match self {
            Self::Call {
                unique_id,
                action,
                payload,
            } => Value::Array(vec![
                Value::Number(MSG_TYPE_CALL.into()),
                Value::String(unique_id.clone()),
                Value::String(action.clone()),
                payload.clone(),
            ]),

            Self::CallResult { unique_id, payload } => Value::Array(vec![
                Value::Number(MSG_TYPE_CALL_RESULT.into()),
                Value::String(unique_id.clone()),
                payload.clone(),
            ]),

            Self::CallError {
                unique_id,
                error_code,
                error_description,
                error_details,
            } => Value::Array(vec![
                Value::Number(MSG_TYPE_CALL_ERROR.into()),
                Value::String(unique_id.clone()),
                Value::String(error_code.clone()),
                Value::String(error_description.clone()),
                error_details.clone(),
            ]),
        };

        arr.to_string()
    }

    // ── Helpers ────────────────────────────────────────────

    /// Build a `CallResult` answering `unique_id`.
    pub fn result_response(unique_id: impl Into<String>, payload: Value) -> Self {
        Self::CallResult {
            unique_id: unique_id.into(),
            payload,
        }
    }

    /// Build a `CallError` answering `unique_id`, with empty details.
    pub fn error_response(
        unique_id: impl Into<String>,
        error_code: OcppErrorCode,
        error_description: impl Into<String>,
    ) -> Self {
        Self::CallError {
            unique_id: unique_id.into(),
            error_code: error_code.as_str().to_string(),
            error_description: error_description.into(),
            error_details: Value::Object(Default::default()),
        }
    }
}

fn expect_arity<const N: usize>(arr: Vec<Value>) -> Result<[Value; N], OcppFrameError> {
    let got = arr.len();
    arr.try_into()
        .map_err(|_| OcppFrameError::WrongArity { expected: N, got })
}

fn string_field(value: Value, what: &'static str) -> Result<String, OcppFrameError> {
    match value {
        Value::String(s) => Ok(s),
        _ => Err(OcppFrameError::FieldTypeMismatch(what)),
    }
}

// ── Error codes ────────────────────────────────────────────────

/// OCPP-J `CallError` error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcppErrorCode {
    NotImplemented,
    NotSupported,
    InternalError,
    ProtocolError,
    SecurityError,
    FormationViolation,
    PropertyConstraintViolation,
    OccurrenceConstraintViolation,
    TypeConstraintViolation,
    GenericError,
}

impl OcppErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotImplemented => "NotImplemented",
            Self::NotSupported => "NotSupported",
            Self::InternalError => "InternalError",
            Self::ProtocolError => "ProtocolError",
            Self::SecurityError => "SecurityError",
            Self::FormationViolation => "FormationViolation",
            Self::PropertyConstraintViolation => "PropertyConstraintViolation",
            Self::OccurrenceConstraintViolation => "OccurrenceConstraintViolation",
            Self::TypeConstraintViolation => "TypeConstraintViolation",
            Self::GenericError => "GenericError",
        }
    }
}

impl std::fmt::Display for OcppErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Errors ─────────────────────────────────────────────────────

/// Malformed envelope: the frame cannot be decoded at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OcppFrameError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),
    #[error("Frame is not a JSON array")]
    NotAnArray,
    #[error("Empty array")]
    EmptyArray,
    #[error("Message type must be an unsigned integer")]
    InvalidMessageType,
    #[error("Unknown message type: {0}")]
    UnknownMessageType(u64),
    #[error("Wrong number of elements: expected {expected}, got {got}")]
    WrongArity { expected: usize, got: usize },
    #[error("Field type mismatch: {0}")]
    FieldTypeMismatch(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_call() {
        let text = r#"[2,"abc123","BootNotification",{"chargePointVendor":"Vendor","chargePointModel":"Model"}]"#;
        let frame = OcppFrame::parse(text).unwrap();
        match frame {
            OcppFrame::Call {
                unique_id,
                action,
                payload,
            } => {
                assert_eq!(unique_id, "abc123");
                assert_eq!(action, "BootNotification");
                assert_eq!(payload["chargePointVendor"], "Vendor");
            }
            _ => panic!("Expected Call frame"),
        }
    }

    #[test]
    fn parse_call_result() {
        let text = r#"[3,"abc123",{"status":"Accepted","currentTime":"2024-01-01T00:00:00Z","interval":300}]"#;
        let frame = OcppFrame::parse(text).unwrap();
        match frame {
            OcppFrame::CallResult { unique_id, payload } => {
                assert_eq!(unique_id, "abc123");
                assert_eq!(payload["status"], "Accepted");
            }
            _ => panic!("Expected CallResult frame"),
        }
    }

    #[test]
    fn parse_call_error() {
        let text = r#"[4,"abc123","NotImplemented","Action not supported",{}]"#;
        let frame = OcppFrame::parse(text).unwrap();
        match frame {
            OcppFrame::CallError {
                unique_id,
                error_code,
                error_description,
                ..
            } => {
                assert_eq!(unique_id, "abc123");
                assert_eq!(error_code, "NotImplemented");
                assert_eq!(error_description, "Action not supported");
            }
            _ => panic!("Expected CallError frame"),
        }
    }

    #[test]
    fn rejects_invalid_json() {
        assert!(matches!(
            OcppFrame::parse("[2, \"id\""),
            Err(OcppFrameError::InvalidJson(_))
        ));
    }

    #[test]
    fn rejects_non_array() {
        assert_eq!(
            OcppFrame::parse(r#"{"action":"Heartbeat"}"#),
            Err(OcppFrameError::NotAnArray)
        );
        assert_eq!(OcppFrame::parse("[]"), Err(OcppFrameError::EmptyArray));
    }

    #[test]
    fn rejects_unknown_discriminant() {
        assert_eq!(
            OcppFrame::parse(r#"[5,"id","Heartbeat",{}]"#),
            Err(OcppFrameError::UnknownMessageType(5))
        );
        assert_eq!(
            OcppFrame::parse(r#"["2","id","Heartbeat",{}]"#),
            Err(OcppFrameError::InvalidMessageType)
        );
    }

    #[test]
    fn rejects_wrong_arity() {
        assert_eq!(
            OcppFrame::parse(r#"[2,"id","Heartbeat"]"#),
            Err(OcppFrameError::WrongArity {
                expected: 4,
                got: 3
            })
        );
        assert_eq!(
            OcppFrame::parse(r#"[3,"id",{},{}]"#),
            Err(OcppFrameError::WrongArity {
                expected: 3,
                got: 4
            })
        );
        assert_eq!(
            OcppFrame::parse(r#"[4,"id","GenericError","boom"]"#),
            Err(OcppFrameError::WrongArity {
                expected: 5,
                got: 4
            })
        );
    }

    #[test]
    fn rejects_non_string_message_id() {
        assert_eq!(
            OcppFrame::parse(r#"[2,42,"Heartbeat",{}]"#),
            Err(OcppFrameError::FieldTypeMismatch("uniqueId must be a string"))
        );
    }

    #[test]
    fn payload_is_not_validated() {
        let frame = OcppFrame::parse(r#"[2,"id","Heartbeat",[1,2,3]]"#).unwrap();
        assert!(matches!(frame, OcppFrame::Call { .. }));
    }

    #[test]
    fn serialize_preserves_all_three_shapes() {
        let frames = [
            r#"[2,"id1","StartTransaction",{"connectorId":1,"idTag":"TAG"}]"#,
            r#"[3,"id2",{"currentTime":"2024-01-01T00:00:00Z"}]"#,
            r#"[4,"id3","GenericError","Something went wrong",{"hint":"x"}]"#,
        ];
        for text in frames {
            let frame = OcppFrame::parse(text).unwrap();
            let reencoded: Value = serde_json::from_str(&frame.serialize()).unwrap();
            let original: Value = serde_json::from_str(text).unwrap();
            assert_eq!(reencoded, original);
        }
    }

    #[test]
    fn error_response_has_empty_details() {
        let frame = OcppFrame::error_response(
            "id3",
            OcppErrorCode::PropertyConstraintViolation,
            "connectorId must be positive",
        );
        let json: Value = serde_json::from_str(&frame.serialize()).unwrap();
        assert_eq!(
            json,
            json!([
                4,
                "id3",
                "PropertyConstraintViolation",
                "connectorId must be positive",
                {}
            ])
        );
    }
}
