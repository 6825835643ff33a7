//! Shared API request/response types
//!
//! Wire shapes of the three endpoints the client talks to:
//! - `GET <data>` returns a JSON array of [`Record`]
//! - `POST <submit>` takes [`CreateRecordRequest`], answers `{ "uploadId": "..." }`
//! - `POST <upload>/<uploadId>` takes a multipart `file` field, answers `{ "result": true }`
//!
//! Response bodies are read leniently from `serde_json::Value` because the
//! success conditions are defined on individual fields, not on a full schema.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A server-confirmed entry of the synchronized list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Free-form label (at most 100 characters)
    pub name: String,
    /// Integer height in `[0, 500]`
    pub height: i64,
    /// Display name of the stored file
    pub file: String,
}

impl Record {
    pub fn new(name: impl Into<String>, height: i64, file: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            height,
            file: file.into(),
        }
    }

    /// Strict conversion of one downloaded element.
    ///
    /// The element must be an object with exactly the keys `name` (string),
    /// `height` (integral number) and `file` (string).
    pub fn from_strict_json(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        if object.len() != 3 {
            return None;
        }
        let name = object.get("name")?.as_str()?;
        let height = integral(object.get("height")?)?;
        let file = object.get("file")?.as_str()?;
        Some(Self::new(name, height, file))
    }
}

/// Accepts `46` and `46.0`, rejects `46.5` and non-numbers.
fn integral(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// Height as entered by the user: either already numeric or raw text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeightInput {
    Integer(i64),
    Text(String),
}

impl HeightInput {
    /// True when nothing was entered
    pub fn is_blank(&self) -> bool {
        matches!(self, HeightInput::Text(s) if s.is_empty())
    }

    /// Integer value, if the input holds one
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            HeightInput::Integer(n) => Some(*n),
            HeightInput::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl From<i64> for HeightInput {
    fn from(n: i64) -> Self {
        HeightInput::Integer(n)
    }
}

impl From<&str> for HeightInput {
    fn from(s: &str) -> Self {
        HeightInput::Text(s.to_string())
    }
}

impl From<String> for HeightInput {
    fn from(s: String) -> Self {
        HeightInput::Text(s)
    }
}

/// Body of the record-creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRecordRequest {
    pub name: String,
    /// Sent exactly as entered; `null` when nothing was entered
    pub height: Option<HeightInput>,
}

/// Relevant part of the record-creation response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateRecordResponse {
    /// Identifier addressing the upload endpoint; `None` when missing or empty
    pub upload_id: Option<String>,
}

impl CreateRecordResponse {
    pub fn from_body(body: &Value) -> Self {
        let upload_id = body
            .get("uploadId")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string);
        Self { upload_id }
    }
}

/// Relevant part of the upload response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadResponse {
    /// Truthiness of the `result` field
    pub result: bool,
    /// Server-provided explanation, present on rejections
    pub message: Option<String>,
}

impl UploadResponse {
    pub fn from_body(body: &Value) -> Self {
        Self {
            result: body.get("result").map(is_truthy).unwrap_or(false),
            message: body
                .get("message")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .map(str::to_string),
        }
    }
}

/// JSON truthiness: `null`, `false`, `0` and `""` are falsy, everything else is truthy
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strict_record_accepts_exact_shape() {
        let value = json!({ "name": "Kubula", "height": 46, "file": "soubor.jpg" });
        assert_eq!(
            Record::from_strict_json(&value),
            Some(Record::new("Kubula", 46, "soubor.jpg"))
        );
    }

    #[test]
    fn test_strict_record_accepts_integral_float() {
        let value = json!({ "name": "a", "height": 46.0, "file": "f" });
        assert_eq!(Record::from_strict_json(&value).map(|r| r.height), Some(46));
    }

    #[test]
    fn test_strict_record_rejects_deviations() {
        let cases = vec![
            json!({ "naaame": "Kubula", "height": 46, "file": "soubor.jpg" }),
            json!({ "name": "Kubula", "height": 46.5, "file": "soubor.jpg" }),
            json!({ "name": "Kubula", "height": "46", "file": "soubor.jpg" }),
            json!({ "name": 7, "height": 46, "file": "soubor.jpg" }),
            json!({ "name": "Kubula", "height": 46, "file": "soubor.jpg", "extra": 1 }),
            json!(["Kubula", 46, "soubor.jpg"]),
            json!(null),
        ];
        for case in cases {
            assert!(Record::from_strict_json(&case).is_none(), "accepted {}", case);
        }
    }

    #[test]
    fn test_height_input_serializes_untagged() {
        let text = serde_json::to_value(HeightInput::from("157")).unwrap();
        let number = serde_json::to_value(HeightInput::from(157)).unwrap();
        assert_eq!(text, json!("157"));
        assert_eq!(number, json!(157));
    }

    #[test]
    fn test_height_input_helpers() {
        assert!(HeightInput::from("").is_blank());
        assert!(!HeightInput::from(0).is_blank());
        assert_eq!(HeightInput::from("42").as_integer(), Some(42));
        assert_eq!(HeightInput::from("abc").as_integer(), None);
    }

    #[test]
    fn test_create_response_requires_non_empty_upload_id() {
        let ok = CreateRecordResponse::from_body(&json!({ "uploadId": "X" }));
        assert_eq!(ok.upload_id.as_deref(), Some("X"));

        assert_eq!(CreateRecordResponse::from_body(&json!({ "uploadId": "" })).upload_id, None);
        assert_eq!(CreateRecordResponse::from_body(&json!({})).upload_id, None);
        assert_eq!(CreateRecordResponse::from_body(&Value::Null).upload_id, None);
    }

    #[test]
    fn test_upload_response_truthiness() {
        assert!(UploadResponse::from_body(&json!({ "result": true })).result);
        assert!(UploadResponse::from_body(&json!({ "result": 1 })).result);
        assert!(UploadResponse::from_body(&json!({ "result": "ok" })).result);
        assert!(!UploadResponse::from_body(&json!({ "result": false })).result);
        assert!(!UploadResponse::from_body(&json!({ "result": 0 })).result);
        assert!(!UploadResponse::from_body(&json!({})).result);

        let rejected = UploadResponse::from_body(&json!({ "message": "File too large" }));
        assert_eq!(rejected.message.as_deref(), Some("File too large"));
    }
}
