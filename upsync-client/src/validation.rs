//! Client-side validation
//!
//! Two gates live here:
//! - [`validate`] checks an [`UploadCandidate`] before any request is made.
//!   It is advisory only; the server independently rejects bad submissions.
//! - [`parse_payload`] accepts or rejects a downloaded list as a whole.

use serde_json::Value;
use std::collections::BTreeMap;
use upsync_common::api::HeightInput;
use upsync_common::Record;

/// Longest accepted name, in characters
pub const MAX_NAME_CHARS: usize = 100;
/// Largest accepted height
pub const MAX_HEIGHT: i64 = 500;
/// Smallest accepted height
pub const MIN_HEIGHT: i64 = 0;
/// Largest accepted file, in bytes (10 MiB)
pub const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Form fields a message can be attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormField {
    Name,
    Height,
    File,
}

impl FormField {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormField::Name => "name",
            FormField::Height => "height",
            FormField::File => "file",
        }
    }

    fn required_message(&self) -> String {
        match self {
            FormField::Name => "Name is required",
            FormField::Height => "Height is required",
            FormField::File => "File is required",
        }
        .to_string()
    }
}

impl std::fmt::Display for FormField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field name to message; empty means valid
pub type FieldErrors = BTreeMap<FormField, String>;

/// File selected for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryPayload {
    /// Raw file contents
    pub bytes: Vec<u8>,
    /// Display name, becomes `Record::file`
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// MIME type sent with the multipart part
    pub mime_type: String,
}

impl BinaryPayload {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            size: bytes.len() as u64,
            bytes,
            name: name.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// Unconfirmed user input, owned by one submission attempt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadCandidate {
    pub name: String,
    pub height: Option<HeightInput>,
    pub file: Option<BinaryPayload>,
}

impl UploadCandidate {
    pub fn new(name: impl Into<String>, height: impl Into<HeightInput>, file: BinaryPayload) -> Self {
        Self {
            name: name.into(),
            height: Some(height.into()),
            file: Some(file),
        }
    }
}

/// Validate a candidate; with `enabled == false` every candidate passes
///
/// At most one message is reported per field.
pub fn validate(candidate: &UploadCandidate, enabled: bool) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if !enabled {
        return errors;
    }

    if candidate.name.is_empty() {
        errors.insert(FormField::Name, FormField::Name.required_message());
    } else if candidate.name.chars().count() > MAX_NAME_CHARS {
        errors.insert(
            FormField::Name,
            format!("Maximum length is {} characters", MAX_NAME_CHARS),
        );
    }

    match &candidate.height {
        None => {
            errors.insert(FormField::Height, FormField::Height.required_message());
        }
        Some(height) if height.is_blank() => {
            errors.insert(FormField::Height, FormField::Height.required_message());
        }
        Some(height) => {
            if let Some(message) = check_height(height) {
                errors.insert(FormField::Height, message);
            }
        }
    }

    match &candidate.file {
        None => {
            errors.insert(FormField::File, FormField::File.required_message());
        }
        Some(file) if file.size > MAX_FILE_BYTES => {
            errors.insert(FormField::File, "Maximum size of file is 10 MB".to_string());
        }
        Some(_) => {}
    }

    errors
}

fn check_height(height: &HeightInput) -> Option<String> {
    let value = match height {
        HeightInput::Integer(n) => *n,
        HeightInput::Text(text) => match parse_integer_text(text) {
            Some(n) => n,
            None => return Some("Height must be integer".to_string()),
        },
    };

    if value > MAX_HEIGHT {
        Some(format!("Maximum height is {}", MAX_HEIGHT))
    } else if value < MIN_HEIGHT {
        Some("Height must be larger than 0".to_string())
    } else {
        None
    }
}

/// Optional sign followed by ASCII digits only
///
/// Values beyond `i64` saturate, which still lands them outside the range.
fn parse_integer_text(text: &str) -> Option<i64> {
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match text.parse::<i64>() {
        Ok(n) => Some(n),
        Err(_) if negative => Some(i64::MIN),
        Err(_) => Some(i64::MAX),
    }
}

/// Accept a downloaded list only if every element is a well-formed record
pub fn parse_payload(payload: &Value) -> Option<Vec<Record>> {
    payload
        .as_array()?
        .iter()
        .map(Record::from_strict_json)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn file_of_size(size: usize) -> BinaryPayload {
        BinaryPayload::new("avatar.png", "image/png", vec![0u8; size])
    }

    fn valid_candidate() -> UploadCandidate {
        UploadCandidate::new("Peter", "157", file_of_size(6))
    }

    fn height_error(height: HeightInput) -> Option<String> {
        let candidate = UploadCandidate {
            height: Some(height),
            ..valid_candidate()
        };
        validate(&candidate, true).remove(&FormField::Height)
    }

    #[test]
    fn test_valid_candidate_has_no_errors() {
        assert!(validate(&valid_candidate(), true).is_empty());
        assert!(validate(&UploadCandidate::new("Peter", 0, file_of_size(1)), true).is_empty());
        assert!(validate(&UploadCandidate::new("Peter", "500", file_of_size(1)), true).is_empty());
    }

    #[test]
    fn test_empty_candidate_reports_all_required_fields() {
        let errors = validate(&UploadCandidate::default(), true);
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[&FormField::Name], "Name is required");
        assert_eq!(errors[&FormField::Height], "Height is required");
        assert_eq!(errors[&FormField::File], "File is required");
    }

    #[test]
    fn test_each_missing_field_is_reported() {
        let no_name = UploadCandidate {
            name: String::new(),
            ..valid_candidate()
        };
        assert!(validate(&no_name, true).contains_key(&FormField::Name));

        let blank_height = UploadCandidate {
            height: Some(HeightInput::from("")),
            ..valid_candidate()
        };
        assert!(validate(&blank_height, true).contains_key(&FormField::Height));

        let no_file = UploadCandidate {
            file: None,
            ..valid_candidate()
        };
        let errors = validate(&no_file, true);
        assert_eq!(errors.len(), 1);
        assert!(errors.contains_key(&FormField::File));
    }

    #[test]
    fn test_name_length_limit_counts_characters() {
        let at_limit = UploadCandidate {
            name: "ž".repeat(100),
            ..valid_candidate()
        };
        assert!(validate(&at_limit, true).is_empty());

        let over = UploadCandidate {
            name: "a".repeat(101),
            ..valid_candidate()
        };
        assert_eq!(
            validate(&over, true)[&FormField::Name],
            "Maximum length is 100 characters"
        );
    }

    #[test]
    fn test_height_rules() {
        assert_eq!(height_error("abc".into()).as_deref(), Some("Height must be integer"));
        assert_eq!(height_error("1.5".into()).as_deref(), Some("Height must be integer"));
        assert_eq!(height_error("501".into()).as_deref(), Some("Maximum height is 500"));
        assert_eq!(height_error("-1".into()).as_deref(), Some("Height must be larger than 0"));
        assert_eq!(height_error(501.into()).as_deref(), Some("Maximum height is 500"));
        assert_eq!(height_error((-3).into()).as_deref(), Some("Height must be larger than 0"));
        assert_eq!(
            height_error("99999999999999999999999".into()).as_deref(),
            Some("Maximum height is 500")
        );
        assert_eq!(height_error("+42".into()), None);
    }

    #[test]
    fn test_file_size_limit() {
        let at_limit = UploadCandidate {
            file: Some(file_of_size(10 * 1024 * 1024)),
            ..valid_candidate()
        };
        assert!(validate(&at_limit, true).is_empty());

        let over = UploadCandidate {
            file: Some(file_of_size(10 * 1024 * 1024 + 1)),
            ..valid_candidate()
        };
        assert_eq!(
            validate(&over, true)[&FormField::File],
            "Maximum size of file is 10 MB"
        );
    }

    #[test]
    fn test_disabled_validation_accepts_anything() {
        assert!(validate(&UploadCandidate::default(), false).is_empty());
        let bad = UploadCandidate {
            name: "a".repeat(500),
            height: Some("abc".into()),
            file: Some(file_of_size(10 * 1024 * 1024 + 1)),
        };
        assert!(validate(&bad, false).is_empty());
    }

    #[test]
    fn test_parse_payload_accepts_valid_list() {
        let payload = json!([
            { "name": "Kubula", "height": 46, "file": "soubor.jpg" },
            { "name": "Alice", "height": 0, "file": "a.png" }
        ]);
        let records = parse_payload(&payload).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], Record::new("Kubula", 46, "soubor.jpg"));
        assert_eq!(parse_payload(&json!([])), Some(vec![]));
    }

    #[test]
    fn test_parse_payload_rejects_whole_list_on_any_deviation() {
        let payload = json!([
            { "name": "Kubula", "height": 46, "file": "soubor.jpg" },
            { "naaame": "X", "height": 1, "file": "f" }
        ]);
        assert!(parse_payload(&payload).is_none());
        assert!(parse_payload(&json!({ "name": "Kubula" })).is_none());
        assert!(parse_payload(&json!("[]")).is_none());
        assert!(parse_payload(&Value::Null).is_none());
    }
}
