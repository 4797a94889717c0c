//! Decoding and shaping of raw model output.
//!
//! [`decode`] only answers "is this JSON at all"; shape checks belong to the
//! consuming stage, which folds the value into a typed reply with tolerant
//! defaults.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Failure to decode a model reply as JSON.
#[derive(Debug, Error)]
pub enum ReplyError {
    /// The model returned nothing at all.
    #[error("model returned an empty reply")]
    EmptyReply,
    /// The model returned text that is not valid JSON. Carries the raw text
    /// for diagnostics.
    #[error("model returned invalid JSON")]
    InvalidJson { raw: String },
}

/// Decode raw model output as a JSON value.
pub fn decode(raw: Option<&str>) -> Result<Value, ReplyError> {
    let raw = raw.ok_or(ReplyError::EmptyReply)?;
    if raw.is_empty() {
        return Err(ReplyError::EmptyReply);
    }
    serde_json::from_str(raw).map_err(|_| ReplyError::InvalidJson {
        raw: raw.to_string(),
    })
}

/// No-throw variant for diagnostic helpers.
///
/// Never use this on the pipeline's main path: a decode failure there must
/// surface to the caller, not collapse into `None`.
pub fn decode_lenient(raw: Option<&str>) -> Option<Value> {
    decode(raw).ok()
}

/// One file produced by an authoring stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyFile {
    pub path: String,
    pub content: String,
}

/// Author-stage reply. Fields default so a sparse but well-formed object is
/// still usable; an unusable shape collapses to an empty file list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AuthorReply {
    pub files: Vec<ReplyFile>,
    pub notes: String,
}

impl AuthorReply {
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }
}

/// Verify-stage reply. Issues and fixes stay as raw JSON; the pipeline only
/// inspects `pass` and counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyReply {
    pub pass: bool,
    pub issues: Vec<Value>,
    pub suggested_fixes: Vec<Value>,
}

impl VerifyReply {
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }
}

/// Concatenate files into the human-readable block fed to the verifier.
///
/// Never persisted; model input context only.
pub fn bundle(files: &[ReplyFile]) -> String {
    files
        .iter()
        .map(|file| format!("--- {} ---\n{}", file.path, file.content))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn none_input_is_empty_reply() {
        assert!(matches!(decode(None), Err(ReplyError::EmptyReply)));
    }

    #[test]
    fn empty_string_is_empty_reply() {
        assert!(matches!(decode(Some("")), Err(ReplyError::EmptyReply)));
    }

    #[test]
    fn invalid_json_carries_raw_text() {
        let err = decode(Some("Sure! Here is the code:")).unwrap_err();
        match err {
            ReplyError::InvalidJson { raw } => assert_eq!(raw, "Sure! Here is the code:"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn valid_json_decodes_without_schema_checks() {
        let value = decode(Some("{\"anything\": [1, 2]}")).expect("value");
        assert_eq!(value, json!({"anything": [1, 2]}));
    }

    #[test]
    fn lenient_variant_swallows_failures() {
        assert_eq!(decode_lenient(Some("not json")), None);
        assert_eq!(decode_lenient(None), None);
        assert_eq!(decode_lenient(Some("42")), Some(json!(42)));
    }

    #[test]
    fn author_reply_defaults_missing_fields() {
        let reply = AuthorReply::from_value(json!({"notes": "nothing to do"}));
        assert!(reply.files.is_empty());
        assert_eq!(reply.notes, "nothing to do");
    }

    #[test]
    fn author_reply_with_unusable_shape_has_no_files() {
        let reply = AuthorReply::from_value(json!(["not", "an", "object"]));
        assert!(reply.files.is_empty());
    }

    #[test]
    fn verify_reply_defaults_to_not_passing() {
        let reply = VerifyReply::from_value(json!({}));
        assert!(!reply.pass);
        assert!(reply.issues.is_empty());
    }

    #[test]
    fn bundle_delimits_each_file_with_a_header() {
        let files = vec![
            ReplyFile {
                path: "hello.py".to_string(),
                content: "print('hello')".to_string(),
            },
            ReplyFile {
                path: "lib/util.py".to_string(),
                content: "x = 1".to_string(),
            },
        ];
        assert_eq!(
            bundle(&files),
            "--- hello.py ---\nprint('hello')\n--- lib/util.py ---\nx = 1"
        );
    }

    #[test]
    fn bundle_of_nothing_is_empty() {
        assert_eq!(bundle(&[]), "");
    }
}
