//! Input sanitization applied at every externally-reachable boundary (spec §4.9):
//! path traversal, content size, string/query schema checks, and declared-schema
//! object validation.

use crate::error::ValidationError;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

/// Options controlling [`sanitize_path`].
#[derive(Debug, Clone)]
pub struct PathSanitizeOptions {
    pub base_dir: PathBuf,
    pub allow_absolute: bool,
    pub allowed_extensions: Option<Vec<String>>,
}

impl PathSanitizeOptions {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            allow_absolute: false,
            allowed_extensions: None,
        }
    }
}

/// Reject obviously dangerous raw path strings before any filesystem resolution is
/// attempted: traversal markers, shell metacharacters, and embedded null bytes.
fn reject_dangerous_tokens(raw: &str) -> Result<(), ValidationError> {
    if raw.contains('\0') {
        return Err(ValidationError::new("path contains a null byte"));
    }
    if raw.contains("..") {
        return Err(ValidationError::new("path contains a traversal marker"));
    }
    if raw.contains("$(") || raw.contains('`') {
        return Err(ValidationError::new(
            "path contains a shell substitution marker",
        ));
    }
    Ok(())
}

/// Resolve `user_path` against `options.base_dir`, rejecting traversal, disallowed
/// absolute paths, and (if configured) disallowed extensions, plus the explicit
/// dangerous-token checks from §4.9.
pub fn sanitize_path(user_path: &str, options: &PathSanitizeOptions) -> Result<PathBuf, ValidationError> {
    reject_dangerous_tokens(user_path)?;

    let candidate = Path::new(user_path);
    if candidate.is_absolute() && !options.allow_absolute {
        return Err(ValidationError::new(
            "absolute paths are not permitted at this boundary",
        ));
    }

    let base_resolved = options
        .base_dir
        .canonicalize()
        .unwrap_or_else(|_| options.base_dir.clone());
    let joined = base_resolved.join(candidate);

    // Manually resolve `.` / `..` components rather than relying on `canonicalize`,
    // which requires the path to exist on disk (new files routinely don't yet).
    let mut resolved = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::ParentDir => {
                if !resolved.pop() {
                    return Err(ValidationError::new("path escapes the base directory"));
                }
            }
            Component::CurDir => {}
            other => resolved.push(other),
        }
    }

    if !resolved.starts_with(&base_resolved) {
        return Err(ValidationError::new("path escapes the base directory"));
    }

    if let Some(allowed) = &options.allowed_extensions {
        let ext = resolved
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        if !allowed.iter().any(|a| a == ext) {
            return Err(ValidationError::new(format!(
                "extension '{ext}' is not permitted"
            )));
        }
    }

    Ok(resolved)
}

/// Options controlling [`sanitize_string`].
#[derive(Debug, Clone)]
pub struct StringSanitizeOptions {
    pub min_len: usize,
    pub max_len: usize,
    pub strip_html: bool,
    pub normalize_whitespace: bool,
}

impl Default for StringSanitizeOptions {
    fn default() -> Self {
        Self {
            min_len: 0,
            max_len: 10_000,
            strip_html: false,
            normalize_whitespace: true,
        }
    }
}

fn html_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").unwrap_or_else(|_| Regex::new("").unwrap()))
}

/// Enforce length bounds, strip control/null bytes, optionally strip HTML tags, and
/// normalize internal whitespace. Returns a `ValidationError` (never panics) on out-of-
/// bound length so callers can surface it as a disclosure or typed failure per §7.
pub fn sanitize_string(input: &str, options: &StringSanitizeOptions) -> Result<String, ValidationError> {
    let mut cleaned: String = input
        .chars()
        .filter(|c| *c != '\0' && (!c.is_control() || *c == '\n' || *c == '\t'))
        .collect();

    if options.strip_html {
        cleaned = html_tag_regex().replace_all(&cleaned, "").to_string();
    }

    if options.normalize_whitespace {
        cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    }

    let len = cleaned.chars().count();
    if len < options.min_len {
        return Err(ValidationError::new(format!(
            "string too short: {len} < {}",
            options.min_len
        )));
    }
    if len > options.max_len {
        return Err(ValidationError::new(format!(
            "string too long: {len} > {}",
            options.max_len
        )));
    }

    Ok(cleaned)
}

/// Reject regex patterns with catastrophic-backtracking shapes before they're compiled
/// and matched against untrusted input (nested quantifiers, repeated alternation groups).
pub fn validate_query_pattern(pattern: &str) -> Result<(), ValidationError> {
    static DANGEROUS: &[&str] = &["(.*)+", "(.+)+", "(a+)+", "([a-zA-Z]+)*"];
    if DANGEROUS.iter().any(|d| pattern.contains(d)) {
        return Err(ValidationError::new(
            "query pattern matches a known catastrophic-backtracking shape",
        ));
    }
    Regex::new(pattern).map_err(|e| ValidationError::new(format!("invalid regex: {e}")))?;
    Ok(())
}

/// Declared field kinds for [`sanitize_object`].
#[derive(Debug, Clone)]
pub enum FieldSchema {
    String(StringSanitizeOptions),
    Number { min: f64, max: f64 },
    Bool,
    StringArray { max_items: usize },
}

/// How additional (undeclared) properties are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdditionalProperties {
    Reject,
    Drop,
    Allow,
}

#[derive(Debug, Clone)]
pub struct ObjectSchema {
    pub fields: HashMap<String, FieldSchema>,
    pub required: Vec<String>,
    pub additional_properties: AdditionalProperties,
}

/// Validate and sanitize a loosely-typed JSON object against a declared schema. Used
/// by the pipeline to validate query-request payloads before they touch anything else.
pub fn sanitize_object(
    value: &serde_json::Value,
    schema: &ObjectSchema,
) -> Result<serde_json::Value, ValidationError> {
    let object = value
        .as_object()
        .ok_or_else(|| ValidationError::new("expected a JSON object"))?;

    for required in &schema.required {
        if !object.contains_key(required) {
            return Err(ValidationError::new(format!(
                "missing required field '{required}'"
            )));
        }
    }

    let mut output = serde_json::Map::new();
    for (key, field_value) in object {
        match schema.fields.get(key) {
            Some(FieldSchema::String(opts)) => {
                let s = field_value
                    .as_str()
                    .ok_or_else(|| ValidationError::new(format!("field '{key}' must be a string")))?;
                output.insert(key.clone(), sanitize_string(s, opts)?.into());
            }
            Some(FieldSchema::Number { min, max }) => {
                let n = field_value
                    .as_f64()
                    .ok_or_else(|| ValidationError::new(format!("field '{key}' must be a number")))?;
                if n < *min || n > *max {
                    return Err(ValidationError::new(format!(
                        "field '{key}' out of range [{min}, {max}]"
                    )));
                }
                output.insert(key.clone(), field_value.clone());
            }
            Some(FieldSchema::Bool) => {
                field_value
                    .as_bool()
                    .ok_or_else(|| ValidationError::new(format!("field '{key}' must be a bool")))?;
                output.insert(key.clone(), field_value.clone());
            }
            Some(FieldSchema::StringArray { max_items }) => {
                let arr = field_value
                    .as_array()
                    .ok_or_else(|| ValidationError::new(format!("field '{key}' must be an array")))?;
                if arr.len() > *max_items {
                    return Err(ValidationError::new(format!(
                        "field '{key}' exceeds max items {max_items}"
                    )));
                }
                output.insert(key.clone(), field_value.clone());
            }
            None => match schema.additional_properties {
                AdditionalProperties::Reject => {
                    return Err(ValidationError::new(format!(
                        "unexpected field '{key}'"
                    )));
                }
                AdditionalProperties::Drop => {}
                AdditionalProperties::Allow => {
                    output.insert(key.clone(), field_value.clone());
                }
            },
        }
    }

    Ok(serde_json::Value::Object(output))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(base: &std::path::Path) -> PathSanitizeOptions {
        PathSanitizeOptions::new(base.to_path_buf())
    }

    #[test]
    fn blocks_simple_traversal() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(sanitize_path("../etc/passwd", &opts(tmp.path())).is_err());
    }

    #[test]
    fn blocks_middle_traversal() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(sanitize_path("foo/../../etc/passwd", &opts(tmp.path())).is_err());
    }

    #[test]
    fn blocks_null_byte_and_shell_metacharacters() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(sanitize_path("foo\0bar", &opts(tmp.path())).is_err());
        assert!(sanitize_path("foo$(whoami)", &opts(tmp.path())).is_err());
        assert!(sanitize_path("foo`whoami`", &opts(tmp.path())).is_err());
    }

    #[test]
    fn allows_plain_relative_path() {
        let tmp = tempfile::tempdir().unwrap();
        let resolved = sanitize_path("src/main.rs", &opts(tmp.path())).unwrap();
        assert!(resolved.starts_with(tmp.path().canonicalize().unwrap()));
    }

    #[test]
    fn string_sanitizer_enforces_bounds() {
        let short = StringSanitizeOptions {
            min_len: 5,
            max_len: 10,
            ..Default::default()
        };
        assert!(sanitize_string("hi", &short).is_err());
        assert!(sanitize_string("hello there friend", &short).is_err());
        assert!(sanitize_string("hello!", &short).is_ok());
    }

    #[test]
    fn string_sanitizer_strips_html_and_normalizes_whitespace() {
        let opts = StringSanitizeOptions {
            strip_html: true,
            ..Default::default()
        };
        let out = sanitize_string("<b>hello</b>   world\n\t", &opts).unwrap();
        assert_eq!(out, "hello world");
    }

    #[test]
    fn rejects_catastrophic_backtracking_shapes() {
        assert!(validate_query_pattern("(a+)+$").is_err());
        assert!(validate_query_pattern("[a-z]+").is_ok());
    }

    #[test]
    fn object_sanitizer_rejects_missing_required_and_unexpected_fields() {
        let mut fields = HashMap::new();
        fields.insert("intent".to_string(), FieldSchema::String(StringSanitizeOptions::default()));
        let schema = ObjectSchema {
            fields,
            required: vec!["intent".to_string()],
            additional_properties: AdditionalProperties::Reject,
        };
        assert!(sanitize_object(&serde_json::json!({}), &schema).is_err());
        assert!(sanitize_object(&serde_json::json!({"intent": "x", "extra": 1}), &schema).is_err());
        assert!(sanitize_object(&serde_json::json!({"intent": "x"}), &schema).is_ok());
    }
}
