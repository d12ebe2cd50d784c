//! Request validation from config rules.

use crate::config::{FieldType, ValidationRule};
use crate::error::{ConfigError, ValidationErrors};
use crate::service::Record;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

/// Key used for violations that concern the payload as a whole.
pub const ROOT_FIELD: &str = "_root";

/// Validate-or-reject oracle for one entity's writable shape.
///
/// Both methods return the accepted record restricted to the schema's declared fields;
/// unknown keys are dropped.
pub trait Schema: Send + Sync {
    /// Full write shape: every required field must be present.
    fn validate(&self, input: &Value) -> Result<Record, ValidationErrors>;

    /// Partial shape: only fields present in `input` are checked, none are required.
    fn validate_partial(&self, input: &Value) -> Result<Record, ValidationErrors>;
}

struct FieldRule {
    rule: ValidationRule,
    pattern: Option<Regex>,
}

/// `Schema` built from per-field `ValidationRule`s. Fields without a rule accept any value.
pub struct RuleSchema {
    fields: Vec<String>,
    rules: HashMap<String, FieldRule>,
}

impl RuleSchema {
    pub fn new(fields: Vec<String>, rules: HashMap<String, ValidationRule>) -> Result<Self, ConfigError> {
        let mut compiled = HashMap::with_capacity(rules.len());
        for (field, rule) in rules {
            let pattern = match rule.pattern.as_deref() {
                Some(p) => Some(
                    Regex::new(p).map_err(|e| ConfigError::Validation(format!("invalid pattern for {}: {}", field, e)))?,
                ),
                None => None,
            };
            compiled.insert(field, FieldRule { rule, pattern });
        }
        Ok(Self {
            fields,
            rules: compiled,
        })
    }

    fn check(&self, input: &Value, partial: bool) -> Result<Record, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let Value::Object(obj) = input else {
            errors.add(ROOT_FIELD, "expected an object");
            return Err(errors);
        };
        let mut out = Record::new();
        for field in &self.fields {
            let val = obj.get(field);
            let rule = self.rules.get(field);
            if partial && val.is_none() {
                continue;
            }
            match (val, rule) {
                (None | Some(Value::Null), Some(r)) if r.rule.required == Some(true) => {
                    errors.add(field, r.rule.message.clone().unwrap_or_else(|| "Required".into()));
                }
                (Some(v), Some(r)) => {
                    validate_field(field, v, r, &mut errors);
                }
                _ => {}
            }
            if let Some(v) = val {
                out.insert(field.clone(), v.clone());
            }
        }
        errors.into_result(out)
    }
}

impl Schema for RuleSchema {
    fn validate(&self, input: &Value) -> Result<Record, ValidationErrors> {
        self.check(input, false)
    }

    fn validate_partial(&self, input: &Value) -> Result<Record, ValidationErrors> {
        self.check(input, true)
    }
}

fn validate_field(col: &str, v: &Value, field_rule: &FieldRule, errors: &mut ValidationErrors) {
    if v.is_null() {
        return;
    }
    let rule = &field_rule.rule;
    if let Some(ty) = rule.type_ {
        let ok = match ty {
            FieldType::String => v.is_string(),
            FieldType::Number => v.is_number(),
            FieldType::Integer => v.is_i64(),
            FieldType::Boolean => v.is_boolean(),
        };
        if !ok {
            errors.add(col, format!("expected {}", type_name(ty)));
            return;
        }
    }
    if let Some(format) = &rule.format {
        validate_format(col, v, format, errors);
    }
    if let Some(s) = v.as_str() {
        let len = s.chars().count();
        if let Some(max) = rule.max_length {
            if len > max as usize {
                errors.add(col, format!("must be at most {} characters", max));
            }
        }
        if let Some(min) = rule.min_length {
            if len < min as usize {
                errors.add(col, format!("must be at least {} characters", min));
            }
        }
        if let Some(re) = &field_rule.pattern {
            if !re.is_match(s) {
                errors.add(col, "does not match required pattern");
            }
        }
    }
    if let Some(ref allowed) = rule.allowed {
        if !allowed.iter().any(|a| value_eq(v, a)) {
            errors.add(
                col,
                format!("must be one of: {:?}", allowed.iter().take(5).collect::<Vec<_>>()),
            );
        }
    }
    if let Some(n) = v.as_f64() {
        if let Some(min) = rule.minimum {
            if n < min {
                errors.add(col, format!("must be at least {}", min));
            }
        }
        if let Some(max) = rule.maximum {
            if n > max {
                errors.add(col, format!("must be at most {}", max));
            }
        }
    }
}

fn type_name(ty: FieldType) -> &'static str {
    match ty {
        FieldType::String => "string",
        FieldType::Number => "number",
        FieldType::Integer => "integer",
        FieldType::Boolean => "boolean",
    }
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(s), Value::String(t)) => s == t,
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

fn validate_format(col: &str, v: &Value, format: &str, errors: &mut ValidationErrors) {
    let Some(s) = v.as_str() else { return };
    match format.to_lowercase().as_str() {
        "email" => {
            if !s.contains('@') || s.len() < 3 {
                errors.add(col, "must be a valid email");
            }
        }
        "uuid" => {
            if uuid::Uuid::parse_str(s).is_err() {
                errors.add(col, "must be a valid UUID");
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn required_string() -> ValidationRule {
        ValidationRule {
            type_: Some(FieldType::String),
            required: Some(true),
            min_length: Some(1),
            ..Default::default()
        }
    }

    fn notes_schema() -> RuleSchema {
        let rules = HashMap::from([
            ("title".to_string(), required_string()),
            ("content".to_string(), required_string()),
        ]);
        RuleSchema::new(vec!["title".into(), "content".into()], rules).unwrap()
    }

    #[test]
    fn accepts_valid_payload_and_strips_unknown_keys() {
        let out = notes_schema()
            .validate(&json!({ "title": "A", "content": "B", "extra": 1 }))
            .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out["title"], json!("A"));
        assert!(!out.contains_key("extra"));
    }

    #[test]
    fn reports_every_missing_field() {
        let err = notes_schema().validate(&json!({ "title": "" })).unwrap_err();
        assert_eq!(err.get("content"), Some(&["Required".to_string()][..]));
        assert_eq!(
            err.get("title"),
            Some(&["must be at least 1 characters".to_string()][..])
        );
    }

    #[test]
    fn type_mismatch_short_circuits_other_checks() {
        let err = notes_schema()
            .validate(&json!({ "title": 5, "content": "B" }))
            .unwrap_err();
        assert_eq!(err.get("title"), Some(&["expected string".to_string()][..]));
    }

    #[test]
    fn integers_must_fit_a_bigint() {
        let rules = HashMap::from([(
            "count".to_string(),
            ValidationRule {
                type_: Some(FieldType::Integer),
                ..Default::default()
            },
        )]);
        let schema = RuleSchema::new(vec!["count".into()], rules).unwrap();
        assert!(schema.validate(&json!({ "count": i64::MAX })).is_ok());
        assert!(schema.validate(&json!({ "count": -3 })).is_ok());
        let err = schema.validate(&json!({ "count": u64::MAX })).unwrap_err();
        assert_eq!(err.get("count"), Some(&["expected integer".to_string()][..]));
    }

    #[test]
    fn non_object_is_rejected_at_root() {
        let err = notes_schema().validate(&json!(["title"])).unwrap_err();
        assert!(err.get(ROOT_FIELD).is_some());
    }

    #[test]
    fn partial_only_checks_present_fields() {
        let schema = notes_schema();
        let out = schema.validate_partial(&json!({ "title": "x" })).unwrap();
        assert_eq!(out.len(), 1);
        assert!(schema.validate_partial(&json!({})).unwrap().is_empty());
        assert!(schema.validate_partial(&json!({ "content": "" })).is_err());
        assert!(schema.validate_partial(&json!({ "content": null })).is_err());
    }

    #[test]
    fn custom_required_message() {
        let rules = HashMap::from([(
            "title".to_string(),
            ValidationRule {
                required: Some(true),
                message: Some("Title is required".into()),
                ..Default::default()
            },
        )]);
        let schema = RuleSchema::new(vec!["title".into()], rules).unwrap();
        let err = schema.validate(&json!({})).unwrap_err();
        assert_eq!(err.get("title"), Some(&["Title is required".to_string()][..]));
    }

    #[test]
    fn numeric_bounds_allowed_values_and_formats() {
        let rules = HashMap::from([
            (
                "rating".to_string(),
                ValidationRule {
                    type_: Some(FieldType::Integer),
                    minimum: Some(1.0),
                    maximum: Some(5.0),
                    ..Default::default()
                },
            ),
            (
                "status".to_string(),
                ValidationRule {
                    allowed: Some(vec![json!("draft"), json!("published")]),
                    ..Default::default()
                },
            ),
            (
                "email".to_string(),
                ValidationRule {
                    format: Some("email".into()),
                    ..Default::default()
                },
            ),
        ]);
        let schema = RuleSchema::new(vec!["rating".into(), "status".into(), "email".into()], rules).unwrap();
        assert!(schema
            .validate(&json!({ "rating": 3, "status": "draft", "email": "a@b.c" }))
            .is_ok());
        let err = schema
            .validate(&json!({ "rating": 9, "status": "gone", "email": "nope" }))
            .unwrap_err();
        assert_eq!(err.fields.len(), 3);
        assert!(schema.validate(&json!({ "rating": 2.5 })).is_err());
    }

    #[test]
    fn bad_pattern_is_a_config_error() {
        let rules = HashMap::from([(
            "title".to_string(),
            ValidationRule {
                pattern: Some("(".into()),
                ..Default::default()
            },
        )]);
        assert!(RuleSchema::new(vec!["title".into()], rules).is_err());
    }
}
