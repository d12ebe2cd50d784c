//! Config validation: identifiers, field lists, rule references.

use crate::config::EntityConfig;
use crate::error::ConfigError;
use std::collections::{HashMap, HashSet};

/// Columns every table has that entities may not declare as writable fields.
pub const RESERVED_COLUMNS: &[&str] = &["id", "created_at"];

/// True when `s` is a plain SQL identifier: ASCII letters, digits, underscore, no leading
/// digit, at most 63 bytes (PostgreSQL's NAMEDATALEN - 1).
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    s.len() <= 63
        && (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// True when `s` is a type name safe to splice into a `::` cast: identifier words joined by
/// single spaces or dots, then an optional `(n)` / `(p, s)` modifier and an optional `[]`.
pub fn is_column_type(s: &str) -> bool {
    let s = s.strip_suffix("[]").unwrap_or(s);
    let (name, modifier) = match s.split_once('(') {
        Some((name, rest)) => match rest.strip_suffix(')') {
            Some(args) => (name, Some(args)),
            None => return false,
        },
        None => (s, None),
    };
    let name_ok = !name.is_empty() && name.split([' ', '.']).all(is_identifier);
    let modifier_ok = modifier.map_or(true, |args| {
        let parts: Vec<&str> = args.split(',').map(str::trim).collect();
        parts.len() <= 2 && parts.iter().all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
    });
    name_ok && modifier_ok
}

fn check_identifier(kind: &'static str, name: &str) -> Result<(), ConfigError> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(ConfigError::InvalidIdentifier {
            kind,
            name: name.to_string(),
        })
    }
}

/// Table and field invariants the SQL builder relies on. `entity` names the owner in errors.
pub fn check_columns(entity: &str, table: &str, fields: &[String]) -> Result<(), ConfigError> {
    check_identifier("table", table)?;
    if fields.is_empty() {
        return Err(ConfigError::NoFields {
            entity: entity.to_string(),
        });
    }
    let mut seen = HashSet::new();
    for field in fields {
        check_identifier("field", field)?;
        if RESERVED_COLUMNS.contains(&field.as_str()) {
            return Err(ConfigError::ReservedField {
                entity: entity.to_string(),
                field: field.clone(),
            });
        }
        if !seen.insert(field.as_str()) {
            return Err(ConfigError::DuplicateField {
                entity: entity.to_string(),
                field: field.clone(),
            });
        }
    }
    Ok(())
}

/// Column types may only name declared fields and must be plain type names.
pub fn check_column_types(
    entity: &str,
    fields: &[String],
    column_types: &HashMap<String, String>,
) -> Result<(), ConfigError> {
    for (field, pg_type) in column_types {
        if !fields.contains(field) {
            return Err(ConfigError::UnknownTypedField {
                entity: entity.to_string(),
                field: field.clone(),
            });
        }
        if !is_column_type(pg_type) {
            return Err(ConfigError::InvalidColumnType {
                entity: entity.to_string(),
                field: field.clone(),
                pg_type: pg_type.clone(),
            });
        }
    }
    Ok(())
}

/// Check one entity in isolation. Rule patterns are compiled later, by `RuleSchema::new`.
pub fn validate_entity(entity: &EntityConfig) -> Result<(), ConfigError> {
    if entity.name.trim().is_empty() {
        return Err(ConfigError::Validation("entity name must not be empty".into()));
    }
    check_columns(&entity.name, &entity.table, &entity.fields)?;
    for field in entity.validation.keys() {
        if !entity.fields.contains(field) {
            return Err(ConfigError::UnknownRuleField {
                entity: entity.name.clone(),
                field: field.clone(),
            });
        }
    }
    check_column_types(&entity.name, &entity.fields, &entity.column_types)
}

pub fn validate(entities: &[EntityConfig]) -> Result<(), ConfigError> {
    let mut names = HashSet::new();
    for entity in entities {
        validate_entity(entity)?;
        if !names.insert(entity.name.as_str()) {
            return Err(ConfigError::DuplicateEntity(entity.name.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationRule;
    use std::collections::HashMap;

    fn notes() -> EntityConfig {
        EntityConfig {
            name: "notes".into(),
            table: "notes".into(),
            fields: vec!["title".into(), "content".into()],
            validation: HashMap::new(),
            column_types: HashMap::new(),
        }
    }

    #[test]
    fn accepts_sample_entity() {
        assert!(validate(&[notes()]).is_ok());
    }

    #[test]
    fn rejects_injection_in_table_name() {
        let mut e = notes();
        e.table = "notes; DROP TABLE users".into();
        assert!(matches!(
            validate(&[e]),
            Err(ConfigError::InvalidIdentifier { kind: "table", .. })
        ));
    }

    #[test]
    fn rejects_empty_and_duplicate_fields() {
        let mut e = notes();
        e.fields.clear();
        assert!(matches!(validate(&[e]), Err(ConfigError::NoFields { .. })));

        let mut e = notes();
        e.fields.push("title".into());
        assert!(matches!(validate(&[e]), Err(ConfigError::DuplicateField { .. })));
    }

    #[test]
    fn rejects_reserved_columns() {
        let mut e = notes();
        e.fields.push("id".into());
        assert!(matches!(validate(&[e]), Err(ConfigError::ReservedField { .. })));
    }

    #[test]
    fn rejects_rules_for_undeclared_fields() {
        let mut e = notes();
        e.validation.insert("author".into(), ValidationRule::default());
        assert!(matches!(validate(&[e]), Err(ConfigError::UnknownRuleField { .. })));
    }

    #[test]
    fn rejects_duplicate_entity_names() {
        assert!(matches!(
            validate(&[notes(), notes()]),
            Err(ConfigError::DuplicateEntity(name)) if name == "notes"
        ));
    }

    #[test]
    fn identifier_check() {
        assert!(is_identifier("codeSnippets"));
        assert!(is_identifier("_private"));
        assert!(!is_identifier("1notes"));
        assert!(!is_identifier("no\"tes"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn column_type_check() {
        for ok in ["uuid", "timestamptz", "numeric(10, 2)", "varchar(20)", "double precision", "text[]", "sample.order_status"] {
            assert!(is_column_type(ok), "{ok}");
        }
        for bad in ["", "int; DROP TABLE notes", "text) , (select 1", "numeric(a)", "numeric(1,2,3)", "uuid --"] {
            assert!(!is_column_type(bad), "{bad}");
        }
    }

    #[test]
    fn rejects_column_types_for_undeclared_fields_or_bad_names() {
        let mut e = notes();
        e.column_types.insert("author".into(), "uuid".into());
        assert!(matches!(validate(&[e]), Err(ConfigError::UnknownTypedField { .. })));

        let mut e = notes();
        e.column_types.insert("title".into(), "text); DROP TABLE notes; --".into());
        assert!(matches!(validate(&[e]), Err(ConfigError::InvalidColumnType { .. })));
    }
}
