//! JSON-Schema dialect checks shared by every adapter

use serde_json::{Map, Value};

use crate::types::{BackendKind, Tool};
use super::error::{SchemaResult, SchemaTranslationError};

const KNOWN_TYPES: &[&str] = &["string", "number", "integer", "boolean", "object", "array", "null"];

const KNOWN_DRAFTS: &[&str] = &["draft-04", "draft-06", "draft-07", "2019-09", "2020-12"];

/// Keywords whose value is a single subschema
const SINGLE_SCHEMA_KEYWORDS: &[&str] = &[
    "additionalProperties",
    "additionalItems",
    "not",
    "if",
    "then",
    "else",
    "contains",
    "propertyNames",
    "unevaluatedProperties",
    "unevaluatedItems",
];

/// Keywords whose value is an array of subschemas
const SCHEMA_ARRAY_KEYWORDS: &[&str] = &["anyOf", "oneOf", "allOf", "prefixItems"];

/// Keywords whose value maps names to subschemas
const SCHEMA_MAP_KEYWORDS: &[&str] = &[
    "properties",
    "patternProperties",
    "$defs",
    "definitions",
    "dependentSchemas",
];

/// Tool-name constraint of a backend
#[derive(Debug, Clone, Copy)]
pub enum NameRule {
    /// `[a-zA-Z0-9_-]`, up to `max_len` characters
    Plain { max_len: usize },
    /// Letter or underscore first, then `[a-zA-Z0-9_.:-]`, up to 64 characters
    Gemini,
    /// Any non-empty name
    Any,
}

/// What a backend accepts in a tool declaration
#[derive(Debug, Clone, Copy)]
pub struct SchemaRules {
    pub backend: BackendKind,
    /// Keywords the backend cannot express anywhere in the schema
    pub forbidden_keywords: &'static [&'static str],
    pub name_rule: NameRule,
}

/// Validate a tool's name and parameter schema against a backend's rules
pub fn validate_schema(tool: &Tool, rules: &SchemaRules) -> SchemaResult<()> {
    check_name(tool, rules)?;

    let root = match &tool.parameter_schema {
        Value::Object(root) => root,
        other => {
            return Err(SchemaTranslationError::NotAnObject {
                tool: tool.name.clone(),
                found: json_kind(other).to_string(),
            })
        }
    };

    if let Some(dialect) = root.get("$schema") {
        let dialect = dialect.as_str().unwrap_or_default();
        let known = dialect.contains("json-schema.org")
            && KNOWN_DRAFTS.iter().any(|draft| dialect.contains(draft));
        if !known {
            return Err(SchemaTranslationError::UnknownDialect {
                tool: tool.name.clone(),
                dialect: dialect.to_string(),
            });
        }
    }

    match root.get("type") {
        None => {}
        Some(Value::String(t)) if t == "object" => {}
        Some(other) => {
            return Err(SchemaTranslationError::NotAnObject {
                tool: tool.name.clone(),
                found: other.to_string(),
            })
        }
    }

    walk(&tool.name, root, "#", rules)
}

fn check_name(tool: &Tool, rules: &SchemaRules) -> SchemaResult<()> {
    let name = tool.name.as_str();
    let invalid = |reason: String| SchemaTranslationError::InvalidName {
        tool: name.to_string(),
        backend: rules.backend,
        reason,
    };

    if name.is_empty() {
        return Err(invalid("name is empty".to_string()));
    }

    match rules.name_rule {
        NameRule::Any => Ok(()),
        NameRule::Plain { max_len } => {
            if name.chars().count() > max_len {
                return Err(invalid(format!("longer than {} characters", max_len)));
            }
            match name.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-')) {
                Some(c) => Err(invalid(format!("character '{}' not allowed", c))),
                None => Ok(()),
            }
        }
        NameRule::Gemini => {
            if name.chars().count() > 64 {
                return Err(invalid("longer than 64 characters".to_string()));
            }
            let first = name.chars().next().unwrap_or('_');
            if !(first.is_ascii_alphabetic() || first == '_') {
                return Err(invalid("must start with a letter or underscore".to_string()));
            }
            match name
                .chars()
                .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '-')))
            {
                Some(c) => Err(invalid(format!("character '{}' not allowed", c))),
                None => Ok(()),
            }
        }
    }
}

fn walk(tool: &str, schema: &Map<String, Value>, path: &str, rules: &SchemaRules) -> SchemaResult<()> {
    for (keyword, value) in schema {
        if rules.forbidden_keywords.contains(&keyword.as_str()) {
            return Err(SchemaTranslationError::UnsupportedKeyword {
                tool: tool.to_string(),
                path: path.to_string(),
                keyword: keyword.clone(),
                backend: rules.backend,
            });
        }

        let child_path = format!("{}/{}", path, keyword);
        match keyword.as_str() {
            "type" => check_type(tool, value, &child_path)?,
            "items" => match value {
                Value::Array(items) => walk_array(tool, items, &child_path, rules)?,
                other => walk_value(tool, other, &child_path, rules)?,
            },
            k if SINGLE_SCHEMA_KEYWORDS.contains(&k) => walk_value(tool, value, &child_path, rules)?,
            k if SCHEMA_ARRAY_KEYWORDS.contains(&k) => {
                if let Value::Array(items) = value {
                    walk_array(tool, items, &child_path, rules)?;
                }
            }
            k if SCHEMA_MAP_KEYWORDS.contains(&k) => {
                if let Value::Object(entries) = value {
                    for (name, sub) in entries {
                        walk_value(tool, sub, &format!("{}/{}", child_path, name), rules)?;
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn walk_array(tool: &str, items: &[Value], path: &str, rules: &SchemaRules) -> SchemaResult<()> {
    for (i, item) in items.iter().enumerate() {
        walk_value(tool, item, &format!("{}/{}", path, i), rules)?;
    }
    Ok(())
}

fn walk_value(tool: &str, value: &Value, path: &str, rules: &SchemaRules) -> SchemaResult<()> {
    match value {
        Value::Object(schema) => walk(tool, schema, path, rules),
        // `true` / `false` are valid schemas
        Value::Bool(_) => Ok(()),
        other => Err(SchemaTranslationError::UnknownType {
            tool: tool.to_string(),
            path: path.to_string(),
            type_name: format!("<{} where a schema was expected>", json_kind(other)),
        }),
    }
}

fn check_type(tool: &str, value: &Value, path: &str) -> SchemaResult<()> {
    let unknown = |type_name: String| SchemaTranslationError::UnknownType {
        tool: tool.to_string(),
        path: path.to_string(),
        type_name,
    };

    match value {
        Value::String(t) if KNOWN_TYPES.contains(&t.as_str()) => Ok(()),
        Value::String(t) => Err(unknown(t.clone())),
        Value::Array(types) => {
            for t in types {
                match t.as_str() {
                    Some(name) if KNOWN_TYPES.contains(&name) => {}
                    _ => return Err(unknown(t.to_string())),
                }
            }
            Ok(())
        }
        other => Err(unknown(other.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
