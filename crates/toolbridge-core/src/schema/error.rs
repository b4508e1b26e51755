//! Schema translation errors

use thiserror::Error;

use crate::types::BackendKind;

/// A tool schema that cannot be represented for the target backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaTranslationError {
    /// `$schema` names a dialect we do not understand
    #[error("tool '{tool}': unknown schema dialect '{dialect}'")]
    UnknownDialect { tool: String, dialect: String },

    /// The parameter schema root is not an object schema
    #[error("tool '{tool}': parameter schema must describe an object, found {found}")]
    NotAnObject { tool: String, found: String },

    /// A `type` keyword with a value JSON Schema does not define
    #[error("tool '{tool}': unknown type '{type_name}' at {path}")]
    UnknownType {
        tool: String,
        path: String,
        type_name: String,
    },

    /// A keyword the backend cannot express
    #[error("tool '{tool}': keyword '{keyword}' at {path} is not supported by {backend}")]
    UnsupportedKeyword {
        tool: String,
        path: String,
        keyword: String,
        backend: BackendKind,
    },

    /// A tool name the backend would reject or rewrite
    #[error("tool '{tool}': name not accepted by {backend}: {reason}")]
    InvalidName {
        tool: String,
        backend: BackendKind,
        reason: String,
    },

    /// A declaration handed to the wrong adapter
    #[error("declaration for {found} passed to the {expected} adapter")]
    BackendMismatch {
        expected: BackendKind,
        found: BackendKind,
    },

    /// A declaration payload missing required fields
    #[error("malformed {backend} declaration: {message}")]
    MalformedDeclaration { backend: BackendKind, message: String },
}

pub type SchemaResult<T> = Result<T, SchemaTranslationError>;
