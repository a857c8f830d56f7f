//! Error types for Ferrograph Core

use thiserror::Error;

use crate::storage::Index;

/// Result type alias using Ferrograph Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the storage engine
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors from store files
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record index 0 is the null sentinel and can never be addressed
    #[error("Invalid index {index}: index 0 is reserved")]
    InvalidIndex {
        /// Offending index
        index: Index,
    },

    /// Record bytes or a record chain are mangled
    #[error("Corrupted data: {0}")]
    Corruption(String),

    /// A type with this name is already declared
    #[error("Type already exists: {0}")]
    TypeAlreadyExists(String),

    /// No type with this name is declared
    #[error("Type does not exist: {0}")]
    TypeDoesNotExist(String),

    /// A type has no property with this name
    #[error("Type {type_name} has no property {property}")]
    PropertyDoesNotExist {
        /// Declared type name
        type_name: String,
        /// Missing property name
        property: String,
    },

    /// A type already declares a property with this name
    #[error("Type {type_name} already has a property {property}")]
    PropertyAlreadyExists {
        /// Declared type name
        type_name: String,
        /// Duplicate property name
        property: String,
    },

    /// A value's type tag disagrees with the declared or stored tag
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected type
        expected: String,
        /// Actual type
        actual: String,
    },

    /// Wrong number of property values for a declared type
    #[error("Type {type_name} declares {expected} properties, got {actual}")]
    SchemaArity {
        /// Declared type name
        type_name: String,
        /// Number of declared properties
        expected: usize,
        /// Number of values supplied
        actual: usize,
    },

    /// Deletion of a dynamic value chain started at a non-head block
    #[error("Cannot begin chain deletion at index {index}: block has a previous block")]
    ChainIndex {
        /// Index the deletion was attempted at
        index: Index,
    },

    /// Entity index does not hold a live record
    #[error("Not found: {0}")]
    NotFound(String),

    /// Other storage misuse
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a corruption error
    pub fn corruption(msg: impl Into<String>) -> Self {
        Self::Corruption(msg.into())
    }

    /// Create a not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a type mismatch error
    pub fn type_mismatch(expected: impl ToString, actual: impl ToString) -> Self {
        Self::TypeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}
