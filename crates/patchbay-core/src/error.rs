//! Error types for unit construction and unit-level operations.

use thiserror::Error;

/// Errors raised while building, configuring, or closing a unit.
#[derive(Debug, Error)]
pub enum UnitError {
    /// No builder is registered under this type name
    #[error("unknown unit type: {0}")]
    UnknownType(String),

    /// The unit has no input port with this name
    #[error("unit '{unit}' has no input '{port}'")]
    UnknownInput {
        /// Id of the unit that was addressed.
        unit: String,
        /// Requested input name.
        port: String,
    },

    /// The unit has no output port with this name
    #[error("unit '{unit}' has no output '{port}'")]
    UnknownOutput {
        /// Id of the unit that was addressed.
        unit: String,
        /// Requested output name.
        port: String,
    },

    /// The unit has no property with this name
    #[error("unit '{unit}' has no property '{prop}'")]
    UnknownProp {
        /// Id of the unit that was addressed.
        unit: String,
        /// Requested property name.
        prop: String,
    },

    /// A property rejected the value it was given
    #[error("invalid value for property '{prop}': {reason}")]
    InvalidProp {
        /// Property name.
        prop: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Builder configuration could not be decoded
    #[error("invalid unit configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// I/O failure in a unit that owns an external resource
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
