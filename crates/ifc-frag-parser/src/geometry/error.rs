// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for geometry processing

use ifc_frag_model::{EntityId, ParseError};
use thiserror::Error;

/// Geometry processing result type
pub type Result<T> = std::result::Result<T, Error>;

/// Geometry processing errors
///
/// Everything except [`Error::Parse`] only affects the element being built.
#[derive(Error, Debug)]
pub enum Error {
    /// The underlying file could not be decoded
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Missing entity error
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    /// Invalid attribute error
    #[error("Invalid attribute at index {index}: {message}")]
    InvalidAttribute { index: usize, message: String },

    /// Profile processing error
    #[error("Profile error: {0}")]
    Profile(String),

    /// Triangulation error
    #[error("Triangulation error: {0}")]
    Triangulation(String),

    /// Placement chain error
    #[error("Placement error: {0}")]
    Placement(String),

    /// Unsupported geometry type
    #[error("Unsupported geometry type: {0}")]
    UnsupportedType(String),
}

impl Error {
    /// Create a profile error
    pub fn profile(msg: impl Into<String>) -> Self {
        Error::Profile(msg.into())
    }

    /// Create a triangulation error
    pub fn triangulation(msg: impl Into<String>) -> Self {
        Error::Triangulation(msg.into())
    }

    /// Create a placement error
    pub fn placement(msg: impl Into<String>) -> Self {
        Error::Placement(msg.into())
    }

    /// Create an invalid attribute error
    pub fn invalid_attribute(index: usize, msg: impl Into<String>) -> Self {
        Error::InvalidAttribute {
            index,
            message: msg.into(),
        }
    }

    /// Create an unsupported type error
    pub fn unsupported_type(type_name: impl Into<String>) -> Self {
        Error::UnsupportedType(type_name.into())
    }

    /// Whether the failure concerns the file rather than one element's geometry
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Parse(_))
    }

    /// Split into the file-level error, or the element-level one
    /// expressed against `entity`
    pub fn into_parse_error(self, entity: EntityId) -> ParseError {
        match self {
            Error::Parse(e) => e,
            other => ParseError::geometry(entity, other.to_string()),
        }
    }
}
