// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for fragment loading, export and disposal

use crate::GroupId;
use ifc_frag_model::ParseError;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for fragment operations
pub type Result<T> = std::result::Result<T, FragmentError>;

/// Errors that can occur while managing fragment groups
#[derive(Error, Debug)]
pub enum FragmentError {
    /// The buffer could not be parsed as a model
    #[error("Parse error: {0}")]
    Parse(ParseError),

    /// The buffer is well formed but uses a schema the parser cannot interpret
    #[error("Unsupported schema: {0}")]
    UnsupportedSchema(String),

    /// A group with this id is already registered
    #[error("Group {0} is already registered")]
    DuplicateId(GroupId),

    /// No group with this id is registered
    #[error("Group {0} not found")]
    NotFound(GroupId),

    /// Operation on a disposed or unregistered group
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The load finished after it was invalidated
    #[error("Load {ticket} was superseded and its result discarded")]
    StaleLoad { ticket: u64 },

    /// The parser did not finish in time
    #[error("Load timed out after {0:?}")]
    Timeout(Duration),

    /// The parse task panicked or was cancelled
    #[error("Load task aborted: {0}")]
    LoadAborted(String),

    /// The fragment stream is truncated, corrupt or of an unknown version
    #[error("Invalid fragment stream: {0}")]
    Codec(String),

    /// JSON property sidecar error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FragmentError {
    /// Create a new invalid state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        FragmentError::InvalidState(msg.into())
    }

    /// Create a new codec error
    pub fn codec(msg: impl Into<String>) -> Self {
        FragmentError::Codec(msg.into())
    }

    /// Whether the error is about the input model rather than API misuse
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            FragmentError::Parse(_)
                | FragmentError::UnsupportedSchema(_)
                | FragmentError::Timeout(_)
                | FragmentError::Codec(_)
        )
    }
}

impl From<ParseError> for FragmentError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::UnsupportedSchema(schema) => FragmentError::UnsupportedSchema(schema),
            other => FragmentError::Parse(other),
        }
    }
}
