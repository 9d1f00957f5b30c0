// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for action documents and the action library.

use puppets_rig::{DocumentError, PoseError};
use thiserror::Error;

/// Errors raised while reading or writing actions
#[derive(Debug, Error)]
pub enum LibraryError {
    /// A pose in the document is invalid
    #[error("Invalid pose: {0}")]
    Pose(#[from] PoseError),

    /// A move names a pose the action does not define
    #[error("Action {action} has a move for unknown pose {pose}")]
    UnknownPose {
        /// Action name
        action: String,
        /// Pose name referenced by the move
        pose: String,
    },

    /// File or encoding error
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    /// No action with the given name
    #[error("Action not found: {0}")]
    UnknownAction(String),
}
