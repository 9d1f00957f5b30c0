// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for the poser crate.

use puppets_rig::PoseError;
use thiserror::Error;

/// Errors raised while sampling or baking poses
#[derive(Debug, Error)]
pub enum PoserError {
    /// A pose key has no body to sample
    #[error("No body bound for {0}")]
    Unbound(String),

    /// The sampled points do not form a valid pose
    #[error("Pose error: {0}")]
    Pose(#[from] PoseError),

    /// Nothing to bake
    #[error("No frames to bake")]
    NoFrames,
}
