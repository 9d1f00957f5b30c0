// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline sequencing for 2-D cut-out puppets.
//!
//! This crate provides:
//! - Moves and actions (timed sequences of named poses)
//! - Time to move/ratio mapping and blended pose sampling
//! - Action documents, including the legacy pose-only variant
//! - The action library file
//! - Playback control
//!
//! ## Architecture
//!
//! An [`Action`] owns its moves and the de-duplicated set of poses they
//! reference. A [`PlaybackController`] advances a clock over an action; the
//! host samples [`Action::pose_at_time`] and hands the pose to a poser.

pub mod action;
pub mod document;
pub mod error;
pub mod library;
pub mod playback;

pub use action::{Action, Move, MoveClip};
pub use document::{ActionDocument, MoveRecord, PoseRecord, LEGACY_MOVE_MS};
pub use error::LibraryError;
pub use library::ActionLibrary;
pub use playback::{PlaybackController, PlaybackState};
