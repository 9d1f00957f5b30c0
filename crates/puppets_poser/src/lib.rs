// SPDX-License-Identifier: MIT OR Apache-2.0
//! Physics-assisted posing for 2-D cut-out puppets.
//!
//! This crate provides:
//! - The [`PhysicsWorld`] contract the poser drives
//! - [`RelaxationWorld`], a small position-based backend for that contract
//! - The [`Poser`], which binds a rig into a world and keeps a named pose and
//!   the simulation in sync (including interactive dragging)
//! - [`ActionPlayer`] for live playback and [`FrameBaker`]/[`SpriteSheet`]
//!   for offline frame capture
//!
//! ## Architecture
//!
//! Every part becomes a rectangular body and every joint a pin coupling
//! between the two parts it links. Setting a pose attaches one temporary
//! point constraint per pose key, lets the world settle and releases the
//! constraints again; reading a pose samples the bodies.

pub mod bake;
pub mod error;
pub mod player;
pub mod poser;
pub mod relaxation;
pub mod world;

pub use bake::{BakedFrame, FrameBaker, PartPlacement, SpriteSheet, SpriteSheetSettings};
pub use error::PoserError;
pub use player::ActionPlayer;
pub use poser::{Poser, PoserSettings, PART_GROUP};
pub use relaxation::{RelaxationSettings, RelaxationWorld};
pub use world::{BodyHandle, BodyPose, BodyShape, ConstraintHandle, PhysicsWorld};
