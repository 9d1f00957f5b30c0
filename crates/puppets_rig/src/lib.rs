// SPDX-License-Identifier: MIT OR Apache-2.0
//! Rig model for 2-D cut-out puppets.
//!
//! This crate provides everything needed to describe and pose a puppet:
//! - The fixed bipedal topology (parts, joints, markers, chains)
//! - Parts and joints, including parts derived by splitting a composite limb
//! - The rig aggregate with lazy part/joint resolution and load notification
//! - Poses with chain-aware blending and proportional retargeting
//! - Readers for layered (ORA) archives and rig documents
//!
//! ## Architecture
//!
//! A [`Rig`] pulls parts and joints by name from a [`RigSource`]. Sources
//! that only ship a single image for a limb get the upper/lower halves
//! synthesized by [`derive::split_part`]. Poses are plain values keyed by the
//! topology's pose keys and are captured/applied by the poser crate.

pub mod derive;
pub mod document;
pub mod error;
pub mod geometry;
pub mod ora;
pub mod part;
pub mod pose;
pub mod rig;
pub mod topology;

pub use derive::{split_part, split_rect};
pub use document::{
    DeferredImages, DirectoryImages, DocumentFormat, DocumentRigSource, ImageStore,
    JointRecord, PartRecord, RigDocument,
};
pub use error::{DocumentError, OraError, PoseError, RigError};
pub use geometry::Rect;
pub use ora::{Layer, LayerGroup, LayerNode, OraArchive, OraRigSource};
pub use part::{Joint, Part};
pub use pose::Pose;
pub use rig::{Lookup, MemoryRigSource, Rig, RigSource};
pub use topology::{names, Half, NodeKind, Side, SplitSource, Topology};

/// Re-exported point type used for all rig and pose coordinates
pub use glam::DVec2;
