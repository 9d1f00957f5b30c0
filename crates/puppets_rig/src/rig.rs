// SPDX-License-Identifier: MIT OR Apache-2.0
//! The rig aggregate: parts and joints resolved lazily by name.
//!
//! Lookups go cache → source factory → derivation (split limbs only), and
//! report which path produced the value through [`Lookup`]. Found and derived
//! values are memoised for the rig's lifetime; missing ones are not, so a
//! later call can succeed once the source has more to offer.

use crate::derive::split_part;
use crate::document::{JointRecord, PartRecord, RigDocument};
use crate::error::{DocumentError, RigError};
use crate::geometry::Rect;
use crate::part::{Joint, Part};
use crate::pose::Pose;
use crate::topology::{names, Topology};
use glam::DVec2;
use image::RgbaImage;
use indexmap::{IndexMap, IndexSet};
use std::path::Path;
use std::sync::Arc;

/// Result type for rig operations
pub type Result<T> = std::result::Result<T, RigError>;

/// Outcome of a part or joint lookup
#[derive(Debug)]
pub enum Lookup<'a, T> {
    /// Provided by the cache or the rig source
    Found(&'a T),
    /// Synthesized by splitting a composite limb
    Derived(&'a T),
    /// Neither the source nor derivation could produce it
    Missing,
}

impl<'a, T> Lookup<'a, T> {
    /// The value, whichever way it was produced
    pub fn get(self) -> Option<&'a T> {
        match self {
            Self::Found(value) | Self::Derived(value) => Some(value),
            Self::Missing => None,
        }
    }

    /// Whether the lookup failed
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Whether the value was synthesized
    pub fn is_derived(&self) -> bool {
        matches!(self, Self::Derived(_))
    }
}

/// Factory that creates parts and joints for a rig on demand
pub trait RigSource {
    /// Rig name
    fn name(&self) -> &str;

    /// Where the rig came from, if anywhere
    fn path(&self) -> Option<&str> {
        None
    }

    /// Create the named part, or `None` if the source has no such asset
    fn create_part(&mut self, name: &str) -> Option<Part>;

    /// Create the named joint or marker
    fn create_joint(&mut self, name: &str) -> Option<Joint>;

    /// Names of parts whose images are still on their way
    fn pending_images(&self) -> Vec<String> {
        Vec::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Found,
    Derived,
}

/// Callback fired once when every pending image has arrived
pub type LoadListener = Box<dyn FnOnce()>;

/// A rig: topology plus lazily resolved parts and joints
pub struct Rig {
    source: Box<dyn RigSource>,
    topology: &'static Topology,
    parts: IndexMap<String, (Part, Origin)>,
    joints: IndexMap<String, Joint>,
    bounds: Option<Rect>,
    pending: IndexSet<String>,
    listeners: Vec<LoadListener>,
}

impl std::fmt::Debug for Rig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rig")
            .field("name", &self.source.name())
            .field("parts", &self.parts.len())
            .field("joints", &self.joints.len())
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl Rig {
    /// Create a human rig backed by `source`
    pub fn new(source: impl RigSource + 'static) -> Self {
        let pending = source.pending_images().into_iter().collect();
        Self {
            source: Box::new(source),
            topology: Topology::human(),
            parts: IndexMap::new(),
            joints: IndexMap::new(),
            bounds: None,
            pending,
            listeners: Vec::new(),
        }
    }

    /// Rig name
    pub fn name(&self) -> &str {
        self.source.name()
    }

    /// Rig topology
    pub fn topology(&self) -> &'static Topology {
        self.topology
    }

    /// Resolve a part by name
    pub fn get_part(&mut self, name: &str) -> Lookup<'_, Part> {
        if !self.parts.contains_key(name) {
            if let Some(part) = self.source.create_part(name) {
                self.parts.insert(name.to_string(), (part, Origin::Found));
            } else if let Some(part) = self.derive_part(name) {
                tracing::debug!("Derived part {} from {:?}", name, part.mother());
                self.parts.insert(name.to_string(), (part, Origin::Derived));
            } else {
                tracing::warn!("Part not found: {}", name);
                return Lookup::Missing;
            }
        }

        match self.parts.get(name) {
            Some((part, Origin::Found)) => Lookup::Found(part),
            Some((part, Origin::Derived)) => Lookup::Derived(part),
            None => Lookup::Missing,
        }
    }

    /// Resolve a joint or marker by name
    pub fn get_joint(&mut self, name: &str) -> Lookup<'_, Joint> {
        if !self.joints.contains_key(name) {
            match self.source.create_joint(name) {
                Some(joint) => {
                    self.joints.insert(name.to_string(), joint);
                }
                None => {
                    tracing::warn!("Joint not found: {}", name);
                    return Lookup::Missing;
                }
            }
        }

        self.joints.get(name).map_or(Lookup::Missing, Lookup::Found)
    }

    /// Already resolved part
    pub fn part(&self, name: &str) -> Option<&Part> {
        self.parts.get(name).map(|(part, _)| part)
    }

    /// Already resolved joint or marker
    pub fn joint(&self, name: &str) -> Option<&Joint> {
        self.joints.get(name)
    }

    /// Insert or replace a part
    pub fn set_part(&mut self, part: Part) {
        self.bounds = None;
        self.parts.insert(part.name().to_string(), (part, Origin::Found));
    }

    /// Resolve every part, joint and marker the topology names
    pub fn resolve_all(&mut self) {
        let topo = self.topology;
        for name in topo.part_names() {
            self.get_part(name);
        }
        for name in topo.joint_names().iter().chain(topo.marker_names()) {
            self.get_joint(name);
        }
    }

    /// Parts in paint order, skipping any that cannot be resolved
    pub fn parts_in_paint_order(&mut self) -> Vec<&Part> {
        let topo = self.topology;
        let names = topo.part_names();
        for name in names {
            self.get_part(name);
        }
        let this: &Rig = self;
        names.iter().filter_map(|name| this.part(name)).collect()
    }

    /// Joints then markers, skipping any that cannot be resolved
    pub fn joints_in_paint_order(&mut self) -> Vec<&Joint> {
        let topo = self.topology;
        let names: Vec<&str> = topo
            .joint_names()
            .iter()
            .chain(topo.marker_names())
            .copied()
            .collect();
        for name in &names {
            self.get_joint(name);
        }
        let this: &Rig = self;
        names.iter().filter_map(|name| this.joint(name)).collect()
    }

    /// Union of every part rect, or `None` while a part is unresolved
    pub fn bounds(&mut self) -> Option<Rect> {
        if let Some(bounds) = self.bounds {
            return Some(bounds);
        }

        let topo = self.topology;
        let mut bounds: Option<Rect> = None;
        for name in topo.part_names() {
            let rect = self.get_part(name).get()?.bounds();
            bounds = Some(bounds.map_or(rect, |b| b.union(&rect)));
        }
        self.bounds = bounds;
        bounds
    }

    /// The rig's own layout as a pose, anchor-relative with y up, scaled
    pub fn rest_pose(&mut self, scale: f64) -> Result<Pose> {
        let topo = self.topology;
        let anchor = self.joint_position(names::ANCHOR_MARKER)?;
        let mut points = IndexMap::new();
        for key in topo.pose_keys() {
            let p = self.joint_position(key)?;
            points.insert(key.to_string(), DVec2::new(p.x - anchor.x, anchor.y - p.y) * scale);
        }
        Ok(Pose::new(self.name(), points)?)
    }

    /// Rest length of the bone from `key` to its chain successor
    pub fn joint_distance(&mut self, key: &str, scale: f64) -> Option<f64> {
        let next = self.topology.next_key(key)?;
        let a = self.get_joint(key).get()?.position();
        let b = self.get_joint(next).get()?.position();
        Some(a.distance(b) * scale)
    }

    /// Whether every pending image has arrived
    pub fn is_loaded(&self) -> bool {
        self.pending.is_empty()
    }

    /// Run `listener` once the rig is loaded (immediately if it already is)
    pub fn add_load_listener(&mut self, listener: impl FnOnce() + 'static) {
        if self.is_loaded() {
            listener();
        } else {
            self.listeners.push(Box::new(listener));
        }
    }

    /// Deliver the image for a part.
    ///
    /// Parts previously cut from this one are re-cropped. When the last
    /// pending image arrives the load listeners fire.
    pub fn attach_image(&mut self, name: &str, image: Arc<RgbaImage>) -> bool {
        if self.get_part(name).is_missing() {
            return false;
        }
        if let Some((part, _)) = self.parts.get_mut(name) {
            part.set_image(image);
        }
        self.bounds = None;
        self.recrop_children(name);

        if self.pending.shift_remove(name) && self.pending.is_empty() {
            tracing::info!("Rig loaded: {}", self.name());
            for listener in std::mem::take(&mut self.listeners) {
                listener();
            }
        }
        true
    }

    /// Snapshot the resolved rig as a document
    pub fn to_document(&mut self) -> RigDocument {
        self.resolve_all();
        let topo = self.topology;

        let parts = topo
            .part_names()
            .iter()
            .filter_map(|name| self.part(name))
            .map(|part| PartRecord {
                name: part.name().to_string(),
                x: part.origin().x,
                y: part.origin().y,
                width: part.size().x,
                height: part.size().y,
                image_ref: format!("{}.png", part.name()),
            })
            .collect();

        let joints = topo
            .joint_names()
            .iter()
            .chain(topo.marker_names())
            .filter_map(|name| self.joint(name))
            .map(|joint| JointRecord {
                name: joint.name().to_string(),
                x: joint.position().x,
                y: joint.position().y,
            })
            .collect();

        RigDocument {
            name: self.name().to_string(),
            path: self.source.path().unwrap_or_default().to_string(),
            parts,
            joints,
        }
    }

    /// Save the rig document to `path` and write every part image next to
    /// it under its image reference, so [`DocumentRigSource::open`] reads the
    /// rig back with its images.
    ///
    /// Parts without an image are recorded with their rect only.
    ///
    /// [`DocumentRigSource::open`]: crate::document::DocumentRigSource::open
    pub fn save_document(
        &mut self,
        path: &Path,
    ) -> std::result::Result<RigDocument, DocumentError> {
        let doc = self.to_document();
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(&dir)?;
        }

        for record in &doc.parts {
            let Some(image) = self.part(&record.name).and_then(Part::image) else {
                tracing::warn!("Part {} has no image to write", record.name);
                continue;
            };
            let image_path = dir.join(&record.image_ref);
            image.save(&image_path).map_err(|source| DocumentError::Image {
                path: image_path.display().to_string(),
                source,
            })?;
        }

        doc.save(path)?;
        tracing::info!("Saved rig {} to {}", doc.name, path.display());
        Ok(doc)
    }

    fn joint_position(&mut self, name: &str) -> Result<DVec2> {
        self.get_joint(name)
            .get()
            .map(Joint::position)
            .ok_or_else(|| RigError::MissingJoint(name.to_string()))
    }

    fn derive_part(&mut self, name: &str) -> Option<Part> {
        let split = self.topology.split_source(name)?;
        let side = self.topology.side_of(name)?;

        let composite = self.get_part(split.composite).get()?.clone();
        if composite.is_derived() {
            return None;
        }
        let joint = self.get_joint(split.mid_joint).get()?.clone();
        Some(split_part(name, &composite, &joint, side, split.half))
    }

    fn recrop_children(&mut self, mother: &str) {
        let children: Vec<String> = self
            .parts
            .values()
            .filter(|(part, _)| part.mother() == Some(mother))
            .map(|(part, _)| part.name().to_string())
            .collect();

        for child in children {
            if let Some(part) = self.derive_part(&child) {
                self.parts.insert(child, (part, Origin::Derived));
            }
        }
    }
}

/// In-memory rig source, for programmatic rigs and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryRigSource {
    name: String,
    parts: IndexMap<String, Part>,
    joints: IndexMap<String, Joint>,
    pending: Vec<String>,
}

impl MemoryRigSource {
    /// Create an empty source
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a part
    pub fn with_part(mut self, part: Part) -> Self {
        self.parts.insert(part.name().to_string(), part);
        self
    }

    /// Add a joint or marker
    pub fn with_joint(mut self, joint: Joint) -> Self {
        self.joints.insert(joint.name().to_string(), joint);
        self
    }

    /// Declare that a part's image will be attached later
    pub fn with_pending(mut self, name: impl Into<String>) -> Self {
        self.pending.push(name.into());
        self
    }

    /// Standard human rig of plain rectangles, useful for demos and tests.
    ///
    /// The figure stands with arms and legs hanging straight down. Limbs are
    /// composite so the upper/lower halves are derived.
    pub fn mannequin() -> Self {
        let part = |name: &str, x: f64, y: f64, w: f64, h: f64| {
            let fill = image::Rgba([200, 180, 160, 255]);
            let image = RgbaImage::from_pixel(w as u32, h as u32, fill);
            Part::with_image(name, DVec2::new(x, y), Arc::new(image))
        };
        let hinge = |name: &str, x: f64, y: f64| Joint::new(name, DVec2::new(x, y));
        let marker = |name: &str, x: f64, y: f64| Joint::marker(name, DVec2::new(x, y));

        Self::new("Mannequin")
            .with_part(part(names::HEAD, 80.0, 0.0, 40.0, 50.0))
            .with_part(part(names::TORSO, 70.0, 50.0, 60.0, 100.0))
            .with_part(part(names::R_ARM, 40.0, 50.0, 30.0, 120.0))
            .with_part(part(names::R_HAND, 40.0, 170.0, 30.0, 30.0))
            .with_part(part(names::L_ARM, 130.0, 50.0, 30.0, 120.0))
            .with_part(part(names::L_HAND, 130.0, 170.0, 30.0, 30.0))
            .with_part(part(names::R_LEG, 70.0, 150.0, 30.0, 130.0))
            .with_part(part(names::R_FOOT, 60.0, 280.0, 40.0, 20.0))
            .with_part(part(names::L_LEG, 100.0, 150.0, 30.0, 130.0))
            .with_part(part(names::L_FOOT, 100.0, 280.0, 40.0, 20.0))
            .with_joint(hinge(names::HEAD_JOINT, 100.0, 50.0))
            .with_joint(hinge(names::R_ARM_JOINT, 55.0, 55.0))
            .with_joint(hinge(names::R_ARM_MID_JOINT, 55.0, 110.0))
            .with_joint(hinge(names::R_HAND_JOINT, 55.0, 170.0))
            .with_joint(hinge(names::L_ARM_JOINT, 145.0, 55.0))
            .with_joint(hinge(names::L_ARM_MID_JOINT, 145.0, 110.0))
            .with_joint(hinge(names::L_HAND_JOINT, 145.0, 170.0))
            .with_joint(hinge(names::R_LEG_JOINT, 85.0, 150.0))
            .with_joint(hinge(names::R_LEG_MID_JOINT, 85.0, 215.0))
            .with_joint(hinge(names::R_FOOT_JOINT, 85.0, 280.0))
            .with_joint(hinge(names::L_LEG_JOINT, 115.0, 150.0))
            .with_joint(hinge(names::L_LEG_MID_JOINT, 115.0, 215.0))
            .with_joint(hinge(names::L_FOOT_JOINT, 115.0, 280.0))
            .with_joint(marker(names::ANCHOR_MARKER, 100.0, 100.0))
            .with_joint(marker(names::HEAD_TOP_MARKER, 100.0, 0.0))
            .with_joint(marker(names::R_HAND_END_MARKER, 55.0, 200.0))
            .with_joint(marker(names::L_HAND_END_MARKER, 145.0, 200.0))
            .with_joint(marker(names::R_FOOT_END_MARKER, 65.0, 295.0))
            .with_joint(marker(names::L_FOOT_END_MARKER, 135.0, 295.0))
    }
}

impl RigSource for MemoryRigSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn create_part(&mut self, name: &str) -> Option<Part> {
        self.parts.get(name).cloned()
    }

    fn create_joint(&mut self, name: &str) -> Option<Joint> {
        self.joints.get(name).cloned()
    }

    fn pending_images(&self) -> Vec<String> {
        self.pending.clone()
    }
}
