// SPDX-License-Identifier: MIT OR Apache-2.0
//! Physics-assisted poser.
//!
//! The poser owns a [`PhysicsWorld`] holding one body per rig part and one
//! pin coupling per joint. Poses go in as temporary point constraints and
//! come out as samples of body transforms, so a pose applied to a rig with
//! different proportions settles into the nearest configuration the rig can
//! actually reach.

use crate::error::PoserError;
use crate::world::{BodyHandle, BodyPose, BodyShape, ConstraintHandle, PhysicsWorld};
use glam::DVec2;
use indexmap::IndexMap;
use puppets_rig::{names, Pose, Rig, Topology};
use serde::{Deserialize, Serialize};

/// Collision group shared by every part, so parts never collide
pub const PART_GROUP: i32 = -1;

/// Name given to sampled poses
const SAMPLED_POSE_NAME: &str = "Untitled";

/// Result type for poser operations
pub type Result<T> = std::result::Result<T, PoserError>;

/// Poser settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoserSettings {
    /// Simulation step in milliseconds
    pub step_ms: u32,
    /// Steps taken by [`Poser::set_pose`] before releasing its constraints
    pub settle_steps: u32,
    /// Density of the torso body
    pub torso_density: f64,
    /// Density of every other body
    pub limb_density: f64,
}

impl Default for PoserSettings {
    fn default() -> Self {
        Self {
            step_ms: 20,
            settle_steps: 30,
            torso_density: 1000.0,
            limb_density: 1.0,
        }
    }
}

impl PoserSettings {
    /// Step length in seconds
    pub fn step_seconds(&self) -> f64 {
        f64::from(self.step_ms) / 1000.0
    }
}

/// Body created for a part
#[derive(Debug, Clone, Copy)]
struct PartBody {
    handle: BodyHandle,
    size: DVec2,
}

/// Where a joint or marker lives: a point fixed on one part's body
#[derive(Debug, Clone, Copy)]
struct KeyBinding {
    part: &'static str,
    body: BodyHandle,
    local: DVec2,
}

#[derive(Debug)]
struct DragState {
    handle: ConstraintHandle,
    frozen: Vec<ConstraintHandle>,
}

/// Keeps a simulated rig and named poses in sync
#[derive(Debug)]
pub struct Poser<W: PhysicsWorld> {
    world: W,
    settings: PoserSettings,
    topology: &'static Topology,
    bodies: IndexMap<&'static str, PartBody>,
    keys: IndexMap<&'static str, KeyBinding>,
    outstanding: Vec<ConstraintHandle>,
    drag: Option<DragState>,
    freeze_outer_joints: bool,
}

/// Part a joint key is sampled from and pulled by: the link further from
/// the torso
fn driven_part(links: &[&'static str]) -> Option<&'static str> {
    links
        .iter()
        .rev()
        .find(|name| **name != names::TORSO)
        .or(links.first())
        .copied()
}

impl<W: PhysicsWorld> Poser<W> {
    /// Bind every resolvable part and joint of `rig` into `world`
    pub fn bind(rig: &mut Rig, mut world: W, settings: PoserSettings) -> Self {
        let topology = rig.topology();
        let mut bodies = IndexMap::new();
        for name in topology.part_names() {
            let Some(rect) = rig.get_part(name).get().map(|part| part.bounds()) else {
                tracing::warn!("No body for part {}: part not found", name);
                continue;
            };
            let density = if *name == names::TORSO {
                settings.torso_density
            } else {
                settings.limb_density
            };
            let handle = world.add_body(BodyShape::Rect(rect), density, PART_GROUP);
            bodies.insert(
                *name,
                PartBody {
                    handle,
                    size: rect.size(),
                },
            );
        }

        let mut keys = IndexMap::new();
        let mut couplings = 0;
        for name in topology.joint_names().iter().chain(topology.marker_names()) {
            let Some(position) = rig.get_joint(name).get().map(|joint| joint.position()) else {
                continue;
            };
            let links = topology.links_for(name);

            if topology.is_joint(name) {
                match (bodies.get(links[0]), bodies.get(links[1])) {
                    (Some(a), Some(b)) => {
                        world.add_coupling(a.handle, b.handle, position);
                        couplings += 1;
                    }
                    _ => tracing::warn!("No coupling for joint {}: linked part missing", name),
                }
            }

            let owner = if topology.is_joint(name) {
                driven_part(links)
            } else {
                links.first().copied()
            };
            let Some((part, body)) = owner.and_then(|part| Some((part, bodies.get(part)?))) else {
                tracing::warn!("No body for {}: owning part missing", name);
                continue;
            };
            let Some(body_pose) = world.body_position(body.handle) else {
                continue;
            };
            keys.insert(
                *name,
                KeyBinding {
                    part,
                    body: body.handle,
                    local: body_pose.to_local(position),
                },
            );
        }

        tracing::info!(
            "Bound rig {}: {} bodies, {} couplings",
            rig.name(),
            bodies.len(),
            couplings
        );

        Self {
            world,
            settings,
            topology,
            bodies,
            keys,
            outstanding: Vec::new(),
            drag: None,
            freeze_outer_joints: false,
        }
    }

    /// The simulation
    pub fn world(&self) -> &W {
        &self.world
    }

    /// Mutable access to the simulation
    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    /// Poser settings
    pub fn settings(&self) -> &PoserSettings {
        &self.settings
    }

    /// Topology the poser was bound with
    pub fn topology(&self) -> &'static Topology {
        self.topology
    }

    /// Whether a part has a body
    pub fn has_body(&self, name: &str) -> bool {
        self.bodies.contains_key(name)
    }

    /// Names of parts with bodies, in paint order
    pub fn bound_parts(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.bodies.keys().copied()
    }

    /// Number of pose constraints waiting to be resolved
    pub fn outstanding_constraints(&self) -> usize {
        self.outstanding.len()
    }

    /// Current world position of a joint or marker
    pub fn world_point(&self, key: &str) -> Option<DVec2> {
        let binding = self.keys.get(key)?;
        Some(self.world.body_position(binding.body)?.to_world(binding.local))
    }

    /// Current transform of a part's body (center and rotation)
    pub fn part_transform(&self, name: &str) -> Option<BodyPose> {
        self.world.body_position(self.bodies.get(name)?.handle)
    }

    /// Size of a part's body
    pub fn part_size(&self, name: &str) -> Option<DVec2> {
        self.bodies.get(name).map(|body| body.size)
    }

    /// Apply a pose: constrain every key, settle, then release.
    ///
    /// Returns `false` if the rig has no anchor to pose against.
    pub fn set_pose(&mut self, pose: &Pose) -> bool {
        if !self.set_pose_target(pose) {
            return false;
        }
        for _ in 0..self.settings.settle_steps {
            self.tick();
        }
        self.resolve_constraints();
        true
    }

    /// Constrain every key toward `pose` and leave the constraints for
    /// later ticks
    pub fn set_pose_target(&mut self, pose: &Pose) -> bool {
        self.resolve_constraints();

        let Some(anchor) = self.world_point(names::ANCHOR_MARKER) else {
            tracing::warn!("Cannot apply pose {}: no anchor body", pose.name());
            return false;
        };

        for (key, point) in pose.points() {
            let Some(binding) = self.keys.get(key.as_str()).copied() else {
                tracing::warn!("Cannot pose {}: no body", key);
                continue;
            };
            let Some(grab) = self.world_point(key) else {
                continue;
            };
            let target = anchor + DVec2::new(point.x, -point.y);
            let handle = self.world.add_point_constraint(binding.body, grab, target);
            self.outstanding.push(handle);
        }
        true
    }

    /// Release every temporary constraint, including an active drag
    pub fn resolve_constraints(&mut self) {
        for handle in std::mem::take(&mut self.outstanding) {
            self.world.remove_constraint(handle);
        }
        self.end_drag();
    }

    /// Advance the simulation by one configured step
    pub fn tick(&mut self) {
        self.world.step(self.settings.step_seconds());
    }

    /// Sample the current pose
    pub fn get_pose(&self) -> Result<Pose> {
        self.get_pose_named(SAMPLED_POSE_NAME)
    }

    /// Sample the current pose under a given name.
    ///
    /// Points are relative to the anchor marker with y pointing up.
    pub fn get_pose_named(&self, name: &str) -> Result<Pose> {
        let anchor = self
            .world_point(names::ANCHOR_MARKER)
            .ok_or_else(|| PoserError::Unbound(names::ANCHOR_MARKER.to_string()))?;

        let mut points = IndexMap::with_capacity(self.topology.pose_keys().len());
        for key in self.topology.pose_keys() {
            let p = self
                .world_point(key)
                .ok_or_else(|| PoserError::Unbound(key.to_string()))?;
            points.insert(key.to_string(), DVec2::new(p.x - anchor.x, anchor.y - p.y));
        }
        Ok(Pose::new_for(self.topology, name, points)?)
    }

    /// Whether outer joints are pinned while dragging
    pub fn is_freeze_outer_joints(&self) -> bool {
        self.freeze_outer_joints
    }

    /// Pin every outer joint of the dragged part on later drags
    pub fn set_freeze_outer_joints(&mut self, freeze: bool) {
        self.freeze_outer_joints = freeze;
    }

    /// Whether a drag is active
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Start dragging a part, joint or marker by the world point `grab`
    pub fn begin_drag(&mut self, name: &str, grab: DVec2) -> bool {
        self.end_drag();

        let (part, body) = if let Some((part, body)) = self.bodies.get_key_value(name) {
            (*part, body.handle)
        } else if let Some(binding) = self.keys.get(name) {
            (binding.part, binding.body)
        } else {
            tracing::warn!("Cannot drag {}: no body", name);
            return false;
        };

        let handle = self.world.add_point_constraint(body, grab, grab);
        let mut frozen = Vec::new();
        if self.freeze_outer_joints {
            for joint in self.topology.outer_joints_for_part(part) {
                let binding = self.keys.get(joint).copied();
                let (Some(binding), Some(at)) = (binding, self.world_point(joint)) else {
                    continue;
                };
                frozen.push(self.world.add_point_constraint(binding.body, at, at));
            }
        }

        tracing::debug!("Dragging {} with {} frozen joints", name, frozen.len());
        self.drag = Some(DragState { handle, frozen });
        true
    }

    /// Move the active drag target
    pub fn drag_to(&mut self, point: DVec2) -> bool {
        match &self.drag {
            Some(drag) => self.world.set_constraint_target(drag.handle, point),
            None => false,
        }
    }

    /// Release the active drag and any frozen joints
    pub fn end_drag(&mut self) -> bool {
        let Some(drag) = self.drag.take() else {
            return false;
        };
        self.world.remove_constraint(drag.handle);
        for handle in drag.frozen {
            self.world.remove_constraint(handle);
        }
        true
    }

    /// Release the world
    pub fn into_world(self) -> W {
        self.world
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use puppets_rig::{Joint, MemoryRigSource, Part, RigSource};
    use std::collections::HashSet;

    /// World that records every call and never moves anything
    #[derive(Debug, Default)]
    pub(crate) struct RecordingWorld {
        pub bodies: Vec<(BodyShape, f64, i32)>,
        pub couplings: Vec<(BodyHandle, BodyHandle, DVec2)>,
        pub points: Vec<(BodyHandle, DVec2, DVec2)>,
        pub live: HashSet<usize>,
        pub removed: Vec<ConstraintHandle>,
        pub steps: Vec<f64>,
        next_constraint: usize,
    }

    impl RecordingWorld {
        fn issue(&mut self) -> ConstraintHandle {
            let handle = ConstraintHandle(self.next_constraint);
            self.next_constraint += 1;
            self.live.insert(handle.0);
            handle
        }
    }

    impl PhysicsWorld for RecordingWorld {
        fn add_body(&mut self, shape: BodyShape, density: f64, group: i32) -> BodyHandle {
            self.bodies.push((shape, density, group));
            BodyHandle(self.bodies.len() - 1)
        }

        fn add_coupling(
            &mut self,
            a: BodyHandle,
            b: BodyHandle,
            anchor: DVec2,
        ) -> ConstraintHandle {
            self.couplings.push((a, b, anchor));
            self.issue()
        }

        fn add_point_constraint(
            &mut self,
            body: BodyHandle,
            grab: DVec2,
            target: DVec2,
        ) -> ConstraintHandle {
            self.points.push((body, grab, target));
            self.issue()
        }

        fn set_constraint_target(&mut self, handle: ConstraintHandle, _target: DVec2) -> bool {
            self.live.contains(&handle.0)
        }

        fn remove_constraint(&mut self, handle: ConstraintHandle) -> bool {
            self.removed.push(handle);
            self.live.remove(&handle.0)
        }

        fn body_position(&self, body: BodyHandle) -> Option<BodyPose> {
            let (shape, _, _) = self.bodies.get(body.0)?;
            Some(BodyPose::new(shape.center(), 0.0))
        }

        fn step(&mut self, dt: f64) {
            self.steps.push(dt);
        }
    }

    /// Mannequin with one part withheld
    struct Without {
        inner: MemoryRigSource,
        hidden: &'static str,
    }

    impl RigSource for Without {
        fn name(&self) -> &str {
            self.inner.name()
        }

        fn create_part(&mut self, name: &str) -> Option<Part> {
            (name != self.hidden).then(|| self.inner.create_part(name)).flatten()
        }

        fn create_joint(&mut self, name: &str) -> Option<Joint> {
            self.inner.create_joint(name)
        }
    }

    fn bound() -> (Rig, Poser<RecordingWorld>) {
        let mut rig = Rig::new(MemoryRigSource::mannequin());
        let poser = Poser::bind(&mut rig, RecordingWorld::default(), PoserSettings::default());
        (rig, poser)
    }

    #[test]
    fn test_bind_creates_bodies_and_couplings() {
        let (rig, poser) = bound();
        let world = poser.world();
        assert_eq!(world.bodies.len(), rig.topology().part_names().len());
        assert_eq!(world.couplings.len(), rig.topology().joint_names().len());
        assert!(world.bodies.iter().all(|(_, _, group)| *group == PART_GROUP));

        let torso = poser.bound_parts().position(|p| p == names::TORSO).unwrap();
        for (index, (_, density, _)) in world.bodies.iter().enumerate() {
            let expected = if index == torso { 1000.0 } else { 1.0 };
            assert_eq!(*density, expected);
        }

        // Shoulder couples torso and upper arm at the joint position
        let shoulder = world
            .couplings
            .iter()
            .find(|(_, _, anchor)| *anchor == DVec2::new(55.0, 55.0))
            .unwrap();
        assert_eq!(shoulder.0.0, torso);
    }

    #[test]
    fn test_get_pose_of_unmoved_rig_is_rest_pose() {
        let (mut rig, poser) = bound();
        let rest = rig.rest_pose(1.0).unwrap();
        let sampled = poser.get_pose_named("Rest").unwrap();
        assert_eq!(sampled.name(), "Rest");
        assert!(sampled.approx_eq(&rest, 1e-9));
        assert_eq!(poser.get_pose().unwrap().name(), "Untitled");
    }

    #[test]
    fn test_set_pose_constrains_every_key_then_releases() {
        let (mut rig, mut poser) = bound();
        let rest = rig.rest_pose(1.0).unwrap();
        let raised = rest
            .with_point(names::R_HAND_END_MARKER, DVec2::new(-45.0, 150.0))
            .unwrap();
        assert!(poser.set_pose(&raised));

        let world = poser.world();
        assert_eq!(world.points.len(), rig.topology().pose_keys().len());
        assert_eq!(world.steps.len(), 30);
        assert!(world.steps.iter().all(|dt| (*dt - 0.02).abs() < 1e-12));
        // Only the permanent couplings remain
        assert_eq!(world.live.len(), world.couplings.len());
        assert_eq!(poser.outstanding_constraints(), 0);

        // Anchor (100, 100) + (-45, -150)
        let (_, grab, target) = world
            .points
            .iter()
            .find(|(_, grab, _)| *grab == DVec2::new(55.0, 200.0))
            .unwrap();
        assert_eq!(*grab, DVec2::new(55.0, 200.0));
        assert_eq!(*target, DVec2::new(55.0, -50.0));
    }

    #[test]
    fn test_pose_target_stays_until_resolved() {
        let (mut rig, mut poser) = bound();
        let rest = rig.rest_pose(1.0).unwrap();
        assert!(poser.set_pose_target(&rest));
        assert_eq!(poser.outstanding_constraints(), 18);
        poser.tick();
        assert_eq!(poser.world().steps.len(), 1);

        // A second target replaces the first set
        assert!(poser.set_pose_target(&rest));
        assert_eq!(poser.outstanding_constraints(), 18);
        assert_eq!(poser.world().removed.len(), 18);

        poser.resolve_constraints();
        assert_eq!(poser.outstanding_constraints(), 0);
        assert_eq!(poser.world().live.len(), poser.world().couplings.len());
    }

    #[test]
    fn test_drag_with_frozen_outer_joints() {
        let (_rig, mut poser) = bound();
        assert!(!poser.begin_drag("Tail", DVec2::ZERO));
        assert!(!poser.drag_to(DVec2::ZERO));
        assert!(!poser.end_drag());

        poser.set_freeze_outer_joints(true);
        assert!(poser.begin_drag(names::R_ARM_TOP, DVec2::new(55.0, 80.0)));
        // Drag point plus the elbow and wrist pins
        assert_eq!(poser.world().points.len(), 3);
        assert!(poser.drag_to(DVec2::new(20.0, 80.0)));
        assert!(poser.is_dragging());

        assert!(poser.end_drag());
        assert!(!poser.is_dragging());
        assert_eq!(poser.world().live.len(), poser.world().couplings.len());

        poser.set_freeze_outer_joints(false);
        assert!(poser.begin_drag(names::R_HAND_END_MARKER, DVec2::new(55.0, 200.0)));
        assert_eq!(poser.world().points.len(), 4);
        poser.resolve_constraints();
        assert!(!poser.is_dragging());
    }

    #[test]
    fn test_missing_part_is_skipped() {
        let mut rig = Rig::new(Without {
            inner: MemoryRigSource::mannequin(),
            hidden: names::HEAD,
        });
        let mut poser = Poser::bind(&mut rig, RecordingWorld::default(), PoserSettings::default());
        assert!(!poser.has_body(names::HEAD));
        assert_eq!(poser.world().couplings.len(), rig.topology().joint_names().len() - 1);

        // Head keys are skipped, everything else is still posed
        let mut full = Rig::new(MemoryRigSource::mannequin());
        let rest = full.rest_pose(1.0).unwrap();
        assert!(poser.set_pose(&rest));
        assert_eq!(poser.world().points.len(), 16);
        assert!(!poser.begin_drag(names::HEAD, DVec2::ZERO));
        assert!(matches!(poser.get_pose(), Err(PoserError::Unbound(_))));
    }
}
