// SPDX-License-Identifier: MIT OR Apache-2.0
//! The rigid-body simulation contract used by the poser.
//!
//! The poser never talks to a solver directly; it only adds bodies,
//! couplings and point constraints through [`PhysicsWorld`] and samples
//! body transforms back. Any backend (the bundled [`RelaxationWorld`] or a
//! test double) can sit behind it.
//!
//! [`RelaxationWorld`]: crate::relaxation::RelaxationWorld

use glam::DVec2;
use puppets_rig::Rect;

/// Handle to a body in a world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub usize);

/// Handle to a coupling or point constraint in a world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstraintHandle(pub usize);

/// Initial shape and placement of a body
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BodyShape {
    /// Axis-aligned rectangle in world space; the body starts at its center
    /// with zero rotation
    Rect(Rect),
}

impl BodyShape {
    /// Center of the shape in world space
    pub fn center(&self) -> DVec2 {
        match self {
            BodyShape::Rect(rect) => rect.center(),
        }
    }

    /// Shape area
    pub fn area(&self) -> f64 {
        match self {
            BodyShape::Rect(rect) => rect.width * rect.height,
        }
    }

    /// Moment of inertia per unit mass about the center
    pub fn unit_inertia(&self) -> f64 {
        match self {
            BodyShape::Rect(rect) => (rect.width * rect.width + rect.height * rect.height) / 12.0,
        }
    }
}

/// Position and rotation of a body
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BodyPose {
    /// Body center in world space
    pub position: DVec2,
    /// Rotation in radians (positive turns +x toward +y)
    pub angle: f64,
}

impl BodyPose {
    /// Create a body pose
    pub fn new(position: DVec2, angle: f64) -> Self {
        Self { position, angle }
    }

    /// World point for a body-local offset
    pub fn to_world(&self, local: DVec2) -> DVec2 {
        self.position + DVec2::from_angle(self.angle).rotate(local)
    }

    /// Body-local offset for a world point
    pub fn to_local(&self, world: DVec2) -> DVec2 {
        DVec2::from_angle(-self.angle).rotate(world - self.position)
    }
}

/// Operations the poser needs from a rigid-body simulation.
///
/// Bodies in the same negative `group` never collide with each other.
/// Handles are only valid for the world that issued them; operations on a
/// stale handle return `false`/`None` rather than panicking.
pub trait PhysicsWorld {
    /// Add a free body with the given shape and density
    fn add_body(&mut self, shape: BodyShape, density: f64, group: i32) -> BodyHandle;

    /// Pin two bodies together at a world point
    fn add_coupling(&mut self, a: BodyHandle, b: BodyHandle, anchor: DVec2) -> ConstraintHandle;

    /// Pull the body point currently at `grab` toward `target`
    fn add_point_constraint(
        &mut self,
        body: BodyHandle,
        grab: DVec2,
        target: DVec2,
    ) -> ConstraintHandle;

    /// Move the target of a point constraint
    fn set_constraint_target(&mut self, handle: ConstraintHandle, target: DVec2) -> bool;

    /// Remove a coupling or point constraint
    fn remove_constraint(&mut self, handle: ConstraintHandle) -> bool;

    /// Current position and rotation of a body
    fn body_position(&self, body: BodyHandle) -> Option<BodyPose>;

    /// Advance the simulation by `dt` seconds
    fn step(&mut self, dt: f64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_body_pose_round_trip() {
        let pose = BodyPose::new(DVec2::new(10.0, 20.0), FRAC_PI_2);
        let world = pose.to_world(DVec2::new(5.0, 0.0));
        assert_abs_diff_eq!(world.x, 10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(world.y, 25.0, epsilon = 1e-12);

        let local = pose.to_local(world);
        assert_abs_diff_eq!(local.x, 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(local.y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rect_shape() {
        let shape = BodyShape::Rect(Rect::new(0.0, 0.0, 30.0, 40.0));
        assert_eq!(shape.center(), DVec2::new(15.0, 20.0));
        assert_eq!(shape.area(), 1200.0);
        assert_abs_diff_eq!(shape.unit_inertia(), 2500.0 / 12.0);
    }
}
