// SPDX-License-Identifier: MIT OR Apache-2.0
//! Position-based relaxation backend for the poser.
//!
//! A small stand-in [`PhysicsWorld`] so the poser runs without an external
//! engine. Hosts with a rigid-body engine implement the trait over it
//! instead.
//!
//! Each step:
//! - Predicts positions from the (damped) velocity of the previous step
//! - Runs Gauss-Seidel passes over pin couplings and point constraints,
//!   moving and rotating bodies in proportion to their inverse mass and
//!   inverse inertia
//! - Derives new velocities from the position change
//!
//! There is no gravity and no collision detection: puppet parts share one
//! non-colliding group and the torso's density anchors the rig.

use crate::world::{BodyHandle, BodyPose, BodyShape, ConstraintHandle, PhysicsWorld};
use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Constraints shorter than this are treated as satisfied
const SOLVE_EPSILON: f64 = 1e-12;

/// Solver settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaxationSettings {
    /// Gauss-Seidel passes per step
    pub iterations: u32,
    /// Compliance of point constraints (0 = rigid)
    pub point_compliance: f64,
    /// Fraction of velocity removed each step (1 = no momentum)
    pub damping: f64,
}

impl Default for RelaxationSettings {
    fn default() -> Self {
        Self {
            iterations: 20,
            point_compliance: 1e-9,
            damping: 1.0,
        }
    }
}

/// Simulation state of one body
#[derive(Debug, Clone)]
struct Body {
    position: DVec2,
    angle: f64,
    velocity: DVec2,
    angular_velocity: f64,
    inv_mass: f64,
    inv_inertia: f64,
    group: i32,
}

#[derive(Debug, Clone, Copy)]
enum Constraint {
    /// Two body points held together
    Coupling {
        a: usize,
        b: usize,
        local_a: DVec2,
        local_b: DVec2,
    },
    /// A body point pulled toward a world target
    Point { body: usize, local: DVec2, target: DVec2 },
}

/// Built-in position-based rigid-body world
#[derive(Debug, Clone, Default)]
pub struct RelaxationWorld {
    /// Solver settings
    pub settings: RelaxationSettings,
    bodies: Vec<Body>,
    constraints: Vec<Option<Constraint>>,
}

impl RelaxationWorld {
    /// Create an empty world
    pub fn new(settings: RelaxationSettings) -> Self {
        Self {
            settings,
            bodies: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// Number of bodies
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Number of live couplings and point constraints
    pub fn constraint_count(&self) -> usize {
        self.constraints.iter().flatten().count()
    }

    /// Collision group a body was added with
    pub fn body_group(&self, body: BodyHandle) -> Option<i32> {
        self.bodies.get(body.0).map(|b| b.group)
    }

    /// Remove every body and constraint
    pub fn clear(&mut self) {
        self.bodies.clear();
        self.constraints.clear();
    }

    fn pose_of(&self, index: usize) -> BodyPose {
        let body = &self.bodies[index];
        BodyPose::new(body.position, body.angle)
    }

    fn push_constraint(&mut self, constraint: Option<Constraint>) -> ConstraintHandle {
        self.constraints.push(constraint);
        ConstraintHandle(self.constraints.len() - 1)
    }

    /// Generalized inverse mass of a body for a correction along `n` at `r`
    fn effective_inv_mass(&self, index: usize, r: DVec2, n: DVec2) -> f64 {
        let body = &self.bodies[index];
        let rn = r.perp_dot(n);
        body.inv_mass + body.inv_inertia * rn * rn
    }

    fn apply_impulse(&mut self, index: usize, r: DVec2, impulse: DVec2) {
        let body = &mut self.bodies[index];
        body.position += impulse * body.inv_mass;
        body.angle += body.inv_inertia * r.perp_dot(impulse);
    }

    /// Move the body point at `pa` (on `a`) toward `pb` (on `b`, or fixed)
    fn solve_pair(
        &mut self,
        a: usize,
        pa: DVec2,
        b: Option<(usize, DVec2)>,
        target: DVec2,
        alpha: f64,
    ) {
        let delta = pa - target;
        let c = delta.length();
        if c < SOLVE_EPSILON {
            return;
        }
        let n = delta / c;

        let r_a = pa - self.bodies[a].position;
        let mut w = self.effective_inv_mass(a, r_a, n) + alpha;
        let r_b = b.map(|(index, pb)| (index, pb - self.bodies[index].position));
        if let Some((index, r)) = r_b {
            w += self.effective_inv_mass(index, r, n);
        }
        if w <= 0.0 {
            return;
        }

        let impulse = n * (-c / w);
        self.apply_impulse(a, r_a, impulse);
        if let Some((index, r)) = r_b {
            self.apply_impulse(index, r, -impulse);
        }
    }

    fn solve_constraints(&mut self, dt: f64) {
        let point_alpha = self.settings.point_compliance / (dt * dt);

        for slot in 0..self.constraints.len() {
            let constraint = self.constraints[slot];
            match constraint {
                Some(Constraint::Coupling { a, b, local_a, local_b }) => {
                    let pa = self.pose_of(a).to_world(local_a);
                    let pb = self.pose_of(b).to_world(local_b);
                    self.solve_pair(a, pa, Some((b, pb)), pb, 0.0);
                }
                Some(Constraint::Point { body, local, target }) => {
                    let p = self.pose_of(body).to_world(local);
                    self.solve_pair(body, p, None, target, point_alpha);
                }
                None => {}
            }
        }
    }
}

impl PhysicsWorld for RelaxationWorld {
    fn add_body(&mut self, shape: BodyShape, density: f64, group: i32) -> BodyHandle {
        let mass = (density * shape.area()).max(f64::EPSILON);
        let inertia = (mass * shape.unit_inertia()).max(f64::EPSILON);
        self.bodies.push(Body {
            position: shape.center(),
            angle: 0.0,
            velocity: DVec2::ZERO,
            angular_velocity: 0.0,
            inv_mass: 1.0 / mass,
            inv_inertia: 1.0 / inertia,
            group,
        });
        BodyHandle(self.bodies.len() - 1)
    }

    fn add_coupling(&mut self, a: BodyHandle, b: BodyHandle, anchor: DVec2) -> ConstraintHandle {
        if a.0 >= self.bodies.len() || b.0 >= self.bodies.len() || a == b {
            tracing::warn!("Coupling between invalid bodies {:?} and {:?}", a, b);
            return self.push_constraint(None);
        }
        let local_a = self.pose_of(a.0).to_local(anchor);
        let local_b = self.pose_of(b.0).to_local(anchor);
        self.push_constraint(Some(Constraint::Coupling {
            a: a.0,
            b: b.0,
            local_a,
            local_b,
        }))
    }

    fn add_point_constraint(
        &mut self,
        body: BodyHandle,
        grab: DVec2,
        target: DVec2,
    ) -> ConstraintHandle {
        if body.0 >= self.bodies.len() {
            tracing::warn!("Point constraint on invalid body {:?}", body);
            return self.push_constraint(None);
        }
        let local = self.pose_of(body.0).to_local(grab);
        self.push_constraint(Some(Constraint::Point {
            body: body.0,
            local,
            target,
        }))
    }

    fn set_constraint_target(&mut self, handle: ConstraintHandle, target: DVec2) -> bool {
        match self.constraints.get_mut(handle.0) {
            Some(Some(Constraint::Point { target: current, .. })) => {
                *current = target;
                true
            }
            _ => false,
        }
    }

    fn remove_constraint(&mut self, handle: ConstraintHandle) -> bool {
        self.constraints
            .get_mut(handle.0)
            .and_then(Option::take)
            .is_some()
    }

    fn body_position(&self, body: BodyHandle) -> Option<BodyPose> {
        (body.0 < self.bodies.len()).then(|| self.pose_of(body.0))
    }

    fn step(&mut self, dt: f64) {
        if dt <= 0.0 {
            return;
        }

        // Predict from damped velocities
        let keep = (1.0 - self.settings.damping).clamp(0.0, 1.0);
        let previous: Vec<(DVec2, f64)> =
            self.bodies.iter().map(|b| (b.position, b.angle)).collect();
        for body in &mut self.bodies {
            body.position += body.velocity * keep * dt;
            body.angle += body.angular_velocity * keep * dt;
        }

        // Relax constraints
        for _ in 0..self.settings.iterations {
            self.solve_constraints(dt);
        }

        // Derive velocities from the correction
        for (body, (position, angle)) in self.bodies.iter_mut().zip(previous) {
            body.velocity = (body.position - position) / dt;
            body.angular_velocity = (body.angle - angle) / dt;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use puppets_rig::Rect;

    const DT: f64 = 0.02;

    fn arm_on_torso() -> (RelaxationWorld, BodyHandle, BodyHandle) {
        let mut world = RelaxationWorld::default();
        let torso = world.add_body(BodyShape::Rect(Rect::new(0.0, 0.0, 60.0, 100.0)), 1000.0, -1);
        let arm = world.add_body(BodyShape::Rect(Rect::new(60.0, 0.0, 120.0, 30.0)), 1.0, -1);
        world.add_coupling(torso, arm, DVec2::new(60.0, 15.0));
        (world, torso, arm)
    }

    #[test]
    fn test_unconstrained_bodies_stay_put() {
        let (mut world, torso, arm) = arm_on_torso();
        for _ in 0..10 {
            world.step(DT);
        }
        assert_eq!(world.body_position(torso).unwrap().position, DVec2::new(30.0, 50.0));
        assert_eq!(world.body_position(arm).unwrap().position, DVec2::new(120.0, 15.0));
    }

    #[test]
    fn test_point_constraint_swings_arm_about_coupling() {
        let (mut world, torso, arm) = arm_on_torso();
        // Hand end from (180, 15) to straight down from the shoulder
        let target = DVec2::new(60.0, 135.0);
        let pull = world.add_point_constraint(arm, DVec2::new(180.0, 15.0), target);
        for _ in 0..60 {
            world.step(DT);
        }

        let arm_pose = world.body_position(arm).unwrap();
        let hand = arm_pose.to_world(DVec2::new(60.0, 0.0));
        assert!(hand.distance(target) < 0.5, "hand at {hand:?}");

        let shoulder_on_arm = arm_pose.to_world(DVec2::new(-60.0, 0.0));
        let torso_pose = world.body_position(torso).unwrap();
        let shoulder_on_torso = torso_pose.to_world(DVec2::new(30.0, -35.0));
        assert!(shoulder_on_arm.distance(shoulder_on_torso) < 0.01);
        assert!(torso_pose.position.distance(DVec2::new(30.0, 50.0)) < 0.5);

        assert!(world.remove_constraint(pull));
        assert!(!world.remove_constraint(pull));
        assert!(!world.set_constraint_target(pull, DVec2::ZERO));
    }

    #[test]
    fn test_invalid_handles() {
        let mut world = RelaxationWorld::default();
        let body = world.add_body(BodyShape::Rect(Rect::new(0.0, 0.0, 10.0, 10.0)), 1.0, -1);
        let bad = world.add_coupling(body, BodyHandle(7), DVec2::ZERO);
        assert!(!world.remove_constraint(bad));
        assert!(world.body_position(BodyHandle(7)).is_none());
        assert_eq!(world.constraint_count(), 0);
        assert_eq!(world.body_count(), 1);
    }

    #[test]
    fn test_momentum_carries_without_damping() {
        let mut world = RelaxationWorld::new(RelaxationSettings {
            damping: 0.0,
            ..Default::default()
        });
        let body = world.add_body(BodyShape::Rect(Rect::new(0.0, 0.0, 10.0, 10.0)), 1.0, -1);
        let pull = world.add_point_constraint(body, DVec2::new(5.0, 5.0), DVec2::new(15.0, 5.0));
        world.step(DT);
        world.remove_constraint(pull);
        let after_pull = world.body_position(body).unwrap().position;
        world.step(DT);
        assert!(world.body_position(body).unwrap().position.x > after_pull.x);
    }
}
