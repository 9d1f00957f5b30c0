// SPDX-License-Identifier: MIT OR Apache-2.0
//! Named poses and chain-aware pose blending.
//!
//! A pose maps every pose key of the topology to a point relative to the
//! anchor marker, with y pointing up. Poses are immutable values: every edit
//! returns a new pose.
//!
//! Blending walks each kinematic chain from its root. Roots are interpolated
//! as absolute points; every following key is rebuilt from the blended
//! previous key plus an interpolated (angle, length) bone vector, so bone
//! lengths stay rigid instead of shrinking along the chord.

use crate::error::PoseError;
use crate::topology::{names, Topology};
use glam::DVec2;
use indexmap::IndexMap;
use std::f64::consts::{PI, TAU};
use std::fmt::Write as _;

/// Bones shorter than this have no defined direction
const DEGENERATE_LENGTH: f64 = 1e-9;

/// A named snapshot of pose-key positions
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    name: String,
    points: IndexMap<String, DVec2>,
}

impl Pose {
    /// Create a pose for the human topology
    pub fn new(
        name: impl Into<String>,
        points: IndexMap<String, DVec2>,
    ) -> Result<Self, PoseError> {
        Self::new_for(Topology::human(), name, points)
    }

    /// Create a pose, checking the key set against `topology`.
    ///
    /// Points are stored in the topology's pose-key order.
    pub fn new_for(
        topology: &Topology,
        name: impl Into<String>,
        mut points: IndexMap<String, DVec2>,
    ) -> Result<Self, PoseError> {
        if let Some(unknown) = points.keys().find(|key| !topology.is_pose_key(key)) {
            return Err(PoseError::UnknownKey(unknown.clone()));
        }

        let mut ordered = IndexMap::with_capacity(topology.pose_keys().len());
        for key in topology.pose_keys() {
            let point = points
                .swap_remove(*key)
                .ok_or_else(|| PoseError::MissingKey(key.to_string()))?;
            ordered.insert(key.to_string(), point);
        }

        Ok(Self {
            name: name.into(),
            points: ordered,
        })
    }

    /// Create a pose from `(key, point)` pairs
    pub fn from_pairs<K: Into<String>>(
        name: impl Into<String>,
        pairs: impl IntoIterator<Item = (K, DVec2)>,
    ) -> Result<Self, PoseError> {
        Self::new(name, pairs.into_iter().map(|(k, p)| (k.into(), p)).collect())
    }

    /// Create a pose from `"x y"` point strings
    pub fn from_point_strings<'a>(
        name: impl Into<String>,
        strings: impl IntoIterator<Item = (&'a String, &'a String)>,
    ) -> Result<Self, PoseError> {
        let mut points = IndexMap::new();
        for (key, value) in strings {
            points.insert(key.clone(), parse_point(key, value)?);
        }
        Self::new(name, points)
    }

    /// Points formatted as `"x y"` strings
    pub fn to_point_strings(&self) -> IndexMap<String, String> {
        self.points
            .iter()
            .map(|(key, p)| (key.clone(), format_point(*p)))
            .collect()
    }

    /// Pose name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Same points under a new name
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points: self.points.clone(),
        }
    }

    /// Point for a pose key
    pub fn point(&self, key: &str) -> Option<DVec2> {
        self.points.get(key).copied()
    }

    /// All points in pose-key order
    pub fn points(&self) -> &IndexMap<String, DVec2> {
        &self.points
    }

    /// Pose keys in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.points.keys().map(String::as_str)
    }

    /// Copy of this pose with one point moved
    pub fn with_point(&self, key: &str, point: DVec2) -> Result<Self, PoseError> {
        if !self.points.contains_key(key) {
            return Err(PoseError::UnknownKey(key.to_string()));
        }
        let mut pose = self.clone();
        pose.points.insert(key.to_string(), point);
        Ok(pose)
    }

    /// Point for a key, with the anchor marker at the origin
    fn resolve(&self, key: &str) -> Option<DVec2> {
        if key == names::ANCHOR_MARKER {
            Some(DVec2::ZERO)
        } else {
            self.point(key)
        }
    }

    /// Distance between two keys
    pub fn distance(&self, from: &str, to: &str) -> Option<f64> {
        Some(self.resolve(from)?.distance(self.resolve(to)?))
    }

    /// Angle of the vector from one key to another, in radians
    pub fn angle(&self, from: &str, to: &str) -> Option<f64> {
        let v = self.resolve(to)? - self.resolve(from)?;
        Some(v.y.atan2(v.x))
    }

    /// Whether every point is within `eps` of the other pose's
    pub fn approx_eq(&self, other: &Pose, eps: f64) -> bool {
        self.points.len() == other.points.len()
            && self.points.iter().all(|(key, p)| {
                other
                    .point(key)
                    .is_some_and(|q| (p.x - q.x).abs() <= eps && (p.y - q.y).abs() <= eps)
            })
    }

    /// Blend two poses along each kinematic chain.
    ///
    /// `ratio <= 0` returns `a` and `ratio >= 1` returns `b` exactly. The
    /// result carries `a`'s name.
    ///
    /// A bone with zero length in one source takes its direction from the
    /// other; with zero length in both it keeps the previous bone's blended
    /// direction.
    pub fn blend(a: &Pose, b: &Pose, ratio: f64, topology: &Topology) -> Pose {
        if ratio <= 0.0 {
            return a.clone();
        }
        if ratio >= 1.0 {
            return b.clone();
        }

        let mut points: IndexMap<String, DVec2> = a
            .points
            .iter()
            .map(|(key, pa)| {
                let pb = b.point(key).unwrap_or(*pa);
                (key.clone(), pa.lerp(pb, ratio))
            })
            .collect();

        for chain in topology.chains() {
            let Some(root) = chain.first() else {
                continue;
            };
            let Some(mut prev) = points.get(*root).copied() else {
                continue;
            };
            let mut held_angle = 0.0;

            for pair in chain.windows(2) {
                let (from, to) = (pair[0], pair[1]);
                let (Some(va), Some(vb)) = (bone(a, from, to), bone(b, from, to)) else {
                    break;
                };

                let (len_a, len_b) = (va.length(), vb.length());
                let angle = match (direction(va), direction(vb)) {
                    (Some(x), Some(y)) => x + shortest_angle_delta(x, y) * ratio,
                    (Some(x), None) => x,
                    (None, Some(y)) => y,
                    (None, None) => held_angle,
                };
                let length = len_a + (len_b - len_a) * ratio;

                let point = prev + DVec2::from_angle(angle) * length;
                points.insert(to.to_string(), point);
                prev = point;
                held_angle = angle;
            }
        }

        Pose {
            name: a.name.clone(),
            points,
        }
    }

    /// Retarget a pose recorded on one rig onto a differently sized rig.
    ///
    /// `from_rest` and `to_rest` are the rest poses of the two rigs. Roots
    /// keep their direction from the anchor and have their distance scaled by
    /// the ratio of the rigs' anchor-to-root distances. Distal keys keep this
    /// pose's bone directions and take the target rig's bone lengths.
    pub fn retarget(&self, from_rest: &Pose, to_rest: &Pose, topology: &Topology) -> Pose {
        let mut points = self.points.clone();
        let anchor = names::ANCHOR_MARKER;

        for chain in topology.chains() {
            let Some(root) = chain.first().copied() else {
                continue;
            };
            let (Some(point), Some(from_d), Some(to_d)) = (
                self.point(root),
                from_rest.distance(anchor, root),
                to_rest.distance(anchor, root),
            ) else {
                continue;
            };
            let scale = if from_d > DEGENERATE_LENGTH { to_d / from_d } else { 1.0 };
            let mut prev = point * scale;
            points.insert(root.to_string(), prev);

            for pair in chain.windows(2) {
                let (from, to) = (pair[0], pair[1]);
                let (Some(source), Some(target)) = (bone(self, from, to), bone(to_rest, from, to))
                else {
                    break;
                };
                let angle = direction(source).or_else(|| direction(target)).unwrap_or(0.0);
                let point = prev + DVec2::from_angle(angle) * target.length();
                points.insert(to.to_string(), point);
                prev = point;
            }
        }

        Pose {
            name: self.name.clone(),
            points,
        }
    }

    /// Human-readable multi-line listing of the pose
    pub fn to_pretty_string(&self) -> String {
        let mut out = format!("Pose {} {{\n", self.name);
        for (key, p) in &self.points {
            let _ = writeln!(out, "    {}: [ {} ]", key, format_point(*p));
        }
        out.push('}');
        out
    }
}

fn bone(pose: &Pose, from: &str, to: &str) -> Option<DVec2> {
    Some(pose.point(to)? - pose.point(from)?)
}

fn direction(v: DVec2) -> Option<f64> {
    (v.length() > DEGENERATE_LENGTH).then(|| v.y.atan2(v.x))
}

/// Signed difference `to - from` wrapped into `(-PI, PI]`
pub fn shortest_angle_delta(from: f64, to: f64) -> f64 {
    let delta = (to - from).rem_euclid(TAU);
    if delta > PI {
        delta - TAU
    } else {
        delta
    }
}

/// Format a coordinate with at most two decimals and no trailing zeros
pub fn format_coord(value: f64) -> String {
    let text = format!("{:.2}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" || text.is_empty() {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// Format a point as `"x y"`
pub fn format_point(p: DVec2) -> String {
    format!("{} {}", format_coord(p.x), format_coord(p.y))
}

/// Parse an `"x y"` point string
pub fn parse_point(key: &str, value: &str) -> Result<DVec2, PoseError> {
    let invalid = || PoseError::InvalidPoint {
        key: key.to_string(),
        value: value.to_string(),
    };
    let mut parts = value.split_whitespace().map(str::parse::<f64>);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(Ok(x)), Some(Ok(y)), None) => Ok(DVec2::new(x, y)),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const EPS: f64 = 1e-9;

    /// Build a pose with every bone of every chain at `angle`, bones `len` long
    fn fan_pose(name: &str, angle: f64, len: f64) -> Pose {
        let topo = Topology::human();
        let mut points = IndexMap::new();
        for (i, chain) in topo.chains().into_iter().enumerate() {
            let mut p = DVec2::new(10.0 * i as f64, 20.0);
            for key in chain {
                points.insert(key.to_string(), p);
                p += DVec2::from_angle(angle) * len;
            }
        }
        Pose::new(name, points).unwrap()
    }

    #[test]
    fn test_new_validates_keys() {
        let pose = fan_pose("P", 0.0, 10.0);
        let mut points = pose.points().clone();
        points.swap_remove(names::R_HAND_JOINT);
        assert_eq!(
            Pose::new("P", points.clone()),
            Err(PoseError::MissingKey(names::R_HAND_JOINT.to_string()))
        );

        points.insert(names::R_HAND_JOINT.to_string(), DVec2::ZERO);
        points.insert("Tail".to_string(), DVec2::ZERO);
        assert_eq!(Pose::new("P", points), Err(PoseError::UnknownKey("Tail".to_string())));
    }

    #[test]
    fn test_points_are_in_canonical_order() {
        let pose = fan_pose("P", 0.0, 10.0);
        let reversed: IndexMap<_, _> =
            pose.points().iter().rev().map(|(k, p)| (k.clone(), *p)).collect();
        let rebuilt = Pose::new("P", reversed).unwrap();
        let keys: Vec<&str> = rebuilt.keys().collect();
        assert_eq!(keys, Topology::human().pose_keys());
    }

    #[test]
    fn test_blend_endpoints_are_exact() {
        let topo = Topology::human();
        let a = fan_pose("A", 0.3, 40.0);
        let b = fan_pose("B", -2.0, 25.0);
        assert_eq!(Pose::blend(&a, &b, 0.0, topo), a);
        assert_eq!(Pose::blend(&a, &b, -1.0, topo), a);
        assert_eq!(Pose::blend(&a, &b, 1.0, topo), b);
    }

    #[test]
    fn test_blend_identity() {
        let topo = Topology::human();
        let p = fan_pose("P", 1.1, 33.0);
        for r in [0.1, 0.25, 0.5, 0.9] {
            assert!(Pose::blend(&p, &p, r, topo).approx_eq(&p, 1e-9));
        }
    }

    #[test]
    fn test_blend_preserves_bone_lengths() {
        let topo = Topology::human();
        let a = fan_pose("A", 0.0, 40.0);
        let b = fan_pose("B", 2.5, 20.0);
        for r in [0.2, 0.5, 0.8] {
            let blended = Pose::blend(&a, &b, r, topo);
            for chain in topo.chains() {
                for pair in chain.windows(2) {
                    let len = blended.distance(pair[0], pair[1]).unwrap();
                    assert_abs_diff_eq!(len, 40.0 + (20.0 - 40.0) * r, epsilon = 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_quarter_turn_keeps_length() {
        let topo = Topology::human();
        let base = fan_pose("A", -PI / 2.0, 50.0);
        let joint = base.point(names::R_ARM_JOINT).unwrap();
        let p1 = base.with_point(names::R_ARM_MID_JOINT, joint + DVec2::new(50.0, 0.0)).unwrap();
        let p2 = base.with_point(names::R_ARM_MID_JOINT, joint + DVec2::new(0.0, 50.0)).unwrap();

        let mid = Pose::blend(&p1, &p2, 0.5, topo);
        let elbow = (names::R_ARM_JOINT, names::R_ARM_MID_JOINT);
        assert_abs_diff_eq!(mid.distance(elbow.0, elbow.1).unwrap(), 50.0, epsilon = EPS);
        assert_abs_diff_eq!(mid.angle(elbow.0, elbow.1).unwrap(), PI / 4.0, epsilon = EPS);
    }

    #[test]
    fn test_blend_wraps_shortest_path() {
        let topo = Topology::human();
        let a = fan_pose("A", 170f64.to_radians(), 30.0);
        let b = fan_pose("B", (-170f64).to_radians(), 30.0);
        let mid = Pose::blend(&a, &b, 0.5, topo);
        let angle = mid.angle(names::L_LEG_JOINT, names::L_LEG_MID_JOINT).unwrap();
        assert_abs_diff_eq!(angle.abs(), PI, epsilon = 1e-9);
    }

    #[test]
    fn test_degenerate_bones() {
        let topo = Topology::human();
        let a = fan_pose("A", 0.0, 30.0);
        let hand = a.point(names::R_HAND_JOINT).unwrap();
        // Zero-length hand bone in both poses
        let a = a.with_point(names::R_HAND_END_MARKER, hand).unwrap();
        let b = a.clone();
        let mid = Pose::blend(&a, &b, 0.5, topo);
        let bone = (names::R_HAND_JOINT, names::R_HAND_END_MARKER);
        assert_abs_diff_eq!(mid.distance(bone.0, bone.1).unwrap(), 0.0, epsilon = EPS);

        // Zero in one source: direction comes from the other
        let c = fan_pose("C", PI / 2.0, 30.0);
        let mid = Pose::blend(&a, &c, 0.5, topo);
        assert_abs_diff_eq!(mid.distance(bone.0, bone.1).unwrap(), 15.0, epsilon = EPS);
        assert_abs_diff_eq!(mid.angle(bone.0, bone.1).unwrap(), PI / 2.0, epsilon = EPS);
    }

    #[test]
    fn test_roots_are_lerped() {
        let topo = Topology::human();
        let a = fan_pose("A", 0.0, 30.0);
        let b = a.with_point(names::HEAD_JOINT, DVec2::new(100.0, 100.0)).unwrap();
        let mid = Pose::blend(&a, &b, 0.25, topo);
        let expected = a.point(names::HEAD_JOINT).unwrap().lerp(DVec2::new(100.0, 100.0), 0.25);
        assert_eq!(mid.point(names::HEAD_JOINT), Some(expected));
    }

    #[test]
    fn test_anchor_resolves_to_origin() {
        let pose = fan_pose("P", 0.0, 10.0);
        let p = pose.point(names::HEAD_JOINT).unwrap();
        let neck = pose.distance(names::ANCHOR_MARKER, names::HEAD_JOINT).unwrap();
        assert_abs_diff_eq!(neck, p.length(), epsilon = EPS);
        assert_eq!(pose.distance("Tail", names::HEAD_JOINT), None);
    }

    #[test]
    fn test_retarget_scales_roots_and_bones() {
        let topo = Topology::human();
        let small = fan_pose("Small", -PI / 2.0, 20.0);
        let doubled = small.points().iter().map(|(k, p)| (k.clone(), *p * 2.0)).collect();
        let big = Pose::new("Big", doubled).unwrap();
        let pose = fan_pose("Wave", 0.7, 20.0);

        let out = pose.retarget(&small, &big, topo);
        let root = names::R_ARM_JOINT;
        assert_abs_diff_eq!(
            out.point(root).unwrap().length(),
            pose.point(root).unwrap().length() * 2.0,
            epsilon = EPS
        );
        let upper_arm = out.distance(root, names::R_ARM_MID_JOINT).unwrap();
        assert_abs_diff_eq!(upper_arm, 40.0, epsilon = EPS);
        assert_abs_diff_eq!(out.angle(root, names::R_ARM_MID_JOINT).unwrap(), 0.7, epsilon = EPS);
    }

    #[test]
    fn test_point_strings() {
        assert_eq!(format_point(DVec2::new(12.0, -3.456)), "12 -3.46");
        assert_eq!(format_coord(-0.001), "0");
        assert_eq!(parse_point("K", " 1.5  -2 ").unwrap(), DVec2::new(1.5, -2.0));
        assert!(parse_point("K", "1.5").is_err());
        assert!(parse_point("K", "1 2 3").is_err());

        let pose = fan_pose("P", 0.5, 12.5);
        let strings = pose.to_point_strings();
        let back = Pose::from_point_strings("P", &strings).unwrap();
        assert!(back.approx_eq(&pose, 0.006));
    }

    #[test]
    fn test_pretty_string_lists_every_key() {
        let pose = fan_pose("Wave", 0.0, 10.0);
        let text = pose.to_pretty_string();
        assert!(text.starts_with("Pose Wave {"));
        assert_eq!(text.lines().count(), Topology::human().pose_keys().len() + 2);
    }
}
