// SPDX-License-Identifier: MIT OR Apache-2.0
//! Fixed bipedal rig topology.
//!
//! All per-name knowledge (kind, side, chain successor, linked parts, outer
//! joints, composite split source) lives in one static table. Every other
//! module asks [`Topology`] instead of matching on names itself.

use indexmap::IndexMap;
use std::sync::OnceLock;

/// Canonical part, joint and marker names
pub mod names {
    /// Torso part
    pub const TORSO: &str = "Torso";
    /// Head part
    pub const HEAD: &str = "Head";
    /// Right arm composite part
    pub const R_ARM: &str = "RArm";
    /// Right upper arm
    pub const R_ARM_TOP: &str = "RArmTop";
    /// Right lower arm
    pub const R_ARM_BTM: &str = "RArmBtm";
    /// Right hand
    pub const R_HAND: &str = "RHand";
    /// Right leg composite part
    pub const R_LEG: &str = "RLeg";
    /// Right upper leg
    pub const R_LEG_TOP: &str = "RLegTop";
    /// Right lower leg
    pub const R_LEG_BTM: &str = "RLegBtm";
    /// Right foot
    pub const R_FOOT: &str = "RFoot";
    /// Left arm composite part
    pub const L_ARM: &str = "LArm";
    /// Left upper arm
    pub const L_ARM_TOP: &str = "LArmTop";
    /// Left lower arm
    pub const L_ARM_BTM: &str = "LArmBtm";
    /// Left hand
    pub const L_HAND: &str = "LHand";
    /// Left leg composite part
    pub const L_LEG: &str = "LLeg";
    /// Left upper leg
    pub const L_LEG_TOP: &str = "LLegTop";
    /// Left lower leg
    pub const L_LEG_BTM: &str = "LLegBtm";
    /// Left foot
    pub const L_FOOT: &str = "LFoot";

    /// Neck joint
    pub const HEAD_JOINT: &str = "HeadJoint";
    /// Right shoulder
    pub const R_ARM_JOINT: &str = "RArmJoint";
    /// Right elbow
    pub const R_ARM_MID_JOINT: &str = "RArmMidJoint";
    /// Right wrist
    pub const R_HAND_JOINT: &str = "RHandJoint";
    /// Right hip
    pub const R_LEG_JOINT: &str = "RLegJoint";
    /// Right knee
    pub const R_LEG_MID_JOINT: &str = "RLegMidJoint";
    /// Right ankle
    pub const R_FOOT_JOINT: &str = "RFoot_Joint";
    /// Left shoulder
    pub const L_ARM_JOINT: &str = "LArmJoint";
    /// Left elbow
    pub const L_ARM_MID_JOINT: &str = "LArmMidJoint";
    /// Left wrist
    pub const L_HAND_JOINT: &str = "LHandJoint";
    /// Left hip
    pub const L_LEG_JOINT: &str = "LLegJoint";
    /// Left knee
    pub const L_LEG_MID_JOINT: &str = "LLegMidJoint";
    /// Left ankle
    pub const L_FOOT_JOINT: &str = "LFoot_Joint";

    /// Pose origin
    pub const ANCHOR_MARKER: &str = "AnchorMarker";
    /// Top of head
    pub const HEAD_TOP_MARKER: &str = "HeadTopMarker";
    /// Right fingertips
    pub const R_HAND_END_MARKER: &str = "RHandEndMarker";
    /// Right toes
    pub const R_FOOT_END_MARKER: &str = "RFootEndMarker";
    /// Left fingertips
    pub const L_HAND_END_MARKER: &str = "LHandEndMarker";
    /// Left toes
    pub const L_FOOT_END_MARKER: &str = "LFootEndMarker";
}

use names::*;

/// What a topology name refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A rendered, simulated part
    Part,
    /// A single-image limb that is split into top/bottom parts
    CompositePart,
    /// A physical hinge between two parts
    Joint,
    /// A landmark with no rigid-body role
    Marker,
}

/// Body side of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// On the body's center line
    Center,
    /// Right side of the character
    Right,
    /// Left side of the character
    Left,
}

/// Which half of a composite limb a split part is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Half {
    /// Half nearer the torso
    Top,
    /// Half nearer the extremity
    Bottom,
}

/// Where a split part comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitSource {
    /// Composite part holding both halves
    pub composite: &'static str,
    /// Joint the composite is split around
    pub mid_joint: &'static str,
    /// Which half this part is
    pub half: Half,
}

/// One row of the topology table
#[derive(Debug, Clone, Copy)]
pub struct NodeEntry {
    /// Node name
    pub name: &'static str,
    /// Layer holding the node in a layered (ORA) archive
    pub layer: &'static str,
    /// Node kind
    pub kind: NodeKind,
    /// Body side
    pub side: Side,
    /// Next joint or marker toward the extremity
    pub next: Option<&'static str>,
    /// Parts a joint connects, or the part a marker sits on
    pub links: &'static [&'static str],
    /// Joints further out along the limb of a part
    pub outer_joints: &'static [&'static str],
    /// Composite this part can be derived from
    pub split: Option<SplitSource>,
}

impl NodeEntry {
    const fn new(name: &'static str, layer: &'static str, kind: NodeKind, side: Side) -> Self {
        Self {
            name,
            layer,
            kind,
            side,
            next: None,
            links: &[],
            outer_joints: &[],
            split: None,
        }
    }
}

const fn part(
    name: &'static str,
    layer: &'static str,
    side: Side,
    next: Option<&'static str>,
    outer_joints: &'static [&'static str],
    split: Option<SplitSource>,
) -> NodeEntry {
    NodeEntry {
        next,
        outer_joints,
        split,
        ..NodeEntry::new(name, layer, NodeKind::Part, side)
    }
}

const fn composite(
    name: &'static str,
    layer: &'static str,
    side: Side,
    next: &'static str,
) -> NodeEntry {
    NodeEntry {
        next: Some(next),
        ..NodeEntry::new(name, layer, NodeKind::CompositePart, side)
    }
}

const fn joint(
    name: &'static str,
    layer: &'static str,
    side: Side,
    next: &'static str,
    links: &'static [&'static str],
) -> NodeEntry {
    NodeEntry {
        next: Some(next),
        links,
        ..NodeEntry::new(name, layer, NodeKind::Joint, side)
    }
}

const fn marker(
    name: &'static str,
    layer: &'static str,
    side: Side,
    links: &'static [&'static str],
) -> NodeEntry {
    NodeEntry {
        links,
        ..NodeEntry::new(name, layer, NodeKind::Marker, side)
    }
}

const fn split(
    composite: &'static str,
    mid_joint: &'static str,
    half: Half,
) -> Option<SplitSource> {
    Some(SplitSource { composite, mid_joint, half })
}

const R: Side = Side::Right;
const L: Side = Side::Left;
const C: Side = Side::Center;

/// Human rig table. Part rows are in paint order.
#[rustfmt::skip]
static HUMAN_TABLE: &[NodeEntry] = &[
    // Parts
    part(R_ARM_TOP, "RArmTop", R, Some(R_ARM_MID_JOINT), &[R_ARM_MID_JOINT, R_HAND_JOINT],
        split(R_ARM, R_ARM_MID_JOINT, Half::Top)),
    part(R_ARM_BTM, "RArmBtm", R, Some(R_HAND_JOINT), &[R_HAND_JOINT],
        split(R_ARM, R_ARM_MID_JOINT, Half::Bottom)),
    part(R_HAND, "RHand", R, Some(R_HAND_END_MARKER), &[], None),
    part(R_LEG_TOP, "RLegTop", R, Some(R_LEG_MID_JOINT), &[R_LEG_MID_JOINT, R_FOOT_JOINT],
        split(R_LEG, R_LEG_MID_JOINT, Half::Top)),
    part(R_LEG_BTM, "RLegBtm", R, Some(R_FOOT_JOINT), &[R_FOOT_JOINT],
        split(R_LEG, R_LEG_MID_JOINT, Half::Bottom)),
    part(R_FOOT, "RFoot", R, Some(R_FOOT_END_MARKER), &[], None),
    part(TORSO, "Hip", C, None, &[], None),
    part(HEAD, "RL_TalkingHead", C, Some(HEAD_TOP_MARKER), &[], None),
    part(L_LEG_TOP, "LLegTop", L, Some(L_LEG_MID_JOINT), &[L_LEG_MID_JOINT, L_FOOT_JOINT],
        split(L_LEG, L_LEG_MID_JOINT, Half::Top)),
    part(L_LEG_BTM, "LLegBtm", L, Some(L_FOOT_JOINT), &[L_FOOT_JOINT],
        split(L_LEG, L_LEG_MID_JOINT, Half::Bottom)),
    part(L_FOOT, "LFoot", L, Some(L_FOOT_END_MARKER), &[], None),
    part(L_ARM_TOP, "LArmTop", L, Some(L_ARM_MID_JOINT), &[L_ARM_MID_JOINT, L_HAND_JOINT],
        split(L_ARM, L_ARM_MID_JOINT, Half::Top)),
    part(L_ARM_BTM, "LArmBtm", L, Some(L_HAND_JOINT), &[L_HAND_JOINT],
        split(L_ARM, L_ARM_MID_JOINT, Half::Bottom)),
    part(L_HAND, "LHand", L, Some(L_HAND_END_MARKER), &[], None),
    // Composite limbs
    composite(R_ARM, "RArm", R, R_ARM_MID_JOINT),
    composite(R_LEG, "RThigh", R, R_LEG_MID_JOINT),
    composite(L_ARM, "LArm", L, L_ARM_MID_JOINT),
    composite(L_LEG, "LThigh", L, L_LEG_MID_JOINT),
    // Joints
    joint(HEAD_JOINT, "Head", C, HEAD_TOP_MARKER, &[HEAD, TORSO]),
    joint(R_ARM_JOINT, "RArm", R, R_ARM_MID_JOINT, &[TORSO, R_ARM_TOP]),
    joint(R_ARM_MID_JOINT, "RForearm", R, R_HAND_JOINT, &[R_ARM_TOP, R_ARM_BTM]),
    joint(R_HAND_JOINT, "RHand", R, R_HAND_END_MARKER, &[R_ARM_BTM, R_HAND]),
    joint(R_LEG_JOINT, "RThigh", R, R_LEG_MID_JOINT, &[TORSO, R_LEG_TOP]),
    joint(R_LEG_MID_JOINT, "RShank", R, R_FOOT_JOINT, &[R_LEG_TOP, R_LEG_BTM]),
    joint(R_FOOT_JOINT, "RFoot", R, R_FOOT_END_MARKER, &[R_LEG_BTM, R_FOOT]),
    joint(L_ARM_JOINT, "LArm", L, L_ARM_MID_JOINT, &[TORSO, L_ARM_TOP]),
    joint(L_ARM_MID_JOINT, "LForearm", L, L_HAND_JOINT, &[L_ARM_TOP, L_ARM_BTM]),
    joint(L_HAND_JOINT, "LHand", L, L_HAND_END_MARKER, &[L_ARM_BTM, L_HAND]),
    joint(L_LEG_JOINT, "LThigh", L, L_LEG_MID_JOINT, &[TORSO, L_LEG_TOP]),
    joint(L_LEG_MID_JOINT, "LShank", L, L_FOOT_JOINT, &[L_LEG_TOP, L_LEG_BTM]),
    joint(L_FOOT_JOINT, "LFoot", L, L_FOOT_END_MARKER, &[L_LEG_BTM, L_FOOT]),
    // Markers
    marker(ANCHOR_MARKER, "ObjectPivot", C, &[TORSO]),
    marker(HEAD_TOP_MARKER, "Head_Nub", C, &[HEAD]),
    marker(R_HAND_END_MARKER, "RHand_Nub", R, &[R_HAND]),
    marker(R_FOOT_END_MARKER, "RToe", R, &[R_FOOT]),
    marker(L_HAND_END_MARKER, "LHand_Nub", L, &[L_HAND]),
    marker(L_FOOT_END_MARKER, "LToe", L, &[L_FOOT]),
];

/// Root joints, each the start of one chain
static HUMAN_ROOTS: &[&str] = &[HEAD_JOINT, R_ARM_JOINT, R_LEG_JOINT, L_ARM_JOINT, L_LEG_JOINT];

/// Joints and markers that fully determine a pose
#[rustfmt::skip]
static HUMAN_POSE_KEYS: &[&str] = &[
    HEAD_TOP_MARKER, HEAD_JOINT,
    R_ARM_JOINT, R_ARM_MID_JOINT, R_HAND_JOINT, R_HAND_END_MARKER,
    R_LEG_JOINT, R_LEG_MID_JOINT, R_FOOT_JOINT, R_FOOT_END_MARKER,
    L_ARM_JOINT, L_ARM_MID_JOINT, L_HAND_JOINT, L_HAND_END_MARKER,
    L_LEG_JOINT, L_LEG_MID_JOINT, L_FOOT_JOINT, L_FOOT_END_MARKER,
];

/// Static lookup surface over a rig table
#[derive(Debug)]
pub struct Topology {
    entries: IndexMap<&'static str, NodeEntry>,
    part_names: Vec<&'static str>,
    composite_names: Vec<&'static str>,
    joint_names: Vec<&'static str>,
    marker_names: Vec<&'static str>,
    root_joint_names: &'static [&'static str],
    pose_keys: &'static [&'static str],
}

impl Topology {
    /// The bipedal human topology
    pub fn human() -> &'static Topology {
        static HUMAN: OnceLock<Topology> = OnceLock::new();
        HUMAN.get_or_init(|| Topology::from_table(HUMAN_TABLE, HUMAN_ROOTS, HUMAN_POSE_KEYS))
    }

    fn from_table(
        table: &'static [NodeEntry],
        root_joint_names: &'static [&'static str],
        pose_keys: &'static [&'static str],
    ) -> Self {
        let entries: IndexMap<_, _> = table.iter().map(|e| (e.name, *e)).collect();
        let names_of = |kind: NodeKind| {
            table.iter().filter(|e| e.kind == kind).map(|e| e.name).collect::<Vec<_>>()
        };

        Self {
            part_names: names_of(NodeKind::Part),
            composite_names: names_of(NodeKind::CompositePart),
            joint_names: names_of(NodeKind::Joint),
            marker_names: names_of(NodeKind::Marker),
            entries,
            root_joint_names,
            pose_keys,
        }
    }

    /// Table row for a name
    pub fn entry(&self, name: &str) -> Option<&NodeEntry> {
        self.entries.get(name)
    }

    /// Part names in paint order
    pub fn part_names(&self) -> &[&'static str] {
        &self.part_names
    }

    /// Composite limb names
    pub fn composite_part_names(&self) -> &[&'static str] {
        &self.composite_names
    }

    /// Physical joint names
    pub fn joint_names(&self) -> &[&'static str] {
        &self.joint_names
    }

    /// Marker names
    pub fn marker_names(&self) -> &[&'static str] {
        &self.marker_names
    }

    /// Joint names that start a chain
    pub fn root_joint_names(&self) -> &[&'static str] {
        self.root_joint_names
    }

    /// Pose keys in canonical order
    pub fn pose_keys(&self) -> &[&'static str] {
        self.pose_keys
    }

    /// Kind of a name
    pub fn kind_of(&self, name: &str) -> Option<NodeKind> {
        self.entry(name).map(|e| e.kind)
    }

    /// Layer name of a part, joint or marker in a layered archive
    pub fn layer_name(&self, name: &str) -> Option<&'static str> {
        self.entry(name).map(|e| e.layer)
    }

    /// Side of a name
    pub fn side_of(&self, name: &str) -> Option<Side> {
        self.entry(name).map(|e| e.side)
    }

    /// Whether the name is a physical joint
    pub fn is_joint(&self, name: &str) -> bool {
        self.kind_of(name) == Some(NodeKind::Joint)
    }

    /// Whether the name is a marker
    pub fn is_marker(&self, name: &str) -> bool {
        self.kind_of(name) == Some(NodeKind::Marker)
    }

    /// Whether the name is a joint or a marker
    pub fn is_joint_or_marker(&self, name: &str) -> bool {
        self.is_joint(name) || self.is_marker(name)
    }

    /// Whether the name is a pose key
    pub fn is_pose_key(&self, name: &str) -> bool {
        self.pose_keys.contains(&name)
    }

    /// Parts linked by a joint or marker (empty for anything else)
    pub fn links_for(&self, name: &str) -> &'static [&'static str] {
        self.entry(name).map(|e| e.links).unwrap_or(&[])
    }

    /// Chain successor for a joint, marker or part name
    pub fn next_key(&self, name: &str) -> Option<&'static str> {
        self.entry(name).and_then(|e| e.next)
    }

    /// Joints further out along the limb of a part
    pub fn outer_joints_for_part(&self, name: &str) -> &'static [&'static str] {
        self.entry(name).map(|e| e.outer_joints).unwrap_or(&[])
    }

    /// Composite source of a splittable part
    pub fn split_source(&self, name: &str) -> Option<SplitSource> {
        self.entry(name).and_then(|e| e.split)
    }

    /// Keys from a root joint to its terminal marker
    pub fn chain_from(&self, root: &str) -> Vec<&'static str> {
        let mut chain = Vec::new();
        let mut current = self.entry(root).map(|e| e.name);
        while let Some(name) = current {
            // Bounded by the table size so a malformed table cannot loop
            if chain.len() > self.entries.len() {
                break;
            }
            chain.push(name);
            current = self.next_key(name);
        }
        chain
    }

    /// Every chain, one per root joint
    pub fn chains(&self) -> Vec<Vec<&'static str>> {
        self.root_joint_names.iter().map(|root| self.chain_from(root)).collect()
    }
}
