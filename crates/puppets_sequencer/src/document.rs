// SPDX-License-Identifier: MIT OR Apache-2.0
//! Action documents.
//!
//! Wire shape:
//!
//! ```text
//! Action(
//!     Name: "Wave",
//!     Poses: [ Pose(Name: "Stand", Points: { "HeadJoint": "0 50", ... }), ... ],
//!     Moves: [ Move(Pose: "Stand", Time: 500), ... ],
//! )
//! ```
//!
//! Older documents list poses only (or an empty `Steps` list); loading them
//! synthesizes one fixed-length move per pose.

use crate::action::Action;
use crate::error::LibraryError;
use indexmap::IndexMap;
use puppets_rig::Pose;
use serde::{Deserialize, Serialize};

/// Move length given to each pose of a legacy document
pub const LEGACY_MOVE_MS: u32 = 500;

/// A pose with `"x y"` point strings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "Pose", rename_all = "PascalCase")]
pub struct PoseRecord {
    /// Pose name
    pub name: String,
    /// Pose key to `"x y"`
    pub points: IndexMap<String, String>,
}

/// A move referencing a pose by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "Move", rename_all = "PascalCase")]
pub struct MoveRecord {
    /// Pose name
    pub pose: String,
    /// Duration in milliseconds
    pub time: u32,
}

/// Serialized form of an [`Action`]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename = "Action", rename_all = "PascalCase")]
pub struct ActionDocument {
    /// Action name
    pub name: String,
    /// Poses in first-reference order
    #[serde(default)]
    pub poses: Vec<PoseRecord>,
    /// Moves in order
    #[serde(default, alias = "Steps")]
    pub moves: Vec<MoveRecord>,
}

impl ActionDocument {
    /// Capture an action
    pub fn from_action(action: &Action) -> Self {
        Self {
            name: action.name().to_string(),
            poses: action
                .poses()
                .map(|pose| PoseRecord {
                    name: pose.name().to_string(),
                    points: pose.to_point_strings(),
                })
                .collect(),
            moves: action
                .moves()
                .iter()
                .map(|m| MoveRecord {
                    pose: m.pose_name.clone(),
                    time: m.duration_ms,
                })
                .collect(),
        }
    }

    /// Whether this is a pose-only document from an older version
    pub fn is_legacy(&self) -> bool {
        self.moves.is_empty() && !self.poses.is_empty()
    }

    /// Build the action; a legacy document gets `legacy_move_ms` per pose
    pub fn to_action(&self, legacy_move_ms: u32) -> Result<Action, LibraryError> {
        let mut poses = IndexMap::with_capacity(self.poses.len());
        for record in &self.poses {
            let pose = Pose::from_point_strings(&record.name, &record.points)?;
            poses.insert(record.name.clone(), pose);
        }

        let mut action = Action::new(&self.name);
        if self.is_legacy() {
            tracing::info!(
                "Upgrading legacy action {} with {} poses",
                self.name,
                poses.len()
            );
            for pose in poses.values() {
                action.add_move(pose, legacy_move_ms);
            }
            return Ok(action);
        }

        for record in &self.moves {
            let pose = poses.get(&record.pose).ok_or_else(|| LibraryError::UnknownPose {
                action: self.name.clone(),
                pose: record.pose.clone(),
            })?;
            action.add_move(pose, record.time);
        }
        Ok(action)
    }
}
