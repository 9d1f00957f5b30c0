// SPDX-License-Identifier: MIT OR Apache-2.0
//! Moves and actions: timed sequences of named poses.
//!
//! Times are milliseconds. Move durations are whole milliseconds; sampling
//! times are `f64` so playback can run at any rate.

use indexmap::IndexMap;
use puppets_rig::{Pose, Topology};

/// A step of an action: hold or blend toward a pose for a duration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Move {
    /// Name of the pose this move starts from
    pub pose_name: String,
    /// Duration in milliseconds
    pub duration_ms: u32,
}

impl Move {
    /// Create a move
    pub fn new(pose_name: impl Into<String>, duration_ms: u32) -> Self {
        Self {
            pose_name: pose_name.into(),
            duration_ms,
        }
    }
}

/// A move copied together with its pose, detached from any action
#[derive(Debug, Clone, PartialEq)]
pub struct MoveClip {
    /// Copied pose
    pub pose: Pose,
    /// Copied duration in milliseconds
    pub duration_ms: u32,
}

/// A named, ordered sequence of moves plus the poses they reference
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Action {
    name: String,
    moves: Vec<Move>,
    poses: IndexMap<String, Pose>,
}

impl Action {
    /// Create an empty action
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Action name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the action
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Moves in order
    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    /// Number of moves
    pub fn move_count(&self) -> usize {
        self.moves.len()
    }

    /// Move at an index
    pub fn move_at(&self, index: usize) -> Option<&Move> {
        self.moves.get(index)
    }

    /// Poses referenced by the moves, in first-reference order
    pub fn poses(&self) -> impl Iterator<Item = &Pose> {
        self.poses.values()
    }

    /// Pose by name
    pub fn pose(&self, name: &str) -> Option<&Pose> {
        self.poses.get(name)
    }

    /// Number of distinct poses
    pub fn pose_count(&self) -> usize {
        self.poses.len()
    }

    /// Pose of the move at an index
    pub fn pose_for_move(&self, index: usize) -> Option<&Pose> {
        self.pose(&self.moves.get(index)?.pose_name)
    }

    /// Append a move; the pose is registered on first reference only
    pub fn add_move(&mut self, pose: &Pose, duration_ms: u32) -> usize {
        let index = self.moves.len();
        self.insert_move(index, pose, duration_ms)
    }

    /// Insert a move (index clamped to the end); returns where it landed
    pub fn insert_move(&mut self, index: usize, pose: &Pose, duration_ms: u32) -> usize {
        let index = index.min(self.moves.len());
        self.moves.insert(index, Move::new(pose.name(), duration_ms));
        if !self.poses.contains_key(pose.name()) {
            self.poses.insert(pose.name().to_string(), pose.clone());
        }
        index
    }

    /// Remove a move; its pose stays registered
    pub fn remove_move(&mut self, index: usize) -> Option<Move> {
        (index < self.moves.len()).then(|| self.moves.remove(index))
    }

    /// Move a move to another position
    pub fn move_move(&mut self, from: usize, to: usize) -> bool {
        if from >= self.moves.len() || to >= self.moves.len() {
            return false;
        }
        let entry = self.moves.remove(from);
        self.moves.insert(to, entry);
        true
    }

    /// Change the duration of a move
    pub fn set_move_duration(&mut self, index: usize, duration_ms: u32) -> bool {
        match self.moves.get_mut(index) {
            Some(entry) => {
                entry.duration_ms = duration_ms;
                true
            }
            None => false,
        }
    }

    /// Replace a registered pose by name; every move using it sees the change
    pub fn replace_pose(&mut self, pose: Pose) -> bool {
        match self.poses.get_mut(pose.name()) {
            Some(slot) => {
                *slot = pose;
                true
            }
            None => false,
        }
    }

    /// Drop poses that no move references
    pub fn remove_unused_poses(&mut self) -> usize {
        let before = self.poses.len();
        let moves = &self.moves;
        self.poses.retain(|name, _| moves.iter().any(|m| &m.pose_name == name));
        before - self.poses.len()
    }

    /// Copy a move and its pose for pasting elsewhere
    pub fn copy_move(&self, index: usize) -> Option<MoveClip> {
        let entry = self.moves.get(index)?;
        Some(MoveClip {
            pose: self.pose(&entry.pose_name)?.clone(),
            duration_ms: entry.duration_ms,
        })
    }

    /// Insert a copy of a clip as a new move
    pub fn paste_move(&mut self, index: usize, clip: &MoveClip) -> usize {
        self.insert_move(index, &clip.pose, clip.duration_ms)
    }

    /// Overwrite the pose of the move at `index` with the clip's points.
    ///
    /// The pose keeps its name, so every move sharing it changes too.
    pub fn paste_onto_pose(&mut self, index: usize, clip: &MoveClip) -> bool {
        let Some(name) = self.moves.get(index).map(|m| m.pose_name.clone()) else {
            return false;
        };
        self.replace_pose(clip.pose.renamed(name))
    }

    /// Sum of every move duration.
    ///
    /// Summed as `u64` so any number of `u32` durations fits.
    pub fn total_duration(&self) -> u64 {
        self.moves.iter().map(|m| u64::from(m.duration_ms)).sum()
    }

    /// Start time of a move
    pub fn move_start_time(&self, index: usize) -> u64 {
        self.moves
            .iter()
            .take(index)
            .map(|m| u64::from(m.duration_ms))
            .sum()
    }

    /// Index of the move playing at `time`.
    ///
    /// The first move whose end lies after `time`; times at or past the end
    /// map to the last move. `None` for an action with no moves.
    pub fn move_index_at_time(&self, time: f64) -> Option<usize> {
        let last = self.moves.len().checked_sub(1)?;
        let mut end = 0.0;
        for (index, entry) in self.moves.iter().enumerate() {
            end += f64::from(entry.duration_ms);
            if end > time {
                return Some(index);
            }
        }
        Some(last)
    }

    /// Progress through a move at `time`, clamped to `[0, 1]`.
    ///
    /// A zero-length move counts as complete.
    pub fn ratio_within_move(&self, time: f64, index: usize) -> f64 {
        let Some(entry) = self.moves.get(index) else {
            return 0.0;
        };
        if entry.duration_ms == 0 {
            return 1.0;
        }
        let start = self.move_start_time(index) as f64;
        ((time - start) / f64::from(entry.duration_ms)).clamp(0.0, 1.0)
    }

    /// Pose at `time`, blending each move's pose toward the next one.
    ///
    /// Time zero gives the first pose and times at or past the end give the
    /// last pose, both unblended. The last move holds its own pose.
    pub fn pose_at_time(&self, time: f64, topology: &Topology) -> Option<Pose> {
        let last = self.moves.len().checked_sub(1)?;
        if time <= 0.0 {
            return self.pose_for_move(0).cloned();
        }
        if time >= self.total_duration() as f64 {
            return self.pose_for_move(last).cloned();
        }

        let index = self.move_index_at_time(time)?;
        let from = self.pose_for_move(index)?;
        let Some(to) = self.pose_for_move(index + 1) else {
            return Some(from.clone());
        };
        let ratio = self.ratio_within_move(time, index);
        Some(Pose::blend(from, to, ratio, topology))
    }
}
