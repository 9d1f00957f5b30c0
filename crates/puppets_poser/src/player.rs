// SPDX-License-Identifier: MIT OR Apache-2.0
//! Live action playback through the poser.

use crate::poser::Poser;
use crate::world::PhysicsWorld;
use puppets_sequencer::{Action, PlaybackController, PlaybackState};

/// Plays an action by steering a poser toward the pose at the current time
#[derive(Debug, Clone, Default)]
pub struct ActionPlayer {
    /// Playback clock
    pub playback: PlaybackController,
}

impl ActionPlayer {
    /// Create a player with its own clock
    pub fn new(playback: PlaybackController) -> Self {
        Self { playback }
    }

    /// Start or resume playback
    pub fn play(&mut self) {
        self.playback.play();
    }

    /// Pause, keeping the current pose targets
    pub fn pause(&mut self) {
        self.playback.pause();
    }

    /// Stop, rewind and release every outstanding pose constraint
    pub fn stop<W: PhysicsWorld>(&mut self, poser: &mut Poser<W>) {
        self.playback.stop();
        poser.resolve_constraints();
    }

    /// Whether playback is running
    pub fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }

    /// Advance the clock by `delta_ms` and step the poser toward the pose
    /// at the new time.
    ///
    /// Returns the index of the current move, if any.
    pub fn update<W: PhysicsWorld>(
        &mut self,
        delta_ms: f64,
        action: &Action,
        poser: &mut Poser<W>,
    ) -> Option<usize> {
        if !self.is_playing() {
            return None;
        }

        self.playback.update(delta_ms, action);
        let pose = self.playback.current_pose(action, poser.topology())?;
        poser.set_pose_target(&pose);
        poser.tick();

        if self.playback.state == PlaybackState::Stopped {
            tracing::debug!("Action {} finished", action.name());
            poser.resolve_constraints();
        }
        self.playback.current_move(action)
    }

    /// Jump to a time and settle the poser fully into that pose
    pub fn seek<W: PhysicsWorld>(
        &mut self,
        time_ms: f64,
        action: &Action,
        poser: &mut Poser<W>,
    ) -> bool {
        self.playback.seek(time_ms);
        match self.playback.current_pose(action, poser.topology()) {
            Some(pose) => poser.set_pose(&pose),
            None => false,
        }
    }
}
