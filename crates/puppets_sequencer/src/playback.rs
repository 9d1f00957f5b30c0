// SPDX-License-Identifier: MIT OR Apache-2.0
//! Playback control over an action's timeline.

use crate::action::Action;
use puppets_rig::{Pose, Topology};

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Stopped at the start
    #[default]
    Stopped,
    /// Playing forward
    Playing,
    /// Paused
    Paused,
}

/// Clock that plays an action
#[derive(Debug, Clone)]
pub struct PlaybackController {
    /// Current playback time in milliseconds
    pub time: f64,
    /// Playback state
    pub state: PlaybackState,
    /// Playback speed multiplier
    pub speed: f64,
    /// Whether playback wraps at the end of the action
    pub looping: bool,
}

impl PlaybackController {
    /// Create a new playback controller
    pub fn new() -> Self {
        Self {
            time: 0.0,
            state: PlaybackState::Stopped,
            speed: 1.0,
            looping: false,
        }
    }

    /// Advance by `delta_ms` milliseconds
    pub fn update(&mut self, delta_ms: f64, action: &Action) {
        if self.state == PlaybackState::Playing {
            self.time += delta_ms * self.speed;
            self.check_bounds(action);
        }
    }

    /// Check and handle end of action
    fn check_bounds(&mut self, action: &Action) {
        let end_time = action.total_duration() as f64;

        if self.time >= end_time {
            if self.looping && end_time > 0.0 {
                self.time = (self.time - end_time) % end_time;
            } else {
                self.time = end_time;
                self.state = PlaybackState::Stopped;
            }
        }
    }

    /// Play from current position
    pub fn play(&mut self) {
        self.state = PlaybackState::Playing;
    }

    /// Pause playback
    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
    }

    /// Stop and reset to beginning
    pub fn stop(&mut self) {
        self.state = PlaybackState::Stopped;
        self.time = 0.0;
    }

    /// Toggle play/pause
    pub fn toggle_playback(&mut self) {
        match self.state {
            PlaybackState::Playing => self.pause(),
            PlaybackState::Paused | PlaybackState::Stopped => self.play(),
        }
    }

    /// Seek to specific time
    pub fn seek(&mut self, time: f64) {
        self.time = time.max(0.0);
    }

    /// Is currently playing
    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Index of the move at the current time
    pub fn current_move(&self, action: &Action) -> Option<usize> {
        action.move_index_at_time(self.time)
    }

    /// Pose at the current time
    pub fn current_pose(&self, action: &Action, topology: &Topology) -> Option<Pose> {
        action.pose_at_time(self.time, topology)
    }
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self::new()
    }
}
