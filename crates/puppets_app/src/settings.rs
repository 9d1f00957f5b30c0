// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tool settings.
//!
//! Stored as RON (`puppets.ron` by default). Every section has defaults and
//! missing fields fall back to them, so a settings file only needs the
//! values it changes.

use puppets_poser::{FrameBaker, PoserSettings, RelaxationSettings, SpriteSheetSettings};
use puppets_sequencer::{PlaybackController, LEGACY_MOVE_MS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Current settings format version
pub const SETTINGS_FORMAT_VERSION: u32 = 1;

/// Log filter used when neither `RUST_LOG` nor the settings file sets one
pub const DEFAULT_LOG_FILTER: &str =
    "puppets_app=info,puppets_rig=info,puppets_sequencer=info,puppets_poser=info";

/// Default settings file name
pub const SETTINGS_FILE_NAME: &str = "puppets.ron";

/// Errors raised while reading or writing settings
#[derive(Debug, Error)]
pub enum SettingsError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// RON parse error
    #[error("RON parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// RON serialization error
    #[error("RON serialization error: {0}")]
    Write(#[from] ron::Error),

    /// Written by a newer version of the tools
    #[error("Settings version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Newest version this build reads
        supported: u32,
    },
}

/// Simulation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    /// Simulation step in milliseconds
    pub step_ms: u32,
    /// Solver passes per step
    pub iterations: u32,
    /// Steps taken to settle into a pose
    pub settle_steps: u32,
    /// Torso density
    pub torso_density: f64,
    /// Density of every other part
    pub limb_density: f64,
    /// Compliance of pose constraints
    pub point_compliance: f64,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        let poser = PoserSettings::default();
        let solver = RelaxationSettings::default();
        Self {
            step_ms: poser.step_ms,
            iterations: solver.iterations,
            settle_steps: poser.settle_steps,
            torso_density: poser.torso_density,
            limb_density: poser.limb_density,
            point_compliance: solver.point_compliance,
        }
    }
}

/// Playback settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Time between frames in milliseconds
    pub frame_delay_ms: u32,
    /// Move length given to poses of legacy action documents
    pub legacy_move_ms: u32,
    /// Whether playback loops
    pub looping: bool,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            frame_delay_ms: FrameBaker::default().frame_delay_ms,
            legacy_move_ms: LEGACY_MOVE_MS,
            looping: false,
        }
    }
}

/// Action library settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Default action library file
    pub actions_file: PathBuf,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            actions_file: PathBuf::from("actions.ron"),
        }
    }
}

/// All tool settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PuppetSettings {
    /// Format version
    pub version: u32,
    /// Simulation
    pub physics: PhysicsSettings,
    /// Playback and frame timing
    pub playback: PlaybackSettings,
    /// Action library
    pub library: LibrarySettings,
    /// Sprite-sheet layout
    pub bake: SpriteSheetSettings,
    /// Log filter used when `RUST_LOG` is not set
    pub log_filter: String,
}

impl Default for PuppetSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_FORMAT_VERSION,
            physics: PhysicsSettings::default(),
            playback: PlaybackSettings::default(),
            library: LibrarySettings::default(),
            bake: SpriteSheetSettings::default(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl PuppetSettings {
    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        let settings: PuppetSettings = ron::from_str(&content)?;

        // Version check
        if settings.version > SETTINGS_FORMAT_VERSION {
            return Err(SettingsError::UnsupportedVersion {
                found: settings.version,
                supported: SETTINGS_FORMAT_VERSION,
            });
        }

        Ok(settings)
    }

    /// Load settings, or the defaults if the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, SettingsError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Settings as pretty RON
    pub fn to_ron(&self) -> Result<String, SettingsError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }

    /// Poser configuration
    pub fn poser(&self) -> PoserSettings {
        PoserSettings {
            step_ms: self.physics.step_ms,
            settle_steps: self.physics.settle_steps,
            torso_density: self.physics.torso_density,
            limb_density: self.physics.limb_density,
        }
    }

    /// Solver configuration
    pub fn relaxation(&self) -> RelaxationSettings {
        RelaxationSettings {
            iterations: self.physics.iterations,
            point_compliance: self.physics.point_compliance,
            ..Default::default()
        }
    }

    /// Frame sampler
    pub fn frame_baker(&self) -> FrameBaker {
        FrameBaker::new(self.playback.frame_delay_ms)
    }

    /// Playback clock
    pub fn playback_controller(&self) -> PlaybackController {
        PlaybackController {
            looping: self.playback.looping,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = PuppetSettings::default();
        assert_eq!(settings.physics.step_ms, 20);
        assert_eq!(settings.physics.torso_density, 1000.0);
        assert_eq!(settings.physics.limb_density, 1.0);
        assert_eq!(settings.playback.frame_delay_ms, 25);
        assert_eq!(settings.playback.legacy_move_ms, 500);
        assert_eq!(settings.poser(), PoserSettings::default());
        assert_eq!(settings.relaxation(), RelaxationSettings::default());
    }

    #[test]
    fn test_ron_round_trip() {
        let mut settings = PuppetSettings::default();
        settings.physics.settle_steps = 45;
        settings.bake.columns = 4;
        settings.playback.looping = true;

        let text = settings.to_ron().unwrap();
        let parsed: PuppetSettings = ron::from_str(&text).unwrap();
        assert_eq!(parsed, settings);
        assert!(parsed.playback_controller().looping);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let text = "PuppetSettings(physics: PhysicsSettings(iterations: 8), log_filter: \"debug\")";
        let parsed: PuppetSettings = ron::from_str(text).unwrap();
        assert_eq!(parsed.physics.iterations, 8);
        assert_eq!(parsed.physics.step_ms, 20);
        assert_eq!(parsed.log_filter, "debug");
        assert_eq!(parsed.library, LibrarySettings::default());
    }

    #[test]
    fn test_save_load_and_version_check() {
        let dir = std::env::temp_dir().join(format!("puppets-settings-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(SETTINGS_FILE_NAME);

        assert_eq!(PuppetSettings::load_or_default(&path).unwrap(), PuppetSettings::default());

        let settings = PuppetSettings {
            version: SETTINGS_FORMAT_VERSION + 1,
            ..Default::default()
        };
        settings.save(&path).unwrap();
        assert!(matches!(
            PuppetSettings::load(&path),
            Err(SettingsError::UnsupportedVersion { .. })
        ));

        PuppetSettings::default().save(&path).unwrap();
        assert_eq!(PuppetSettings::load(&path).unwrap(), PuppetSettings::default());

        std::fs::remove_dir_all(&dir).ok();
    }
}
