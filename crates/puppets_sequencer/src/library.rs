// SPDX-License-Identifier: MIT OR Apache-2.0
//! The action library: every action of a character family in one file.

use crate::action::Action;
use crate::document::{ActionDocument, LEGACY_MOVE_MS};
use crate::error::LibraryError;
use puppets_rig::DocumentFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Result type for library operations
pub type Result<T> = std::result::Result<T, LibraryError>;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename = "Actions", rename_all = "PascalCase")]
struct LibraryDocument {
    #[serde(default)]
    actions: Vec<ActionDocument>,
}

/// Ordered list of actions tied to a file
#[derive(Debug, Clone)]
pub struct ActionLibrary {
    path: Option<PathBuf>,
    actions: Vec<Action>,
    legacy_move_ms: u32,
}

impl ActionLibrary {
    /// Create an empty library not yet tied to a file
    pub fn new() -> Self {
        Self {
            path: None,
            actions: Vec::new(),
            legacy_move_ms: LEGACY_MOVE_MS,
        }
    }

    /// Load a library. A file that does not exist yet gives an empty library
    /// tied to `path`.
    pub fn load(path: impl Into<PathBuf>, legacy_move_ms: u32) -> Result<Self> {
        let path = path.into();
        let mut library = Self {
            path: Some(path.clone()),
            actions: Vec::new(),
            legacy_move_ms,
        };
        if !path.exists() {
            tracing::info!("No action library at {}, starting empty", path.display());
            return Ok(library);
        }

        let doc: LibraryDocument = DocumentFormat::load(&path)?;
        for action in &doc.actions {
            library.actions.push(action.to_action(legacy_move_ms)?);
        }
        tracing::info!("Loaded {} actions from {}", library.actions.len(), path.display());
        Ok(library)
    }

    /// Save to the file the library was loaded from
    pub fn save(&self) -> Result<()> {
        match &self.path {
            Some(path) => self.save_as(path),
            None => Ok(()),
        }
    }

    /// Save to a specific file; the format follows the extension
    pub fn save_as(&self, path: &Path) -> Result<()> {
        let doc = LibraryDocument {
            actions: self.actions.iter().map(ActionDocument::from_action).collect(),
        };
        DocumentFormat::save(&doc, path)?;
        tracing::info!("Saved {} actions to {}", self.actions.len(), path.display());
        Ok(())
    }

    /// Library file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Move length given to poses of legacy documents
    pub fn legacy_move_ms(&self) -> u32 {
        self.legacy_move_ms
    }

    /// All actions in order
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Number of actions
    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// Action by name
    pub fn action(&self, name: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.name() == name)
    }

    /// Mutable action by name
    pub fn action_mut(&mut self, name: &str) -> Option<&mut Action> {
        self.actions.iter_mut().find(|a| a.name() == name)
    }

    /// Action by name, as an error if absent
    pub fn require(&self, name: &str) -> Result<&Action> {
        self.action(name)
            .ok_or_else(|| LibraryError::UnknownAction(name.to_string()))
    }

    /// Append an action
    pub fn add_action(&mut self, action: Action) {
        self.actions.push(action);
    }

    /// Insert an action (index clamped to the end)
    pub fn insert_action(&mut self, index: usize, action: Action) {
        let index = index.min(self.actions.len());
        self.actions.insert(index, action);
    }

    /// Remove the action at an index
    pub fn remove_action(&mut self, index: usize) -> Option<Action> {
        (index < self.actions.len()).then(|| self.actions.remove(index))
    }
}

impl Default for ActionLibrary {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use puppets_rig::{MemoryRigSource, Rig};

    fn action(name: &str) -> Action {
        let mut rig = Rig::new(MemoryRigSource::mannequin());
        let rest = rig.rest_pose(1.0).unwrap();
        let mut action = Action::new(name);
        action.add_move(&rest, 200);
        action
    }

    #[test]
    fn test_mutators() {
        let mut library = ActionLibrary::new();
        library.add_action(action("Walk"));
        library.insert_action(0, action("Run"));
        library.insert_action(99, action("Jump"));
        let names: Vec<&str> = library.actions().iter().map(Action::name).collect();
        assert_eq!(names, ["Run", "Walk", "Jump"]);

        assert!(library.action("Walk").is_some());
        assert!(matches!(library.require("Fly"), Err(LibraryError::UnknownAction(_))));
        library.action_mut("Walk").unwrap().set_name("Stroll");
        assert_eq!(library.remove_action(1).unwrap().name(), "Stroll");
        assert!(library.remove_action(5).is_none());
        assert_eq!(library.action_count(), 2);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let path = std::env::temp_dir().join("puppets-no-such-library.ron");
        let library = ActionLibrary::load(&path, LEGACY_MOVE_MS).unwrap();
        assert_eq!(library.action_count(), 0);
        assert_eq!(library.path(), Some(path.as_path()));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = std::env::temp_dir().join(format!("puppets-library-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        for file in ["actions.ron", "actions.json"] {
            let path = dir.join(file);
            let mut library = ActionLibrary::load(&path, LEGACY_MOVE_MS).unwrap();
            library.add_action(action("Wave"));
            library.add_action(action("Bow"));
            library.save().unwrap();

            let reloaded = ActionLibrary::load(&path, LEGACY_MOVE_MS).unwrap();
            let names: Vec<&str> = reloaded.actions().iter().map(Action::name).collect();
            assert_eq!(names, ["Wave", "Bow"]);
            assert_eq!(reloaded.action("Bow").unwrap().moves(), action("Bow").moves());
        }

        std::fs::remove_dir_all(&dir).ok();
    }
}
