// SPDX-License-Identifier: MIT OR Apache-2.0
//! Rig documents: a rig's part rects and joint positions as RON or JSON.
//!
//! The document carries geometry only. Part images are referenced by name
//! and resolved through an [`ImageStore`], so a document can be read before
//! (or without) its images.

use crate::error::DocumentError;
use crate::part::{Joint, Part};
use crate::rig::RigSource;
use glam::DVec2;
use image::RgbaImage;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Result type for document operations
pub type Result<T> = std::result::Result<T, DocumentError>;

/// On-disk document encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentFormat {
    /// Rusty Object Notation
    #[default]
    Ron,
    /// JSON
    Json,
}

impl DocumentFormat {
    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "ron" => Ok(Self::Ron),
            "json" => Ok(Self::Json),
            _ => Err(DocumentError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Parse a value
    pub fn parse<T: DeserializeOwned>(self, text: &str) -> Result<T> {
        Ok(match self {
            Self::Ron => ron::from_str(text)?,
            Self::Json => serde_json::from_str(text)?,
        })
    }

    /// Serialize a value, pretty-printed
    pub fn write<T: Serialize>(self, value: &T) -> Result<String> {
        Ok(match self {
            Self::Ron => {
                let config = ron::ser::PrettyConfig::default()
                    .struct_names(true)
                    .enumerate_arrays(false);
                ron::ser::to_string_pretty(value, config)?
            }
            Self::Json => serde_json::to_string_pretty(value)?,
        })
    }

    /// Read and parse a file, choosing the format from its extension
    pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T> {
        let format = Self::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        format.parse(&content)
    }

    /// Serialize to a file, choosing the format from its extension
    pub fn save<T: Serialize>(value: &T, path: &Path) -> Result<()> {
        let content = Self::from_path(path)?.write(value)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Placement of one part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "Part", rename_all = "PascalCase")]
pub struct PartRecord {
    /// Part name
    pub name: String,
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Image width
    pub width: f64,
    /// Image height
    pub height: f64,
    /// Image reference resolved by an [`ImageStore`]
    pub image_ref: String,
}

/// Position of one joint or marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "Joint", rename_all = "PascalCase")]
pub struct JointRecord {
    /// Joint name
    pub name: String,
    /// Position x
    pub x: f64,
    /// Position y
    pub y: f64,
}

/// A whole rig as a document
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename = "Puppet", rename_all = "PascalCase")]
pub struct RigDocument {
    /// Rig name
    pub name: String,
    /// Where the rig's assets live
    #[serde(default)]
    pub path: String,
    /// Parts in paint order
    #[serde(default)]
    pub parts: Vec<PartRecord>,
    /// Joints then markers
    #[serde(default)]
    pub joints: Vec<JointRecord>,
}

impl RigDocument {
    /// Load a document; the format follows the extension
    pub fn load(path: &Path) -> Result<Self> {
        let doc: Self = DocumentFormat::load(path)?;
        tracing::info!("Loaded rig document {} ({} parts)", doc.name, doc.parts.len());
        Ok(doc)
    }

    /// Save a document; the format follows the extension
    pub fn save(&self, path: &Path) -> Result<()> {
        DocumentFormat::save(self, path)
    }

    /// Record for a part
    pub fn part(&self, name: &str) -> Option<&PartRecord> {
        self.parts.iter().find(|p| p.name == name)
    }

    /// Record for a joint or marker
    pub fn joint(&self, name: &str) -> Option<&JointRecord> {
        self.joints.iter().find(|j| j.name == name)
    }
}

/// Resolves image references to decoded images
pub trait ImageStore {
    /// Decode the image for `image_ref`, or `None` if it is not available now
    fn load(&mut self, image_ref: &str) -> Option<RgbaImage>;

    /// Whether images arrive later through `Rig::attach_image`
    fn is_deferred(&self) -> bool {
        false
    }
}

/// Images read from files under a directory
#[derive(Debug, Clone)]
pub struct DirectoryImages {
    root: PathBuf,
}

impl DirectoryImages {
    /// Resolve references relative to `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ImageStore for DirectoryImages {
    fn load(&mut self, image_ref: &str) -> Option<RgbaImage> {
        let path = self.root.join(image_ref);
        match image::open(&path) {
            Ok(image) => Some(image.to_rgba8()),
            Err(err) => {
                tracing::warn!("Failed to load image {}: {}", path.display(), err);
                None
            }
        }
    }
}

/// Store whose images are delivered later by the host
#[derive(Debug, Clone, Copy, Default)]
pub struct DeferredImages;

impl ImageStore for DeferredImages {
    fn load(&mut self, _image_ref: &str) -> Option<RgbaImage> {
        None
    }

    fn is_deferred(&self) -> bool {
        true
    }
}

/// Rig source reading geometry from a [`RigDocument`]
#[derive(Debug)]
pub struct DocumentRigSource<S> {
    doc: RigDocument,
    images: S,
}

impl<S: ImageStore> DocumentRigSource<S> {
    /// Create a source over a document and an image store
    pub fn new(doc: RigDocument, images: S) -> Self {
        Self { doc, images }
    }

    /// The underlying document
    pub fn document(&self) -> &RigDocument {
        &self.doc
    }
}

impl DocumentRigSource<DirectoryImages> {
    /// Load a document with images next to it
    pub fn open(path: &Path) -> Result<Self> {
        let doc = RigDocument::load(path)?;
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(Self::new(doc, DirectoryImages::new(dir)))
    }
}

impl<S: ImageStore> RigSource for DocumentRigSource<S> {
    fn name(&self) -> &str {
        &self.doc.name
    }

    fn path(&self) -> Option<&str> {
        (!self.doc.path.is_empty()).then_some(self.doc.path.as_str())
    }

    fn create_part(&mut self, name: &str) -> Option<Part> {
        let record = self.doc.part(name)?;
        let origin = DVec2::new(record.x, record.y);
        let part = match self.images.load(&record.image_ref) {
            Some(image) => Part::with_image(name, origin, Arc::new(image)),
            None => Part::new(name, origin, DVec2::new(record.width, record.height)),
        };
        Some(part)
    }

    fn create_joint(&mut self, name: &str) -> Option<Joint> {
        let record = self.doc.joint(name)?;
        Some(Joint::named(name, DVec2::new(record.x, record.y)))
    }

    fn pending_images(&self) -> Vec<String> {
        if self.images.is_deferred() {
            self.doc.parts.iter().map(|p| p.name.clone()).collect()
        } else {
            Vec::new()
        }
    }
}
