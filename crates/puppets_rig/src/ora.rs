// SPDX-License-Identifier: MIT OR Apache-2.0
//! OpenRaster (ORA) layered-image reader and the rig source built on it.
//!
//! An ORA file is a zip archive holding `stack.xml`, a tree of `<stack>`
//! groups and `<layer>` entries, plus one PNG member per layer. Group offsets
//! are accumulated so every node carries absolute coordinates.

use crate::error::OraError;
use crate::part::{Joint, Part};
use crate::rig::RigSource;
use crate::topology::Topology;
use glam::DVec2;
use image::{ImageFormat, RgbaImage};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::Arc;
use zip::ZipArchive;

/// Result type for ORA operations
pub type Result<T> = std::result::Result<T, OraError>;

const STACK_MEMBER: &str = "stack.xml";

/// Group holding the body part layers
pub const BODY_GROUP: &str = "RL_Image";

/// Group holding the joint and marker layers
pub const JOINT_GROUP: &str = "RL_Bone_Human";

/// Head layer, looked up from the top of the stack
const HEAD_LAYER: &str = "RL_TalkingHead";

/// A raster layer
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// Layer name
    pub name: String,
    /// Absolute left edge
    pub x: f64,
    /// Absolute top edge
    pub y: f64,
    /// Archive member holding the raster
    pub src: String,
}

/// A named group of layers
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayerGroup {
    /// Group name
    pub name: String,
    /// Absolute x offset
    pub x: f64,
    /// Absolute y offset
    pub y: f64,
    /// Children in document order (topmost first)
    pub children: Vec<LayerNode>,
}

/// Node of the layer tree
#[derive(Debug, Clone, PartialEq)]
pub enum LayerNode {
    /// Nested group
    Group(LayerGroup),
    /// Raster layer
    Layer(Layer),
}

impl LayerNode {
    /// Node name
    pub fn name(&self) -> &str {
        match self {
            Self::Group(group) => &group.name,
            Self::Layer(layer) => &layer.name,
        }
    }

    /// Absolute position
    pub fn position(&self) -> DVec2 {
        match self {
            Self::Group(group) => DVec2::new(group.x, group.y),
            Self::Layer(layer) => DVec2::new(layer.x, layer.y),
        }
    }

    /// Depth-first search for the first node with `name`, this node included
    pub fn find(&self, name: &str) -> Option<&LayerNode> {
        if self.name() == name {
            return Some(self);
        }
        match self {
            Self::Group(group) => group.children.iter().find_map(|child| child.find(name)),
            Self::Layer(_) => None,
        }
    }

    /// Visit this node and its descendants depth-first with their depth
    pub fn visit(&self, depth: usize, f: &mut impl FnMut(usize, &LayerNode)) {
        f(depth, self);
        if let Self::Group(group) = self {
            for child in &group.children {
                child.visit(depth + 1, f);
            }
        }
    }

    /// The node as a raster layer
    pub fn as_layer(&self) -> Option<&Layer> {
        match self {
            Self::Layer(layer) => Some(layer),
            Self::Group(_) => None,
        }
    }
}

/// An opened ORA archive
pub struct OraArchive {
    root: LayerNode,
    width: u32,
    height: u32,
    zip: ZipArchive<Cursor<Vec<u8>>>,
}

impl std::fmt::Debug for OraArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OraArchive")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl OraArchive {
    /// Open an archive from disk
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_bytes(std::fs::read(path)?)
    }

    /// Read an archive from any reader
    pub fn from_reader(mut reader: impl Read) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(bytes)
    }

    /// Read an archive held in memory
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let mut zip = ZipArchive::new(Cursor::new(bytes))?;
        let mut xml = String::new();
        zip.by_name(STACK_MEMBER)?.read_to_string(&mut xml)?;
        let (root, width, height) = parse_stack(&xml)?;
        Ok(Self { root, width, height, zip })
    }

    /// Root of the layer tree
    pub fn root(&self) -> &LayerNode {
        &self.root
    }

    /// Canvas size
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Depth-first search from the root
    pub fn find(&self, name: &str) -> Option<&LayerNode> {
        self.root.find(name)
    }

    /// Decode the raster of a layer
    pub fn load_raster(&mut self, layer: &Layer) -> Result<RgbaImage> {
        let mut bytes = Vec::new();
        self.zip.by_name(&layer.src)?.read_to_end(&mut bytes)?;
        let image = image::load_from_memory_with_format(&bytes, ImageFormat::Png)
            .map_err(|source| OraError::Raster {
                src: layer.src.clone(),
                source,
            })?;
        Ok(image.to_rgba8())
    }
}

fn parse_stack(xml: &str) -> Result<(LayerNode, u32, u32)> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let (mut width, mut height) = (0, 0);
    let mut open: Vec<LayerGroup> = Vec::new();
    let mut root: Option<LayerGroup> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"image" => {
                let attrs = Attrs::read(&e)?;
                width = attrs.uint("w");
                height = attrs.uint("h");
            }
            Event::Start(e) if e.name().as_ref() == b"stack" => {
                let group = new_group(&e, open.last())?;
                open.push(group);
            }
            Event::Empty(e) if e.name().as_ref() == b"stack" => {
                let group = new_group(&e, open.last())?;
                close_group(group, &mut open, &mut root);
            }
            Event::End(e) if e.name().as_ref() == b"stack" => {
                let group = open
                    .pop()
                    .ok_or_else(|| OraError::Malformed("unbalanced </stack>".to_string()))?;
                close_group(group, &mut open, &mut root);
            }
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"layer" => {
                let parent = open
                    .last_mut()
                    .ok_or_else(|| OraError::Malformed("layer outside of a stack".to_string()))?;
                let attrs = Attrs::read(&e)?;
                parent.children.push(LayerNode::Layer(Layer {
                    name: attrs.get("name").unwrap_or_default().to_string(),
                    x: parent.x + attrs.float("x"),
                    y: parent.y + attrs.float("y"),
                    src: attrs.get("src").unwrap_or_default().to_string(),
                }));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let root = root.ok_or_else(|| OraError::Malformed("no root stack".to_string()))?;
    Ok((LayerNode::Group(root), width, height))
}

fn new_group(e: &BytesStart<'_>, parent: Option<&LayerGroup>) -> Result<LayerGroup> {
    let attrs = Attrs::read(e)?;
    let (px, py) = parent.map_or((0.0, 0.0), |p| (p.x, p.y));
    Ok(LayerGroup {
        name: attrs.get("name").unwrap_or_default().to_string(),
        x: px + attrs.float("x"),
        y: py + attrs.float("y"),
        children: Vec::new(),
    })
}

fn close_group(group: LayerGroup, open: &mut [LayerGroup], root: &mut Option<LayerGroup>) {
    match open.last_mut() {
        Some(parent) => parent.children.push(LayerNode::Group(group)),
        None => *root = Some(group),
    }
}

/// Unescaped attributes of one element
struct Attrs(Vec<(String, String)>);

impl Attrs {
    fn read(e: &BytesStart<'_>) -> Result<Self> {
        let mut attrs = Vec::new();
        for attr in e.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            attrs.push((key, attr.unescape_value()?.into_owned()));
        }
        Ok(Self(attrs))
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    fn float(&self, key: &str) -> f64 {
        self.get(key).and_then(|v| v.trim().parse().ok()).unwrap_or(0.0)
    }

    fn uint(&self, key: &str) -> u32 {
        self.get(key).and_then(|v| v.trim().parse().ok()).unwrap_or(0)
    }
}

/// Rig source reading parts and joints from an ORA archive
#[derive(Debug)]
pub struct OraRigSource {
    name: String,
    path: Option<String>,
    archive: OraArchive,
}

impl OraRigSource {
    /// Open the archive at `path`; the rig is named after the file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("Puppet");
        let name = stem.strip_prefix("CT").unwrap_or(stem).to_string();
        let archive = OraArchive::open(path)?;
        tracing::info!("Opened layered rig {} from {}", name, path.display());
        Ok(Self {
            name,
            path: Some(path.display().to_string()),
            archive,
        })
    }

    /// Wrap an already opened archive
    pub fn new(name: impl Into<String>, archive: OraArchive) -> Self {
        Self {
            name: name.into(),
            path: None,
            archive,
        }
    }

    /// The underlying archive
    pub fn archive(&self) -> &OraArchive {
        &self.archive
    }

    fn find_in(&self, group: &str, layer: &str) -> Option<Layer> {
        self.archive.find(group)?.find(layer)?.as_layer().cloned()
    }
}

impl RigSource for OraRigSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    fn create_part(&mut self, name: &str) -> Option<Part> {
        let layer_name = Topology::human().layer_name(name)?;
        let layer = if layer_name == HEAD_LAYER {
            self.archive.find(layer_name)?.as_layer().cloned()
        } else {
            self.find_in(BODY_GROUP, layer_name)
        }?;

        match self.archive.load_raster(&layer) {
            Ok(image) => {
                let origin = DVec2::new(layer.x, layer.y);
                Some(Part::with_image(name, origin, Arc::new(image)))
            }
            Err(err) => {
                tracing::warn!("Failed to load raster for {}: {}", name, err);
                None
            }
        }
    }

    fn create_joint(&mut self, name: &str) -> Option<Joint> {
        let layer = self.find_in(JOINT_GROUP, Topology::human().layer_name(name)?)?;
        Some(Joint::named(name, DVec2::new(layer.x, layer.y)))
    }
}
