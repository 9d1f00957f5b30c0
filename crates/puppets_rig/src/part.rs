// SPDX-License-Identifier: MIT OR Apache-2.0
//! Geometry nodes: image-backed parts and joint/marker landmarks.

use crate::geometry::Rect;
use crate::topology::{names, Topology};
use glam::DVec2;
use image::{Rgba, RgbaImage};
use std::sync::Arc;

/// Edge length of the image drawn for a joint or marker
pub const MARKER_SIZE: f64 = 23.0;

/// Edge length of the image drawn for the anchor marker
pub const ANCHOR_SIZE: f64 = 90.0;

/// A named image placed at an origin in rig coordinates
#[derive(Debug, Clone)]
pub struct Part {
    name: String,
    origin: DVec2,
    size: DVec2,
    image: Option<Arc<RgbaImage>>,
    mother: Option<String>,
}

impl Part {
    /// Create a part whose image has not arrived yet
    pub fn new(name: impl Into<String>, origin: DVec2, size: DVec2) -> Self {
        Self {
            name: name.into(),
            origin,
            size,
            image: None,
            mother: None,
        }
    }

    /// Create a part from a decoded image; the size is taken from the image
    pub fn with_image(name: impl Into<String>, origin: DVec2, image: Arc<RgbaImage>) -> Self {
        let size = DVec2::new(f64::from(image.width()), f64::from(image.height()));
        Self {
            name: name.into(),
            origin,
            size,
            image: Some(image),
            mother: None,
        }
    }

    /// Tag this part as cut out of `mother`
    pub fn with_mother(mut self, mother: impl Into<String>) -> Self {
        self.mother = Some(mother.into());
        self
    }

    /// Part name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Top-left corner in rig coordinates
    pub fn origin(&self) -> DVec2 {
        self.origin
    }

    /// Move the part
    pub fn set_origin(&mut self, origin: DVec2) {
        self.origin = origin;
    }

    /// Image size
    pub fn size(&self) -> DVec2 {
        self.size
    }

    /// Image rect at the part origin
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.origin, self.size)
    }

    /// Decoded image, if it has arrived
    pub fn image(&self) -> Option<&Arc<RgbaImage>> {
        self.image.as_ref()
    }

    /// Attach the decoded image and adopt its size
    pub fn set_image(&mut self, image: Arc<RgbaImage>) {
        self.size = DVec2::new(f64::from(image.width()), f64::from(image.height()));
        self.image = Some(image);
    }

    /// Whether the backing image has arrived
    pub fn is_loaded(&self) -> bool {
        self.image.is_some()
    }

    /// Composite part this part was cut out of
    pub fn mother(&self) -> Option<&str> {
        self.mother.as_deref()
    }

    /// Whether this part was produced by splitting a composite
    pub fn is_derived(&self) -> bool {
        self.mother.is_some()
    }
}

/// A named point on the rig: a physical hinge, or a marker landmark
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    name: String,
    position: DVec2,
    size: DVec2,
    marker: bool,
}

impl Joint {
    /// Create a hinge joint with the default marker image size
    pub fn new(name: impl Into<String>, position: DVec2) -> Self {
        Self {
            name: name.into(),
            position,
            size: DVec2::splat(MARKER_SIZE),
            marker: false,
        }
    }

    /// Create a marker landmark
    pub fn marker(name: impl Into<String>, position: DVec2) -> Self {
        Self {
            marker: true,
            ..Self::new(name, position)
        }
    }

    /// Create the joint, marker or anchor the human topology names `name`
    pub fn named(name: &str, position: DVec2) -> Self {
        if name == names::ANCHOR_MARKER {
            Self::marker(name, position).with_size(DVec2::splat(ANCHOR_SIZE))
        } else if Topology::human().is_marker(name) {
            Self::marker(name, position)
        } else {
            Self::new(name, position)
        }
    }

    /// Override the joint image size
    pub fn with_size(mut self, size: DVec2) -> Self {
        self.size = size;
        self
    }

    /// Joint name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position in rig coordinates
    pub fn position(&self) -> DVec2 {
        self.position
    }

    /// Move the joint
    pub fn set_position(&mut self, position: DVec2) {
        self.position = position;
    }

    /// Joint image size
    pub fn size(&self) -> DVec2 {
        self.size
    }

    /// Joint image rect anchored at the joint position
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size)
    }

    /// Whether this is a marker rather than a physical hinge
    pub fn is_marker(&self) -> bool {
        self.marker
    }

    /// Render the joint image: a filled disc for hinges, a ring for markers
    pub fn render_image(&self) -> RgbaImage {
        let w = self.size.x.round().max(1.0) as u32;
        let h = self.size.y.round().max(1.0) as u32;
        let color = if self.marker {
            Rgba([40, 160, 255, 220])
        } else {
            Rgba([255, 80, 40, 220])
        };

        let center = DVec2::new(f64::from(w), f64::from(h)) * 0.5;
        let outer = center.x.min(center.y);
        let inner = if self.marker { outer * 0.6 } else { 0.0 };

        RgbaImage::from_fn(w, h, |x, y| {
            let p = DVec2::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
            let d = p.distance(center);
            if d <= outer && d >= inner {
                color
            } else {
                Rgba([0, 0, 0, 0])
            }
        })
    }
}
