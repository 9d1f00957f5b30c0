// SPDX-License-Identifier: MIT OR Apache-2.0
//! Offline frame capture and sprite-sheet assembly.
//!
//! [`FrameBaker`] samples an action at a fixed frame delay, settles the
//! poser into each sampled pose and records where every part ended up.
//! [`SpriteSheet::bake`] composites those frames into a grid image using
//! the rig's part images.

use crate::error::PoserError;
use crate::poser::{Poser, Result};
use crate::world::{BodyPose, PhysicsWorld};
use glam::DVec2;
use image::{Rgba, RgbaImage};
use puppets_rig::{Part, Pose, Rect, Rig};
use puppets_sequencer::Action;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default time between baked frames
pub const DEFAULT_FRAME_DELAY_MS: u32 = 25;

/// Where a part sits in a baked frame
#[derive(Debug, Clone, PartialEq)]
pub struct PartPlacement {
    /// Part name
    pub name: String,
    /// Body center and rotation
    pub transform: BodyPose,
    /// Part size
    pub size: DVec2,
}

impl PartPlacement {
    /// Corners of the rotated part in world space
    pub fn corners(&self) -> [DVec2; 4] {
        let half = self.size * 0.5;
        [
            DVec2::new(-half.x, -half.y),
            DVec2::new(half.x, -half.y),
            DVec2::new(half.x, half.y),
            DVec2::new(-half.x, half.y),
        ]
        .map(|corner| self.transform.to_world(corner))
    }

    /// Axis-aligned bounds of the rotated part
    pub fn bounds(&self) -> Rect {
        let corners = self.corners();
        let min = corners.iter().copied().reduce(DVec2::min).unwrap_or_default();
        let max = corners.iter().copied().reduce(DVec2::max).unwrap_or_default();
        Rect::from_min_max(min, max)
    }
}

/// One captured frame
#[derive(Debug, Clone)]
pub struct BakedFrame {
    /// Action time of the frame
    pub time_ms: u64,
    /// Pose the rig settled into
    pub pose: Pose,
    /// Part placements in paint order
    pub parts: Vec<PartPlacement>,
}

impl BakedFrame {
    /// Bounds of every part in the frame
    pub fn bounds(&self) -> Option<Rect> {
        self.parts
            .iter()
            .map(PartPlacement::bounds)
            .reduce(|a, b| a.union(&b))
    }
}

/// Samples an action into frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameBaker {
    /// Time between frames in milliseconds
    pub frame_delay_ms: u32,
}

impl Default for FrameBaker {
    fn default() -> Self {
        Self {
            frame_delay_ms: DEFAULT_FRAME_DELAY_MS,
        }
    }
}

impl FrameBaker {
    /// Create a baker with a frame delay
    pub fn new(frame_delay_ms: u32) -> Self {
        Self { frame_delay_ms }
    }

    /// Frame times for an action.
    ///
    /// One frame per whole delay in the action; a non-empty action shorter
    /// than one delay still gets its first frame.
    pub fn frame_times(&self, action: &Action) -> Vec<u64> {
        if action.move_count() == 0 {
            return Vec::new();
        }
        let delay = u64::from(self.frame_delay_ms.max(1));
        let count = (action.total_duration() / delay).max(1);
        (0..count).map(|i| i * delay).collect()
    }

    /// Pose the rig at every frame time and record the result
    pub fn bake<W: PhysicsWorld>(
        &self,
        action: &Action,
        poser: &mut Poser<W>,
    ) -> Result<Vec<BakedFrame>> {
        let topology = poser.topology();
        let mut frames = Vec::new();

        for (index, time_ms) in self.frame_times(action).into_iter().enumerate() {
            let Some(target) = action.pose_at_time(time_ms as f64, topology) else {
                continue;
            };
            poser.set_pose(&target);

            let pose = poser.get_pose_named(&format!("{} {}", action.name(), index))?;
            let parts = poser
                .bound_parts()
                .filter_map(|name| {
                    Some(PartPlacement {
                        name: name.to_string(),
                        transform: poser.part_transform(name)?,
                        size: poser.part_size(name)?,
                    })
                })
                .collect();
            frames.push(BakedFrame {
                time_ms,
                pose,
                parts,
            });
        }

        tracing::info!("Baked {} frames of {}", frames.len(), action.name());
        Ok(frames)
    }
}

/// Sprite-sheet layout settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpriteSheetSettings {
    /// Height of one frame cell in pixels
    pub frame_height: u32,
    /// Frames per row
    pub columns: u32,
}

impl Default for SpriteSheetSettings {
    fn default() -> Self {
        Self {
            frame_height: 200,
            columns: 8,
        }
    }
}

/// Frames composited into a grid
#[derive(Debug, Clone)]
pub struct SpriteSheet {
    /// Sheet image
    pub image: RgbaImage,
    /// Size of one cell
    pub frame_size: (u32, u32),
    /// Cells per row
    pub columns: u32,
    /// Number of frames drawn
    pub frame_count: usize,
}

impl SpriteSheet {
    /// Composite `frames` of `rig` into a grid.
    ///
    /// Every cell covers the union of all frames' part bounds, scaled so it
    /// is `frame_height` pixels tall.
    pub fn bake(rig: &Rig, frames: &[BakedFrame], settings: &SpriteSheetSettings) -> Result<Self> {
        let region = frames
            .iter()
            .filter_map(BakedFrame::bounds)
            .reduce(|a, b| a.union(&b))
            .ok_or(PoserError::NoFrames)?;

        let frame_h = settings.frame_height.max(1);
        let scale = if region.height > 0.0 {
            f64::from(frame_h) / region.height
        } else {
            1.0
        };
        let frame_w = ((region.width * scale).ceil() as u32).max(1);
        let count = frames.len() as u32;
        let columns = settings.columns.clamp(1, count);
        let rows = count.div_ceil(columns);

        let blank: Vec<&str> = frames[0]
            .parts
            .iter()
            .filter(|placement| rig.part(&placement.name).and_then(Part::image).is_none())
            .map(|placement| placement.name.as_str())
            .collect();
        if !blank.is_empty() {
            tracing::warn!("Parts without images are left out of the sheet: {}", blank.join(", "));
        }

        let mut image = RgbaImage::new(frame_w * columns, frame_h * rows);
        for (index, frame) in frames.iter().enumerate() {
            let index = index as u32;
            let cell = Cell {
                x: (index % columns) * frame_w,
                y: (index / columns) * frame_h,
                width: frame_w,
                height: frame_h,
                origin: region.min(),
                scale,
            };
            for placement in &frame.parts {
                if let Some(source) = rig.part(&placement.name).and_then(Part::image) {
                    cell.draw(&mut image, source, placement);
                }
            }
        }

        Ok(Self {
            image,
            frame_size: (frame_w, frame_h),
            columns,
            frame_count: frames.len(),
        })
    }

    /// Write the sheet as an image file
    pub fn save(&self, path: &Path) -> std::result::Result<(), image::ImageError> {
        self.image.save(path)?;
        tracing::info!("Saved {} frame sprite sheet to {}", self.frame_count, path.display());
        Ok(())
    }
}

/// One grid cell and its world-to-pixel mapping
struct Cell {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    origin: DVec2,
    scale: f64,
}

impl Cell {
    /// Nearest-neighbour rotated blit of a part image
    fn draw(&self, sheet: &mut RgbaImage, source: &RgbaImage, placement: &PartPlacement) {
        if placement.size.x <= 0.0 || placement.size.y <= 0.0 {
            return;
        }
        let texel = DVec2::new(
            f64::from(source.width()) / placement.size.x,
            f64::from(source.height()) / placement.size.y,
        );

        let bounds = placement.bounds();
        let to_cell = |world: DVec2| (world - self.origin) * self.scale;
        let min = to_cell(bounds.min()).floor().max(DVec2::ZERO);
        let max = to_cell(bounds.max())
            .ceil()
            .min(DVec2::new(f64::from(self.width), f64::from(self.height)));

        for py in min.y as u32..max.y as u32 {
            for px in min.x as u32..max.x as u32 {
                let pixel = DVec2::new(f64::from(px), f64::from(py)) + 0.5;
                let world = self.origin + pixel / self.scale;
                let local = placement.transform.to_local(world) + placement.size * 0.5;
                let sx = (local.x * texel.x).floor();
                let sy = (local.y * texel.y).floor();
                if sx < 0.0
                    || sy < 0.0
                    || sx >= f64::from(source.width())
                    || sy >= f64::from(source.height())
                {
                    continue;
                }
                let src = *source.get_pixel(sx as u32, sy as u32);
                blend_over(sheet.get_pixel_mut(self.x + px, self.y + py), src);
            }
        }
    }
}

/// Source-over alpha compositing
fn blend_over(dst: &mut Rgba<u8>, src: Rgba<u8>) {
    let sa = f64::from(src.0[3]) / 255.0;
    if sa <= 0.0 {
        return;
    }
    let da = f64::from(dst.0[3]) / 255.0;
    let out_a = sa + da * (1.0 - sa);
    for c in 0..3 {
        let value = (f64::from(src.0[c]) * sa + f64::from(dst.0[c]) * da * (1.0 - sa)) / out_a;
        dst.0[c] = value.round().clamp(0.0, 255.0) as u8;
    }
    dst.0[3] = (out_a * 255.0).round() as u8;
}
