// SPDX-License-Identifier: MIT OR Apache-2.0
//! Derived parts: upper/lower limb halves cut out of a single composite image.
//!
//! The split boundary depends on the composite's aspect ratio:
//! - tall and thin (`w / h < 1/3`): a horizontal cut through the mid joint
//! - wide and flat (`w / h > 3`): a vertical cut through the mid joint
//! - anything else: an L-shaped cut around the joint, mirrored for the left side

use crate::geometry::Rect;
use crate::part::{Joint, Part};
use crate::topology::{Half, Side};
use image::{imageops, RgbaImage};
use std::sync::Arc;

const THIN_ASPECT: f64 = 1.0 / 3.0;
const WIDE_ASPECT: f64 = 3.0;

/// Rect of one half of a composite limb.
///
/// `part` is the composite rect, `joint` the mid joint's image rect. The
/// result is clamped to `part`, and the union of both halves equals `part`
/// whenever the joint lies inside it.
pub fn split_rect(part: Rect, joint: Rect, side: Side, half: Half) -> Rect {
    let aspect = part.aspect();
    let (x0, y0, x1, y1) = (part.x, part.y, part.max_x(), part.max_y());

    let (min_x, min_y, max_x, max_y) = if aspect < THIN_ASPECT {
        match half {
            Half::Top => (x0, y0, x1, joint.max_y()),
            Half::Bottom => (x0, joint.y, x1, y1),
        }
    } else if aspect > WIDE_ASPECT {
        match half {
            Half::Top => (x0, y0, joint.max_x(), y1),
            Half::Bottom => (joint.x, y0, x1, y1),
        }
    } else {
        match (side, half) {
            (Side::Left, Half::Top) => (x0, y0, joint.max_x(), joint.max_y()),
            (Side::Left, Half::Bottom) => (joint.x, joint.y, x1, y1),
            (_, Half::Top) => (joint.x, y0, x1, joint.max_y()),
            (_, Half::Bottom) => (x0, joint.y, joint.max_x(), y1),
        }
    };

    Rect::from_min_max(
        glam::DVec2::new(min_x.clamp(x0, x1), min_y.clamp(y0, y1)),
        glam::DVec2::new(max_x.clamp(x0, x1), max_y.clamp(y0, y1)),
    )
}

/// Crop the pixels of `rect` out of an image placed at `origin`.
///
/// The rect is rounded to whole pixels and clamped to the image.
pub fn crop_image(image: &RgbaImage, origin: glam::DVec2, rect: Rect) -> RgbaImage {
    let (iw, ih) = image.dimensions();
    let left = ((rect.x - origin.x).round().max(0.0) as u32).min(iw);
    let top = ((rect.y - origin.y).round().max(0.0) as u32).min(ih);
    let right = ((rect.max_x() - origin.x).round().max(0.0) as u32).clamp(left, iw);
    let bottom = ((rect.max_y() - origin.y).round().max(0.0) as u32).clamp(top, ih);
    imageops::crop_imm(image, left, top, right - left, bottom - top).to_image()
}

/// Cut one half out of a composite part.
///
/// The new part is named `name`, sits at the split rect's top-left and
/// records the composite as its mother. A composite whose image has not
/// arrived yet yields a part with only geometry; the rig re-crops it later.
pub fn split_part(name: &str, composite: &Part, mid_joint: &Joint, side: Side, half: Half) -> Part {
    let rect = split_rect(composite.bounds(), mid_joint.bounds(), side, half);
    let part = match composite.image() {
        Some(image) => {
            let cropped = crop_image(image, composite.origin(), rect);
            Part::with_image(name, rect.min(), Arc::new(cropped))
        }
        None => Part::new(name, rect.min(), rect.size()),
    };
    part.with_mother(composite.name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec2;
    use image::Rgba;

    fn joint_at(x: f64, y: f64) -> Rect {
        Rect::new(x, y, 23.0, 23.0)
    }

    #[test]
    fn test_thin_limb_splits_horizontally() {
        let part = Rect::new(100.0, 100.0, 30.0, 200.0);
        let joint = joint_at(105.0, 190.0);
        let top = split_rect(part, joint, Side::Right, Half::Top);
        let bottom = split_rect(part, joint, Side::Right, Half::Bottom);
        assert_eq!(top, Rect::new(100.0, 100.0, 30.0, 113.0));
        assert_eq!(bottom, Rect::new(100.0, 190.0, 30.0, 110.0));
        assert_eq!(top.union(&bottom), part);
    }

    #[test]
    fn test_wide_limb_splits_vertically() {
        let part = Rect::new(0.0, 0.0, 200.0, 40.0);
        let joint = joint_at(90.0, 10.0);
        let top = split_rect(part, joint, Side::Left, Half::Top);
        let bottom = split_rect(part, joint, Side::Left, Half::Bottom);
        assert_eq!(top, Rect::new(0.0, 0.0, 113.0, 40.0));
        assert_eq!(bottom, Rect::new(90.0, 0.0, 110.0, 40.0));
        assert_eq!(top.union(&bottom), part);
    }

    #[test]
    fn test_diagonal_split_is_mirrored() {
        let part = Rect::new(0.0, 0.0, 100.0, 120.0);
        let joint = joint_at(40.0, 50.0);

        let r_top = split_rect(part, joint, Side::Right, Half::Top);
        let r_btm = split_rect(part, joint, Side::Right, Half::Bottom);
        assert_eq!(r_top, Rect::new(40.0, 0.0, 60.0, 73.0));
        assert_eq!(r_btm, Rect::new(0.0, 50.0, 63.0, 70.0));
        assert_eq!(r_top.union(&r_btm), part);

        let l_top = split_rect(part, joint, Side::Left, Half::Top);
        let l_btm = split_rect(part, joint, Side::Left, Half::Bottom);
        assert_eq!(l_top, Rect::new(0.0, 0.0, 63.0, 73.0));
        assert_eq!(l_btm, Rect::new(40.0, 50.0, 60.0, 70.0));
        assert_eq!(l_top.union(&l_btm), part);
    }

    #[test]
    fn test_split_is_deterministic() {
        let part = Rect::new(12.5, 7.25, 80.0, 90.0);
        let joint = joint_at(50.0, 40.0);
        let a = split_rect(part, joint, Side::Right, Half::Bottom);
        let b = split_rect(part, joint, Side::Right, Half::Bottom);
        assert_eq!(a, b);
    }

    #[test]
    fn test_joint_outside_is_clamped() {
        let part = Rect::new(0.0, 0.0, 30.0, 200.0);
        let joint = joint_at(0.0, 190.0);
        let top = split_rect(part, joint, Side::Right, Half::Top);
        assert_eq!(top.max_y(), 200.0);
    }

    #[test]
    fn test_split_part_crops_image() {
        let image = RgbaImage::from_fn(100, 120, |x, y| Rgba([x as u8, y as u8, 0, 255]));
        let composite = Part::with_image("RArm", DVec2::new(10.0, 20.0), Arc::new(image));
        let joint = Joint::new("RArmMidJoint", DVec2::new(50.0, 70.0));

        let top = split_part("RArmTop", &composite, &joint, Side::Right, Half::Top);
        assert_eq!(top.mother(), Some("RArm"));
        assert_eq!(top.origin(), DVec2::new(50.0, 20.0));
        let img = top.image().unwrap();
        assert_eq!(img.dimensions(), (60, 73));
        // First pixel of the crop comes from image column 40
        assert_eq!(img.get_pixel(0, 0)[0], 40);
    }

    #[test]
    fn test_split_part_without_image() {
        let composite = Part::new("LLeg", DVec2::ZERO, DVec2::new(30.0, 200.0));
        let joint = Joint::new("LLegMidJoint", DVec2::new(5.0, 100.0));
        let bottom = split_part("LLegBtm", &composite, &joint, Side::Left, Half::Bottom);
        assert!(!bottom.is_loaded());
        assert_eq!(bottom.bounds(), Rect::new(0.0, 100.0, 30.0, 100.0));
    }
}
