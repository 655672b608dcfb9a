// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Four-point perspective rectification.

use image::{DynamicImage, Rgb, RgbImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use tracing::{debug, warn};

use super::contour::{Point, Quad};

/// Order four corners as `[top_left, top_right, bottom_right, bottom_left]`.
///
/// Top-left has the smallest `x + y` and bottom-right the largest.
/// Top-right has the smallest `y - x` and bottom-left the largest. Ties go
/// to the earliest input point.
pub fn order_points(pts: Quad) -> Quad {
    let pick = |key: fn(&Point) -> f32, largest: bool| -> Point {
        let mut best = pts[0];
        for p in &pts[1..] {
            let better = if largest {
                key(p) > key(&best)
            } else {
                key(p) < key(&best)
            };
            if better {
                best = *p;
            }
        }
        best
    };
    let sum = |p: &Point| p.0 + p.1;
    let diff = |p: &Point| p.1 - p.0;

    [
        pick(sum, false),
        pick(diff, false),
        pick(sum, true),
        pick(diff, true),
    ]
}

/// Size of the rectified output for ordered corners.
///
/// Width is the longer of the top and bottom edges, height the longer of
/// the left and right edges; each edge length is truncated to an integer.
pub fn rectified_size(ordered: &Quad) -> (u32, u32) {
    let [tl, tr, br, bl] = *ordered;
    let len = |a: Point, b: Point| ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt() as u32;
    let width = len(br, bl).max(len(tr, tl));
    let height = len(tr, br).max(len(tl, bl));
    (width, height)
}

/// Warp the quadrilateral `pts` of `image` onto an axis-aligned rectangle.
///
/// Corners map to `(0, 0)`, `(w - 1, 0)`, `(w - 1, h - 1)`, `(0, h - 1)`.
/// Returns `None` for degenerate quadrilaterals (zero-sized output or no
/// solvable projection).
pub fn four_point_transform(image: &DynamicImage, pts: Quad) -> Option<DynamicImage> {
    let ordered = order_points(pts);
    let (width, height) = rectified_size(&ordered);
    if width < 2 || height < 2 {
        warn!(width, height, "Page quadrilateral is degenerate");
        return None;
    }

    let (w, h) = ((width - 1) as f32, (height - 1) as f32);
    let dest: Quad = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)];

    let Some(projection) = Projection::from_control_points(ordered, dest) else {
        warn!(?ordered, "Failed to compute projective transform");
        return None;
    };

    let source = image.to_rgb8();
    let mut output = RgbImage::new(width, height);
    warp_into(
        &source,
        &projection,
        Interpolation::Bilinear,
        Rgb([255u8, 255, 255]),
        &mut output,
    );
    debug!(width, height, "Perspective rectification applied");

    Some(DynamicImage::ImageRgb8(output))
}
