// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Contour extraction, polygon approximation and page-boundary selection.

use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};
use imageproc::geometry::{approximate_polygon_dp, arc_length, contour_area};
use imageproc::point::Point as PixelPoint;
use tracing::debug;

/// A point in image coordinates.
pub type Point = (f32, f32);

/// Four corners of a detected page, in contour order.
pub type Quad = [Point; 4];

/// A traced border, in pixel coordinates.
pub type Contour = Vec<PixelPoint<i32>>;

/// Only this many of the largest contours are considered.
pub const MAX_CANDIDATES: usize = 5;

/// Polygon approximation tolerance as a fraction of the contour perimeter.
pub const APPROX_TOLERANCE: f64 = 0.02;

/// Extract the external borders of a binary edge map.
///
/// Non-zero pixels are foreground. Only top-level outer borders are kept:
/// hole borders and anything nested inside another loop are dropped, so a
/// framed box drawn on the page never competes with the page itself.
pub fn outer_contours(edges: &GrayImage) -> Vec<Contour> {
    find_contours::<i32>(edges)
        .into_iter()
        .filter(|contour| contour.border_type == BorderType::Outer && contour.parent.is_none())
        .map(|contour| contour.points)
        .collect()
}

/// Pick the page boundary from a set of contours.
///
/// Contours are ranked by enclosed area (largest first, stable for ties) and
/// at most [`MAX_CANDIDATES`] are examined. The first whose approximated
/// polygon has exactly four vertices wins.
pub fn select_page_boundary(contours: &[Contour]) -> Option<Quad> {
    let mut ranked: Vec<(f64, &Contour)> = contours
        .iter()
        .map(|points| (contour_area(points), points))
        .collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

    for (rank, (area, points)) in ranked.into_iter().take(MAX_CANDIDATES).enumerate() {
        let epsilon = APPROX_TOLERANCE * arc_length(points, true);
        let approx = approximate_polygon(points, epsilon);
        debug!(rank, area, vertices = approx.len(), "Boundary candidate");
        if let [a, b, c, d] = approx[..] {
            return Some([a, b, c, d].map(|p| (p.x as f32, p.y as f32)));
        }
    }
    None
}

/// Douglas–Peucker approximation of a closed curve.
///
/// The curve is split at two mutually distant points so that neither split
/// point falls in the middle of a straight side; each half is simplified
/// as an open chain and the halves are joined.
pub fn approximate_polygon(points: &[PixelPoint<i32>], epsilon: f64) -> Contour {
    if points.len() <= 3 || epsilon <= 0.0 {
        return points.to_vec();
    }

    let a = farthest_from(points, points[0]);
    let b = farthest_from(points, points[a]);
    if a == b {
        // Every point coincides.
        return vec![points[a]];
    }
    let (lo, hi) = (a.min(b), a.max(b));

    let second: Contour = points[hi..]
        .iter()
        .chain(points[..=lo].iter())
        .copied()
        .collect();

    let mut polygon = approximate_polygon_dp(&points[lo..=hi], epsilon, false);
    polygon.pop();
    let mut rest = approximate_polygon_dp(&second, epsilon, false);
    rest.pop();
    polygon.extend(rest);
    polygon
}

fn farthest_from(points: &[PixelPoint<i32>], origin: PixelPoint<i32>) -> usize {
    let mut best = 0;
    let mut best_dist = 0i64;
    for (i, p) in points.iter().enumerate() {
        let (dx, dy) = ((p.x - origin.x) as i64, (p.y - origin.y) as i64);
        let d = dx * dx + dy * dy;
        if d > best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}
