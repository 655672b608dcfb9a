// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanning pipeline — page outline detection and perspective normalization
// for photographed sheet music.

pub mod contour;
pub mod normalize;
pub mod transform;

pub use normalize::{NormalizedPage, PageNormalizer};
