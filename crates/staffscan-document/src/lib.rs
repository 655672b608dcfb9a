// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// staffscan-document — Image handling for the Staffscan recognizer.
//
// Provides image decoding and resolution-tagged PNG output, and the page
// normalizer that straightens a photographed sheet of music before it is
// handed to the recognition engine.

pub mod image;
pub mod scan;

// Re-export the primary structs so callers can use `staffscan_document::PageNormalizer` etc.
pub use crate::image::processor::ImageProcessor;
pub use crate::scan::normalize::{NormalizedPage, PageNormalizer};
