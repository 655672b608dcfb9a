// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page normalization — undo the capture device's rotation, find the sheet of
// paper in the photo, and flatten it to an axis-aligned grayscale rendering
// tagged for print resolution.

use std::path::Path;

use image::{DynamicImage, GrayImage};
use imageproc::edges::canny;
use staffscan_core::error::ScanError;
use tracing::{debug, info, instrument, warn};

use super::contour::{Quad, outer_contours, select_page_boundary};
use super::transform::four_point_transform;
use crate::image::processor::ImageProcessor;

/// Canny hysteresis thresholds for page-edge detection.
pub const CANNY_LOW: f32 = 75.0;
pub const CANNY_HIGH: f32 = 200.0;

/// Resolution tag written into normalized images.
pub const PRINT_DPI: u32 = 300;

/// Rectifies photographed pages for music recognition.
///
/// Construction decodes the input; decoding failures surface as
/// `ScanError::ImageRead` before any geometry work happens. Once decoded,
/// [`PageNormalizer::normalize`] never fails: when no page outline is found
/// the rotated photo is used as-is.
pub struct PageNormalizer {
    /// The raw capture, owned exclusively for the duration of normalization.
    image: DynamicImage,
}

impl PageNormalizer {
    // -- Construction ---------------------------------------------------------

    /// Decode a captured photo from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ScanError> {
        Ok(Self::from_dynamic(ImageProcessor::open(path)?.into_dynamic()))
    }

    /// Decode a captured photo from encoded bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ScanError> {
        Ok(Self::from_dynamic(
            ImageProcessor::from_bytes(data)?.into_dynamic(),
        ))
    }

    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Pipeline -------------------------------------------------------------

    /// Run the full normalization.
    ///
    /// ## Pipeline
    ///
    /// 1. Rotate 90° clockwise (fixed sensor orientation of the capture device)
    /// 2. Grayscale + Canny edge detection (thresholds 75 / 200)
    /// 3. Outer contours, ranked by area, top five examined
    /// 4. First contour approximating to four vertices is the page
    /// 5. Four-point perspective warp onto its bounding rectangle
    /// 6. Grayscale conversion
    #[instrument(skip(self), fields(width = self.image.width(), height = self.image.height()))]
    pub fn normalize(self) -> NormalizedPage {
        info!("Starting page normalization");

        let rotated = ImageProcessor::from_dynamic(self.image)
            .rotate_clockwise()
            .into_dynamic();

        let gray = rotated.to_luma8();
        let boundary = detect_page_boundary(&gray);

        let warped = boundary.and_then(|quad| {
            debug!(?quad, "Found page outline");
            four_point_transform(&rotated, quad)
        });

        let (image, boundary) = match warped {
            Some(page) => {
                info!(
                    width = page.width(),
                    height = page.height(),
                    "Perspective correction applied"
                );
                (page.to_luma8(), boundary)
            }
            None => {
                warn!("No usable 4-point page outline; keeping original framing");
                (gray, None)
            }
        };

        NormalizedPage { image, boundary }
    }
}

/// Locate the page outline in a grayscale image.
pub fn detect_page_boundary(gray: &GrayImage) -> Option<Quad> {
    let edges = canny(gray, CANNY_LOW, CANNY_HIGH);
    let contours = outer_contours(&edges);
    debug!(contours = contours.len(), "Edge contours extracted");
    select_page_boundary(&contours)
}

/// The rectified, grayscale result of [`PageNormalizer::normalize`].
#[derive(Debug, Clone)]
pub struct NormalizedPage {
    image: GrayImage,
    boundary: Option<Quad>,
}

impl NormalizedPage {
    /// Borrow the grayscale page.
    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    pub fn into_image(self) -> GrayImage {
        self.image
    }

    /// The page outline that was rectified, if one was found.
    pub fn boundary(&self) -> Option<Quad> {
        self.boundary
    }

    /// Whether a perspective warp was applied.
    pub fn was_rectified(&self) -> bool {
        self.boundary.is_some()
    }

    /// Write as PNG tagged with [`PRINT_DPI`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ScanError> {
        ImageProcessor::from_dynamic(DynamicImage::ImageLuma8(self.image.clone()))
            .save_png_with_dpi(path, PRINT_DPI)
    }
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};
    use imageproc::drawing::draw_polygon_mut;
    use imageproc::point::Point;

    /// A featureless image has no edges, so the output is the rotated input
    /// converted to grayscale.
    #[test]
    fn blank_photo_passes_through_rotated() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(40, 30, |x, _| {
            Rgb([120, 120, (x % 2) as u8 + 120])
        }));
        let expected = img.rotate90().to_luma8();

        let page = PageNormalizer::from_dynamic(img).normalize();

        assert!(!page.was_rectified());
        assert_eq!(page.image().dimensions(), (30, 40));
        assert_eq!(page.image(), &expected);
    }

    #[test]
    fn small_rgba_no_panic() {
        let img = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            3,
            3,
            image::Rgba([128, 128, 128, 255]),
        ));
        let page = PageNormalizer::from_dynamic(img).normalize();
        assert_eq!(page.image().dimensions(), (3, 3));
    }

    /// A bright sheet on a dark table.
    #[test]
    fn synthetic_sheet_on_table_is_rectified() {
        let (w, h) = (200u32, 300u32);
        let mut img = GrayImage::from_pixel(w, h, Luma([30u8]));
        for y in 50..250 {
            for x in 40..160 {
                img.put_pixel(x, y, Luma([240u8]));
            }
        }

        let page = PageNormalizer::from_dynamic(DynamicImage::ImageLuma8(img)).normalize();

        assert!(page.was_rectified());
        // After the quarter turn the sheet is 200 wide and 120 tall.
        let (out_w, out_h) = page.image().dimensions();
        assert!((out_w as i64 - 200).abs() <= 3, "width {out_w}");
        assert!((out_h as i64 - 120).abs() <= 3, "height {out_h}");
    }

    /// A sheet photographed at an angle is straightened to its own size.
    #[test]
    fn skewed_sheet_is_straightened() {
        let mut img = GrayImage::from_pixel(300, 300, Luma([30u8]));
        let (cos, sin) = (10f32.to_radians().cos(), 10f32.to_radians().sin());
        let corner = |along: f32, across: f32| {
            Point::new(
                (150.0 + along * cos - across * sin).round() as i32,
                (150.0 + along * sin + across * cos).round() as i32,
            )
        };
        let sheet = [
            corner(-80.0, -50.0),
            corner(80.0, -50.0),
            corner(80.0, 50.0),
            corner(-80.0, 50.0),
        ];
        draw_polygon_mut(&mut img, &sheet, Luma([240u8]));

        let page = PageNormalizer::from_dynamic(DynamicImage::ImageLuma8(img)).normalize();

        assert!(page.was_rectified());
        // The long side ends up vertical after the quarter turn.
        let (out_w, out_h) = page.image().dimensions();
        assert!((out_w as i64 - 100).abs() <= 6, "width {out_w}");
        assert!((out_h as i64 - 160).abs() <= 6, "height {out_h}");
    }

    #[test]
    fn unreadable_bytes_fail_before_normalizing() {
        let result = PageNormalizer::from_bytes(&[0u8, 1, 2, 3]);
        assert!(matches!(result, Err(ScanError::ImageRead { .. })));
    }

    #[test]
    fn saved_page_is_grayscale_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.png");
        let page = PageNormalizer::from_dynamic(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            8,
            6,
            Rgb([200, 10, 10]),
        )))
        .normalize();
        page.save(&path).unwrap();

        let reopened = image::open(&path).unwrap();
        assert!(matches!(reopened, DynamicImage::ImageLuma8(_)));
        assert_eq!((reopened.width(), reopened.height()), (6, 8));
    }
}
