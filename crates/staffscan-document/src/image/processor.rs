// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — decoding, lossless quarter-turn rotation, grayscale
// conversion and print-resolution PNG output. Operates on in-memory images
// using the `image` and `png` crates.

use std::path::Path;

use image::{DynamicImage, GrayImage, ImageReader};
use staffscan_core::error::ScanError;
use tracing::{debug, info, instrument};

/// Pixels per metre for a given dots-per-inch value, as stored in PNG `pHYs`.
fn dpi_to_ppm(dpi: u32) -> u32 {
    (dpi as f64 / 0.0254).round() as u32
}

/// Image processing pipeline operating on a single in-memory image.
///
/// Each transformation consumes `self` and returns a new `ImageProcessor`,
/// enabling method chaining.
///
/// ```ignore
/// ImageProcessor::open("page.jpg")?
///     .rotate_clockwise()
///     .save_png_with_dpi("page.png", 300)?;
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Load an image from a file path.
    ///
    /// The format is sniffed from the content, not the extension. Any
    /// failure (missing file, truncated data, unknown format) is reported as
    /// `ScanError::ImageRead`.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ScanError> {
        let path = path.as_ref();
        let to_read_error = |reason: String| ScanError::ImageRead {
            path: path.to_path_buf(),
            reason,
        };
        let img = ImageReader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|err| to_read_error(err.to_string()))?
            .decode()
            .map_err(|err| to_read_error(err.to_string()))?;
        info!(width = img.width(), height = img.height(), "Image loaded");
        Ok(Self { image: img })
    }

    /// Create a processor from raw encoded bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, ScanError> {
        let img = image::load_from_memory(data).map_err(|err| ScanError::ImageRead {
            path: "<memory>".into(),
            reason: err.to_string(),
        })?;
        debug!(
            width = img.width(),
            height = img.height(),
            "Image decoded from bytes"
        );
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Consume the processor and return the underlying `DynamicImage`.
    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Transformations ------------------------------------------------------

    /// Rotate by a quarter turn clockwise. Lossless.
    pub fn rotate_clockwise(self) -> Self {
        debug!("Rotating image 90 degrees clockwise");
        Self {
            image: self.image.rotate90(),
        }
    }

    // -- Output ---------------------------------------------------------------

    /// Write the image as an 8-bit grayscale PNG carrying a `pHYs`
    /// resolution tag of `dpi`.
    ///
    /// The tag is metadata only; pixels are not resampled.
    #[instrument(skip_all, fields(path = %path.as_ref().display(), dpi = dpi))]
    pub fn save_png_with_dpi(&self, path: impl AsRef<Path>, dpi: u32) -> Result<(), ScanError> {
        let path = path.as_ref();
        let to_write_error = |reason: String| ScanError::ImageWrite {
            path: path.to_path_buf(),
            reason,
        };
        let bytes = encode_gray_png(&self.image.to_luma8(), dpi)
            .map_err(|err| to_write_error(err.to_string()))?;
        std::fs::write(path, &bytes).map_err(|err| to_write_error(err.to_string()))?;
        info!(bytes = bytes.len(), "Image saved");
        Ok(())
    }
}

/// Encode a grayscale buffer as PNG with physical pixel dimensions set.
pub fn encode_gray_png(gray: &GrayImage, dpi: u32) -> Result<Vec<u8>, png::EncodingError> {
    let ppm = dpi_to_ppm(dpi);
    let mut buffer = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buffer, gray.width(), gray.height());
        encoder.set_color(png::ColorType::Grayscale);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_pixel_dims(Some(png::PixelDimensions {
            xppu: ppm,
            yppu: ppm,
            unit: png::Unit::Meter,
        }));
        let mut writer = encoder.write_header()?;
        writer.write_image_data(gray.as_raw())?;
        writer.finish()?;
    }
    Ok(buffer)
}
