/// Capture Engine
///
/// Reads the rendered bitmap back from a render surface, downscales it into
/// the configured bounding box, and encodes it once. The preview data URL and
/// the binary payload are built from the same encoded bytes, so they always
/// decode to identical pixels.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{imageops::FilterType, DynamicImage, ExtendedColorType, ImageEncoder, RgbaImage};

use super::format::OutputFormat;
use super::surface::RenderSurface;
use crate::config::{Dimensions, Quality};
use crate::error::CaptureError;

/// Encoded image bytes plus their MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl Blob {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Bitmap read back from a surface
#[derive(Debug, Clone)]
pub struct PixelSource {
    pub pixels: RgbaImage,
    /// True when the surface had no bitmap and a blank one was fabricated
    pub blank_fallback: bool,
}

/// Result of one capture
#[derive(Debug, Clone)]
pub struct CaptureOutput {
    /// `data:` URL for previews
    pub data_url: String,
    /// Binary payload for persistence
    pub blob: Blob,
    /// Size actually encoded, after any downscale
    pub final_dimensions: Dimensions,
    /// The output is an empty image, see `PixelSource::blank_fallback`
    pub blank_fallback: bool,
}

/// Locate the rendered bitmap of `surface`
///
/// A surface with no bitmap yields a blank (fully transparent) one sized to
/// its visible bounds. Callers must treat that output as an empty image.
pub fn resolve_pixel_source(surface: &dyn RenderSurface) -> PixelSource {
    match surface.pixel_buffer() {
        Some(pixels) => PixelSource {
            pixels,
            blank_fallback: false,
        },
        None => {
            let bounds = surface.visible_bounds();
            tracing::warn!(
                width = bounds.width,
                height = bounds.height,
                "no rendered bitmap on surface, capturing a blank image"
            );
            PixelSource {
                pixels: RgbaImage::new(bounds.width, bounds.height),
                blank_fallback: true,
            }
        }
    }
}

/// Size after fitting `source` into `max` with one uniform scale factor
///
/// No resampling happens when there is no maximum or both sides already fit.
/// Otherwise the limiting side lands exactly on its maximum and the other one
/// is floored.
pub fn fit_within(source: Dimensions, max: Option<Dimensions>) -> Dimensions {
    let Some(max) = max else {
        return source;
    };
    if source.is_empty() || (source.width <= max.width && source.height <= max.height) {
        return source;
    }

    let (w, h) = (source.width as u64, source.height as u64);
    let (max_w, max_h) = (max.width as u64, max.height as u64);

    // Compare max_w / w against max_h / h without floating point
    if max_w * h <= max_h * w {
        Dimensions::new(max.width, (h * max_w / w) as u32)
    } else {
        Dimensions::new((w * max_h / h) as u32, max.height)
    }
}

/// Capture the current output of `surface`
pub fn capture(
    surface: &dyn RenderSurface,
    mime: &str,
    quality: Quality,
    max_dimensions: Option<Dimensions>,
) -> Result<CaptureOutput, CaptureError> {
    capture_pixels(resolve_pixel_source(surface), mime, quality, max_dimensions)
}

/// Downscale and encode an already resolved bitmap
///
/// This is the CPU-heavy half of `capture`; the session runs it on a blocking
/// worker after reading the pixels off the surface.
pub fn capture_pixels(
    source: PixelSource,
    mime: &str,
    quality: Quality,
    max_dimensions: Option<Dimensions>,
) -> Result<CaptureOutput, CaptureError> {
    let format = OutputFormat::from_mime(mime)?;
    if !format.supports_quality() {
        tracing::debug!(mime = format.mime(), quality = quality.percent(), "lossless format, quality ignored");
    }

    let (width, height) = source.pixels.dimensions();
    let native = Dimensions::new(width, height);
    let target = fit_within(native, max_dimensions);

    let pixels = if target == native {
        source.pixels
    } else {
        if target.is_empty() {
            return Err(CaptureError::encoding(
                format.mime(),
                format!("downscaling {}x{} leaves no pixels", width, height),
            ));
        }
        tracing::debug!(
            from_width = width,
            from_height = height,
            to_width = target.width,
            to_height = target.height,
            "downscaling capture"
        );
        image::imageops::resize(&source.pixels, target.width, target.height, FilterType::Lanczos3)
    };

    let bytes = encode(&pixels, format, quality)?;
    let data_url = data_url(format.mime(), &bytes);

    Ok(CaptureOutput {
        data_url,
        blob: Blob {
            bytes,
            mime: format.mime().to_string(),
        },
        final_dimensions: target,
        blank_fallback: source.blank_fallback,
    })
}

/// Build a base64 `data:` URL
pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, BASE64_STANDARD.encode(bytes))
}

/// JPEG quality (1-100) from the encoder fraction
fn jpeg_quality(fraction: f32) -> u8 {
    (fraction * 100.0).round().clamp(1.0, 100.0) as u8
}

fn encode(pixels: &RgbaImage, format: OutputFormat, quality: Quality) -> Result<Vec<u8>, CaptureError> {
    let (width, height) = pixels.dimensions();
    if width == 0 || height == 0 {
        return Err(CaptureError::encoding(format.mime(), "surface has zero area"));
    }

    let mut bytes = Vec::new();
    let result = match format {
        OutputFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgba8(pixels.clone()).to_rgb8();
            JpegEncoder::new_with_quality(&mut bytes, jpeg_quality(quality.as_fraction()))
                .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
        }
        OutputFormat::Png => PngEncoder::new(&mut bytes).write_image(
            pixels.as_raw(),
            width,
            height,
            ExtendedColorType::Rgba8,
        ),
        OutputFormat::WebP => WebPEncoder::new_lossless(&mut bytes).write_image(
            pixels.as_raw(),
            width,
            height,
            ExtendedColorType::Rgba8,
        ),
    };
    result.map_err(|e| CaptureError::encoding(format.mime(), e.to_string()))?;

    if bytes.is_empty() {
        return Err(CaptureError::encoding(format.mime(), "encoder produced no data"));
    }
    Ok(bytes)
}
