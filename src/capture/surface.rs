/// Render surface capability
///
/// The editor never paints pixels itself. It talks to whatever renderer is
/// attached through `RenderSurface`: mount a source image, apply adjustments,
/// and hand back the currently rendered bitmap when a save captures it.
///
/// `RasterSurface` is the CPU renderer built on the `image` crate. It keeps the
/// source bitmap untouched and re-renders from it whenever the adjustment list
/// changes.

use image::{DynamicImage, RgbaImage};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::config::Dimensions;
use crate::error::SurfaceError;
use crate::state::edit::{EditOperation, Transform, COLOR_ADJUSTMENT, TRANSFORM};

/// A live rendering target the editor can mount, adjust and read back
pub trait RenderSurface: Send {
    /// Bind the surface to a source image and output format
    fn mount(&mut self, source_url: &str, output_mime: Option<&str>) -> Result<(), SurfaceError>;

    /// The rendered bitmap, if the surface currently holds one
    fn pixel_buffer(&self) -> Option<RgbaImage>;

    /// Size of the surface as laid out on screen
    fn visible_bounds(&self) -> Dimensions;

    /// Composite one more adjustment onto the rendered output
    fn apply_adjustment(&mut self, operation: &EditOperation) -> Result<(), SurfaceError>;

    /// Drop all adjustments, showing the source again
    fn clear_adjustments(&mut self) -> Result<(), SurfaceError> {
        Ok(())
    }
}

/// Where the source bitmap of a `RasterSurface` comes from
#[derive(Debug, Clone)]
enum Source {
    /// Already decoded
    Decoded(DynamicImage),
    /// Encoded bytes, decoded at mount time
    Encoded(Vec<u8>),
    /// No bitmap at all
    Missing,
}

/// CPU render surface backed by an in-memory bitmap
#[derive(Debug, Clone)]
pub struct RasterSurface {
    source: Source,
    rendered: Option<DynamicImage>,
    adjustments: Vec<EditOperation>,
    bounds: Dimensions,
    mounted_url: Option<String>,
}

impl RasterSurface {
    /// Surface showing an already decoded image
    pub fn from_image(image: DynamicImage) -> Self {
        let bounds = Dimensions::new(image.width(), image.height());
        Self {
            source: Source::Decoded(image),
            rendered: None,
            adjustments: Vec::new(),
            bounds,
            mounted_url: None,
        }
    }

    /// Surface that decodes `bytes` when mounted
    pub fn from_bytes(bytes: Vec<u8>, bounds: Dimensions) -> Self {
        Self {
            source: Source::Encoded(bytes),
            rendered: None,
            adjustments: Vec::new(),
            bounds,
            mounted_url: None,
        }
    }

    /// Surface with a layout size but no bitmap to read back
    pub fn without_bitmap(bounds: Dimensions) -> Self {
        Self {
            source: Source::Missing,
            rendered: None,
            adjustments: Vec::new(),
            bounds,
            mounted_url: None,
        }
    }

    pub fn mounted_url(&self) -> Option<&str> {
        self.mounted_url.as_deref()
    }

    pub fn adjustment_count(&self) -> usize {
        self.adjustments.len()
    }

    fn render(&mut self) {
        let Source::Decoded(source) = &self.source else {
            self.rendered = None;
            return;
        };

        let mut image = source.clone();

        // Transforms stack in the order they were applied
        for transform in self.adjustments.iter().filter_map(EditOperation::as_transform) {
            image = match transform {
                Transform::RotateClockwise => image.rotate90(),
                Transform::FlipHorizontal => image.fliph(),
                Transform::FlipVertical => image.flipv(),
            };
        }

        // Sliders carry absolute values, only the latest one counts
        let mut sliders: BTreeMap<&str, i64> = BTreeMap::new();
        for op in self.adjustments.iter().filter(|op| op.kind == COLOR_ADJUSTMENT) {
            for (name, value) in &op.parameters {
                if let Some(value) = value.as_i64() {
                    sliders.insert(name.as_str(), value);
                }
            }
        }

        if let Some(&brightness) = sliders.get("brightness") {
            image = image.brighten(brightness.clamp(-100, 100) as i32);
        }
        if let Some(&contrast) = sliders.get("contrast") {
            image = image.adjust_contrast(contrast.clamp(-100, 100) as f32);
        }
        if let Some(&blur) = sliders.get("blur") {
            if blur > 0 {
                image = image.blur(blur.clamp(0, 100) as f32 / 10.0);
            }
        }
        if sliders.contains_key("saturation") {
            tracing::debug!("saturation is recorded but not rendered by the raster surface");
        }

        self.rendered = Some(image);
    }
}

impl RenderSurface for RasterSurface {
    fn mount(&mut self, source_url: &str, output_mime: Option<&str>) -> Result<(), SurfaceError> {
        if source_url.trim().is_empty() {
            return Err(SurfaceError::Initialization("no source image url".to_string()));
        }

        if let Source::Encoded(bytes) = &self.source {
            let decoded = image::load_from_memory(bytes)
                .map_err(|e| SurfaceError::ImageDecode(e.to_string()))?;
            self.source = Source::Decoded(decoded);
        }

        tracing::debug!(source_url, ?output_mime, "mounted raster surface");
        self.mounted_url = Some(source_url.to_string());
        self.render();
        Ok(())
    }

    fn pixel_buffer(&self) -> Option<RgbaImage> {
        self.rendered.as_ref().map(DynamicImage::to_rgba8)
    }

    fn visible_bounds(&self) -> Dimensions {
        self.bounds
    }

    fn apply_adjustment(&mut self, operation: &EditOperation) -> Result<(), SurfaceError> {
        match operation.kind.as_str() {
            COLOR_ADJUSTMENT => {
                if let Some((name, _)) = operation.parameters.iter().find(|(_, v)| !v.is_number()) {
                    return Err(SurfaceError::Adjustment(format!(
                        "{} expects a numeric value",
                        name
                    )));
                }
            }
            TRANSFORM => {
                if operation.as_transform().is_none() {
                    let requested = operation
                        .parameters
                        .get("operation")
                        .cloned()
                        .unwrap_or(Value::Null);
                    return Err(SurfaceError::Adjustment(format!(
                        "unknown transform {}",
                        requested
                    )));
                }
            }
            // Export settings do not change pixels
            _ => return Ok(()),
        }

        self.adjustments.push(operation.clone());
        self.render();
        Ok(())
    }

    fn clear_adjustments(&mut self) -> Result<(), SurfaceError> {
        self.adjustments.clear();
        self.render();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::io::Cursor;

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 10) as u8, (y * 10) as u8, 128, 255])
        }))
    }

    #[test]
    fn test_no_pixels_before_mount() {
        let surface = RasterSurface::from_image(gradient(4, 2));
        assert!(surface.pixel_buffer().is_none());
        assert_eq!(surface.visible_bounds(), Dimensions::new(4, 2));
    }

    #[test]
    fn test_mount_renders_source() {
        let mut surface = RasterSurface::from_image(gradient(4, 2));
        surface.mount("photo.png", None).unwrap();

        let pixels = surface.pixel_buffer().unwrap();
        assert_eq!(pixels.dimensions(), (4, 2));
        assert_eq!(surface.mounted_url(), Some("photo.png"));
    }

    #[test]
    fn test_mount_requires_url() {
        let mut surface = RasterSurface::from_image(gradient(1, 1));
        let err = surface.mount("", None).unwrap_err();
        assert!(matches!(err, SurfaceError::Initialization(_)));
    }

    #[test]
    fn test_mount_decodes_bytes() {
        let mut bytes = Vec::new();
        gradient(3, 5)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let mut surface = RasterSurface::from_bytes(bytes, Dimensions::new(300, 500));
        surface.mount("photo.png", None).unwrap();
        assert_eq!(surface.pixel_buffer().unwrap().dimensions(), (3, 5));
        assert_eq!(surface.visible_bounds(), Dimensions::new(300, 500));
    }

    #[test]
    fn test_mount_rejects_garbage_bytes() {
        let mut surface = RasterSurface::from_bytes(vec![1, 2, 3], Dimensions::new(1, 1));
        let err = surface.mount("photo.png", None).unwrap_err();
        assert!(matches!(err, SurfaceError::ImageDecode(_)));
    }

    #[test]
    fn test_rotate_is_non_destructive() {
        let mut surface = RasterSurface::from_image(gradient(4, 2));
        surface.mount("photo.png", None).unwrap();

        surface
            .apply_adjustment(&EditOperation::transform(Transform::RotateClockwise))
            .unwrap();
        assert_eq!(surface.pixel_buffer().unwrap().dimensions(), (2, 4));

        surface.clear_adjustments().unwrap();
        assert_eq!(surface.pixel_buffer().unwrap().dimensions(), (4, 2));
        assert_eq!(surface.adjustment_count(), 0);
    }

    #[test]
    fn test_brightness_uses_latest_value() {
        let black = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255])));
        let mut surface = RasterSurface::from_image(black);
        surface.mount("black.png", None).unwrap();

        surface
            .apply_adjustment(&EditOperation::color_adjustment("brightness", 80))
            .unwrap();
        surface
            .apply_adjustment(&EditOperation::color_adjustment("brightness", 20))
            .unwrap();

        assert_eq!(surface.pixel_buffer().unwrap().get_pixel(0, 0).0, [20, 20, 20, 255]);
    }

    #[test]
    fn test_rejects_bad_adjustments() {
        let mut surface = RasterSurface::from_image(gradient(1, 1));
        let mut op = EditOperation::color_adjustment("brightness", 1);
        op.parameters.insert("brightness".to_string(), Value::from("bright"));
        assert!(surface.apply_adjustment(&op).is_err());

        let mut op = EditOperation::transform(Transform::FlipVertical);
        op.parameters.insert("operation".to_string(), Value::from("spin"));
        assert!(surface.apply_adjustment(&op).is_err());

        assert_eq!(surface.adjustment_count(), 0);
    }

    #[test]
    fn test_without_bitmap_has_no_pixels() {
        let mut surface = RasterSurface::without_bitmap(Dimensions::new(10, 10));
        surface.mount("photo.png", None).unwrap();
        assert!(surface.pixel_buffer().is_none());
    }
}
