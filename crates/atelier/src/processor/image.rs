use std::io::Cursor;
use std::path::Path;

use image::{imageops::FilterType, DynamicImage, GenericImageView, ImageFormat};

use crate::error::{ConversionError, ThumbnailError};
use crate::processor::ladder::fit_longest_edge;

/// Raster codec used by the pipeline: probing, WebP conversion and resizing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageProcessor;

impl ImageProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Width and height read from the file header.
    pub fn dimensions(&self, path: &Path) -> Result<(u32, u32), ThumbnailError> {
        image::image_dimensions(path).map_err(|e| ThumbnailError::Dimensions {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Decodes `path` and re-encodes it as lossless WebP.
    pub fn convert_to_webp(&self, path: &Path) -> Result<Vec<u8>, ConversionError> {
        let _span = tracing::info_span!("processor.convert_webp").entered();

        let img = image::open(path).map_err(|e| ConversionError::Decode {
            path: path.to_path_buf(),
            source: e,
        })?;

        encode(&img, ImageFormat::WebP).map_err(|e| ConversionError::Encode {
            format: "webp".to_string(),
            source: e,
        })
    }

    pub fn open(&self, path: &Path) -> Result<DynamicImage, ThumbnailError> {
        image::open(path).map_err(|e| ThumbnailError::Decode {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Resizes `source` so its longest edge is `size` and encodes the result
    /// in `format`.
    pub fn thumbnail(
        &self,
        source: &DynamicImage,
        size: u32,
        format: ImageFormat,
    ) -> Result<Vec<u8>, ThumbnailError> {
        let (width, height) = source.dimensions();
        let (new_width, new_height) = fit_longest_edge(width, height, size);

        let resized = source.resize_exact(new_width, new_height, FilterType::Lanczos3);
        encode(&resized, format).map_err(|e| ThumbnailError::Encode { size, source: e })
    }
}

/// Output format for a lower-cased file extension.
pub fn format_for_extension(extension: &str) -> Option<ImageFormat> {
    match extension {
        "png" => Some(ImageFormat::Png),
        "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
        "webp" => Some(ImageFormat::WebP),
        _ => None,
    }
}

fn encode(img: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, image::ImageError> {
    // JPEG has no alpha channel; the WebP encoder only takes 8-bit input.
    let prepared = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8()),
        _ if img.color().has_alpha() => DynamicImage::ImageRgba8(img.to_rgba8()),
        _ => DynamicImage::ImageRgb8(img.to_rgb8()),
    };

    let mut buffer = Cursor::new(Vec::new());
    prepared.write_to(&mut buffer, format)?;
    Ok(buffer.into_inner())
}
