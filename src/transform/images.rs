// src/transform/images.rs

//! Lossless-ish raster optimisation with the `image` crate.
//!
//! PNGs are re-encoded at the best compression level, JPEGs at a fixed
//! quality. The smaller of the original and re-encoded bytes wins, so the
//! stage never grows a file. Other formats (gif, webp, ico, ...) pass
//! through unchanged; SVGs are handled by [`SvgMinify`](super::SvgMinify).

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ColorType, DynamicImage, ImageEncoder, ImageFormat};
use tracing::debug;

use crate::errors::{PipelineError, Result};
use crate::transform::{map_each, Asset, Transform};

const JPEG_QUALITY: u8 = 85;

#[derive(Debug, Clone)]
pub struct ImageOptimize {
    enabled: bool,
}

impl Default for ImageOptimize {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl ImageOptimize {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    fn reencode(&self, asset: &Asset, format: ImageFormat) -> Result<Option<Vec<u8>>> {
        let decode = |e: image::ImageError| {
            PipelineError::transform(self.name(), &asset.rel_path, format!("decoding image: {e}"))
        };
        let encode = |e: image::ImageError| {
            PipelineError::transform(self.name(), &asset.rel_path, format!("encoding image: {e}"))
        };

        match format {
            ImageFormat::Png => {
                let img = image::load_from_memory_with_format(&asset.contents, format)
                    .map_err(decode)?;
                let mut out = Vec::new();
                encode_png(&img, &mut out).map_err(encode)?;
                Ok(Some(out))
            }
            ImageFormat::Jpeg => {
                let img = image::load_from_memory_with_format(&asset.contents, format)
                    .map_err(decode)?;
                let rgb = img.to_rgb8();
                let mut out = Vec::new();
                JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
                    .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
                    .map_err(encode)?;
                Ok(Some(out))
            }
            _ => Ok(None),
        }
    }
}

fn encode_png(img: &DynamicImage, out: &mut Vec<u8>) -> image::ImageResult<()> {
    let encoder = PngEncoder::new_with_quality(out, CompressionType::Best, FilterType::Adaptive);
    match img {
        DynamicImage::ImageLuma8(buf) => {
            encoder.write_image(buf.as_raw(), buf.width(), buf.height(), ColorType::L8)
        }
        DynamicImage::ImageLumaA8(buf) => {
            encoder.write_image(buf.as_raw(), buf.width(), buf.height(), ColorType::La8)
        }
        DynamicImage::ImageRgb8(buf) => {
            encoder.write_image(buf.as_raw(), buf.width(), buf.height(), ColorType::Rgb8)
        }
        other => {
            let rgba = other.to_rgba8();
            encoder.write_image(rgba.as_raw(), rgba.width(), rgba.height(), ColorType::Rgba8)
        }
    }
}

impl Transform for ImageOptimize {
    fn name(&self) -> &'static str {
        "image-optimize"
    }

    fn apply(&self, assets: Vec<Asset>) -> Result<Vec<Asset>> {
        if !self.enabled {
            return Ok(assets);
        }
        map_each(assets, |asset| {
            let format = match asset.extension().as_deref() {
                Some("png") => ImageFormat::Png,
                Some("jpg") | Some("jpeg") => ImageFormat::Jpeg,
                _ => return Ok(asset),
            };
            match self.reencode(&asset, format)? {
                Some(smaller) if smaller.len() < asset.contents.len() => {
                    debug!(
                        file = ?asset.rel_path,
                        before = asset.contents.len(),
                        after = smaller.len(),
                        "image optimised"
                    );
                    Ok(asset.with_contents(smaller))
                }
                _ => Ok(asset),
            }
        })
    }
}
