//! Ink export to PNG/JPEG.
//!
//! The ink layer is transparent. Exports flatten it over opaque white so the
//! downstream recognizer receives a photograph-like image.

use base64::Engine;
use image::ImageEncoder;
use serde::Serialize;
use tiny_skia::Pixmap;

use crate::error::{RenderError, RenderResult};

/// Default JPEG quality for exports.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Export output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ImageFormat {
    /// Lossless PNG.
    #[default]
    Png,
    /// JPEG at the given quality (1-100).
    Jpeg {
        /// Encoder quality.
        quality: u8,
    },
}

impl ImageFormat {
    /// JPEG at [`DEFAULT_JPEG_QUALITY`].
    pub const JPEG: Self = Self::Jpeg {
        quality: DEFAULT_JPEG_QUALITY,
    };

    /// MIME type of the encoded bytes.
    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg { .. } => "image/jpeg",
        }
    }

    /// Conventional file extension.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg { .. } => "jpg",
        }
    }
}

/// An encoded image ready for transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedImage {
    /// Encoding of `bytes`.
    pub format: ImageFormat,
    /// Width in physical pixels.
    pub width: u32,
    /// Height in physical pixels.
    pub height: u32,
    /// Encoded image data.
    pub bytes: Vec<u8>,
}

impl ExportedImage {
    /// Wrap already-encoded PNG or JPEG bytes, e.g. read from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a decodable PNG or JPEG.
    pub fn from_encoded(bytes: Vec<u8>) -> RenderResult<Self> {
        let format = match image::guess_format(&bytes) {
            Ok(image::ImageFormat::Png) => ImageFormat::Png,
            Ok(image::ImageFormat::Jpeg) => ImageFormat::JPEG,
            Ok(other) => {
                return Err(RenderError::Export(format!(
                    "Unsupported image format: {other:?}"
                )))
            }
            Err(e) => return Err(RenderError::Export(format!("Unknown image format: {e}"))),
        };

        let decoded = image::load_from_memory(&bytes)
            .map_err(|e| RenderError::Export(format!("Failed to decode image: {e}")))?;

        Ok(Self {
            format,
            width: decoded.width(),
            height: decoded.height(),
            bytes,
        })
    }

    /// Parse a `data:image/...;base64,` URL as produced by a browser canvas.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is malformed or the payload is not a
    /// decodable PNG or JPEG.
    pub fn from_data_url(url: &str) -> RenderResult<Self> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| RenderError::Export("Not a data URL".to_string()))?;
        let (metadata, encoded) = rest
            .split_once(',')
            .ok_or_else(|| RenderError::Export("Invalid data URL: missing comma".to_string()))?;
        if !metadata.ends_with(";base64") {
            return Err(RenderError::Export(
                "Only base64 data URLs are supported".to_string(),
            ));
        }

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| RenderError::Export(format!("Failed to decode base64: {e}")))?;
        Self::from_encoded(bytes)
    }

    /// MIME type of the encoded bytes.
    #[must_use]
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// Base64 of the encoded bytes (standard alphabet, padded).
    #[must_use]
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }

    /// `data:` URL of the encoded bytes.
    #[must_use]
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type(), self.to_base64())
    }
}

/// Flatten a premultiplied RGBA pixmap over opaque white into packed RGB.
///
/// With premultiplied channels, `src over white` is `c + (255 - a)`, which
/// never exceeds 255 because `c <= a`.
#[must_use]
pub fn flatten_on_white(pixmap: &Pixmap) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(pixmap.data().len() / 4 * 3);
    for pixel in pixmap.data().chunks_exact(4) {
        let inv = 255 - pixel[3];
        rgb.push(pixel[0].saturating_add(inv));
        rgb.push(pixel[1].saturating_add(inv));
        rgb.push(pixel[2].saturating_add(inv));
    }
    rgb
}

/// Encode a pixmap over white in the requested format.
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn encode(pixmap: &Pixmap, format: ImageFormat) -> RenderResult<ExportedImage> {
    let (width, height) = (pixmap.width(), pixmap.height());
    let rgb = flatten_on_white(pixmap);

    let mut buf = std::io::Cursor::new(Vec::new());
    match format {
        ImageFormat::Png => {
            let encoder = image::codecs::png::PngEncoder::new(&mut buf);
            encoder
                .write_image(&rgb, width, height, image::ColorType::Rgb8.into())
                .map_err(|e| RenderError::Export(format!("PNG encoding failed: {e}")))?;
        }
        ImageFormat::Jpeg { quality } => {
            let encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
            encoder
                .write_image(&rgb, width, height, image::ColorType::Rgb8.into())
                .map_err(|e| RenderError::Export(format!("JPEG encoding failed: {e}")))?;
        }
    }

    tracing::debug!(
        width,
        height,
        mime = format.mime_type(),
        "Encoded surface export"
    );

    Ok(ExportedImage {
        format,
        width,
        height,
        bytes: buf.into_inner(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn half_ink_pixmap() -> Pixmap {
        let mut pixmap = Pixmap::new(4, 2).expect("pixmap");
        // Left half: opaque slate ink. Right half: transparent.
        for (i, px) in pixmap.pixels_mut().iter_mut().enumerate() {
            if i % 4 < 2 {
                *px = tiny_skia::PremultipliedColorU8::from_rgba(0x1e, 0x29, 0x3b, 255)
                    .expect("valid premultiplied");
            }
        }
        pixmap
    }

    #[test]
    fn test_flatten_transparent_becomes_white() {
        let pixmap = Pixmap::new(2, 2).expect("pixmap");
        assert!(flatten_on_white(&pixmap).iter().all(|&b| b == 255));
    }

    #[test]
    fn test_flatten_keeps_opaque_ink() {
        let rgb = flatten_on_white(&half_ink_pixmap());
        assert_eq!(&rgb[0..3], &[0x1e, 0x29, 0x3b]);
        assert_eq!(&rgb[6..9], &[255, 255, 255]);
    }

    #[test]
    fn test_flatten_half_alpha_blends_toward_white() {
        let mut pixmap = Pixmap::new(1, 1).expect("pixmap");
        pixmap.pixels_mut()[0] =
            tiny_skia::PremultipliedColorU8::from_rgba(0, 0, 0, 128).expect("valid premultiplied");
        assert_eq!(flatten_on_white(&pixmap), vec![127, 127, 127]);
    }

    #[test]
    fn test_png_export_is_opaque_and_sized() {
        let image = encode(&half_ink_pixmap(), ImageFormat::Png).expect("png");
        assert_eq!(&image.bytes[..4], &[0x89, b'P', b'N', b'G']);
        assert_eq!((image.width, image.height), (4, 2));

        let decoded = image::load_from_memory(&image.bytes).expect("decode");
        assert!(!decoded.color().has_alpha());
        assert_eq!(decoded.width(), 4);
    }

    #[test]
    fn test_jpeg_export_magic() {
        let image = encode(&half_ink_pixmap(), ImageFormat::JPEG).expect("jpeg");
        assert_eq!(&image.bytes[..2], &[0xFF, 0xD8]);
        assert_eq!(image.mime_type(), "image/jpeg");
    }

    #[test]
    fn test_data_url_round_trip() {
        let image = encode(&half_ink_pixmap(), ImageFormat::Png).expect("png");
        let url = image.to_data_url();
        assert!(url.starts_with("data:image/png;base64,"));

        let parsed = ExportedImage::from_data_url(&url).expect("parse");
        assert_eq!(parsed, image);
    }

    #[test]
    fn test_from_data_url_rejects_garbage() {
        assert!(ExportedImage::from_data_url("http://example.com/a.png").is_err());
        assert!(ExportedImage::from_data_url("data:image/png;base64").is_err());
        assert!(ExportedImage::from_data_url("data:text/plain,hello").is_err());
    }
}
