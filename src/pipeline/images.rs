//! Image extraction: embedded images → self-describing base64 data URIs.
//!
//! The geometry provider hands over raw payloads with a file extension; this
//! module turns each into `data:<mime>;base64,<payload>`. A payload that
//! cannot be described (empty, unknown format) is skipped on its own; the
//! remaining images of the page are unaffected.

use crate::error::{ExtractorError, PageWarning};
use crate::model::{ImageRef, RawImage};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use tracing::{debug, warn};

/// Formats PDFs embed that the `image` crate does not know.
const EXTRA_MIME_TYPES: &[(&str, &str)] = &[
    ("jpx", "image/jp2"),
    ("jp2", "image/jp2"),
    ("jbig2", "image/jbig2"),
];

/// Turns raw embedded images into [`ImageRef`]s.
///
/// Implementations must be `Send + Sync`: pages are processed on a worker pool.
pub trait ImageExtractor: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    fn encode(&self, image: &RawImage) -> Result<ImageRef, ExtractorError>;

    /// Encode every image of a page, skipping failures individually.
    fn extract_images(&self, page_num: usize, images: &[RawImage]) -> (Vec<ImageRef>, Vec<PageWarning>) {
        let mut refs = Vec::with_capacity(images.len());
        let mut warnings = Vec::new();

        for raw in images {
            match self.encode(raw) {
                Ok(r) => refs.push(r),
                Err(e) => {
                    warn!("Page {}: skipping image '{}': {}", page_num, raw.id, e);
                    warnings.push(PageWarning::ImageExtraction {
                        page: page_num,
                        image_id: raw.id.clone(),
                        detail: e.to_string(),
                    });
                }
            }
        }

        (refs, warnings)
    }
}

/// Default extractor: MIME type from the extension, falling back to sniffing
/// the payload, then base64 with the standard alphabet.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataUriImageExtractor;

impl ImageExtractor for DataUriImageExtractor {
    fn name(&self) -> &str {
        "data-uri"
    }

    fn encode(&self, image: &RawImage) -> Result<ImageRef, ExtractorError> {
        if image.data.is_empty() {
            return Err(ExtractorError::EmptyPayload);
        }

        let (format, mime) = describe(&image.extension, &image.data).ok_or_else(|| {
            ExtractorError::UnknownFormat {
                extension: image.extension.clone(),
            }
        })?;

        let b64 = STANDARD.encode(&image.data);
        debug!("Encoded image '{}' → {} bytes base64", image.id, b64.len());

        Ok(ImageRef {
            format,
            data: format!("data:{};base64,{}", mime, b64),
        })
    }
}

/// `(format tag, mime type)` for a payload.
fn describe(extension: &str, data: &[u8]) -> Option<(String, String)> {
    let ext = extension.trim_start_matches('.').to_ascii_lowercase();

    if let Some(format) = ImageFormat::from_extension(&ext) {
        return Some((ext, format.to_mime_type().to_string()));
    }
    if let Some((tag, mime)) = EXTRA_MIME_TYPES.iter().find(|(e, _)| *e == ext) {
        return Some((tag.to_string(), mime.to_string()));
    }

    let sniffed = image::guess_format(data).ok()?;
    let tag = sniffed.extensions_str().first()?.to_string();
    Some((tag, sniffed.to_mime_type().to_string()))
}

/// Encode a decoded image as PNG bytes.
///
/// PNG is lossless, so re-encoding what pdfium decoded loses nothing.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn png_bytes() -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 255, 255])));
        encode_png(&img).expect("encode should succeed")
    }

    fn raw(id: &str, data: Vec<u8>, ext: &str) -> RawImage {
        RawImage {
            id: id.into(),
            data,
            extension: ext.into(),
        }
    }

    #[test]
    fn png_becomes_data_uri() {
        let bytes = png_bytes();
        let r = DataUriImageExtractor.encode(&raw("i0", bytes.clone(), "png")).unwrap();
        assert_eq!(r.format, "png");
        let payload = r.data.strip_prefix("data:image/png;base64,").expect("png prefix");
        assert_eq!(STANDARD.decode(payload).unwrap(), bytes);
    }

    #[test]
    fn jpeg_extension_maps_to_jpeg_mime() {
        let r = DataUriImageExtractor.encode(&raw("i0", vec![1, 2, 3], "JPG")).unwrap();
        assert!(r.data.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn jpx_is_known_without_the_image_crate() {
        let r = DataUriImageExtractor.encode(&raw("i0", vec![0; 8], "jpx")).unwrap();
        assert_eq!(r.format, "jpx");
        assert!(r.data.starts_with("data:image/jp2;base64,"));
    }

    #[test]
    fn unknown_extension_falls_back_to_sniffing() {
        let r = DataUriImageExtractor.encode(&raw("i0", png_bytes(), "bin")).unwrap();
        assert_eq!(r.format, "png");
    }

    #[test]
    fn failures_are_skipped_individually() {
        let images = vec![
            raw("good", png_bytes(), "png"),
            raw("empty", Vec::new(), "png"),
            raw("mystery", vec![0, 1, 2, 3], "xyz"),
        ];
        let (refs, warnings) = DataUriImageExtractor.extract_images(5, &images);
        assert_eq!(refs.len(), 1);
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().all(|w| w.page() == 5));
        assert!(matches!(
            &warnings[0],
            PageWarning::ImageExtraction { image_id, .. } if image_id == "empty"
        ));
    }
}
