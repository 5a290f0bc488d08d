//! PDF text extraction using lopdf and pdf-extract.

use std::io::Cursor;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use image::{DynamicImage, ImageBuffer, Rgba};
use lopdf::{Dictionary, Document, Object};
use tracing::{debug, trace, warn};

use super::TextExtractor;
use crate::error::{DocumentError, PdfError};

/// Minimum embedded text length below which a PDF is treated as scanned.
const DEFAULT_MIN_TEXT_LENGTH: usize = 50;

/// PDF text extractor.
///
/// Reads embedded text in reading order. When the embedded text is too short
/// and an OCR extractor is attached, embedded page images are OCR'd instead.
#[derive(Clone)]
pub struct PdfTextExtractor {
    min_text_length: usize,
    ocr: Option<Arc<dyn TextExtractor>>,
}

impl PdfTextExtractor {
    /// Create a PDF extractor without OCR fallback.
    pub fn new() -> Self {
        Self {
            min_text_length: DEFAULT_MIN_TEXT_LENGTH,
            ocr: None,
        }
    }

    /// Set the embedded text length below which OCR fallback kicks in.
    pub fn with_min_text_length(mut self, min_text_length: usize) -> Self {
        self.min_text_length = min_text_length;
        self
    }

    /// Attach an OCR extractor for scanned PDFs.
    pub fn with_ocr_fallback(mut self, ocr: Arc<dyn TextExtractor>) -> Self {
        self.ocr = Some(ocr);
        self
    }

    /// Parse the document, decrypting it when it uses an empty password.
    ///
    /// Returns the document and the bytes pdf-extract should read.
    fn load(&self, data: &[u8]) -> Result<(Document, Vec<u8>), PdfError> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        let raw_data = if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            let mut decrypted = Vec::new();
            doc.save_to(&mut decrypted)
                .map_err(|e| PdfError::Parse(format!("failed to save decrypted PDF: {}", e)))?;
            decrypted
        } else {
            data.to_vec()
        };

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        Ok((doc, raw_data))
    }

    fn embedded_text(&self, raw_data: &[u8]) -> Result<String, PdfError> {
        // pdf-extract panics on some malformed content streams.
        panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(raw_data)))
            .map_err(|_| PdfError::TextExtraction("text extractor panicked".to_string()))?
            .map_err(|e| PdfError::TextExtraction(e.to_string()))
    }

    /// OCR every decodable image in the document, joined in object order.
    fn ocr_images(&self, doc: &Document, ocr: &dyn TextExtractor) -> String {
        let mut texts = Vec::new();

        for (index, image) in extract_images(doc).into_iter().enumerate() {
            let mut png = Vec::new();
            if let Err(e) = image.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png) {
                warn!("Failed to encode PDF image {}: {}", index + 1, e);
                continue;
            }

            match ocr.extract_text(&png) {
                Ok(text) if !text.trim().is_empty() => texts.push(text),
                Ok(_) => debug!("No text detected in PDF image {}", index + 1),
                Err(e) => warn!("OCR failed for PDF image {}: {}", index + 1, e),
            }
        }

        texts.join("\n\n")
    }
}

impl Default for PdfTextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TextExtractor for PdfTextExtractor {
    fn extract_text(&self, data: &[u8]) -> Result<String, DocumentError> {
        let (doc, raw_data) = self.load(data)?;
        let text = self.embedded_text(&raw_data)?;

        if text.trim().len() >= self.min_text_length {
            return Ok(text);
        }

        let Some(ocr) = self.ocr.as_deref() else {
            return Ok(text);
        };

        debug!(
            "PDF has {} chars of embedded text, trying OCR on page images",
            text.trim().len()
        );
        let ocr_text = self.ocr_images(&doc, ocr);
        if ocr_text.trim().is_empty() {
            Ok(text)
        } else {
            Ok(ocr_text)
        }
    }
}

/// Decode all image XObjects in the document.
fn extract_images(doc: &Document) -> Vec<DynamicImage> {
    let images: Vec<DynamicImage> = doc
        .objects
        .values()
        .filter_map(|object| image_from_object(doc, object))
        .collect();

    debug!("Found {} images in document", images.len());
    images
}

fn image_from_object(doc: &Document, obj: &Object) -> Option<DynamicImage> {
    let Object::Stream(stream) = obj else {
        return None;
    };
    let dict = &stream.dict;

    if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
        return None;
    }

    let width = dimension(dict, b"Width")?;
    let height = dimension(dict, b"Height")?;
    trace!("Found image object: {}x{}", width, height);

    if let Ok(filter) = dict.get(b"Filter") {
        let filter_name = match filter {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
            _ => None,
        };

        match filter_name {
            Some(b"DCTDecode") => {
                return image::load_from_memory_with_format(&stream.content, image::ImageFormat::Jpeg)
                    .ok();
            }
            Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                trace!("Skipping image with unsupported filter");
                return None;
            }
            _ => {}
        }
    }

    let data = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    let color_space = dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|o| match o {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
            Object::Reference(r) => doc.get_object(*r).ok().and_then(|o| o.as_name().ok()),
            _ => None,
        })
        .unwrap_or(b"DeviceRGB");

    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(8);

    if bits != 8 {
        trace!("Unsupported bits per component: {}", bits);
        return None;
    }

    image_from_raw(&data, width, height, color_space)
}

/// A positive image dimension that fits in `u32`.
fn dimension(dict: &Dictionary, key: &[u8]) -> Option<u32> {
    let value = dict.get(key).ok()?.as_i64().ok()?;
    u32::try_from(value).ok().filter(|&v| v > 0)
}

/// Build an RGBA image from 8-bit RGB or grayscale samples.
fn image_from_raw(data: &[u8], width: u32, height: u32, color_space: &[u8]) -> Option<DynamicImage> {
    let pixels = (width as usize).checked_mul(height as usize)?;
    let rgb_len = pixels.checked_mul(3)?;

    let rgba: Vec<u8> = match color_space {
        b"DeviceRGB" | b"RGB" if data.len() >= rgb_len => data[..rgb_len]
            .chunks_exact(3)
            .flat_map(|px| [px[0], px[1], px[2], 255])
            .collect(),
        b"DeviceGray" | b"G" if data.len() >= pixels => data[..pixels]
            .iter()
            .flat_map(|&gray| [gray, gray, gray, 255])
            .collect(),
        _ => {
            trace!(
                "Could not decode image: data_len={}, colorspace={:?}",
                data.len(),
                String::from_utf8_lossy(color_space)
            );
            return None;
        }
    };

    ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, rgba).map(DynamicImage::ImageRgba8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrupt_pdf_is_parse_error() {
        let extractor = PdfTextExtractor::new();
        let result = extractor.extract_text(b"%PDF-1.4 this is not really a pdf");

        assert!(matches!(result, Err(DocumentError::Pdf(PdfError::Parse(_)))));
    }

    #[test]
    fn test_empty_input_is_error() {
        let extractor = PdfTextExtractor::new();
        assert!(extractor.extract_text(&[]).is_err());
    }

    #[test]
    fn test_image_from_raw_gray() {
        let image = image_from_raw(&[0, 128, 255, 64], 2, 2, b"DeviceGray").unwrap();
        assert_eq!(image.width(), 2);
        assert_eq!(image.height(), 2);
    }

    #[test]
    fn test_image_from_raw_short_data() {
        assert!(image_from_raw(&[0, 0, 0], 2, 2, b"DeviceRGB").is_none());
        assert!(image_from_raw(&[0; 12], 2, 2, b"Indexed").is_none());
    }

    #[test]
    fn test_image_from_raw_huge_dimensions() {
        assert!(image_from_raw(&[0; 16], u32::MAX, u32::MAX, b"DeviceRGB").is_none());
        assert!(image_from_raw(&[0; 16], u32::MAX, u32::MAX, b"DeviceGray").is_none());
    }

    #[test]
    fn test_dimension_rejects_negative_and_zero() {
        let mut dict = Dictionary::new();
        dict.set("Width", Object::Integer(-1));
        dict.set("Height", Object::Integer(0));
        dict.set("Depth", Object::Integer(i64::from(u32::MAX) + 1));
        dict.set("Size", Object::Integer(640));

        assert_eq!(dimension(&dict, b"Width"), None);
        assert_eq!(dimension(&dict, b"Height"), None);
        assert_eq!(dimension(&dict, b"Depth"), None);
        assert_eq!(dimension(&dict, b"Size"), Some(640));
    }
}
