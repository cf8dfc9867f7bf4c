//! Embedded image extraction from PDFs using lopdf.

use std::collections::HashSet;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, trace, warn};

use super::RawImage;
use crate::error::FileError;
use crate::models::config::ImageConfig;

/// Pulls the raster images out of a loaded PDF, page by page.
pub struct PdfImageExtractor {
    document: Document,
    jpeg_quality: u8,
    min_side: u32,
}

impl PdfImageExtractor {
    /// Parse `data`, decrypting with the empty password if needed.
    pub fn load(data: &[u8], config: &ImageConfig) -> Result<Self, FileError> {
        let mut document = Document::load_mem(data).map_err(|e| FileError::Pdf(e.to_string()))?;

        if document.is_encrypted() {
            if document.decrypt("").is_err() {
                return Err(FileError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");
        }

        debug!("Loaded PDF with {} pages", document.get_pages().len());

        Ok(Self {
            document,
            jpeg_quality: config.pdf_jpeg_quality,
            min_side: config.min_pdf_image_side,
        })
    }

    /// All usable images as JPEG, in page order, named `pdf_img_NN.jpeg`.
    ///
    /// Falls back to scanning every object when no page references an image.
    pub fn extract(&self) -> Vec<RawImage> {
        let mut seen = HashSet::new();
        let mut jpegs = Vec::new();

        for (number, page_id) in self.document.get_pages() {
            let before = jpegs.len();
            self.page_images(page_id, &mut seen, &mut jpegs);
            trace!("Page {}: {} images", number, jpegs.len() - before);
        }

        if jpegs.is_empty() {
            debug!("No page-level images found, scanning all objects");
            jpegs = self.all_object_images();
        }

        debug!("Extracted {} images from PDF", jpegs.len());

        jpegs
            .into_iter()
            .enumerate()
            .map(|(i, data)| RawImage::new(format!("pdf_img_{:02}.jpeg", i + 1), data))
            .collect()
    }

    fn page_images(&self, page_id: ObjectId, seen: &mut HashSet<ObjectId>, out: &mut Vec<Vec<u8>>) {
        let Some(resources) = self.page_resources(page_id) else {
            return;
        };
        let Ok(xobjects) = resources.get(b"XObject") else {
            return;
        };
        let Ok((_, Object::Dictionary(xobjects))) = self.document.dereference(xobjects) else {
            return;
        };

        for (name, reference) in xobjects.iter() {
            let Ok((id, object)) = self.document.dereference(reference) else {
                continue;
            };
            if let Some(id) = id {
                if !seen.insert(id) {
                    continue;
                }
            }

            if let Object::Stream(stream) = object {
                if let Some(jpeg) = self.image_from_stream(stream) {
                    trace!("Took XObject /{}", String::from_utf8_lossy(name));
                    out.push(jpeg);
                }
            }
        }
    }

    fn all_object_images(&self) -> Vec<Vec<u8>> {
        self.document
            .objects
            .values()
            .filter_map(|object| match object {
                Object::Stream(stream) => self.image_from_stream(stream),
                _ => None,
            })
            .collect()
    }

    /// JPEG bytes for an image XObject, or `None` if it is not one we can use.
    fn image_from_stream(&self, stream: &Stream) -> Option<Vec<u8>> {
        let dict = &stream.dict;
        if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
            return None;
        }

        let width = u32::try_from(dict.get(b"Width").ok()?.as_i64().ok()?).ok()?;
        let height = u32::try_from(dict.get(b"Height").ok()?.as_i64().ok()?).ok()?;
        if width < self.min_side || height < self.min_side {
            trace!("Skipping {}x{} image", width, height);
            return None;
        }

        match first_name(dict.get(b"Filter").ok()) {
            Some(b"DCTDecode") => return Some(stream.content.clone()),
            Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                trace!("Unsupported image filter");
                return None;
            }
            _ => {}
        }

        let bits = dict
            .get(b"BitsPerComponent")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(8);
        if bits != 8 {
            trace!("Unsupported bits per component: {}", bits);
            return None;
        }

        let color_space = dict
            .get(b"ColorSpace")
            .ok()
            .and_then(|o| match o {
                Object::Reference(id) => self.document.get_object(*id).ok(),
                other => Some(other),
            })
            .and_then(|o| first_name(Some(o)))
            .unwrap_or(b"DeviceRGB");

        let data = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());

        let image = raw_to_image(data, width, height, color_space)?;
        match encode_jpeg(&image, self.jpeg_quality) {
            Ok(jpeg) => Some(jpeg),
            Err(e) => {
                warn!("Failed to re-encode {}x{} PDF image: {}", width, height, e);
                None
            }
        }
    }

    /// Resources for a page, walking up `/Parent` for inherited ones.
    fn page_resources(&self, node_id: ObjectId) -> Option<&Dictionary> {
        let node = self.document.get_dictionary(node_id).ok()?;

        if let Ok(resources) = node.get(b"Resources") {
            if let Ok((_, Object::Dictionary(dict))) = self.document.dereference(resources) {
                return Some(dict);
            }
        }

        match node.get(b"Parent") {
            Ok(Object::Reference(parent)) => self.page_resources(*parent),
            _ => None,
        }
    }
}

/// A name, or the first name of an array of names.
fn first_name(object: Option<&Object>) -> Option<&[u8]> {
    match object? {
        Object::Name(name) => Some(name.as_slice()),
        Object::Array(items) => items.first().and_then(|o| o.as_name().ok()),
        _ => None,
    }
}

fn raw_to_image(mut data: Vec<u8>, width: u32, height: u32, color_space: &[u8]) -> Option<DynamicImage> {
    let pixels = (width as usize).checked_mul(height as usize)?;

    match color_space {
        b"DeviceRGB" | b"RGB" => {
            let len = pixels.checked_mul(3).filter(|&len| data.len() >= len)?;
            data.truncate(len);
            RgbImage::from_raw(width, height, data).map(DynamicImage::ImageRgb8)
        }
        b"DeviceGray" | b"G" if data.len() >= pixels => {
            data.truncate(pixels);
            GrayImage::from_raw(width, height, data).map(DynamicImage::ImageLuma8)
        }
        _ => {
            trace!(
                "Cannot decode raw image: {} bytes, colorspace {}",
                data.len(),
                String::from_utf8_lossy(color_space)
            );
            None
        }
    }
}

pub(crate) fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    image.to_rgb8().write_with_encoder(encoder)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn image_stream(width: i64, height: i64, color_space: &str, data: Vec<u8>) -> Stream {
        Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width,
                "Height" => height,
                "ColorSpace" => color_space,
                "BitsPerComponent" => 8i64,
            },
            data,
        )
    }

    fn jpeg_stream(width: u32, height: u32) -> Stream {
        let jpeg = encode_jpeg(&DynamicImage::new_rgb8(width, height), 80).unwrap();
        Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8i64,
                "Filter" => "DCTDecode",
            },
            jpeg,
        )
    }

    /// One page per image list; resources sit on the page tree root.
    fn build_pdf(pages: Vec<Vec<Stream>>, inherit_resources: bool) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids: Vec<Object> = Vec::new();
        let mut shared = Dictionary::new();

        for (p, images) in pages.into_iter().enumerate() {
            let mut xobjects = Dictionary::new();
            for (i, stream) in images.into_iter().enumerate() {
                let id = doc.add_object(stream);
                xobjects.set(format!("Im{}_{}", p, i), id);
            }

            let mut page = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(100), Object::Integer(100)],
            };
            if inherit_resources {
                for (k, v) in xobjects.iter() {
                    shared.set(k.clone(), v.clone());
                }
            } else {
                page.set("Resources", dictionary! { "XObject" => xobjects });
            }
            kids.push(doc.add_object(page).into());
        }

        let mut root = dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
        };
        if inherit_resources {
            root.set("Resources", dictionary! { "XObject" => shared });
        }
        doc.objects.insert(pages_id, Object::Dictionary(root));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    fn extract(bytes: &[u8]) -> Vec<RawImage> {
        PdfImageExtractor::load(bytes, &ImageConfig::default())
            .unwrap()
            .extract()
    }

    #[test]
    fn test_raw_and_jpeg_images_in_page_order() {
        let bytes = build_pdf(
            vec![
                vec![image_stream(60, 60, "DeviceRGB", vec![200; 60 * 60 * 3])],
                vec![jpeg_stream(80, 64)],
            ],
            false,
        );

        let images = extract(&bytes);
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].name, "pdf_img_01.jpeg");
        assert_eq!(images[1].name, "pdf_img_02.jpeg");

        for img in &images {
            let decoded = image::load_from_memory_with_format(&img.data, image::ImageFormat::Jpeg).unwrap();
            assert!(decoded.width() >= 60);
        }
    }

    #[test]
    fn test_small_images_are_skipped() {
        let bytes = build_pdf(
            vec![vec![
                image_stream(10, 10, "DeviceGray", vec![0; 100]),
                image_stream(64, 50, "DeviceGray", vec![128; 64 * 50]),
            ]],
            false,
        );

        let images = extract(&bytes);
        assert_eq!(images.len(), 1);
    }

    #[test]
    fn test_inherited_resources() {
        let bytes = build_pdf(vec![vec![jpeg_stream(100, 100)]], true);
        assert_eq!(extract(&bytes).len(), 1);
    }

    #[test]
    fn test_truncated_raw_data_is_ignored() {
        let bytes = build_pdf(vec![vec![image_stream(60, 60, "DeviceRGB", vec![1; 100])]], false);
        assert!(extract(&bytes).is_empty());
    }

    #[test]
    fn test_bogus_dimensions_are_ignored() {
        let bytes = build_pdf(
            vec![vec![
                image_stream(-1, -1, "DeviceRGB", vec![1; 64]),
                image_stream(u32::MAX as i64, u32::MAX as i64, "DeviceRGB", vec![1; 64]),
                image_stream(u32::MAX as i64 + 1, 64, "DeviceGray", vec![1; 64]),
                image_stream(64, 64, "DeviceGray", vec![90; 64 * 64]),
            ]],
            false,
        );

        assert_eq!(extract(&bytes).len(), 1);
    }

    #[test]
    fn test_not_a_pdf() {
        assert!(matches!(
            PdfImageExtractor::load(b"hello", &ImageConfig::default()),
            Err(FileError::Pdf(_))
        ));
    }
}
