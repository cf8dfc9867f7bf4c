//! Getting receipt images out of uploaded documents.

mod docx;
mod optimize;
mod pdf;

pub use docx::extract_docx_images;
pub use optimize::optimize_image;
pub use pdf::PdfImageExtractor;

use std::path::Path;

use tracing::debug;

use crate::batch::SourceImage;
use crate::error::FileError;
use crate::models::config::ImageConfig;
use crate::vlm::ImageRef;

/// Kinds of upload the pipeline accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Docx,
    Pdf,
    Image,
}

impl DocumentKind {
    /// Classify by file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Result<Self, FileError> {
        match ext.to_ascii_lowercase().as_str() {
            "docx" => Ok(DocumentKind::Docx),
            "pdf" => Ok(DocumentKind::Pdf),
            "jpg" | "jpeg" | "png" => Ok(DocumentKind::Image),
            other => Err(FileError::UnsupportedType(other.to_string())),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, FileError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        Self::from_extension(ext)
    }
}

/// An image pulled from a document, before optimisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    pub name: String,
    pub data: Vec<u8>,
}

impl RawImage {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// Ordered images contained in a document. An empty list is a valid answer.
///
/// Plain images are passed through under `file_name`.
pub fn extract_images(
    data: &[u8],
    kind: DocumentKind,
    file_name: &str,
    config: &ImageConfig,
) -> Result<Vec<RawImage>, FileError> {
    let images = match kind {
        DocumentKind::Docx => extract_docx_images(data)?,
        DocumentKind::Pdf => PdfImageExtractor::load(data, config)?.extract(),
        DocumentKind::Image => vec![RawImage::new(file_name, data.to_vec())],
    };

    debug!("{}: {} images ({:?})", file_name, images.len(), kind);
    Ok(images)
}

/// Optimise an extracted image and wrap it as a JPEG data URI.
pub fn prepare_for_upload(raw: &RawImage, config: &ImageConfig) -> Result<SourceImage, FileError> {
    let jpeg = optimize_image(&raw.data, config)?;
    Ok(SourceImage::new(
        jpeg_name(&raw.name),
        ImageRef::from_bytes(&jpeg, "image/jpeg"),
    ))
}

/// Replace the extension with `.jpeg`.
fn jpeg_name(name: &str) -> String {
    let stem = match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    };
    format!("{}.jpeg", stem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat};
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    #[test]
    fn test_document_kind() {
        assert_eq!(DocumentKind::from_path(Path::new("a/Receipt.PDF")).unwrap(), DocumentKind::Pdf);
        assert_eq!(DocumentKind::from_path(Path::new("scan.jpg")).unwrap(), DocumentKind::Image);
        assert_eq!(DocumentKind::from_path(Path::new("r.docx")).unwrap(), DocumentKind::Docx);
        assert!(matches!(
            DocumentKind::from_path(Path::new("r.tiff")),
            Err(FileError::UnsupportedType(ext)) if ext == "tiff"
        ));
        assert!(DocumentKind::from_path(Path::new("README")).is_err());
    }

    #[test]
    fn test_jpeg_name() {
        assert_eq!(jpeg_name("image_01.png"), "image_01.jpeg");
        assert_eq!(jpeg_name("scan.v2.jpg"), "scan.v2.jpeg");
        assert_eq!(jpeg_name("noext"), "noext.jpeg");
        assert_eq!(jpeg_name(".png"), ".png.jpeg");
    }

    #[test]
    fn test_image_passthrough_and_upload() {
        let mut png = Vec::new();
        DynamicImage::new_rgb8(20, 10)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();

        let config = ImageConfig::default();
        let raws = extract_images(&png, DocumentKind::Image, "receipt.png", &config).unwrap();
        assert_eq!(raws.len(), 1);
        assert_eq!(raws[0].name, "receipt.png");

        let source = prepare_for_upload(&raws[0], &config).unwrap();
        assert_eq!(source.name, "receipt.jpeg");
        assert!(source.image.as_str().starts_with("data:image/jpeg;base64,/9j/"));
    }
}
