//! Embedded media extraction from DOCX archives.

use std::io::{Cursor, Read};

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;
use zip::ZipArchive;

use super::RawImage;
use crate::error::FileError;

const MEDIA_PREFIX: &str = "word/media/";

lazy_static! {
    static ref FIRST_NUMBER: Regex = Regex::new(r"\d+").unwrap();
}

/// Images under `word/media/`, ordered by the number in their entry name.
pub fn extract_docx_images(data: &[u8]) -> Result<Vec<RawImage>, FileError> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;

    let mut entries: Vec<String> = archive
        .file_names()
        .filter(|name| name.starts_with(MEDIA_PREFIX) && name.len() > MEDIA_PREFIX.len())
        .map(str::to_string)
        .collect();
    entries.sort_by_key(|name| media_index(name));

    let mut images = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let mut file = archive.by_name(entry)?;
        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)?;

        let ext = entry.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("png");
        images.push(RawImage::new(format!("image_{:02}.{}", i + 1, ext), data));
    }

    debug!("Extracted {} images from DOCX", images.len());
    Ok(images)
}

/// First integer in an entry name, `0` if there is none.
fn media_index(name: &str) -> u64 {
    FIRST_NUMBER
        .find(name)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}
