use std::{fs, path::Path};

use base64::{Engine, engine::general_purpose::STANDARD};
use image::ImageFormat;
use log::{debug, warn};

use crate::error::{Error, Result};

/// Raw image bytes ready for upload. Decoding is left to the service; the
/// format is only sniffed for diagnostics.
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub bytes: Vec<u8>,
    pub format: Option<ImageFormat>,
}

impl ProcessedImage {
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

pub fn process_image_from_path(path: impl AsRef<Path>) -> Result<ProcessedImage> {
    let path = path.as_ref();
    let bytes = fs::read(path)
        .map_err(|e| Error::io(format!("unable to read image {}", path.display()), e))?;
    Ok(process_image_from_bytes(bytes))
}

pub fn process_image_from_bytes(bytes: Vec<u8>) -> ProcessedImage {
    let format = image::guess_format(&bytes).ok();
    match format {
        Some(format) => debug!("image is {:?}, {} bytes", format, bytes.len()),
        None => warn!("unrecognized image format, sending {} bytes as-is", bytes.len()),
    }
    ProcessedImage { bytes, format }
}
