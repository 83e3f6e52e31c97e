//! QR link codes.
//!
//! Encodes a retrieval URL as a PNG QR code, either as raw bytes or as a
//! `data:` URL the browser can drop straight into an `<img>` tag.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{DynamicImage, ImageFormat, Luma};
use qrcode::types::QrError;
use qrcode::QrCode;

use crate::{Result, ShareError};

/// MIME type of generated link codes.
pub const LINK_CODE_MIME: &str = "image/png";

/// Default minimum edge length of the image in pixels.
pub const DEFAULT_MIN_DIMENSION: u32 = 256;

/// QR code generator for retrieval URLs.
#[derive(Debug, Clone)]
pub struct LinkCodeGenerator {
    min_dimension: u32,
}

impl Default for LinkCodeGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_DIMENSION)
    }
}

impl LinkCodeGenerator {
    /// Create a generator producing images at least `min_dimension` pixels wide.
    pub fn new(min_dimension: u32) -> Self {
        Self { min_dimension }
    }

    /// Encode `url` as a PNG image.
    ///
    /// The output depends only on `url`: equal input gives byte-identical
    /// images. URLs beyond QR capacity fail with
    /// [`ShareError::OversizedInput`].
    pub fn encode(&self, url: &str) -> Result<Vec<u8>> {
        let code = QrCode::new(url.as_bytes()).map_err(|e| match e {
            QrError::DataTooLong => ShareError::OversizedInput { len: url.len() },
            other => ShareError::Encode(other.to_string()),
        })?;

        let image = code
            .render::<Luma<u8>>()
            .min_dimensions(self.min_dimension, self.min_dimension)
            .build();

        let mut png = Vec::new();
        DynamicImage::ImageLuma8(image)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| ShareError::Encode(e.to_string()))?;
        Ok(png)
    }

    /// Encode `url` as a `data:image/png;base64,...` URL.
    pub fn encode_data_url(&self, url: &str) -> Result<String> {
        let png = self.encode(url)?;
        Ok(format!("data:{LINK_CODE_MIME};base64,{}", STANDARD.encode(png)))
    }
}
