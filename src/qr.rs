//! QR code images for the ticket's storage URL.

use std::io::Cursor;

use image::{ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};

use crate::error::RenderError;

/// QR code error correction level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorCorrection {
    /// ~7% recovery
    Low,
    /// ~15% recovery
    #[default]
    Medium,
    /// ~25% recovery
    Quartile,
    /// ~30% recovery
    High,
}

impl From<ErrorCorrection> for EcLevel {
    fn from(level: ErrorCorrection) -> Self {
        match level {
            ErrorCorrection::Low => EcLevel::L,
            ErrorCorrection::Medium => EcLevel::M,
            ErrorCorrection::Quartile => EcLevel::Q,
            ErrorCorrection::High => EcLevel::H,
        }
    }
}

/// Turns a string into a PNG that scanners can read back.
pub trait CodeImageEncoder {
    fn encode(&self, data: &str, level: ErrorCorrection, pixel_size: u32) -> Result<Vec<u8>, RenderError>;
}

/// [`CodeImageEncoder`] backed by the `qrcode` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct QrEncoder;

impl CodeImageEncoder for QrEncoder {
    fn encode(&self, data: &str, level: ErrorCorrection, pixel_size: u32) -> Result<Vec<u8>, RenderError> {
        let code = QrCode::with_error_correction_level(data.as_bytes(), level.into())
            .map_err(|e| RenderError::CodeEncode(e.to_string()))?;

        let img = code
            .render::<Luma<u8>>()
            .min_dimensions(pixel_size, pixel_size)
            .build();

        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| RenderError::CodeEncode(e.to_string()))?;

        tracing::debug!(
            width = img.width(),
            height = img.height(),
            bytes = png.len(),
            "encoded QR code"
        );
        Ok(png)
    }
}
