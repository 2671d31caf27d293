// src/services/location_service.rs

use image::{ImageOutputFormat, Luma};
use qrcode::QrCode;
use uuid::Uuid;

use crate::common::error::AppError;

/// Opaque token printed on a location's QR code.
pub fn generate_qr_token() -> String {
    Uuid::new_v4().simple().to_string()
}

pub fn scan_url(base_url: &str, token: &str) -> String {
    format!("{}/scan/{}", base_url.trim_end_matches('/'), token)
}

/// Renders `content` as a PNG QR code.
pub fn render_qr_png(content: &str) -> Result<Vec<u8>, AppError> {
    let code = QrCode::new(content.as_bytes())
        .map_err(|e| AppError::InternalServerError(anyhow::Error::msg(e.to_string())))?;

    let image_buffer = code.render::<Luma<u8>>().min_dimensions(256, 256).build();
    let dynamic_image = image::DynamicImage::ImageLuma8(image_buffer);

    let mut buffer = Vec::new();
    dynamic_image
        .write_to(&mut buffer, ImageOutputFormat::Png)
        .map_err(|e| AppError::InternalServerError(anyhow::Error::msg(e.to_string())))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique_and_url_safe() {
        let a = generate_qr_token();
        assert_ne!(a, generate_qr_token());
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn scan_url_joins_base_and_token() {
        assert_eq!(scan_url("https://app.example.com/", "abc"), "https://app.example.com/scan/abc");
        assert_eq!(scan_url("http://localhost:3000", "abc"), "http://localhost:3000/scan/abc");
    }

    #[test]
    fn renders_a_png() {
        let png = render_qr_png("https://app.example.com/scan/abc").unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }
}
