//! Pairing QR rendering for the status endpoint.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use zapcast_core::error::BridgeError;

/// Render pairing QR data as PNG bytes.
pub fn generate_qr_png(qr_data: &str) -> Result<Vec<u8>, BridgeError> {
    use image::{ImageBuffer, Luma};
    use qrcode::{Color, EcLevel, QrCode};

    let code = QrCode::with_error_correction_level(qr_data.as_bytes(), EcLevel::L)
        .map_err(|e| BridgeError::Session(format!("QR generation failed: {e}")))?;

    let module_size: u32 = 10;
    let quiet_zone: u32 = 2;
    let modules = code.width() as u32;
    let img_size = (modules + quiet_zone * 2) * module_size;

    let img = ImageBuffer::from_fn(img_size, img_size, |x, y| {
        let mx = (x / module_size).saturating_sub(quiet_zone);
        let my = (y / module_size).saturating_sub(quiet_zone);

        if x / module_size < quiet_zone
            || y / module_size < quiet_zone
            || mx >= modules
            || my >= modules
        {
            Luma([255u8]) // quiet zone
        } else {
            match code[(mx as usize, my as usize)] {
                Color::Dark => Luma([0u8]),
                Color::Light => Luma([255u8]),
            }
        }
    });

    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png)
        .map_err(|e| BridgeError::Session(format!("PNG encoding failed: {e}")))?;

    Ok(buf.into_inner())
}

/// Render pairing QR data as a `data:image/png;base64,...` URL, the shape
/// frontends can drop straight into an `<img src>`.
pub fn data_url(qr_data: &str) -> Result<String, BridgeError> {
    let png = generate_qr_png(qr_data)?;
    Ok(format!("data:image/png;base64,{}", BASE64.encode(png)))
}
