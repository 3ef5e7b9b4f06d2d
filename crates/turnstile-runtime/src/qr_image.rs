//! QR PNG rendering for `generate_qr` (§6: "PNG, encoded as
//! `data:image/png;base64,...`, payload is the raw token string").

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use qrcode::render::png;
use qrcode::QrCode;
use turnstile_core::error::BrokerError;

/// Renders `token` as a QR code and returns a `data:image/png;base64,...` URI.
pub fn render_token_as_data_uri(token: &str) -> Result<String, BrokerError> {
    let code = QrCode::new(token).map_err(|err| {
        tracing::error!(error = %err, "qr encoding failed");
        BrokerError::Internal
    })?;
    let png_bytes = code.render::<png::Renderer>().min_dimensions(256, 256).build();
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(png_bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_a_data_uri() {
        let uri = render_token_as_data_uri("abc123").unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
    }
}
