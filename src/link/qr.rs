//! Link-code generation for the device pairing flow.
//!
//! Codes carry no real session material; each one is a random ref plus a
//! random base64 key in the shape real pairing payloads use.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use qrcode::{render::unicode, QrCode};
use rand::Rng;
use thiserror::Error;

/// Number of codes generated per linking attempt.
pub const CODE_BATCH: usize = 6;

/// A batch of rotating link codes.
#[derive(Debug, Clone)]
pub struct QrRotation {
    codes: Vec<String>,
    index: usize,
}

impl QrRotation {
    /// Generate a fresh batch of codes.
    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        let codes = (0..CODE_BATCH)
            .map(|_| {
                let ref_id: u64 = rng.gen();
                let key: [u8; 32] = rng.gen();
                format!("{:X},{}", ref_id, STANDARD.encode(key))
            })
            .collect();
        Self { codes, index: 0 }
    }

    /// The code currently on display.
    pub fn current_code(&self) -> &str {
        &self.codes[self.index]
    }

    /// Zero-based position of the current code in the batch.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Rotate to the next code. Returns `false` when the batch is exhausted.
    pub fn advance(&mut self) -> bool {
        if self.index + 1 < self.codes.len() {
            self.index += 1;
            true
        } else {
            false
        }
    }
}

/// QR rendering errors.
#[derive(Debug, Clone, Error)]
pub enum QrError {
    #[error("QR generation failed: {0}")]
    GenerationFailed(String),
}

/// Render a link code as a unicode QR block for terminal display.
pub fn render_qr_ascii(data: &str) -> Result<String, QrError> {
    let code =
        QrCode::new(data.as_bytes()).map_err(|e| QrError::GenerationFailed(e.to_string()))?;

    let image = code
        .render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .build();

    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn rotation_yields_distinct_codes() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut rotation = QrRotation::generate(&mut rng);

        let first = rotation.current_code().to_string();
        assert!(rotation.advance());
        assert_ne!(first, rotation.current_code());
    }

    #[test]
    fn rotation_exhausts_after_batch() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut rotation = QrRotation::generate(&mut rng);

        for _ in 0..CODE_BATCH - 1 {
            assert!(rotation.advance());
        }
        assert!(!rotation.advance());
        assert_eq!(rotation.index(), CODE_BATCH - 1);
    }

    #[test]
    fn ascii_render_produces_output() {
        let rendered = render_qr_ascii("test data").unwrap();
        assert!(!rendered.is_empty());
    }
}
