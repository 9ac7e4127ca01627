use qrcode::{Color, EcLevel, QrCode};

use super::ReceiptError;

/// Quiet-zone border, in modules, required around the symbol.
const QUIET_ZONE_MODULES: usize = 4;

const DARK: u8 = 0x00;
const LIGHT: u8 = 0xff;

/// Square 8-bit greyscale raster, ready for embedding as a PDF image.
#[derive(Debug, Clone)]
pub struct QrRaster {
    width: usize,
    pixels: Vec<u8>,
}

impl QrRaster {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }
}

/// Encode `data` at error-correction level H (tolerates print
/// degradation), scaled by `scale` pixels per module.
pub fn encode(data: &str, scale: usize) -> Result<QrRaster, ReceiptError> {
    assert!(scale > 0, "scale must be positive");

    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::H)
        .map_err(|e| ReceiptError::Qr(e.to_string()))?;

    let modules = code.width();
    let colors = code.to_colors();
    let width = (modules + 2 * QUIET_ZONE_MODULES) * scale;

    let mut pixels = vec![LIGHT; width * width];
    for (idx, color) in colors.iter().enumerate() {
        if *color != Color::Dark {
            continue;
        }
        let mx = idx % modules;
        let my = idx / modules;
        let x0 = (mx + QUIET_ZONE_MODULES) * scale;
        let y0 = (my + QUIET_ZONE_MODULES) * scale;
        for dy in 0..scale {
            let row = (y0 + dy) * width;
            pixels[row + x0..row + x0 + scale].fill(DARK);
        }
    }

    Ok(QrRaster { width, pixels })
}
