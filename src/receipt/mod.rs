//! Registration receipts: a single-page PDF carrying a QR-encoded
//! verification URL.

pub mod pdf;
pub mod qr;

pub use pdf::{render, ReceiptLayout};
pub use qr::QrRaster;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReceiptError {
    #[error("QR encoding failed: {0}")]
    Qr(String),

    #[error("PDF assembly failed: {0}")]
    Pdf(String),

    #[error("sink write failed")]
    Io(#[from] std::io::Error),
}
