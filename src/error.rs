use std::path::PathBuf;
use thiserror::Error;

/// Hard failures of a scan.
///
/// "No barcode found" is not an error: the scanner reports it as `Ok(None)`.
/// These variants mean the input itself is unusable and retrying the same
/// image is pointless.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to read image {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid image: {0}")]
    InvalidImage(#[from] image::ImageError),

    #[error("image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
}
