//! Error taxonomy for the input interpretation engine

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShuttleError {
    /// Report too short to carry the jog/shuttle/button fields.
    /// Callers skip the poll tick; no tracker state is touched.
    #[error("malformed report: got {len} bytes, need at least {expected}")]
    MalformedReport { len: usize, expected: usize },

    /// Action string names a key or modifier we cannot synthesize
    #[error("unknown key `{0}`")]
    UnknownKey(String),

    #[error("failed to load mappings from {path:?}: {reason}")]
    MappingLoad { path: PathBuf, reason: String },

    #[error("no device {vendor_id:04x}:{product_id:04x} found")]
    DeviceNotFound { vendor_id: u16, product_id: u16 },

    #[error("failed to open device {vendor_id:04x}:{product_id:04x}: {source}")]
    DeviceOpen {
        vendor_id: u16,
        product_id: u16,
        #[source]
        source: hidapi::HidError,
    },

    /// Transport failure while polling; fatal for the poll loop
    #[error("device read failed: {0}")]
    DeviceRead(String),
}

pub type Result<T> = std::result::Result<T, ShuttleError>;
