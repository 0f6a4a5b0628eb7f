pub mod ext;
pub mod xfs;

use thiserror::Error;

use crate::filesystems::{ext::ExtError, xfs::XfsError};

#[derive(Debug, Error)]
pub enum FsError {
    #[error("EXT filesystem error: {0}")]
    Ext(#[from] ExtError),
    #[error("XFS filesystem error: {0}")]
    Xfs(#[from] XfsError),
}

impl FsError {
    /// Whether the decoder concluded the device is simply not its format,
    /// as opposed to failing to read the device at all.
    pub fn is_mismatch(&self) -> bool {
        match self {
            FsError::Ext(e) => e.is_mismatch(),
            FsError::Xfs(e) => e.is_mismatch(),
        }
    }
}
