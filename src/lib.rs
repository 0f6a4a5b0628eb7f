//! Read-only filesystem superblock probing for block devices.
//!
//! Given a device path, the device's logical block size and an offset in
//! logical blocks, [`probe_fs`] reads the raw superblock region and reports
//! which supported filesystem is present along with its capacity metadata.
//! Nothing is ever written to the device and nothing is mounted.

pub mod filesystems;
#[cfg(target_os = "linux")]
pub mod ioctl;
pub mod magic;
pub mod probe;
pub mod util;

#[cfg(test)]
mod tests;

use std::io::Error as IoError;

use thiserror::Error;

use crate::filesystems::FsError;
pub use crate::probe::{FilesystemInfo, FsType, Mount, Probe, probe_fs};

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("I/O operation failed: {0}")]
    IoError(#[from] IoError),
    #[error("OS error: {0}")]
    Errno(#[from] rustix::io::Errno),
    #[error("Filesystem probe failed: {0}")]
    FsError(#[from] FsError),
    #[error("No known filesystem signature found")]
    NoFilesystemFound,
}
