use std::{
    fmt,
    fs::File,
    io::{Error as IoError, ErrorKind as IoErrorKind, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
};

use rustix::fs::{Dev, FileType, fstat, major, minor};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zerocopy::FromBytes;

#[cfg(target_os = "linux")]
use crate::ioctl::{device_size_bytes, logical_block_size};
use crate::{
    ProbeError,
    filesystems::{FsError, ext::EXT4_ID_INFO, xfs::XFS_ID_INFO},
};

/// Probe table defining the order of detection attempts.
///
/// EXT4 is always tried before XFS. The order is part of the probing
/// contract: it decides the winner should a device ever carry both magic
/// signatures, so it must never be reordered heuristically.
pub const PROBES: &[FsIdinfo] = &[EXT4_ID_INFO, XFS_ID_INFO];

/// Represents a probe session on a file or block device.
///
/// A [`Probe`] owns the read-only handle for the duration of one probe and
/// records the device metadata gathered at open time. The handle is closed
/// when the probe is dropped, on every exit path.
#[derive(Debug)]
pub struct Probe {
    file: File,
    path: PathBuf,
    offset: u64,
    size: u64,
    sector_size: u64,

    devno: Dev,
    disk_devno: Dev,
    file_type: FileType,
}

impl Probe {
    /// Create a probe from an already opened [`File`].
    ///
    /// - Reads file metadata via [`fstat`](rustix::fs::fstat).
    /// - If the file is a block device, queries the logical block size and
    ///   total size in bytes using kernel ioctls (Linux).
    /// - Otherwise defaults the logical block size to `512` bytes and takes
    ///   the size from [`fstat`](rustix::fs::fstat).
    ///
    /// `offset` is the byte position of the superblock region to decode.
    pub fn new(file: File, path: &Path, offset: u64) -> Result<Probe, ProbeError> {
        let stat = fstat(&file)?;

        #[cfg(target_os = "linux")]
        let (sector_size, size) = if FileType::from_raw_mode(stat.st_mode).is_block_device() {
            (
                u64::from(logical_block_size(&file)?),
                device_size_bytes(&file)?,
            )
        } else {
            (512, stat.st_size as u64)
        };

        #[cfg(not(target_os = "linux"))]
        let (sector_size, size) = (512, stat.st_size as u64);

        Ok(Self {
            file,
            path: path.to_path_buf(),
            offset,
            size,
            sector_size,
            devno: stat.st_rdev,
            disk_devno: stat.st_dev,
            file_type: FileType::from_raw_mode(stat.st_mode),
        })
    }

    /// Create a probe from a file path, opened read-only.
    pub fn from_filename(filename: &Path, offset: u64) -> Result<Probe, ProbeError> {
        let file = File::open(filename)?;

        let probe = Probe::new(file, filename, offset)?;

        return Ok(probe);
    }

    pub(crate) fn seek(&mut self, pos: SeekFrom) -> Result<u64, IoError> {
        return self.file.seek(pos);
    }

    pub(crate) fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), IoError> {
        return self.file.read_exact(buf);
    }

    pub(crate) fn map_from_file<T: FromBytes>(&mut self, offset: u64) -> Result<T, IoError> {
        let mut buffer = vec![0u8; core::mem::size_of::<T>()];
        self.seek(SeekFrom::Start(offset))?;
        self.read_exact(&mut buffer)?;

        let data = T::read_from_bytes(&buffer).map_err(|_| IoErrorKind::UnexpectedEof)?;

        return Ok(data);
    }

    /// Returns the path of the probed file or device as a [`Path`].
    #[inline]
    pub fn path(&self) -> &Path {
        return self.path.as_path();
    }

    /// Returns the total size in bytes of the probed file or device.
    #[inline]
    pub fn size(&self) -> u64 {
        return self.size;
    }

    /// Returns the byte offset of the superblock region used for this probe.
    #[inline]
    pub fn offset(&self) -> u64 {
        return self.offset;
    }

    /// Returns the logical sector size in bytes of the device.
    #[inline]
    pub fn ssz(&self) -> u64 {
        return self.sector_size;
    }

    /// Returns the device number of the probed file.
    #[inline]
    pub fn devno(&self) -> Dev {
        return self.devno;
    }

    /// Returns the major number of the probed device.
    #[inline]
    pub fn devno_maj(&self) -> u32 {
        return major(self.devno);
    }

    /// Returns the minor number of the probed device.
    #[inline]
    pub fn devno_min(&self) -> u32 {
        return minor(self.devno);
    }

    /// Returns the device number of the disk containing the probed file.
    #[inline]
    pub fn disk_devno(&self) -> Dev {
        return self.disk_devno;
    }

    /// Returns if the probed file is a block device.
    #[inline]
    pub fn is_block_device(&self) -> bool {
        return self.file_type.is_block_device();
    }

    /// Returns if the probed file is a regular file.
    #[inline]
    pub fn is_regular_file(&self) -> bool {
        return self.file_type.is_file();
    }
}

/// Supported filesystem formats. Unknown formats never instantiate this.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FsType {
    Ext4,
    Xfs,
}

impl fmt::Display for FsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ext4 => write!(f, "EXT4"),
            Self::Xfs => write!(f, "XFS"),
        }
    }
}

/// One mount-table record for a probed filesystem.
///
/// Populated by external mount-table inspection; this library only carries
/// the records through, it never discovers mount points itself.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mount {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mount_point: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mount_root: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mount_flags: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub major_minor: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub fs_type: String,
}

/// Capacity metadata decoded from a filesystem superblock.
///
/// Constructed only from a successful, validated decode. `mounts` is always
/// empty here and is filled in by the caller's mount-table collaborator.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesystemInfo {
    pub fs_type: FsType,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub total_capacity: u64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub free_capacity: u64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub fs_block_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mounts: Vec<Mount>,
}

fn is_zero(value: &u64) -> bool {
    return *value == 0;
}

pub type ProbeFn = fn(&mut Probe) -> Result<FilesystemInfo, FsError>;

/// Describes one supported superblock format.
#[derive(Debug, Copy, Clone)]
pub struct FsIdinfo {
    pub name: &'static str,
    pub fs_type: FsType,
    pub probe_fn: ProbeFn,
    pub magic: FsMagic,
}

/// Magic signature of a superblock format, as raw bytes at a byte offset
/// relative to the superblock region.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FsMagic {
    pub magic: &'static [u8],
    pub len: usize,
    pub b_offset: u64,
}

/// Probe `device` for a known filesystem superblock.
///
/// Opens the device read-only, seeks to `logical_block_size * offset_blocks`
/// bytes and tries every decoder in [`PROBES`] order. Each call re-reads the
/// device from scratch; nothing is cached between calls.
///
/// # Errors
/// - Open, seek or short-read failures surface as they are, never masked as
///   a missing filesystem.
/// - [`ProbeError::NoFilesystemFound`] when every decoder reports a magic or
///   header mismatch, so callers can treat an unformatted device as a valid
///   branch rather than a fault.
pub fn probe_fs<P: AsRef<Path>>(
    device: P,
    logical_block_size: u64,
    offset_blocks: u64,
) -> Result<FilesystemInfo, ProbeError> {
    let offset = logical_block_size
        .checked_mul(offset_blocks)
        .ok_or_else(|| IoError::new(IoErrorKind::InvalidInput, "probe offset overflows u64"))?;

    let mut probe = Probe::from_filename(device.as_ref(), offset)?;

    for info in PROBES {
        log::debug!(
            "probe_fs - DECODER: {} PATH: {:?} OFFSET: {} MAGIC: {:?}",
            info.name,
            probe.path(),
            probe.offset(),
            info.magic,
        );

        match (info.probe_fn)(&mut probe) {
            Ok(result) => {
                log::debug!("probe_fs - MATCH: {} ({})", info.name, info.fs_type);
                return Ok(result);
            }
            Err(e) if e.is_mismatch() => {
                log::debug!("probe_fs - MISMATCH: {} \"{e}\"", info.name);
                continue;
            }
            Err(e) => return Err(ProbeError::from(e)),
        }
    }

    return Err(ProbeError::NoFilesystemFound);
}
