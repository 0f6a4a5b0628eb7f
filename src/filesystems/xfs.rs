use std::io::Error as IoError;

use thiserror::Error;
use uuid::Uuid;
use zerocopy::{
    FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
    byteorder::{BigEndian, U16, U32, U64},
};

use crate::{
    filesystems::FsError,
    probe::{FilesystemInfo, FsIdinfo, FsMagic, FsType, Probe},
    util::{decode_utf8_lossy_from, is_power_2},
};

#[derive(Debug, Error)]
pub enum XfsError {
    #[error("I/O operation failed: {0}")]
    IoError(#[from] IoError),
    #[error("Invalid XFS magic signature")]
    InvalidMagic,
    #[error("Invalid XFS header ranges")]
    InvalidHeaderRanges,
}

impl XfsError {
    /// "Not an XFS filesystem" rather than a device fault.
    pub fn is_mismatch(&self) -> bool {
        return !matches!(self, XfsError::IoError(_));
    }
}

pub const XFS_ID_INFO: FsIdinfo = FsIdinfo {
    name: "xfs",
    fs_type: FsType::Xfs,
    probe_fn: |probe| probe_xfs(probe).map_err(FsError::from),
    magic: FsMagic {
        magic: b"XFSB",
        len: 4,
        b_offset: 0,
    },
};

/// `"XFSB"` read as a big-endian u32.
pub const XFS_SUPER_MAGIC: u32 = 0x58465342;

/// On-disk XFS superblock. Always big-endian regardless of the host.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Unaligned, Immutable, KnownLayout)]
pub struct XfsSuperBlock {
    pub sb_magicnum: U32<BigEndian>,
    pub sb_blocksize: U32<BigEndian>,
    pub sb_dblocks: U64<BigEndian>,
    pub sb_rblocks: U64<BigEndian>,
    pub sb_rextents: U64<BigEndian>,
    pub sb_uuid: [u8; 16],
    pub sb_logstart: U64<BigEndian>,
    pub sb_rootino: U64<BigEndian>,
    pub sb_rbmino: U64<BigEndian>,
    pub sb_rsumino: U64<BigEndian>,
    pub sb_rextsize: U32<BigEndian>,
    pub sb_agblocks: U32<BigEndian>,
    pub sb_agcount: U32<BigEndian>,
    pub sb_rbmblocks: U32<BigEndian>,
    pub sb_logblocks: U32<BigEndian>,

    pub sb_versionnum: U16<BigEndian>,
    pub sb_sectsize: U16<BigEndian>,
    pub sb_inodesize: U16<BigEndian>,
    pub sb_inopblock: U16<BigEndian>,
    pub sb_fname: [u8; 12],
    pub sb_blocklog: u8,
    pub sb_sectlog: u8,
    pub sb_inodelog: u8,
    pub sb_inopblog: u8,
    pub sb_agblklog: u8,
    pub sb_rextslog: u8,
    pub sb_inprogress: u8,
    pub sb_imax_pct: u8,

    pub sb_icount: U64<BigEndian>,
    pub sb_ifree: U64<BigEndian>,
    pub sb_fdblocks: U64<BigEndian>,
    pub sb_frextents: U64<BigEndian>,
    pub sb_uquotino: U64<BigEndian>,
    pub sb_gquotino: U64<BigEndian>,
    pub sb_qflags: U16<BigEndian>,
    pub sb_flags: u8,
    pub sb_shared_vn: u8,
    pub sb_inoalignmt: U32<BigEndian>,
    pub sb_unit: U32<BigEndian>,
    pub sb_width: U32<BigEndian>,
    pub sb_dirblklog: u8,
    pub sb_logsectlog: u8,
    pub sb_logsectsize: U16<BigEndian>,
    pub sb_logsunit: U32<BigEndian>,
    pub sb_features2: U32<BigEndian>,
    pub sb_bad_features2: U32<BigEndian>,

    pub sb_features_compat: U32<BigEndian>,
    pub sb_features_ro_compat: U32<BigEndian>,
    pub sb_features_incompat: U32<BigEndian>,
    pub sb_features_log_incompat: U32<BigEndian>,
    pub sb_crc: U32<BigEndian>,
    pub sb_spino_align: U32<BigEndian>,
    pub sb_pquotino: U64<BigEndian>,
    pub sb_lsn: U64<BigEndian>,
    pub sb_meta_uuid: [u8; 16],
    pub sb_rrmapino: U64<BigEndian>,
}

const XFS_MIN_BLOCKSIZE_LOG: u8 = 9;
const XFS_MAX_BLOCKSIZE_LOG: u8 = 16;
const XFS_MIN_BLOCKSIZE: u32 = 1 << XFS_MIN_BLOCKSIZE_LOG;
const XFS_MAX_BLOCKSIZE: u32 = 1 << XFS_MAX_BLOCKSIZE_LOG;
const XFS_MIN_SECTORSIZE_LOG: u8 = 9;
const XFS_MAX_SECTORSIZE_LOG: u8 = 15;
const XFS_MIN_SECTORSIZE: u16 = 1 << XFS_MIN_SECTORSIZE_LOG;
const XFS_MAX_SECTORSIZE: u16 = 1 << XFS_MAX_SECTORSIZE_LOG;
const XFS_DINODE_MIN_LOG: u8 = 8;
const XFS_DINODE_MAX_LOG: u8 = 11;
const XFS_DINODE_MIN_SIZE: u16 = 1 << XFS_DINODE_MIN_LOG;
const XFS_DINODE_MAX_SIZE: u16 = 1 << XFS_DINODE_MAX_LOG;

pub fn xfs_verify(sb: &XfsSuperBlock) -> Result<(), XfsError> {
    if sb.sb_magicnum.get() != XFS_SUPER_MAGIC {
        return Err(XfsError::InvalidMagic);
    }

    if sb.sb_agcount.get() == 0
        || sb.sb_sectsize.get() < XFS_MIN_SECTORSIZE
        || sb.sb_sectsize.get() > XFS_MAX_SECTORSIZE
        || !is_power_2(u64::from(sb.sb_sectsize.get()))
        || sb.sb_sectlog < XFS_MIN_SECTORSIZE_LOG
        || sb.sb_sectlog > XFS_MAX_SECTORSIZE_LOG
        || sb.sb_sectsize.get() != (1u16 << sb.sb_sectlog)
        || sb.sb_blocksize.get() < XFS_MIN_BLOCKSIZE
        || sb.sb_blocksize.get() > XFS_MAX_BLOCKSIZE
        || !is_power_2(u64::from(sb.sb_blocksize.get()))
        || sb.sb_blocklog < XFS_MIN_BLOCKSIZE_LOG
        || sb.sb_blocklog > XFS_MAX_BLOCKSIZE_LOG
        || sb.sb_blocksize.get() != (1u32 << sb.sb_blocklog)
        || sb.sb_inodesize.get() < XFS_DINODE_MIN_SIZE
        || sb.sb_inodesize.get() > XFS_DINODE_MAX_SIZE
        || sb.sb_inodelog < XFS_DINODE_MIN_LOG
        || sb.sb_inodelog > XFS_DINODE_MAX_LOG
        || sb.sb_inodesize.get() != (1u16 << sb.sb_inodelog)
        || u32::from(sb.sb_inodelog) + u32::from(sb.sb_inopblog) != u32::from(sb.sb_blocklog)
        || sb.sb_dblocks.get() == 0
    {
        return Err(XfsError::InvalidHeaderRanges);
    }

    return Ok(());
}

pub fn probe_xfs(probe: &mut Probe) -> Result<FilesystemInfo, XfsError> {
    let sb: XfsSuperBlock = probe.map_from_file(probe.offset())?;

    xfs_verify(&sb)?;

    // Stored directly, no log2 derivation like ext.
    let block_size = u64::from(sb.sb_blocksize.get());

    let label = if sb.sb_fname[0] != 0 {
        Some(decode_utf8_lossy_from(&sb.sb_fname))
    } else {
        None
    };

    let uuid = if sb.sb_uuid != [0u8; 16] {
        Some(Uuid::from_bytes(sb.sb_uuid))
    } else {
        None
    };

    return Ok(FilesystemInfo {
        fs_type: FsType::Xfs,
        total_capacity: sb.sb_dblocks.get() * block_size,
        free_capacity: sb.sb_fdblocks.get() * block_size,
        fs_block_size: block_size,
        uuid,
        label,
        mounts: Vec::new(),
    });
}
