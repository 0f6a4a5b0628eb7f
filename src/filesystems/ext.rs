use std::io::Error as IoError;

use bitflags::bitflags;
use thiserror::Error;
use uuid::Uuid;
use zerocopy::{
    FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
    byteorder::{LittleEndian, U16, U32, U64},
};

use crate::{
    filesystems::FsError,
    probe::{FilesystemInfo, FsIdinfo, FsMagic, FsType, Probe},
    util::decode_utf8_lossy_from,
};

/*
https://www.kernel.org/doc/html/latest/filesystems/ext4/globals.html
*/

#[derive(Debug, Error)]
pub enum ExtError {
    #[error("I/O operation failed: {0}")]
    IoError(#[from] IoError),
    #[error("Invalid ext magic signature")]
    InvalidMagic,
    #[error("Invalid ext header ranges")]
    InvalidHeaderRanges,
}

impl ExtError {
    /// "Not an ext filesystem" rather than a device fault.
    pub fn is_mismatch(&self) -> bool {
        return !matches!(self, ExtError::IoError(_));
    }
}

pub const EXT4_ID_INFO: FsIdinfo = FsIdinfo {
    name: "ext4",
    fs_type: FsType::Ext4,
    probe_fn: |probe| probe_ext4(probe).map_err(FsError::from),
    magic: FsMagic {
        magic: &[0x53, 0xEF],
        len: 2,
        b_offset: 0x38,
    },
};

pub const EXT_SUPER_MAGIC: u16 = 0xEF53;

// 1024 << 6 is the 64KiB ceiling the format allows.
const EXT_MAX_BLOCK_LOG_SIZE: u32 = 6;

/// On-disk ext2/3/4 superblock, little-endian. The trailing fields past
/// `s_raid_stripe_width` are not interpreted here and are kept as one
/// reserved run so the struct stays exactly 1024 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Unaligned, Immutable, KnownLayout)]
pub struct Ext4SuperBlock {
    pub s_inodes_count: U32<LittleEndian>,
    pub s_blocks_count_lo: U32<LittleEndian>,
    pub s_r_blocks_count_lo: U32<LittleEndian>,
    pub s_free_blocks_count_lo: U32<LittleEndian>,
    pub s_free_inodes_count: U32<LittleEndian>,
    pub s_first_data_block: U32<LittleEndian>,
    pub s_log_block_size: U32<LittleEndian>,
    pub s_log_cluster_size: U32<LittleEndian>,
    pub s_blocks_per_group: U32<LittleEndian>,
    pub s_clusters_per_group: U32<LittleEndian>,
    pub s_inodes_per_group: U32<LittleEndian>,
    pub s_mtime: U32<LittleEndian>,
    pub s_wtime: U32<LittleEndian>,
    pub s_mnt_count: U16<LittleEndian>,
    pub s_max_mnt_count: U16<LittleEndian>,
    pub s_magic: U16<LittleEndian>,
    pub s_state: U16<LittleEndian>,
    pub s_errors: U16<LittleEndian>,
    pub s_minor_rev_level: U16<LittleEndian>,
    pub s_lastcheck: U32<LittleEndian>,
    pub s_checkinterval: U32<LittleEndian>,
    pub s_creator_os: U32<LittleEndian>,
    pub s_rev_level: U32<LittleEndian>,
    pub s_def_resuid: U16<LittleEndian>,
    pub s_def_resgid: U16<LittleEndian>,
    pub s_first_ino: U32<LittleEndian>,
    pub s_inode_size: U16<LittleEndian>,
    pub s_block_group_nr: U16<LittleEndian>,
    pub s_feature_compat: U32<LittleEndian>,
    pub s_feature_incompat: U32<LittleEndian>,
    pub s_feature_ro_compat: U32<LittleEndian>,
    pub s_uuid: [u8; 16],
    pub s_volume_name: [u8; 16],
    pub s_last_mounted: [u8; 64],
    pub s_algorithm_usage_bitmap: U32<LittleEndian>,
    pub s_prealloc_blocks: u8,
    pub s_prealloc_dir_blocks: u8,
    pub s_reserved_gdt_blocks: U16<LittleEndian>,
    pub s_journal_uuid: [u8; 16],
    pub s_journal_inum: U32<LittleEndian>,
    pub s_journal_dev: U32<LittleEndian>,
    pub s_last_orphan: U32<LittleEndian>,
    pub s_hash_seed: [U32<LittleEndian>; 4],
    pub s_def_hash_version: u8,
    pub s_jnl_backup_type: u8,
    pub s_desc_size: U16<LittleEndian>,
    pub s_default_mount_opts: U32<LittleEndian>,
    pub s_first_meta_bg: U32<LittleEndian>,
    pub s_mkfs_time: U32<LittleEndian>,
    pub s_jnl_blocks: [U32<LittleEndian>; 17],
    pub s_blocks_count_hi: U32<LittleEndian>,
    pub s_r_blocks_count_hi: U32<LittleEndian>,
    pub s_free_blocks_count_hi: U32<LittleEndian>,
    pub s_min_extra_isize: U16<LittleEndian>,
    pub s_want_extra_isize: U16<LittleEndian>,
    pub s_flags: U32<LittleEndian>,
    pub s_raid_stride: U16<LittleEndian>,
    pub s_mmp_update_interval: U16<LittleEndian>,
    pub s_mmp_block: U64<LittleEndian>,
    pub s_raid_stripe_width: U32<LittleEndian>,
    s_reserved: [U32<LittleEndian>; 162],
    pub s_checksum: U32<LittleEndian>,
}

bitflags! {
    #[derive(Debug, Copy, Clone, Eq, PartialEq)]
    pub struct FeatureIncompat: u32 {
        const EXT2_FEATURE_INCOMPAT_FILETYPE    = 0x0002;
        const EXT3_FEATURE_INCOMPAT_RECOVER     = 0x0004;
        const EXT3_FEATURE_INCOMPAT_JOURNAL_DEV = 0x0008;
        const EXT2_FEATURE_INCOMPAT_META_BG     = 0x0010;
        const EXT4_FEATURE_INCOMPAT_EXTENTS     = 0x0040;
        const EXT4_FEATURE_INCOMPAT_64BIT       = 0x0080;
        const EXT4_FEATURE_INCOMPAT_MMP         = 0x0100;
        const EXT4_FEATURE_INCOMPAT_FLEX_BG     = 0x0200;
    }
}

fn has_incompat(incompat: u32, feature: FeatureIncompat) -> bool {
    FeatureIncompat::from_bits_truncate(incompat).contains(feature)
}

/// Total block count, widened with the high half when the 64bit feature
/// says it is present.
fn ext_blocks_count(sb: &Ext4SuperBlock) -> u64 {
    let lo = u64::from(sb.s_blocks_count_lo.get());

    if has_incompat(
        sb.s_feature_incompat.get(),
        FeatureIncompat::EXT4_FEATURE_INCOMPAT_64BIT,
    ) {
        return lo | (u64::from(sb.s_blocks_count_hi.get()) << 32);
    }
    return lo;
}

fn ext_free_blocks_count(sb: &Ext4SuperBlock) -> u64 {
    let lo = u64::from(sb.s_free_blocks_count_lo.get());

    if has_incompat(
        sb.s_feature_incompat.get(),
        FeatureIncompat::EXT4_FEATURE_INCOMPAT_64BIT,
    ) {
        return lo | (u64::from(sb.s_free_blocks_count_hi.get()) << 32);
    }
    return lo;
}

pub fn ext_verify(sb: &Ext4SuperBlock) -> Result<(), ExtError> {
    if sb.s_magic.get() != EXT_SUPER_MAGIC {
        return Err(ExtError::InvalidMagic);
    }

    if sb.s_log_block_size.get() > EXT_MAX_BLOCK_LOG_SIZE || ext_blocks_count(sb) == 0 {
        return Err(ExtError::InvalidHeaderRanges);
    }

    return Ok(());
}

pub fn probe_ext4(probe: &mut Probe) -> Result<FilesystemInfo, ExtError> {
    let sb: Ext4SuperBlock = probe.map_from_file(probe.offset())?;

    ext_verify(&sb)?;

    // The stored exponent is relative to a 1024 byte base unit.
    let block_size = 1024u64 << sb.s_log_block_size.get();

    let label = if sb.s_volume_name[0] != 0 {
        Some(decode_utf8_lossy_from(&sb.s_volume_name))
    } else {
        None
    };

    let uuid = if sb.s_uuid != [0u8; 16] {
        Some(Uuid::from_bytes(sb.s_uuid))
    } else {
        None
    };

    return Ok(FilesystemInfo {
        fs_type: FsType::Ext4,
        total_capacity: ext_blocks_count(&sb) * block_size,
        free_capacity: ext_free_blocks_count(&sb) * block_size,
        fs_block_size: block_size,
        uuid,
        label,
        mounts: Vec::new(),
    });
}
