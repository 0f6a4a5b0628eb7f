use std::io::{Seek, SeekFrom, Write};

use tempfile::NamedTempFile;
use zerocopy::{FromZeros, IntoBytes};

use crate::{
    FilesystemInfo, FsType, Mount, ProbeError,
    filesystems::{
        FsError,
        ext::{EXT_SUPER_MAGIC, Ext4SuperBlock, ExtError, FeatureIncompat, probe_ext4},
        xfs::{XFS_SUPER_MAGIC, XfsError, XfsSuperBlock, probe_xfs},
    },
    magic, probe_fs,
    probe::Probe,
};

/// Writes `sb` at byte `lead` of a fresh temp file and pads the file with
/// zeros out to `total_len`.
fn device_image(lead: u64, sb: &[u8], total_len: u64) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();

    file.as_file_mut().seek(SeekFrom::Start(lead)).unwrap();
    file.as_file_mut().write_all(sb).unwrap();
    file.as_file_mut()
        .set_len(total_len.max(lead + sb.len() as u64))
        .unwrap();

    file
}

fn ext4_superblock(log_block_size: u32, blocks: u32, free_blocks: u32) -> Ext4SuperBlock {
    let mut sb = Ext4SuperBlock::new_zeroed();

    sb.s_magic.set(EXT_SUPER_MAGIC);
    sb.s_log_block_size.set(log_block_size);
    sb.s_blocks_count_lo.set(blocks);
    sb.s_free_blocks_count_lo.set(free_blocks);
    sb.s_inodes_count.set(blocks / 4);
    sb.s_rev_level.set(1);

    sb
}

fn xfs_superblock(block_size: u32, dblocks: u64, fdblocks: u64) -> XfsSuperBlock {
    let mut sb = XfsSuperBlock::new_zeroed();

    sb.sb_magicnum.set(XFS_SUPER_MAGIC);
    sb.sb_blocksize.set(block_size);
    sb.sb_blocklog = block_size.trailing_zeros() as u8;
    sb.sb_sectsize.set(512);
    sb.sb_sectlog = 9;
    sb.sb_inodesize.set(256);
    sb.sb_inodelog = 8;
    sb.sb_inopblog = sb.sb_blocklog - sb.sb_inodelog;
    sb.sb_inopblock.set((block_size / 256) as u16);
    sb.sb_agcount.set(4);
    sb.sb_agblocks.set((dblocks / 4) as u32);
    sb.sb_dblocks.set(dblocks);
    sb.sb_fdblocks.set(fdblocks);

    sb
}

#[test]
fn ext4_reports_shifted_block_size() {
    let sb = ext4_superblock(2, 1000, 250);
    let img = device_image(1024, sb.as_bytes(), 4096);

    let info = probe_fs(img.path(), 512, 2).unwrap();

    assert_eq!(info.fs_type, FsType::Ext4);
    assert_eq!(info.fs_block_size, 4096);
    assert_eq!(info.total_capacity, 4_096_000);
    assert_eq!(info.free_capacity, 1_024_000);
    assert!(info.mounts.is_empty());
    assert_eq!(info.uuid, None);
    assert_eq!(info.label, None);
}

#[test]
fn ext4_handles_64bit_block_counts() {
    let mut sb = ext4_superblock(0, 1000, 100);
    sb.s_feature_incompat
        .set(FeatureIncompat::EXT4_FEATURE_INCOMPAT_64BIT.bits());
    sb.s_blocks_count_hi.set(1);

    let img = device_image(0, sb.as_bytes(), 4096);
    let info = probe_fs(img.path(), 512, 0).unwrap();

    assert_eq!(info.total_capacity, ((1u64 << 32) + 1000) * 1024);
    assert_eq!(info.free_capacity, 100 * 1024);
}

#[test]
fn ext4_extracts_uuid_and_label() {
    let mut sb = ext4_superblock(0, 100, 10);
    sb.s_uuid = [
        0xd6, 0x5b, 0x25, 0x5e, 0xb2, 0x33, 0x43, 0x3c, 0x82, 0x22, 0xfa, 0x3c, 0xa6, 0x55, 0xa4,
        0xbf,
    ];
    sb.s_volume_name[..4].copy_from_slice(b"data");

    let img = device_image(0, sb.as_bytes(), 4096);
    let info = probe_fs(img.path(), 512, 0).unwrap();

    assert_eq!(
        info.uuid.unwrap().to_string(),
        "d65b255e-b233-433c-8222-fa3ca655a4bf"
    );
    assert_eq!(info.label.as_deref(), Some("data"));
}

#[test]
fn xfs_reports_capacity() {
    let sb = xfs_superblock(4096, 1000, 600);
    let img = device_image(0, sb.as_bytes(), 8192);

    let info = probe_fs(img.path(), 512, 0).unwrap();

    assert_eq!(info.fs_type, FsType::Xfs);
    assert_eq!(info.fs_block_size, 4096);
    assert_eq!(info.total_capacity, 4_096_000);
    assert_eq!(info.free_capacity, 600 * 4096);
    assert!(info.mounts.is_empty());
}

#[test]
fn xfs_honors_probe_offset() {
    let sb = xfs_superblock(4096, 77056, 16384);
    let img = device_image(4096, sb.as_bytes(), 16384);

    let info = probe_fs(img.path(), 512, 8).unwrap();

    assert_eq!(info.fs_type, FsType::Xfs);
    assert_eq!(info.total_capacity, 77056 * 4096);
}

#[test]
fn decoders_reject_foreign_magic() {
    let xfs_img = device_image(0, xfs_superblock(4096, 1000, 0).as_bytes(), 4096);
    let mut probe = Probe::from_filename(xfs_img.path(), 0).unwrap();
    let err = probe_ext4(&mut probe).unwrap_err();
    assert!(matches!(err, ExtError::InvalidMagic));
    assert!(err.is_mismatch());

    let ext_img = device_image(0, ext4_superblock(2, 1000, 0).as_bytes(), 4096);
    let mut probe = Probe::from_filename(ext_img.path(), 0).unwrap();
    let err = probe_xfs(&mut probe).unwrap_err();
    assert!(matches!(err, XfsError::InvalidMagic));
    assert!(err.is_mismatch());
}

#[test]
fn truncated_device_is_hard_error() {
    let img = device_image(0, &[0u8; 100], 100);

    let err = probe_fs(img.path(), 512, 0).unwrap_err();
    assert!(matches!(
        err,
        ProbeError::FsError(FsError::Ext(ExtError::IoError(_)))
    ));

    // Shorter than the XFS structure as well, and just as hard an error.
    let mut probe = Probe::from_filename(img.path(), 0).unwrap();
    let err = probe_xfs(&mut probe).unwrap_err();
    assert!(matches!(err, XfsError::IoError(_)));
    assert!(!err.is_mismatch());
}

#[test]
fn empty_device_reports_no_filesystem() {
    let img = device_image(0, &[], 1 << 20);

    let err = probe_fs(img.path(), 512, 0).unwrap_err();
    assert!(matches!(err, ProbeError::NoFilesystemFound));
}

#[test]
fn missing_device_is_io_error() {
    let err = probe_fs("/nonexistent/fsprobe-test-device", 512, 0).unwrap_err();
    assert!(matches!(err, ProbeError::IoError(_)));
}

#[test]
fn ext4_tried_before_xfs() {
    // One region that satisfies both decoders: a valid XFS superblock whose
    // bytes also carry the ext magic at 0x38 and a sane ext block-size
    // exponent at 0x18. Those land in XFS fields no validation looks at.
    let mut raw = xfs_superblock(4096, 1000, 500).as_bytes().to_vec();
    raw.resize(4096, 0);
    raw[24..28].copy_from_slice(&2u32.to_le_bytes());
    raw[56..58].copy_from_slice(&EXT_SUPER_MAGIC.to_le_bytes());

    let img = device_image(0, &raw, 4096);

    let mut probe = Probe::from_filename(img.path(), 0).unwrap();
    assert!(probe_xfs(&mut probe).is_ok());
    let mut probe = Probe::from_filename(img.path(), 0).unwrap();
    assert!(probe_ext4(&mut probe).is_ok());

    let info = probe_fs(img.path(), 512, 0).unwrap();
    assert_eq!(info.fs_type, FsType::Ext4);
}

#[test]
fn bad_geometry_is_soft_mismatch() {
    let mut sb = xfs_superblock(4096, 1000, 0);
    sb.sb_blocksize.set(3000);
    let img = device_image(0, sb.as_bytes(), 4096);

    let mut probe = Probe::from_filename(img.path(), 0).unwrap();
    let err = probe_xfs(&mut probe).unwrap_err();
    assert!(matches!(err, XfsError::InvalidHeaderRanges));
    assert!(err.is_mismatch());

    let err = probe_fs(img.path(), 512, 0).unwrap_err();
    assert!(matches!(err, ProbeError::NoFilesystemFound));

    let sb = ext4_superblock(12, 1000, 0);
    let img = device_image(0, sb.as_bytes(), 4096);

    let mut probe = Probe::from_filename(img.path(), 0).unwrap();
    let err = probe_ext4(&mut probe).unwrap_err();
    assert!(matches!(err, ExtError::InvalidHeaderRanges));
    assert!(err.is_mismatch());
}

#[test]
fn registry_resolves_shared_and_unknown_magics() {
    assert_eq!(magic::name_of(0xEF53), Some("ext2"));
    assert_eq!(
        magic::names_of(0xEF53).collect::<Vec<_>>(),
        ["ext2", "ext3", "ext4"]
    );
    assert_eq!(magic::name_of(0x58465342), Some("xfs"));
    assert_eq!(magic::name_of(0x01021994), Some("tmpfs"));
    assert_eq!(magic::name_of(0xDEAD_BEEF), None);
    assert!(magic::SUPER_MAGICS.len() >= 80);
}

#[test]
fn filesystem_info_json_contract() {
    let sb = ext4_superblock(2, 1000, 0);
    let img = device_image(0, sb.as_bytes(), 4096);
    let info = probe_fs(img.path(), 512, 0).unwrap();

    let value = serde_json::to_value(&info).unwrap();
    assert_eq!(value["fsType"], "ext4");
    assert_eq!(value["totalCapacity"].as_u64(), Some(4_096_000));
    assert_eq!(value["fsBlockSize"].as_u64(), Some(4096));
    // Zero and empty fields are omitted entirely.
    assert!(value.get("freeCapacity").is_none());
    assert!(value.get("mounts").is_none());
    assert!(value.get("uuid").is_none());
    assert!(value.get("label").is_none());

    let back: FilesystemInfo = serde_json::from_value(value).unwrap();
    assert_eq!(back, info);
}

#[test]
fn mounts_pass_through_serialization() {
    let sb = xfs_superblock(4096, 1000, 600);
    let img = device_image(0, sb.as_bytes(), 8192);
    let mut info = probe_fs(img.path(), 512, 0).unwrap();

    info.mounts.push(Mount {
        mount_point: "/var/lib/data".to_string(),
        major_minor: "259:3".to_string(),
        fs_type: "xfs".to_string(),
        ..Mount::default()
    });

    let value = serde_json::to_value(&info).unwrap();
    assert_eq!(value["mounts"][0]["mountPoint"], "/var/lib/data");
    assert_eq!(value["mounts"][0]["majorMinor"], "259:3");
    assert!(value["mounts"][0].get("mountFlags").is_none());
}

#[test]
fn probe_geometry_defaults_for_regular_files() {
    let img = device_image(0, &[], 8192);

    let probe = Probe::from_filename(img.path(), 0).unwrap();

    assert!(probe.is_regular_file());
    assert!(!probe.is_block_device());
    assert_eq!(probe.ssz(), 512);
    assert_eq!(probe.size(), 8192);
    assert_eq!(probe.offset(), 0);
    assert_eq!(probe.devno_maj(), 0);
}
