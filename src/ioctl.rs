use rustix::{
    fd::AsFd,
    io,
    ioctl::{Getter, ioctl},
};

/* <linux/fs.h> block device geometry requests */
const BLKSSZGET: u32 = 0x1268;
const BLKGETSIZE64: u32 = 0x80081272;

/// Logical sector size in bytes of a block device (`BLKSSZGET`).
#[inline]
pub fn logical_block_size<Fd: AsFd>(fd: Fd) -> io::Result<u32> {
    unsafe {
        let ctl = Getter::<{ BLKSSZGET }, u32>::new();
        ioctl(fd, ctl)
    }
}

/// Total size in bytes of a block device (`BLKGETSIZE64`).
#[inline]
pub fn device_size_bytes<Fd: AsFd>(fd: Fd) -> io::Result<u64> {
    unsafe {
        let ctl = Getter::<{ BLKGETSIZE64 }, u64>::new();
        ioctl(fd, ctl)
    }
}
