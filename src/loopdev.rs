//! Loop device management
//!
//! Allocates loop devices through `/dev/loop-control` and binds image files
//! to them. See <https://lkml.org/lkml/2011/7/30/110> for the control-device
//! interface.

use std::fs::File;
use std::io;
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};

const LOOP_CONTROL: &str = "/dev/loop-control";

const LOOP_SET_FD: libc::c_ulong = 0x4C00;
const LOOP_CLR_FD: libc::c_ulong = 0x4C01;
const LOOP_SET_STATUS64: libc::c_ulong = 0x4C04;
const LOOP_CTL_GET_FREE: libc::c_ulong = 0x4C82;

/// `struct loop_info64` from `<linux/loop.h>`
#[repr(C)]
#[derive(Clone, Copy)]
struct LoopInfo64 {
    lo_device: u64,
    lo_inode: u64,
    lo_rdevice: u64,
    lo_offset: u64,
    lo_sizelimit: u64,
    lo_number: u32,
    lo_encrypt_type: u32,
    lo_encrypt_key_size: u32,
    lo_flags: u32,
    lo_file_name: [u8; 64],
    lo_crypt_name: [u8; 64],
    lo_encrypt_key: [u8; 32],
    lo_init: [u64; 2],
}

impl LoopInfo64 {
    fn zeroed() -> Self {
        // Safe: all-zero is a valid bit pattern for this plain-C struct
        unsafe { std::mem::zeroed() }
    }
}

fn device_path(n: i32) -> PathBuf {
    // Android puts loop nodes under /dev/block
    if Path::new("/dev/block").is_dir() {
        PathBuf::from(format!("/dev/block/loop{n}"))
    } else {
        PathBuf::from(format!("/dev/loop{n}"))
    }
}

/// Ask the control device for an unused loop device node.
pub fn find_unused() -> io::Result<PathBuf> {
    let control = File::options().read(true).write(true).open(LOOP_CONTROL)?;
    let n = unsafe { libc::ioctl(control.as_raw_fd(), LOOP_CTL_GET_FREE) };
    if n < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(device_path(n))
}

/// Bind `file` to `loopdev` at `offset`.
pub fn set_up_device(loopdev: &Path, file: &Path, offset: u64, read_only: bool) -> io::Result<()> {
    let backing = if read_only {
        File::open(file)?
    } else {
        File::options().read(true).write(true).open(file)?
    };
    let device = if read_only {
        File::open(loopdev)?
    } else {
        File::options().read(true).write(true).open(loopdev)?
    };

    if unsafe { libc::ioctl(device.as_raw_fd(), LOOP_SET_FD, backing.as_raw_fd()) } < 0 {
        return Err(io::Error::last_os_error());
    }

    let mut info = LoopInfo64::zeroed();
    info.lo_offset = offset;

    if unsafe { libc::ioctl(device.as_raw_fd(), LOOP_SET_STATUS64, &info) } < 0 {
        let err = io::Error::last_os_error();
        // Roll back the fd binding; the device would otherwise stay claimed
        unsafe {
            libc::ioctl(device.as_raw_fd(), LOOP_CLR_FD, 0);
        }
        return Err(err);
    }

    Ok(())
}

/// Detach whatever `loopdev` is bound to.
pub fn remove_device(loopdev: &Path) -> io::Result<()> {
    let device = File::open(loopdev)?;
    if unsafe { libc::ioctl(device.as_raw_fd(), LOOP_CLR_FD, 0) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
