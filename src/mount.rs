//! Mount-table operations
//!
//! Thin wrappers over mount(2)/umount(2) plus `/proc/mounts` scans. Loop
//! devices and the mount table are shared across sessions, so unmounting is
//! retried with backoff instead of synchronized.

use std::io;
use std::path::Path;
use std::thread;
use std::time::Duration;

use tracing::{debug, error};

use crate::fsops::path_cstr;
use crate::loopdev;

const PROC_MOUNTS: &str = "/proc/mounts";
const MAX_UNMOUNT_TRIES: u32 = 5;

/// Mountpoints currently present in `/proc/mounts`.
///
/// Octal escapes in mount paths (spaces etc.) are left as-is; the daemon
/// only deals in plain paths.
fn mountpoints() -> io::Result<Vec<String>> {
    let contents = std::fs::read_to_string(PROC_MOUNTS)?;
    Ok(contents
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .map(str::to_string)
        .collect())
}

/// True if `mountpoint` has something mounted on it.
pub fn is_mounted(mountpoint: &Path) -> io::Result<bool> {
    let needle = mountpoint.to_string_lossy();
    Ok(mountpoints()?.iter().any(|m| *m == needle))
}

fn mount_raw(
    source: &Path,
    target: &Path,
    fstype: Option<&str>,
    flags: libc::c_ulong,
) -> io::Result<()> {
    let c_source = path_cstr(source)?;
    let c_target = path_cstr(target)?;
    let c_fstype = fstype
        .map(|t| std::ffi::CString::new(t))
        .transpose()
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "fstype contains NUL"))?;

    let ret = unsafe {
        libc::mount(
            c_source.as_ptr(),
            c_target.as_ptr(),
            c_fstype.as_ref().map_or(std::ptr::null(), |t| t.as_ptr()),
            flags,
            std::ptr::null(),
        )
    };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Bind-mount `source` onto `target`.
///
/// Not driven by any request handler; part of the mount surface used by
/// operational tooling alongside image mounts.
pub fn bind_mount(source: &Path, target: &Path) -> io::Result<()> {
    mount_raw(source, target, None, libc::MS_BIND)
}

/// Remount whatever is on `target` read-write.
pub fn remount_writable(target: &Path) -> io::Result<()> {
    mount_raw(Path::new(""), target, Some(""), libc::MS_REMOUNT)
}

/// Mount an image file on `mountpoint` through a fresh loop device.
pub fn mount_image(
    image: &Path,
    mountpoint: &Path,
    fstype: &str,
    read_only: bool,
) -> io::Result<()> {
    let loopdev = loopdev::find_unused()?;
    loopdev::set_up_device(&loopdev, image, 0, read_only)?;

    let flags = if read_only { libc::MS_RDONLY } else { 0 };
    if let Err(e) = mount_raw(&loopdev, mountpoint, Some(fstype), flags) {
        // Don't leak the loop device on a failed mount
        let _ = loopdev::remove_device(&loopdev);
        return Err(e);
    }
    debug!(
        "mounted {} on {} via {}",
        image.display(),
        mountpoint.display(),
        loopdev.display()
    );
    Ok(())
}

/// Unmount a single mountpoint.
pub fn unmount(target: &Path) -> io::Result<()> {
    let c_target = path_cstr(target)?;
    if unsafe { libc::umount(c_target.as_ptr()) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Unmount everything mounted at or below `dir`, retrying with backoff.
///
/// Nested mounts need multiple passes; busy mounts get a few chances to
/// quiesce before the whole operation is reported as failed.
pub fn unmount_all(dir: &Path) -> io::Result<bool> {
    let prefix = dir.to_string_lossy().into_owned();

    for tries in 0..MAX_UNMOUNT_TRIES {
        let mut failed = 0u32;

        for mountpoint in mountpoints()? {
            if mountpoint.starts_with(&prefix) {
                if let Err(e) = unmount(Path::new(&mountpoint)) {
                    error!("failed to unmount {}: {}", mountpoint, e);
                    failed += 1;
                }
            }
        }

        if failed == 0 {
            return Ok(true);
        }

        // No point backing off when there is no attempt left
        if tries + 1 < MAX_UNMOUNT_TRIES {
            thread::sleep(Duration::from_millis(100 * u64::from(tries + 1)));
        }
    }

    Ok(false)
}
