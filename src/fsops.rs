//! Single-path filesystem primitives
//!
//! Building blocks shared by the protocol handlers and the recursive
//! visitors: data copies, attribute/xattr propagation, and single-entry
//! recreation for every file kind. All of these operate on one path pair;
//! tree-wide behavior lives in [`crate::walk`].

use std::ffi::CString;
use std::fs::File;
use std::io::{self, Read, Write};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::path::{Path, PathBuf};

use nix::sys::stat::{mknod, Mode, SFlag};
use nix::unistd::mkfifo;
use tracing::warn;

/// Permission bits preserved by attribute copies, including setuid/setgid
/// and the sticky bit.
const FULL_PERM_MASK: u32 = 0o7777;

const COPY_BUF_SIZE: usize = 10240;

/// NUL-terminate a path for the libc calls that need one.
pub(crate) fn path_cstr(path: &Path) -> io::Result<CString> {
    CString::new(path.as_os_str().as_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains NUL byte"))
}

/// Stream everything readable from `source` into `target`.
pub fn copy_data_stream<R: Read, W: Write>(source: &mut R, target: &mut W) -> io::Result<u64> {
    let mut buf = [0u8; COPY_BUF_SIZE];
    let mut total = 0u64;
    loop {
        let n = source.read(&mut buf)?;
        if n == 0 {
            break;
        }
        target.write_all(&buf[..n])?;
        total += n as u64;
    }
    target.flush()?;
    Ok(total)
}

/// Copy `source`'s contents into a newly created `target`.
///
/// Fails if `target` already exists; recursive copy removes stale entries
/// first, so an existing target here means a race.
pub fn copy_data(source: &Path, target: &Path) -> io::Result<()> {
    let mut src = File::open(source)?;
    let mut dst = File::options().write(true).create_new(true).open(target)?;
    copy_data_stream(&mut src, &mut dst)?;
    Ok(())
}

/// Copy `source`'s contents over `target`, truncating or creating it.
///
/// Also works when `target` is a block device (truncation is a no-op there),
/// which is how boot images reach their partition.
pub fn copy_contents(source: &Path, target: &Path) -> io::Result<()> {
    let mut src = File::open(source)?;
    let mut dst = File::options()
        .write(true)
        .create(true)
        .truncate(true)
        .open(target)?;
    copy_data_stream(&mut src, &mut dst)?;
    Ok(())
}

/// Copy ownership and permissions from `source` to `target`.
///
/// Ownership goes through lchown(2) so symlink targets are untouched; mode
/// bits are skipped for symlinks since Linux has no mode on links.
pub fn copy_stat(source: &Path, target: &Path) -> io::Result<()> {
    let sb = std::fs::symlink_metadata(source)?;
    let c_target = path_cstr(target)?;

    if unsafe { libc::lchown(c_target.as_ptr(), sb.uid(), sb.gid()) } < 0 {
        return Err(io::Error::last_os_error());
    }

    if !sb.file_type().is_symlink() {
        let mode = sb.mode() & FULL_PERM_MASK;
        if unsafe { libc::chmod(c_target.as_ptr(), mode as libc::mode_t) } < 0 {
            return Err(io::Error::last_os_error());
        }
    }

    Ok(())
}

fn list_xattrs(c_path: &CString) -> io::Result<Vec<CString>> {
    let size = unsafe { libc::llistxattr(c_path.as_ptr(), std::ptr::null_mut(), 0) };
    if size < 0 {
        return Err(io::Error::last_os_error());
    }
    if size == 0 {
        return Ok(Vec::new());
    }

    let mut buf = vec![0u8; size as usize];
    let size = unsafe {
        libc::llistxattr(
            c_path.as_ptr(),
            buf.as_mut_ptr().cast::<libc::c_char>(),
            buf.len(),
        )
    };
    if size < 0 {
        return Err(io::Error::last_os_error());
    }
    buf.truncate(size as usize);

    Ok(buf
        .split(|&b| b == 0)
        .filter(|name| !name.is_empty())
        .filter_map(|name| CString::new(name).ok())
        .collect())
}

fn get_xattr(c_path: &CString, name: &CString) -> io::Result<Vec<u8>> {
    let size = unsafe { libc::lgetxattr(c_path.as_ptr(), name.as_ptr(), std::ptr::null_mut(), 0) };
    if size < 0 {
        return Err(io::Error::last_os_error());
    }

    let mut value = vec![0u8; size as usize];
    let size = unsafe {
        libc::lgetxattr(
            c_path.as_ptr(),
            name.as_ptr(),
            value.as_mut_ptr().cast::<libc::c_void>(),
            value.len(),
        )
    };
    if size < 0 {
        return Err(io::Error::last_os_error());
    }
    value.truncate(size as usize);
    Ok(value)
}

/// Copy every extended attribute from `source` to `target`.
///
/// Filesystems without xattr support make the whole copy a no-op; a single
/// attribute the target filesystem refuses is logged and skipped.
pub fn copy_xattrs(source: &Path, target: &Path) -> io::Result<()> {
    let c_source = path_cstr(source)?;
    let c_target = path_cstr(target)?;

    let names = match list_xattrs(&c_source) {
        Ok(names) => names,
        Err(e) if e.raw_os_error() == Some(libc::ENOTSUP) => return Ok(()),
        Err(e) => return Err(e),
    };

    for name in names {
        let value = get_xattr(&c_source, &name)?;
        let ret = unsafe {
            libc::lsetxattr(
                c_target.as_ptr(),
                name.as_ptr(),
                value.as_ptr().cast::<libc::c_void>(),
                value.len(),
                0,
            )
        };
        if ret < 0 {
            let e = io::Error::last_os_error();
            if e.raw_os_error() == Some(libc::ENOTSUP) {
                return Ok(());
            }
            warn!(
                "{}: failed to set xattr {:?}: {}",
                target.display(),
                name,
                e
            );
        }
    }

    Ok(())
}

/// Read a symlink's target path.
pub fn read_link_path(path: &Path) -> io::Result<PathBuf> {
    std::fs::read_link(path)
}

/// True if both paths resolve to the same (device, inode) pair.
pub fn inodes_equal(a: &Path, b: &Path) -> io::Result<bool> {
    let sa = std::fs::metadata(a)?;
    let sb = std::fs::metadata(b)?;
    Ok((sa.dev(), sa.ino()) == (sb.dev(), sb.ino()))
}

/// Remove whatever non-directory entry sits at `path`, if anything does.
pub fn remove_existing(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Behavior toggles for [`copy_file`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyFileOptions {
    /// Copy ownership and permission bits onto the new entry
    pub attributes: bool,
    /// Copy extended attributes onto the new entry
    pub xattrs: bool,
    /// Operate on the entry a symlink points at instead of the link itself
    pub follow_symlinks: bool,
}

/// Copy one non-directory entry, recreating its kind at `target`.
///
/// Existing targets are removed first. Directories and sockets are not
/// copyable this way and are rejected.
pub fn copy_file(source: &Path, target: &Path, options: CopyFileOptions) -> io::Result<()> {
    let sb = if options.follow_symlinks {
        std::fs::metadata(source)?
    } else {
        std::fs::symlink_metadata(source)?
    };
    let file_type = sb.file_type();

    remove_existing(target)?;

    if file_type.is_file() {
        copy_data(source, target)?;
    } else if file_type.is_symlink() {
        let link_target = read_link_path(source)?;
        std::os::unix::fs::symlink(&link_target, target)?;
    } else if file_type.is_block_device() {
        mknod(target, SFlag::S_IFBLK, Mode::S_IRWXU, sb.rdev())
            .map_err(|e| io::Error::from_raw_os_error(e as i32))?;
    } else if file_type.is_char_device() {
        mknod(target, SFlag::S_IFCHR, Mode::S_IRWXU, sb.rdev())
            .map_err(|e| io::Error::from_raw_os_error(e as i32))?;
    } else if file_type.is_fifo() {
        mkfifo(target, Mode::S_IRWXU).map_err(|e| io::Error::from_raw_os_error(e as i32))?;
    } else {
        // Directories and sockets
        return Err(io::Error::from_raw_os_error(libc::EINVAL));
    }

    if options.attributes {
        copy_stat(source, target)?;
    }
    if options.xattrs {
        copy_xattrs(source, target)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn copy_data_refuses_existing_target() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        std::fs::write(&src, b"hello").unwrap();
        std::fs::write(&dst, b"old").unwrap();
        assert!(copy_data(&src, &dst).is_err());
    }

    #[test]
    fn copy_contents_truncates_target() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        std::fs::write(&src, b"hi").unwrap();
        std::fs::write(&dst, b"a much longer original").unwrap();
        copy_contents(&src, &dst).unwrap();
        assert_eq!(std::fs::read(&dst).unwrap(), b"hi");
    }

    #[test]
    fn copy_stat_preserves_mode() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        std::fs::write(&src, b"x").unwrap();
        std::fs::write(&dst, b"y").unwrap();
        std::fs::set_permissions(&src, std::fs::Permissions::from_mode(0o640)).unwrap();
        copy_stat(&src, &dst).unwrap();
        let mode = std::fs::metadata(&dst).unwrap().mode() & FULL_PERM_MASK;
        assert_eq!(mode, 0o640);
    }

    #[test]
    fn copy_file_recreates_symlink() {
        let tmp = tempfile::tempdir().unwrap();
        let link = tmp.path().join("link");
        let copy = tmp.path().join("copy");
        std::os::unix::fs::symlink("/nonexistent/somewhere", &link).unwrap();
        copy_file(&link, &copy, CopyFileOptions::default()).unwrap();
        assert_eq!(
            read_link_path(&copy).unwrap(),
            PathBuf::from("/nonexistent/somewhere")
        );
    }

    #[test]
    fn inodes_equal_detects_hard_links() {
        let tmp = tempfile::tempdir().unwrap();
        let a = tmp.path().join("a");
        let b = tmp.path().join("b");
        let c = tmp.path().join("c");
        std::fs::write(&a, b"x").unwrap();
        std::fs::hard_link(&a, &b).unwrap();
        std::fs::write(&c, b"x").unwrap();
        assert!(inodes_equal(&a, &b).unwrap());
        assert!(!inodes_equal(&a, &c).unwrap());
    }
}
