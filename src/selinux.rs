//! SELinux label access through the `security.selinux` xattr
//!
//! Labels are read and written directly as extended attributes rather than
//! through libselinux; the stored value carries a trailing NUL, which is
//! stripped on read and appended on write.

use std::ffi::CString;
use std::io;
use std::os::fd::{AsRawFd, BorrowedFd};
use std::path::Path;

use crate::fsops::path_cstr;

const SELINUX_XATTR: &[u8] = b"security.selinux\0";
const ENFORCE_PATH: &str = "/sys/fs/selinux/enforce";

fn xattr_name() -> *const libc::c_char {
    SELINUX_XATTR.as_ptr().cast::<libc::c_char>()
}

fn context_from_value(mut value: Vec<u8>) -> io::Result<String> {
    if value.last() == Some(&0) {
        value.pop();
    }
    String::from_utf8(value)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "label is not valid UTF-8"))
}

fn context_to_value(context: &str) -> io::Result<CString> {
    CString::new(context)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "label contains NUL byte"))
}

fn read_label(
    getter: impl Fn(*mut libc::c_void, libc::size_t) -> libc::ssize_t,
) -> io::Result<String> {
    let size = getter(std::ptr::null_mut(), 0);
    if size < 0 {
        return Err(io::Error::last_os_error());
    }

    let mut value = vec![0u8; size as usize];
    let size = getter(value.as_mut_ptr().cast::<libc::c_void>(), value.len());
    if size < 0 {
        return Err(io::Error::last_os_error());
    }
    value.truncate(size as usize);
    context_from_value(value)
}

/// Label of `path`, following symlinks.
pub fn get_context(path: &Path) -> io::Result<String> {
    let c_path = path_cstr(path)?;
    read_label(|buf, len| unsafe { libc::getxattr(c_path.as_ptr(), xattr_name(), buf, len) })
}

/// Label of `path` itself, even if it is a symlink.
pub fn lget_context(path: &Path) -> io::Result<String> {
    let c_path = path_cstr(path)?;
    read_label(|buf, len| unsafe { libc::lgetxattr(c_path.as_ptr(), xattr_name(), buf, len) })
}

/// Label of an open descriptor.
pub fn fget_context(fd: BorrowedFd<'_>) -> io::Result<String> {
    read_label(|buf, len| unsafe { libc::fgetxattr(fd.as_raw_fd(), xattr_name(), buf, len) })
}

/// Set the label on `path`, following symlinks.
pub fn set_context(path: &Path, context: &str) -> io::Result<()> {
    let c_path = path_cstr(path)?;
    let value = context_to_value(context)?;
    let ret = unsafe {
        libc::setxattr(
            c_path.as_ptr(),
            xattr_name(),
            value.as_ptr().cast::<libc::c_void>(),
            context.len() + 1,
            0,
        )
    };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Set the label on `path` itself, even if it is a symlink.
pub fn lset_context(path: &Path, context: &str) -> io::Result<()> {
    let c_path = path_cstr(path)?;
    let value = context_to_value(context)?;
    let ret = unsafe {
        libc::lsetxattr(
            c_path.as_ptr(),
            xattr_name(),
            value.as_ptr().cast::<libc::c_void>(),
            context.len() + 1,
            0,
        )
    };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Set the label on an open descriptor.
pub fn fset_context(fd: BorrowedFd<'_>, context: &str) -> io::Result<()> {
    let value = context_to_value(context)?;
    let ret = unsafe {
        libc::fsetxattr(
            fd.as_raw_fd(),
            xattr_name(),
            value.as_ptr().cast::<libc::c_void>(),
            context.len() + 1,
            0,
        )
    };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Whether SELinux is currently enforcing. Errors if SELinux is absent.
///
/// The enforcing switch is operational surface for startup tooling, not
/// reachable from any request handler.
pub fn get_enforcing() -> io::Result<bool> {
    let contents = std::fs::read_to_string(ENFORCE_PATH)?;
    Ok(contents.trim() == "1")
}

/// Flip enforcing mode.
pub fn set_enforcing(enforce: bool) -> io::Result<()> {
    std::fs::write(ENFORCE_PATH, if enforce { "1" } else { "0" })
}
