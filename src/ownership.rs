//! User/group resolution and ownership changes

use std::io;
use std::path::Path;
use std::sync::Mutex;

use nix::unistd::{Gid, Group, Uid, User};

use crate::fsops::path_cstr;

/// getpwnam/getgrnam hit shared NSS state; serialize the lookups.
static NAME_LOOKUP: Mutex<()> = Mutex::new(());

/// Resolve a user name to its uid.
pub fn resolve_user(name: &str) -> io::Result<Uid> {
    let _guard = NAME_LOOKUP
        .lock()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "name lookup lock poisoned"))?;
    match User::from_name(name) {
        Ok(Some(user)) => Ok(user.uid),
        Ok(None) => Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("unknown user: {name}"),
        )),
        Err(e) => Err(io::Error::from_raw_os_error(e as i32)),
    }
}

/// Resolve a group name to its gid.
pub fn resolve_group(name: &str) -> io::Result<Gid> {
    let _guard = NAME_LOOKUP
        .lock()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "name lookup lock poisoned"))?;
    match Group::from_name(name) {
        Ok(Some(group)) => Ok(group.gid),
        Ok(None) => Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("unknown group: {name}"),
        )),
        Err(e) => Err(io::Error::from_raw_os_error(e as i32)),
    }
}

/// Change ownership of one path. `follow_symlinks` selects chown(2) vs
/// lchown(2).
pub fn chown_path(path: &Path, uid: Uid, gid: Gid, follow_symlinks: bool) -> io::Result<()> {
    let c_path = path_cstr(path)?;
    let ret = if follow_symlinks {
        unsafe { libc::chown(c_path.as_ptr(), uid.as_raw(), gid.as_raw()) }
    } else {
        unsafe { libc::lchown(c_path.as_ptr(), uid.as_raw(), gid.as_raw()) }
    };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
