//! Request dispatch
//!
//! One verified request in, exactly one response out. Handlers never panic
//! and never tear the session down: operational failures are marshalled into
//! `success`/`error` response fields, while requests that are structurally
//! wrong (missing mandatory fields, unknown capability handles, permission
//! bits outside the mode mask) get [`Response::Invalid`] before any side
//! effect.

use std::mem::MaybeUninit;
use std::os::fd::{AsRawFd, BorrowedFd, FromRawFd, IntoRawFd, OwnedFd};
use std::path::Path;

use tracing::{debug, warn};

use crate::fsops::{self, path_cstr, CopyFileOptions};
use crate::handles::HandleTable;
use crate::protocol::framing::MAX_MESSAGE_SIZE;
use crate::protocol::{
    FileChmodRequest, FileCloseRequest, FileOpenRequest, FileReadRequest, FileSeekRequest,
    FileSelinuxGetLabelRequest, FileSelinuxSetLabelRequest, FileStatRequest, FileWriteRequest,
    GetPackagesCountRequest, OpenFlag, PathChmodRequest, PathCopyRequest,
    PathGetDirectorySizeRequest, PathSelinuxGetLabelRequest, PathSelinuxSetLabelRequest,
    RebootRequest, Request, Response, SeekWhence, SetKernelRequest, StatInfo, SwitchRomRequest,
    SwitchRomResult, WipeRomRequest,
};
use crate::reboot;
use crate::rom::{self, packages, switcher, wipe};
use crate::selinux;
use crate::walk::copy::{self, CopyOptions};
use crate::walk::size;
use crate::mount;

const MODE_MASK: u32 = 0o777;

/// Room the read response's envelope (enum tag, status fields, Vec length)
/// occupies inside a frame. Generous; the real overhead is under 20 bytes.
const READ_RESPONSE_MARGIN: u32 = 64;

fn last_error() -> Option<String> {
    Some(std::io::Error::last_os_error().to_string())
}

/// Handle one request against the session's capability table.
pub fn dispatch(request: Request, handles: &mut HandleTable) -> Response {
    match request {
        Request::FileChmod(r) => file_chmod(&r, handles),
        Request::FileClose(r) => file_close(&r, handles),
        Request::FileOpen(r) => file_open(&r, handles),
        Request::FileRead(r) => file_read(&r, handles),
        Request::FileSeek(r) => file_seek(&r, handles),
        Request::FileSelinuxGetLabel(r) => file_selinux_get_label(&r, handles),
        Request::FileSelinuxSetLabel(r) => file_selinux_set_label(&r, handles),
        Request::FileStat(r) => file_stat(&r, handles),
        Request::FileWrite(r) => file_write(&r, handles),
        Request::PathChmod(r) => path_chmod(&r),
        Request::PathCopy(r) => path_copy(&r),
        Request::PathSelinuxGetLabel(r) => path_selinux_get_label(&r),
        Request::PathSelinuxSetLabel(r) => path_selinux_set_label(&r),
        Request::PathGetDirectorySize(r) => path_get_directory_size(&r),
        Request::GetBootedRomId => Response::BootedRomId {
            rom_id: rom::booted_rom_id(),
        },
        Request::GetInstalledRoms => Response::InstalledRoms {
            roms: rom::installed_roms().iter().map(rom::Rom::to_entry).collect(),
        },
        Request::GetVersion => Response::Version {
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        Request::SetKernel(r) => set_kernel(&r),
        Request::SwitchRom(r) => switch_rom(&r),
        Request::WipeRom(r) => wipe_rom(&r),
        Request::GetPackagesCount(r) => get_packages_count(&r),
        Request::Reboot(r) => do_reboot(&r),
    }
}

fn file_chmod(r: &FileChmodRequest, handles: &mut HandleTable) -> Response {
    // Only plain permission bits may travel over the wire; setuid and
    // friends on an arbitrary fd would be a privilege escalation primitive
    if r.mode & MODE_MASK != r.mode {
        return Response::Invalid;
    }
    let Some(fd) = handles.get(r.id) else {
        return Response::Invalid;
    };

    if unsafe { libc::fchmod(fd.as_raw_fd(), r.mode as libc::mode_t) } < 0 {
        return Response::FileChmod {
            success: false,
            error: last_error(),
        };
    }
    Response::FileChmod {
        success: true,
        error: None,
    }
}

fn file_close(r: &FileCloseRequest, handles: &mut HandleTable) -> Response {
    let Some(fd) = handles.remove(r.id) else {
        return Response::Invalid;
    };

    // Close by hand so a failing close(2) is reported; the mapping is gone
    // either way
    let raw = fd.into_raw_fd();
    if unsafe { libc::close(raw) } < 0 {
        return Response::FileClose {
            success: false,
            error: last_error(),
        };
    }
    Response::FileClose {
        success: true,
        error: None,
    }
}

fn open_flag_bits(flags: &[OpenFlag]) -> libc::c_int {
    let mut bits = 0;
    for flag in flags {
        bits |= match flag {
            OpenFlag::Append => libc::O_APPEND,
            OpenFlag::Create => libc::O_CREAT,
            OpenFlag::Excl => libc::O_EXCL,
            OpenFlag::ReadOnly => libc::O_RDONLY,
            OpenFlag::ReadWrite => libc::O_RDWR,
            OpenFlag::Trunc => libc::O_TRUNC,
            OpenFlag::WriteOnly => libc::O_WRONLY,
        };
    }
    bits | libc::O_CLOEXEC
}

fn file_open(r: &FileOpenRequest, handles: &mut HandleTable) -> Response {
    let Some(path) = r.path.as_deref() else {
        return Response::Invalid;
    };
    let c_path = match path_cstr(Path::new(path)) {
        Ok(c) => c,
        Err(_) => return Response::Invalid,
    };

    let raw = unsafe {
        libc::open(
            c_path.as_ptr(),
            open_flag_bits(&r.flags),
            r.perms as libc::mode_t,
        )
    };
    if raw < 0 {
        return Response::FileOpen {
            success: false,
            error: last_error(),
            id: 0,
        };
    }

    let id = handles.insert(unsafe { OwnedFd::from_raw_fd(raw) });
    debug!("{}: opened as handle {}", path, id);
    Response::FileOpen {
        success: true,
        error: None,
        id,
    }
}

fn file_read(r: &FileReadRequest, handles: &mut HandleTable) -> Response {
    let Some(fd) = handles.get(r.id) else {
        return Response::Invalid;
    };

    // The response, envelope included, has to fit in one frame, so the read
    // is capped a little below the frame limit
    let cap = u64::from(MAX_MESSAGE_SIZE - READ_RESPONSE_MARGIN);
    let count = usize::try_from(r.count.min(cap)).unwrap_or(0);
    let mut data = vec![0u8; count];
    let n = unsafe {
        libc::read(
            fd.as_raw_fd(),
            data.as_mut_ptr().cast::<libc::c_void>(),
            data.len(),
        )
    };
    if n < 0 {
        return Response::FileRead {
            success: false,
            error: last_error(),
            data: Vec::new(),
        };
    }
    data.truncate(n as usize);
    Response::FileRead {
        success: true,
        error: None,
        data,
    }
}

fn file_seek(r: &FileSeekRequest, handles: &mut HandleTable) -> Response {
    let Some(fd) = handles.get(r.id) else {
        return Response::Invalid;
    };
    let whence = match r.whence {
        SeekWhence::Set => libc::SEEK_SET,
        SeekWhence::Cur => libc::SEEK_CUR,
        SeekWhence::End => libc::SEEK_END,
    };

    // A negative return is the only failure signal; clear errno first so a
    // stale value can't be misread afterwards
    nix::errno::Errno::clear();
    let offset = unsafe { libc::lseek(fd.as_raw_fd(), r.offset as libc::off_t, whence) };
    if offset < 0 {
        return Response::FileSeek {
            success: false,
            error: last_error(),
            offset: 0,
        };
    }
    Response::FileSeek {
        success: true,
        error: None,
        offset: offset as i64,
    }
}

fn file_selinux_get_label(r: &FileSelinuxGetLabelRequest, handles: &mut HandleTable) -> Response {
    let Some(fd) = handles.get(r.id) else {
        return Response::Invalid;
    };
    match selinux::fget_context(fd) {
        Ok(label) => Response::FileSelinuxGetLabel {
            success: true,
            error: None,
            label: Some(label),
        },
        Err(e) => Response::FileSelinuxGetLabel {
            success: false,
            error: Some(e.to_string()),
            label: None,
        },
    }
}

fn file_selinux_set_label(r: &FileSelinuxSetLabelRequest, handles: &mut HandleTable) -> Response {
    let Some(label) = r.label.as_deref() else {
        return Response::Invalid;
    };
    let Some(fd) = handles.get(r.id) else {
        return Response::Invalid;
    };
    match selinux::fset_context(fd, label) {
        Ok(()) => Response::FileSelinuxSetLabel {
            success: true,
            error: None,
        },
        Err(e) => Response::FileSelinuxSetLabel {
            success: false,
            error: Some(e.to_string()),
        },
    }
}

fn stat_info(fd: BorrowedFd<'_>) -> Result<StatInfo, String> {
    let mut sb = MaybeUninit::<libc::stat>::uninit();
    if unsafe { libc::fstat(fd.as_raw_fd(), sb.as_mut_ptr()) } < 0 {
        return Err(std::io::Error::last_os_error().to_string());
    }
    let sb = unsafe { sb.assume_init() };
    Ok(StatInfo {
        st_dev: sb.st_dev,
        st_ino: sb.st_ino,
        st_mode: sb.st_mode,
        st_nlink: sb.st_nlink,
        st_uid: sb.st_uid,
        st_gid: sb.st_gid,
        st_rdev: sb.st_rdev,
        st_size: sb.st_size as u64,
        st_blksize: sb.st_blksize as u64,
        st_blocks: sb.st_blocks as u64,
        st_atime: sb.st_atime,
        st_mtime: sb.st_mtime,
        st_ctime: sb.st_ctime,
    })
}

fn file_stat(r: &FileStatRequest, handles: &mut HandleTable) -> Response {
    let Some(fd) = handles.get(r.id) else {
        return Response::Invalid;
    };
    match stat_info(fd) {
        Ok(stat) => Response::FileStat {
            success: true,
            error: None,
            stat: Some(stat),
        },
        Err(error) => Response::FileStat {
            success: false,
            error: Some(error),
            stat: None,
        },
    }
}

fn file_write(r: &FileWriteRequest, handles: &mut HandleTable) -> Response {
    let Some(data) = r.data.as_deref() else {
        return Response::Invalid;
    };
    let Some(fd) = handles.get(r.id) else {
        return Response::Invalid;
    };

    let n = unsafe {
        libc::write(
            fd.as_raw_fd(),
            data.as_ptr().cast::<libc::c_void>(),
            data.len(),
        )
    };
    if n < 0 {
        return Response::FileWrite {
            success: false,
            error: last_error(),
            bytes_written: 0,
        };
    }
    Response::FileWrite {
        success: true,
        error: None,
        bytes_written: n as u64,
    }
}

fn path_chmod(r: &PathChmodRequest) -> Response {
    let Some(path) = r.path.as_deref() else {
        return Response::Invalid;
    };
    if r.mode & MODE_MASK != r.mode {
        return Response::Invalid;
    }
    let c_path = match path_cstr(Path::new(path)) {
        Ok(c) => c,
        Err(_) => return Response::Invalid,
    };

    if unsafe { libc::chmod(c_path.as_ptr(), r.mode as libc::mode_t) } < 0 {
        return Response::PathChmod {
            success: false,
            error: last_error(),
        };
    }
    Response::PathChmod {
        success: true,
        error: None,
    }
}

fn path_copy(r: &PathCopyRequest) -> Response {
    let (Some(source), Some(target)) = (r.source.as_deref(), r.target.as_deref()) else {
        return Response::Invalid;
    };
    let source = Path::new(source);
    let target = Path::new(target);

    let metadata = match std::fs::symlink_metadata(source) {
        Ok(m) => m,
        Err(e) => {
            return Response::PathCopy {
                success: false,
                error: Some(format!("{}: {}", source.display(), e)),
            }
        }
    };

    if metadata.is_dir() {
        let outcome = copy::copy_dir(
            source,
            target,
            CopyOptions {
                attributes: true,
                xattrs: true,
                exclude_top_level: true,
                follow_symlinks: false,
            },
        );
        Response::PathCopy {
            success: outcome.success,
            error: outcome.error,
        }
    } else {
        match fsops::copy_file(
            source,
            target,
            CopyFileOptions {
                attributes: true,
                xattrs: true,
                follow_symlinks: false,
            },
        ) {
            Ok(()) => Response::PathCopy {
                success: true,
                error: None,
            },
            Err(e) => Response::PathCopy {
                success: false,
                error: Some(e.to_string()),
            },
        }
    }
}

fn path_selinux_get_label(r: &PathSelinuxGetLabelRequest) -> Response {
    let Some(path) = r.path.as_deref() else {
        return Response::Invalid;
    };
    let result = if r.follow_symlinks {
        selinux::get_context(Path::new(path))
    } else {
        selinux::lget_context(Path::new(path))
    };
    match result {
        Ok(label) => Response::PathSelinuxGetLabel {
            success: true,
            error: None,
            label: Some(label),
        },
        Err(e) => Response::PathSelinuxGetLabel {
            success: false,
            error: Some(e.to_string()),
            label: None,
        },
    }
}

fn path_selinux_set_label(r: &PathSelinuxSetLabelRequest) -> Response {
    let (Some(path), Some(label)) = (r.path.as_deref(), r.label.as_deref()) else {
        return Response::Invalid;
    };
    let result = if r.follow_symlinks {
        selinux::set_context(Path::new(path), label)
    } else {
        selinux::lset_context(Path::new(path), label)
    };
    match result {
        Ok(()) => Response::PathSelinuxSetLabel {
            success: true,
            error: None,
        },
        Err(e) => Response::PathSelinuxSetLabel {
            success: false,
            error: Some(e.to_string()),
        },
    }
}

fn path_get_directory_size(r: &PathGetDirectorySizeRequest) -> Response {
    let Some(path) = r.path.as_deref() else {
        return Response::Invalid;
    };
    let (outcome, total) = size::directory_size(Path::new(path), &r.exclusions);
    Response::PathGetDirectorySize {
        success: outcome.success,
        error: outcome.error,
        size: total,
    }
}

fn set_kernel(r: &SetKernelRequest) -> Response {
    let (Some(rom_id), Some(blockdev)) = (r.rom_id.as_deref(), r.boot_blockdev.as_deref()) else {
        return Response::Invalid;
    };
    Response::SetKernel {
        success: switcher::set_kernel(rom_id, Path::new(blockdev)),
    }
}

fn switch_rom(r: &SwitchRomRequest) -> Response {
    let (Some(rom_id), Some(blockdev)) = (r.rom_id.as_deref(), r.boot_blockdev.as_deref()) else {
        return Response::Invalid;
    };
    let result = switcher::switch_rom(
        rom_id,
        Path::new(blockdev),
        &r.blockdev_base_dirs,
        r.force_update_checksums,
    );
    Response::SwitchRom {
        success: result == SwitchRomResult::Succeeded,
        result,
    }
}

fn wipe_rom(r: &WipeRomRequest) -> Response {
    let Some(rom_id) = r.rom_id.as_deref() else {
        return Response::Invalid;
    };
    let Some(rom) = rom::find_rom(rom_id) else {
        return Response::Invalid;
    };
    // Pulling the rug out from under the running system is never allowed
    if rom::booted_rom_id().as_deref() == Some(rom_id) {
        return Response::Invalid;
    }

    // Secondary system trees live on the read-only system partition
    if let Err(e) = mount::remount_writable(Path::new("/system")) {
        warn!("failed to remount /system read-write: {}", e);
    }

    let mut succeeded = Vec::new();
    let mut failed = Vec::new();
    for target in &r.targets {
        if wipe::wipe_target(&rom, *target) {
            succeeded.push(*target);
        } else {
            failed.push(*target);
        }
    }

    Response::WipeRom { succeeded, failed }
}

fn get_packages_count(r: &GetPackagesCountRequest) -> Response {
    let Some(rom_id) = r.rom_id.as_deref() else {
        return Response::Invalid;
    };
    let Some(rom) = rom::find_rom(rom_id) else {
        return Response::Invalid;
    };

    let packages_xml = rom.data_path.join("system/packages.xml");
    match packages::count_packages(&packages_xml) {
        Ok(counts) => Response::PackagesCount {
            success: true,
            system_packages: counts.system,
            system_update_packages: counts.system_update,
            non_system_packages: counts.other,
        },
        Err(e) => {
            warn!("{}: failed to count packages: {}", packages_xml.display(), e);
            Response::PackagesCount {
                success: false,
                system_packages: 0,
                system_update_packages: 0,
                non_system_packages: 0,
            }
        }
    }
}

fn do_reboot(r: &RebootRequest) -> Response {
    Response::Reboot {
        success: reboot::reboot_via_init(r.arg.as_deref().unwrap_or("")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::FileOpenRequest;

    fn open_file(handles: &mut HandleTable, path: &str, flags: Vec<OpenFlag>, perms: u32) -> u32 {
        let response = dispatch(
            Request::FileOpen(FileOpenRequest {
                path: Some(path.to_string()),
                flags,
                perms,
            }),
            handles,
        );
        match response {
            Response::FileOpen {
                success: true, id, ..
            } => id,
            other => panic!("open failed: {other:?}"),
        }
    }

    #[test]
    fn open_write_seek_read_close() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("f").to_string_lossy().into_owned();
        let mut handles = HandleTable::new();

        let id = open_file(
            &mut handles,
            &path,
            vec![OpenFlag::Create, OpenFlag::ReadWrite],
            0o600,
        );

        let response = dispatch(
            Request::FileWrite(FileWriteRequest {
                id,
                data: Some(b"hello world".to_vec()),
            }),
            &mut handles,
        );
        assert_eq!(
            response,
            Response::FileWrite {
                success: true,
                error: None,
                bytes_written: 11
            }
        );

        let response = dispatch(
            Request::FileSeek(FileSeekRequest {
                id,
                offset: 6,
                whence: SeekWhence::Set,
            }),
            &mut handles,
        );
        assert_eq!(
            response,
            Response::FileSeek {
                success: true,
                error: None,
                offset: 6
            }
        );

        let response = dispatch(
            Request::FileRead(FileReadRequest { id, count: 100 }),
            &mut handles,
        );
        assert_eq!(
            response,
            Response::FileRead {
                success: true,
                error: None,
                data: b"world".to_vec()
            }
        );

        let response = dispatch(Request::FileClose(FileCloseRequest { id }), &mut handles);
        assert_eq!(
            response,
            Response::FileClose {
                success: true,
                error: None
            }
        );
        assert!(handles.is_empty());
    }

    #[test]
    fn unknown_handle_is_invalid() {
        let mut handles = HandleTable::new();
        let response = dispatch(
            Request::FileRead(FileReadRequest { id: 42, count: 1 }),
            &mut handles,
        );
        assert_eq!(response, Response::Invalid);
    }

    #[test]
    fn closed_handle_is_invalid() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("f").to_string_lossy().into_owned();
        let mut handles = HandleTable::new();
        let id = open_file(
            &mut handles,
            &path,
            vec![OpenFlag::Create, OpenFlag::WriteOnly],
            0o600,
        );
        dispatch(Request::FileClose(FileCloseRequest { id }), &mut handles);
        let response = dispatch(Request::FileClose(FileCloseRequest { id }), &mut handles);
        assert_eq!(response, Response::Invalid);
    }

    #[test]
    fn chmod_rejects_bits_outside_permission_mask() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("f").to_string_lossy().into_owned();
        let mut handles = HandleTable::new();
        let id = open_file(
            &mut handles,
            &path,
            vec![OpenFlag::Create, OpenFlag::WriteOnly],
            0o600,
        );

        let response = dispatch(
            Request::FileChmod(FileChmodRequest { id, mode: 0o4755 }),
            &mut handles,
        );
        assert_eq!(response, Response::Invalid);

        let response = dispatch(
            Request::FileChmod(FileChmodRequest { id, mode: 0o755 }),
            &mut handles,
        );
        assert_eq!(
            response,
            Response::FileChmod {
                success: true,
                error: None
            }
        );
    }

    #[test]
    fn read_count_is_clamped_below_the_frame_limit() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("big");
        std::fs::File::create(&path)
            .unwrap()
            .set_len(u64::from(MAX_MESSAGE_SIZE) * 2)
            .unwrap();

        let mut handles = HandleTable::new();
        let id = open_file(
            &mut handles,
            &path.to_string_lossy(),
            vec![OpenFlag::ReadOnly],
            0,
        );

        match dispatch(
            Request::FileRead(FileReadRequest {
                id,
                count: u64::from(MAX_MESSAGE_SIZE),
            }),
            &mut handles,
        ) {
            Response::FileRead {
                success: true,
                data,
                ..
            } => {
                assert_eq!(
                    data.len(),
                    (MAX_MESSAGE_SIZE - READ_RESPONSE_MARGIN) as usize
                );
            }
            other => panic!("read failed: {other:?}"),
        }
    }

    #[test]
    fn open_flags_map_to_os_semantics() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("f");
        std::fs::write(&path, b"abc").unwrap();
        let path = path.to_string_lossy().into_owned();
        let mut handles = HandleTable::new();

        // Append positions writes at the end
        let id = open_file(
            &mut handles,
            &path,
            vec![OpenFlag::Append, OpenFlag::WriteOnly],
            0,
        );
        dispatch(
            Request::FileWrite(FileWriteRequest {
                id,
                data: Some(b"def".to_vec()),
            }),
            &mut handles,
        );
        assert_eq!(std::fs::read(tmp.path().join("f")).unwrap(), b"abcdef");

        // Excl refuses an existing file and allocates no handle
        let handles_before = handles.len();
        let response = dispatch(
            Request::FileOpen(FileOpenRequest {
                path: Some(path.clone()),
                flags: vec![OpenFlag::Create, OpenFlag::Excl, OpenFlag::WriteOnly],
                perms: 0o600,
            }),
            &mut handles,
        );
        match response {
            Response::FileOpen {
                success: false,
                error: Some(_),
                ..
            } => {}
            other => panic!("exclusive open must fail: {other:?}"),
        }
        assert_eq!(handles.len(), handles_before);

        // Trunc empties the file on open
        let _id = open_file(
            &mut handles,
            &path,
            vec![OpenFlag::Trunc, OpenFlag::WriteOnly],
            0,
        );
        assert_eq!(std::fs::metadata(tmp.path().join("f")).unwrap().len(), 0);
    }

    #[test]
    fn missing_mandatory_field_is_invalid() {
        let mut handles = HandleTable::new();
        let response = dispatch(
            Request::FileOpen(FileOpenRequest {
                path: None,
                flags: vec![OpenFlag::ReadOnly],
                perms: 0,
            }),
            &mut handles,
        );
        assert_eq!(response, Response::Invalid);

        let response = dispatch(
            Request::PathCopy(PathCopyRequest {
                source: Some("/a".to_string()),
                target: None,
            }),
            &mut handles,
        );
        assert_eq!(response, Response::Invalid);
    }

    #[test]
    fn file_stat_reports_size() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("f");
        std::fs::write(&path, b"12345").unwrap();
        let mut handles = HandleTable::new();
        let id = open_file(
            &mut handles,
            &path.to_string_lossy(),
            vec![OpenFlag::ReadOnly],
            0,
        );

        match dispatch(Request::FileStat(FileStatRequest { id }), &mut handles) {
            Response::FileStat {
                success: true,
                stat: Some(stat),
                ..
            } => {
                assert_eq!(stat.st_size, 5);
                assert_eq!(stat.st_mode & libc::S_IFMT, libc::S_IFREG);
            }
            other => panic!("stat failed: {other:?}"),
        }
    }

    #[test]
    fn version_matches_package() {
        let mut handles = HandleTable::new();
        assert_eq!(
            dispatch(Request::GetVersion, &mut handles),
            Response::Version {
                version: env!("CARGO_PKG_VERSION").to_string()
            }
        );
    }

    #[test]
    fn directory_size_over_dispatch() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a"), vec![0u8; 100]).unwrap();
        std::fs::create_dir(tmp.path().join("skipme")).unwrap();
        std::fs::write(tmp.path().join("skipme/b"), vec![0u8; 100]).unwrap();

        let mut handles = HandleTable::new();
        let response = dispatch(
            Request::PathGetDirectorySize(PathGetDirectorySizeRequest {
                path: Some(tmp.path().to_string_lossy().into_owned()),
                exclusions: vec!["skipme".to_string()],
            }),
            &mut handles,
        );
        assert_eq!(
            response,
            Response::PathGetDirectorySize {
                success: true,
                error: None,
                size: 100
            }
        );
    }
}
