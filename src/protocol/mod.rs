//! Wire schema for the daemon's request/response protocol
//!
//! Every exchange is one framed message (see [`framing`]): the client sends
//! a tagged request, the daemon answers with exactly one response. Requests
//! are `[u16 command tag][bincode payload]` so that a tag this build does
//! not know still decodes far enough to be answered with
//! [`Response::Unsupported`]; responses are a single bincode-encoded enum.
//!
//! String and byte fields a command cannot work without are `Option`s here:
//! their absence is a client bug and is answered with [`Response::Invalid`]
//! before any side effect, rather than torn down as a framing error.

pub mod codec;
pub mod framing;

use serde::{Deserialize, Serialize};

/// Portable open(2) flag names; the dispatcher maps them onto `O_*` bits and
/// always adds `O_CLOEXEC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpenFlag {
    Append,
    Create,
    Excl,
    ReadOnly,
    ReadWrite,
    Trunc,
    WriteOnly,
}

/// lseek(2) origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeekWhence {
    Set,
    Cur,
    End,
}

/// Wipe targets for one installed ROM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WipeTarget {
    System,
    Cache,
    Data,
    DalvikCache,
    Multiboot,
}

/// Outcome of a ROM/kernel switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwitchRomResult {
    Succeeded,
    Failed,
    ChecksumNotFound,
    ChecksumInvalid,
}

/// stat(2) snapshot marshalled back to the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatInfo {
    pub st_dev: u64,
    pub st_ino: u64,
    pub st_mode: u32,
    pub st_nlink: u64,
    pub st_uid: u32,
    pub st_gid: u32,
    pub st_rdev: u64,
    pub st_size: u64,
    pub st_blksize: u64,
    pub st_blocks: u64,
    pub st_atime: i64,
    pub st_mtime: i64,
    pub st_ctime: i64,
}

/// One installed ROM as reported to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RomEntry {
    pub id: String,
    pub system_path: String,
    pub cache_path: String,
    pub data_path: String,
    pub version: Option<String>,
    pub build: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChmodRequest {
    pub id: u32,
    pub mode: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCloseRequest {
    pub id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOpenRequest {
    pub path: Option<String>,
    pub flags: Vec<OpenFlag>,
    /// Mode for newly created files
    pub perms: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReadRequest {
    pub id: u32,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSeekRequest {
    pub id: u32,
    pub offset: i64,
    pub whence: SeekWhence,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSelinuxGetLabelRequest {
    pub id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSelinuxSetLabelRequest {
    pub id: u32,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStatRequest {
    pub id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileWriteRequest {
    pub id: u32,
    pub data: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathChmodRequest {
    pub path: Option<String>,
    pub mode: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathCopyRequest {
    pub source: Option<String>,
    pub target: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSelinuxGetLabelRequest {
    pub path: Option<String>,
    pub follow_symlinks: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSelinuxSetLabelRequest {
    pub path: Option<String>,
    pub label: Option<String>,
    pub follow_symlinks: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathGetDirectorySizeRequest {
    pub path: Option<String>,
    /// First-level directory names to leave out of the total
    pub exclusions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetKernelRequest {
    pub rom_id: Option<String>,
    pub boot_blockdev: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchRomRequest {
    pub rom_id: Option<String>,
    pub boot_blockdev: Option<String>,
    /// Directories the boot block device is allowed to live under
    pub blockdev_base_dirs: Vec<String>,
    pub force_update_checksums: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WipeRomRequest {
    pub rom_id: Option<String>,
    pub targets: Vec<WipeTarget>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetPackagesCountRequest {
    pub rom_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebootRequest {
    pub arg: Option<String>,
}

/// A decoded, schema-verified request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    FileChmod(FileChmodRequest),
    FileClose(FileCloseRequest),
    FileOpen(FileOpenRequest),
    FileRead(FileReadRequest),
    FileSeek(FileSeekRequest),
    FileSelinuxGetLabel(FileSelinuxGetLabelRequest),
    FileSelinuxSetLabel(FileSelinuxSetLabelRequest),
    FileStat(FileStatRequest),
    FileWrite(FileWriteRequest),
    PathChmod(PathChmodRequest),
    PathCopy(PathCopyRequest),
    PathSelinuxGetLabel(PathSelinuxGetLabelRequest),
    PathSelinuxSetLabel(PathSelinuxSetLabelRequest),
    PathGetDirectorySize(PathGetDirectorySizeRequest),
    GetBootedRomId,
    GetInstalledRoms,
    GetVersion,
    SetKernel(SetKernelRequest),
    SwitchRom(SwitchRomRequest),
    WipeRom(WipeRomRequest),
    GetPackagesCount(GetPackagesCountRequest),
    Reboot(RebootRequest),
}

/// Everything the daemon can answer with. Each dispatched request yields
/// exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    /// Malformed field content or an unknown capability handle
    Invalid,
    /// Command tag this daemon does not implement
    Unsupported,
    FileChmod {
        success: bool,
        error: Option<String>,
    },
    FileClose {
        success: bool,
        error: Option<String>,
    },
    FileOpen {
        success: bool,
        error: Option<String>,
        id: u32,
    },
    FileRead {
        success: bool,
        error: Option<String>,
        data: Vec<u8>,
    },
    FileSeek {
        success: bool,
        error: Option<String>,
        offset: i64,
    },
    FileSelinuxGetLabel {
        success: bool,
        error: Option<String>,
        label: Option<String>,
    },
    FileSelinuxSetLabel {
        success: bool,
        error: Option<String>,
    },
    FileStat {
        success: bool,
        error: Option<String>,
        stat: Option<StatInfo>,
    },
    FileWrite {
        success: bool,
        error: Option<String>,
        bytes_written: u64,
    },
    PathChmod {
        success: bool,
        error: Option<String>,
    },
    PathCopy {
        success: bool,
        error: Option<String>,
    },
    PathSelinuxGetLabel {
        success: bool,
        error: Option<String>,
        label: Option<String>,
    },
    PathSelinuxSetLabel {
        success: bool,
        error: Option<String>,
    },
    PathGetDirectorySize {
        success: bool,
        error: Option<String>,
        size: u64,
    },
    BootedRomId {
        rom_id: Option<String>,
    },
    InstalledRoms {
        roms: Vec<RomEntry>,
    },
    Version {
        version: String,
    },
    SetKernel {
        success: bool,
    },
    SwitchRom {
        success: bool,
        result: SwitchRomResult,
    },
    WipeRom {
        succeeded: Vec<WipeTarget>,
        failed: Vec<WipeTarget>,
    },
    PackagesCount {
        success: bool,
        system_packages: u32,
        system_update_packages: u32,
        non_system_packages: u32,
    },
    Reboot {
        success: bool,
    },
}
