//! Recursive directory copy
//!
//! Mirrors a source subtree under a target directory, recreating every entry
//! kind: directories (attributes applied post-descent), regular files,
//! symlinks, block/character devices and FIFOs. Sockets cannot be copied and
//! are skipped. One bad entry fails the overall outcome but never aborts the
//! rest of the tree; the only hard stop is discovering that the target is
//! the source itself.

use std::ffi::OsString;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use nix::sys::stat::{mknod, Mode, SFlag};
use nix::unistd::mkfifo;
use tracing::{debug, warn};

use crate::fsops;
use crate::walk::{self, PathVisitor, TraversalOutcome, WalkAction, WalkEntry};

/// Behavior toggles for [`copy_dir`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyOptions {
    /// Copy ownership and permission bits onto every created entry
    pub attributes: bool,
    /// Copy extended attributes onto every created entry
    pub xattrs: bool,
    /// Copy the *contents* of the source directly into the target instead of
    /// creating `target/<basename of source>/`
    pub exclude_top_level: bool,
    /// Rejected for recursive copies; exists so single-file and recursive
    /// callers can share one options struct
    pub follow_symlinks: bool,
}

struct RecursiveCopier {
    source_root: PathBuf,
    target: PathBuf,
    options: CopyOptions,
    /// (dev, ino) of the target root, for the self-copy check
    target_id: Option<(u64, u64)>,
    /// Mirrored target path of the current entry, recomputed per entry
    cur_target: PathBuf,
}

impl RecursiveCopier {
    fn new(source: &Path, target: &Path, options: CopyOptions) -> Self {
        Self {
            source_root: source.to_path_buf(),
            target: target.to_path_buf(),
            options,
            target_id: None,
            cur_target: PathBuf::new(),
        }
    }

    fn root_name(&self) -> OsString {
        self.source_root
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| self.source_root.clone().into_os_string())
    }

    fn remove_existing(&self) -> Result<(), String> {
        fsops::remove_existing(&self.cur_target).map_err(|e| {
            format!(
                "{}: failed to remove old path: {}",
                self.cur_target.display(),
                e
            )
        })
    }

    fn cp_attrs(&self, entry: &WalkEntry<'_>) -> Result<(), String> {
        if self.options.attributes {
            fsops::copy_stat(entry.path, &self.cur_target).map_err(|e| {
                format!(
                    "{}: failed to copy attributes: {}",
                    self.cur_target.display(),
                    e
                )
            })?;
        }
        Ok(())
    }

    fn cp_xattrs(&self, entry: &WalkEntry<'_>) -> Result<(), String> {
        if self.options.xattrs {
            fsops::copy_xattrs(entry.path, &self.cur_target).map_err(|e| {
                format!(
                    "{}: failed to copy xattrs: {}",
                    self.cur_target.display(),
                    e
                )
            })?;
        }
        Ok(())
    }

    fn finish_entry(&self, entry: &WalkEntry<'_>) -> WalkAction {
        if let Err(msg) = self.cp_attrs(entry) {
            warn!("{}", msg);
            return WalkAction::FailEntry(msg);
        }
        if let Err(msg) = self.cp_xattrs(entry) {
            warn!("{}", msg);
            return WalkAction::FailEntry(msg);
        }
        WalkAction::Continue
    }

    /// Recreate one non-directory entry then apply attributes.
    fn recreate(
        &self,
        entry: &WalkEntry<'_>,
        create: impl FnOnce(&Path) -> Result<(), String>,
    ) -> WalkAction {
        if let Err(msg) = self.remove_existing() {
            warn!("{}", msg);
            return WalkAction::FailEntry(msg);
        }
        if let Err(msg) = create(&self.cur_target) {
            warn!("{}", msg);
            return WalkAction::FailEntry(msg);
        }
        self.finish_entry(entry)
    }
}

impl PathVisitor for RecursiveCopier {
    fn on_pre_execute(&mut self) -> Result<(), String> {
        // Dereferencing links while mirroring a tree invites loops and
        // duplicated data; almost never what the caller wants
        if self.options.follow_symlinks {
            let msg = "follow_symlinks is not allowed for recursive copies".to_string();
            warn!("{}", msg);
            return Err(msg);
        }

        if let Err(e) = std::fs::create_dir(&self.target) {
            if e.kind() != std::io::ErrorKind::AlreadyExists {
                let msg = format!(
                    "{}: failed to create directory: {}",
                    self.target.display(),
                    e
                );
                warn!("{}", msg);
                return Err(msg);
            }
        }

        let sb = std::fs::metadata(&self.target).map_err(|e| {
            let msg = format!("{}: failed to stat: {}", self.target.display(), e);
            warn!("{}", msg);
            msg
        })?;
        if !sb.is_dir() {
            let msg = format!(
                "{}: target exists but is not a directory",
                self.target.display()
            );
            warn!("{}", msg);
            return Err(msg);
        }
        self.target_id = Some((sb.dev(), sb.ino()));

        Ok(())
    }

    fn on_changed_path(&mut self, entry: &WalkEntry<'_>) -> WalkAction {
        // Make sure we aren't copying the target on top of itself
        if self.target_id == Some((entry.metadata.dev(), entry.metadata.ino())) {
            let msg = format!("{}: cannot copy on top of itself", entry.path.display());
            warn!("{}", msg);
            return WalkAction::FailAndStop(msg);
        }

        self.cur_target = self.target.clone();
        if !self.options.exclude_top_level {
            self.cur_target.push(self.root_name());
        }
        if !entry.rel.as_os_str().is_empty() {
            self.cur_target.push(entry.rel);
        }

        WalkAction::Continue
    }

    fn on_directory_pre(&mut self, entry: &WalkEntry<'_>) -> WalkAction {
        let mut failure = None;

        if let Err(e) = std::fs::create_dir(&self.cur_target) {
            if e.kind() != std::io::ErrorKind::AlreadyExists {
                let msg = format!(
                    "{}: failed to create directory: {}",
                    self.cur_target.display(),
                    e
                );
                warn!("{}", msg);
                failure = Some(msg);
            }
        }

        if failure.is_none() {
            match std::fs::metadata(&self.cur_target) {
                Ok(sb) if !sb.is_dir() => {
                    let msg = format!(
                        "{}: exists but is not a directory",
                        self.cur_target.display()
                    );
                    warn!("{}", msg);
                    failure = Some(msg);
                }
                _ => {}
            }
        }

        match failure {
            Some(msg) => {
                // The post-descent callback won't fire for a pruned subtree,
                // so attributes have to be applied here
                let _ = self.cp_attrs(entry);
                let _ = self.cp_xattrs(entry);
                WalkAction::SkipAndFail(msg)
            }
            None => WalkAction::Continue,
        }
    }

    fn on_directory_post(&mut self, entry: &WalkEntry<'_>) -> WalkAction {
        self.finish_entry(entry)
    }

    fn on_file(&mut self, entry: &WalkEntry<'_>) -> WalkAction {
        self.recreate(entry, |target| {
            fsops::copy_data(entry.path, target)
                .map_err(|e| format!("{}: failed to copy data: {}", target.display(), e))
        })
    }

    fn on_symlink(&mut self, entry: &WalkEntry<'_>) -> WalkAction {
        self.recreate(entry, |target| {
            let link_target = fsops::read_link_path(entry.path).map_err(|e| {
                format!(
                    "{}: failed to read symlink path: {}",
                    entry.path.display(),
                    e
                )
            })?;
            std::os::unix::fs::symlink(&link_target, target)
                .map_err(|e| format!("{}: failed to create symlink: {}", target.display(), e))
        })
    }

    fn on_block_device(&mut self, entry: &WalkEntry<'_>) -> WalkAction {
        let rdev = entry.metadata.rdev();
        self.recreate(entry, |target| {
            mknod(target, SFlag::S_IFBLK, Mode::S_IRWXU, rdev).map_err(|e| {
                format!("{}: failed to create block device: {}", target.display(), e)
            })
        })
    }

    fn on_char_device(&mut self, entry: &WalkEntry<'_>) -> WalkAction {
        let rdev = entry.metadata.rdev();
        self.recreate(entry, |target| {
            mknod(target, SFlag::S_IFCHR, Mode::S_IRWXU, rdev).map_err(|e| {
                format!(
                    "{}: failed to create character device: {}",
                    target.display(),
                    e
                )
            })
        })
    }

    fn on_fifo(&mut self, entry: &WalkEntry<'_>) -> WalkAction {
        self.recreate(entry, |target| {
            mkfifo(target, Mode::S_IRWXU)
                .map_err(|e| format!("{}: failed to create FIFO pipe: {}", target.display(), e))
        })
    }

    fn on_socket(&mut self, entry: &WalkEntry<'_>) -> WalkAction {
        debug!("{}: skipping socket", entry.path.display());
        WalkAction::SkipSubtree
    }
}

/// Copy as much of `source` as possible under `target`.
///
/// Runs with a zeroed umask so created entries carry exactly the modes the
/// attribute pass assigns.
pub fn copy_dir(source: &Path, target: &Path, options: CopyOptions) -> TraversalOutcome {
    let old_umask = unsafe { libc::umask(0) };

    let mut copier = RecursiveCopier::new(source, target, options);
    let outcome = walk::run(source, &mut copier);

    unsafe {
        libc::umask(old_umask);
    }

    outcome
}
