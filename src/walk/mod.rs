//! Generic depth-first directory traversal
//!
//! This module provides the traversal engine shared by the recursive
//! operations (copy, chown, security labeling, size accounting). A concrete
//! operation implements [`PathVisitor`] and is driven over a subtree by
//! [`run`], which classifies every entry and invokes the matching callback.
//!
//! Symbolic links are never followed during descent: the walk always reports
//! the link itself, so a link pointing back into the tree (or out to another
//! mountpoint) cannot cause cycles or escapes. Operations that want to
//! dereference a single path do so outside the engine.

pub mod chown;
pub mod copy;
pub mod label;
pub mod size;

use std::ffi::OsStr;
use std::fs::{self, Metadata};
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};

use tracing::warn;

/// Per-entry control signal returned by visitor callbacks.
///
/// Only the combinations that are actually meaningful exist as variants, so
/// nonsense like "skip a regular file's subtree and keep descending" cannot
/// be expressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkAction {
    /// Keep going.
    Continue,
    /// Do not descend into this directory (no-op for non-directories); the
    /// walk continues with the entry's siblings.
    SkipSubtree,
    /// Record a failure for this entry but keep visiting the rest of the
    /// tree. Partial failure must not abort copying/labeling the remainder.
    FailEntry(String),
    /// Failure that also prunes the current directory's subtree.
    SkipAndFail(String),
    /// Failure after which continuing would be unsafe; abort the walk.
    FailAndStop(String),
}

/// Descriptor for one filesystem entry, passed by reference into callbacks.
///
/// `metadata` comes from `symlink_metadata`, so it describes the entry
/// itself, never a symlink's target.
pub struct WalkEntry<'a> {
    /// Absolute (or root-relative) path used to access the entry
    pub path: &'a Path,
    /// Path relative to the walk root; empty for the root itself
    pub rel: &'a Path,
    /// Final component of `path`
    pub file_name: &'a OsStr,
    /// Depth below the walk root; the root is depth 0
    pub depth: usize,
    /// Stat snapshot of the entry (lstat semantics)
    pub metadata: &'a Metadata,
}

/// Terminal aggregate of one walk.
#[derive(Debug, Default)]
pub struct TraversalOutcome {
    /// True only if every callback succeeded
    pub success: bool,
    /// Last recorded error message, if any callback failed
    pub error: Option<String>,
}

/// Callbacks implemented by one recursive operation.
///
/// Every method has a default so a visitor only overrides the entry kinds it
/// cares about. The device/fifo/socket callbacks delegate to
/// [`PathVisitor::on_special_file`] by default, which lets visitors that
/// treat all special files alike (chown, labeling, size) override a single
/// method while the copier overrides each kind individually.
pub trait PathVisitor {
    /// Runs once before any filesystem access; an error here is the entire
    /// outcome and the walk never begins.
    fn on_pre_execute(&mut self) -> Result<(), String> {
        Ok(())
    }

    /// Invoked for every entry before its kind-specific callback. This is
    /// where visitors recompute derived paths and apply exclusion lists.
    fn on_changed_path(&mut self, _entry: &WalkEntry<'_>) -> WalkAction {
        WalkAction::Continue
    }

    /// Directory, before descending into it.
    fn on_directory_pre(&mut self, _entry: &WalkEntry<'_>) -> WalkAction {
        WalkAction::Continue
    }

    /// Directory, after all of its descendants have been visited. Does not
    /// fire if the pre-descent callback skipped the subtree.
    fn on_directory_post(&mut self, _entry: &WalkEntry<'_>) -> WalkAction {
        WalkAction::Continue
    }

    /// Regular file.
    fn on_file(&mut self, _entry: &WalkEntry<'_>) -> WalkAction {
        WalkAction::Continue
    }

    /// Symbolic link (the link itself, never its target).
    fn on_symlink(&mut self, _entry: &WalkEntry<'_>) -> WalkAction {
        WalkAction::Continue
    }

    /// Block device.
    fn on_block_device(&mut self, entry: &WalkEntry<'_>) -> WalkAction {
        self.on_special_file(entry)
    }

    /// Character device.
    fn on_char_device(&mut self, entry: &WalkEntry<'_>) -> WalkAction {
        self.on_special_file(entry)
    }

    /// FIFO / named pipe.
    fn on_fifo(&mut self, entry: &WalkEntry<'_>) -> WalkAction {
        self.on_special_file(entry)
    }

    /// Unix socket.
    fn on_socket(&mut self, entry: &WalkEntry<'_>) -> WalkAction {
        self.on_special_file(entry)
    }

    /// Fallback for the grouped special-file kinds above.
    fn on_special_file(&mut self, _entry: &WalkEntry<'_>) -> WalkAction {
        WalkAction::Continue
    }
}

/// Walk the subtree rooted at `root`, driving `visitor`, and resolve to one
/// [`TraversalOutcome`].
pub fn run(root: &Path, visitor: &mut dyn PathVisitor) -> TraversalOutcome {
    let mut walker = Walker {
        visitor,
        success: true,
        error: None,
        stopped: false,
    };

    if let Err(msg) = walker.visitor.on_pre_execute() {
        return TraversalOutcome {
            success: false,
            error: Some(msg),
        };
    }

    walker.visit(root, PathBuf::new(), 0);

    TraversalOutcome {
        success: walker.success,
        error: walker.error,
    }
}

/// What the walker does after applying one callback's action.
enum Flow {
    Descend,
    Prune,
    Stop,
}

struct Walker<'a> {
    visitor: &'a mut dyn PathVisitor,
    success: bool,
    error: Option<String>,
    stopped: bool,
}

impl Walker<'_> {
    fn record_failure(&mut self, msg: String) {
        self.success = false;
        self.error = Some(msg);
    }

    fn apply(&mut self, action: WalkAction) -> Flow {
        match action {
            WalkAction::Continue => Flow::Descend,
            WalkAction::SkipSubtree => Flow::Prune,
            WalkAction::FailEntry(msg) => {
                self.record_failure(msg);
                Flow::Descend
            }
            WalkAction::SkipAndFail(msg) => {
                self.record_failure(msg);
                Flow::Prune
            }
            WalkAction::FailAndStop(msg) => {
                self.record_failure(msg);
                self.stopped = true;
                Flow::Stop
            }
        }
    }

    fn visit(&mut self, path: &Path, rel: PathBuf, depth: usize) {
        let metadata = match fs::symlink_metadata(path) {
            Ok(m) => m,
            Err(e) => {
                let msg = format!("{}: failed to stat: {}", path.display(), e);
                warn!("{}", msg);
                self.record_failure(msg);
                return;
            }
        };

        let file_name = path.file_name().unwrap_or_else(|| path.as_os_str());
        let entry = WalkEntry {
            path,
            rel: &rel,
            file_name,
            depth,
            metadata: &metadata,
        };

        let flow = {
            let action = self.visitor.on_changed_path(&entry);
            self.apply(action)
        };
        match flow {
            Flow::Descend => {}
            Flow::Prune | Flow::Stop => return,
        }

        let file_type = metadata.file_type();
        if file_type.is_dir() {
            let flow = {
                let action = self.visitor.on_directory_pre(&entry);
                self.apply(action)
            };
            match flow {
                Flow::Descend => {}
                Flow::Prune | Flow::Stop => return,
            }

            // Children in whatever order the filesystem yields them
            match fs::read_dir(path) {
                Ok(iter) => {
                    for child in iter {
                        if self.stopped {
                            return;
                        }
                        match child {
                            Ok(dirent) => {
                                let child_path = dirent.path();
                                let child_rel = rel.join(dirent.file_name());
                                self.visit(&child_path, child_rel, depth + 1);
                            }
                            Err(e) => {
                                let msg = format!(
                                    "{}: failed to read directory entry: {}",
                                    path.display(),
                                    e
                                );
                                warn!("{}", msg);
                                self.record_failure(msg);
                            }
                        }
                    }
                }
                Err(e) => {
                    let msg = format!("{}: failed to read directory: {}", path.display(), e);
                    warn!("{}", msg);
                    self.record_failure(msg);
                }
            }

            if self.stopped {
                return;
            }

            let action = self.visitor.on_directory_post(&entry);
            self.apply(action);
        } else {
            let action = if file_type.is_symlink() {
                self.visitor.on_symlink(&entry)
            } else if file_type.is_file() {
                self.visitor.on_file(&entry)
            } else if file_type.is_block_device() {
                self.visitor.on_block_device(&entry)
            } else if file_type.is_char_device() {
                self.visitor.on_char_device(&entry)
            } else if file_type.is_fifo() {
                self.visitor.on_fifo(&entry)
            } else if file_type.is_socket() {
                self.visitor.on_socket(&entry)
            } else {
                WalkAction::Continue
            };
            self.apply(action);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[derive(Default)]
    struct Recorder {
        pre: Vec<PathBuf>,
        post: Vec<PathBuf>,
        files: Vec<PathBuf>,
        skip_dirs: BTreeSet<String>,
        fail_files: BTreeSet<String>,
        stop_on: Option<String>,
    }

    impl PathVisitor for Recorder {
        fn on_directory_pre(&mut self, entry: &WalkEntry<'_>) -> WalkAction {
            self.pre.push(entry.rel.to_path_buf());
            if self.skip_dirs.contains(entry.file_name.to_string_lossy().as_ref()) {
                return WalkAction::SkipSubtree;
            }
            WalkAction::Continue
        }

        fn on_directory_post(&mut self, entry: &WalkEntry<'_>) -> WalkAction {
            self.post.push(entry.rel.to_path_buf());
            WalkAction::Continue
        }

        fn on_file(&mut self, entry: &WalkEntry<'_>) -> WalkAction {
            self.files.push(entry.rel.to_path_buf());
            let name = entry.file_name.to_string_lossy().to_string();
            if self.stop_on.as_deref() == Some(name.as_str()) {
                return WalkAction::FailAndStop(format!("stopped at {name}"));
            }
            if self.fail_files.contains(&name) {
                return WalkAction::FailEntry(format!("failed at {name}"));
            }
            WalkAction::Continue
        }
    }

    fn sample_tree() -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("a/b")).unwrap();
        std::fs::create_dir_all(tmp.path().join("c")).unwrap();
        std::fs::write(tmp.path().join("a/one"), b"1").unwrap();
        std::fs::write(tmp.path().join("a/b/two"), b"22").unwrap();
        std::fs::write(tmp.path().join("c/three"), b"333").unwrap();
        tmp
    }

    #[test]
    fn visits_every_entry_and_pairs_pre_post() {
        let tmp = sample_tree();
        let mut v = Recorder::default();
        let outcome = run(tmp.path(), &mut v);
        assert!(outcome.success);
        assert_eq!(v.pre.len(), 4); // root, a, a/b, c
        assert_eq!(v.post.len(), 4);
        assert_eq!(v.files.len(), 3);
    }

    #[test]
    fn skip_subtree_prunes_descendants_and_post() {
        let tmp = sample_tree();
        let mut v = Recorder::default();
        v.skip_dirs.insert("a".to_string());
        let outcome = run(tmp.path(), &mut v);
        assert!(outcome.success);
        assert!(!v.files.iter().any(|p| p.starts_with("a")));
        // post fires for root and c only; a was pruned, a/b never reached
        assert!(!v.post.iter().any(|p| p == Path::new("a")));
        assert!(v.files.iter().any(|p| p == Path::new("c/three")));
    }

    #[test]
    fn per_entry_failure_does_not_stop_walk() {
        let tmp = sample_tree();
        let mut v = Recorder::default();
        v.fail_files.insert("one".to_string());
        let outcome = run(tmp.path(), &mut v);
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("one"));
        assert_eq!(v.files.len(), 3); // siblings still visited
    }

    #[test]
    fn stop_aborts_remaining_traversal() {
        let tmp = sample_tree();
        let mut v = Recorder::default();
        v.stop_on = Some("two".to_string());
        let outcome = run(tmp.path(), &mut v);
        assert!(!outcome.success);
        // "two" is under a/b; c/three must not have been visited after it
        // unless the filesystem yielded c first, in which case at least the
        // stop itself is reflected in the outcome.
        assert!(outcome.error.unwrap().contains("two"));
    }

    #[test]
    fn pre_execute_failure_prevents_walk() {
        struct Refuser;
        impl PathVisitor for Refuser {
            fn on_pre_execute(&mut self) -> Result<(), String> {
                Err("not today".to_string())
            }
            fn on_file(&mut self, _: &WalkEntry<'_>) -> WalkAction {
                unreachable!("walk must not begin");
            }
        }
        let tmp = sample_tree();
        let outcome = run(tmp.path(), &mut Refuser);
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("not today"));
    }
}
