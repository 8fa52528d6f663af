//! Recursive ownership change

use std::path::Path;

use nix::unistd::{Gid, Uid};
use tracing::warn;

use crate::ownership;
use crate::walk::{self, PathVisitor, TraversalOutcome, WalkAction, WalkEntry};

struct RecursiveChown {
    uid: Uid,
    gid: Gid,
    follow_symlinks: bool,
}

impl RecursiveChown {
    fn chown_entry(&self, entry: &WalkEntry<'_>) -> WalkAction {
        match ownership::chown_path(entry.path, self.uid, self.gid, self.follow_symlinks) {
            Ok(()) => WalkAction::Continue,
            Err(e) => {
                let msg = format!("{}: failed to chown: {}", entry.path.display(), e);
                warn!("{}", msg);
                WalkAction::FailEntry(msg)
            }
        }
    }
}

impl PathVisitor for RecursiveChown {
    fn on_directory_post(&mut self, entry: &WalkEntry<'_>) -> WalkAction {
        self.chown_entry(entry)
    }

    fn on_file(&mut self, entry: &WalkEntry<'_>) -> WalkAction {
        self.chown_entry(entry)
    }

    fn on_symlink(&mut self, entry: &WalkEntry<'_>) -> WalkAction {
        self.chown_entry(entry)
    }

    fn on_special_file(&mut self, entry: &WalkEntry<'_>) -> WalkAction {
        self.chown_entry(entry)
    }
}

/// Apply `uid`/`gid` to every entry under `path`, including `path` itself.
///
/// `follow_symlinks` selects chown(2) vs lchown(2) per entry; descent itself
/// never follows links.
pub fn chown_recursive(
    path: &Path,
    uid: Uid,
    gid: Gid,
    follow_symlinks: bool,
) -> TraversalOutcome {
    let mut visitor = RecursiveChown {
        uid,
        gid,
        follow_symlinks,
    };
    walk::run(path, &mut visitor)
}
