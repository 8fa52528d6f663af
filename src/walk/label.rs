//! Recursive security-label application

use std::path::Path;

use tracing::warn;

use crate::selinux;
use crate::walk::{self, PathVisitor, TraversalOutcome, WalkAction, WalkEntry};

struct RecursiveSetContext {
    context: String,
    follow_symlinks: bool,
}

impl RecursiveSetContext {
    fn set_context(&self, entry: &WalkEntry<'_>) -> WalkAction {
        let result = if self.follow_symlinks {
            selinux::set_context(entry.path, &self.context)
        } else {
            selinux::lset_context(entry.path, &self.context)
        };
        match result {
            Ok(()) => WalkAction::Continue,
            Err(e) => {
                let msg = format!("{}: failed to set context: {}", entry.path.display(), e);
                warn!("{}", msg);
                WalkAction::FailEntry(msg)
            }
        }
    }
}

impl PathVisitor for RecursiveSetContext {
    fn on_directory_post(&mut self, entry: &WalkEntry<'_>) -> WalkAction {
        self.set_context(entry)
    }

    fn on_file(&mut self, entry: &WalkEntry<'_>) -> WalkAction {
        self.set_context(entry)
    }

    fn on_symlink(&mut self, entry: &WalkEntry<'_>) -> WalkAction {
        self.set_context(entry)
    }

    fn on_special_file(&mut self, entry: &WalkEntry<'_>) -> WalkAction {
        self.set_context(entry)
    }
}

/// Apply one label to every entry under `path`, including `path` itself.
///
/// The follow/no-follow decision is made once for the whole walk.
pub fn set_context_recursive(
    path: &Path,
    context: &str,
    follow_symlinks: bool,
) -> TraversalOutcome {
    let mut visitor = RecursiveSetContext {
        context: context.to_string(),
        follow_symlinks,
    };
    walk::run(path, &mut visitor)
}
