//! Hard-link-aware directory size accounting

use std::collections::HashSet;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use crate::walk::{self, PathVisitor, TraversalOutcome, WalkAction, WalkEntry};

struct DirectorySizeGetter {
    exclusions: Vec<String>,
    /// (dev, ino) pairs already counted; files sharing an inode are hard
    /// links of one another and contribute their size once
    seen: HashSet<(u64, u64)>,
    total: u64,
}

impl PathVisitor for DirectorySizeGetter {
    fn on_changed_path(&mut self, entry: &WalkEntry<'_>) -> WalkAction {
        // Exclusions apply to first-level names only
        if entry.depth == 1 {
            let name = entry.file_name.to_string_lossy();
            if self.exclusions.iter().any(|e| e == name.as_ref()) {
                return WalkAction::SkipSubtree;
            }
        }
        WalkAction::Continue
    }

    fn on_file(&mut self, entry: &WalkEntry<'_>) -> WalkAction {
        let key = (entry.metadata.dev(), entry.metadata.ino());
        if self.seen.insert(key) {
            self.total += entry.metadata.size();
        }
        WalkAction::Continue
    }
}

/// Total size in bytes of the regular files under `path`, counting each
/// inode once and skipping first-level entries named in `exclusions`.
pub fn directory_size(path: &Path, exclusions: &[String]) -> (TraversalOutcome, u64) {
    let mut visitor = DirectorySizeGetter {
        exclusions: exclusions.to_vec(),
        seen: HashSet::new(),
        total: 0,
    };
    let outcome = walk::run(path, &mut visitor);
    (outcome, visitor.total)
}
