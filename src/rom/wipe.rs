//! Wiping ROM data
//!
//! Deletes the contents of a ROM's directories while keeping the directories
//! themselves. First-level `multiboot` entries always survive a wipe (they
//! hold other ROMs), and `media` survives unless the caller explicitly wants
//! internal storage gone too.

use std::path::Path;

use tracing::{error, info, warn};

use crate::mount;
use crate::protocol::WipeTarget;
use crate::rom::Rom;
use crate::walk::{self, PathVisitor, TraversalOutcome, WalkAction, WalkEntry};

const KEEP_ALWAYS: &str = "multiboot";
const KEEP_MEDIA: &str = "media";

struct WipeDirectory {
    wipe_media: bool,
}

impl WipeDirectory {
    fn delete(entry: &WalkEntry<'_>, remove: fn(&Path) -> std::io::Result<()>) -> WalkAction {
        // The root itself stays; only its contents go
        if entry.depth == 0 {
            return WalkAction::Continue;
        }
        match remove(entry.path) {
            Ok(()) => WalkAction::Continue,
            Err(e) => {
                let msg = format!("{}: failed to remove: {}", entry.path.display(), e);
                warn!("{}", msg);
                WalkAction::FailEntry(msg)
            }
        }
    }
}

impl PathVisitor for WipeDirectory {
    fn on_changed_path(&mut self, entry: &WalkEntry<'_>) -> WalkAction {
        if entry.depth == 1 {
            let name = entry.file_name.to_string_lossy();
            if name == KEEP_ALWAYS || (!self.wipe_media && name == KEEP_MEDIA) {
                return WalkAction::SkipSubtree;
            }
        }
        WalkAction::Continue
    }

    fn on_directory_post(&mut self, entry: &WalkEntry<'_>) -> WalkAction {
        Self::delete(entry, |p| std::fs::remove_dir(p))
    }

    fn on_file(&mut self, entry: &WalkEntry<'_>) -> WalkAction {
        Self::delete(entry, |p| std::fs::remove_file(p))
    }

    fn on_symlink(&mut self, entry: &WalkEntry<'_>) -> WalkAction {
        Self::delete(entry, |p| std::fs::remove_file(p))
    }

    fn on_special_file(&mut self, entry: &WalkEntry<'_>) -> WalkAction {
        Self::delete(entry, |p| std::fs::remove_file(p))
    }
}

/// Empty `path` without removing it. A missing directory counts as already
/// wiped.
pub fn wipe_directory(path: &Path, wipe_media: bool) -> TraversalOutcome {
    if !path.exists() {
        return TraversalOutcome {
            success: true,
            error: None,
        };
    }
    let mut visitor = WipeDirectory { wipe_media };
    walk::run(path, &mut visitor)
}

fn wipe_system(rom: &Rom) -> bool {
    if rom.system_is_image {
        // Image-backed system trees get mounted, emptied, unmounted
        let mountpoint = rom.multiboot_path().join(".wipe-mnt");
        if let Err(e) = std::fs::create_dir_all(&mountpoint) {
            error!("{}: failed to create mountpoint: {}", mountpoint.display(), e);
            return false;
        }
        if let Err(e) = mount::mount_image(&rom.system_path, &mountpoint, "ext4", false) {
            error!("{}: failed to mount image: {}", rom.system_path.display(), e);
            return false;
        }
        let outcome = wipe_directory(&mountpoint, true);
        if let Err(e) = mount::unmount(&mountpoint) {
            error!("{}: failed to unmount: {}", mountpoint.display(), e);
            return false;
        }
        let _ = std::fs::remove_dir(&mountpoint);
        outcome.success
    } else {
        wipe_directory(&rom.system_path, true).success
    }
}

fn remove_tree(path: &Path) -> bool {
    match std::fs::remove_dir_all(path) {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
        Err(e) => {
            error!("{}: failed to remove: {}", path.display(), e);
            false
        }
    }
}

/// Wipe one target of `rom`. Returns whether the whole target was cleaned.
pub fn wipe_target(rom: &Rom, target: WipeTarget) -> bool {
    info!("wiping {:?} of ROM {}", target, rom.id);
    match target {
        WipeTarget::System => wipe_system(rom),
        WipeTarget::Cache => wipe_directory(&rom.cache_path, true).success,
        WipeTarget::Data => wipe_directory(&rom.data_path, false).success,
        WipeTarget::DalvikCache => {
            // dalvik-cache is split between the data and cache trees
            let data = remove_tree(&rom.data_path.join("dalvik-cache"));
            let cache = remove_tree(&rom.cache_path.join("dalvik-cache"));
            data && cache
        }
        WipeTarget::Multiboot => remove_tree(&rom.multiboot_path()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wipe_keeps_root_and_protected_names() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        std::fs::create_dir(root.join("app")).unwrap();
        std::fs::write(root.join("app/base.apk"), b"apk").unwrap();
        std::fs::create_dir(root.join("media")).unwrap();
        std::fs::write(root.join("media/photo.jpg"), b"jpg").unwrap();
        std::fs::create_dir(root.join("multiboot")).unwrap();
        std::fs::write(root.join("file.txt"), b"x").unwrap();

        let outcome = wipe_directory(root, false);
        assert!(outcome.success);
        assert!(root.exists());
        assert!(!root.join("app").exists());
        assert!(!root.join("file.txt").exists());
        assert!(root.join("media/photo.jpg").exists());
        assert!(root.join("multiboot").exists());
    }

    #[test]
    fn wipe_media_removes_internal_storage() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        std::fs::create_dir(root.join("media")).unwrap();
        std::fs::write(root.join("media/photo.jpg"), b"jpg").unwrap();

        assert!(wipe_directory(root, true).success);
        assert!(!root.join("media").exists());
    }

    #[test]
    fn missing_directory_is_already_wiped() {
        assert!(wipe_directory(Path::new("/no/such/dir"), false).success);
    }
}
