//! ROM and kernel switching
//!
//! Switching writes a ROM's saved boot image onto the boot block device;
//! setting the kernel saves the current boot block device as that ROM's
//! image. Saved images are guarded by SHA-512 checksums kept in a property
//! file so a tampered image is refused before it ever reaches the partition.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha512};
use tracing::{error, info, warn};

use crate::fsops;
use crate::ownership;
use crate::properties;
use crate::protocol::SwitchRomResult;
use crate::rom::{self, MULTIBOOT_DIR};
use crate::walk::{chown, label};

const CHECKSUMS_FILE: &str = "checksums.prop";
const MULTIBOOT_OWNER: &str = "media_rw";
const MULTIBOOT_CONTEXT: &str = "u:object_r:media_rw_data_file:s0";

fn checksums_path() -> PathBuf {
    Path::new(MULTIBOOT_DIR).join(CHECKSUMS_FILE)
}

fn checksum_key(rom_id: &str) -> String {
    format!("{rom_id}.sha512")
}

/// SHA-512 of a file's contents, as lowercase hex.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha512::new();
    let mut buf = [0u8; 10240];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn stored_checksum(checksums: &Path, rom_id: &str) -> Option<String> {
    properties::get_property(checksums, &checksum_key(rom_id))
}

fn store_checksum(checksums: &Path, rom_id: &str, digest: &str) -> io::Result<()> {
    let mut props = properties::read_property_file(checksums).unwrap_or_default();
    props.insert(checksum_key(rom_id), digest.to_string());
    if let Some(parent) = checksums.parent() {
        std::fs::create_dir_all(parent)?;
    }
    properties::write_property_file(checksums, &props)
}

/// Make the multiboot state directory reachable by the media storage stack
/// so saved boot images show up over MTP. Best effort; a plain Linux host
/// has neither the user nor the label and that is fine.
fn fix_multiboot_permissions() {
    let dir = Path::new(MULTIBOOT_DIR);

    match (
        ownership::resolve_user(MULTIBOOT_OWNER),
        ownership::resolve_group(MULTIBOOT_OWNER),
    ) {
        (Ok(uid), Ok(gid)) => {
            let outcome = chown::chown_recursive(dir, uid, gid, false);
            if !outcome.success {
                warn!(
                    "failed to chown {}: {}",
                    dir.display(),
                    outcome.error.unwrap_or_default()
                );
            }
        }
        _ => warn!("user {} does not exist; leaving ownership alone", MULTIBOOT_OWNER),
    }

    let outcome = label::set_context_recursive(dir, MULTIBOOT_CONTEXT, false);
    if !outcome.success {
        warn!(
            "failed to relabel {}: {}",
            dir.display(),
            outcome.error.unwrap_or_default()
        );
    }
}

/// Check that `blockdev` lives under one of the allowed base directories.
///
/// With no explicit bases, anything under `/dev/` is accepted. This is the
/// only check standing between a client-supplied path and a raw partition
/// write, so unknown paths are refused outright.
fn blockdev_allowed(blockdev: &Path, base_dirs: &[String]) -> bool {
    if base_dirs.is_empty() {
        return blockdev.starts_with("/dev");
    }
    base_dirs.iter().any(|base| blockdev.starts_with(base))
}

fn switch_rom_at(
    rom_id: &str,
    boot_blockdev: &Path,
    blockdev_base_dirs: &[String],
    force_update_checksums: bool,
    checksums: &Path,
) -> SwitchRomResult {
    if !blockdev_allowed(boot_blockdev, blockdev_base_dirs) {
        error!(
            "{}: boot block device is not in an allowed directory",
            boot_blockdev.display()
        );
        return SwitchRomResult::Failed;
    }

    let Some(rom) = rom::find_rom(rom_id) else {
        error!("{}: ROM is not installed", rom_id);
        return SwitchRomResult::Failed;
    };

    let image = rom.boot_image_path();
    let digest = match hash_file(&image) {
        Ok(digest) => digest,
        Err(e) => {
            error!("{}: failed to hash boot image: {}", image.display(), e);
            return SwitchRomResult::Failed;
        }
    };

    if force_update_checksums {
        if let Err(e) = store_checksum(checksums, rom_id, &digest) {
            error!("failed to update stored checksum: {}", e);
            return SwitchRomResult::Failed;
        }
        fix_multiboot_permissions();
    } else {
        match stored_checksum(checksums, rom_id) {
            None => {
                warn!("{}: no stored checksum for boot image", rom_id);
                return SwitchRomResult::ChecksumNotFound;
            }
            Some(stored) if stored != digest => {
                error!("{}: boot image checksum mismatch", rom_id);
                return SwitchRomResult::ChecksumInvalid;
            }
            Some(_) => {}
        }
    }

    if let Err(e) = fsops::copy_contents(&image, boot_blockdev) {
        error!(
            "failed to write boot image to {}: {}",
            boot_blockdev.display(),
            e
        );
        return SwitchRomResult::Failed;
    }

    info!("switched to ROM {}", rom_id);
    SwitchRomResult::Succeeded
}

/// Flash `rom_id`'s saved boot image onto `boot_blockdev`.
pub fn switch_rom(
    rom_id: &str,
    boot_blockdev: &Path,
    blockdev_base_dirs: &[String],
    force_update_checksums: bool,
) -> SwitchRomResult {
    switch_rom_at(
        rom_id,
        boot_blockdev,
        blockdev_base_dirs,
        force_update_checksums,
        &checksums_path(),
    )
}

fn set_kernel_at(rom_id: &str, boot_blockdev: &Path, checksums: &Path) -> bool {
    let Some(rom) = rom::find_rom(rom_id) else {
        error!("{}: ROM is not installed", rom_id);
        return false;
    };

    let image = rom.boot_image_path();
    if let Some(parent) = image.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            error!("{}: failed to create directory: {}", parent.display(), e);
            return false;
        }
    }

    if let Err(e) = fsops::copy_contents(boot_blockdev, &image) {
        error!(
            "failed to save boot image from {}: {}",
            boot_blockdev.display(),
            e
        );
        return false;
    }

    let digest = match hash_file(&image) {
        Ok(digest) => digest,
        Err(e) => {
            error!("{}: failed to hash saved image: {}", image.display(), e);
            return false;
        }
    };
    if let Err(e) = store_checksum(checksums, rom_id, &digest) {
        error!("failed to store checksum: {}", e);
        return false;
    }
    fix_multiboot_permissions();

    info!("saved kernel for ROM {}", rom_id);
    true
}

/// Save the current contents of `boot_blockdev` as `rom_id`'s boot image.
pub fn set_kernel(rom_id: &str, boot_blockdev: &Path) -> bool {
    set_kernel_at(rom_id, boot_blockdev, &checksums_path())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_hex() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("boot.img");
        std::fs::write(&path, b"kernel bits").unwrap();
        let a = hash_file(&path).unwrap();
        let b = hash_file(&path).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 128);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn checksum_store_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let checksums = tmp.path().join("checksums.prop");
        assert!(stored_checksum(&checksums, "dual").is_none());
        store_checksum(&checksums, "dual", "abc").unwrap();
        store_checksum(&checksums, "data-slot-1", "def").unwrap();
        assert_eq!(stored_checksum(&checksums, "dual").as_deref(), Some("abc"));
        assert_eq!(
            stored_checksum(&checksums, "data-slot-1").as_deref(),
            Some("def")
        );
    }

    #[test]
    fn blockdev_outside_base_dirs_is_refused() {
        assert!(blockdev_allowed(Path::new("/dev/block/boot"), &[]));
        assert!(!blockdev_allowed(Path::new("/data/evil"), &[]));
        let bases = vec!["/dev/block/bootdevice".to_string()];
        assert!(blockdev_allowed(
            Path::new("/dev/block/bootdevice/by-name/boot"),
            &bases
        ));
        assert!(!blockdev_allowed(Path::new("/dev/block/sda1"), &bases));
    }
}
