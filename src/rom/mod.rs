//! Installed-ROM inventory
//!
//! A ROM is a (system, cache, data) triple of directories plus a saved boot
//! image. The primary ROM owns the real partitions; every other ROM lives in
//! per-ROM subdirectories carved out of them.

pub mod packages;
pub mod switcher;
pub mod wipe;

use std::path::{Path, PathBuf};

use crate::properties;
use crate::protocol::RomEntry;

pub const MULTIBOOT_DIR: &str = "/data/multiboot";

const DEFAULT_PROP: &str = "/default.prop";
const PROP_ROM_ID: &str = "ro.multiboot.romid";
const PRIMARY_ID: &str = "primary";

/// One installed ROM and where its pieces live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rom {
    pub id: String,
    pub system_path: PathBuf,
    pub cache_path: PathBuf,
    pub data_path: PathBuf,
    /// The system tree is an image file rather than a directory
    pub system_is_image: bool,
}

impl Rom {
    fn primary() -> Self {
        Self {
            id: PRIMARY_ID.to_string(),
            system_path: PathBuf::from("/system"),
            cache_path: PathBuf::from("/cache"),
            data_path: PathBuf::from("/data"),
            system_is_image: false,
        }
    }

    fn secondary(id: &str) -> Self {
        Self {
            id: id.to_string(),
            system_path: PathBuf::from(format!("/system/multiboot/{id}/system")),
            cache_path: PathBuf::from(format!("/cache/multiboot/{id}/cache")),
            data_path: PathBuf::from(format!("/data/multiboot/{id}/data")),
            system_is_image: false,
        }
    }

    /// Where this ROM's saved boot image lives.
    #[must_use]
    pub fn boot_image_path(&self) -> PathBuf {
        Path::new(MULTIBOOT_DIR).join(&self.id).join("boot.img")
    }

    /// Multiboot state directory for this ROM.
    #[must_use]
    pub fn multiboot_path(&self) -> PathBuf {
        Path::new(MULTIBOOT_DIR).join(&self.id)
    }

    /// Wire representation, with version/build filled in from the ROM's
    /// build.prop when it is readable.
    #[must_use]
    pub fn to_entry(&self) -> RomEntry {
        let build_prop = self.system_path.join("build.prop");
        let props = properties::read_property_file(&build_prop).unwrap_or_default();
        RomEntry {
            id: self.id.clone(),
            system_path: self.system_path.to_string_lossy().into_owned(),
            cache_path: self.cache_path.to_string_lossy().into_owned(),
            data_path: self.data_path.to_string_lossy().into_owned(),
            version: props.get("ro.build.version.release").cloned(),
            build: props.get("ro.build.display.id").cloned(),
        }
    }
}

fn is_installed(rom: &mut Rom, multiboot_root: &Path) -> bool {
    // A ROM counts as installed once its boot image has been saved
    if !multiboot_root.join(&rom.id).join("boot.img").is_file() {
        return false;
    }
    let image = rom.system_path.with_extension("img");
    if image.is_file() {
        rom.system_path = image;
        rom.system_is_image = true;
    }
    true
}

fn installed_roms_in(multiboot_root: &Path) -> Vec<Rom> {
    let mut roms = Vec::new();

    let mut primary = Rom::primary();
    if is_installed(&mut primary, multiboot_root) {
        roms.push(primary);
    }

    let Ok(entries) = std::fs::read_dir(multiboot_root) else {
        return roms;
    };
    let mut ids: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|id| id != PRIMARY_ID)
        .collect();
    ids.sort();

    for id in ids {
        let mut rom = Rom::secondary(&id);
        if is_installed(&mut rom, multiboot_root) {
            roms.push(rom);
        }
    }

    roms
}

/// Every ROM with a saved boot image, primary first.
#[must_use]
pub fn installed_roms() -> Vec<Rom> {
    installed_roms_in(Path::new(MULTIBOOT_DIR))
}

/// Find one installed ROM by id.
#[must_use]
pub fn find_rom(rom_id: &str) -> Option<Rom> {
    installed_roms().into_iter().find(|r| r.id == rom_id)
}

/// Id of the ROM the device booted into, stamped into the boot image's
/// default.prop at patch time.
#[must_use]
pub fn booted_rom_id() -> Option<String> {
    properties::get_property(Path::new(DEFAULT_PROP), PROP_ROM_ID)
}
