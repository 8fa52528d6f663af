//! Reboot trigger
//!
//! The daemon does not call reboot(2) directly; it hands off to the
//! platform's `reboot` utility so init gets a chance to shut services down.

use std::process::Command;

use tracing::{error, info};

/// Ask the platform to reboot, optionally into a specific target
/// ("recovery", "bootloader", ...). The client rarely sees the success
/// response, but it is sent for symmetry.
pub fn reboot_via_init(arg: &str) -> bool {
    let mut command = Command::new("reboot");
    if !arg.is_empty() {
        command.arg(arg);
    }

    info!("rebooting (arg: {:?})", arg);
    match command.status() {
        Ok(status) if status.success() => true,
        Ok(status) => {
            error!("reboot command exited with {}", status);
            false
        }
        Err(e) => {
            error!("failed to run reboot command: {}", e);
            false
        }
    }
}
