//! mbootd: privileged helper daemon for multi-boot device management
//!
//! The daemon listens on a Unix socket and serves framed binary requests
//! from unprivileged clients: capability-style file access, recursive
//! filesystem operations, security labeling, and ROM inventory/switch/wipe
//! management. Each connection gets its own thread, its own handle table,
//! and strictly ordered request processing.
//!
//! Module map:
//! - [`protocol`]: wire schema, framing, and codec
//! - [`session`] / [`dispatch`]: per-connection loop and request handlers
//! - [`handles`]: per-session capability table
//! - [`walk`]: depth-first traversal engine and its visitors (copy, chown,
//!   labeling, size accounting)
//! - [`rom`]: installed-ROM inventory, switching, wiping, package census
//! - [`fsops`], [`selinux`], [`ownership`], [`mount`], [`loopdev`],
//!   [`properties`]: the filesystem primitives everything above is built on

pub mod cli;
pub mod daemon;
pub mod dispatch;
pub mod error;
pub mod fsops;
pub mod handles;
pub mod loopdev;
pub mod mount;
pub mod ownership;
pub mod properties;
pub mod protocol;
pub mod reboot;
pub mod rom;
pub mod selinux;
pub mod session;
pub mod walk;

pub use error::{DaemonError, Result};

/// Daemon version, reported over the wire by the version request.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
