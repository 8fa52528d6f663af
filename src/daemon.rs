//! Listener loop
//!
//! Binds the Unix socket and hands each accepted connection to its own
//! thread running a [`Session`]. Request handlers block on the filesystem,
//! so a thread per connection is the whole concurrency story; sessions share
//! nothing, and a panic or error in one connection's thread never disturbs
//! the others.

use std::os::unix::fs::PermissionsExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::thread;

use tracing::{error, info};

use crate::cli::SocketConfig;
use crate::error::{DaemonError, Result};
use crate::session::Session;

/// Only root may talk to a daemon that runs as root.
const SOCKET_MODE: u32 = 0o600;

fn handle_connection(stream: UnixStream) {
    let mut session = Session::new(stream);
    if let Err(e) = session.run() {
        error!("session ended with error: {}", e);
    }
}

/// Bind the socket and serve connections until the process is killed.
///
/// # Errors
///
/// Returns an error if the socket cannot be bound or its permissions cannot
/// be restricted. Per-connection failures are logged, not returned.
pub fn serve(config: &SocketConfig) -> Result<()> {
    if config.replace && config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }

    let listener = UnixListener::bind(&config.socket_path).map_err(|e| {
        DaemonError::Config(format!(
            "failed to bind {}: {e}",
            config.socket_path.display()
        ))
    })?;
    std::fs::set_permissions(
        &config.socket_path,
        std::fs::Permissions::from_mode(SOCKET_MODE),
    )?;

    info!("listening on {}", config.socket_path.display());

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                thread::spawn(move || handle_connection(stream));
            }
            Err(e) => {
                // Transient accept failures (EMFILE and friends) should not
                // take the daemon down
                error!("failed to accept connection: {}", e);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_socket_without_replace_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("mbootd.sock");
        let _listener = UnixListener::bind(&path).unwrap();

        let config = SocketConfig {
            socket_path: path,
            replace: false,
        };
        assert!(matches!(serve(&config), Err(DaemonError::Config(_))));
    }
}
