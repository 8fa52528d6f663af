//! Integration tests for the session protocol engine
//!
//! Drives a real [`Session`] over a Unix socketpair the way a client would:
//! framed messages in, framed responses out, one response per request, in
//! order.

use std::os::unix::net::UnixStream;
use std::thread::JoinHandle;

use mbootd::protocol::codec::{decode_response, encode_request};
use mbootd::protocol::framing::{read_message, write_message};
use mbootd::protocol::{
    FileChmodRequest, FileCloseRequest, FileOpenRequest, FileReadRequest, FileSeekRequest,
    FileStatRequest, FileWriteRequest, OpenFlag, Request, Response, SeekWhence,
};
use mbootd::session::Session;

// ============================================================================
// HELPERS
// ============================================================================

struct Client {
    stream: UnixStream,
    daemon: Option<JoinHandle<mbootd::Result<()>>>,
}

impl Client {
    fn connect() -> Self {
        let (client, server) = UnixStream::pair().expect("failed to create socketpair");
        let daemon = std::thread::spawn(move || Session::new(server).run());
        Self {
            stream: client,
            daemon: Some(daemon),
        }
    }

    fn send(&mut self, request: &Request) -> Response {
        let buf = encode_request(request).expect("failed to encode request");
        write_message(&mut self.stream, &buf).expect("failed to send request");
        let reply = read_message(&mut self.stream)
            .expect("failed to read response")
            .expect("daemon closed the stream unexpectedly");
        decode_response(&reply).expect("failed to decode response")
    }

    fn send_raw(&mut self, buf: &[u8]) -> Response {
        write_message(&mut self.stream, buf).expect("failed to send request");
        let reply = read_message(&mut self.stream)
            .expect("failed to read response")
            .expect("daemon closed the stream unexpectedly");
        decode_response(&reply).expect("failed to decode response")
    }

    fn disconnect(mut self) -> mbootd::Result<()> {
        // Closing our write side gives the session loop its EOF
        let _ = self.stream.shutdown(std::net::Shutdown::Both);
        self.daemon
            .take()
            .expect("already disconnected")
            .join()
            .expect("session thread panicked")
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if let Some(daemon) = self.daemon.take() {
            // Unblock the session loop before joining it
            let _ = self.stream.shutdown(std::net::Shutdown::Both);
            let _ = daemon.join();
        }
    }
}

fn open(client: &mut Client, path: &str, flags: Vec<OpenFlag>, perms: u32) -> u32 {
    match client.send(&Request::FileOpen(FileOpenRequest {
        path: Some(path.to_string()),
        flags,
        perms,
    })) {
        Response::FileOpen {
            success: true, id, ..
        } => id,
        other => panic!("open failed: {other:?}"),
    }
}

// ============================================================================
// SESSION LIFECYCLE
// ============================================================================

#[test]
fn full_file_conversation() {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let path = tmp.path().join("scratch").to_string_lossy().into_owned();
    let mut client = Client::connect();

    let id = open(
        &mut client,
        &path,
        vec![OpenFlag::Create, OpenFlag::ReadWrite],
        0o644,
    );

    let response = client.send(&Request::FileWrite(FileWriteRequest {
        id,
        data: Some(b"framed protocol".to_vec()),
    }));
    assert_eq!(
        response,
        Response::FileWrite {
            success: true,
            error: None,
            bytes_written: 15
        }
    );

    let response = client.send(&Request::FileSeek(FileSeekRequest {
        id,
        offset: 7,
        whence: SeekWhence::Set,
    }));
    assert_eq!(
        response,
        Response::FileSeek {
            success: true,
            error: None,
            offset: 7
        }
    );

    let response = client.send(&Request::FileRead(FileReadRequest { id, count: 1024 }));
    assert_eq!(
        response,
        Response::FileRead {
            success: true,
            error: None,
            data: b"protocol".to_vec()
        }
    );

    match client.send(&Request::FileStat(FileStatRequest { id })) {
        Response::FileStat {
            success: true,
            stat: Some(stat),
            ..
        } => assert_eq!(stat.st_size, 15),
        other => panic!("stat failed: {other:?}"),
    }

    let response = client.send(&Request::FileClose(FileCloseRequest { id }));
    assert_eq!(
        response,
        Response::FileClose {
            success: true,
            error: None
        }
    );

    client.disconnect().expect("clean disconnect must not error");
}

#[test]
fn full_frame_read_is_answered_not_fatal() {
    use mbootd::protocol::framing::MAX_MESSAGE_SIZE;

    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let path = tmp.path().join("big");
    // Sparse file as large as a whole frame
    std::fs::File::create(&path)
        .expect("failed to create file")
        .set_len(u64::from(MAX_MESSAGE_SIZE))
        .expect("failed to extend file");

    let mut client = Client::connect();
    let id = open(
        &mut client,
        &path.to_string_lossy(),
        vec![OpenFlag::ReadOnly],
        0,
    );

    // Asking for a full frame's worth must yield a response, not a torn
    // session: the data is clamped so the encoded response still fits
    match client.send(&Request::FileRead(FileReadRequest {
        id,
        count: u64::from(MAX_MESSAGE_SIZE),
    })) {
        Response::FileRead {
            success: true,
            data,
            ..
        } => {
            assert!(!data.is_empty());
            assert!(data.len() < MAX_MESSAGE_SIZE as usize);
        }
        other => panic!("expected a successful read, got {other:?}"),
    }

    client.disconnect().expect("clean disconnect must not error");
}

#[test]
fn unknown_tags_are_answered_and_session_continues() {
    let mut client = Client::connect();

    for tag in [4000u16, 4001, 4002] {
        let mut buf = tag.to_le_bytes().to_vec();
        buf.extend_from_slice(b"opaque future payload");
        assert_eq!(client.send_raw(&buf), Response::Unsupported);
    }

    // The session is still alive and fully functional
    match client.send(&Request::GetVersion) {
        Response::Version { version } => assert_eq!(version, env!("CARGO_PKG_VERSION")),
        other => panic!("expected version, got {other:?}"),
    }

    client.disconnect().expect("clean disconnect must not error");
}

#[test]
fn unknown_handle_is_invalid_but_not_fatal() {
    let mut client = Client::connect();

    let response = client.send(&Request::FileWrite(FileWriteRequest {
        id: 999,
        data: Some(b"x".to_vec()),
    }));
    assert_eq!(response, Response::Invalid);

    // Follow-up requests still work
    match client.send(&Request::GetVersion) {
        Response::Version { .. } => {}
        other => panic!("expected version, got {other:?}"),
    }
}

#[test]
fn chmod_with_non_permission_bits_is_invalid() {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let path = tmp.path().join("f").to_string_lossy().into_owned();
    let mut client = Client::connect();
    let id = open(
        &mut client,
        &path,
        vec![OpenFlag::Create, OpenFlag::WriteOnly],
        0o600,
    );

    let response = client.send(&Request::FileChmod(FileChmodRequest { id, mode: 0o4755 }));
    assert_eq!(response, Response::Invalid);

    let response = client.send(&Request::FileChmod(FileChmodRequest { id, mode: 0o755 }));
    assert_eq!(
        response,
        Response::FileChmod {
            success: true,
            error: None
        }
    );
}

#[test]
fn corrupt_payload_tears_the_session_down() {
    let mut client = Client::connect();

    let mut torn = encode_request(&Request::FileWrite(FileWriteRequest {
        id: 1,
        data: Some(vec![1, 2, 3, 4]),
    }))
    .expect("failed to encode request");
    torn.truncate(3);
    write_message(&mut client.stream, &torn).expect("failed to send");

    // No response comes back; the daemon closes the stream instead
    let reply = read_message(&mut client.stream).expect("read failed");
    assert!(reply.is_none(), "expected EOF after fatal request");
    assert!(client.disconnect().is_err());
}

#[test]
fn missing_mandatory_string_is_invalid() {
    let mut client = Client::connect();
    let response = client.send(&Request::FileOpen(FileOpenRequest {
        path: None,
        flags: vec![OpenFlag::ReadOnly],
        perms: 0,
    }));
    assert_eq!(response, Response::Invalid);
}
