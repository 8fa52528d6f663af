//! Byte-level message framing
//!
//! Each message is a u32 little-endian length followed by that many payload
//! bytes. A clean end-of-stream while waiting for the next length prefix is
//! an ordinary session end; anything torn mid-message is an error.

use std::io::{self, Read, Write};

/// Upper bound on a single message; anything larger is a corrupt or hostile
/// stream.
pub const MAX_MESSAGE_SIZE: u32 = 16 * 1024 * 1024;

/// Read exactly one complete message.
///
/// Returns `Ok(None)` if the peer closed the stream between messages.
///
/// # Errors
///
/// Returns an error on short reads mid-message, oversized lengths, or any
/// underlying I/O failure.
pub fn read_message(stream: &mut impl Read) -> io::Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];

    // Distinguish "no next message" from a torn length prefix
    let mut filled = 0;
    while filled < len_buf.len() {
        let n = stream.read(&mut len_buf[filled..])?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stream closed inside message length",
            ));
        }
        filled += n;
    }

    let len = u32::from_le_bytes(len_buf);
    if len > MAX_MESSAGE_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("message length {len} exceeds limit"),
        ));
    }

    let mut payload = vec![0u8; len as usize];
    stream.read_exact(&mut payload)?;
    Ok(Some(payload))
}

/// Write exactly one complete message.
///
/// # Errors
///
/// Returns an error if the payload exceeds [`MAX_MESSAGE_SIZE`] or the
/// underlying write fails.
pub fn write_message(stream: &mut impl Write, payload: &[u8]) -> io::Result<()> {
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len <= MAX_MESSAGE_SIZE)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "message too large"))?;

    stream.write_all(&len.to_le_bytes())?;
    stream.write_all(payload)?;
    stream.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trip() {
        let mut buf = Vec::new();
        write_message(&mut buf, b"hello").unwrap();
        write_message(&mut buf, b"").unwrap();

        let mut cursor = Cursor::new(buf);
        assert_eq!(read_message(&mut cursor).unwrap().unwrap(), b"hello");
        assert_eq!(read_message(&mut cursor).unwrap().unwrap(), b"");
        assert!(read_message(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn torn_length_prefix_is_an_error() {
        let mut cursor = Cursor::new(vec![0x05, 0x00]);
        assert!(read_message(&mut cursor).is_err());
    }

    #[test]
    fn oversized_length_is_rejected() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(MAX_MESSAGE_SIZE + 1).to_le_bytes());
        let mut cursor = Cursor::new(buf);
        assert!(read_message(&mut cursor).is_err());
    }

    #[test]
    fn truncated_payload_is_an_error() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&10u32.to_le_bytes());
        buf.extend_from_slice(b"abc");
        let mut cursor = Cursor::new(buf);
        assert!(read_message(&mut cursor).is_err());
    }
}
