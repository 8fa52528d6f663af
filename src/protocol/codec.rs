//! Request/response encoding, decoding and verification
//!
//! A request buffer is `[u16 LE command tag][bincode payload]`. Decoding
//! verifies the payload against the tag's schema before the dispatcher ever
//! sees it; a payload that does not verify is fatal to the session, while a
//! tag outside the known table is reported as [`DecodedRequest::UnknownTag`]
//! so the session can answer "unsupported" and carry on.

use crate::error::Result;
use crate::protocol::{Request, Response};

mod tag {
    pub const FILE_CHMOD: u16 = 0;
    pub const FILE_CLOSE: u16 = 1;
    pub const FILE_OPEN: u16 = 2;
    pub const FILE_READ: u16 = 3;
    pub const FILE_SEEK: u16 = 4;
    pub const FILE_SELINUX_GET_LABEL: u16 = 5;
    pub const FILE_SELINUX_SET_LABEL: u16 = 6;
    pub const FILE_STAT: u16 = 7;
    pub const FILE_WRITE: u16 = 8;
    pub const PATH_CHMOD: u16 = 9;
    pub const PATH_COPY: u16 = 10;
    pub const PATH_SELINUX_GET_LABEL: u16 = 11;
    pub const PATH_SELINUX_SET_LABEL: u16 = 12;
    pub const PATH_GET_DIRECTORY_SIZE: u16 = 13;
    pub const GET_BOOTED_ROM_ID: u16 = 14;
    pub const GET_INSTALLED_ROMS: u16 = 15;
    pub const GET_VERSION: u16 = 16;
    pub const SET_KERNEL: u16 = 17;
    pub const SWITCH_ROM: u16 = 18;
    pub const WIPE_ROM: u16 = 19;
    pub const GET_PACKAGES_COUNT: u16 = 20;
    pub const REBOOT: u16 = 21;
}

/// Result of decoding one request buffer.
#[derive(Debug)]
pub enum DecodedRequest {
    /// Tag and payload both verified
    Known(Request),
    /// Tag outside the command table; payload intentionally not inspected
    UnknownTag(u16),
}

/// Encode a request for the wire (client side; the daemon's tests and any
/// in-process client use this).
///
/// # Errors
///
/// Returns an error if the payload cannot be serialized.
pub fn encode_request(request: &Request) -> Result<Vec<u8>> {
    let (tag, payload) = match request {
        Request::FileChmod(r) => (tag::FILE_CHMOD, bincode::serialize(r)?),
        Request::FileClose(r) => (tag::FILE_CLOSE, bincode::serialize(r)?),
        Request::FileOpen(r) => (tag::FILE_OPEN, bincode::serialize(r)?),
        Request::FileRead(r) => (tag::FILE_READ, bincode::serialize(r)?),
        Request::FileSeek(r) => (tag::FILE_SEEK, bincode::serialize(r)?),
        Request::FileSelinuxGetLabel(r) => (tag::FILE_SELINUX_GET_LABEL, bincode::serialize(r)?),
        Request::FileSelinuxSetLabel(r) => (tag::FILE_SELINUX_SET_LABEL, bincode::serialize(r)?),
        Request::FileStat(r) => (tag::FILE_STAT, bincode::serialize(r)?),
        Request::FileWrite(r) => (tag::FILE_WRITE, bincode::serialize(r)?),
        Request::PathChmod(r) => (tag::PATH_CHMOD, bincode::serialize(r)?),
        Request::PathCopy(r) => (tag::PATH_COPY, bincode::serialize(r)?),
        Request::PathSelinuxGetLabel(r) => (tag::PATH_SELINUX_GET_LABEL, bincode::serialize(r)?),
        Request::PathSelinuxSetLabel(r) => (tag::PATH_SELINUX_SET_LABEL, bincode::serialize(r)?),
        Request::PathGetDirectorySize(r) => {
            (tag::PATH_GET_DIRECTORY_SIZE, bincode::serialize(r)?)
        }
        Request::GetBootedRomId => (tag::GET_BOOTED_ROM_ID, Vec::new()),
        Request::GetInstalledRoms => (tag::GET_INSTALLED_ROMS, Vec::new()),
        Request::GetVersion => (tag::GET_VERSION, Vec::new()),
        Request::SetKernel(r) => (tag::SET_KERNEL, bincode::serialize(r)?),
        Request::SwitchRom(r) => (tag::SWITCH_ROM, bincode::serialize(r)?),
        Request::WipeRom(r) => (tag::WIPE_ROM, bincode::serialize(r)?),
        Request::GetPackagesCount(r) => (tag::GET_PACKAGES_COUNT, bincode::serialize(r)?),
        Request::Reboot(r) => (tag::REBOOT, bincode::serialize(r)?),
    };

    let mut buf = Vec::with_capacity(2 + payload.len());
    buf.extend_from_slice(&tag.to_le_bytes());
    buf.extend_from_slice(&payload);
    Ok(buf)
}

/// Decode and verify one request buffer.
///
/// # Errors
///
/// Returns an error if the buffer is shorter than a tag or a known tag's
/// payload fails schema verification. Callers treat this as fatal.
pub fn decode_request(buf: &[u8]) -> Result<DecodedRequest> {
    if buf.len() < 2 {
        let err: bincode::Error = Box::new(bincode::ErrorKind::Custom(
            "request shorter than command tag".to_string(),
        ));
        return Err(err.into());
    }
    let tag = u16::from_le_bytes([buf[0], buf[1]]);
    let payload = &buf[2..];

    let request = match tag {
        tag::FILE_CHMOD => Request::FileChmod(bincode::deserialize(payload)?),
        tag::FILE_CLOSE => Request::FileClose(bincode::deserialize(payload)?),
        tag::FILE_OPEN => Request::FileOpen(bincode::deserialize(payload)?),
        tag::FILE_READ => Request::FileRead(bincode::deserialize(payload)?),
        tag::FILE_SEEK => Request::FileSeek(bincode::deserialize(payload)?),
        tag::FILE_SELINUX_GET_LABEL => {
            Request::FileSelinuxGetLabel(bincode::deserialize(payload)?)
        }
        tag::FILE_SELINUX_SET_LABEL => {
            Request::FileSelinuxSetLabel(bincode::deserialize(payload)?)
        }
        tag::FILE_STAT => Request::FileStat(bincode::deserialize(payload)?),
        tag::FILE_WRITE => Request::FileWrite(bincode::deserialize(payload)?),
        tag::PATH_CHMOD => Request::PathChmod(bincode::deserialize(payload)?),
        tag::PATH_COPY => Request::PathCopy(bincode::deserialize(payload)?),
        tag::PATH_SELINUX_GET_LABEL => {
            Request::PathSelinuxGetLabel(bincode::deserialize(payload)?)
        }
        tag::PATH_SELINUX_SET_LABEL => {
            Request::PathSelinuxSetLabel(bincode::deserialize(payload)?)
        }
        tag::PATH_GET_DIRECTORY_SIZE => {
            Request::PathGetDirectorySize(bincode::deserialize(payload)?)
        }
        tag::GET_BOOTED_ROM_ID => Request::GetBootedRomId,
        tag::GET_INSTALLED_ROMS => Request::GetInstalledRoms,
        tag::GET_VERSION => Request::GetVersion,
        tag::SET_KERNEL => Request::SetKernel(bincode::deserialize(payload)?),
        tag::SWITCH_ROM => Request::SwitchRom(bincode::deserialize(payload)?),
        tag::WIPE_ROM => Request::WipeRom(bincode::deserialize(payload)?),
        tag::GET_PACKAGES_COUNT => Request::GetPackagesCount(bincode::deserialize(payload)?),
        tag::REBOOT => Request::Reboot(bincode::deserialize(payload)?),
        other => return Ok(DecodedRequest::UnknownTag(other)),
    };

    Ok(DecodedRequest::Known(request))
}

/// Encode a response for the wire.
///
/// # Errors
///
/// Returns an error if the response cannot be serialized.
pub fn encode_response(response: &Response) -> Result<Vec<u8>> {
    Ok(bincode::serialize(response)?)
}

/// Decode a response buffer (client side).
///
/// # Errors
///
/// Returns an error if the buffer fails schema verification.
pub fn decode_response(buf: &[u8]) -> Result<Response> {
    Ok(bincode::deserialize(buf)?)
}
