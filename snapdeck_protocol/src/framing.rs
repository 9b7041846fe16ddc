// Length-delimited framing for wire events.
//
// One `WireEvent` per frame: a 4-byte big-endian length prefix followed by
// the event's JSON encoding. `write_event` serializes and frames in one
// step; reading is split into `read_frame` (raw bytes) + `decode_event`
// so the link layer can treat an undecodable payload as a recoverable
// no-op — log it, drop it, keep the stream alive — instead of tearing the
// connection down.
//
// `MAX_EVENT_SIZE` bounds allocation from a malformed length prefix. Full
// snapshots are the largest expected payloads and stay well under 1 MB
// even for maximal 5x15 boards.

use std::io::{self, Read, Write};

use crate::event::WireEvent;

/// Maximum allowed frame size (1 MB).
pub const MAX_EVENT_SIZE: u32 = 1024 * 1024;

/// Serialize an event to JSON and write it as one length-prefixed frame.
pub fn write_event<W: Write>(writer: &mut W, event: &WireEvent) -> io::Result<()> {
    let payload = serde_json::to_vec(event).map_err(io::Error::other)?;
    if payload.len() > MAX_EVENT_SIZE as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("event too large: {} bytes (max {MAX_EVENT_SIZE})", payload.len()),
        ));
    }
    #[expect(clippy::cast_possible_truncation)]
    let len_bytes = (payload.len() as u32).to_be_bytes();
    writer.write_all(&len_bytes)?;
    writer.write_all(&payload)?;
    writer.flush()?;
    Ok(())
}

/// Read one raw frame: 4-byte big-endian length, then that many bytes.
///
/// Returns `UnexpectedEof` when the stream closes, `InvalidData` when the
/// length prefix exceeds `MAX_EVENT_SIZE`.
pub fn read_frame<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_EVENT_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame too large: {len} bytes (max {MAX_EVENT_SIZE})"),
        ));
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Decode a frame's payload into a `WireEvent`. A failure here is the
/// caller's cue to drop the frame, not the connection.
pub fn decode_event(payload: &[u8]) -> Result<WireEvent, serde_json::Error> {
    serde_json::from_slice(payload)
}
