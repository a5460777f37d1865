//! # Wire Framing
//!
//! Everything VEIL puts on the wire is a sequence of length-prefixed
//! packets: a big-endian `u16` payload length followed by the payload.
//! That's the whole format. Higher layers decide what the payloads mean;
//! this module only guarantees that what was framed comes back out in the
//! same pieces, and that truncated or oversized input is rejected instead
//! of misread.
//!
//! The [`codec`] submodule layers the canonical bignum encoding on top of
//! the framing.

use thiserror::Error;

use crate::config;

pub mod codec;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from packet framing. All of these are recoverable by rejecting
/// the message; none of them leave a reader or writer in a broken state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// A payload was too large for the u16 length prefix.
    #[error("packet payload of {len} bytes exceeds the {max}-byte framing limit")]
    PacketTooLarge {
        /// Offered payload length.
        len: usize,
        /// Maximum the framing can express.
        max: usize,
    },

    /// The input ended in the middle of a length prefix or payload.
    #[error("input truncated: packet needs {needed} more bytes")]
    Truncated {
        /// How many bytes were missing.
        needed: usize,
    },

    /// A packet was requested but the input is exhausted.
    #[error("unexpected end of input: no packet to read")]
    UnexpectedEnd,

    /// Bytes remained after the final expected packet.
    #[error("{0} trailing bytes after the last packet")]
    TrailingBytes(usize),

    /// A format header packet had the wrong shape or the wrong tag.
    #[error("bad or unknown format header")]
    BadHeader,
}

// ---------------------------------------------------------------------------
// Format Headers
// ---------------------------------------------------------------------------

/// Write a format header packet: a 4-byte ASCII tag plus a big-endian
/// element count. Every serialized key and identity starts with one.
pub(crate) fn write_header(
    w: &mut PacketWriter,
    tag: &[u8; 4],
    count: u32,
) -> Result<(), WireError> {
    let mut payload = [0u8; 8];
    payload[..4].copy_from_slice(tag);
    payload[4..].copy_from_slice(&count.to_be_bytes());
    w.write_packet(&payload)
}

/// Read a format header packet and check its tag, returning the count.
pub(crate) fn read_header(r: &mut PacketReader<'_>, tag: &[u8; 4]) -> Result<u32, WireError> {
    let payload = r.read_packet()?;
    if payload.len() != 8 || &payload[..4] != tag {
        return Err(WireError::BadHeader);
    }
    Ok(u32::from_be_bytes(payload[4..].try_into().expect("4 bytes")))
}

// ---------------------------------------------------------------------------
// PacketWriter
// ---------------------------------------------------------------------------

/// Accumulates framed packets into an owned buffer.
#[derive(Debug, Default)]
pub struct PacketWriter {
    buf: Vec<u8>,
}

impl PacketWriter {
    /// Fresh, empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one framed packet.
    pub fn write_packet(&mut self, payload: &[u8]) -> Result<(), WireError> {
        if payload.len() > config::MAX_PACKET_LEN {
            return Err(WireError::PacketTooLarge {
                len: payload.len(),
                max: config::MAX_PACKET_LEN,
            });
        }
        self.buf.extend_from_slice(&(payload.len() as u16).to_be_bytes());
        self.buf.extend_from_slice(payload);
        Ok(())
    }

    /// Total bytes written so far, frames included.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// `true` iff nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Consume the writer and take the accumulated bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

// ---------------------------------------------------------------------------
// PacketReader
// ---------------------------------------------------------------------------

/// Reads framed packets back out of a byte slice.
///
/// The reader borrows the input; packet payloads are handed out as
/// sub-slices without copying.
#[derive(Debug)]
pub struct PacketReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PacketReader<'a> {
    /// Wrap a byte slice for reading.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Read the next packet's payload.
    pub fn read_packet(&mut self) -> Result<&'a [u8], WireError> {
        let rest = &self.data[self.pos..];
        if rest.is_empty() {
            return Err(WireError::UnexpectedEnd);
        }
        if rest.len() < 2 {
            return Err(WireError::Truncated { needed: 2 - rest.len() });
        }
        let len = u16::from_be_bytes([rest[0], rest[1]]) as usize;
        if rest.len() < 2 + len {
            return Err(WireError::Truncated {
                needed: 2 + len - rest.len(),
            });
        }
        self.pos += 2 + len;
        Ok(&rest[2..2 + len])
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Succeeds only if every byte of the input was consumed. Call this
    /// after the last expected packet; trailing garbage in a protocol
    /// message is an error, not something to shrug at.
    pub fn finish(&self) -> Result<(), WireError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(WireError::TrailingBytes(n)),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
