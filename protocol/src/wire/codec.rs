//! # Canonical Bignum Encoding
//!
//! A [`Bignum`] travels as a single packet: one tag byte, then the
//! unsigned big-endian magnitude. The tag encodes zero-ness in bit 0 and
//! the sign in bit 1:
//!
//! ```text
//! tag 0 — zero       (no magnitude bytes follow)
//! tag 1 — positive   (magnitude follows)
//! tag 3 — negative   (magnitude follows)
//! ```
//!
//! The encoding is canonical: the magnitude carries no leading zeros, zero
//! has exactly one representation, and `decode(encode(x)) == x` for every
//! representable value.
//!
//! [`Codec`] is an explicit resource handle rather than a global: it owns
//! the configurable magnitude bound and a lock-guarded scratch buffer that
//! encodes stage through. Most callers want [`Codec::shared`], the
//! process-wide instance with the default bound; tests and embedders with
//! tighter memory budgets can construct their own.

use std::sync::OnceLock;

use parking_lot::Mutex;
use thiserror::Error;

use crate::bignum::Bignum;
use crate::config;

use super::{PacketReader, PacketWriter, WireError};

const TAG_ZERO: u8 = 0;
const TAG_POSITIVE: u8 = 1;
const TAG_NEGATIVE: u8 = 3;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from encoding or decoding a bignum.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The value's magnitude exceeds the codec's configured bound.
    #[error("value too large: {len}-byte magnitude exceeds the {max}-byte bound")]
    ValueTooLarge {
        /// Magnitude length of the offending value.
        len: usize,
        /// The codec's bound.
        max: usize,
    },

    /// The packet had no tag byte at all.
    #[error("empty bignum packet: missing tag byte")]
    Empty,

    /// The tag byte is not one of 0, 1, 3.
    #[error("invalid bignum tag byte 0x{0:02x}")]
    InvalidTag(u8),

    /// The underlying framing failed.
    #[error(transparent)]
    Wire(#[from] WireError),
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Encoder/decoder for the canonical bignum wire form.
///
/// Holding the scratch lock for the duration of one encode serializes
/// concurrent encodes through the same instance; decodes read the input
/// slice in place and take no lock. Values confined to different codec
/// instances never contend.
pub struct Codec {
    max_magnitude: usize,
    scratch: Mutex<Vec<u8>>,
}

impl Codec {
    /// A codec whose encoded magnitudes may not exceed `max_magnitude`
    /// bytes, in either direction.
    pub fn new(max_magnitude: usize) -> Self {
        Self {
            max_magnitude,
            scratch: Mutex::new(Vec::new()),
        }
    }

    /// The process-wide codec with the default bound
    /// ([`config::MAX_MAGNITUDE_BYTES`]). All protocol serialization goes
    /// through this instance.
    pub fn shared() -> &'static Codec {
        static SHARED: OnceLock<Codec> = OnceLock::new();
        SHARED.get_or_init(|| Codec::new(config::MAX_MAGNITUDE_BYTES))
    }

    /// The configured magnitude bound in bytes.
    pub fn max_magnitude(&self) -> usize {
        self.max_magnitude
    }

    /// Encode `value` as one packet appended to `out`.
    pub fn encode(&self, out: &mut PacketWriter, value: &Bignum) -> Result<(), CodecError> {
        let mag = value.magnitude_bytes();
        if mag.len() > self.max_magnitude {
            return Err(CodecError::ValueTooLarge {
                len: mag.len(),
                max: self.max_magnitude,
            });
        }
        let tag = if value.is_zero() {
            TAG_ZERO
        } else if value.is_negative() {
            TAG_NEGATIVE
        } else {
            TAG_POSITIVE
        };

        let mut scratch = self.scratch.lock();
        scratch.clear();
        scratch.push(tag);
        if tag != TAG_ZERO {
            scratch.extend_from_slice(&mag);
        }
        out.write_packet(&scratch)?;
        Ok(())
    }

    /// Decode the next packet of `input` as a bignum.
    ///
    /// A zero tag yields canonical zero no matter what follows the tag
    /// byte. Unknown tags and over-bound magnitudes are rejected.
    pub fn decode(&self, input: &mut PacketReader<'_>) -> Result<Bignum, CodecError> {
        let packet = input.read_packet()?;
        let (&tag, mag) = packet.split_first().ok_or(CodecError::Empty)?;
        match tag {
            TAG_ZERO => Ok(Bignum::zero()),
            TAG_POSITIVE | TAG_NEGATIVE => {
                if mag.len() > self.max_magnitude {
                    return Err(CodecError::ValueTooLarge {
                        len: mag.len(),
                        max: self.max_magnitude,
                    });
                }
                let value = Bignum::from_bytes_be(mag);
                if tag == TAG_NEGATIVE {
                    Ok(-value)
                } else {
                    Ok(value)
                }
            }
            other => Err(CodecError::InvalidTag(other)),
        }
    }

    /// Encode a single value into a standalone byte vector.
    pub fn encode_to_vec(&self, value: &Bignum) -> Result<Vec<u8>, CodecError> {
        let mut w = PacketWriter::new();
        self.encode(&mut w, value)?;
        Ok(w.into_bytes())
    }

    /// Decode a byte vector that must contain exactly one encoded value.
    pub fn decode_from_slice(&self, bytes: &[u8]) -> Result<Bignum, CodecError> {
        let mut r = PacketReader::new(bytes);
        let value = self.decode(&mut r)?;
        r.finish()?;
        Ok(value)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
