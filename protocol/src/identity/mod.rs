//! # Private & Public Identities
//!
//! A **private identity** is a secret value `m` the client chose for
//! itself, together with the issuer's blind signatures `s_i` on it —
//! `s_i^{e_i} ≡ m (mod n)` for every key component. The issuer produced
//! those signatures without ever seeing `m`; that is the entire point of
//! the blind issuance flow in [`crate::issuance`].
//!
//! The **public identity** is just `m`. It is the certificate a verifier
//! holds: combined with the issuer's public key it can check
//! authentication proofs, but recovering any `s_i` from it requires
//! breaking RSA. Publish it freely.
//!
//! Fingerprints give humans something short to compare out of band: the
//! BLAKE3 digest of the canonical public encoding, rendered as unpadded
//! URL-safe base64. Same identity, same fingerprint, every time.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use thiserror::Error;

use crate::bignum::Bignum;
use crate::config;
use crate::wire::codec::{Codec, CodecError};
use crate::wire::{self, PacketReader, PacketWriter, WireError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from identity import and export.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The encoded signature count is out of range.
    #[error("component count {got} outside supported range 1..={max}")]
    ComponentCount {
        /// Count found in the encoding.
        got: usize,
        /// Largest supported count.
        max: usize,
    },

    /// The encoding parsed but a value violates a structural invariant.
    #[error("identity failed structural validation")]
    InvalidStructure,

    /// A bignum failed to encode or decode.
    #[error("malformed identity encoding: {0}")]
    Codec(#[from] CodecError),

    /// The packet framing is broken.
    #[error("malformed identity framing: {0}")]
    Wire(#[from] WireError),
}

// ---------------------------------------------------------------------------
// PublicIdentity
// ---------------------------------------------------------------------------

/// The publishable certificate: the identity value `m`.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicIdentity {
    value: Bignum,
}

impl PublicIdentity {
    pub(crate) fn new(value: Bignum) -> Self {
        Self { value }
    }

    /// The identity value.
    pub fn value(&self) -> &Bignum {
        &self.value
    }

    /// Serialize: a `VPI1` header, then the value.
    pub fn to_bytes(&self) -> Result<Vec<u8>, IdentityError> {
        let mut w = PacketWriter::new();
        wire::write_header(&mut w, config::TAG_PUBLIC_ID, 0)?;
        Codec::shared().encode(&mut w, &self.value)?;
        Ok(w.into_bytes())
    }

    /// Parse a public identity serialized by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IdentityError> {
        let mut r = PacketReader::new(bytes);
        let count = wire::read_header(&mut r, config::TAG_PUBLIC_ID)?;
        if count != 0 {
            return Err(IdentityError::InvalidStructure);
        }
        let value = Codec::shared().decode(&mut r)?;
        if !value.is_positive() {
            return Err(IdentityError::InvalidStructure);
        }
        r.finish()?;
        Ok(Self { value })
    }

    /// Deterministic, fixed-length, human-comparable digest of this
    /// identity: 43 characters of URL-safe base64 over a BLAKE3 hash of
    /// the canonical encoding.
    pub fn fingerprint(&self) -> String {
        let mag = self.value.magnitude_bytes();
        let mut hasher = blake3::Hasher::new();
        hasher.update(config::TAG_PUBLIC_ID);
        hasher.update(&(mag.len() as u32).to_be_bytes());
        hasher.update(&mag);
        URL_SAFE_NO_PAD.encode(hasher.finalize().as_bytes())
    }
}

impl fmt::Debug for PublicIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicIdentity({})", self.fingerprint())
    }
}

impl fmt::Display for PublicIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fingerprint())
    }
}

// ---------------------------------------------------------------------------
// PrivateIdentity
// ---------------------------------------------------------------------------

/// The secret identity: the value `m` plus one issuer signature per key
/// component. Never transmitted during authentication; the proofs in
/// [`crate::auth`] demonstrate possession without revealing it.
///
/// The contents are overwritten on drop. `Debug` prints the public
/// fingerprint only.
pub struct PrivateIdentity {
    value: Bignum,
    signatures: Vec<Bignum>,
}

impl PrivateIdentity {
    pub(crate) fn new(value: Bignum, signatures: Vec<Bignum>) -> Self {
        Self { value, signatures }
    }

    /// Number of issuer signatures (one per key component).
    pub fn component_count(&self) -> usize {
        self.signatures.len()
    }

    pub(crate) fn value(&self) -> &Bignum {
        &self.value
    }

    pub(crate) fn signatures(&self) -> &[Bignum] {
        &self.signatures
    }

    /// Derive the publishable certificate.
    pub fn public_identity(&self) -> PublicIdentity {
        PublicIdentity {
            value: self.value.clone(),
        }
    }

    /// Serialize, secrets included: a `VSI1` header carrying the
    /// signature count, then the value, then each signature.
    pub fn to_bytes(&self) -> Result<Vec<u8>, IdentityError> {
        let codec = Codec::shared();
        let mut w = PacketWriter::new();
        wire::write_header(&mut w, config::TAG_PRIVATE_ID, self.signatures.len() as u32)?;
        codec.encode(&mut w, &self.value)?;
        for s in &self.signatures {
            codec.encode(&mut w, s)?;
        }
        Ok(w.into_bytes())
    }

    /// Parse a private identity serialized by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IdentityError> {
        let codec = Codec::shared();
        let mut r = PacketReader::new(bytes);
        let k = wire::read_header(&mut r, config::TAG_PRIVATE_ID)? as usize;
        if k == 0 || k > config::MAX_COMPONENTS {
            return Err(IdentityError::ComponentCount {
                got: k,
                max: config::MAX_COMPONENTS,
            });
        }
        let value = codec.decode(&mut r)?;
        if !value.is_positive() {
            return Err(IdentityError::InvalidStructure);
        }
        let mut signatures = Vec::with_capacity(k);
        for _ in 0..k {
            let s = codec.decode(&mut r)?;
            if !s.is_positive() {
                return Err(IdentityError::InvalidStructure);
            }
            signatures.push(s);
        }
        r.finish()?;
        Ok(Self { value, signatures })
    }
}

impl PartialEq for PrivateIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.signatures == other.signatures
    }
}

impl Eq for PrivateIdentity {}

impl Drop for PrivateIdentity {
    fn drop(&mut self) {
        self.value = Bignum::zero();
        for s in &mut self.signatures {
            *s = Bignum::zero();
        }
    }
}

impl fmt::Debug for PrivateIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PrivateIdentity({}, components={})",
            self.public_identity().fingerprint(),
            self.signatures.len()
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_private() -> PrivateIdentity {
        PrivateIdentity::new(
            Bignum::from_i64(0x0102_0304_0506),
            vec![Bignum::from_i64(7), Bignum::from_i64(11)],
        )
    }

    #[test]
    fn public_round_trip() {
        let id = sample_private().public_identity();
        let bytes = id.to_bytes().unwrap();
        let restored = PublicIdentity::from_bytes(&bytes).unwrap();
        assert_eq!(id, restored);
    }

    #[test]
    fn private_round_trip() {
        let id = sample_private();
        let bytes = id.to_bytes().unwrap();
        let restored = PrivateIdentity::from_bytes(&bytes).unwrap();
        assert_eq!(id, restored);
    }

    #[test]
    fn derived_public_matches_value() {
        let id = sample_private();
        assert_eq!(id.public_identity().value(), id.value());
    }

    #[test]
    fn fingerprint_is_stable() {
        let id = sample_private().public_identity();
        assert_eq!(id.fingerprint(), id.fingerprint());
        assert_eq!(id.fingerprint().len(), config::FINGERPRINT_LEN);
    }

    #[test]
    fn fingerprints_differ_for_different_identities() {
        let a = PublicIdentity::new(Bignum::from_i64(1234));
        let b = PublicIdentity::new(Bignum::from_i64(1235));
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_survives_serialization() {
        let id = sample_private().public_identity();
        let restored = PublicIdentity::from_bytes(&id.to_bytes().unwrap()).unwrap();
        assert_eq!(id.fingerprint(), restored.fingerprint());
    }

    #[test]
    fn truncated_identity_rejected() {
        let bytes = sample_private().to_bytes().unwrap();
        for cut in [0, 4, bytes.len() - 1] {
            assert!(PrivateIdentity::from_bytes(&bytes[..cut]).is_err());
        }
    }

    #[test]
    fn wrong_header_rejected() {
        let public_bytes = sample_private().public_identity().to_bytes().unwrap();
        assert!(PrivateIdentity::from_bytes(&public_bytes).is_err());
    }

    #[test]
    fn zero_value_rejected() {
        let mut w = PacketWriter::new();
        wire::write_header(&mut w, config::TAG_PUBLIC_ID, 0).unwrap();
        Codec::shared().encode(&mut w, &Bignum::zero()).unwrap();
        assert!(matches!(
            PublicIdentity::from_bytes(&w.into_bytes()),
            Err(IdentityError::InvalidStructure)
        ));
    }

    #[test]
    fn oversized_component_count_rejected() {
        let mut w = PacketWriter::new();
        wire::write_header(
            &mut w,
            config::TAG_PRIVATE_ID,
            (config::MAX_COMPONENTS + 1) as u32,
        )
        .unwrap();
        Codec::shared().encode(&mut w, &Bignum::one()).unwrap();
        assert!(matches!(
            PrivateIdentity::from_bytes(&w.into_bytes()),
            Err(IdentityError::ComponentCount { .. })
        ));
    }

    #[test]
    fn debug_prints_fingerprint_not_secrets() {
        let id = sample_private();
        let s = format!("{id:?}");
        assert!(s.contains(&id.public_identity().fingerprint()));
        assert!(s.contains("components=2"));
    }
}
