//! # Issuer Key Material
//!
//! The issuer holds the long-term keypair everything else hangs off: a
//! composite modulus `n = p * q` with secret prime factors, and `k`
//! parallel exponent pairs `(e_i, d_i)` with `e_i * d_i ≡ 1 (mod φ(n))`.
//! The public half is `{n, e_1..e_k}`; the private half adds the `d_i`.
//! The primes themselves are discarded the moment the exponents are
//! derived — nothing after key generation needs them, so nothing after
//! key generation can leak them.
//!
//! `k` is the soundness knob. Every component contributes
//! [`config::CHALLENGE_BITS`] bits to the authentication proof, so a
//! cheating prover survives a handshake with probability
//! `2^-(k * CHALLENGE_BITS)`. More components, more modular
//! exponentiations per handshake; pick `k` accordingly.
//!
//! Public exponents are the smallest primes strictly above
//! `2^CHALLENGE_BITS` that are coprime to `φ(n)`, chosen in increasing
//! order. Keeping them barely above the challenge range keeps the
//! verifier's exponentiations cheap while preserving the "every challenge
//! is smaller than every exponent" invariant the soundness proof needs.

use std::fmt;

use thiserror::Error;
use tracing::info;

use crate::bignum::{prime, Bignum};
use crate::config;
use crate::rng::{self, EntropyError};
use crate::wire::codec::{Codec, CodecError};
use crate::wire::{self, PacketReader, PacketWriter, WireError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from key generation, import, and export.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The requested or encoded component count is out of range.
    #[error("component count {got} outside supported range 1..={max}")]
    ComponentCount {
        /// Count requested or found in the encoding.
        got: usize,
        /// Largest supported count.
        max: usize,
    },

    /// The modulus size is outside the supported range.
    #[error("modulus of {bits} bits outside supported range {min}..={max}")]
    ModulusSize {
        /// Bit length found.
        bits: u64,
        /// Smallest acceptable bit length.
        min: u64,
        /// Largest acceptable bit length.
        max: u64,
    },

    /// The encoding parsed but its values violate a structural invariant
    /// (even modulus, exponent out of range, non-prime exponent, ...).
    #[error("key material failed structural validation")]
    InvalidStructure,

    /// The OS entropy source is unusable.
    #[error(transparent)]
    Entropy(#[from] EntropyError),

    /// A bignum failed to encode or decode.
    #[error("malformed key encoding: {0}")]
    Codec(#[from] CodecError),

    /// The packet framing is broken.
    #[error("malformed key framing: {0}")]
    Wire(#[from] WireError),
}

// ---------------------------------------------------------------------------
// Key Types
// ---------------------------------------------------------------------------

/// One exponent pair. `e` is public, `d` is the crown jewel.
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct KeyComponent {
    pub(crate) e: Bignum,
    pub(crate) d: Bignum,
}

/// The issuer's full keypair: modulus plus `k` exponent pairs.
///
/// Deriving the public half is trivial ([`IssuerKeypair::public_key`]);
/// going the other way is factoring, which is the whole point.
///
/// `Debug` prints only public facts. Serializing the private half is a
/// deliberate act via [`IssuerKeypair::to_bytes`], never an accident of
/// a derive.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuerKeypair {
    n: Bignum,
    components: Vec<KeyComponent>,
}

/// The public half: modulus and public exponents. Safe to hand to anyone;
/// clients need it to request identities and verifiers need it to check
/// proofs.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuerPublicKey {
    n: Bignum,
    exponents: Vec<Bignum>,
}

// ---------------------------------------------------------------------------
// IssuerKeypair
// ---------------------------------------------------------------------------

impl IssuerKeypair {
    /// Generate a fresh keypair with `k` parallel proof components.
    ///
    /// Grinds out two distinct [`config::PRIME_BITS`]-bit primes, forms
    /// the modulus, picks the public exponents, and inverts them modulo
    /// `φ(n)`. The primes and `φ(n)` are dropped before this returns.
    ///
    /// # Errors
    ///
    /// Fails when `k` is out of range or the OS entropy source is
    /// unusable. Key generation takes a second or two at the default
    /// sizes — this is normal; it is factoring insurance, not a hang.
    pub fn generate(k: usize) -> Result<Self, KeyError> {
        if k == 0 || k > config::MAX_COMPONENTS {
            return Err(KeyError::ComponentCount {
                got: k,
                max: config::MAX_COMPONENTS,
            });
        }
        rng::ensure()?;

        let p = prime::generate_prime(config::PRIME_BITS)?;
        let q = loop {
            let q = prime::generate_prime(config::PRIME_BITS)?;
            if q != p {
                break q;
            }
        };
        let n = &p * &q;
        let one = Bignum::one();
        let phi = &(&p - &one) * &(&q - &one);

        let mut components = Vec::with_capacity(k);
        let mut floor = Bignum::one().shift(config::CHALLENGE_BITS as i64);
        for _ in 0..k {
            let e = prime::next_coprime_prime(&floor, &phi);
            let d = e.mod_inv(&phi).expect("exponent chosen coprime to phi");
            floor = e.clone();
            components.push(KeyComponent { e, d });
        }

        info!(
            modulus_bits = n.bit_len(),
            components = k,
            "issuer keypair generated"
        );
        Ok(Self { n, components })
    }

    /// The public half of this keypair.
    pub fn public_key(&self) -> IssuerPublicKey {
        IssuerPublicKey {
            n: self.n.clone(),
            exponents: self.components.iter().map(|c| c.e.clone()).collect(),
        }
    }

    /// The issuer modulus `n`.
    pub fn modulus(&self) -> &Bignum {
        &self.n
    }

    /// Number of parallel proof components.
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub(crate) fn components(&self) -> &[KeyComponent] {
        &self.components
    }

    /// Serialize the full keypair, private exponents included.
    ///
    /// Layout: `VSK1` header carrying `k`, then `n`, then `e_i, d_i` for
    /// each component in order.
    pub fn to_bytes(&self) -> Result<Vec<u8>, KeyError> {
        let codec = Codec::shared();
        let mut w = PacketWriter::new();
        wire::write_header(&mut w, config::TAG_SECRET_KEY, self.components.len() as u32)?;
        codec.encode(&mut w, &self.n)?;
        for c in &self.components {
            codec.encode(&mut w, &c.e)?;
            codec.encode(&mut w, &c.d)?;
        }
        Ok(w.into_bytes())
    }

    /// Parse a keypair serialized by [`to_bytes`](Self::to_bytes).
    ///
    /// Rejects bad headers, out-of-range counts and moduli, exponents
    /// outside `(2^CHALLENGE_BITS, n)`, non-prime public exponents, and
    /// trailing bytes. Malformed input never yields a partially valid key.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let codec = Codec::shared();
        let mut r = PacketReader::new(bytes);
        let k = wire::read_header(&mut r, config::TAG_SECRET_KEY)? as usize;
        check_component_count(k)?;
        let n = decode_modulus(codec, &mut r)?;
        let mut components = Vec::with_capacity(k);
        for _ in 0..k {
            let e = decode_public_exponent(codec, &mut r, &n)?;
            let d = codec.decode(&mut r)?;
            if !d.is_positive() || d >= n {
                return Err(KeyError::InvalidStructure);
            }
            components.push(KeyComponent { e, d });
        }
        r.finish()?;
        Ok(Self { n, components })
    }
}

impl fmt::Debug for IssuerKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IssuerKeypair(modulus_bits={}, components={})",
            self.n.bit_len(),
            self.components.len()
        )
    }
}

// ---------------------------------------------------------------------------
// IssuerPublicKey
// ---------------------------------------------------------------------------

impl IssuerPublicKey {
    /// The issuer modulus `n`.
    pub fn modulus(&self) -> &Bignum {
        &self.n
    }

    /// The public exponents, in component order.
    pub fn exponents(&self) -> &[Bignum] {
        &self.exponents
    }

    /// Number of parallel proof components.
    pub fn component_count(&self) -> usize {
        self.exponents.len()
    }

    /// Serialize the public key.
    ///
    /// Layout: `VPK1` header carrying `k`, then `n`, then each `e_i`.
    pub fn to_bytes(&self) -> Result<Vec<u8>, KeyError> {
        let codec = Codec::shared();
        let mut w = PacketWriter::new();
        wire::write_header(&mut w, config::TAG_PUBLIC_KEY, self.exponents.len() as u32)?;
        codec.encode(&mut w, &self.n)?;
        for e in &self.exponents {
            codec.encode(&mut w, e)?;
        }
        Ok(w.into_bytes())
    }

    /// Parse a public key serialized by [`to_bytes`](Self::to_bytes),
    /// with the same structural validation as the private-key import.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let codec = Codec::shared();
        let mut r = PacketReader::new(bytes);
        let k = wire::read_header(&mut r, config::TAG_PUBLIC_KEY)? as usize;
        check_component_count(k)?;
        let n = decode_modulus(codec, &mut r)?;
        let mut exponents = Vec::with_capacity(k);
        for _ in 0..k {
            exponents.push(decode_public_exponent(codec, &mut r, &n)?);
        }
        r.finish()?;
        Ok(Self { n, exponents })
    }
}

impl fmt::Debug for IssuerPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IssuerPublicKey(modulus_bits={}, components={})",
            self.n.bit_len(),
            self.exponents.len()
        )
    }
}

// ---------------------------------------------------------------------------
// Shared validation
// ---------------------------------------------------------------------------

fn check_component_count(k: usize) -> Result<(), KeyError> {
    if k == 0 || k > config::MAX_COMPONENTS {
        return Err(KeyError::ComponentCount {
            got: k,
            max: config::MAX_COMPONENTS,
        });
    }
    Ok(())
}

fn decode_modulus(codec: &Codec, r: &mut PacketReader<'_>) -> Result<Bignum, KeyError> {
    let n = codec.decode(r)?;
    let bits = n.bit_len();
    if bits < config::MIN_MODULUS_BITS || bits > config::MAX_MODULUS_BITS {
        return Err(KeyError::ModulusSize {
            bits,
            min: config::MIN_MODULUS_BITS,
            max: config::MAX_MODULUS_BITS,
        });
    }
    if !n.is_positive() || !n.is_odd() {
        return Err(KeyError::InvalidStructure);
    }
    Ok(n)
}

fn decode_public_exponent(
    codec: &Codec,
    r: &mut PacketReader<'_>,
    n: &Bignum,
) -> Result<Bignum, KeyError> {
    let e = codec.decode(r)?;
    let floor = Bignum::one().shift(config::CHALLENGE_BITS as i64);
    if e <= floor || e >= *n || !e.is_prime(16) {
        return Err(KeyError::InvalidStructure);
    }
    Ok(e)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_produces_consistent_key() {
        let kp = IssuerKeypair::generate(2).unwrap();
        assert_eq!(kp.component_count(), 2);
        assert_eq!(kp.modulus().bit_len(), config::MODULUS_BITS);
        assert!(kp.modulus().is_odd());

        // e * d must invert across the modulus: x^(e*d) == x (mod n)
        let x = Bignum::from_i64(0x1234_5678);
        for c in kp.components() {
            let signed = x.mod_pow(&c.d, kp.modulus());
            assert_eq!(signed.mod_pow(&c.e, kp.modulus()), x);
        }
    }

    #[test]
    fn exponents_are_distinct_primes_above_challenge_range() {
        let kp = IssuerKeypair::generate(3).unwrap();
        let floor = Bignum::one().shift(config::CHALLENGE_BITS as i64);
        let pk = kp.public_key();
        for (i, e) in pk.exponents().iter().enumerate() {
            assert!(*e > floor);
            assert!(e.is_prime(25));
            for later in &pk.exponents()[i + 1..] {
                assert_ne!(e, later);
            }
        }
    }

    #[test]
    fn component_count_bounds_enforced() {
        assert!(matches!(
            IssuerKeypair::generate(0),
            Err(KeyError::ComponentCount { .. })
        ));
        assert!(matches!(
            IssuerKeypair::generate(config::MAX_COMPONENTS + 1),
            Err(KeyError::ComponentCount { .. })
        ));
    }

    #[test]
    fn keypair_round_trip() {
        let kp = IssuerKeypair::generate(2).unwrap();
        let bytes = kp.to_bytes().unwrap();
        let restored = IssuerKeypair::from_bytes(&bytes).unwrap();
        assert_eq!(kp, restored);
    }

    #[test]
    fn public_key_round_trip() {
        let pk = IssuerKeypair::generate(2).unwrap().public_key();
        let bytes = pk.to_bytes().unwrap();
        let restored = IssuerPublicKey::from_bytes(&bytes).unwrap();
        assert_eq!(pk, restored);
    }

    #[test]
    fn public_and_private_encodings_are_not_interchangeable() {
        let kp = IssuerKeypair::generate(1).unwrap();
        let private_bytes = kp.to_bytes().unwrap();
        let public_bytes = kp.public_key().to_bytes().unwrap();
        assert!(IssuerPublicKey::from_bytes(&private_bytes).is_err());
        assert!(IssuerKeypair::from_bytes(&public_bytes).is_err());
    }

    #[test]
    fn truncated_key_rejected() {
        let kp = IssuerKeypair::generate(1).unwrap();
        let bytes = kp.to_bytes().unwrap();
        for cut in [0, 5, bytes.len() / 2, bytes.len() - 1] {
            assert!(
                IssuerKeypair::from_bytes(&bytes[..cut]).is_err(),
                "prefix of {cut} bytes must not parse"
            );
        }
    }

    #[test]
    fn trailing_garbage_rejected() {
        let kp = IssuerKeypair::generate(1).unwrap();
        let mut bytes = kp.to_bytes().unwrap();
        bytes.push(0);
        assert!(matches!(
            IssuerKeypair::from_bytes(&bytes),
            Err(KeyError::Wire(WireError::TrailingBytes(1)))
        ));
    }

    #[test]
    fn undersized_modulus_rejected() {
        // hand-roll an encoding with a tiny modulus
        let codec = Codec::shared();
        let mut w = PacketWriter::new();
        wire::write_header(&mut w, config::TAG_PUBLIC_KEY, 1).unwrap();
        codec.encode(&mut w, &Bignum::from_i64(15)).unwrap();
        codec.encode(&mut w, &Bignum::from_i64(1_048_583)).unwrap();
        assert!(matches!(
            IssuerPublicKey::from_bytes(&w.into_bytes()),
            Err(KeyError::ModulusSize { .. })
        ));
    }

    #[test]
    fn debug_does_not_leak_private_exponents() {
        let kp = IssuerKeypair::generate(1).unwrap();
        let s = format!("{kp:?}");
        assert!(s.contains("modulus_bits"));
        assert!(!s.contains(&kp.components()[0].d.to_decimal()));
    }

    #[test]
    fn two_generated_keys_differ() {
        let a = IssuerKeypair::generate(1).unwrap();
        let b = IssuerKeypair::generate(1).unwrap();
        assert_ne!(
            a.modulus(),
            b.modulus(),
            "identical moduli from two generations means the RNG is broken"
        );
    }
}
