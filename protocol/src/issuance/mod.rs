//! # Blind Issuance
//!
//! The flow that mints a private identity without the issuer ever seeing
//! it. Chaum's trick, applied per key component:
//!
//! ```text
//! client                                  issuer
//! ------                                  ------
//! pick secret m, blindings b_i
//! send   m * b_i^{e_i} mod n   ────────▶  raise to d_i:
//!                                         (m * b_i^{e_i})^{d_i}
//!                              ◀────────    = m^{d_i} * b_i mod n
//! multiply by b_i^{-1}:
//!   s_i = m^{d_i} mod n
//! check  s_i^{e_i} == m  for every i
//! ```
//!
//! Every blinded value the issuer sees is uniformly distributed and
//! statistically independent of `m` — the issuer signs, but learns
//! nothing. The final self-check is the client's tamper guarantee: if the
//! issuer (or the wire) mangled any component, `finish` fails with a
//! single undifferentiated verification error and the session dies.
//!
//! State machine, client side: `start` → `build_request` → (network) →
//! `finish`. The issuer side is the stateless [`answer`]. Blinding
//! material lives only inside the [`IssuanceSession`] and is overwritten
//! when the session ends, successfully or not.

use std::mem;

use thiserror::Error;
use tracing::{debug, info};

use crate::bignum::Bignum;
use crate::identity::PrivateIdentity;
use crate::keys::{IssuerKeypair, IssuerPublicKey};
use crate::rng::EntropyError;
use crate::wire::codec::{Codec, CodecError};
use crate::wire::{PacketReader, PacketWriter, WireError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from the blind issuance flow.
#[derive(Debug, Error)]
pub enum IssuanceError {
    /// A session method was called in the wrong order.
    #[error("issuance step called out of order in state {state}")]
    InvalidState {
        /// Name of the state the session was actually in.
        state: &'static str,
    },

    /// The blinded request failed parsing or range validation.
    #[error("blinded request is malformed or out of range")]
    MalformedRequest,

    /// The issuer's answer failed parsing or range validation.
    #[error("issuer answer is malformed or out of range")]
    MalformedAnswer,

    /// The unblinded result did not verify against the issuer public key.
    /// Deliberately silent about which component failed.
    #[error("issuance verification failed")]
    VerificationFailed,

    /// The OS entropy source is unusable.
    #[error(transparent)]
    Entropy(#[from] EntropyError),

    /// A bignum failed to encode or decode.
    #[error("malformed issuance encoding: {0}")]
    Codec(#[from] CodecError),

    /// The packet framing is broken.
    #[error("malformed issuance framing: {0}")]
    Wire(#[from] WireError),
}

// ---------------------------------------------------------------------------
// Client Session
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq, Eq)]
enum Stage {
    Started,
    RequestBuilt,
}

impl Stage {
    fn name(self) -> &'static str {
        match self {
            Stage::Started => "Started",
            Stage::RequestBuilt => "RequestBuilt",
        }
    }
}

/// Client-side issuance state: the chosen identity value and the blinding
/// factors, alive only between `start` and `finish`.
///
/// Secrets are overwritten on drop, whether the handshake finished or was
/// abandoned halfway.
pub struct IssuanceSession {
    issuer: IssuerPublicKey,
    value: Bignum,
    blindings: Vec<Bignum>,
    stage: Stage,
}

impl IssuanceSession {
    /// Begin an issuance handshake: sample the secret identity value and
    /// one blinding factor per key component.
    ///
    /// Purely local; the only failure mode is a broken entropy source.
    pub fn start(issuer: &IssuerPublicKey) -> Result<Self, IssuanceError> {
        let n = issuer.modulus();
        let value = Bignum::rand_unit(n)?;
        let blindings = (0..issuer.component_count())
            .map(|_| Bignum::rand_unit(n))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            issuer: issuer.clone(),
            value,
            blindings,
            stage: Stage::Started,
        })
    }

    /// Produce the blinded request to send to the issuer: one value
    /// `m * b_i^{e_i} mod n` per component.
    pub fn build_request(&mut self) -> Result<Vec<u8>, IssuanceError> {
        if self.stage != Stage::Started {
            return Err(IssuanceError::InvalidState {
                state: self.stage.name(),
            });
        }
        let codec = Codec::shared();
        let n = self.issuer.modulus();
        let mut w = PacketWriter::new();
        for (b, e) in self.blindings.iter().zip(self.issuer.exponents()) {
            let blinded = self.value.mod_mul(&b.mod_pow(e, n), n);
            codec.encode(&mut w, &blinded)?;
        }
        self.stage = Stage::RequestBuilt;
        Ok(w.into_bytes())
    }

    /// Consume the issuer's answer, strip the blinding, and self-check the
    /// result against the issuer's public key.
    ///
    /// Succeeds only if **every** component verifies; the error for a
    /// failed check does not say which component was at fault. The session
    /// is consumed either way.
    pub fn finish(mut self, answer: &[u8]) -> Result<PrivateIdentity, IssuanceError> {
        if self.stage != Stage::RequestBuilt {
            return Err(IssuanceError::InvalidState {
                state: self.stage.name(),
            });
        }
        let codec = Codec::shared();
        let n = self.issuer.modulus();
        let mut r = PacketReader::new(answer);

        let mut raw = Vec::with_capacity(self.blindings.len());
        for _ in 0..self.blindings.len() {
            let v = codec.decode(&mut r)?;
            if !v.is_positive() || v >= *n {
                return Err(IssuanceError::MalformedAnswer);
            }
            raw.push(v);
        }
        r.finish()?;

        let mut signatures = Vec::with_capacity(raw.len());
        for (v, b) in raw.iter().zip(&self.blindings) {
            let b_inv = b.mod_inv(n).expect("blinding factor sampled coprime to n");
            signatures.push(v.mod_mul(&b_inv, n));
        }

        // check every component before deciding anything
        let mut ok = true;
        for (s, e) in signatures.iter().zip(self.issuer.exponents()) {
            ok &= s.mod_pow(e, n) == self.value;
        }
        if !ok {
            return Err(IssuanceError::VerificationFailed);
        }

        let value = mem::replace(&mut self.value, Bignum::zero());
        info!(components = signatures.len(), "private identity issued");
        Ok(PrivateIdentity::new(value, signatures))
    }
}

impl Drop for IssuanceSession {
    fn drop(&mut self) {
        self.value = Bignum::zero();
        for b in &mut self.blindings {
            *b = Bignum::zero();
        }
    }
}

// ---------------------------------------------------------------------------
// Issuer Side
// ---------------------------------------------------------------------------

/// Sign a blinded request. Stateless: the issuer keeps no session, it just
/// raises each value to the matching private exponent.
///
/// Rejects requests whose component count does not match the key or whose
/// values fall outside `[1, n)`.
pub fn answer(keypair: &IssuerKeypair, request: &[u8]) -> Result<Vec<u8>, IssuanceError> {
    let codec = Codec::shared();
    let n = keypair.modulus();
    let mut r = PacketReader::new(request);
    let mut w = PacketWriter::new();
    for component in keypair.components() {
        let blinded = codec.decode(&mut r).map_err(|_| IssuanceError::MalformedRequest)?;
        if !blinded.is_positive() || blinded >= *n {
            return Err(IssuanceError::MalformedRequest);
        }
        codec.encode(&mut w, &blinded.mod_pow(&component.d, n))?;
    }
    r.finish().map_err(|_| IssuanceError::MalformedRequest)?;
    debug!(components = keypair.component_count(), "blinded request answered");
    Ok(w.into_bytes())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
