//! # Challenge-Response Authentication
//!
//! A prover holding a [`PrivateIdentity`] convinces a verifier holding the
//! matching [`PublicIdentity`] (plus the issuer's public key) that it
//! knows the identity — without revealing it, and with an application
//! message cryptographically bound into the exchange so the proof cannot
//! be replayed for a different message.
//!
//! The proof is Guillou–Quisquater identification, run over all `k` key
//! components in parallel. Per component `i`:
//!
//! ```text
//! prover                                   verifier
//! ------                                   --------
//! pick nonce r_i, send T_i = r_i^{e_i}  ─▶ pick random seed ρ
//!                                     ◀─── send ρ
//! c_i = H(ρ, i, T_i, msg) truncated
//! send t_i = r_i * s_i^{c_i}          ──▶  recompute c_i, check
//!                                          t_i^{e_i} == T_i * m^{c_i}
//! ```
//!
//! Deriving the challenge from a hash over the seed, the commitment, *and*
//! the message is what binds the message: change a byte of it in flight
//! and the two sides compute different challenges, so verification fails.
//! A cheating prover passes one component with probability
//! `2^-CHALLENGE_BITS`, and all `k` with the product of those.
//!
//! ## Wire flow
//!
//! One-way proof, A proving to B:
//!
//! 1. A: [`Prover::start`]`(true, msg)` → start packet
//! 2. B: [`Verifier::challenge`]`(true, ..)` → challenge packet
//! 3. A: [`Prover::respond`] → response packet
//! 4. B: [`Verifier::verify`] → recovers `msg`, reaches `Verified`
//!
//! Mutual authentication piggybacks the reverse proof onto the same round
//! trips: B appends its own `start(false, ..)` packet to its challenge, A
//! appends its `challenge(false, ..)` to its response, and B's final
//! response rides alone. Four messages instead of six; the `is_first`
//! flag is embedded in the start packet and checked by `challenge`, so
//! the two interleaved proofs cannot be cross-wired.
//!
//! ## Failure behavior
//!
//! Malformed input (bad framing, out-of-range values, flag mismatch)
//! leaves the session state untouched — reject the message, keep the
//! session. A failed *cryptographic* check is terminal: the verifier
//! moves to `Rejected` and reports one undifferentiated
//! [`AuthError::VerificationFailed`], with every component checked before
//! the verdict is combined so the error does not reveal which check broke.

use std::mem;

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};
use zeroize::Zeroize;

use crate::bignum::Bignum;
use crate::config;
use crate::identity::{PrivateIdentity, PublicIdentity};
use crate::keys::IssuerPublicKey;
use crate::rng::{self, EntropyError};
use crate::wire::codec::{Codec, CodecError};
use crate::wire::{PacketReader, PacketWriter, WireError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from the authentication handshake.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A session method was called in the wrong order.
    #[error("authentication step called out of order in state {state}")]
    InvalidState {
        /// Name of the state the session was actually in.
        state: &'static str,
    },

    /// The identity and the issuer key disagree on the component count.
    #[error("identity has {got} proof components but the issuer key has {want}")]
    ComponentMismatch {
        /// Components in the identity.
        got: usize,
        /// Components in the issuer key.
        want: usize,
    },

    /// The application message exceeds the configured limit.
    #[error("message of {len} bytes exceeds the {max}-byte limit")]
    MessageTooLong {
        /// Offered message length.
        len: usize,
        /// The limit.
        max: usize,
    },

    /// The peer's packet is structurally broken: bad flag, bad lengths,
    /// values outside `[1, n)`. Recoverable — session state is unchanged.
    #[error("peer message is malformed or out of range")]
    Malformed,

    /// The proof did not check out. Terminal for this session.
    #[error("authentication failed")]
    VerificationFailed,

    /// The OS entropy source is unusable.
    #[error(transparent)]
    Entropy(#[from] EntropyError),

    /// A bignum failed to encode or decode.
    #[error("malformed authentication encoding: {0}")]
    Codec(#[from] CodecError),

    /// The packet framing is broken.
    #[error("malformed authentication framing: {0}")]
    Wire(#[from] WireError),
}

// ---------------------------------------------------------------------------
// Challenge derivation
// ---------------------------------------------------------------------------

const ROLE_LEADER: u8 = 1;
const ROLE_FOLLOWER: u8 = 0;

/// Per-component challenge: the low [`config::CHALLENGE_BITS`] bits of
/// `SHA-256(seed ‖ i ‖ T_i ‖ message)`. Both sides compute this from
/// their own copy of the transcript, which is exactly what binds the
/// commitment and the message to the proof.
fn derive_challenges(seed: &[u8], commitments: &[Bignum], message: &[u8]) -> Vec<Bignum> {
    let mask = (1u32 << config::CHALLENGE_BITS) - 1;
    commitments
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let mag = t.magnitude_bytes();
            let mut h = Sha256::new();
            h.update(seed);
            h.update((i as u32).to_be_bytes());
            h.update((mag.len() as u32).to_be_bytes());
            h.update(&mag);
            h.update((message.len() as u32).to_be_bytes());
            h.update(message);
            let digest = h.finalize();
            let word = u32::from_be_bytes(digest[..4].try_into().expect("4 bytes"));
            Bignum::from(word & mask)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Prover
// ---------------------------------------------------------------------------

enum ProverState {
    Idle,
    Started {
        nonces: Vec<Bignum>,
        commitments: Vec<Bignum>,
        message: Vec<u8>,
        /// Which half of a mutual exchange this proof is.
        #[allow(dead_code)]
        leader: bool,
    },
    Responded,
}

impl ProverState {
    fn name(&self) -> &'static str {
        match self {
            ProverState::Idle => "Idle",
            ProverState::Started { .. } => "Started",
            ProverState::Responded => "Responded",
        }
    }
}

impl Drop for ProverState {
    fn drop(&mut self) {
        if let ProverState::Started {
            nonces, message, ..
        } = self
        {
            for r in nonces.iter_mut() {
                *r = Bignum::zero();
            }
            message.zeroize();
        }
    }
}

/// The proving side of a handshake: holds the private identity and the
/// per-session nonces.
pub struct Prover {
    issuer: IssuerPublicKey,
    identity: PrivateIdentity,
    state: ProverState,
}

impl Prover {
    /// Create an idle prover. Fails if the identity was not issued under
    /// a key with the same component count.
    pub fn new(issuer: IssuerPublicKey, identity: PrivateIdentity) -> Result<Self, AuthError> {
        if identity.component_count() != issuer.component_count() {
            return Err(AuthError::ComponentMismatch {
                got: identity.component_count(),
                want: issuer.component_count(),
            });
        }
        Ok(Self {
            issuer,
            identity,
            state: ProverState::Idle,
        })
    }

    /// Begin a proof: sample fresh nonces, commit, and emit the start
    /// packet carrying the leader flag, the application message, and the
    /// commitments.
    ///
    /// `is_first` marks this proof as the leading half of the exchange;
    /// pass `false` for the piggybacked reverse proof of a mutual flow.
    pub fn start(&mut self, is_first: bool, message: &[u8]) -> Result<Vec<u8>, AuthError> {
        if !matches!(self.state, ProverState::Idle) {
            return Err(AuthError::InvalidState {
                state: self.state.name(),
            });
        }
        if message.len() > config::MAX_MESSAGE_LEN {
            return Err(AuthError::MessageTooLong {
                len: message.len(),
                max: config::MAX_MESSAGE_LEN,
            });
        }

        let n = self.issuer.modulus();
        let k = self.issuer.component_count();
        let mut nonces = Vec::with_capacity(k);
        let mut commitments = Vec::with_capacity(k);
        for e in self.issuer.exponents() {
            let r = Bignum::rand_unit(n)?;
            commitments.push(r.mod_pow(e, n));
            nonces.push(r);
        }

        let codec = Codec::shared();
        let mut w = PacketWriter::new();
        let role = if is_first { ROLE_LEADER } else { ROLE_FOLLOWER };
        w.write_packet(&[role])?;
        w.write_packet(message)?;
        for t in &commitments {
            codec.encode(&mut w, t)?;
        }

        self.state = ProverState::Started {
            nonces,
            commitments,
            message: message.to_vec(),
            leader: is_first,
        };
        debug!(components = k, leader = is_first, "proof started");
        Ok(w.into_bytes())
    }

    /// Answer the verifier's challenge: `t_i = r_i * s_i^{c_i} mod n`.
    ///
    /// A malformed challenge leaves the session in `Started`; a
    /// well-formed one consumes the nonces and moves to `Responded`.
    pub fn respond(&mut self, challenge: &[u8]) -> Result<Vec<u8>, AuthError> {
        let ProverState::Started {
            nonces,
            commitments,
            message,
            ..
        } = &self.state
        else {
            return Err(AuthError::InvalidState {
                state: self.state.name(),
            });
        };

        let mut r = PacketReader::new(challenge);
        let seed = r.read_packet()?;
        if seed.len() != config::CHALLENGE_SEED_LEN {
            return Err(AuthError::Malformed);
        }
        r.finish()?;

        let n = self.issuer.modulus();
        let challenges = derive_challenges(seed, commitments, message);

        let codec = Codec::shared();
        let mut w = PacketWriter::new();
        for ((r_i, s_i), c_i) in nonces
            .iter()
            .zip(self.identity.signatures())
            .zip(&challenges)
        {
            let t = r_i.mod_mul(&s_i.mod_pow(c_i, n), n);
            codec.encode(&mut w, &t)?;
        }

        // dropping the old state scrubs the nonces
        self.state = ProverState::Responded;
        Ok(w.into_bytes())
    }
}

// ---------------------------------------------------------------------------
// Verifier
// ---------------------------------------------------------------------------

enum VerifierState {
    Idle,
    ChallengeSent {
        commitments: Vec<Bignum>,
        challenges: Vec<Bignum>,
        message: Vec<u8>,
    },
    Verified,
    Rejected,
}

impl VerifierState {
    fn name(&self) -> &'static str {
        match self {
            VerifierState::Idle => "Idle",
            VerifierState::ChallengeSent { .. } => "ChallengeExchanged",
            VerifierState::Verified => "Verified",
            VerifierState::Rejected => "Rejected",
        }
    }
}

/// The verifying side of a handshake: holds the public identity, the
/// peer's commitments, and the challenges it issued.
pub struct Verifier {
    issuer: IssuerPublicKey,
    identity: PublicIdentity,
    state: VerifierState,
}

impl Verifier {
    /// Create an idle verifier for the given certificate.
    pub fn new(issuer: IssuerPublicKey, identity: PublicIdentity) -> Self {
        Self {
            issuer,
            identity,
            state: VerifierState::Idle,
        }
    }

    /// Consume the peer's start packet and emit a fresh challenge.
    ///
    /// `is_first` must match the flag the peer passed to
    /// [`Prover::start`]; a mismatch means the two interleaved proofs of
    /// a mutual flow got cross-wired and the packet is rejected.
    pub fn challenge(&mut self, is_first: bool, inbound: &[u8]) -> Result<Vec<u8>, AuthError> {
        if !matches!(self.state, VerifierState::Idle) {
            return Err(AuthError::InvalidState {
                state: self.state.name(),
            });
        }

        let codec = Codec::shared();
        let n = self.issuer.modulus();
        let k = self.issuer.component_count();

        let mut r = PacketReader::new(inbound);
        let role = r.read_packet()?;
        let expected = if is_first { ROLE_LEADER } else { ROLE_FOLLOWER };
        if role.len() != 1 || role[0] != expected {
            return Err(AuthError::Malformed);
        }
        let message = r.read_packet()?;
        if message.len() > config::MAX_MESSAGE_LEN {
            return Err(AuthError::Malformed);
        }
        let mut commitments = Vec::with_capacity(k);
        for _ in 0..k {
            let t = codec.decode(&mut r)?;
            if !t.is_positive() || t >= *n {
                return Err(AuthError::Malformed);
            }
            commitments.push(t);
        }
        r.finish()?;

        rng::ensure()?;
        let mut seed = [0u8; config::CHALLENGE_SEED_LEN];
        OsRng
            .try_fill_bytes(&mut seed)
            .map_err(|e| EntropyError(e.to_string()))?;

        let challenges = derive_challenges(&seed, &commitments, message);
        debug!(seed = %hex::encode(seed), components = k, "challenge issued");

        let mut w = PacketWriter::new();
        w.write_packet(&seed)?;

        self.state = VerifierState::ChallengeSent {
            commitments,
            challenges,
            message: message.to_vec(),
        };
        Ok(w.into_bytes())
    }

    /// Check the peer's response and, on success, release the application
    /// message that was bound into the exchange.
    ///
    /// Framing and range problems are recoverable ([`AuthError::Malformed`],
    /// state unchanged). A failed proof moves the session to `Rejected`
    /// permanently; every component is evaluated before the combined
    /// verdict so the failure reveals nothing about which check broke.
    pub fn verify(&mut self, response: &[u8]) -> Result<Vec<u8>, AuthError> {
        let VerifierState::ChallengeSent {
            commitments,
            challenges,
            ..
        } = &self.state
        else {
            return Err(AuthError::InvalidState {
                state: self.state.name(),
            });
        };

        let codec = Codec::shared();
        let n = self.issuer.modulus();
        let k = self.issuer.component_count();

        let mut r = PacketReader::new(response);
        let mut answers = Vec::with_capacity(k);
        for _ in 0..k {
            let t = codec.decode(&mut r)?;
            if !t.is_positive() || t >= *n {
                return Err(AuthError::Malformed);
            }
            answers.push(t);
        }
        r.finish()?;

        let m = self.identity.value();
        let mut ok = true;
        for (((t, e), big_t), c) in answers
            .iter()
            .zip(self.issuer.exponents())
            .zip(commitments)
            .zip(challenges)
        {
            let lhs = t.mod_pow(e, n);
            let rhs = big_t.mod_mul(&m.mod_pow(c, n), n);
            ok &= lhs == rhs;
        }

        if ok {
            let old = mem::replace(&mut self.state, VerifierState::Verified);
            let VerifierState::ChallengeSent { message, .. } = old else {
                unreachable!("state checked above");
            };
            info!(
                identity = %self.identity.fingerprint(),
                "authentication verified"
            );
            Ok(message)
        } else {
            self.state = VerifierState::Rejected;
            warn!(
                identity = %self.identity.fingerprint(),
                "authentication rejected"
            );
            Err(AuthError::VerificationFailed)
        }
    }

    /// `true` once a proof has been accepted.
    pub fn is_verified(&self) -> bool {
        matches!(self.state, VerifierState::Verified)
    }

    /// `true` once a proof has been rejected.
    pub fn is_rejected(&self) -> bool {
        matches!(self.state, VerifierState::Rejected)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
