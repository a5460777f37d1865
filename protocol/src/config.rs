//! # Protocol Configuration & Constants
//!
//! Every magic number in VEIL lives here. If you're hardcoding a constant
//! somewhere else, you're doing it wrong and you owe the team coffee.
//!
//! Most of these are security parameters. Changing them changes what an
//! attacker has to break, so treat every edit like the key ceremony it is.

// ---------------------------------------------------------------------------
// Key Material
// ---------------------------------------------------------------------------

/// Bit length of each secret prime factor of the issuer modulus.
pub const PRIME_BITS: u64 = 512;

/// Bit length of the issuer modulus `n = p * q`. Always `2 * PRIME_BITS`.
pub const MODULUS_BITS: u64 = 2 * PRIME_BITS;

/// Smallest modulus we accept when importing key material. Anything below
/// this is either corrupted or an attempt to feed us a toy modulus whose
/// factorization is a lunch-break exercise.
pub const MIN_MODULUS_BITS: u64 = 512;

/// Largest modulus we accept when importing key material. Bounds the
/// arithmetic cost an imported key can impose on us.
pub const MAX_MODULUS_BITS: u64 = 16_384;

/// Default number of parallel proof components (`k`).
///
/// Each component contributes `CHALLENGE_BITS` bits of soundness, so the
/// default puts the impersonation probability at 2^-80 per handshake.
pub const DEFAULT_COMPONENTS: usize = 4;

/// Upper bound on `k`. Keeps hostile key blobs from demanding absurd
/// amounts of arithmetic per handshake.
pub const MAX_COMPONENTS: usize = 32;

/// Miller-Rabin rounds used when certifying freshly generated primes.
/// 32 rounds puts the error probability below 2^-64, which is well past
/// the point where cosmic rays are the bigger worry.
pub const MILLER_RABIN_ROUNDS: u32 = 32;

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

/// Bit width of a single proof challenge. Public exponents are chosen
/// strictly above `2^CHALLENGE_BITS` so every challenge is smaller than
/// every exponent, which is what the soundness argument needs.
pub const CHALLENGE_BITS: u32 = 20;

/// Byte length of the challenge seed a verifier sends to a prover.
pub const CHALLENGE_SEED_LEN: usize = 32;

/// Maximum length of the application message bound into a handshake.
pub const MAX_MESSAGE_LEN: usize = 4096;

// ---------------------------------------------------------------------------
// Wire Format
// ---------------------------------------------------------------------------

/// Maximum payload of a single framed packet. The length prefix is a u16,
/// so this is as large as the framing can express.
pub const MAX_PACKET_LEN: usize = 65_535;

/// Default upper bound on the magnitude byte count of an encoded bignum.
/// One byte of every encoded value is the tag; the magnitude may fill the
/// rest of the packet.
pub const MAX_MAGNITUDE_BYTES: usize = MAX_PACKET_LEN - 1;

/// Format tag for serialized issuer secret keys.
pub const TAG_SECRET_KEY: &[u8; 4] = b"VSK1";

/// Format tag for serialized issuer public keys.
pub const TAG_PUBLIC_KEY: &[u8; 4] = b"VPK1";

/// Format tag for serialized private identities.
pub const TAG_PRIVATE_ID: &[u8; 4] = b"VSI1";

/// Format tag for serialized public identities.
pub const TAG_PUBLIC_ID: &[u8; 4] = b"VPI1";

// ---------------------------------------------------------------------------
// Fingerprints
// ---------------------------------------------------------------------------

/// Length in characters of a public-identity fingerprint: a 32-byte BLAKE3
/// digest rendered as unpadded URL-safe base64.
pub const FINGERPRINT_LEN: usize = 43;
