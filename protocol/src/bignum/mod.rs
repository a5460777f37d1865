//! # Arbitrary-Precision Signed Integers
//!
//! [`Bignum`] is the number type every protocol computation in VEIL runs
//! on: issuer moduli, identity values, blinding factors, commitments,
//! responses. It wraps the `num-bigint` backend and exposes exactly the
//! operation set the protocol needs — no more. If you want a general
//! purpose bignum library, `num-bigint` is right there; this module is the
//! seam that lets us swap it out without touching a line of protocol code.
//!
//! ## Conventions
//!
//! - Every operation returns an owned result. There is no out-parameter or
//!   "maybe reuse this allocation" convention; if you need to overwrite a
//!   value, assign to it.
//! - Zero is canonical: there is no negative zero, ever. The backend
//!   guarantees this and the wire codec preserves it.
//! - Division is **floor** division, consistently: the quotient rounds
//!   toward negative infinity and the paired remainder takes the divisor's
//!   sign, so `a == q*b + r` always holds. The standalone reduction
//!   [`Bignum::rem_euclid`] is always non-negative, which is the form the
//!   modular operations build on.
//! - The modular operations (`mod_add`, `mod_sub`, `mod_mul`, `mod_pow`,
//!   `mod_inv`) require a positive modulus and panic otherwise. A
//!   non-positive modulus can only come from a caller bug — key imports
//!   validate modulus ranges before any arithmetic sees them.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use num_bigint::{BigInt, BigUint, RandBigInt, Sign};
use num_integer::Integer;
use num_traits::{One, Signed, Zero};
use rand::rngs::OsRng;
use thiserror::Error;

use crate::rng::{self, EntropyError};

pub(crate) mod prime;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from bignum operations that can fail on well-formed inputs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BignumError {
    /// Division or reduction by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// No modular inverse exists (the value shares a factor with the modulus).
    #[error("value is not invertible modulo the given modulus")]
    NotInvertible,

    /// A fixed-width export was asked to fit a value into too few bytes.
    #[error("value needs {needed} bytes, export width is only {width}")]
    WidthExceeded {
        /// Bytes required by the value's magnitude.
        needed: usize,
        /// Width the caller asked for.
        width: usize,
    },
}

// ---------------------------------------------------------------------------
// Bignum
// ---------------------------------------------------------------------------

/// An owned, signed, arbitrary-precision integer.
///
/// Cheap to move, not cheap to clone (cloning copies the digit buffer).
/// Comparison, equality, and hashing follow numeric value.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bignum(BigInt);

impl Bignum {
    /// The canonical zero.
    pub fn zero() -> Self {
        Bignum(BigInt::zero())
    }

    /// The value one.
    pub fn one() -> Self {
        Bignum(BigInt::one())
    }

    /// Construct from a machine integer.
    pub fn from_i64(n: i64) -> Self {
        Bignum(BigInt::from(n))
    }

    pub(crate) fn from_bigint(z: BigInt) -> Self {
        Bignum(z)
    }

    pub(crate) fn from_biguint(z: BigUint) -> Self {
        Bignum(BigInt::from(z))
    }

    pub(crate) fn as_bigint(&self) -> &BigInt {
        &self.0
    }

    /// `true` iff the value is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// `true` iff the value is strictly negative.
    pub fn is_negative(&self) -> bool {
        self.0.sign() == Sign::Minus
    }

    /// `true` iff the value is strictly positive.
    pub fn is_positive(&self) -> bool {
        self.0.sign() == Sign::Plus
    }

    /// `true` iff the value is odd.
    pub fn is_odd(&self) -> bool {
        self.0.is_odd()
    }

    /// Number of bits in the magnitude. Zero has bit length 0.
    pub fn bit_len(&self) -> u64 {
        self.0.bits()
    }

    /// Number of bytes needed to hold the magnitude. Zero needs 0 bytes.
    pub fn byte_len(&self) -> usize {
        self.0.bits().div_ceil(8) as usize
    }

    /// Absolute value.
    pub fn abs(&self) -> Bignum {
        Bignum(self.0.abs())
    }

    /// Shift left by `bits`; a negative count shifts right instead.
    /// Right shifts floor (shifting a negative value right rounds toward
    /// negative infinity), matching the division policy.
    pub fn shift(&self, bits: i64) -> Bignum {
        let n = bits.unsigned_abs() as usize;
        match bits.cmp(&0) {
            Ordering::Equal => self.clone(),
            Ordering::Greater => Bignum(&self.0 << n),
            Ordering::Less => Bignum(&self.0 >> n),
        }
    }

    // -- division -----------------------------------------------------------

    /// Floor quotient and remainder in one step: `a == q*b + r`, with `r`
    /// taking the sign of `b`.
    pub fn div_rem_floor(&self, b: &Bignum) -> Result<(Bignum, Bignum), BignumError> {
        if b.is_zero() {
            return Err(BignumError::DivisionByZero);
        }
        let (q, r) = self.0.div_mod_floor(&b.0);
        Ok((Bignum(q), Bignum(r)))
    }

    /// Floor quotient only.
    pub fn div_floor(&self, b: &Bignum) -> Result<Bignum, BignumError> {
        if b.is_zero() {
            return Err(BignumError::DivisionByZero);
        }
        Ok(Bignum(self.0.div_floor(&b.0)))
    }

    /// Non-negative reduction: the unique `r` in `[0, |m|)` congruent to
    /// `self` modulo `m`.
    pub fn rem_euclid(&self, m: &Bignum) -> Result<Bignum, BignumError> {
        if m.is_zero() {
            return Err(BignumError::DivisionByZero);
        }
        Ok(Bignum(self.0.mod_floor(&m.0.abs())))
    }

    // -- modular arithmetic -------------------------------------------------

    /// `(self + b) mod m`, result in `[0, m)`.
    ///
    /// # Panics
    ///
    /// Panics if `m` is not positive.
    pub fn mod_add(&self, b: &Bignum, m: &Bignum) -> Bignum {
        assert!(m.is_positive(), "modulus must be positive");
        Bignum((&self.0 + &b.0).mod_floor(&m.0))
    }

    /// `(self - b) mod m`, result in `[0, m)`.
    ///
    /// # Panics
    ///
    /// Panics if `m` is not positive.
    pub fn mod_sub(&self, b: &Bignum, m: &Bignum) -> Bignum {
        assert!(m.is_positive(), "modulus must be positive");
        Bignum((&self.0 - &b.0).mod_floor(&m.0))
    }

    /// `(self * b) mod m`, result in `[0, m)`.
    ///
    /// # Panics
    ///
    /// Panics if `m` is not positive.
    pub fn mod_mul(&self, b: &Bignum, m: &Bignum) -> Bignum {
        assert!(m.is_positive(), "modulus must be positive");
        Bignum((&self.0 * &b.0).mod_floor(&m.0))
    }

    /// `self^exp mod m`, result in `[0, m)`. `mod_pow(a, 0, m) == 1 mod m`.
    ///
    /// # Panics
    ///
    /// Panics if `m` is not positive or `exp` is negative.
    pub fn mod_pow(&self, exp: &Bignum, m: &Bignum) -> Bignum {
        assert!(m.is_positive(), "modulus must be positive");
        assert!(!exp.is_negative(), "exponent must be non-negative");
        let base = self.0.mod_floor(&m.0);
        // the trailing reduction covers backend corner cases (m == 1)
        // where modpow may return an unreduced 1
        Bignum(base.modpow(&exp.0, &m.0).mod_floor(&m.0))
    }

    /// Modular inverse: the `x` in `[0, m)` with `self * x ≡ 1 (mod m)`.
    ///
    /// Fails with [`BignumError::NotInvertible`] when `gcd(self, m) != 1`.
    ///
    /// # Panics
    ///
    /// Panics if `m` is not positive.
    pub fn mod_inv(&self, m: &Bignum) -> Result<Bignum, BignumError> {
        assert!(m.is_positive(), "modulus must be positive");
        let a = self.0.mod_floor(&m.0);
        let ext = a.extended_gcd(&m.0);
        if !ext.gcd.is_one() {
            return Err(BignumError::NotInvertible);
        }
        Ok(Bignum(ext.x.mod_floor(&m.0)))
    }

    // -- number theory ------------------------------------------------------

    /// Greatest common divisor. Always non-negative; `gcd(0, 0) == 0`.
    pub fn gcd(&self, b: &Bignum) -> Bignum {
        Bignum(self.0.gcd(&b.0))
    }

    /// Extended (signed) GCD. Intentionally not implemented: nothing in the
    /// protocol needs the Bézout coefficients, and we refuse to carry
    /// untested number theory.
    ///
    /// # Panics
    ///
    /// Always.
    pub fn gcd_ext(&self, _b: &Bignum) -> (Bignum, Bignum, Bignum) {
        unimplemented!("extended gcd is not part of the supported surface")
    }

    /// Probabilistic primality test.
    ///
    /// `certainty <= 0` selects the fast pre-filter: trial division by
    /// small primes plus a single Miller-Rabin round. `certainty > 0` runs
    /// the pre-filter plus that many Miller-Rabin rounds, for an error
    /// probability of at most `4^-certainty`. Negative numbers, zero, and
    /// one are never prime.
    pub fn is_prime(&self, certainty: i32) -> bool {
        prime::is_prime(self, certainty)
    }

    // -- randomness ---------------------------------------------------------

    /// Uniform random value in the half-open range `[min, max)`.
    ///
    /// # Panics
    ///
    /// Panics if `min >= max`.
    pub fn rand_range(min: &Bignum, max: &Bignum) -> Result<Bignum, EntropyError> {
        assert!(min < max, "empty range");
        rng::ensure()?;
        Ok(Bignum(OsRng.gen_bigint_range(&min.0, &max.0)))
    }

    /// Uniform random value with exactly `bits` bits (top bit set).
    ///
    /// # Panics
    ///
    /// Panics if `bits == 0`.
    pub fn rand_bits_exact(bits: u64) -> Result<Bignum, EntropyError> {
        assert!(bits > 0, "cannot set the top bit of a zero-bit value");
        rng::ensure()?;
        let mut v = OsRng.gen_biguint(bits);
        v |= BigUint::one() << (bits - 1);
        Ok(Bignum::from_biguint(v))
    }

    /// Uniform random value with at most `bits` bits, i.e. in `[0, 2^bits)`.
    pub fn rand_bits_atmost(bits: u64) -> Result<Bignum, EntropyError> {
        rng::ensure()?;
        Ok(Bignum::from_biguint(OsRng.gen_biguint(bits)))
    }

    /// Uniform random value in `[2, n)` coprime to `n`. For an honest
    /// composite modulus the rejection loop essentially never iterates;
    /// a draw sharing a factor with `n` has probability ~2^-511 at the
    /// default key size.
    pub(crate) fn rand_unit(n: &Bignum) -> Result<Bignum, EntropyError> {
        let two = Bignum::from_i64(2);
        loop {
            let v = Bignum::rand_range(&two, n)?;
            if v.gcd(n) == Bignum::one() {
                return Ok(v);
            }
        }
    }

    // -- byte import/export -------------------------------------------------

    /// The magnitude as minimal big-endian bytes. Zero encodes as empty.
    pub(crate) fn magnitude_bytes(&self) -> Vec<u8> {
        if self.0.is_zero() {
            Vec::new()
        } else {
            self.0.magnitude().to_bytes_be()
        }
    }

    /// Export the magnitude as exactly `width` big-endian bytes,
    /// zero-padded on the left. The sign is not encoded.
    ///
    /// Fails with [`BignumError::WidthExceeded`] when the magnitude does
    /// not fit — never truncates.
    pub fn to_bytes_be_fixed(&self, width: usize) -> Result<Vec<u8>, BignumError> {
        let mag = self.magnitude_bytes();
        if mag.len() > width {
            return Err(BignumError::WidthExceeded {
                needed: mag.len(),
                width,
            });
        }
        let mut out = vec![0u8; width];
        out[width - mag.len()..].copy_from_slice(&mag);
        Ok(out)
    }

    /// Import big-endian unsigned bytes. Always succeeds; leading zeros
    /// and the empty slice are fine (the latter yields zero). The result
    /// is never negative.
    pub fn from_bytes_be(bytes: &[u8]) -> Bignum {
        Bignum(BigInt::from_bytes_be(Sign::Plus, bytes))
    }

    // -- string rendering ---------------------------------------------------

    /// Decimal rendering, with a leading `-` for negative values.
    pub fn to_decimal(&self) -> String {
        self.0.to_str_radix(10)
    }

    /// Lowercase hexadecimal rendering, with a leading `-` for negative
    /// values and no `0x` prefix.
    pub fn to_hex(&self) -> String {
        self.0.to_str_radix(16)
    }

    /// Render in the given base.
    ///
    /// # Panics
    ///
    /// Panics for any base other than 10 or 16. Those are the only bases a
    /// human ever asked for; anything else is a caller bug.
    pub fn to_string_radix(&self, base: u32) -> String {
        match base {
            10 => self.to_decimal(),
            16 => self.to_hex(),
            other => unimplemented!("rendering in base {other} is not supported"),
        }
    }
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

impl From<i64> for Bignum {
    fn from(n: i64) -> Self {
        Bignum::from_i64(n)
    }
}

impl From<u64> for Bignum {
    fn from(n: u64) -> Self {
        Bignum(BigInt::from(n))
    }
}

impl From<u32> for Bignum {
    fn from(n: u32) -> Self {
        Bignum(BigInt::from(n))
    }
}

impl Add for &Bignum {
    type Output = Bignum;
    fn add(self, rhs: &Bignum) -> Bignum {
        Bignum(&self.0 + &rhs.0)
    }
}

impl Sub for &Bignum {
    type Output = Bignum;
    fn sub(self, rhs: &Bignum) -> Bignum {
        Bignum(&self.0 - &rhs.0)
    }
}

impl Mul for &Bignum {
    type Output = Bignum;
    fn mul(self, rhs: &Bignum) -> Bignum {
        Bignum(&self.0 * &rhs.0)
    }
}

impl Neg for &Bignum {
    type Output = Bignum;
    fn neg(self) -> Bignum {
        Bignum(-&self.0)
    }
}

impl Neg for Bignum {
    type Output = Bignum;
    fn neg(self) -> Bignum {
        Bignum(-self.0)
    }
}

impl fmt::Display for Bignum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl fmt::Debug for Bignum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let h = self.to_hex();
        if h.len() <= 24 {
            write!(f, "Bignum(0x{h})")
        } else {
            write!(
                f,
                "Bignum(0x{}…{}, {} bits)",
                &h[..12],
                &h[h.len() - 6..],
                self.bit_len()
            )
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
