//! Primality testing and prime generation.
//!
//! Miller-Rabin with a trial-division pre-filter. The pre-filter catches
//! the vast majority of random composites for the price of a few dozen
//! machine-word divisions, which matters a lot during key generation where
//! we grind through hundreds of candidates per prime.

use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::rngs::OsRng;

use super::Bignum;
use crate::config;
use crate::rng::{self, EntropyError};

/// Primes below 256. Divisibility by any of these disqualifies roughly
/// 87% of random odd candidates before Miller-Rabin ever runs.
const SMALL_PRIMES: &[u64] = &[
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89,
    97, 101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157, 163, 167, 173, 179, 181, 191,
    193, 197, 199, 211, 223, 227, 229, 233, 239, 241, 251,
];

/// See [`Bignum::is_prime`] for the `certainty` contract.
pub(crate) fn is_prime(n: &Bignum, certainty: i32) -> bool {
    if !n.is_positive() {
        return false;
    }
    let n = n.as_bigint().magnitude();
    let rounds = if certainty <= 0 { 1 } else { certainty as u32 };
    is_prime_uint(n, rounds)
}

fn is_prime_uint(n: &BigUint, rounds: u32) -> bool {
    if n < &BigUint::from(2u32) {
        return false;
    }
    for &p in SMALL_PRIMES {
        let p = BigUint::from(p);
        if *n == p {
            return true;
        }
        if n.mod_floor(&p).is_zero() {
            return false;
        }
    }
    miller_rabin(n, rounds)
}

/// Miller-Rabin with uniformly random witnesses.
///
/// Caller guarantees `n` is odd, greater than every entry of
/// [`SMALL_PRIMES`], and not divisible by any of them.
fn miller_rabin(n: &BigUint, rounds: u32) -> bool {
    let one = BigUint::one();
    let two = BigUint::from(2u32);
    let n_minus_one = n - &one;

    // n - 1 == d * 2^s with d odd
    let s = n_minus_one.trailing_zeros().unwrap_or(0);
    let d = &n_minus_one >> s;

    'witness: for _ in 0..rounds {
        let a = OsRng.gen_biguint_range(&two, &n_minus_one);
        let mut x = a.modpow(&d, n);
        if x == one || x == n_minus_one {
            continue;
        }
        for _ in 1..s {
            x = (&x * &x).mod_floor(n);
            if x == n_minus_one {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Generate a random prime with exactly `bits` bits.
///
/// Candidates are drawn with the top bit forced (so the product of two
/// such primes has exactly `2 * bits` bits) and the low bit forced (no
/// point testing even numbers), then certified with
/// [`config::MILLER_RABIN_ROUNDS`] rounds.
pub(crate) fn generate_prime(bits: u64) -> Result<Bignum, EntropyError> {
    assert!(bits >= 16, "refusing to generate toy primes");
    rng::ensure()?;
    loop {
        let mut cand = OsRng.gen_biguint(bits);
        cand |= BigUint::one();
        cand |= BigUint::one() << (bits - 1);
        if is_prime_uint(&cand, config::MILLER_RABIN_ROUNDS) {
            return Ok(Bignum::from_biguint(cand));
        }
    }
}

/// Find the smallest prime strictly greater than `floor` that is coprime
/// to `phi`. Used to pick the public proof exponents.
pub(crate) fn next_coprime_prime(floor: &Bignum, phi: &Bignum) -> Bignum {
    let mut cand = floor.as_bigint().magnitude().clone();
    // start at the next odd number above the floor
    cand += BigUint::one();
    if cand.is_even() {
        cand += BigUint::one();
    }
    loop {
        if is_prime_uint(&cand, config::MILLER_RABIN_ROUNDS) {
            let c = Bignum::from_biguint(cand.clone());
            if c.gcd(phi) == Bignum::one() {
                return c;
            }
        }
        cand += BigUint::from(2u32);
    }
}
