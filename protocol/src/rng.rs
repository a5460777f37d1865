//! # Randomness Initialization
//!
//! Every secret in this library — prime factors, identity values, blinding
//! factors, proof nonces — comes from the operating system's CSPRNG. If the
//! OS cannot give us entropy, no cryptographic operation may proceed, full
//! stop. This module turns that rule into code.
//!
//! [`init`] probes the OS source once per process and memoizes the outcome.
//! Callers may invoke it explicitly at startup to fail early; every
//! operation that consumes randomness re-checks the memoized result anyway,
//! so forgetting the explicit call degrades the failure from "at startup"
//! to "at first use", never to "silently weak keys".

use std::sync::OnceLock;

use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

/// The OS entropy source is unusable.
///
/// This is an environment failure, not a protocol failure: there is no
/// retry story short of fixing the machine.
#[derive(Debug, Clone, Error)]
#[error("no usable entropy source: {0}")]
pub struct EntropyError(pub(crate) String);

static PROBE: OnceLock<Result<(), EntropyError>> = OnceLock::new();

/// Probe the OS random number generator.
///
/// Draws a test block from [`OsRng`] and records whether that worked. The
/// first call does the probe; later calls return the memoized verdict.
/// Generate keys or identities only after this returns `Ok`.
pub fn init() -> Result<(), EntropyError> {
    PROBE
        .get_or_init(|| {
            let mut buf = [0u8; 32];
            OsRng
                .try_fill_bytes(&mut buf)
                .map_err(|e| EntropyError(e.to_string()))
        })
        .clone()
}

/// Internal precondition check used by everything that draws randomness.
pub(crate) fn ensure() -> Result<(), EntropyError> {
    init()
}
