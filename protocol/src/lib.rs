// Copyright (c) 2026 VEIL Project. MIT License.
// See LICENSE for details.

//! # VEIL Protocol — Core Library
//!
//! VEIL is a cryptographic identity protocol with one unusual property:
//! the authority that certifies your identity never learns what it is.
//! A client mints a **private identity** through blind RSA issuance, then
//! proves possession of it to anyone, any number of times, through a
//! zero-knowledge challenge-response handshake — no replay, no
//! impersonation, no linkage back to the issuance.
//!
//! ## Architecture
//!
//! The crate is split into modules that mirror the actual layers of the
//! protocol:
//!
//! - **bignum** — The arbitrary-precision arithmetic engine. Everything
//!   below is just politics; this is where the math happens.
//! - **wire** — Length-prefixed packet framing and the canonical bignum
//!   encoding. The one bit-exact format we promise to keep stable.
//! - **keys** — Issuer key material: a composite modulus plus `k`
//!   parallel exponent pairs. `k` is the soundness dial.
//! - **identity** — Private identities, public certificates, and
//!   fingerprints for humans to compare over the phone.
//! - **issuance** — The blind-signing handshake that mints identities.
//! - **auth** — The Guillou–Quisquater challenge-response proof, with an
//!   application message bound in and an optional piggybacked mutual flow.
//! - **rng** — The entropy precondition. No entropy, no cryptography.
//! - **config** — Protocol constants and security parameters.
//!
//! ## Design Philosophy
//!
//! 1. Correctness over performance (but modular exponentiation is still
//!    the only hot spot, and the backend is good at it).
//! 2. Secrets are scrubbed when sessions end, success or not.
//! 3. Verification failures are one bit: pass or fail. Which sub-check
//!    failed is nobody's business.
//! 4. Malformed peer input never corrupts a session. Reject and carry on.

pub mod auth;
pub mod bignum;
pub mod config;
pub mod identity;
pub mod issuance;
pub mod keys;
pub mod rng;
pub mod wire;
