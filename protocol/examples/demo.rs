//! Interactive CLI demo of the full VEIL identity lifecycle.
//!
//! Walks through issuer key generation, blind issuance, fingerprint
//! comparison, a one-way authentication handshake, and a tampering
//! attempt that the verifier shoots down. The output uses ANSI escape
//! codes for colored, storytelling-style terminal rendering.
//!
//! Run with:
//!   cargo run --example demo --release

use std::time::Instant;

use veil_protocol::auth::{Prover, Verifier};
use veil_protocol::config;
use veil_protocol::issuance::{self, IssuanceSession};
use veil_protocol::keys::IssuerKeypair;
use veil_protocol::rng;

// ---------------------------------------------------------------------------
// ANSI color constants
// ---------------------------------------------------------------------------

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const BLUE: &str = "\x1b[34m";
const MAGENTA: &str = "\x1b[35m";
const CYAN: &str = "\x1b[36m";
const RED: &str = "\x1b[31m";

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

fn step(n: u32, title: &str) {
    println!("\n{BOLD}{BLUE}── step {n}: {title} ──{RESET}");
}

fn note(text: &str) {
    println!("  {DIM}{text}{RESET}");
}

fn ok(text: &str) {
    println!("  {GREEN}✓{RESET} {text}");
}

fn wire(from: &str, to: &str, what: &str, bytes: usize) {
    println!("  {MAGENTA}{from} ▶ {to}{RESET}  {what} {DIM}({bytes} bytes){RESET}");
}

fn main() {
    println!("{BOLD}{CYAN}VEIL — blind identities, zero-knowledge logins{RESET}");

    rng::init().expect("no entropy source; cannot run the demo");

    // -- issuer setup -------------------------------------------------------
    step(1, "issuer key generation");
    note("grinding two 512-bit primes; this is the slow part");
    let t = Instant::now();
    let keypair = IssuerKeypair::generate(config::DEFAULT_COMPONENTS).expect("keygen");
    let issuer_pk = keypair.public_key();
    ok(&format!(
        "modulus: {} bits, {} proof components ({:.1?})",
        keypair.modulus().bit_len(),
        keypair.component_count(),
        t.elapsed()
    ));

    // -- blind issuance -----------------------------------------------------
    step(2, "blind issuance");
    note("the client picks a secret identity the issuer will never see");
    let mut session = IssuanceSession::start(&issuer_pk).expect("session start");
    let request = session.build_request().expect("request");
    wire("client", "issuer", "blinded request", request.len());

    let answer = issuance::answer(&keypair, &request).expect("issuer answer");
    wire("issuer", "client", "blind signature", answer.len());

    let private_id = session.finish(&answer).expect("unblind + self-check");
    let public_id = private_id.public_identity();
    ok("identity minted and self-checked against the issuer key");

    // -- fingerprints -------------------------------------------------------
    step(3, "fingerprint");
    note("what two humans compare over the phone before trusting a cert");
    println!("  {YELLOW}{}{RESET}", public_id.fingerprint());

    // -- authentication -----------------------------------------------------
    step(4, "zero-knowledge login");
    let message = b"open the pod bay doors";
    let mut prover = Prover::new(issuer_pk.clone(), private_id).expect("prover");
    let mut verifier = Verifier::new(issuer_pk.clone(), public_id.clone());

    let t = Instant::now();
    let start = prover.start(true, message).expect("start");
    wire("client", "server", "commitments + message", start.len());

    let challenge = verifier.challenge(true, &start).expect("challenge");
    wire("server", "client", "challenge seed", challenge.len());

    let response = prover.respond(&challenge).expect("response");
    wire("client", "server", "proof response", response.len());

    let recovered = verifier.verify(&response).expect("verify");
    ok(&format!(
        "verified in {:.1?}; bound message recovered: {:?}",
        t.elapsed(),
        String::from_utf8_lossy(&recovered)
    ));

    // -- tampering ----------------------------------------------------------
    step(5, "tampering attempt");
    note("replay the same handshake but flip one bit of the response");
    let id2 = {
        let mut s = IssuanceSession::start(&issuer_pk).unwrap();
        let req = s.build_request().unwrap();
        let ans = issuance::answer(&keypair, &req).unwrap();
        s.finish(&ans).unwrap()
    };
    let pub2 = id2.public_identity();
    let mut prover = Prover::new(issuer_pk.clone(), id2).unwrap();
    let mut verifier = Verifier::new(issuer_pk, pub2);

    let start = prover.start(true, b"transfer 10 coins to alice").unwrap();
    let challenge = verifier.challenge(true, &start).unwrap();
    let mut response = prover.respond(&challenge).unwrap();
    let mid = response.len() / 2;
    response[mid] ^= 0x01;

    match verifier.verify(&response) {
        Err(e) => println!("  {RED}✗ rejected as expected:{RESET} {e}"),
        Ok(_) => unreachable!("a tampered response must never verify"),
    }

    println!("\n{BOLD}{GREEN}demo complete{RESET}");
}
