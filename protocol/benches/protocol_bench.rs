// Benchmarks for the VEIL protocol core.
//
// Covers the three cost centers: issuer key generation (prime grinding),
// the blind issuance round trip, and a full authentication handshake.
// Modular exponentiation dominates all three; the bignum mod_pow bench
// isolates it so regressions in the arithmetic layer show up separately
// from regressions in protocol plumbing.

use criterion::{criterion_group, criterion_main, Criterion};

use veil_protocol::auth::{Prover, Verifier};
use veil_protocol::bignum::Bignum;
use veil_protocol::issuance::{self, IssuanceSession};
use veil_protocol::keys::IssuerKeypair;

fn bench_keygen(c: &mut Criterion) {
    let mut group = c.benchmark_group("keys");
    // prime generation has heavy-tailed latency; keep the sample count low
    group.sample_size(10);
    group.bench_function("generate_k2", |b| {
        b.iter(|| IssuerKeypair::generate(2).unwrap());
    });
    group.finish();
}

fn bench_issuance(c: &mut Criterion) {
    let keypair = IssuerKeypair::generate(4).unwrap();
    let pk = keypair.public_key();

    c.bench_function("issuance/full_round", |b| {
        b.iter(|| {
            let mut session = IssuanceSession::start(&pk).unwrap();
            let request = session.build_request().unwrap();
            let answer = issuance::answer(&keypair, &request).unwrap();
            session.finish(&answer).unwrap()
        });
    });
}

fn bench_authentication(c: &mut Criterion) {
    let keypair = IssuerKeypair::generate(4).unwrap();
    let pk = keypair.public_key();

    let mut session = IssuanceSession::start(&pk).unwrap();
    let request = session.build_request().unwrap();
    let answer = issuance::answer(&keypair, &request).unwrap();
    let identity = session.finish(&answer).unwrap();
    let identity_bytes = identity.to_bytes().unwrap();
    let pub_id = identity.public_identity();

    c.bench_function("auth/full_handshake", |b| {
        b.iter(|| {
            let id =
                veil_protocol::identity::PrivateIdentity::from_bytes(&identity_bytes).unwrap();
            let mut prover = Prover::new(pk.clone(), id).unwrap();
            let mut verifier = Verifier::new(pk.clone(), pub_id.clone());
            let start = prover.start(true, b"bench message").unwrap();
            let challenge = verifier.challenge(true, &start).unwrap();
            let response = prover.respond(&challenge).unwrap();
            verifier.verify(&response).unwrap()
        });
    });
}

fn bench_mod_pow(c: &mut Criterion) {
    let keypair = IssuerKeypair::generate(1).unwrap();
    let n = keypair.modulus().clone();
    let base = Bignum::rand_range(&Bignum::from_i64(2), &n).unwrap();
    let exp = Bignum::rand_bits_exact(1024).unwrap();

    c.bench_function("bignum/mod_pow_1024", |b| {
        b.iter(|| base.mod_pow(&exp, &n));
    });
}

criterion_group!(
    benches,
    bench_keygen,
    bench_issuance,
    bench_authentication,
    bench_mod_pow
);
criterion_main!(benches);
