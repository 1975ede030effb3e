use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use evi_api::EncodeType;
use evi_tests::{Fixture, VectorSource};

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    for fixture in [Fixture::flat(), Fixture::rmp(), Fixture::mm()] {
        let ctx = fixture.context().unwrap();
        let enc = evi_scheme::Encryptor::new(&ctx, None).unwrap();
        let msg = VectorSource::new(1).vector(fixture.rank);
        group.bench_with_input(
            BenchmarkId::new(fixture.eval_mode.name(), fixture.rank),
            &msg,
            |b, msg| {
                b.iter(|| enc.encode(msg, EncodeType::Query, 0, None).unwrap());
            },
        );
    }

    group.finish();
}

fn bench_encrypt_decrypt(c: &mut Criterion) {
    let mut group = c.benchmark_group("rlwe");
    let session = Fixture::flat().session().unwrap();
    let msg = VectorSource::new(2).vector(128);

    group.bench_function("encrypt FLAT/128", |b| {
        let mut enc = session.encryptor().unwrap();
        b.iter(|| enc.encrypt(&msg, EncodeType::Item, 0, None).unwrap());
    });

    let query = session
        .encryptor()
        .unwrap()
        .encrypt(&msg, EncodeType::Item, 0, None)
        .unwrap();
    let dec = session.decryptor().unwrap();
    group.bench_function("decrypt FLAT/128", |b| {
        b.iter(|| dec.decrypt_query(&query, &session.sk, None).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_encode, bench_encrypt_decrypt);
criterion_main!(benches);
