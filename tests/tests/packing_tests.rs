//! Encoding layouts and packing parameters across modes

use evi_api::{EncodeType, EvalMode};
use evi_params::{Preset, DEGREE};
use evi_scheme::{inner_rank, BlockAccess, Decryptor, Encryptor, ErrorKind};
use evi_tests::{error_stats, Fixture, VectorSource};

#[test]
fn test_flat_round_trip_within_scale_bound() {
    let ctx = Fixture::flat().context().unwrap();
    let enc = Encryptor::new(&ctx, None).unwrap();
    let dec = Decryptor::new(&ctx).unwrap();
    let msg = VectorSource::new(11).vector(128);

    let bound = (-(ctx.query_scale_factor()) + 1.0).exp2();
    for encode_type in [EncodeType::Item, EncodeType::Query] {
        let query = enc.encode(&msg, encode_type, 0, None).unwrap();
        assert_eq!(query.len(), 1);
        assert_eq!(query.blocks()[0].meta().show_dim, 128);
        let out = dec.decode(&query).unwrap();
        let stats = error_stats(&msg, &out[..128]);
        assert!(stats.max <= bound, "max error {} above {bound}", stats.max);
    }
}

#[test]
fn test_items_per_ctxt_follows_padded_rank() {
    for (rank, mode) in [
        (32, EvalMode::Flat),
        (100, EvalMode::Flat),
        (1000, EvalMode::Flat),
        (512, EvalMode::Rmp),
        (4096, EvalMode::Rmp),
        (300, EvalMode::Rms),
    ] {
        let ctx = Fixture::default().with_rank(rank).with_eval_mode(mode).context().unwrap();
        let internal = if mode.is_rank_minimizing() { inner_rank(rank) } else { rank };
        assert_eq!(ctx.rank(), internal);
        assert_eq!(ctx.pad_rank(), internal.next_power_of_two());
        assert_eq!(ctx.items_per_ctxt(), DEGREE / ctx.pad_rank());
        assert_eq!(1usize << ctx.log_pad_rank(), ctx.pad_rank());
    }
}

#[test]
fn test_rmp_split_and_decode() {
    let fixture = Fixture::rmp().with_preset(Preset::IP0);
    let ctx = fixture.context().unwrap();
    assert_eq!(ctx.rank(), 32);
    assert_eq!(ctx.num_input_cipher(), 16);

    let enc = Encryptor::new(&ctx, None).unwrap();
    let dec = Decryptor::new(&ctx).unwrap();
    let msg = VectorSource::new(12).vector(300);
    let query = enc.encode(&msg, EncodeType::Query, 0, None).unwrap();
    // 300 values in blocks of 32
    assert_eq!(query.len(), 10);
    for block in &query {
        assert_eq!(block.meta().dim, 32);
        assert_eq!(block.meta().show_dim, 300);
    }
    let out = dec.decode(&query).unwrap();
    assert!(error_stats(&msg, &out[..300]).max < 1e-6);
}

#[test]
fn test_pack_split_boundary() {
    let fixture = Fixture::rmp().with_rank(64);
    let session = fixture.session().unwrap();
    let ctx = &session.ctx;
    let per_ctxt = ctx.items_per_ctxt();
    let mut enc = session.encryptor().unwrap();

    let msgs = VectorSource::new(13).batch(per_ctxt + 1, 64);
    let queries = enc.encrypt_batch(&msgs, EncodeType::Item, 0, None).unwrap();
    assert_eq!(queries.len(), 2);
    for query in &queries {
        assert_eq!(query.len(), ctx.num_input_cipher());
    }
    assert!(queries[0].iter().all(|b| b.meta().n == per_ctxt as u64));
    assert!(queries[1].iter().all(|b| b.meta().n == 1));

    let dec = session.decryptor().unwrap();
    let last = dec.decrypt_query_at(0, &queries[1], &session.sk, None).unwrap();
    assert!(error_stats(&msgs[per_ctxt], &last[..64]).max < 1e-3);
    let middle = dec.decrypt_query_at(5, &queries[0], &session.sk, None).unwrap();
    assert!(error_stats(&msgs[5], &middle[..64]).max < 1e-3);
}

#[test]
fn test_mm_encode_is_query_only() {
    let ctx = Fixture::mm().context().unwrap();
    let enc = Encryptor::new(&ctx, None).unwrap();
    let msg = VectorSource::new(14).vector(32);
    assert!(enc.encode(&msg, EncodeType::Item, 0, None).is_err());
    let query = enc.encode(&msg, EncodeType::Query, 0, None).unwrap();
    let out = Decryptor::new(&ctx).unwrap().decode(&query).unwrap();
    assert_eq!(out.len(), 32);
    assert!(error_stats(&msg, &out).max < 1e-6);
}

#[test]
fn test_dimension_bounds_across_split_modes() {
    let mut source = VectorSource::new(31);
    for fixture in [Fixture::rmp(), Fixture::rmp().with_eval_mode(EvalMode::Rms)] {
        let ctx = fixture.context().unwrap();
        let enc = Encryptor::new(&ctx, None).unwrap();
        for encode_type in [EncodeType::Item, EncodeType::Query] {
            let err = enc.encode(&source.vector(DEGREE + 1), encode_type, 0, None).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
        }
    }

    let session = Fixture::rmp().session().unwrap();
    let mut enc = session.encryptor().unwrap();
    let mut items = source.batch(3, 512);
    items[1].extend(source.vector(200));
    let err = enc.encrypt_batch(&items, EncodeType::Item, 0, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    items[1].truncate(512);
    assert_eq!(enc.encrypt_batch(&items, EncodeType::Item, 0, None).unwrap().len(), 2);
}
