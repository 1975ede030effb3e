//! Key generation, encryption and decryption through the public surface

use evi_api::{EncodeType, EvalMode};
use evi_params::{Preset, DEGREE};
use evi_scheme::{CipherBlock, Context, ContextConfig, ErrorKind, KeyGenerator, Matrix, SearchResult};
use evi_tests::vectors::dot;
use evi_tests::{error_stats, Fixture, VectorSource};

#[test]
fn test_public_key_round_trip() {
    let session = Fixture::flat().session().unwrap();
    let mut enc = session.encryptor().unwrap();
    let dec = session.decryptor().unwrap();
    let msg = VectorSource::new(21).vector(128);

    for level in [0, 1] {
        let query = enc.encrypt(&msg, EncodeType::Item, level, None).unwrap();
        assert_eq!(query.blocks()[0].as_cipher().unwrap().p.is_some(), level == 1);
        let out = dec.decrypt_query(&query, &session.sk, None).unwrap();
        let stats = error_stats(&msg, &out[..128]);
        assert!(stats.max < 1e-3, "max error {}", stats.max);
        assert!(stats.mean < 1e-4);
    }
}

#[test]
fn test_wrong_secret_key_does_not_decrypt() {
    let session = Fixture::flat().session().unwrap();
    let other = Fixture::flat().with_seed(99).session().unwrap();
    let mut enc = session.encryptor().unwrap();
    let msg = VectorSource::new(22).vector(128);
    let query = enc.encrypt(&msg, EncodeType::Item, 0, None).unwrap();

    let out = session.decryptor().unwrap().decrypt_query(&query, &other.sk, None).unwrap();
    assert!(error_stats(&msg, &out[..128]).max > 1.0);
}

#[test]
fn test_seeded_key_generation_is_deterministic() {
    let a = Fixture::flat().session().unwrap();
    let b = Fixture::flat().session().unwrap();
    assert_eq!(a.sk, b.sk);
    assert_eq!(a.pack, b.pack);
    assert_eq!(a.sk.hamming_weight(), a.ctx.constants().hamming_weight as usize);

    let mut seed = Fixture::flat().seed_bytes(1);
    let ctx = Fixture::flat().context().unwrap();
    let first = KeyGenerator::new(&ctx, Some(&seed)).unwrap().gen_sec_key().unwrap();
    seed[17] ^= 1;
    let second = KeyGenerator::new(&ctx, Some(&seed)).unwrap().gen_sec_key().unwrap();
    assert_ne!(first.coeffs(), second.coeffs());
}

#[test]
fn test_seeded_encryption_is_deterministic() {
    let session = Fixture::flat().session().unwrap();
    let msg = VectorSource::new(23).vector(64);
    let a = session.encryptor().unwrap().encrypt(&msg, EncodeType::Query, 0, None).unwrap();
    let b = session.encryptor().unwrap().encrypt(&msg, EncodeType::Query, 0, None).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_inner_product_scores() {
    let session = Fixture::flat().session().unwrap();
    let ctx = &session.ctx;
    let mut enc = session.encryptor().unwrap();
    let dec = session.decryptor().unwrap();
    let mut source = VectorSource::new(24);
    let query = source.unit_vector(128);

    let item = source.unit_vector(128);
    let expected = dot(&query, &item);
    let encrypted = enc.encrypt(&item, EncodeType::Item, 0, None).unwrap();
    let out = dec.decrypt_query(&encrypted, &session.sk, None).unwrap();
    assert!((dot(&query, &out[..128]) - expected).abs() < 1e-3);

    let blocks: Vec<CipherBlock> = encrypted.iter().filter_map(|b| b.as_cipher().cloned()).collect();
    let result = SearchResult::new(Matrix::from_cipher_blocks(&blocks, None, 128).unwrap(), 0).unwrap();
    assert_eq!(result.total_item_count(), DEGREE as u32);
    let plain = dec.decrypt_result(&result, &session.sk, false, None).unwrap();
    assert!(error_stats(&item, &plain[..128]).max < 1e-3);
    assert_eq!(ctx.items_per_ctxt(), DEGREE / 128);
}

#[test]
fn test_mm_batch_round_trip() {
    let session = Fixture::mm().session().unwrap();
    let mut enc = session.encryptor().unwrap();
    let dec = session.decryptor().unwrap();
    let items = VectorSource::new(25).batch(6, 32);

    let queries = enc.encrypt_mm(&items, EncodeType::Item, 0, None).unwrap();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].len(), 32);
    let out = dec.decrypt_query(&queries[0], &session.sk, None).unwrap();
    for (k, item) in items.iter().enumerate() {
        assert!(error_stats(item, &out[k * 32..(k + 1) * 32]).max < 1e-3);
    }
}

#[test]
fn test_shared_a_session_rejects_single_key_paths() {
    let fixture = Fixture::default().with_preset(Preset::IP0).with_rank(32).with_eval_mode(EvalMode::Ms);
    let session = fixture.session().unwrap();
    assert_eq!(session.pack.switch_key().unwrap().entries(), session.ctx.rank());
    let mut enc = session.encryptor().unwrap();
    let msg = VectorSource::new(26).vector(32);
    assert_eq!(
        enc.encrypt(&msg, EncodeType::Item, 0, None).unwrap_err().kind(),
        ErrorKind::NotSupported
    );
    assert_eq!(session.decryptor().err().unwrap().kind(), ErrorKind::InvalidAccess);
}

#[test]
fn test_context_from_config_file() {
    let path = std::env::temp_dir().join(format!("evi-config-{}.toml", std::process::id()));
    let config = Fixture::rmp().config();
    std::fs::write(&path, config.to_toml_string().unwrap()).unwrap();

    let loaded = ContextConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
    let ctx = Context::from_config(&loaded).unwrap();
    assert_eq!(ctx.eval_mode(), EvalMode::Rmp);
    assert_eq!(ctx.show_rank(), 512);
    assert_eq!(loaded.seed().unwrap().unwrap().as_slice(), &Fixture::rmp().seed_bytes(0)[..]);
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_context_from_json_config_file() {
    let path = std::env::temp_dir().join(format!("evi-config-{}.json", std::process::id()));
    let config = Fixture::mm().config();
    std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

    let loaded = ContextConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
    let ctx = Context::from_config(&loaded).unwrap();
    assert_eq!(ctx.eval_mode(), EvalMode::Mm);
    std::fs::remove_file(&path).unwrap();
}
