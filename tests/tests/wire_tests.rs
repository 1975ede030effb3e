//! Wire format properties for queries, results and key material

use evi_api::{EncodeType, Serialize, SerializeSecret};
use evi_params::DEGREE;
use evi_scheme::serialize::{deserialize_queries, load_key_bundle, serialize_queries, write_key_bundle};
use evi_scheme::serialize::{write_enc_key, write_eval_key, write_secret_key};
use evi_scheme::{
    BlockMeta, CipherBlock, ErrorKind, Matrix, PlainBlock, PolyPair, Query, SearchResult, SecretKey,
};
use evi_tests::Fixture;
use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

fn poly(rng: &mut ChaCha20Rng) -> Vec<u64> {
    (0..DEGREE).map(|_| rng.gen()).collect()
}

fn meta(n: u64, dim: u64, show_dim: u64, scale_bit: u64, query: bool) -> BlockMeta {
    BlockMeta {
        n,
        dim,
        show_dim,
        scale_bit,
        encode_type: if query { EncodeType::Query } else { EncodeType::Item },
        ..BlockMeta::default()
    }
}

fn cipher_block(rng: &mut ChaCha20Rng, meta: BlockMeta, level: u32) -> CipherBlock {
    let mut pair = || PolyPair { a: poly(rng), b: poly(rng) };
    let q = pair();
    let p = (level == 1).then(pair);
    CipherBlock { meta, q, p }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_cipher_query_round_trip(
        seed in any::<u64>(),
        blocks in 1usize..4,
        level in 0u32..=1,
        n in 1u64..=128,
        dim in 1u64..=4096,
        scale_bit in 0u64..64,
        query in any::<bool>(),
    ) {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let mut q = Query::new();
        for _ in 0..blocks {
            q.push(cipher_block(&mut rng, meta(n, dim, dim, scale_bit, query), level));
        }
        let bytes = q.to_bytes().unwrap();
        prop_assert_eq!(bytes[0], 0);
        prop_assert_eq!(bytes[1], 0);
        prop_assert_eq!(&bytes[2..6], &(blocks as u32).to_le_bytes()[..]);
        prop_assert_eq!(Query::from_bytes(&bytes).unwrap(), q);

        let cut = (seed as usize) % bytes.len();
        prop_assert!(Query::from_bytes(&bytes[..cut]).is_err());
    }

    #[test]
    fn prop_plain_query_round_trip(seed in any::<u64>(), level in 0u32..=1, show_dim in 1u64..=4096) {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let block = PlainBlock {
            meta: meta(1, show_dim, show_dim, 25, false),
            q: poly(&mut rng),
            p: (level == 1).then(|| poly(&mut rng)),
        };
        let q = Query::from_blocks(vec![block.into()]);
        let back = Query::from_bytes(&q.to_bytes().unwrap()).unwrap();
        prop_assert_eq!(back, q);
    }

    #[test]
    fn prop_search_result_round_trip(seed in any::<u64>(), slices in 1usize..4, total in 0u32..20_000) {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let blocks: Vec<CipherBlock> = (0..slices)
            .map(|_| cipher_block(&mut rng, BlockMeta::default(), 0))
            .collect();
        let matrix = Matrix::from_cipher_blocks(&blocks, None, 64).unwrap();
        let result = SearchResult::new(matrix, total).unwrap();
        let bytes = result.to_bytes();
        // tag, count, level, n, dim, degree, then a and b
        prop_assert_eq!(bytes.len(), 1 + 4 + 4 + 24 + 2 * slices * DEGREE * 8);
        prop_assert_eq!(SearchResult::from_bytes(&bytes).unwrap(), result);
    }
}

#[test]
fn test_query_vector_and_rejections() {
    let mut rng = ChaCha20Rng::seed_from_u64(5);
    let queries: Vec<Query> = (1..=3u64)
        .map(|n| Query::from_blocks(vec![cipher_block(&mut rng, meta(n, 32, 32, 24, true), 0).into()]))
        .collect();
    let mut bytes = Vec::new();
    serialize_queries(&queries, &mut bytes).unwrap();
    assert_eq!(&bytes[..4], &3u32.to_le_bytes());
    assert_eq!(deserialize_queries(&mut bytes.as_slice()).unwrap(), queries);

    assert_eq!(Query::new().to_bytes().unwrap_err().kind(), ErrorKind::InvalidInput);

    let mut bad_type = queries[0].to_bytes().unwrap();
    bad_type[0] = 7;
    assert_eq!(Query::from_bytes(&bad_type).unwrap_err().kind(), ErrorKind::NotSupported);

    let mut bad_level = queries[0].to_bytes().unwrap();
    bad_level[6] = 2;
    assert!(Query::from_bytes(&bad_level).is_err());
}

#[test]
fn test_key_material_round_trip() {
    let session = Fixture::flat().with_rank(32).session().unwrap();
    let sk_bytes = session.sk.to_bytes_zeroizing();
    assert_eq!(sk_bytes.len(), 1 + 4 + DEGREE / 4);
    assert_eq!(SecretKey::from_bytes(&sk_bytes).unwrap(), session.sk);

    let mut sec = Vec::new();
    let mut enc = Vec::new();
    let mut eval = Vec::new();
    write_secret_key(&session.sk, &mut sec).unwrap();
    write_enc_key(&session.pack, &mut enc).unwrap();
    write_eval_key(&session.ctx, &session.pack, &mut eval).unwrap();

    let mut bundle = Vec::new();
    write_key_bundle(
        &[("SecKey.bin", &sec[..]), ("EncKey.bin", &enc[..]), ("EvalKey.bin", &eval[..])],
        &mut bundle,
    )
    .unwrap();
    let (sk, pack) = load_key_bundle(&session.ctx, &mut bundle.as_slice()).unwrap();
    assert_eq!(sk, session.sk);
    assert_eq!(pack, session.pack);
    assert_eq!(hex::encode(&bundle[..4]), "0a000000");
}
