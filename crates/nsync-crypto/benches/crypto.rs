use nsync_crypto::{
    pack, unpack, CipherRegistry, Compression, CostTier, CryptoHeader, Cryptor, KdfParams,
    KdfRegistry, OsRandom, ARGON2ID, XCHACHA20_POLY1305,
};
use secrecy::SecretString;
use std::sync::Arc;

fn make_data(size: usize) -> Vec<u8> {
    (0..size)
        .map(|i| (i.wrapping_mul(7) ^ (i >> 3)) as u8)
        .collect()
}

fn bench_cryptor() -> Cryptor {
    let fast = KdfParams {
        mem_cost_kib: 1024,
        time_cost: 1,
        parallelism: 1,
    };
    Cryptor::new(
        "nsync",
        CipherRegistry::with_defaults(),
        KdfRegistry::with_argon2_tiers(fast, fast, fast),
        Arc::new(OsRandom),
    )
}

#[divan::bench(args = [1024, 65536, 1048576])]
fn bench_pack(bencher: divan::Bencher, size: usize) {
    let header = CryptoHeader {
        package_name: "nsync".into(),
        revision: 2,
        algorithm: XCHACHA20_POLY1305.into(),
        nonce: vec![0xAB; 24],
        kdf: ARGON2ID.into(),
        salt: Some(vec![0xCD; 16]),
        cost: "m=16384,t=2,p=1".into(),
        compression: None,
    };
    let cipher = make_data(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| pack(divan::black_box(&header), divan::black_box(&cipher)).unwrap());
}

#[divan::bench(args = [1024, 65536, 1048576])]
fn bench_unpack(bencher: divan::Bencher, size: usize) {
    let header = CryptoHeader {
        package_name: "nsync".into(),
        revision: 2,
        algorithm: XCHACHA20_POLY1305.into(),
        nonce: vec![0xAB; 24],
        kdf: ARGON2ID.into(),
        salt: Some(vec![0xCD; 16]),
        cost: "m=16384,t=2,p=1".into(),
        compression: None,
    };
    let blob = pack(&header, &make_data(size)).unwrap();
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| unpack(divan::black_box(&blob), "nsync").unwrap().1.len());
}

#[divan::bench(args = [1024, 65536])]
fn bench_key_roundtrip(bencher: divan::Bencher, size: usize) {
    let cryptor = bench_cryptor();
    let key = [0x42u8; 32];
    let data = make_data(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            let blob = cryptor
                .encrypt_with_key(
                    divan::black_box(&data),
                    &key,
                    XCHACHA20_POLY1305,
                    Some(Compression::Zstd),
                )
                .unwrap();
            cryptor.decrypt_with_key(&blob, &key).unwrap()
        });
}

#[divan::bench]
fn bench_password_roundtrip(bencher: divan::Bencher) {
    let cryptor = bench_cryptor();
    let password = SecretString::from("abcd-efgh-ijkm-npqr");
    let data = make_data(4096);
    bencher.bench(|| {
        let blob = cryptor
            .encrypt_with_password(
                divan::black_box(&data),
                &password,
                CostTier::Low,
                XCHACHA20_POLY1305,
                ARGON2ID,
                None,
            )
            .unwrap();
        cryptor.decrypt_with_password(&blob, &password).unwrap()
    });
}

fn main() {
    divan::main();
}
