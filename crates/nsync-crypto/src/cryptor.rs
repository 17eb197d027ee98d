//! Cryptor: password or raw-key encryption into a self-describing envelope

use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::debug;
use zeroize::Zeroizing;

use crate::cipher::{CipherRegistry, SymmetricCipher};
use crate::compression::Compression;
use crate::envelope::{self, CryptoHeader, NEWEST_SUPPORTED_REVISION};
use crate::error::{CryptoError, CryptoResult};
use crate::kdf::{CostTier, KdfRegistry, KDF_NONE};
use crate::random::{OsRandom, RandomSource};

/// Shortest password accepted for encryption, in characters
pub const MIN_PASSWORD_LENGTH: usize = 5;

/// Seals and opens envelopes tagged with one package name.
///
/// Holds no state besides its registries and random source, so one instance
/// can be shared by every caller.
#[derive(Clone)]
pub struct Cryptor {
    package_name: String,
    ciphers: CipherRegistry,
    kdfs: KdfRegistry,
    random: Arc<dyn RandomSource>,
}

impl Cryptor {
    pub fn new(
        package_name: impl Into<String>,
        ciphers: CipherRegistry,
        kdfs: KdfRegistry,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        Self {
            package_name: package_name.into(),
            ciphers,
            kdfs,
            random,
        }
    }

    /// Built-in registries and the OS random source.
    pub fn with_defaults(package_name: impl Into<String>) -> Self {
        Self::new(
            package_name,
            CipherRegistry::with_defaults(),
            KdfRegistry::with_defaults(),
            Arc::new(OsRandom),
        )
    }

    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    pub fn random(&self) -> &dyn RandomSource {
        self.random.as_ref()
    }

    /// Encrypt `message` under a key derived from `password`.
    pub fn encrypt_with_password(
        &self,
        message: &[u8],
        password: &SecretString,
        tier: CostTier,
        algorithm: &str,
        kdf_name: &str,
        compression: Option<Compression>,
    ) -> CryptoResult<Vec<u8>> {
        if password.expose_secret().chars().count() < MIN_PASSWORD_LENGTH {
            return Err(CryptoError::WeakPassword {
                min: MIN_PASSWORD_LENGTH,
            });
        }
        let cipher = self.ciphers.lookup(algorithm)?;
        let kdf = self.kdfs.lookup(kdf_name)?;

        let salt = self.random.random_bytes(kdf.expected_salt_size());
        let cost = kdf.recommended_cost(tier);
        let key = kdf.derive_key(password, cipher.expected_key_size(), &salt, &cost)?;

        let header = CryptoHeader {
            package_name: self.package_name.clone(),
            revision: NEWEST_SUPPORTED_REVISION,
            algorithm: cipher.name().to_string(),
            nonce: Vec::new(),
            kdf: kdf.name().to_string(),
            salt: Some(salt),
            cost,
            compression: compression.map(|c| c.name().to_string()),
        };
        self.seal(header, cipher.as_ref(), &key, message, compression)
    }

    /// Encrypt `message` under a pre-shared key, fitted to the cipher's key size.
    pub fn encrypt_with_key(
        &self,
        message: &[u8],
        key: &[u8],
        algorithm: &str,
        compression: Option<Compression>,
    ) -> CryptoResult<Vec<u8>> {
        let cipher = self.ciphers.lookup(algorithm)?;
        let key = fit_key(key, cipher.expected_key_size());

        let header = CryptoHeader {
            package_name: self.package_name.clone(),
            revision: NEWEST_SUPPORTED_REVISION,
            algorithm: cipher.name().to_string(),
            nonce: Vec::new(),
            kdf: KDF_NONE.to_string(),
            salt: None,
            cost: String::new(),
            compression: compression.map(|c| c.name().to_string()),
        };
        self.seal(header, cipher.as_ref(), &key, message, compression)
    }

    fn seal(
        &self,
        mut header: CryptoHeader,
        cipher: &dyn SymmetricCipher,
        key: &[u8],
        message: &[u8],
        compression: Option<Compression>,
    ) -> CryptoResult<Vec<u8>> {
        let compressed;
        let plaintext = match compression {
            Some(codec) => {
                compressed = Zeroizing::new(codec.compress(message)?);
                compressed.as_slice()
            }
            None => message,
        };
        header.nonce = self.random.random_bytes(cipher.expected_nonce_size());
        let sealed = cipher.encrypt(plaintext, key, &header.nonce)?;
        let blob = envelope::pack(&header, &sealed)?;

        debug!(
            algorithm = %header.algorithm,
            kdf = %header.kdf,
            compression = ?header.compression,
            plain_bytes = message.len(),
            blob_bytes = blob.len(),
            "sealed envelope"
        );
        Ok(blob)
    }

    /// Decrypt a password-sealed envelope.
    ///
    /// Malformed blobs, newer revisions and unknown algorithms fail before any
    /// key is derived; a wrong password is `DecryptionFailed`.
    pub fn decrypt_with_password(&self, blob: &[u8], password: &SecretString) -> CryptoResult<Vec<u8>> {
        let (header, sealed) = envelope::unpack(blob, &self.package_name)?;
        let cipher = self.ciphers.lookup(&header.algorithm)?;
        let compression = header_compression(&header)?;

        if header.kdf == KDF_NONE {
            // sealed with a raw key, no password opens it
            return Err(CryptoError::DecryptionFailed);
        }
        let kdf = self.kdfs.lookup(&header.kdf)?;
        let salt = header.salt.as_deref().ok_or_else(|| {
            CryptoError::InvalidCipherFormat(format!("{} envelope without salt", header.kdf))
        })?;
        let key = kdf.derive_key(password, cipher.expected_key_size(), salt, &header.cost)?;

        open(cipher.as_ref(), &key, &header.nonce, sealed, compression)
    }

    /// Decrypt a raw-key envelope.
    pub fn decrypt_with_key(&self, blob: &[u8], key: &[u8]) -> CryptoResult<Vec<u8>> {
        let (header, sealed) = envelope::unpack(blob, &self.package_name)?;
        let cipher = self.ciphers.lookup(&header.algorithm)?;
        let compression = header_compression(&header)?;

        if header.kdf != KDF_NONE {
            return Err(CryptoError::DecryptionFailed);
        }
        let key = fit_key(key, cipher.expected_key_size());
        open(cipher.as_ref(), &key, &header.nonce, sealed, compression)
    }

    /// Parse and return the header without decrypting.
    pub fn inspect(&self, blob: &[u8]) -> CryptoResult<CryptoHeader> {
        envelope::unpack(blob, &self.package_name).map(|(header, _)| header)
    }
}

impl std::fmt::Debug for Cryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cryptor")
            .field("package_name", &self.package_name)
            .field("ciphers", &self.ciphers)
            .field("kdfs", &self.kdfs)
            .finish_non_exhaustive()
    }
}

fn header_compression(header: &CryptoHeader) -> CryptoResult<Option<Compression>> {
    header
        .compression
        .as_deref()
        .map(Compression::from_name)
        .transpose()
}

fn open(
    cipher: &dyn SymmetricCipher,
    key: &[u8],
    nonce: &[u8],
    sealed: &[u8],
    compression: Option<Compression>,
) -> CryptoResult<Vec<u8>> {
    if nonce.len() != cipher.expected_nonce_size() {
        return Err(CryptoError::InvalidCipherFormat(format!(
            "nonce is {} bytes, {} expects {}",
            nonce.len(),
            cipher.name(),
            cipher.expected_nonce_size()
        )));
    }
    let plaintext = cipher.decrypt(sealed, key, nonce)?;
    match compression {
        Some(codec) => codec.decompress(&Zeroizing::new(plaintext)),
        None => Ok(plaintext),
    }
}

/// Truncate or zero-pad `key` to exactly `size` bytes.
pub fn fit_key(key: &[u8], size: usize) -> Zeroizing<Vec<u8>> {
    let mut fitted = Zeroizing::new(vec![0u8; size]);
    let n = key.len().min(size);
    fitted[..n].copy_from_slice(&key[..n]);
    fitted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::{AES256_GCM, CHACHA20_POLY1305, XCHACHA20_POLY1305};
    use crate::kdf::{KdfParams, ARGON2I, ARGON2ID};
    use crate::random::SeededRandom;

    fn fast_cryptor() -> Cryptor {
        let fast = KdfParams {
            mem_cost_kib: 64,
            time_cost: 1,
            parallelism: 1,
        };
        Cryptor::new(
            "nsync",
            CipherRegistry::with_defaults(),
            KdfRegistry::with_argon2_tiers(fast, fast, fast),
            Arc::new(SeededRandom::new(1)),
        )
    }

    fn pw(s: &str) -> SecretString {
        SecretString::from(s)
    }

    #[test]
    fn test_password_roundtrip_all_algorithms() {
        let cryptor = fast_cryptor();
        for algorithm in [XCHACHA20_POLY1305, CHACHA20_POLY1305, AES256_GCM] {
            for kdf in [ARGON2ID, ARGON2I] {
                for compression in [None, Some(Compression::Gzip), Some(Compression::Zstd)] {
                    let blob = cryptor
                        .encrypt_with_password(
                            b"<p>note</p>",
                            &pw("correct horse"),
                            CostTier::Low,
                            algorithm,
                            kdf,
                            compression,
                        )
                        .unwrap();
                    let header = cryptor.inspect(&blob).unwrap();
                    assert_eq!(header.algorithm, algorithm);
                    assert_eq!(header.kdf, kdf);
                    assert_eq!(header.revision, NEWEST_SUPPORTED_REVISION);
                    assert_eq!(header.compression.as_deref(), compression.map(|c| c.name()));
                    assert_eq!(
                        cryptor.decrypt_with_password(&blob, &pw("correct horse")).unwrap(),
                        b"<p>note</p>"
                    );
                }
            }
        }
    }

    #[test]
    fn test_gzip_envelope_roundtrip() {
        let cryptor = fast_cryptor();
        let note = b"<p>shopping list</p>".repeat(50);

        let blob = cryptor
            .encrypt_with_password(
                &note,
                &pw("correct horse"),
                CostTier::Low,
                XCHACHA20_POLY1305,
                ARGON2ID,
                Some(Compression::Gzip),
            )
            .unwrap();
        assert_eq!(cryptor.inspect(&blob).unwrap().compression.as_deref(), Some("gzip"));
        assert!(blob.len() < note.len(), "compressed before encryption");
        assert_eq!(cryptor.decrypt_with_password(&blob, &pw("correct horse")).unwrap(), note);

        let blob = cryptor
            .encrypt_with_key(&note, &[9u8; 32], CHACHA20_POLY1305, Some(Compression::Gzip))
            .unwrap();
        assert_eq!(cryptor.decrypt_with_key(&blob, &[9u8; 32]).unwrap(), note);
    }

    #[test]
    fn test_wrong_password() {
        let cryptor = fast_cryptor();
        let blob = cryptor
            .encrypt_with_password(b"m", &pw("qqqqqqqq"), CostTier::Low, XCHACHA20_POLY1305, ARGON2ID, None)
            .unwrap();
        assert!(matches!(
            cryptor.decrypt_with_password(&blob, &pw("xyz12345")),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_weak_password() {
        let cryptor = fast_cryptor();
        let err = cryptor
            .encrypt_with_password(b"m", &pw("abcd"), CostTier::Low, XCHACHA20_POLY1305, ARGON2ID, None)
            .unwrap_err();
        assert!(matches!(err, CryptoError::WeakPassword { min: MIN_PASSWORD_LENGTH }));
    }

    #[test]
    fn test_unknown_algorithm() {
        let cryptor = fast_cryptor();
        assert!(matches!(
            cryptor.encrypt_with_password(b"m", &pw("abcdef"), CostTier::Low, "rot13", ARGON2ID, None),
            Err(CryptoError::UnknownAlgorithm(_))
        ));

        let blob = b"nsync v=2$rot13$AA==$argon2id$AQ==$m=64,t=1,p=1$$x";
        assert!(matches!(
            cryptor.decrypt_with_password(blob, &pw("abcdef")),
            Err(CryptoError::UnknownAlgorithm(_))
        ));
    }

    #[test]
    fn test_three_distinct_failure_kinds() {
        let cryptor = fast_cryptor();
        let blob = cryptor
            .encrypt_with_password(b"m", &pw("abcdef"), CostTier::Low, XCHACHA20_POLY1305, ARGON2ID, None)
            .unwrap();

        let mut wrong_tag = blob.clone();
        wrong_tag[0] = b'X';
        assert!(matches!(
            cryptor.decrypt_with_password(&wrong_tag, &pw("abcdef")),
            Err(CryptoError::InvalidCipherFormat(_))
        ));

        let newer = String::from_utf8_lossy(&blob).replacen("nsync v=2", "nsync v=3", 1);
        assert!(matches!(
            cryptor.decrypt_with_password(newer.as_bytes(), &pw("abcdef")),
            Err(CryptoError::UnsupportedRevision { found: 3, .. })
        ));

        let mut tampered = blob.clone();
        let last = tampered.len() - 1;
        tampered[last] ^= 0x01;
        assert!(matches!(
            cryptor.decrypt_with_password(&tampered, &pw("abcdef")),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_raw_key_roundtrip_and_fitting() {
        let cryptor = fast_cryptor();
        let long_key = [7u8; 48];
        let blob = cryptor
            .encrypt_with_key(b"safe note", &long_key, AES256_GCM, Some(Compression::Zstd))
            .unwrap();
        let header = cryptor.inspect(&blob).unwrap();
        assert_eq!(header.kdf, KDF_NONE);
        assert_eq!(header.salt, None);
        assert_eq!(header.cost, "");

        // only the first 32 bytes matter
        assert_eq!(cryptor.decrypt_with_key(&blob, &[7u8; 32]).unwrap(), b"safe note");
        assert!(matches!(
            cryptor.decrypt_with_key(&blob, &[8u8; 32]),
            Err(CryptoError::DecryptionFailed)
        ));
        assert!(matches!(
            cryptor.decrypt_with_password(&blob, &pw("abcdef")),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_fit_key() {
        assert_eq!(*fit_key(&[1, 2, 3], 5), vec![1, 2, 3, 0, 0]);
        assert_eq!(*fit_key(&[1, 2, 3, 4, 5, 6], 4), vec![1, 2, 3, 4]);
        assert_eq!(*fit_key(&[], 2), vec![0, 0]);
    }

    #[test]
    fn test_fresh_nonce_and_salt_per_call() {
        let cryptor = fast_cryptor();
        let seal = || {
            cryptor
                .encrypt_with_password(b"m", &pw("abcdef"), CostTier::Low, XCHACHA20_POLY1305, ARGON2ID, None)
                .unwrap()
        };
        let a = cryptor.inspect(&seal()).unwrap();
        let b = cryptor.inspect(&seal()).unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.salt, b.salt);
    }

    #[test]
    fn test_seeded_random_is_deterministic() {
        let seal = || {
            fast_cryptor()
                .encrypt_with_key(b"m", &[1u8; 32], CHACHA20_POLY1305, None)
                .unwrap()
        };
        assert_eq!(seal(), seal());
    }
}
