//! Named AEAD ciphers and the registry that resolves envelope algorithm names.
//!
//! Every cipher is authenticated: a flipped bit anywhere in the cipher text
//! surfaces as [`CryptoError::DecryptionFailed`], never as wrong plaintext.

use aes_gcm::Aes256Gcm;
use chacha20poly1305::aead::{Aead, KeyInit, Nonce};
use chacha20poly1305::{ChaCha20Poly1305, XChaCha20Poly1305};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{CryptoError, CryptoResult};

pub const XCHACHA20_POLY1305: &str = "xchacha20-poly1305";
pub const CHACHA20_POLY1305: &str = "chacha20-poly1305";
pub const AES256_GCM: &str = "aes256-gcm";

/// Size of a Poly1305 / GCM authentication tag
pub const TAG_SIZE: usize = 16;

pub trait SymmetricCipher: Send + Sync {
    fn name(&self) -> &'static str;
    fn expected_key_size(&self) -> usize;
    fn expected_nonce_size(&self) -> usize;
    fn encrypt(&self, plaintext: &[u8], key: &[u8], nonce: &[u8]) -> CryptoResult<Vec<u8>>;
    fn decrypt(&self, cipher: &[u8], key: &[u8], nonce: &[u8]) -> CryptoResult<Vec<u8>>;
}

/// XChaCha20-Poly1305: 256-bit key, 192-bit nonce (safe to pick at random).
#[derive(Debug, Default, Clone, Copy)]
pub struct XChaCha20Poly1305Cipher;

/// ChaCha20-Poly1305 (RFC 8439): 256-bit key, 96-bit nonce.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChaCha20Poly1305Cipher;

/// AES-256-GCM: 256-bit key, 96-bit nonce.
#[derive(Debug, Default, Clone, Copy)]
pub struct Aes256GcmCipher;

impl SymmetricCipher for XChaCha20Poly1305Cipher {
    fn name(&self) -> &'static str {
        XCHACHA20_POLY1305
    }
    fn expected_key_size(&self) -> usize {
        32
    }
    fn expected_nonce_size(&self) -> usize {
        24
    }
    fn encrypt(&self, plaintext: &[u8], key: &[u8], nonce: &[u8]) -> CryptoResult<Vec<u8>> {
        check_sizes(self, key, nonce)?;
        seal::<XChaCha20Poly1305>(key, nonce, plaintext)
    }
    fn decrypt(&self, cipher: &[u8], key: &[u8], nonce: &[u8]) -> CryptoResult<Vec<u8>> {
        check_sizes(self, key, nonce)?;
        open::<XChaCha20Poly1305>(key, nonce, cipher)
    }
}

impl SymmetricCipher for ChaCha20Poly1305Cipher {
    fn name(&self) -> &'static str {
        CHACHA20_POLY1305
    }
    fn expected_key_size(&self) -> usize {
        32
    }
    fn expected_nonce_size(&self) -> usize {
        12
    }
    fn encrypt(&self, plaintext: &[u8], key: &[u8], nonce: &[u8]) -> CryptoResult<Vec<u8>> {
        check_sizes(self, key, nonce)?;
        seal::<ChaCha20Poly1305>(key, nonce, plaintext)
    }
    fn decrypt(&self, cipher: &[u8], key: &[u8], nonce: &[u8]) -> CryptoResult<Vec<u8>> {
        check_sizes(self, key, nonce)?;
        open::<ChaCha20Poly1305>(key, nonce, cipher)
    }
}

impl SymmetricCipher for Aes256GcmCipher {
    fn name(&self) -> &'static str {
        AES256_GCM
    }
    fn expected_key_size(&self) -> usize {
        32
    }
    fn expected_nonce_size(&self) -> usize {
        12
    }
    fn encrypt(&self, plaintext: &[u8], key: &[u8], nonce: &[u8]) -> CryptoResult<Vec<u8>> {
        check_sizes(self, key, nonce)?;
        seal::<Aes256Gcm>(key, nonce, plaintext)
    }
    fn decrypt(&self, cipher: &[u8], key: &[u8], nonce: &[u8]) -> CryptoResult<Vec<u8>> {
        check_sizes(self, key, nonce)?;
        open::<Aes256Gcm>(key, nonce, cipher)
    }
}

fn check_sizes(cipher: &dyn SymmetricCipher, key: &[u8], nonce: &[u8]) -> CryptoResult<()> {
    if key.len() != cipher.expected_key_size() {
        return Err(CryptoError::Validation(format!(
            "{}: key is {} bytes, expected {}",
            cipher.name(),
            key.len(),
            cipher.expected_key_size()
        )));
    }
    if nonce.len() != cipher.expected_nonce_size() {
        return Err(CryptoError::Validation(format!(
            "{}: nonce is {} bytes, expected {}",
            cipher.name(),
            nonce.len(),
            cipher.expected_nonce_size()
        )));
    }
    Ok(())
}

fn seal<A: Aead + KeyInit>(key: &[u8], nonce: &[u8], plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    let cipher = A::new_from_slice(key)
        .map_err(|e| CryptoError::Validation(format!("invalid key: {e}")))?;
    cipher
        .encrypt(Nonce::<A>::from_slice(nonce), plaintext)
        .map_err(|e| CryptoError::Validation(format!("encryption failed: {e}")))
}

fn open<A: Aead + KeyInit>(key: &[u8], nonce: &[u8], cipher_text: &[u8]) -> CryptoResult<Vec<u8>> {
    if cipher_text.len() < TAG_SIZE {
        return Err(CryptoError::DecryptionFailed);
    }
    let cipher = A::new_from_slice(key)
        .map_err(|e| CryptoError::Validation(format!("invalid key: {e}")))?;
    cipher
        .decrypt(Nonce::<A>::from_slice(nonce), cipher_text)
        .map_err(|_| CryptoError::DecryptionFailed)
}

/// Name → cipher lookup table.
#[derive(Clone, Default)]
pub struct CipherRegistry {
    by_name: BTreeMap<&'static str, Arc<dyn SymmetricCipher>>,
}

impl CipherRegistry {
    /// An empty registry; add ciphers with [`register`](Self::register).
    pub fn new() -> Self {
        Self::default()
    }

    /// All built-in ciphers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(XChaCha20Poly1305Cipher));
        registry.register(Arc::new(ChaCha20Poly1305Cipher));
        registry.register(Arc::new(Aes256GcmCipher));
        registry
    }

    pub fn register(&mut self, cipher: Arc<dyn SymmetricCipher>) {
        self.by_name.insert(cipher.name(), cipher);
    }

    pub fn lookup(&self, name: &str) -> CryptoResult<Arc<dyn SymmetricCipher>> {
        self.by_name
            .get(name)
            .cloned()
            .ok_or_else(|| CryptoError::UnknownAlgorithm(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.by_name.keys().copied()
    }
}

impl std::fmt::Debug for CipherRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.by_name.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_ciphers() -> Vec<Arc<dyn SymmetricCipher>> {
        let registry = CipherRegistry::with_defaults();
        registry
            .names()
            .map(|name| registry.lookup(name).unwrap())
            .collect()
    }

    fn material(cipher: &dyn SymmetricCipher) -> (Vec<u8>, Vec<u8>) {
        (
            vec![0x42; cipher.expected_key_size()],
            vec![0x07; cipher.expected_nonce_size()],
        )
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        for cipher in all_ciphers() {
            let (key, nonce) = material(cipher.as_ref());
            let sealed = cipher.encrypt(b"hello, encrypted world!", &key, &nonce).unwrap();
            assert_eq!(sealed.len(), 23 + TAG_SIZE, "{}", cipher.name());
            let opened = cipher.decrypt(&sealed, &key, &nonce).unwrap();
            assert_eq!(opened, b"hello, encrypted world!");
        }
    }

    #[test]
    fn test_encrypt_decrypt_empty() {
        for cipher in all_ciphers() {
            let (key, nonce) = material(cipher.as_ref());
            let sealed = cipher.encrypt(b"", &key, &nonce).unwrap();
            assert_eq!(cipher.decrypt(&sealed, &key, &nonce).unwrap(), b"");
        }
    }

    #[test]
    fn test_decrypt_wrong_key() {
        for cipher in all_ciphers() {
            let (key, nonce) = material(cipher.as_ref());
            let sealed = cipher.encrypt(b"secret data", &key, &nonce).unwrap();
            let wrong = vec![0x43; key.len()];
            assert!(matches!(
                cipher.decrypt(&sealed, &wrong, &nonce),
                Err(CryptoError::DecryptionFailed)
            ));
        }
    }

    #[test]
    fn test_tampered_ciphertext() {
        for cipher in all_ciphers() {
            let (key, nonce) = material(cipher.as_ref());
            let mut sealed = cipher.encrypt(b"secret data", &key, &nonce).unwrap();
            sealed[3] ^= 0xFF;
            assert!(
                matches!(
                    cipher.decrypt(&sealed, &key, &nonce),
                    Err(CryptoError::DecryptionFailed)
                ),
                "tampered cipher must fail for {}",
                cipher.name()
            );
        }
    }

    #[test]
    fn test_truncated_ciphertext() {
        let cipher = XChaCha20Poly1305Cipher;
        let (key, nonce) = material(&cipher);
        assert!(matches!(
            cipher.decrypt(&[1, 2, 3], &key, &nonce),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_rejects_wrong_sizes() {
        let cipher = Aes256GcmCipher;
        assert!(matches!(
            cipher.encrypt(b"x", &[0u8; 16], &[0u8; 12]),
            Err(CryptoError::Validation(_))
        ));
        assert!(matches!(
            cipher.encrypt(b"x", &[0u8; 32], &[0u8; 24]),
            Err(CryptoError::Validation(_))
        ));
    }

    #[test]
    fn test_registry_lookup() {
        let registry = CipherRegistry::with_defaults();
        assert_eq!(registry.lookup(AES256_GCM).unwrap().name(), AES256_GCM);
        assert_eq!(registry.lookup(XCHACHA20_POLY1305).unwrap().expected_nonce_size(), 24);
        match registry.lookup("twofish-gcm") {
            Err(CryptoError::UnknownAlgorithm(name)) => assert_eq!(name, "twofish-gcm"),
            other => panic!("expected UnknownAlgorithm, got {:?}", other.map(|c| c.name())),
        }
    }

    #[test]
    fn test_reduced_registry() {
        let mut registry = CipherRegistry::new();
        registry.register(Arc::new(ChaCha20Poly1305Cipher));
        assert!(registry.lookup(CHACHA20_POLY1305).is_ok());
        assert!(registry.lookup(XCHACHA20_POLY1305).is_err());
    }
}
