//! Safe keys: a random per-safe key, stored sealed under the safe password,
//! that encrypts the content of the notes living in that safe.
//!
//! Both the sealed key and encrypted note content are envelopes wrapped in
//! base64 so they can sit in the JSON repository as plain strings.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use secrecy::SecretString;
use zeroize::Zeroizing;

use crate::compression::Compression;
use crate::cryptor::Cryptor;
use crate::error::{CryptoError, CryptoResult};
use crate::kdf::CostTier;
use crate::{DEFAULT_ALGORITHM, DEFAULT_KDF};

/// Size of a safe key in bytes (256-bit)
pub const SAFE_KEY_SIZE: usize = 32;

/// An open safe key. Zeroized on drop.
#[derive(Clone)]
pub struct SafeKey {
    bytes: Zeroizing<Vec<u8>>,
}

impl SafeKey {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            bytes: Zeroizing::new(bytes.to_vec()),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Draw a fresh key from the cryptor's random source.
    pub fn generate(cryptor: &Cryptor) -> Self {
        Self {
            bytes: Zeroizing::new(cryptor.random().random_bytes(SAFE_KEY_SIZE)),
        }
    }

    /// Seal this key under `password` for storage in the repository.
    pub fn seal(&self, cryptor: &Cryptor, password: &SecretString) -> CryptoResult<String> {
        let blob = cryptor.encrypt_with_password(
            &self.bytes,
            password,
            CostTier::Default,
            DEFAULT_ALGORITHM,
            DEFAULT_KDF,
            None,
        )?;
        Ok(B64.encode(blob))
    }

    /// Open a key produced by [`seal`](Self::seal). A wrong password is `DecryptionFailed`.
    pub fn open(cryptor: &Cryptor, serialized: &str, password: &SecretString) -> CryptoResult<Self> {
        let blob = decode(serialized)?;
        let bytes = Zeroizing::new(cryptor.decrypt_with_password(&blob, password)?);
        if bytes.len() != SAFE_KEY_SIZE {
            return Err(CryptoError::InvalidCipherFormat(format!(
                "safe key is {} bytes",
                bytes.len()
            )));
        }
        Ok(Self { bytes })
    }

    /// Encrypt note content under this key.
    pub fn encrypt_note(&self, cryptor: &Cryptor, html: &str) -> CryptoResult<String> {
        let blob = cryptor.encrypt_with_key(
            html.as_bytes(),
            &self.bytes,
            DEFAULT_ALGORITHM,
            Some(Compression::Zstd),
        )?;
        Ok(B64.encode(blob))
    }

    pub fn decrypt_note(&self, cryptor: &Cryptor, cipher: &str) -> CryptoResult<String> {
        let blob = decode(cipher)?;
        let plain = cryptor.decrypt_with_key(&blob, &self.bytes)?;
        String::from_utf8(plain)
            .map_err(|_| CryptoError::InvalidCipherFormat("note content is not UTF-8".into()))
    }
}

impl std::fmt::Debug for SafeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SafeKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

fn decode(text: &str) -> CryptoResult<Vec<u8>> {
    B64.decode(text.trim())
        .map_err(|e| CryptoError::InvalidCipherFormat(format!("base64: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::CipherRegistry;
    use crate::kdf::{KdfParams, KdfRegistry};
    use crate::random::SeededRandom;
    use std::sync::Arc;

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
            Arc::new(SeededRandom::new(5)),
        )
    }

    #[test]
    fn test_seal_open_key() {
        let cryptor = fast_cryptor();
        let key = SafeKey::generate(&cryptor);
        assert_eq!(key.as_bytes().len(), SAFE_KEY_SIZE);

        let sealed = key.seal(&cryptor, &SecretString::from("safe-pass")).unwrap();
        let opened = SafeKey::open(&cryptor, &sealed, &SecretString::from("safe-pass")).unwrap();
        assert_eq!(opened.as_bytes(), key.as_bytes());

        assert!(matches!(
            SafeKey::open(&cryptor, &sealed, &SecretString::from("wrong-pass")),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_note_content() {
        let cryptor = fast_cryptor();
        let key = SafeKey::generate(&cryptor);
        let cipher = key.encrypt_note(&cryptor, "<p>pin: 1234</p>").unwrap();
        assert!(!cipher.contains("1234"));
        assert_eq!(key.decrypt_note(&cryptor, &cipher).unwrap(), "<p>pin: 1234</p>");

        let other = SafeKey::generate(&cryptor);
        assert!(matches!(
            other.decrypt_note(&cryptor, &cipher),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_garbage_serialized_key() {
        let cryptor = fast_cryptor();
        assert!(matches!(
            SafeKey::open(&cryptor, "%%%", &SecretString::from("safe-pass")),
            Err(CryptoError::InvalidCipherFormat(_))
        ));
    }

    #[test]
    fn test_debug_redacts() {
        let key = SafeKey::from_bytes(&[0xAB; 32]);
        let shown = format!("{key:?}");
        assert!(shown.contains("REDACTED"));
        assert!(!shown.contains("171"));
    }
}
