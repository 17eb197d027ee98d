//! nsync-crypto: the encryption envelope used for every blob that leaves a device
//!
//! Pipeline (encrypt): plaintext → optional gzip/zstd → AEAD under a derived key → envelope
//!
//! Envelope layout (revision 2, `$` delimited, cipher appended raw):
//! ```text
//! <package> v=2$<algorithm>$<b64 nonce>$<kdf>$<b64 salt>$<cost>$<compression>$<cipher bytes>
//! ```
//! Revision 1 envelopes lack the ` v=` suffix and the compression field.
//!
//! Algorithms are looked up by name in registries injected into the [`Cryptor`],
//! so a header naming anything outside the registry is rejected up front.

pub mod cipher;
pub mod compression;
pub mod cryptor;
pub mod envelope;
pub mod error;
pub mod kdf;
pub mod random;
pub mod safe;

pub use cipher::{CipherRegistry, SymmetricCipher, AES256_GCM, CHACHA20_POLY1305, XCHACHA20_POLY1305};
pub use compression::{Compression, GZIP, ZSTD};
pub use cryptor::{fit_key, Cryptor, MIN_PASSWORD_LENGTH};
pub use envelope::{pack, unpack, CryptoHeader, DELIMITER, NEWEST_SUPPORTED_REVISION};
pub use error::{CryptoError, CryptoResult};
pub use kdf::{Argon2Kdf, CostTier, KdfParams, KdfRegistry, KeyDerivationFunction, ARGON2I, ARGON2ID, KDF_NONE};
pub use random::{OsRandom, RandomSource, SeededRandom};
pub use safe::{SafeKey, SAFE_KEY_SIZE};

/// Default symmetric cipher name
pub const DEFAULT_ALGORITHM: &str = cipher::XCHACHA20_POLY1305;

/// Default key derivation function name
pub const DEFAULT_KDF: &str = kdf::ARGON2ID;
