//! Plaintext compression applied before encryption.
//!
//! The envelope header names the codec, so a reader decompresses exactly when
//! the writer compressed.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::io::{Read, Write};

use crate::error::{CryptoError, CryptoResult};

pub const GZIP: &str = "gzip";
pub const ZSTD: &str = "zstd";

/// zstd level used when sealing; notes are small HTML so a middling level is enough
const ZSTD_LEVEL: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compression {
    /// Codec of the original envelope format; every reader understands it
    Gzip,
    Zstd,
}

impl Compression {
    pub fn name(&self) -> &'static str {
        match self {
            Compression::Gzip => GZIP,
            Compression::Zstd => ZSTD,
        }
    }

    /// Resolve a header or config name. Unknown names are `UnknownAlgorithm`.
    pub fn from_name(name: &str) -> CryptoResult<Self> {
        match name {
            GZIP => Ok(Compression::Gzip),
            ZSTD => Ok(Compression::Zstd),
            other => Err(CryptoError::UnknownAlgorithm(other.to_string())),
        }
    }

    pub fn compress(&self, data: &[u8]) -> CryptoResult<Vec<u8>> {
        match self {
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
                encoder
                    .write_all(data)
                    .and_then(|_| encoder.finish())
                    .map_err(|e| CryptoError::Validation(format!("gzip compress: {e}")))
            }
            Compression::Zstd => zstd::encode_all(data, ZSTD_LEVEL)
                .map_err(|e| CryptoError::Validation(format!("zstd compress: {e}"))),
        }
    }

    /// Decompress after a successful AEAD open. The input is authenticated, so
    /// a failure here means the writer produced a broken stream.
    pub fn decompress(&self, data: &[u8]) -> CryptoResult<Vec<u8>> {
        match self {
            Compression::Gzip => {
                let mut out = Vec::new();
                GzDecoder::new(data)
                    .read_to_end(&mut out)
                    .map_err(|e| CryptoError::InvalidCipherFormat(format!("gzip decompress: {e}")))?;
                Ok(out)
            }
            Compression::Zstd => zstd::decode_all(data)
                .map_err(|e| CryptoError::InvalidCipherFormat(format!("zstd decompress: {e}"))),
        }
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zstd_roundtrip() {
        let data = b"<p>hello</p>".repeat(200);
        let packed = Compression::Zstd.compress(&data).unwrap();
        assert!(packed.len() < data.len());
        assert_eq!(Compression::Zstd.decompress(&packed).unwrap(), data);
    }

    #[test]
    fn test_gzip_roundtrip() {
        let data = b"<p>hello</p>".repeat(200);
        let packed = Compression::Gzip.compress(&data).unwrap();
        assert!(packed.len() < data.len());
        // gzip magic
        assert_eq!(&packed[..2], &[0x1f, 0x8b]);
        assert_eq!(Compression::Gzip.decompress(&packed).unwrap(), data);
    }

    #[test]
    fn test_names() {
        assert_eq!(Compression::from_name("zstd").unwrap(), Compression::Zstd);
        assert_eq!(Compression::from_name("gzip").unwrap(), Compression::Gzip);
        assert_eq!(Compression::Zstd.to_string(), "zstd");
        assert_eq!(Compression::Gzip.to_string(), "gzip");
        assert!(matches!(
            Compression::from_name("brotli"),
            Err(CryptoError::UnknownAlgorithm(_))
        ));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(Compression::Zstd.decompress(b"not a zstd frame").is_err());
        assert!(matches!(
            Compression::Gzip.decompress(b"not a gzip stream"),
            Err(CryptoError::InvalidCipherFormat(_))
        ));
    }
}
