//! Envelope codec: a `$`-delimited text header followed by the raw cipher.
//!
//! There is no length prefix. The header ends at the k-th delimiter counted
//! from the start of the blob (6 for revision 1, 7 from revision 2 on), so the
//! cipher bytes may contain the delimiter freely. Header fields never do: names
//! come from closed registries and binary fields are base64 encoded, and
//! [`pack`] rejects anything else.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;

use crate::error::{CryptoError, CryptoResult};

pub const DELIMITER: u8 = b'$';

/// Highest revision this codec reads and the one it writes.
pub const NEWEST_SUPPORTED_REVISION: u32 = 2;

const REVISION_MARKER: &[u8] = b" v=";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoHeader {
    pub package_name: String,
    pub revision: u32,
    pub algorithm: String,
    pub nonce: Vec<u8>,
    pub kdf: String,
    /// `None` for raw-key envelopes
    pub salt: Option<Vec<u8>>,
    /// KDF specific; empty for raw-key envelopes
    pub cost: String,
    /// Codec applied before encryption; always `None` in revision 1
    pub compression: Option<String>,
}

impl CryptoHeader {
    fn delimiter_count(revision: u32) -> usize {
        if revision == 1 {
            6
        } else {
            7
        }
    }
}

/// Serialize `header` and append `cipher` unchanged.
pub fn pack(header: &CryptoHeader, cipher: &[u8]) -> CryptoResult<Vec<u8>> {
    validate(header)?;

    let delim = DELIMITER as char;
    let mut text = header.package_name.clone();
    if header.revision >= 2 {
        text.push_str(&format!(" v={}", header.revision));
    }
    let salt = header.salt.as_deref().map(|s| B64.encode(s)).unwrap_or_default();
    let mut fields = vec![
        header.algorithm.clone(),
        B64.encode(&header.nonce),
        header.kdf.clone(),
        salt,
        header.cost.clone(),
    ];
    if header.revision >= 2 {
        fields.push(header.compression.clone().unwrap_or_default());
    }
    for field in fields {
        text.push(delim);
        text.push_str(&field);
    }
    text.push(delim);

    let mut blob = Vec::with_capacity(text.len() + cipher.len());
    blob.extend_from_slice(text.as_bytes());
    blob.extend_from_slice(cipher);
    Ok(blob)
}

fn validate(header: &CryptoHeader) -> CryptoResult<()> {
    if header.revision == 0 || header.revision > NEWEST_SUPPORTED_REVISION {
        return Err(CryptoError::Validation(format!(
            "cannot write envelope revision {}",
            header.revision
        )));
    }
    if header.package_name.is_empty()
        || header.package_name.as_bytes().windows(REVISION_MARKER.len()).any(|w| w == REVISION_MARKER)
    {
        return Err(CryptoError::Validation(format!(
            "invalid package name {:?}",
            header.package_name
        )));
    }
    if header.algorithm.is_empty() || header.kdf.is_empty() {
        return Err(CryptoError::Validation("algorithm and kdf must be named".into()));
    }
    if matches!(&header.salt, Some(s) if s.is_empty()) {
        return Err(CryptoError::Validation("salt must be absent or non-empty".into()));
    }
    match (&header.compression, header.revision) {
        (Some(c), _) if c.is_empty() => {
            return Err(CryptoError::Validation(
                "compression must be absent or named".into(),
            ))
        }
        (Some(_), 1) => {
            return Err(CryptoError::Validation(
                "revision 1 envelopes carry no compression".into(),
            ))
        }
        _ => {}
    }

    let text_fields = [
        ("package name", header.package_name.as_str()),
        ("algorithm", header.algorithm.as_str()),
        ("kdf", header.kdf.as_str()),
        ("cost", header.cost.as_str()),
        ("compression", header.compression.as_deref().unwrap_or_default()),
    ];
    for (label, value) in text_fields {
        if value.as_bytes().contains(&DELIMITER) {
            return Err(CryptoError::Validation(format!(
                "{label} must not contain the envelope delimiter"
            )));
        }
    }
    Ok(())
}

/// Split `blob` into its header and the borrowed cipher bytes.
///
/// The package tag is checked before any other field is looked at.
pub fn unpack<'a>(blob: &'a [u8], expected_package: &str) -> CryptoResult<(CryptoHeader, &'a [u8])> {
    let revision = read_revision(blob, expected_package)?;

    let wanted = CryptoHeader::delimiter_count(revision);
    let boundary = blob
        .iter()
        .enumerate()
        .filter(|(_, b)| **b == DELIMITER)
        .map(|(i, _)| i)
        .nth(wanted - 1)
        .ok_or_else(|| {
            CryptoError::InvalidCipherFormat(format!(
                "header truncated: expected {wanted} delimiters"
            ))
        })?;

    let text = std::str::from_utf8(&blob[..boundary])
        .map_err(|_| CryptoError::InvalidCipherFormat("header is not UTF-8".into()))?;
    let fields: Vec<&str> = text.split(DELIMITER as char).collect();
    // fields[0] is the package tag already checked by read_revision
    let algorithm = non_empty(fields[1], "algorithm")?;
    let nonce = B64
        .decode(fields[2])
        .map_err(|e| CryptoError::InvalidCipherFormat(format!("nonce: {e}")))?;
    let kdf = non_empty(fields[3], "kdf")?;
    let salt = match fields[4] {
        "" => None,
        encoded => Some(
            B64.decode(encoded)
                .map_err(|e| CryptoError::InvalidCipherFormat(format!("salt: {e}")))?,
        ),
    };
    let cost = fields[5].to_string();
    let compression = match fields.get(6) {
        Some(name) if !name.is_empty() => Some(name.to_string()),
        _ => None,
    };

    let header = CryptoHeader {
        package_name: expected_package.to_string(),
        revision,
        algorithm,
        nonce,
        kdf,
        salt,
        cost,
        compression,
    };
    Ok((header, &blob[boundary + 1..]))
}

fn read_revision(blob: &[u8], expected_package: &str) -> CryptoResult<u32> {
    if expected_package.is_empty() || expected_package.as_bytes().contains(&DELIMITER) {
        return Err(CryptoError::Validation(format!(
            "invalid package name {expected_package:?}"
        )));
    }
    let rest = blob
        .strip_prefix(expected_package.as_bytes())
        .ok_or_else(|| CryptoError::InvalidCipherFormat("package tag mismatch".into()))?;

    if rest.first() == Some(&DELIMITER) {
        return Ok(1);
    }
    let digits_and_more = rest
        .strip_prefix(REVISION_MARKER)
        .ok_or_else(|| CryptoError::InvalidCipherFormat("package tag mismatch".into()))?;
    let digits_len = digits_and_more
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits_len == 0 || digits_and_more.get(digits_len) != Some(&DELIMITER) {
        return Err(CryptoError::InvalidCipherFormat("malformed revision".into()));
    }
    // all ASCII digits: the only possible parse failure is overflow, which is
    // a revision newer than any this codec knows
    let found: u64 = std::str::from_utf8(&digits_and_more[..digits_len])
        .ok()
        .and_then(|d| d.parse().ok())
        .unwrap_or(u64::MAX);

    if found == 0 {
        return Err(CryptoError::InvalidCipherFormat("revision 0".into()));
    }
    if found > u64::from(NEWEST_SUPPORTED_REVISION) {
        return Err(CryptoError::UnsupportedRevision {
            found,
            supported: NEWEST_SUPPORTED_REVISION,
        });
    }
    Ok(found as u32)
}

fn non_empty(field: &str, label: &str) -> CryptoResult<String> {
    if field.is_empty() {
        Err(CryptoError::InvalidCipherFormat(format!("{label} is empty")))
    } else {
        Ok(field.to_string())
    }
}
