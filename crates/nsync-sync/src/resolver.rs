//! Transfer code resolution: find the code that opens a cloud blob.

use nsync_core::TransferCodes;
use nsync_crypto::{CryptoError, CryptoResult, Cryptor};
use secrecy::SecretString;
use tracing::debug;

/// A successful decryption and the code that produced it.
#[derive(Debug)]
pub struct Resolved {
    pub plaintext: Vec<u8>,
    pub code: String,
    /// 1-based position of the winning candidate
    pub attempt: usize,
}

/// Try the candidates in order until one decrypts `blob`.
///
/// A code the user just typed is the only candidate when present. Otherwise
/// the current code is tried first, then the history most recent first.
/// Wrong-key failures move on to the next candidate; any other error aborts
/// the resolution and is returned as is. `Ok(None)` means no candidate fit.
pub fn try_decrypt(
    cryptor: &Cryptor,
    blob: &[u8],
    codes: &TransferCodes,
    entered: Option<&str>,
) -> CryptoResult<Option<Resolved>> {
    let candidates: Vec<&str> = match entered {
        Some(code) => vec![code],
        None => codes.candidates().collect(),
    };

    for (i, code) in candidates.into_iter().enumerate() {
        let attempt = i + 1;
        match cryptor.decrypt_with_password(blob, &SecretString::from(code)) {
            Ok(plaintext) => {
                debug!(attempt, "transfer code accepted");
                return Ok(Some(Resolved {
                    plaintext,
                    code: code.to_string(),
                    attempt,
                }));
            }
            Err(CryptoError::DecryptionFailed) => {
                debug!(attempt, "transfer code rejected");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(None)
}

/// [`try_decrypt`], then make the winning code current.
pub fn resolve_and_promote(
    cryptor: &Cryptor,
    blob: &[u8],
    codes: &mut TransferCodes,
    entered: Option<&str>,
) -> CryptoResult<Option<Resolved>> {
    let resolved = try_decrypt(cryptor, blob, codes, entered)?;
    if let Some(resolved) = &resolved {
        if codes.promote(&resolved.code) {
            debug!(history = codes.history.len(), "promoted transfer code to current");
        }
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nsync_crypto::{
        CipherRegistry, CostTier, KdfParams, KdfRegistry, SeededRandom, ARGON2ID,
        XCHACHA20_POLY1305,
    };
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
            Arc::new(SeededRandom::new(3)),
        )
    }

    fn seal(cryptor: &Cryptor, code: &str) -> Vec<u8> {
        cryptor
            .encrypt_with_password(
                b"{}",
                &SecretString::from(code),
                CostTier::Low,
                XCHACHA20_POLY1305,
                ARGON2ID,
                None,
            )
            .unwrap()
    }

    fn codes(current: &str, history: &[&str]) -> TransferCodes {
        TransferCodes {
            current: Some(current.into()),
            history: history.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_history_code_is_found_and_promoted() {
        let cryptor = fast_cryptor();
        let blob = seal(&cryptor, "CCCCC");
        let mut codes = codes("AAAAA", &["BBBBB", "CCCCC"]);

        let resolved = resolve_and_promote(&cryptor, &blob, &mut codes, None)
            .unwrap()
            .unwrap();
        assert_eq!(resolved.attempt, 3);
        assert_eq!(resolved.code, "CCCCC");
        assert_eq!(resolved.plaintext, b"{}");
        assert_eq!(codes.current.as_deref(), Some("CCCCC"));
        assert_eq!(codes.history, vec!["AAAAA", "BBBBB"]);
    }

    #[test]
    fn test_current_code_first() {
        let cryptor = fast_cryptor();
        let blob = seal(&cryptor, "AAAAA");
        let mut codes = codes("AAAAA", &["BBBBB"]);
        let resolved = resolve_and_promote(&cryptor, &blob, &mut codes, None)
            .unwrap()
            .unwrap();
        assert_eq!(resolved.attempt, 1);
        assert_eq!(codes.history, vec!["BBBBB"], "current code is not re-promoted");
    }

    #[test]
    fn test_entered_code_is_the_only_candidate() {
        let cryptor = fast_cryptor();
        let blob = seal(&cryptor, "AAAAA");
        let codes = codes("AAAAA", &[]);
        assert!(try_decrypt(&cryptor, &blob, &codes, Some("ZZZZZ"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_no_candidate_fits() {
        let cryptor = fast_cryptor();
        let blob = seal(&cryptor, "qqqqqqqq");
        let mut codes = codes("xxxxxxxx", &["yyyyyyyy"]);
        let before = codes.clone();
        assert!(resolve_and_promote(&cryptor, &blob, &mut codes, None)
            .unwrap()
            .is_none());
        assert_eq!(codes, before);
    }

    #[test]
    fn test_format_errors_abort() {
        let cryptor = fast_cryptor();
        let mut blob = seal(&cryptor, "CCCCC");
        blob[0] = b'X';
        let mut codes = codes("AAAAA", &["BBBBB", "CCCCC"]);
        assert!(matches!(
            resolve_and_promote(&cryptor, &blob, &mut codes, None),
            Err(CryptoError::InvalidCipherFormat(_))
        ));
        assert_eq!(codes.current.as_deref(), Some("AAAAA"));

        let newer = b"nsync v=7$xchacha20-poly1305$AA==$argon2id$AQ==$m=64,t=1,p=1$$x";
        assert!(matches!(
            try_decrypt(&cryptor, newer, &codes, None),
            Err(CryptoError::UnsupportedRevision { found: 7, .. })
        ));
    }

    #[test]
    fn test_empty_codes() {
        let cryptor = fast_cryptor();
        let blob = seal(&cryptor, "AAAAA");
        assert!(try_decrypt(&cryptor, &blob, &TransferCodes::default(), None)
            .unwrap()
            .is_none());
    }
}
