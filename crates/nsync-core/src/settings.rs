//! Per-device settings persisted next to the local repository.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::transfer_code::TransferCodes;

/// Tokens expiring within this many seconds are refreshed before use.
pub const TOKEN_REFRESH_MARGIN_SECS: u64 = 60;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Cloud storage chosen during first-time setup
    pub credentials: Option<CloudStorageCredentials>,
    pub transfer_codes: TransferCodes,
    /// Unix seconds of the last run that reached a successful exit step
    pub last_synced_at: Option<u64>,
}

/// Everything a cloud client needs to reach the user's storage.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudStorageCredentials {
    /// Which client handles these credentials ("fs", "s3", "webdav", ...)
    pub storage_id: String,
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub token: Option<OAuthToken>,
}

impl std::fmt::Debug for CloudStorageCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudStorageCredentials")
            .field("storage_id", &self.storage_id)
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("token", &self.token)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix seconds
    pub expires_at: Option<u64>,
}

impl OAuthToken {
    /// True when the token is expired or about to expire at `now_secs`.
    pub fn needs_refresh(&self, now_secs: u64) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= now_secs + TOKEN_REFRESH_MARGIN_SECS,
            None => false,
        }
    }
}

impl std::fmt::Debug for OAuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthToken")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Unix seconds, for token expiry bookkeeping.
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_refresh_window() {
        let token = OAuthToken {
            access_token: "a".into(),
            refresh_token: Some("r".into()),
            expires_at: Some(1_000),
        };
        assert!(!token.needs_refresh(1_000 - TOKEN_REFRESH_MARGIN_SECS - 1));
        assert!(token.needs_refresh(1_000 - TOKEN_REFRESH_MARGIN_SECS));
        assert!(token.needs_refresh(2_000));

        let eternal = OAuthToken {
            expires_at: None,
            ..token
        };
        assert!(!eternal.needs_refresh(u64::MAX / 2));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = CloudStorageCredentials {
            storage_id: "webdav".into(),
            username: Some("alice".into()),
            password: Some("hunter22".into()),
            token: Some(OAuthToken {
                access_token: "tok-secret".into(),
                refresh_token: None,
                expires_at: None,
            }),
            ..Default::default()
        };
        let shown = format!("{creds:?}");
        assert!(shown.contains("alice"));
        assert!(!shown.contains("hunter22"));
        assert!(!shown.contains("tok-secret"));
    }

    #[test]
    fn test_settings_json_roundtrip() {
        let mut settings = Settings::default();
        settings.transfer_codes.promote("abcdabcdabcdabcd");
        settings.credentials = Some(CloudStorageCredentials {
            storage_id: "fs".into(),
            url: Some("/tmp/cloud".into()),
            ..Default::default()
        });

        let json = serde_json::to_string(&settings).unwrap();
        let parsed: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn test_settings_tolerates_missing_fields() {
        let parsed: Settings = serde_json::from_str("{}").unwrap();
        assert!(parsed.credentials.is_none());
        assert!(parsed.transfer_codes.is_empty());
    }
}
