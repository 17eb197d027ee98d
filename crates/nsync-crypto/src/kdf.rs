//! Key derivation: password → key, Argon2 with a cost string carried in the envelope

use argon2::{Algorithm, Argon2, Params, Version};
use secrecy::{ExposeSecret, SecretString};
use std::collections::BTreeMap;
use std::sync::Arc;
use zeroize::Zeroizing;

use crate::error::{CryptoError, CryptoResult};

pub const ARGON2ID: &str = "argon2id";
pub const ARGON2I: &str = "argon2i";

/// KDF name written into envelopes sealed with a raw key.
pub const KDF_NONE: &str = "none";

/// Upper bounds accepted from an envelope cost string, so a hostile header
/// cannot make us allocate gigabytes.
pub const MAX_MEM_COST_KIB: u32 = 1 << 20;
pub const MAX_TIME_COST: u32 = 64;
pub const MAX_PARALLELISM: u32 = 16;

/// How expensive a derivation should be.
///
/// `Low` is meant for transfer codes: they are random, so slowing down a
/// guesser buys little and every device pays the cost on each sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CostTier {
    Low,
    Default,
    High,
}

pub trait KeyDerivationFunction: Send + Sync {
    fn name(&self) -> &'static str;
    fn expected_salt_size(&self) -> usize;
    /// Cost string for a tier, in this function's own notation.
    fn recommended_cost(&self, tier: CostTier) -> String;
    fn derive_key(
        &self,
        password: &SecretString,
        key_len: usize,
        salt: &[u8],
        cost: &str,
    ) -> CryptoResult<Zeroizing<Vec<u8>>>;
}

/// Argon2 parameters for KDF, serialized as `m=<KiB>,t=<iterations>,p=<lanes>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    pub mem_cost_kib: u32,
    /// Time cost / iterations (default: 3)
    pub time_cost: u32,
    /// Parallelism (default: 4)
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            mem_cost_kib: 65536,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

impl KdfParams {
    pub fn to_cost_string(&self) -> String {
        format!(
            "m={},t={},p={}",
            self.mem_cost_kib, self.time_cost, self.parallelism
        )
    }

    /// Parse a cost string taken from an envelope header.
    pub fn parse(cost: &str) -> CryptoResult<Self> {
        let bad = || CryptoError::InvalidCipherFormat(format!("invalid argon2 cost: {cost:?}"));

        let (mut m, mut t, mut p) = (None, None, None);
        for part in cost.split(',') {
            let (key, value) = part.split_once('=').ok_or_else(bad)?;
            let value: u32 = value.parse().map_err(|_| bad())?;
            let slot = match key {
                "m" => &mut m,
                "t" => &mut t,
                "p" => &mut p,
                _ => return Err(bad()),
            };
            if slot.replace(value).is_some() {
                return Err(bad());
            }
        }

        let params = KdfParams {
            mem_cost_kib: m.ok_or_else(bad)?,
            time_cost: t.ok_or_else(bad)?,
            parallelism: p.ok_or_else(bad)?,
        };
        if params.mem_cost_kib > MAX_MEM_COST_KIB
            || params.time_cost == 0
            || params.time_cost > MAX_TIME_COST
            || params.parallelism == 0
            || params.parallelism > MAX_PARALLELISM
        {
            return Err(bad());
        }
        Ok(params)
    }
}

/// Argon2 (id or i variant) with configurable cost tiers.
#[derive(Debug, Clone)]
pub struct Argon2Kdf {
    name: &'static str,
    algorithm: Algorithm,
    low: KdfParams,
    default: KdfParams,
    high: KdfParams,
}

impl Argon2Kdf {
    pub fn argon2id() -> Self {
        Self::with_algorithm(ARGON2ID, Algorithm::Argon2id)
    }

    pub fn argon2i() -> Self {
        Self::with_algorithm(ARGON2I, Algorithm::Argon2i)
    }

    fn with_algorithm(name: &'static str, algorithm: Algorithm) -> Self {
        Self {
            name,
            algorithm,
            low: KdfParams {
                mem_cost_kib: 16384,
                time_cost: 2,
                parallelism: 1,
            },
            default: KdfParams::default(),
            high: KdfParams {
                mem_cost_kib: 131072,
                time_cost: 4,
                parallelism: 4,
            },
        }
    }

    /// Replace the recommended parameters of every tier.
    pub fn with_tiers(mut self, low: KdfParams, default: KdfParams, high: KdfParams) -> Self {
        self.low = low;
        self.default = default;
        self.high = high;
        self
    }
}

impl KeyDerivationFunction for Argon2Kdf {
    fn name(&self) -> &'static str {
        self.name
    }

    fn expected_salt_size(&self) -> usize {
        16
    }

    fn recommended_cost(&self, tier: CostTier) -> String {
        match tier {
            CostTier::Low => self.low,
            CostTier::Default => self.default,
            CostTier::High => self.high,
        }
        .to_cost_string()
    }

    fn derive_key(
        &self,
        password: &SecretString,
        key_len: usize,
        salt: &[u8],
        cost: &str,
    ) -> CryptoResult<Zeroizing<Vec<u8>>> {
        let params = KdfParams::parse(cost)?;
        let argon2_params = Params::new(
            params.mem_cost_kib,
            params.time_cost,
            params.parallelism,
            Some(key_len),
        )
        .map_err(|e| CryptoError::InvalidCipherFormat(format!("invalid Argon2 params: {e}")))?;

        let argon2 = Argon2::new(self.algorithm, Version::V0x13, argon2_params);

        let mut key = Zeroizing::new(vec![0u8; key_len]);
        argon2
            .hash_password_into(password.expose_secret().as_bytes(), salt, &mut key)
            .map_err(|e| CryptoError::Validation(format!("Argon2 KDF failed: {e}")))?;
        Ok(key)
    }
}

/// Name → KDF lookup table.
#[derive(Clone, Default)]
pub struct KdfRegistry {
    by_name: BTreeMap<&'static str, Arc<dyn KeyDerivationFunction>>,
}

impl KdfRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Argon2id and Argon2i with their stock tiers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(Argon2Kdf::argon2id()));
        registry.register(Arc::new(Argon2Kdf::argon2i()));
        registry
    }

    /// Both Argon2 variants sharing one set of tier parameters.
    pub fn with_argon2_tiers(low: KdfParams, default: KdfParams, high: KdfParams) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(Argon2Kdf::argon2id().with_tiers(low, default, high)));
        registry.register(Arc::new(Argon2Kdf::argon2i().with_tiers(low, default, high)));
        registry
    }

    pub fn register(&mut self, kdf: Arc<dyn KeyDerivationFunction>) {
        self.by_name.insert(kdf.name(), kdf);
    }

    pub fn lookup(&self, name: &str) -> CryptoResult<Arc<dyn KeyDerivationFunction>> {
        self.by_name
            .get(name)
            .cloned()
            .ok_or_else(|| CryptoError::UnknownAlgorithm(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.by_name.keys().copied()
    }
}

impl std::fmt::Debug for KdfRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.by_name.keys()).finish()
    }
}
