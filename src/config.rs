//! Verification settings: built-in defaults, then environment overrides.
//!
//! | variable | meaning |
//! |---|---|
//! | `ZKEY_VERIFY_CHUNK` | points per streamed chunk (default `1 << 20`) |
//! | `ZKEY_VERIFY_THREADS` | worker threads (default: hardware parallelism) |
//! | `ZKEY_VERIFY_SEED` | 64 hex chars; fixes the batch scalars for a reproducible run |

#![forbid(unsafe_code)]

/// Default number of points per streamed chunk.
pub const DEFAULT_CHUNK: usize = 1 << 20;

/// Overrides [`VerifyConfig::chunk`].
pub const ENV_CHUNK: &str = "ZKEY_VERIFY_CHUNK";
/// Overrides [`VerifyConfig::workers`].
pub const ENV_THREADS: &str = "ZKEY_VERIFY_THREADS";
/// Overrides [`VerifyConfig::seed`].
pub const ENV_SEED: &str = "ZKEY_VERIFY_SEED";

/// A setting could not be parsed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Not a positive integer
    #[error("{var}: expected a positive integer, got {value:?}")]
    BadInteger {
        /// Variable or flag name.
        var: &'static str,
        /// Raw value.
        value: String,
    },
    /// Not 32 hex-encoded bytes
    #[error("{var}: expected 64 hex characters")]
    BadSeed {
        /// Variable or flag name.
        var: &'static str,
    },
}

/// Tuning for [`crate::verify_zkey`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifyConfig {
    /// Points per streamed chunk of the L, H and tau sections.
    pub chunk: usize,
    /// Worker threads; `None` means hardware parallelism.
    pub workers: Option<usize>,
    /// Seed for the batch scalar stream; `None` draws one from the OS.
    pub seed: Option<[u8; 32]>,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self { chunk: DEFAULT_CHUNK, workers: None, seed: None }
    }
}

impl VerifyConfig {
    /// Defaults overlaid with whatever `ZKEY_VERIFY_*` variables are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    fn from_lookup(get: impl Fn(&'static str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        if let Some(v) = get(ENV_CHUNK) {
            cfg.chunk = parse_positive(ENV_CHUNK, &v)?;
        }
        if let Some(v) = get(ENV_THREADS) {
            cfg.workers = Some(parse_positive(ENV_THREADS, &v)?);
        }
        if let Some(v) = get(ENV_SEED) {
            cfg.seed = Some(parse_seed(ENV_SEED, &v)?);
        }
        Ok(cfg)
    }
}

/// Parse a strictly positive integer.
pub fn parse_positive(var: &'static str, value: &str) -> Result<usize, ConfigError> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::BadInteger { var, value: value.to_owned() }),
    }
}

/// Parse a 32-byte seed written as 64 hex characters.
pub fn parse_seed(var: &'static str, value: &str) -> Result<[u8; 32], ConfigError> {
    let bytes = hex::decode(value.trim()).map_err(|_| ConfigError::BadSeed { var })?;
    bytes.try_into().map_err(|_| ConfigError::BadSeed { var })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&'static str, &str)]) -> impl Fn(&'static str) -> Option<String> {
        let map: HashMap<&'static str, String> = pairs.iter().map(|(k, v)| (*k, v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_apply_without_overrides() {
        let cfg = VerifyConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, VerifyConfig::default());
        assert_eq!(cfg.chunk, 1 << 20);
    }

    #[test]
    fn overrides_are_parsed() {
        let seed = "ab".repeat(32);
        let cfg = VerifyConfig::from_lookup(lookup(&[
            (ENV_CHUNK, "4096"),
            (ENV_THREADS, " 3 "),
            (ENV_SEED, seed.as_str()),
        ]))
        .unwrap();
        assert_eq!(cfg.chunk, 4096);
        assert_eq!(cfg.workers, Some(3));
        assert_eq!(cfg.seed, Some([0xab; 32]));
    }

    #[test]
    fn bad_values_are_reported() {
        assert!(matches!(
            VerifyConfig::from_lookup(lookup(&[(ENV_CHUNK, "0")])),
            Err(ConfigError::BadInteger { var: ENV_CHUNK, .. })
        ));
        assert!(matches!(
            VerifyConfig::from_lookup(lookup(&[(ENV_SEED, "abcd")])),
            Err(ConfigError::BadSeed { .. })
        ));
    }
}
