use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use alloy_primitives::{Address, U256};
use glide_primitives::{
    SettlementDomain, DEFAULT_CHALLENGE_PERIOD_MS, DEFAULT_FRAUD_PENALTY, DEFAULT_MAX_BATCH_SIZE,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub trait FromEnv: Sized {
    fn from_env() -> anyhow::Result<Self>;
}

/// Rollup configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RollupConfig {
    /// Address of the commitment contract this rollup settles to.
    pub settlement_domain: Address,
    /// Operator that `cut_batch` submits batches as.
    pub operator: Address,
    /// Length of the challenge window opened at verification.
    #[serde(default = "default_challenge_period_ms")]
    pub challenge_period_ms: u64,
    /// Max number of queued transactions per batch
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    /// Amount moved from the losing party to the winner of a challenge
    #[serde(default = "default_fraud_penalty")]
    pub fraud_penalty: U256,
}

impl RollupConfig {
    pub fn domain(&self) -> SettlementDomain {
        SettlementDomain::new(self.settlement_domain)
    }
}

impl FromEnv for RollupConfig {
    fn from_env() -> anyhow::Result<Self> {
        let mut toml_string = "".to_string();
        toml_string.push_str(&format!(
            "settlement_domain = \"{}\"\n",
            std::env::var("GLIDE_SETTLEMENT_DOMAIN")?
        ));
        toml_string.push_str(&format!("operator = \"{}\"\n", std::env::var("GLIDE_OPERATOR")?));
        if let Ok(val) = std::env::var("GLIDE_CHALLENGE_PERIOD_MS") {
            toml_string.push_str(&format!("challenge_period_ms = {}\n", val));
        }
        if let Ok(val) = std::env::var("GLIDE_MAX_BATCH_SIZE") {
            toml_string.push_str(&format!("max_batch_size = {}\n", val));
        }
        if let Ok(val) = std::env::var("GLIDE_FRAUD_PENALTY") {
            toml_string.push_str(&format!("fraud_penalty = \"{}\"\n", val));
        }
        Ok(toml::from_str(&toml_string)?)
    }
}

#[inline]
const fn default_challenge_period_ms() -> u64 {
    DEFAULT_CHALLENGE_PERIOD_MS
}

#[inline]
const fn default_max_batch_size() -> usize {
    DEFAULT_MAX_BATCH_SIZE
}

#[inline]
const fn default_fraud_penalty() -> U256 {
    DEFAULT_FRAUD_PENALTY
}

/// Initial role assignments.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RolesConfig {
    pub admin: Address,
    #[serde(default)]
    pub operators: Vec<Address>,
    #[serde(default)]
    pub verifiers: Vec<Address>,
    #[serde(default)]
    pub adjudicators: Vec<Address>,
}

/// Simple storage configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory holding the rollup database
    pub path: PathBuf,
}

/// Node configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GlideConfig {
    pub rollup: RollupConfig,
    pub roles: RolesConfig,
    pub storage: StorageConfig,
}

/// Reads toml file as a specific type.
pub fn from_toml_path<P: AsRef<Path>, R: DeserializeOwned>(path: P) -> anyhow::Result<R> {
    let mut contents = String::new();
    {
        let mut file = File::open(path)?;
        file.read_to_string(&mut contents)?;
    }
    tracing::debug!("Config file size: {} bytes", contents.len());
    tracing::trace!("Config file contents: {}", &contents);

    let result: R = toml::from_str(&contents)?;

    Ok(result)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn create_config_from(content: &str) -> NamedTempFile {
        let mut config_file = NamedTempFile::new().unwrap();
        config_file.write_all(content.as_bytes()).unwrap();
        config_file
    }

    #[test]
    fn test_correct_config() {
        let config = r#"
            [rollup]
            settlement_domain = "0x00000000000000000000000000000000000000dd"
            operator = "0x0000000000000000000000000000000000000001"
            challenge_period_ms = 1000
            max_batch_size = 4
            fraud_penalty = "25"

            [roles]
            admin = "0x00000000000000000000000000000000000000aa"
            operators = ["0x0000000000000000000000000000000000000001"]
            verifiers = ["0x0000000000000000000000000000000000000002"]
            adjudicators = ["0x0000000000000000000000000000000000000003"]

            [storage]
            path = "/tmp/glide"
        "#;

        let config_file = create_config_from(config);

        let config: GlideConfig = from_toml_path(config_file.path()).unwrap();

        let expected = GlideConfig {
            rollup: RollupConfig {
                settlement_domain: Address::with_last_byte(0xdd),
                operator: Address::with_last_byte(1),
                challenge_period_ms: 1000,
                max_batch_size: 4,
                fraud_penalty: U256::from(25u64),
            },
            roles: RolesConfig {
                admin: Address::with_last_byte(0xaa),
                operators: vec![Address::with_last_byte(1)],
                verifiers: vec![Address::with_last_byte(2)],
                adjudicators: vec![Address::with_last_byte(3)],
            },
            storage: StorageConfig {
                path: PathBuf::from("/tmp/glide"),
            },
        };
        assert_eq!(config, expected);
    }

    #[test]
    fn test_defaults_are_applied() {
        let config = r#"
            settlement_domain = "0x00000000000000000000000000000000000000dd"
            operator = "0x0000000000000000000000000000000000000001"
        "#;

        let config_file = create_config_from(config);

        let config: RollupConfig = from_toml_path(config_file.path()).unwrap();
        assert_eq!(config.challenge_period_ms, 604_800_000);
        assert_eq!(config.max_batch_size, 10);
        assert_eq!(
            config.fraud_penalty,
            U256::from(10_000_000_000_000_000_000u128)
        );
        assert_eq!(config.domain(), SettlementDomain::new(Address::with_last_byte(0xdd)));
    }

    #[test]
    fn test_missing_file() {
        assert!(from_toml_path::<_, RollupConfig>("/nonexistent/glide.toml").is_err());
    }

    #[test]
    fn test_rollup_config_from_env() {
        std::env::set_var(
            "GLIDE_SETTLEMENT_DOMAIN",
            "0x00000000000000000000000000000000000000dd",
        );
        std::env::set_var("GLIDE_OPERATOR", "0x0000000000000000000000000000000000000001");
        std::env::set_var("GLIDE_MAX_BATCH_SIZE", "3");

        let config = RollupConfig::from_env().unwrap();
        assert_eq!(config.settlement_domain, Address::with_last_byte(0xdd));
        assert_eq!(config.operator, Address::with_last_byte(1));
        assert_eq!(config.max_batch_size, 3);
        assert_eq!(config.challenge_period_ms, DEFAULT_CHALLENGE_PERIOD_MS);
    }
}
