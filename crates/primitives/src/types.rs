use core::fmt;
use core::str::FromStr;

pub use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// 32-byte keccak digest used for leaves, internal nodes and roots.
pub type Hash256 = [u8; 32];

/// Identifier of a committed batch. Assigned sequentially by the lifecycle.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BatchId(pub u64);

impl BatchId {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a challenge.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ChallengeId(pub u64);

impl ChallengeId {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for ChallengeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The commitment-contract deployment a balance belongs to.
///
/// Several rollup deployments can coexist on the settlement chain, so every
/// balance is keyed by the address of the contract instance it settles to.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SettlementDomain(pub Address);

impl SettlementDomain {
    pub const fn new(contract: Address) -> Self {
        Self(contract)
    }

    pub fn contract(&self) -> Address {
        self.0
    }
}

impl fmt::Display for SettlementDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wall-clock instant in milliseconds since the unix epoch.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Adds a duration, saturating at `u64::MAX` instead of wrapping.
    pub const fn saturating_add_millis(self, millis: u64) -> Self {
        Self(self.0.saturating_add(millis))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Permissions checked by the lifecycle before privileged actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Manages the other roles. Implicitly holds every role.
    Admin,
    /// Cuts batches and records deposits and withdrawals.
    Operator,
    /// Marks committed batches as verified.
    Verifier,
    /// Resolves challenges.
    Adjudicator,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Operator, Role::Verifier, Role::Adjudicator];
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Admin => "admin",
            Role::Operator => "operator",
            Role::Verifier => "verifier",
            Role::Adjudicator => "adjudicator",
        };
        f.write_str(name)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "operator" => Ok(Role::Operator),
            "verifier" => Ok(Role::Verifier),
            "adjudicator" => Ok(Role::Adjudicator),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Serde helper rendering a list of digests as hex strings.
pub mod hex_hashes {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Hash256;

    pub fn serialize<S: Serializer>(hashes: &[Hash256], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(hashes.iter().map(hex::encode))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Hash256>, D::Error> {
        let encoded = Vec::<String>::deserialize(deserializer)?;
        encoded
            .iter()
            .map(|s| {
                let mut hash = [0u8; 32];
                hex::decode_to_slice(s.trim_start_matches("0x"), &mut hash)
                    .map_err(D::Error::custom)?;
                Ok(hash)
            })
            .collect()
    }
}
