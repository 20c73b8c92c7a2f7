use alloy_primitives::U256;

/// Domain tag mixed into every transaction digest so a leaf can never be
/// confused with an internal node of the commitment tree.
pub const TRANSACTION_DIGEST_DOMAIN: &[u8] = b"GLIDE_L2_TRANSFER_V1";

/// Length of the fixed transaction encoding: three 32-byte words.
pub const TRANSACTION_ENCODING_LEN: usize = 96;

/// Challenge window opened by batch verification: 7 days.
pub const DEFAULT_CHALLENGE_PERIOD_MS: u64 = 7 * 24 * 60 * 60 * 1000;

/// Number of queued transactions taken per batch cut.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 10;

/// Penalty moved between submitter and challenger on resolution: 10 ether.
pub const DEFAULT_FRAUD_PENALTY: U256 = U256::from_limbs([10_000_000_000_000_000_000, 0, 0, 0]);

/// Upper bound on the number of siblings in a merkle proof.
pub const MAX_PROOF_DEPTH: usize = 64;
