use alloy_primitives::{keccak256, Address, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{TRANSACTION_DIGEST_DOMAIN, TRANSACTION_ENCODING_LEN};
use crate::types::Hash256;

/// Reasons a transfer is refused before it reaches a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    #[error("Transfer amount must be nonzero")]
    ZeroAmount,
    #[error("Sender address is zero")]
    ZeroSender,
    #[error("Recipient address is zero")]
    ZeroRecipient,
    #[error("Sender and recipient are the same address: {0}")]
    SelfTransfer(Address),
}

/// A layer-2 value transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: Address,
    pub recipient: Address,
    pub amount: U256,
}

impl Transaction {
    pub fn new(sender: Address, recipient: Address, amount: U256) -> Self {
        Self {
            sender,
            recipient,
            amount,
        }
    }

    /// Fixed 96-byte encoding: sender and recipient left-padded to a word,
    /// followed by the big-endian amount.
    pub fn encode(&self) -> [u8; TRANSACTION_ENCODING_LEN] {
        let mut out = [0u8; TRANSACTION_ENCODING_LEN];
        out[12..32].copy_from_slice(self.sender.as_slice());
        out[44..64].copy_from_slice(self.recipient.as_slice());
        out[64..96].copy_from_slice(&self.amount.to_be_bytes::<32>());
        out
    }

    /// Merkle leaf of this transaction.
    pub fn digest(&self) -> Hash256 {
        let mut preimage = Vec::with_capacity(TRANSACTION_DIGEST_DOMAIN.len() + TRANSACTION_ENCODING_LEN);
        preimage.extend_from_slice(TRANSACTION_DIGEST_DOMAIN);
        preimage.extend_from_slice(&self.encode());
        keccak256(&preimage).0
    }

    pub fn validate(&self) -> Result<(), TransactionError> {
        if self.amount.is_zero() {
            return Err(TransactionError::ZeroAmount);
        }
        if self.sender.is_zero() {
            return Err(TransactionError::ZeroSender);
        }
        if self.recipient.is_zero() {
            return Err(TransactionError::ZeroRecipient);
        }
        if self.sender == self.recipient {
            return Err(TransactionError::SelfTransfer(self.sender));
        }
        Ok(())
    }

    pub fn involves(&self, address: &Address) -> bool {
        self.sender == *address || self.recipient == *address
    }
}
