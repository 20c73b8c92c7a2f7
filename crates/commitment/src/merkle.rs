use alloy_primitives::keccak256;
use glide_primitives::{Hash256, Transaction, MAX_PROOF_DEPTH};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitmentError {
    #[error("Cannot build a merkle tree without leaves")]
    EmptyInput,
    #[error("Leaf index {index} out of range for a tree of {leaf_count} leaves")]
    IndexOutOfRange { index: usize, leaf_count: usize },
}

/// Hashes two children in ascending byte order.
pub fn hash_pair(a: &Hash256, b: &Hash256) -> Hash256 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut preimage = [0u8; 64];
    preimage[..32].copy_from_slice(lo);
    preimage[32..].copy_from_slice(hi);
    keccak256(preimage).0
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    // nodes[0] holds the leaves, the last level holds the root alone
    nodes: Vec<Vec<Hash256>>,
}

impl MerkleTree {
    pub fn build(leaves: &[Hash256]) -> Result<Self, CommitmentError> {
        if leaves.is_empty() {
            return Err(CommitmentError::EmptyInput);
        }

        let mut nodes = vec![leaves.to_vec()];
        while let Some(level) = nodes.last().filter(|level| level.len() > 1) {
            let parents: Vec<Hash256> = level
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => hash_pair(left, right),
                    [single] => hash_pair(single, single),
                    _ => unreachable!("chunks(2) yields one or two nodes"),
                })
                .collect();
            nodes.push(parents);
        }

        Ok(Self { nodes })
    }

    pub fn from_transactions(transactions: &[Transaction]) -> Result<Self, CommitmentError> {
        let digests: Vec<Hash256> = transactions.iter().map(Transaction::digest).collect();
        Self::build(&digests)
    }

    pub fn root(&self) -> Hash256 {
        // build guarantees at least one level with one node on top
        self.nodes[self.nodes.len() - 1][0]
    }

    pub fn leaves(&self) -> &[Hash256] {
        &self.nodes[0]
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes[0].len()
    }

    /// Number of levels above the leaves.
    pub fn depth(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Sibling hashes from the leaf level to just below the root.
    pub fn proof(&self, index: usize) -> Result<Vec<Hash256>, CommitmentError> {
        if index >= self.leaf_count() {
            return Err(CommitmentError::IndexOutOfRange {
                index,
                leaf_count: self.leaf_count(),
            });
        }

        let mut path = Vec::with_capacity(self.depth());
        let mut i = index;
        for level in &self.nodes[..self.depth()] {
            let sibling = if i % 2 == 1 {
                i - 1
            } else if i + 1 < level.len() {
                i + 1
            } else {
                i
            };
            path.push(level[sibling]);
            i /= 2;
        }
        Ok(path)
    }

    /// Recomputes the root from `leaf` and its sibling path.
    ///
    /// Paths longer than any tree this crate can build are rejected outright.
    pub fn verify(leaf: &Hash256, proof: &[Hash256], root: &Hash256) -> bool {
        if proof.len() > MAX_PROOF_DEPTH {
            return false;
        }
        let computed = proof
            .iter()
            .fold(*leaf, |current, sibling| hash_pair(&current, sibling));
        computed == *root
    }
}

/// Root over the digests of `transactions`.
pub fn compute_root(transactions: &[Transaction]) -> Result<Hash256, CommitmentError> {
    MerkleTree::from_transactions(transactions).map(|tree| tree.root())
}
