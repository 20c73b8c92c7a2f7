use alloy_primitives::{Address, U256};
use glide_commitment::{compute_root, MerkleTree};
use glide_primitives::{Hash256, Transaction};
use proptest::collection::vec;
use proptest::prelude::*;

fn arb_transaction() -> impl Strategy<Value = Transaction> {
    (any::<[u8; 20]>(), any::<[u8; 20]>(), any::<u128>()).prop_map(|(from, to, amount)| {
        Transaction::new(Address::from(from), Address::from(to), U256::from(amount))
    })
}

proptest! {
    #[test]
    fn every_leaf_verifies_against_its_root(leaves in vec(any::<[u8; 32]>(), 1..64)) {
        let tree = MerkleTree::build(&leaves).unwrap();
        let root = tree.root();
        for (i, leaf) in leaves.iter().enumerate() {
            let proof = tree.proof(i).unwrap();
            prop_assert!(MerkleTree::verify(leaf, &proof, &root));
        }
    }

    #[test]
    fn foreign_leaf_does_not_verify(
        leaves in vec(any::<[u8; 32]>(), 1..32),
        foreign in any::<[u8; 32]>(),
        index in any::<prop::sample::Index>(),
    ) {
        prop_assume!(!leaves.contains(&foreign));
        let tree = MerkleTree::build(&leaves).unwrap();
        let i = index.index(leaves.len());
        let proof = tree.proof(i).unwrap();
        prop_assert!(!MerkleTree::verify(&foreign, &proof, &tree.root()));
    }

    #[test]
    fn flipped_sibling_breaks_the_proof(
        leaves in vec(any::<[u8; 32]>(), 2..32),
        index in any::<prop::sample::Index>(),
        bit in 0usize..256,
    ) {
        let tree = MerkleTree::build(&leaves).unwrap();
        let i = index.index(leaves.len());
        let mut proof = tree.proof(i).unwrap();
        proof[0][bit / 8] ^= 1 << (bit % 8);
        prop_assert!(!MerkleTree::verify(&leaves[i], &proof, &tree.root()));
    }

    #[test]
    fn rebuilding_from_transactions_reproduces_root(txs in vec(arb_transaction(), 1..24)) {
        let stored_root = compute_root(&txs).unwrap();
        let stored_leaves = txs.clone();
        let digests: Vec<Hash256> = stored_leaves.iter().map(Transaction::digest).collect();
        prop_assert_eq!(MerkleTree::build(&digests).unwrap().root(), stored_root);
        prop_assert_eq!(compute_root(&stored_leaves).unwrap(), stored_root);
    }
}
