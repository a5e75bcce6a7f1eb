//! Merkle Proof Verification
//!
//! Membership and consistency checks over SHA256 trees whose inner nodes
//! are `SHA256(left || right)` of the raw 32-byte children.

use tracing::debug;

use crate::audit::proof::{ConsistencyProof, MembershipProof, NodeHash, Side};

/// Hash two child nodes into their parent
pub fn hash_pair(left: &NodeHash, right: &NodeHash) -> NodeHash {
    let mut combined = [0u8; 64];
    combined[..32].copy_from_slice(left.as_bytes());
    combined[32..].copy_from_slice(right.as_bytes());
    NodeHash::digest(&combined)
}

/// Walk a sibling path from `leaf` and return the root it leads to
pub fn compute_root(leaf: &NodeHash, proof: &MembershipProof) -> NodeHash {
    proof.steps().iter().fold(*leaf, |node, step| match step.side {
        Side::Left => hash_pair(&step.hash, &node),
        Side::Right => hash_pair(&node, &step.hash),
    })
}

/// Verify that `leaf` is committed under `root`
pub fn verify_membership(leaf: &NodeHash, root: &NodeHash, proof: &MembershipProof) -> bool {
    compute_root(leaf, proof) == *root
}

/// Fold the entries' node hashes right to left into the root they decompose.
///
/// Entries are expected leftmost subtree first: the last entry is the
/// rightmost subtree of the older tree and seeds the fold. A proof listing
/// the rightmost subtree first reconstructs a different root and fails.
/// Returns `None` for an empty proof.
pub fn reconstruct_previous_root(proof: &ConsistencyProof) -> Option<NodeHash> {
    let (last, rest) = proof.entries().split_last()?;
    Some(
        rest.iter()
            .rev()
            .fold(last.node_hash, |acc, entry| hash_pair(&entry.node_hash, &acc)),
    )
}

/// Verify that the tree under `prev_root` is a prefix of the tree under `new_root`
pub fn verify_consistency(
    new_root: &NodeHash,
    prev_root: &NodeHash,
    proof: &ConsistencyProof,
) -> bool {
    let reconstructed = match reconstruct_previous_root(proof) {
        Some(root) => root,
        None => {
            debug!("Empty consistency proof");
            return false;
        }
    };

    if reconstructed != *prev_root {
        debug!(
            "Consistency proof decomposes to {}, expected previous root {}",
            reconstructed, prev_root
        );
        return false;
    }

    for (idx, entry) in proof.entries().iter().enumerate() {
        if !verify_membership(&entry.node_hash, new_root, &entry.proof) {
            debug!("Consistency entry {} is not a member of new root {}", idx, new_root);
            return false;
        }
    }

    true
}
