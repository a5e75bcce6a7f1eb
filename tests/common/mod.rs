#![allow(dead_code)]

use audit_verifier::audit::merkle::hash_pair;
use audit_verifier::audit::{
    leaf_hash, ConsistencyProof, Envelope, Event, LogResponse, MembershipProof, NodeHash, PublishedRoots, Record,
    Root, RootProofEntry, Side, SiblingStep,
};

/// Largest power of two strictly below `n` (n >= 2)
fn split_point(n: usize) -> usize {
    let mut k = 1;
    while k * 2 < n {
        k *= 2;
    }
    k
}

/// Reference tree over envelope leaf hashes, left subtree always a perfect
/// power-of-two block.
pub struct TestTree {
    leaves: Vec<NodeHash>,
}

impl TestTree {
    pub fn new(leaves: Vec<NodeHash>) -> Self {
        Self { leaves }
    }

    pub fn from_envelopes(envelopes: &[Envelope]) -> Self {
        Self::new(
            envelopes
                .iter()
                .map(|e| NodeHash::from_hex(&leaf_hash(e)).unwrap())
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    fn subtree_root(&self, lo: usize, hi: usize) -> NodeHash {
        if hi - lo == 1 {
            return self.leaves[lo];
        }
        let mid = lo + split_point(hi - lo);
        hash_pair(&self.subtree_root(lo, mid), &self.subtree_root(mid, hi))
    }

    /// Root of the tree formed by the first `size` leaves
    pub fn root_at(&self, size: usize) -> NodeHash {
        self.subtree_root(0, size)
    }

    pub fn root(&self) -> NodeHash {
        self.root_at(self.len())
    }

    fn node_path(&self, lo: usize, hi: usize, offset: usize, width: usize) -> Vec<SiblingStep> {
        if lo == offset && hi == offset + width {
            return Vec::new();
        }
        let mid = lo + split_point(hi - lo);
        if offset + width <= mid {
            let mut path = self.node_path(lo, mid, offset, width);
            path.push(SiblingStep::new(Side::Right, self.subtree_root(mid, hi)));
            path
        } else {
            let mut path = self.node_path(mid, hi, offset, width);
            path.push(SiblingStep::new(Side::Left, self.subtree_root(lo, mid)));
            path
        }
    }

    /// Membership path of leaf `index` in the tree of the first `size` leaves
    pub fn membership_proof_at(&self, index: usize, size: usize) -> MembershipProof {
        MembershipProof::new(self.node_path(0, size, index, 1))
    }

    pub fn membership_proof(&self, index: usize) -> MembershipProof {
        self.membership_proof_at(index, self.len())
    }

    fn peaks(lo: usize, hi: usize, out: &mut Vec<(usize, usize)>) {
        let n = hi - lo;
        if n.is_power_of_two() {
            out.push((lo, n));
        } else {
            let k = split_point(n);
            out.push((lo, k));
            Self::peaks(lo + k, hi, out);
        }
    }

    /// Proof that the tree of `old_size` leaves is a prefix of the tree of `new_size`
    pub fn consistency_proof(&self, old_size: usize, new_size: usize) -> ConsistencyProof {
        let mut peaks = Vec::new();
        Self::peaks(0, old_size, &mut peaks);
        ConsistencyProof::new(
            peaks
                .into_iter()
                .map(|(offset, width)| RootProofEntry {
                    node_hash: self.subtree_root(offset, offset + width),
                    proof: MembershipProof::new(self.node_path(0, new_size, offset, width)),
                })
                .collect(),
        )
    }

    /// Published roots for every size in `1..=len`, each carrying its consistency proof
    pub fn published_roots(&self, tree_name: &str) -> PublishedRoots {
        (1..=self.len())
            .map(|size| {
                let mut root = Root::new(size as u64, &self.root_at(size).to_hex());
                root.tree_name = Some(tree_name.to_string());
                if size > 1 {
                    root.consistency_proof = Some(self.consistency_proof(size - 1, size).encode());
                }
                (size as u64, root)
            })
            .collect()
    }
}

pub fn sample_event(index: usize) -> Event {
    Event::new()
        .with("actor", format!("user-{}", index))
        .with("action", "update")
        .with("message", format!("record number {}", index))
}

pub fn sample_envelopes(count: usize) -> Vec<Envelope> {
    (0..count)
        .map(|i| Envelope::new(sample_event(i)).with_received_at(&format!("2024-09-03T20:01:{:02}.000000Z", i)))
        .collect()
}

pub fn published_record(tree: &TestTree, envelope: &Envelope, index: usize) -> Record {
    Record {
        hash: leaf_hash(envelope),
        envelope: envelope.clone(),
        membership_proof: Some(tree.membership_proof(index).to_string()),
        leaf_index: Some(index as u64),
        published: true,
    }
}

/// Log response for appending leaf `size - 1` to a tree of `size - 1` leaves
pub fn log_response(tree: &TestTree, envelopes: &[Envelope], size: usize) -> LogResponse {
    let index = size - 1;
    LogResponse {
        hash: leaf_hash(&envelopes[index]),
        envelope: envelopes[index].clone(),
        unpublished_root: Some(tree.root_at(size).to_hex()),
        membership_proof: Some(tree.membership_proof_at(index, size).to_string()),
        consistency_proof: if size > 1 {
            Some(tree.consistency_proof(size - 1, size).encode())
        } else {
            None
        },
    }
}
