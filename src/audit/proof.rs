//! Proof Wire Codec
//!
//! Parses the service's textual proof encodings into typed values.
//!
//! Membership proof: `l:<hex>,r:<hex>,...` ordered leaf to root.
//! Root proof entry: `<label>:<hex>` for the node, optionally followed by
//! `,`-separated membership tokens for that node.
//!
//! Decoding is strict: an unknown side code, a missing separator or a hash
//! that is not 32 bytes of hex rejects the whole proof.

use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::VerifyError;

/// A 32-byte SHA256 tree node
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHash([u8; 32]);

impl NodeHash {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// SHA256 of arbitrary data
    pub fn digest(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    pub fn from_hex(value: &str) -> Result<Self, VerifyError> {
        let bytes = hex::decode(value.trim())?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            VerifyError::ProofError(format!("Expected 32-byte hash, got {} bytes", b.len()))
        })?;
        Ok(Self(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for NodeHash {
    type Err = VerifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for NodeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for NodeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeHash({}...)", &self.to_hex()[..12])
    }
}

/// Which side of the running node the sibling sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "l" => Some(Side::Left),
            "r" => Some(Side::Right),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Side::Left => "l",
            Side::Right => "r",
        }
    }

    pub fn flipped(&self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiblingStep {
    pub side: Side,
    pub hash: NodeHash,
}

impl SiblingStep {
    pub fn new(side: Side, hash: NodeHash) -> Self {
        Self { side, hash }
    }

    fn decode(token: &str) -> Result<Self, VerifyError> {
        let (code, hash) = token
            .split_once(':')
            .ok_or_else(|| VerifyError::malformed_token(token, "missing ':' separator"))?;
        let side = Side::from_code(code.trim())
            .ok_or_else(|| VerifyError::malformed_token(token, "unknown side code"))?;
        let hash = NodeHash::from_hex(hash)
            .map_err(|e| VerifyError::malformed_token(token, &e.to_string()))?;
        Ok(Self { side, hash })
    }
}

/// Sibling path from a leaf (or inner node) up to a root
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipProof(Vec<SiblingStep>);

impl MembershipProof {
    pub fn new(steps: Vec<SiblingStep>) -> Self {
        Self(steps)
    }

    pub fn decode(data: &str) -> Result<Self, VerifyError> {
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        data.split(',')
            .map(SiblingStep::decode)
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    pub fn steps(&self) -> &[SiblingStep] {
        &self.0
    }

    pub fn steps_mut(&mut self) -> &mut [SiblingStep] {
        &mut self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for MembershipProof {
    type Err = VerifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl fmt::Display for MembershipProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}:{}", step.side.code(), step.hash)?;
        }
        Ok(())
    }
}

/// One node of an older tree together with its path in the newer tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootProofEntry {
    pub node_hash: NodeHash,
    pub proof: MembershipProof,
}

impl RootProofEntry {
    pub fn decode(data: &str) -> Result<Self, VerifyError> {
        let (head, rest) = match data.split_once(',') {
            Some((head, rest)) => (head, rest),
            None => (data, ""),
        };
        let (_label, hash) = head
            .split_once(':')
            .ok_or_else(|| VerifyError::malformed_token(head, "missing ':' separator"))?;
        let node_hash = NodeHash::from_hex(hash)
            .map_err(|e| VerifyError::malformed_token(head, &e.to_string()))?;

        Ok(Self {
            node_hash,
            proof: MembershipProof::decode(rest)?,
        })
    }

    pub fn encode(&self) -> String {
        if self.proof.is_empty() {
            format!("x:{}", self.node_hash)
        } else {
            format!("x:{},{}", self.node_hash, self.proof)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsistencyProof(Vec<RootProofEntry>);

impl ConsistencyProof {
    pub fn new(entries: Vec<RootProofEntry>) -> Self {
        Self(entries)
    }

    pub fn decode<S: AsRef<str>>(items: &[S]) -> Result<Self, VerifyError> {
        items
            .iter()
            .map(|item| RootProofEntry::decode(item.as_ref()))
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    pub fn encode(&self) -> Vec<String> {
        self.0.iter().map(RootProofEntry::encode).collect()
    }

    pub fn entries(&self) -> &[RootProofEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(byte: u8) -> String {
        hex::encode([byte; 32])
    }

    #[test]
    fn test_decode_membership_proof_preserves_order() {
        let wire = format!("l:{},r:{}", h(1), h(2));
        let proof: MembershipProof = wire.parse().unwrap();

        assert_eq!(proof.len(), 2);
        assert_eq!(proof.steps()[0].side, Side::Left);
        assert_eq!(proof.steps()[0].hash, NodeHash::from_bytes([1; 32]));
        assert_eq!(proof.steps()[1].side, Side::Right);
        assert_eq!(proof.to_string(), wire);
    }

    #[test]
    fn test_empty_membership_proof() {
        let proof = MembershipProof::decode("").unwrap();
        assert!(proof.is_empty());
    }

    #[test]
    fn test_malformed_tokens_are_rejected() {
        assert!(MembershipProof::decode(&format!("x:{}", h(1))).is_err());
        assert!(MembershipProof::decode(&h(1)).is_err());
        assert!(MembershipProof::decode("l:nothex").is_err());
        assert!(MembershipProof::decode("l:abcd").is_err());
        assert!(MembershipProof::decode(&format!("l:{},", h(1))).is_err());
    }

    #[test]
    fn test_decode_root_proof_entry() {
        let wire = format!("x:{},r:{},l:{}", h(7), h(8), h(9));
        let entry = RootProofEntry::decode(&wire).unwrap();

        assert_eq!(entry.node_hash, NodeHash::from_bytes([7; 32]));
        assert_eq!(entry.proof.len(), 2);
        assert_eq!(entry.proof.steps()[1].side, Side::Left);
        assert_eq!(entry.encode(), wire);
    }

    #[test]
    fn test_root_proof_entry_without_path() {
        let entry = RootProofEntry::decode(&format!("x:{}", h(3))).unwrap();
        assert!(entry.proof.is_empty());
    }

    #[test]
    fn test_consistency_proof_fails_on_any_bad_entry() {
        let items = vec![format!("x:{}", h(1)), "x:zz".to_string()];
        assert!(ConsistencyProof::decode(&items).is_err());

        let items = vec![format!("x:{}", h(1)), format!("x:{},q:{}", h(2), h(3))];
        assert!(ConsistencyProof::decode(&items).is_err());
    }

    #[test]
    fn test_node_hash_hex_is_case_insensitive() {
        let lower = NodeHash::from_hex(&"ab".repeat(32)).unwrap();
        let upper = NodeHash::from_hex(&"AB".repeat(32)).unwrap();
        assert_eq!(lower, upper);
    }
}
