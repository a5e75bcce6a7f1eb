//! Record Verification
//!
//! Runs the independent hash, membership, consistency and signature checks
//! for search records and single log responses. Every check yields a
//! [`VerificationStatus`]; nothing here returns an error or panics on bad
//! input, so one malformed record never stops the others from being checked.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info};

use crate::audit::entry::{verify_log_hash, Envelope, LogResponse, PublishedRoots, Record, Root, SearchResults};
use crate::audit::merkle;
use crate::audit::proof::{ConsistencyProof, MembershipProof, NodeHash};
use crate::crypto::signatures::verify_signature;
use crate::error::VerifyError;

/// Outcome of a single check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerificationStatus {
    #[serde(rename = "pass")]
    Pass,
    #[serde(rename = "fail")]
    Fail,
    /// Required inputs were absent; not the same as a failure
    #[serde(rename = "none")]
    NotVerified,
}

impl VerificationStatus {
    pub fn is_pass(&self) -> bool {
        matches!(self, VerificationStatus::Pass)
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, VerificationStatus::Fail)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Pass => "pass",
            VerificationStatus::Fail => "fail",
            VerificationStatus::NotVerified => "none",
        }
    }
}

impl From<bool> for VerificationStatus {
    fn from(valid: bool) -> Self {
        if valid {
            VerificationStatus::Pass
        } else {
            VerificationStatus::Fail
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a check whose decoding step may fail: decode errors are `fail`.
fn status_of(check: &str, result: Result<bool, VerifyError>) -> VerificationStatus {
    match result {
        Ok(valid) => VerificationStatus::from(valid),
        Err(e) => {
            debug!("{} check could not decode its inputs: {}", check, e);
            VerificationStatus::Fail
        }
    }
}

/// Hash check as a tri-state; an empty claimed hash cannot be checked.
pub fn verify_hash_status(envelope: &Envelope, claimed_hash: &str) -> VerificationStatus {
    if claimed_hash.trim().is_empty() {
        return VerificationStatus::NotVerified;
    }
    VerificationStatus::from(verify_log_hash(envelope, claimed_hash))
}

/// Membership check from wire-format inputs
pub fn verify_membership_proof(
    leaf_hash: &str,
    membership_proof: Option<&str>,
    root_hash: Option<&str>,
) -> VerificationStatus {
    let (proof, root_hash) = match (membership_proof, root_hash) {
        (Some(proof), Some(root_hash)) if !leaf_hash.trim().is_empty() => (proof, root_hash),
        _ => return VerificationStatus::NotVerified,
    };

    status_of("Membership", decode_and_verify_membership(leaf_hash, proof, root_hash))
}

fn decode_and_verify_membership(leaf_hash: &str, proof: &str, root_hash: &str) -> Result<bool, VerifyError> {
    let leaf = NodeHash::from_hex(leaf_hash)?;
    let root = NodeHash::from_hex(root_hash)?;
    let proof = MembershipProof::decode(proof)?;
    Ok(merkle::verify_membership(&leaf, &root, &proof))
}

/// Consistency check from wire-format inputs
pub fn verify_consistency_proof(
    new_root_hash: &str,
    prev_root_hash: &str,
    consistency_proof: &[String],
) -> VerificationStatus {
    status_of(
        "Consistency",
        decode_and_verify_consistency(new_root_hash, prev_root_hash, consistency_proof),
    )
}

fn decode_and_verify_consistency(
    new_root_hash: &str,
    prev_root_hash: &str,
    consistency_proof: &[String],
) -> Result<bool, VerifyError> {
    let new_root = NodeHash::from_hex(new_root_hash)?;
    let prev_root = NodeHash::from_hex(prev_root_hash)?;
    let proof = ConsistencyProof::decode(consistency_proof)?;
    Ok(merkle::verify_consistency(&new_root, &prev_root, &proof))
}

/// Membership of a search record under the given root
pub fn verify_record_membership(record: &Record, root: Option<&Root>) -> VerificationStatus {
    verify_membership_proof(
        &record.hash,
        record.membership_proof.as_deref(),
        root.map(|r| r.root_hash.as_str()),
    )
}

/// Membership of a freshly logged event under the returned unpublished root
pub fn verify_log_membership(log: &LogResponse, new_unpublished_root: Option<&str>) -> VerificationStatus {
    verify_membership_proof(&log.hash, log.membership_proof.as_deref(), new_unpublished_root)
}

/// Consistency between two successive unpublished roots of a log response
pub fn verify_log_consistency(
    log: &LogResponse,
    new_unpublished_root: Option<&str>,
    prev_unpublished_root: Option<&str>,
) -> VerificationStatus {
    match (&log.consistency_proof, new_unpublished_root, prev_unpublished_root) {
        (Some(proof), Some(new_root), Some(prev_root)) => {
            verify_consistency_proof(new_root, prev_root, proof)
        }
        _ => VerificationStatus::NotVerified,
    }
}

/// Consistency of the tree state that first included a record.
///
/// Uses the roots at sizes `leaf_index` and `leaf_index + 1`. Unpublished
/// records are not checked; the first leaf has no earlier state and passes.
pub fn verify_record_consistency(record: &Record, published_roots: &PublishedRoots) -> VerificationStatus {
    if !record.published {
        return VerificationStatus::NotVerified;
    }

    let leaf_index = match record.leaf_index {
        Some(idx) => idx,
        None => return VerificationStatus::NotVerified,
    };
    if leaf_index == 0 {
        return VerificationStatus::Pass;
    }

    let new_size = match leaf_index.checked_add(1) {
        Some(size) => size,
        None => return VerificationStatus::NotVerified,
    };
    let new_root = published_roots.get(&new_size);
    let prev_root = published_roots.get(&leaf_index);

    match (new_root, prev_root) {
        (Some(new_root), Some(prev_root)) => match &new_root.consistency_proof {
            Some(proof) => verify_consistency_proof(&new_root.root_hash, &prev_root.root_hash, proof),
            None => VerificationStatus::NotVerified,
        },
        _ => VerificationStatus::NotVerified,
    }
}

/// Results of all checks for one record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordVerification {
    pub hash: VerificationStatus,
    pub membership: VerificationStatus,
    pub consistency: VerificationStatus,
    pub signature: VerificationStatus,
}

impl RecordVerification {
    pub fn statuses(&self) -> [VerificationStatus; 4] {
        [self.hash, self.membership, self.consistency, self.signature]
    }

    pub fn has_failure(&self) -> bool {
        self.statuses().iter().any(VerificationStatus::is_fail)
    }

    pub fn summary(&self) -> String {
        format!(
            "hash: {}, membership: {}, consistency: {}, signature: {}",
            self.hash, self.membership, self.consistency, self.signature
        )
    }
}

/// Run every check for one search record
pub fn verify_record(
    record: &Record,
    membership_root: Option<&Root>,
    published_roots: &PublishedRoots,
) -> RecordVerification {
    let result = RecordVerification {
        hash: verify_hash_status(&record.envelope, &record.hash),
        membership: verify_record_membership(record, membership_root),
        consistency: verify_record_consistency(record, published_roots),
        signature: verify_signature(&record.envelope),
    };
    debug!("Verified {}: {}", record.summary(), result.summary());
    result
}

/// Verify every record of a search response.
///
/// Published records are proven against `root`, the rest against
/// `unpublished_root`.
pub fn verify_search_results(results: &SearchResults, published_roots: &PublishedRoots) -> Vec<RecordVerification> {
    let verifications: Vec<RecordVerification> = results
        .events
        .iter()
        .map(|record| {
            let membership_root = if record.published {
                results.root.as_ref()
            } else {
                results.unpublished_root.as_ref()
            };
            verify_record(record, membership_root, published_roots)
        })
        .collect();

    let failed = verifications.iter().filter(|v| v.has_failure()).count();
    info!(
        "Verified {} records ({} with failures)",
        verifications.len(),
        failed
    );
    verifications
}

/// Tree sizes whose roots the consistency checks of `results` need
pub fn required_tree_sizes(results: &SearchResults) -> BTreeSet<u64> {
    let mut sizes = BTreeSet::new();
    if let Some(root) = &results.root {
        sizes.insert(root.size);
    }
    for idx in results.events.iter().filter_map(|record| record.leaf_index) {
        // u64::MAX has no successor size; no root can cover it
        let Some(next) = idx.checked_add(1) else {
            continue;
        };
        sizes.insert(next);
        if idx > 0 {
            sizes.insert(idx);
        }
    }
    sizes
}

/// Results of all checks for one log response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogVerification {
    pub hash: VerificationStatus,
    pub membership: VerificationStatus,
    pub consistency: VerificationStatus,
    pub signature: VerificationStatus,
}

impl LogVerification {
    pub fn has_failure(&self) -> bool {
        [self.hash, self.membership, self.consistency, self.signature]
            .iter()
            .any(VerificationStatus::is_fail)
    }
}

/// Verifies successive log responses, carrying the previous unpublished root.
#[derive(Debug, Clone, Default)]
pub struct LogVerifier {
    prev_unpublished_root: Option<String>,
}

impl LogVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from a root the caller already trusts
    pub fn with_previous_root(prev_unpublished_root: &str) -> Self {
        Self {
            prev_unpublished_root: Some(prev_unpublished_root.to_string()),
        }
    }

    pub fn previous_root(&self) -> Option<&str> {
        self.prev_unpublished_root.as_deref()
    }

    pub fn verify(&mut self, log: &LogResponse) -> LogVerification {
        let new_root = log.unpublished_root.as_deref();
        let result = LogVerification {
            hash: verify_hash_status(&log.envelope, &log.hash),
            membership: verify_log_membership(log, new_root),
            consistency: verify_log_consistency(log, new_root, self.previous_root()),
            signature: verify_signature(&log.envelope),
        };

        if let Some(root) = new_root {
            self.prev_unpublished_root = Some(root.to_string());
        }
        result
    }
}
