//! Audit Log Verification
//!
//! Client-side checks that records returned by a tamper-evident log service
//! are authentic, included in the log and consistent with earlier states.

pub mod canonical;
pub mod entry;
pub mod merkle;
pub mod proof;
pub mod verify;

pub use canonical::{canonicalize_envelope, canonicalize_event};
pub use entry::{leaf_hash, verify_log_hash, Envelope, Event, EventValue, LogResponse, PublishedRoots, Record, Root, SearchResults};
pub use merkle::{verify_consistency, verify_membership};
pub use proof::{ConsistencyProof, MembershipProof, NodeHash, RootProofEntry, Side, SiblingStep};
pub use verify::{
    required_tree_sizes, verify_log_consistency, verify_log_membership, verify_record,
    verify_record_consistency, verify_record_membership, verify_search_results, LogVerification,
    LogVerifier, RecordVerification, VerificationStatus,
};
