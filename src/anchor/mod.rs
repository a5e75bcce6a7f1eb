//! Root Anchoring
//!
//! Resolves the roots published by the log operator to an external,
//! content-addressed ledger so consistency can be checked against roots the
//! service cannot rewrite.

pub mod arweave;
pub mod ledger;
pub mod reconcile;

pub use arweave::ArweaveLedger;
pub use ledger::{LedgerContent, LedgerEntry, LedgerTag, PublishedRootLedger};
pub use reconcile::{reconcile_roots, RootReconciler};
