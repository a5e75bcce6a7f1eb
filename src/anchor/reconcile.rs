//! Root Reconciliation
//!
//! Builds the size to root map consistency checks need. Roots anchored on
//! the external ledger are preferred; sizes the ledger cannot supply are
//! fetched from the log service through a caller-supplied function.

use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::anchor::ledger::{LedgerContent, LedgerEntry, PublishedRootLedger};
use crate::audit::entry::{PublishedRoots, Root};
use crate::config::VerifierConfig;

/// Await `fut` unless the deadline passes first
async fn before<F: Future>(deadline: Option<Instant>, fut: F) -> Option<F::Output> {
    match deadline {
        Some(deadline) => timeout_at(deadline, fut).await.ok(),
        None => Some(fut.await),
    }
}

/// Last path segment of a root URL, used as its content address
fn address_from_url(url: &str) -> Option<String> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

fn parse_anchored_root(body: &str, entry: &LedgerEntry, tree_name: &str, size: u64) -> Option<Root> {
    match serde_json::from_str::<Root>(body) {
        Ok(mut root) => {
            if root.size == 0 {
                root.size = size;
            }
            if root.tree_name.is_none() {
                root.tree_name = Some(tree_name.to_string());
            }
            root.transaction_id = Some(entry.address.clone());
            Some(root)
        }
        Err(e) => {
            warn!("Failed to parse anchored root {}: {}", entry.address, e);
            None
        }
    }
}

/// Resolve roots for `sizes`, ledger first and `fetch_root` as fallback.
///
/// Never fails: sizes that cannot be resolved are left out of the map. When
/// `deadline` elapses the roots resolved so far are returned.
pub async fn reconcile_roots<L, F, Fut>(
    ledger: &L,
    tree_name: &str,
    sizes: &[u64],
    mut fetch_root: F,
    deadline: Option<Duration>,
) -> PublishedRoots
where
    L: PublishedRootLedger + ?Sized,
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = anyhow::Result<Root>>,
{
    let mut roots = PublishedRoots::new();
    let requested: BTreeSet<u64> = sizes.iter().copied().collect();
    if requested.is_empty() {
        return roots;
    }

    let deadline = deadline.map(|d| Instant::now() + d);
    let wanted: Vec<u64> = requested.iter().copied().collect();

    let entries = match before(deadline, ledger.list_by_tags(tree_name, &wanted)).await {
        Some(Ok(entries)) => entries,
        Some(Err(e)) => {
            warn!("Ledger query failed, falling back to the log service: {}", e);
            Vec::new()
        }
        None => {
            warn!("Reconciliation deadline reached while listing the ledger");
            return roots;
        }
    };

    for entry in &entries {
        let size = match entry.tree_size() {
            Some(size) if requested.contains(&size) && !roots.contains_key(&size) => size,
            _ => continue,
        };

        match before(deadline, ledger.fetch_by_address(&entry.address)).await {
            Some(Ok(LedgerContent::Available(body))) => {
                if let Some(root) = parse_anchored_root(&body, entry, tree_name, size) {
                    debug!("Resolved root for size {} from ledger entry {}", size, entry.address);
                    roots.insert(size, root);
                }
            }
            Some(Ok(LedgerContent::Pending)) => {
                debug!("Ledger entry {} for size {} is still pending", entry.address, size);
            }
            Some(Err(e)) => {
                warn!("Failed to fetch ledger entry {}: {}", entry.address, e);
            }
            None => {
                warn!("Reconciliation deadline reached with {} of {} roots", roots.len(), requested.len());
                return roots;
            }
        }
    }

    let anchored = roots.len();
    for size in requested.iter().copied() {
        if roots.contains_key(&size) {
            continue;
        }

        match before(deadline, fetch_root(size)).await {
            Some(Ok(mut root)) => {
                if root.transaction_id.is_none() {
                    root.transaction_id = root.url.as_deref().and_then(address_from_url);
                }
                roots.insert(size, root);
            }
            Some(Err(e)) => {
                warn!("Failed to fetch root for size {}: {}", size, e);
            }
            None => {
                warn!("Reconciliation deadline reached with {} of {} roots", roots.len(), requested.len());
                return roots;
            }
        }
    }

    info!(
        "Reconciled {} of {} roots ({} from ledger)",
        roots.len(),
        requested.len(),
        anchored
    );
    roots
}

/// Reconciler bound to one ledger and the configured deadline
pub struct RootReconciler<L> {
    ledger: L,
    deadline: Option<Duration>,
}

impl<L: PublishedRootLedger> RootReconciler<L> {
    pub fn new(ledger: L, config: &VerifierConfig) -> Self {
        Self {
            ledger,
            deadline: config.reconcile_deadline(),
        }
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub async fn reconcile<F, Fut>(&self, tree_name: &str, sizes: &[u64], fetch_root: F) -> PublishedRoots
    where
        F: FnMut(u64) -> Fut,
        Fut: Future<Output = anyhow::Result<Root>>,
    {
        reconcile_roots(&self.ledger, tree_name, sizes, fetch_root, self.deadline).await
    }
}
