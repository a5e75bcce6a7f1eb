use anyhow::{anyhow, Context, Result};
use clap::{Arg, ArgAction, Command};
use std::path::Path;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use audit_verifier::anchor::{ArweaveLedger, RootReconciler};
use audit_verifier::audit::{required_tree_sizes, verify_search_results, PublishedRoots, Root, SearchResults};
use audit_verifier::VerifierConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("verify-audit-log")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Verify records returned by a tamper-evident audit log search")
        .arg(
            Arg::new("results")
                .short('r')
                .long("results")
                .value_name("PATH")
                .help("Path to a search results JSON file")
                .required(true),
        )
        .arg(
            Arg::new("roots")
                .long("roots")
                .value_name("PATH")
                .help("JSON array of roots used when the ledger has no anchored root for a size"),
        )
        .arg(
            Arg::new("ledger")
                .long("ledger")
                .help("Resolve published roots from the external ledger")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Suppress output except errors")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let verbose = matches.get_flag("verbose");
    let quiet = matches.get_flag("quiet");
    init_logging(verbose, quiet);

    let results_path = matches
        .get_one::<String>("results")
        .ok_or_else(|| anyhow!("--results is required"))?;
    let results: SearchResults = read_json(results_path)?;

    let fallback = match matches.get_one::<String>("roots") {
        Some(path) => load_roots(path)?,
        None => PublishedRoots::new(),
    };

    let published_roots = if matches.get_flag("ledger") {
        resolve_from_ledger(&results, fallback).await?
    } else {
        fallback
    };

    let verifications = verify_search_results(&results, &published_roots);
    let mut failures = 0;
    for (record, verification) in results.events.iter().zip(&verifications) {
        if verification.has_failure() {
            failures += 1;
            error!("{}: {}", record.summary(), verification.summary());
        }
        if !quiet {
            println!("{}", record.summary());
            println!("  {}", verification.summary());
        }
    }

    if failures > 0 {
        error!("{} of {} records failed verification", failures, verifications.len());
        std::process::exit(1);
    }

    if !quiet {
        println!("✓ {} records verified", verifications.len());
    }
    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("audit_verifier=debug,verify_audit_log=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("audit_verifier=info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T> {
    if !Path::new(path).exists() {
        return Err(anyhow!("File not found: {}", path));
    }
    let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path))
}

fn load_roots(path: &str) -> Result<PublishedRoots> {
    let roots: Vec<Root> = read_json(path)?;
    info!("Loaded {} fallback roots from {}", roots.len(), path);
    Ok(roots.into_iter().map(|root| (root.size, root)).collect())
}

async fn resolve_from_ledger(results: &SearchResults, fallback: PublishedRoots) -> Result<PublishedRoots> {
    let tree_name = match results.root.as_ref().and_then(|root| root.tree_name.clone()) {
        Some(name) => name,
        None => {
            warn!("Search results carry no tree name, skipping the ledger");
            return Ok(fallback);
        }
    };

    let config = VerifierConfig::load()?;
    let reconciler = RootReconciler::new(ArweaveLedger::new(&config)?, &config);
    let sizes: Vec<u64> = required_tree_sizes(results).into_iter().collect();

    let roots = reconciler
        .reconcile(&tree_name, &sizes, |size| {
            let root = fallback.get(&size).cloned();
            async move { root.ok_or_else(|| anyhow!("No fallback root for size {}", size)) }
        })
        .await;
    Ok(roots)
}
