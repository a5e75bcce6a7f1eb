//! Arweave Ledger Client
//!
//! Lists anchored roots through the Arweave GraphQL gateway and fetches
//! their documents by transaction id.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info};

use crate::anchor::ledger::{LedgerContent, LedgerEntry, PublishedRootLedger, TREE_NAME_TAG, TREE_SIZE_TAG};
use crate::config::VerifierConfig;
use crate::error::VerifyError;

/// HTTP client for an Arweave gateway
pub struct ArweaveLedger {
    base_url: String,
    http_client: Client,
}

#[derive(Debug, Default, Deserialize)]
struct GraphqlResponse {
    #[serde(default)]
    data: Option<GraphqlData>,
}

#[derive(Debug, Deserialize)]
struct GraphqlData {
    #[serde(default)]
    transactions: Option<TransactionConnection>,
}

#[derive(Debug, Deserialize)]
struct TransactionConnection {
    #[serde(default)]
    edges: Vec<TransactionEdge>,
}

#[derive(Debug, Deserialize)]
struct TransactionEdge {
    node: LedgerEntry,
}

impl ArweaveLedger {
    pub fn new(config: &VerifierConfig) -> Result<Self, VerifyError> {
        let http_client = Client::builder()
            .timeout(config.ledger_timeout())
            .build()?;

        Ok(Self {
            base_url: config.ledger_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn graphql_url(&self) -> String {
        format!("{}/graphql", self.base_url)
    }

    pub fn transaction_url(&self, address: &str) -> String {
        format!("{}/{}/", self.base_url, address)
    }
}

/// GraphQL query selecting transactions by tree size and tree name tags
pub fn tag_query(tree_name: &str, sizes: &[u64]) -> String {
    let size_values = sizes
        .iter()
        .map(|size| format!("\"{}\"", size))
        .collect::<Vec<_>>()
        .join(", ");
    let tree_name = serde_json::Value::String(tree_name.to_string());

    format!(
        "{{ transactions(tags: [{{ name: \"{}\", values: [{}] }}, {{ name: \"{}\", values: [{}] }}]) \
         {{ edges {{ node {{ id tags {{ name value }} }} }} }} }}",
        TREE_SIZE_TAG, size_values, TREE_NAME_TAG, tree_name
    )
}

#[async_trait]
impl PublishedRootLedger for ArweaveLedger {
    async fn list_by_tags(&self, tree_name: &str, sizes: &[u64]) -> Result<Vec<LedgerEntry>, VerifyError> {
        if sizes.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.graphql_url();
        debug!("Querying {} for {} tree sizes of {}", url, sizes.len(), tree_name);

        let response = self
            .http_client
            .post(&url)
            .json(&serde_json::json!({ "query": tag_query(tree_name, sizes) }))
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(VerifyError::unexpected_status(&url, response.status().as_u16()));
        }

        let body: GraphqlResponse = response.json().await?;
        let entries: Vec<LedgerEntry> = body
            .data
            .and_then(|data| data.transactions)
            .map(|connection| connection.edges.into_iter().map(|edge| edge.node).collect())
            .unwrap_or_default();

        info!("Ledger listed {} anchored roots for {}", entries.len(), tree_name);
        Ok(entries)
    }

    async fn fetch_by_address(&self, address: &str) -> Result<LedgerContent, VerifyError> {
        let url = self.transaction_url(address);
        let response = self.http_client.get(&url).send().await?;
        let status = response.status();

        if status == StatusCode::ACCEPTED {
            debug!("Transaction {} is pending", address);
            return Ok(LedgerContent::Pending);
        }
        if status != StatusCode::OK {
            return Err(VerifyError::unexpected_status(&url, status.as_u16()));
        }

        Ok(LedgerContent::Available(response.text().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let config = VerifierConfig {
            ledger_url: "https://ledger.example/".to_string(),
            ..VerifierConfig::default()
        };
        let ledger = ArweaveLedger::new(&config).unwrap();

        assert_eq!(ledger.base_url(), "https://ledger.example");
        assert_eq!(ledger.graphql_url(), "https://ledger.example/graphql");
        assert_eq!(ledger.transaction_url("abc"), "https://ledger.example/abc/");
    }

    #[test]
    fn test_tag_query() {
        let query = tag_query("my \"tree\"", &[3, 4]);
        assert!(query.contains(r#"name: "tree_size", values: ["3", "4"]"#));
        assert!(query.contains(r#"name: "tree_name", values: ["my \"tree\""]"#));
        assert!(query.contains("edges { node { id tags { name value } } }"));
    }
}
