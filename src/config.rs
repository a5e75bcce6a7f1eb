use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::error::VerifyError;

pub const DEFAULT_LEDGER_URL: &str = "https://arweave.net";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierConfig {
    pub ledger_url: String,
    pub ledger_timeout_secs: u64,
    /// Zero disables the overall reconciliation deadline.
    pub reconcile_deadline_secs: u64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            ledger_url: DEFAULT_LEDGER_URL.to_string(),
            ledger_timeout_secs: 10,
            reconcile_deadline_secs: 60,
        }
    }
}

impl VerifierConfig {
    pub fn load() -> Result<Self, VerifyError> {
        let ledger_url = env::var("AUDIT_LEDGER_URL")
            .unwrap_or_else(|_| DEFAULT_LEDGER_URL.to_string());

        let ledger_timeout_secs = parse_secs("AUDIT_LEDGER_TIMEOUT_SECS", 10)?;
        let reconcile_deadline_secs = parse_secs("AUDIT_RECONCILE_DEADLINE_SECS", 60)?;

        Ok(VerifierConfig {
            ledger_url: ledger_url.trim_end_matches('/').to_string(),
            ledger_timeout_secs,
            reconcile_deadline_secs,
        })
    }

    pub fn ledger_timeout(&self) -> Duration {
        Duration::from_secs(self.ledger_timeout_secs)
    }

    pub fn reconcile_deadline(&self) -> Option<Duration> {
        match self.reconcile_deadline_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

fn parse_secs(name: &str, default: u64) -> Result<u64, VerifyError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|e| VerifyError::ConfigError(format!("{} must be an integer: {}", name, e))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = VerifierConfig::default();
        assert_eq!(config.ledger_url, DEFAULT_LEDGER_URL);
        assert_eq!(config.ledger_timeout(), Duration::from_secs(10));
        assert_eq!(config.reconcile_deadline(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_zero_deadline_disables() {
        let config = VerifierConfig {
            reconcile_deadline_secs: 0,
            ..VerifierConfig::default()
        };
        assert_eq!(config.reconcile_deadline(), None);
    }

    #[test]
    fn test_parse_secs_falls_back_when_unset() {
        let value = parse_secs("AUDIT_VERIFIER_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }
}
