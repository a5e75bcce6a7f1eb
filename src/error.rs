use thiserror::Error;

impl From<serde_json::Error> for VerifyError {
    fn from(err: serde_json::Error) -> Self {
        Self::ProofError(format!("JSON decoding error: {}", err))
    }
}

impl From<hex::FromHexError> for VerifyError {
    fn from(err: hex::FromHexError) -> Self {
        Self::ProofError(format!("Invalid hex: {}", err))
    }
}

impl From<base64::DecodeError> for VerifyError {
    fn from(err: base64::DecodeError) -> Self {
        Self::KeyError(format!("Invalid base64: {}", err))
    }
}

impl From<reqwest::Error> for VerifyError {
    fn from(err: reqwest::Error) -> Self {
        Self::LedgerError(format!("HTTP error: {}", err))
    }
}

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Proof decoding error: {0}")]
    ProofError(String),

    #[error("Key decoding error: {0}")]
    KeyError(String),

    #[error("Signature error: {0}")]
    SignatureError(String),

    #[error("Ledger error: {0}")]
    LedgerError(String),
}

impl VerifyError {
    pub fn malformed_token(token: &str, reason: &str) -> Self {
        Self::ProofError(format!("Malformed proof token '{}': {}", token, reason))
    }

    pub fn unexpected_status(url: &str, status: u16) -> Self {
        Self::LedgerError(format!("Ledger returned status {} for {}", status, url))
    }
}
