pub mod anchor;
pub mod audit;
pub mod config;
pub mod crypto;
pub mod error;

pub use config::VerifierConfig;
pub use error::VerifyError;
