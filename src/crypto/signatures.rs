//! Event Signatures
//!
//! Ed25519 signatures over the canonical event. The envelope carries the
//! signature as base64 and the public key in one of two encodings: the
//! legacy bare key string, or a JSON object with a `key` field.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ed25519_dalek::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey};
use ed25519_dalek::pkcs8::spki::der::pem::LineEnding;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

use crate::audit::canonical::canonicalize_event;
use crate::audit::entry::{Envelope, Event};
use crate::audit::verify::VerificationStatus;
use crate::error::VerifyError;

pub const ED25519_ALGORITHM: &str = "ED25519";

/// How the envelope's `public_key` field was encoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKeyEncoding {
    /// The field is the key itself (PEM or base64 raw bytes)
    Legacy(String),
    /// `{"algorithm": "...", "key": "..."}`
    Wrapped {
        key: String,
        algorithm: Option<String>,
    },
}

impl PublicKeyEncoding {
    pub fn parse(field: &str) -> Result<Self, VerifyError> {
        match serde_json::from_str::<Value>(field) {
            Ok(Value::Object(obj)) => {
                let key = obj
                    .get("key")
                    .and_then(Value::as_str)
                    .ok_or_else(|| VerifyError::KeyError("Wrapped public key has no 'key' field".to_string()))?;
                Ok(PublicKeyEncoding::Wrapped {
                    key: key.to_string(),
                    algorithm: obj.get("algorithm").and_then(Value::as_str).map(str::to_string),
                })
            }
            _ => Ok(PublicKeyEncoding::Legacy(field.to_string())),
        }
    }

    pub fn key_material(&self) -> &str {
        match self {
            PublicKeyEncoding::Legacy(key) => key,
            PublicKeyEncoding::Wrapped { key, .. } => key,
        }
    }

    /// The `algorithm` label is informational; the scheme is always Ed25519.
    pub fn verifying_key(&self) -> Result<VerifyingKey, VerifyError> {
        if let PublicKeyEncoding::Wrapped {
            algorithm: Some(algorithm),
            ..
        } = self
        {
            if !algorithm.eq_ignore_ascii_case(ED25519_ALGORITHM) {
                debug!("Wrapped public key labelled {}, verifying as Ed25519", algorithm);
            }
        }
        decode_verifying_key(self.key_material())
    }
}

/// Decode a PEM SubjectPublicKeyInfo or base64 raw Ed25519 public key
pub fn decode_verifying_key(material: &str) -> Result<VerifyingKey, VerifyError> {
    let material = material.trim();
    if material.starts_with("-----") {
        return VerifyingKey::from_public_key_pem(material)
            .map_err(|e| VerifyError::KeyError(format!("Invalid PEM public key: {}", e)));
    }

    let bytes = BASE64.decode(material)?;
    let bytes: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
        VerifyError::KeyError(format!("Raw public key must be 32 bytes, got {}", b.len()))
    })?;
    VerifyingKey::from_bytes(&bytes)
        .map_err(|e| VerifyError::KeyError(format!("Invalid public key: {}", e)))
}

pub fn decode_signature(signature_b64: &str) -> Result<Signature, VerifyError> {
    let bytes = BASE64
        .decode(signature_b64.trim())
        .map_err(|e| VerifyError::SignatureError(format!("Invalid signature base64: {}", e)))?;
    Signature::from_slice(&bytes)
        .map_err(|e| VerifyError::SignatureError(format!("Invalid signature format: {}", e)))
}

/// Verify a base64 signature over the canonical form of `event`
pub fn verify_event_signature(
    event: &Event,
    signature_b64: &str,
    public_key_field: &str,
) -> Result<bool, VerifyError> {
    let verifying_key = PublicKeyEncoding::parse(public_key_field)?.verifying_key()?;
    let signature = decode_signature(signature_b64)?;
    let message = canonicalize_event(event);

    match verifying_key.verify(&message, &signature) {
        Ok(_) => Ok(true),
        Err(_) => Ok(false),
    }
}

/// Signature check for an envelope.
///
/// Unsigned envelopes are `none`; an envelope carrying only one of the
/// signature and public key is `fail`.
pub fn verify_signature(envelope: &Envelope) -> VerificationStatus {
    let (signature, public_key) = match (&envelope.signature, &envelope.public_key) {
        (None, None) => return VerificationStatus::NotVerified,
        (Some(signature), Some(public_key)) => (signature, public_key),
        _ => {
            debug!("Envelope carries only one of signature and public key");
            return VerificationStatus::Fail;
        }
    };

    match verify_event_signature(&envelope.event, signature, public_key) {
        Ok(valid) => VerificationStatus::from(valid),
        Err(e) => {
            debug!("Signature verification failed: {}", e);
            VerificationStatus::Fail
        }
    }
}

/// Ed25519 signer for audit events
pub struct EventSigner {
    signing_key: SigningKey,
}

impl EventSigner {
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            signing_key: SigningKey::generate(&mut csprng),
        }
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Load a PKCS#8 PEM private key
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self, VerifyError> {
        let signing_key = SigningKey::from_pkcs8_pem(pem)
            .map_err(|e| VerifyError::KeyError(format!("Invalid private key: {}", e)))?;
        Ok(Self { signing_key })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, VerifyError> {
        let pem = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            VerifyError::KeyError(format!(
                "Failed to read private key {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_pkcs8_pem(&pem)
    }

    /// Sign the canonical event, returning base64
    pub fn sign_event(&self, event: &Event) -> String {
        let signature = self.signing_key.sign(&canonicalize_event(event));
        BASE64.encode(signature.to_bytes())
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Legacy encoding: base64 of the raw 32 key bytes
    pub fn public_key_base64(&self) -> String {
        BASE64.encode(self.verifying_key().as_bytes())
    }

    pub fn public_key_pem(&self) -> Result<String, VerifyError> {
        self.verifying_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| VerifyError::KeyError(format!("Failed to encode public key: {}", e)))
    }

    /// Current encoding: `{"algorithm":"ED25519","key":"<pem>"}`
    pub fn public_key_wrapped(&self) -> Result<String, VerifyError> {
        let wrapped = serde_json::json!({
            "algorithm": ED25519_ALGORITHM,
            "key": self.public_key_pem()?,
        });
        Ok(wrapped.to_string())
    }

    /// Build a signed envelope around `event`
    pub fn sign_envelope(&self, event: Event, public_key: String) -> Envelope {
        let signature = self.sign_event(&event);
        Envelope {
            signature: Some(signature),
            public_key: Some(public_key),
            ..Envelope::new(event)
        }
    }
}
