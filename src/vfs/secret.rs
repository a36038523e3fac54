//! Credential secrets with encryption at rest
//!
//! A [`Secret`] is a small state machine over the credential payloads stored
//! in backend configurations: it starts out empty or plain, is encrypted
//! before persistence, and is redacted before a configuration leaves the
//! process. Ciphertext is AES-256-GCM with the secret's additional data
//! bound as AEAD associated data, so an envelope copied onto another owner
//! fails to decrypt.

use std::sync::RwLock;

use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

const NONCE_SIZE: usize = 12;

static MASTER_KEY: RwLock<Option<[u8; 32]>> = RwLock::new(None);

/// Install the process-wide master key used to encrypt and decrypt secrets.
///
/// Must be called once at startup, before any configuration is validated.
pub fn set_master_key(passphrase: &str) {
    let key: [u8; 32] = Sha256::digest(passphrase.as_bytes()).into();
    *MASTER_KEY.write().expect("master key lock poisoned") = Some(key);
}

fn master_key() -> Result<[u8; 32], SecretError> {
    MASTER_KEY
        .read()
        .expect("master key lock poisoned")
        .ok_or(SecretError::MasterKeyNotSet)
}

/// Errors from secret encryption and decryption
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("no master encryption key is configured")]
    MasterKeyNotSet,

    #[error("invalid secret status for this operation: {0}")]
    WrongStatus(&'static str),

    #[error("malformed secret payload: {0}")]
    Malformed(String),

    #[error("payload encryption or decryption failed")]
    Crypto,
}

/// Lifecycle state of a secret payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecretStatus {
    /// No payload
    #[default]
    #[serde(rename = "")]
    Empty,
    /// Plaintext payload, only acceptable as transient input
    #[serde(rename = "Plain")]
    Plain,
    /// Payload encrypted with AES-256-GCM
    #[serde(rename = "AES-256-GCM")]
    Aes256Gcm,
    /// Payload removed before crossing an external boundary
    #[serde(rename = "Redacted")]
    Redacted,
}

/// An opaque credential envelope
///
/// Serializes as `{status, payload, additional_data}`; consumers must not
/// assume anything about the payload layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Secret {
    #[serde(default)]
    status: SecretStatus,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    payload: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    additional_data: String,
}

impl Secret {
    /// A secret with no payload
    pub fn new_empty() -> Self {
        Self::default()
    }

    /// A secret holding a plaintext payload
    pub fn new_plain(payload: impl Into<String>) -> Self {
        Self {
            status: SecretStatus::Plain,
            payload: payload.into(),
            additional_data: String::new(),
        }
    }

    /// Current lifecycle state
    pub fn status(&self) -> SecretStatus {
        self.status
    }

    pub fn is_empty(&self) -> bool {
        self.status == SecretStatus::Empty
    }

    pub fn is_plain(&self) -> bool {
        self.status == SecretStatus::Plain
    }

    pub fn is_encrypted(&self) -> bool {
        self.status == SecretStatus::Aes256Gcm
    }

    pub fn is_redacted(&self) -> bool {
        self.status == SecretStatus::Redacted
    }

    /// Check that an encrypted payload is a well-formed envelope
    pub fn is_valid(&self) -> bool {
        if !self.is_encrypted() {
            return false;
        }
        match BASE64.decode(&self.payload) {
            Ok(raw) => raw.len() > NONCE_SIZE,
            Err(_) => false,
        }
    }

    /// Check that the secret is acceptable as configuration input:
    /// either valid ciphertext or a non-empty plaintext
    pub fn is_valid_input(&self) -> bool {
        if self.is_valid() {
            return true;
        }
        self.is_plain() && !self.payload.is_empty()
    }

    /// The raw payload (plaintext or ciphertext envelope, per status)
    pub fn get_payload(&self) -> &str {
        &self.payload
    }

    /// Bind the AEAD associated data used on the next `encrypt`
    pub fn set_additional_data(&mut self, additional_data: impl Into<String>) {
        self.additional_data = additional_data.into();
    }

    /// Remove confidential data before the secret crosses an external boundary
    pub fn hide(&mut self) {
        self.payload.clear();
        self.additional_data.clear();
        self.status = SecretStatus::Redacted;
    }

    /// Encrypt a plaintext payload in place.
    ///
    /// The envelope is `base64(nonce || ciphertext)` with the additional
    /// data authenticated but not stored inside the ciphertext.
    pub fn encrypt(&mut self) -> Result<(), SecretError> {
        if !self.is_plain() {
            return Err(SecretError::WrongStatus("encrypt requires a plain secret"));
        }
        let key = master_key()?;
        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| SecretError::Crypto)?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(
                nonce,
                Payload {
                    msg: self.payload.as_bytes(),
                    aad: self.additional_data.as_bytes(),
                },
            )
            .map_err(|_| SecretError::Crypto)?;

        let mut envelope = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        envelope.extend_from_slice(&nonce_bytes);
        envelope.extend_from_slice(&ciphertext);
        self.payload = BASE64.encode(envelope);
        self.status = SecretStatus::Aes256Gcm;
        Ok(())
    }

    /// Decrypt an encrypted payload in place, restoring the plain state
    pub fn try_decrypt(&mut self) -> Result<(), SecretError> {
        if self.is_empty() {
            return Ok(());
        }
        if !self.is_encrypted() {
            return Err(SecretError::WrongStatus(
                "decrypt requires an encrypted secret",
            ));
        }
        let raw = BASE64
            .decode(&self.payload)
            .map_err(|e| SecretError::Malformed(e.to_string()))?;
        if raw.len() <= NONCE_SIZE {
            return Err(SecretError::Malformed("envelope too short".to_string()));
        }
        let key = master_key()?;
        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| SecretError::Crypto)?;
        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_SIZE);
        let plaintext = cipher
            .decrypt(
                Nonce::from_slice(nonce_bytes),
                Payload {
                    msg: ciphertext,
                    aad: self.additional_data.as_bytes(),
                },
            )
            .map_err(|_| SecretError::Crypto)?;
        self.payload = String::from_utf8(plaintext)
            .map_err(|e| SecretError::Malformed(e.to_string()))?;
        self.status = SecretStatus::Plain;
        Ok(())
    }

    /// Deep equality over status, payload and additional data
    pub fn is_equal(&self, other: &Secret) -> bool {
        self.status == other.status
            && self.payload == other.payload
            && self.additional_data == other.additional_data
    }
}
