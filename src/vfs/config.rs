//! Backend configuration records
//!
//! One record family per storage backend kind. Each record is normalized
//! and validated before being accepted, encrypts its plaintext secrets
//! before persistence, and offers two comparison predicates: `is_equal`
//! (deep structural equality) and `is_same_resource` (do two profiles point
//! at the same backing storage, used for client pooling).

use serde::{Deserialize, Serialize};
use url::Url;

use super::error::{FsResult, ValidationError, VfsError};
use super::secret::Secret;
use super::clean_path;

const VALID_ACCESS_TIERS: [&str; 4] = ["", "Archive", "Hot", "Cool"];

/// Normalize a key prefix in place: no leading slash, lexically cleaned,
/// always slash-terminated when non-empty
fn validate_key_prefix(key_prefix: &mut String) -> Result<(), ValidationError> {
    if key_prefix.is_empty() {
        return Ok(());
    }
    if key_prefix.starts_with('/') {
        return Err(ValidationError::new("key_prefix cannot start with /"));
    }
    *key_prefix = clean_path(key_prefix);
    if !key_prefix.is_empty() && !key_prefix.ends_with('/') {
        key_prefix.push('/');
    }
    Ok(())
}

/// Absent secrets compare and validate as empty ones
fn secret_or_empty(secret: &Option<Secret>) -> Secret {
    secret.clone().unwrap_or_default()
}

fn encrypt_plain_secret(
    secret: &mut Option<Secret>,
    additional_data: &str,
    what: &str,
) -> Result<(), ValidationError> {
    if let Some(secret) = secret.as_mut() {
        if secret.is_plain() {
            secret.set_additional_data(additional_data);
            secret
                .encrypt()
                .map_err(|e| ValidationError::new(format!("could not encrypt {}: {}", what, e)))?;
        }
    }
    Ok(())
}

/// Configuration for S3 compatible object storage backends
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct S3FsConfig {
    pub bucket: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub key_prefix: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub region: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub endpoint: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub access_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_secret: Option<Secret>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub role_arn: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub storage_class: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub acl: String,
    pub force_path_style: bool,
    /// Multipart upload part size in MiB, 0 for the SDK default
    pub upload_part_size: i64,
    pub upload_concurrency: i32,
    /// Ranged download part size in MiB, 0 for the SDK default
    pub download_part_size: i64,
    pub download_concurrency: i32,
    /// Max seconds per uploaded part, 0 for no limit
    pub upload_part_max_time: i32,
    /// Max seconds per downloaded part, 0 for no limit
    pub download_part_max_time: i32,
}

impl S3FsConfig {
    /// Remove confidential data before the config crosses an external boundary
    pub fn hide_confidential_data(&mut self) {
        if let Some(secret) = self.access_secret.as_mut() {
            secret.hide();
        }
    }

    /// Normalize and validate the configuration in place
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        if self.access_secret.is_none() {
            self.access_secret = Some(Secret::new_empty());
        }
        if self.bucket.is_empty() {
            return Err(ValidationError::new("bucket cannot be empty"));
        }
        // the region may be embedded within the endpoint for some S3
        // compatible object storage
        if self.endpoint.is_empty() && self.region.is_empty() {
            return Err(ValidationError::new("region cannot be empty"));
        }
        self.check_credentials()?;
        validate_key_prefix(&mut self.key_prefix)?;
        self.storage_class = self.storage_class.trim().to_string();
        self.acl = self.acl.trim().to_string();
        self.check_part_size_and_concurrency()
    }

    /// Validate, then encrypt the access secret if it is in plain text.
    /// The additional data binds the ciphertext to its logical owner.
    pub fn validate_and_encrypt_credentials(
        &mut self,
        additional_data: &str,
    ) -> Result<(), ValidationError> {
        self.validate()
            .map_err(|e| ValidationError::new(format!("could not validate s3 config: {}", e)))?;
        encrypt_plain_secret(&mut self.access_secret, additional_data, "s3 access secret")
    }

    /// Deep structural equality, absent secrets compare as empty
    pub fn is_equal(&self, other: &S3FsConfig) -> bool {
        if self.bucket != other.bucket
            || self.key_prefix != other.key_prefix
            || self.region != other.region
            || self.access_key != other.access_key
            || self.role_arn != other.role_arn
            || self.endpoint != other.endpoint
            || self.storage_class != other.storage_class
            || self.acl != other.acl
            || self.force_path_style != other.force_path_style
        {
            return false;
        }
        if !self.are_multipart_fields_equal(other) {
            return false;
        }
        secret_or_empty(&self.access_secret).is_equal(&secret_or_empty(&other.access_secret))
    }

    /// Check whether two profiles point at the same backing bucket
    pub fn is_same_resource(&self, other: &S3FsConfig) -> bool {
        if self.bucket != other.bucket {
            return false;
        }
        if self.endpoint != other.endpoint {
            return false;
        }
        self.region == other.region
    }

    fn are_multipart_fields_equal(&self, other: &S3FsConfig) -> bool {
        self.upload_part_size == other.upload_part_size
            && self.upload_concurrency == other.upload_concurrency
            && self.download_part_size == other.download_part_size
            && self.download_concurrency == other.download_concurrency
            && self.upload_part_max_time == other.upload_part_max_time
            && self.download_part_max_time == other.download_part_max_time
    }

    fn check_credentials(&self) -> Result<(), ValidationError> {
        let secret = secret_or_empty(&self.access_secret);
        if self.access_key.is_empty() && !secret.is_empty() {
            return Err(ValidationError::new(
                "access_key cannot be empty with access_secret not empty",
            ));
        }
        if secret.is_empty() && !self.access_key.is_empty() {
            return Err(ValidationError::new(
                "access_secret cannot be empty with access_key not empty",
            ));
        }
        if secret.is_encrypted() && !secret.is_valid() {
            return Err(ValidationError::new("invalid encrypted access_secret"));
        }
        if !secret.is_empty() && !secret.is_valid_input() {
            return Err(ValidationError::new("invalid access_secret"));
        }
        Ok(())
    }

    fn check_part_size_and_concurrency(&self) -> Result<(), ValidationError> {
        if self.upload_part_size != 0 && !(5..=5000).contains(&self.upload_part_size) {
            return Err(ValidationError::new(
                "upload_part_size cannot be != 0, lower than 5 (MB) or greater than 5000 (MB)",
            ));
        }
        if !(0..=64).contains(&self.upload_concurrency) {
            return Err(ValidationError::new(format!(
                "invalid upload concurrency: {}",
                self.upload_concurrency
            )));
        }
        if self.download_part_size != 0 && !(5..=5000).contains(&self.download_part_size) {
            return Err(ValidationError::new(
                "download_part_size cannot be != 0, lower than 5 (MB) or greater than 5000 (MB)",
            ));
        }
        if !(0..=64).contains(&self.download_concurrency) {
            return Err(ValidationError::new(format!(
                "invalid download concurrency: {}",
                self.download_concurrency
            )));
        }
        Ok(())
    }
}

/// Configuration for Google Cloud Storage backends
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GcsFsConfig {
    pub bucket: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub key_prefix: String,
    /// Service account credentials, unused with automatic credentials
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Secret>,
    /// 1 to use the environment's application default credentials
    pub automatic_credentials: i32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub storage_class: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub acl: String,
    /// Upload chunk size in MiB, 0 for the SDK default
    pub upload_part_size: i64,
    /// Max seconds per uploaded chunk, 0 for no limit
    pub upload_part_max_time: i64,
}

impl GcsFsConfig {
    /// Remove confidential data before the config crosses an external boundary
    pub fn hide_confidential_data(&mut self) {
        if let Some(secret) = self.credentials.as_mut() {
            secret.hide();
        }
    }

    /// Normalize and validate the configuration in place
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        if self.credentials.is_none() || self.automatic_credentials == 1 {
            self.credentials = Some(Secret::new_empty());
        }
        if self.bucket.is_empty() {
            return Err(ValidationError::new("bucket cannot be empty"));
        }
        validate_key_prefix(&mut self.key_prefix)?;
        let credentials = secret_or_empty(&self.credentials);
        if credentials.is_encrypted() && !credentials.is_valid() {
            return Err(ValidationError::new("invalid encrypted credentials"));
        }
        if self.automatic_credentials == 0 && !credentials.is_valid_input() {
            return Err(ValidationError::new("invalid credentials"));
        }
        self.storage_class = self.storage_class.trim().to_string();
        self.acl = self.acl.trim().to_string();
        if self.upload_part_size < 0 {
            self.upload_part_size = 0;
        }
        if self.upload_part_max_time < 0 {
            self.upload_part_max_time = 0;
        }
        Ok(())
    }

    /// Validate, then encrypt the credentials if they are in plain text
    pub fn validate_and_encrypt_credentials(
        &mut self,
        additional_data: &str,
    ) -> Result<(), ValidationError> {
        self.validate()
            .map_err(|e| ValidationError::new(format!("could not validate GCS config: {}", e)))?;
        encrypt_plain_secret(&mut self.credentials, additional_data, "GCS credentials")
    }

    /// Deep structural equality, absent secrets compare as empty
    pub fn is_equal(&self, other: &GcsFsConfig) -> bool {
        if self.bucket != other.bucket
            || self.key_prefix != other.key_prefix
            || self.automatic_credentials != other.automatic_credentials
            || self.storage_class != other.storage_class
            || self.acl != other.acl
            || self.upload_part_size != other.upload_part_size
            || self.upload_part_max_time != other.upload_part_max_time
        {
            return false;
        }
        secret_or_empty(&self.credentials).is_equal(&secret_or_empty(&other.credentials))
    }

    /// Check whether two profiles point at the same backing bucket
    pub fn is_same_resource(&self, other: &GcsFsConfig) -> bool {
        self.bucket == other.bucket
    }
}

/// Configuration for Azure Blob Storage backends
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AzBlobFsConfig {
    /// Container name, may be omitted when the SAS URL carries it
    pub container: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub account_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub endpoint: String,
    /// Storage account key, leave blank to use a SAS URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_key: Option<Secret>,
    /// Shared access signature URL, leave blank if using account and key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sas_url: Option<Secret>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub key_prefix: String,
    /// Upload part size in MiB
    pub upload_part_size: i64,
    pub upload_concurrency: i32,
    /// Download part size in MiB
    pub download_part_size: i64,
    pub download_concurrency: i32,
    pub use_emulator: bool,
    /// Blob access tier, one of "", "Archive", "Hot", "Cool"
    #[serde(skip_serializing_if = "String::is_empty")]
    pub access_tier: String,
}

impl AzBlobFsConfig {
    /// Remove confidential data before the config crosses an external boundary
    pub fn hide_confidential_data(&mut self) {
        if let Some(secret) = self.account_key.as_mut() {
            secret.hide();
        }
        if let Some(secret) = self.sas_url.as_mut() {
            secret.hide();
        }
    }

    /// Normalize and validate the configuration in place
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        if self.account_key.is_none() {
            self.account_key = Some(Secret::new_empty());
        }
        if self.sas_url.is_none() {
            self.sas_url = Some(Secret::new_empty());
        }
        // the container may be embedded within the SAS URL, checked at mount
        if secret_or_empty(&self.sas_url).is_empty() && self.container.is_empty() {
            return Err(ValidationError::new("container cannot be empty"));
        }
        self.check_credentials()?;
        validate_key_prefix(&mut self.key_prefix)?;
        self.check_part_size_and_concurrency()?;
        if !VALID_ACCESS_TIERS.contains(&self.access_tier.as_str()) {
            return Err(ValidationError::new(format!(
                "invalid access_tier {:?}, valid values: \"\", {}",
                self.access_tier,
                VALID_ACCESS_TIERS[1..].join(", ")
            )));
        }
        Ok(())
    }

    /// Validate, then encrypt the account key and SAS URL if in plain text
    pub fn validate_and_encrypt_credentials(
        &mut self,
        additional_data: &str,
    ) -> Result<(), ValidationError> {
        self.validate().map_err(|e| {
            ValidationError::new(format!("could not validate Azure Blob config: {}", e))
        })?;
        encrypt_plain_secret(
            &mut self.account_key,
            additional_data,
            "Azure blob account key",
        )?;
        encrypt_plain_secret(&mut self.sas_url, additional_data, "Azure blob SAS URL")
    }

    /// Decrypt the account key and SAS URL, used when mounting the backend
    pub fn try_decrypt(&mut self) -> FsResult<()> {
        if let Some(secret) = self.account_key.as_mut() {
            secret.try_decrypt().map_err(|e| VfsError::Credential {
                message: format!("unable to decrypt account key: {}", e),
            })?;
        }
        if let Some(secret) = self.sas_url.as_mut() {
            secret.try_decrypt().map_err(|e| VfsError::Credential {
                message: format!("unable to decrypt SAS URL: {}", e),
            })?;
        }
        Ok(())
    }

    /// Deep structural equality, absent secrets compare as empty
    pub fn is_equal(&self, other: &AzBlobFsConfig) -> bool {
        if self.container != other.container
            || self.account_name != other.account_name
            || self.endpoint != other.endpoint
            || self.key_prefix != other.key_prefix
            || self.upload_part_size != other.upload_part_size
            || self.upload_concurrency != other.upload_concurrency
            || self.download_part_size != other.download_part_size
            || self.download_concurrency != other.download_concurrency
            || self.use_emulator != other.use_emulator
            || self.access_tier != other.access_tier
        {
            return false;
        }
        if !secret_or_empty(&self.sas_url).is_equal(&secret_or_empty(&other.sas_url)) {
            return false;
        }
        secret_or_empty(&self.account_key).is_equal(&secret_or_empty(&other.account_key))
    }

    /// Check whether two profiles point at the same storage account
    pub fn is_same_resource(&self, other: &AzBlobFsConfig) -> bool {
        if self.account_name != other.account_name {
            return false;
        }
        if self.endpoint != other.endpoint {
            return false;
        }
        secret_or_empty(&self.sas_url).get_payload()
            == secret_or_empty(&other.sas_url).get_payload()
    }

    fn check_credentials(&self) -> Result<(), ValidationError> {
        let sas_url = secret_or_empty(&self.sas_url);
        if sas_url.is_plain() {
            Url::parse(sas_url.get_payload())
                .map_err(|e| ValidationError::new(format!("invalid sas_url: {}", e)))?;
            return Ok(());
        }
        if sas_url.is_encrypted() && !sas_url.is_valid() {
            return Err(ValidationError::new("invalid encrypted sas_url"));
        }
        if !sas_url.is_empty() {
            return Ok(());
        }
        let account_key = secret_or_empty(&self.account_key);
        if self.account_name.is_empty() || !account_key.is_valid_input() {
            return Err(ValidationError::new(
                "credentials cannot be empty or invalid",
            ));
        }
        if account_key.is_encrypted() && !account_key.is_valid() {
            return Err(ValidationError::new("invalid encrypted account_key"));
        }
        Ok(())
    }

    fn check_part_size_and_concurrency(&self) -> Result<(), ValidationError> {
        if !(0..=100).contains(&self.upload_part_size) {
            return Err(ValidationError::new(format!(
                "invalid upload part size: {}",
                self.upload_part_size
            )));
        }
        if !(0..=64).contains(&self.upload_concurrency) {
            return Err(ValidationError::new(format!(
                "invalid upload concurrency: {}",
                self.upload_concurrency
            )));
        }
        if !(0..=100).contains(&self.download_part_size) {
            return Err(ValidationError::new(format!(
                "invalid download part size: {}",
                self.download_part_size
            )));
        }
        if !(0..=64).contains(&self.download_concurrency) {
            return Err(ValidationError::new(format!(
                "invalid download concurrency: {}",
                self.download_concurrency
            )));
        }
        Ok(())
    }
}

/// Configuration for the encrypted local filesystem wrapper
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptFsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<Secret>,
}

impl CryptFsConfig {
    /// Remove confidential data before the config crosses an external boundary
    pub fn hide_confidential_data(&mut self) {
        if let Some(secret) = self.passphrase.as_mut() {
            secret.hide();
        }
    }

    /// Validate the configuration
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        let passphrase = secret_or_empty(&self.passphrase);
        if passphrase.is_empty() {
            return Err(ValidationError::new("invalid passphrase"));
        }
        if !passphrase.is_valid_input() {
            return Err(ValidationError::new(
                "passphrase cannot be empty or invalid",
            ));
        }
        if passphrase.is_encrypted() && !passphrase.is_valid() {
            return Err(ValidationError::new("invalid encrypted passphrase"));
        }
        Ok(())
    }

    /// Validate, then encrypt the passphrase if it is in plain text
    pub fn validate_and_encrypt_credentials(
        &mut self,
        additional_data: &str,
    ) -> Result<(), ValidationError> {
        self.validate().map_err(|e| {
            ValidationError::new(format!("could not validate Crypt fs config: {}", e))
        })?;
        encrypt_plain_secret(&mut self.passphrase, additional_data, "Crypt fs passphrase")
    }

    /// Deep structural equality, absent secrets compare as empty
    pub fn is_equal(&self, other: &CryptFsConfig) -> bool {
        secret_or_empty(&self.passphrase).is_equal(&secret_or_empty(&other.passphrase))
    }

    /// Check whether two profiles use the same passphrase
    pub fn is_same_resource(&self, other: &CryptFsConfig) -> bool {
        secret_or_empty(&self.passphrase).get_payload()
            == secret_or_empty(&other.passphrase).get_payload()
    }
}
