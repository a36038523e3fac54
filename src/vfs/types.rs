//! Common types shared by all filesystem backends

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Flag for `create`: verify (and synthesize, on object stores) the parent
/// directory before opening the target for write.
pub const CHECK_PARENT_DIR: u32 = 1;

/// MIME type reported for directories
pub const DIR_MIME_TYPE: &str = "inode/directory";

/// Name of the local filesystem backend
pub const OS_FS_NAME: &str = "osfs";
/// Name of the encrypted local filesystem backend
pub const CRYPT_FS_NAME: &str = "cryptfs";
/// Name prefix of SFTP filesystem backends
pub const SFTP_FS_PREFIX: &str = "sftpfs";
/// Name prefix of HTTP filesystem backends
pub const HTTP_FS_PREFIX: &str = "httpfs";
/// Name prefix of S3 object storage backends
pub const S3_FS_PREFIX: &str = "s3fs";
/// Name prefix of Google Cloud Storage backends
pub const GCS_FS_PREFIX: &str = "gcsfs";
/// Name prefix of Azure Blob Storage backends
pub const AZBLOB_FS_PREFIX: &str = "azblobfs";

/// File or directory metadata across all backends
#[derive(Debug, Clone)]
pub struct FileInfo {
    /// Base name of the file
    pub name: String,

    /// Size in bytes (0 for directories on object stores)
    pub size: i64,

    /// Unix mode bits (0 where the backend has none)
    pub mode: u32,

    /// Last modification time
    pub mod_time: SystemTime,

    /// Is this a directory?
    pub is_dir: bool,

    /// Is this a symbolic link?
    pub is_symlink: bool,
}

impl FileInfo {
    /// Metadata for a regular file
    pub fn file(name: impl Into<String>, size: i64, mod_time: SystemTime) -> Self {
        Self {
            name: name.into(),
            size,
            mode: 0,
            mod_time,
            is_dir: false,
            is_symlink: false,
        }
    }

    /// Metadata for a directory
    pub fn directory(name: impl Into<String>, mod_time: SystemTime) -> Self {
        Self {
            name: name.into(),
            size: 0,
            mode: 0,
            mod_time,
            is_dir: true,
            is_symlink: false,
        }
    }

    /// Check if this is a regular file
    pub fn is_regular(&self) -> bool {
        !self.is_dir && !self.is_symlink
    }

    /// Replace the modification time, used when an external metadata store
    /// overrides what the backend reports
    pub fn set_mod_time(&mut self, mod_time: SystemTime) {
        self.mod_time = mod_time;
    }
}

/// Result of a quota check for an upload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuotaCheckResult {
    pub has_space: bool,
    pub allowed_size: i64,
    pub allowed_files: i32,
    pub used_size: i64,
    pub used_files: i32,
    pub quota_size: i64,
    pub quota_files: i32,
}

impl QuotaCheckResult {
    /// Remaining allowed size, 0 when the size quota is unlimited
    pub fn remaining_size(&self) -> i64 {
        if self.quota_size > 0 {
            return self.quota_size - self.used_size;
        }
        0
    }

    /// Remaining allowed files, 0 when the file quota is unlimited
    pub fn remaining_files(&self) -> i32 {
        if self.quota_files > 0 {
            return self.quota_files - self.used_files;
        }
        0
    }
}

/// Filesystem usage statistics, as reported by a disk-free query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatVfs {
    /// Block size
    pub bsize: u64,
    /// Total blocks
    pub blocks: u64,
    /// Free blocks
    pub bfree: u64,
    /// Blocks available to unprivileged users
    pub bavail: u64,
    /// Total inodes
    pub files: u64,
    /// Free inodes
    pub ffree: u64,
    /// Inodes available to unprivileged users
    pub favail: u64,
}

impl StatVfs {
    /// Bytes available to unprivileged users
    pub fn free_space(&self) -> u64 {
        self.bavail * self.bsize
    }
}

/// Convert milliseconds since the Unix epoch to a `SystemTime`.
/// Negative values saturate to the epoch.
pub fn system_time_from_msec(msec: i64) -> SystemTime {
    if msec <= 0 {
        return UNIX_EPOCH;
    }
    UNIX_EPOCH + Duration::from_millis(msec as u64)
}

/// Milliseconds since the Unix epoch for a `SystemTime`.
/// Times before the epoch report 0.
pub fn msec_since_epoch(t: SystemTime) -> i64 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_info() {
        let info = FileInfo::file("report.txt", 2048, UNIX_EPOCH);
        assert!(info.is_regular());
        assert!(!info.is_dir);
        assert_eq!(info.size, 2048);

        let dir = FileInfo::directory("docs", UNIX_EPOCH);
        assert!(dir.is_dir);
        assert!(!dir.is_regular());
    }

    #[test]
    fn test_quota_remaining() {
        let result = QuotaCheckResult {
            has_space: true,
            quota_size: 100,
            used_size: 40,
            quota_files: 10,
            used_files: 3,
            ..Default::default()
        };
        assert_eq!(result.remaining_size(), 60);
        assert_eq!(result.remaining_files(), 7);
        // remaining + used always reconstructs the quota when one is set
        assert_eq!(result.remaining_size() + result.used_size, result.quota_size);
    }

    #[test]
    fn test_quota_unlimited() {
        let result = QuotaCheckResult {
            used_size: 123,
            used_files: 4,
            ..Default::default()
        };
        assert_eq!(result.remaining_size(), 0);
        assert_eq!(result.remaining_files(), 0);
    }

    #[test]
    fn test_statvfs_free_space() {
        let st = StatVfs {
            bsize: 4096,
            blocks: 1000,
            bfree: 500,
            bavail: 250,
            ..Default::default()
        };
        assert_eq!(st.free_space(), 250 * 4096);
    }

    #[test]
    fn test_msec_conversions() {
        let t = system_time_from_msec(1_500);
        assert_eq!(msec_since_epoch(t), 1_500);
        assert_eq!(system_time_from_msec(-5), UNIX_EPOCH);
        assert_eq!(msec_since_epoch(UNIX_EPOCH), 0);
    }
}
