//! Virtual filesystem abstraction for heterogeneous storage backends
//!
//! This module is the core that unifies local disk, SFTP, HTTP, S3, Google
//! Cloud Storage, Azure Blob and the local encryption wrapper behind one
//! capability-based contract. Protocol frontends only ever talk to the
//! [`Fs`] and [`File`] traits; everything backend specific stays behind
//! them.
//!
//! # Features
//!
//! - **Async-first design**: all operations use `async/await` on Tokio
//! - **Trait-based abstraction**: one [`Fs`] contract for every backend,
//!   optional capabilities as sibling traits negotiated at run time
//! - **Streaming I/O**: uploads to object stores flow through a pipe whose
//!   close reports the uploader's terminal error
//! - **Capability predicates**: deterministic functions over [`Fs::name`]
//!   drive truncate, resume and atomic-upload decisions in upper layers
//! - **Secure credential handling**: config secrets are encrypted at rest

use std::collections::HashSet;
use std::io;
use std::time::SystemTime;

use async_trait::async_trait;
use tracing::Level;

pub mod config;
pub mod error;
pub mod metadata;
pub mod pipe;
pub mod secret;
pub mod settings;
pub mod types;

mod osfs;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::{AzBlobFsConfig, CryptFsConfig, GcsFsConfig, S3FsConfig};
pub use error::{FsResult, ValidationError, VfsError};
pub use metadata::{
    check_metadata_consistency, folder_mod_times, has_metadater, register_metadater,
    update_file_info_mod_time, Metadater,
};
pub use osfs::{OsFile, OsFs};
pub use pipe::{
    pipe, pipe_in_dir, pipe_in_temp_dir, PipeReader, PipeWriter, PipeWriterAt, UploadCompletion,
};
pub use secret::{set_master_key, Secret, SecretStatus};
pub use types::{
    FileInfo, QuotaCheckResult, StatVfs, AZBLOB_FS_PREFIX, CHECK_PARENT_DIR, CRYPT_FS_NAME,
    DIR_MIME_TYPE, GCS_FS_PREFIX, HTTP_FS_PREFIX, OS_FS_NAME, S3_FS_PREFIX, SFTP_FS_PREFIX,
};

use crate::logging::fs_log;

/// Cleanup hook returned by `open` and `create`, invoked by the caller on
/// every exit path of the enclosing request
pub type CleanupFn = Box<dyn FnOnce() + Send>;

/// Walk callback: receives the path, the entry info when available and the
/// error that occurred for the entry. Returning an error halts the walk.
pub type WalkFn<'a> = dyn FnMut(&str, Option<&FileInfo>, Option<&VfsError>) -> FsResult<()> + Send + 'a;

/// Result of opening a file for reading
///
/// Backends with random-access reads return the file handle directly.
/// Object backends stream into a pipe on a background task and return the
/// reader side instead.
pub struct OpenedRead {
    pub file: Option<Box<dyn File>>,
    pub reader: Option<PipeReader>,
    pub cleanup: Option<CleanupFn>,
}

/// Result of opening a file for writing
///
/// Object backends return a [`PipeWriter`] fronting a background uploader;
/// its `close` reports the upload's terminal error.
pub struct OpenedWrite {
    pub file: Option<Box<dyn File>>,
    pub writer: Option<PipeWriter>,
    pub cleanup: Option<CleanupFn>,
}

/// The contract every filesystem backend implements
///
/// One instance represents one mounted backend for one logical connection.
/// Instances must be safe for concurrent operations on distinct file
/// handles; operations on a single handle are serialized by the caller.
///
/// Path-taking operations receive backend-native paths produced by
/// [`Fs::resolve_path`]; [`Fs::get_relative_path`] is the inverse mapping
/// back to user-visible paths.
#[async_trait]
pub trait Fs: Send + Sync {
    /// Stable name whose prefix classifies the backend kind
    fn name(&self) -> &str;

    /// Opaque per-connection identifier, used only for logging
    fn connection_id(&self) -> &str;

    /// File info for a path, following symlinks
    async fn stat(&self, name: &str) -> FsResult<FileInfo>;

    /// File info for a path without following symlinks
    async fn lstat(&self, name: &str) -> FsResult<FileInfo>;

    /// Open for sequential and positioned reads starting at `offset`
    async fn open(&self, name: &str, offset: u64) -> FsResult<OpenedRead>;

    /// Open for writing. `flag` carries platform open(2) bits, 0 for the
    /// default create-and-truncate; `checks` is a bitmask of `CHECK_*`
    /// constants.
    async fn create(&self, name: &str, flag: i32, checks: u32) -> FsResult<OpenedWrite>;

    /// Rename a file or directory, returning the affected file count and
    /// bytes. Object backends implement this as copy and delete.
    async fn rename(&self, source: &str, target: &str) -> FsResult<(usize, u64)>;

    async fn remove(&self, name: &str, is_dir: bool) -> FsResult<()>;

    async fn mkdir(&self, name: &str) -> FsResult<()>;

    async fn symlink(&self, source: &str, target: &str) -> FsResult<()> {
        let _ = (source, target);
        Err(VfsError::unsupported(self.name(), "symlink"))
    }

    async fn readlink(&self, name: &str) -> FsResult<String> {
        let _ = name;
        Err(VfsError::unsupported(self.name(), "readlink"))
    }

    async fn chown(&self, name: &str, uid: i32, gid: i32) -> FsResult<()> {
        let _ = (name, uid, gid);
        Err(VfsError::unsupported(self.name(), "chown"))
    }

    async fn chmod(&self, name: &str, mode: u32) -> FsResult<()> {
        let _ = (name, mode);
        Err(VfsError::unsupported(self.name(), "chmod"))
    }

    /// Set access and modification times. `is_uploading` tells backends
    /// with sidecar metadata that the file is still being written.
    async fn chtimes(
        &self,
        name: &str,
        atime: SystemTime,
        mtime: SystemTime,
        is_uploading: bool,
    ) -> FsResult<()> {
        let _ = (name, atime, mtime, is_uploading);
        Err(VfsError::unsupported(self.name(), "chtimes"))
    }

    async fn truncate(&self, name: &str, size: u64) -> FsResult<()> {
        let _ = (name, size);
        Err(VfsError::unsupported(self.name(), "truncate"))
    }

    /// Directory listing. Callers must not assume any ordering.
    async fn read_dir(&self, dirname: &str) -> FsResult<Vec<FileInfo>>;

    /// Lazy depth-first traversal rooted at `root`
    async fn walk(&self, root: &str, walk_fn: &mut WalkFn<'_>) -> FsResult<()>;

    /// True if a partial upload can be resumed with positioned writes
    /// across multiple opens of the same path
    fn is_upload_resume_supported(&self) -> bool;

    /// True if uploads can go to a temporary sibling renamed into place
    fn is_atomic_upload_supported(&self) -> bool;

    /// Initialize the user's root if absent, true on success
    async fn check_root_path(&self, username: &str, uid: i32, gid: i32) -> bool;

    /// Translate a user-visible path to the backend-native path
    fn resolve_path(&self, virtual_path: &str) -> FsResult<String>;

    fn is_not_exist(&self, err: &VfsError) -> bool {
        err.is_not_exist()
    }

    fn is_permission(&self, err: &VfsError) -> bool {
        err.is_permission()
    }

    fn is_not_supported(&self, err: &VfsError) -> bool {
        err.is_not_supported()
    }

    /// Count files and bytes under the root
    async fn scan_root_dir_contents(&self) -> FsResult<(usize, u64)>;

    /// Count files and bytes under a directory
    async fn get_dir_size(&self, dirname: &str) -> FsResult<(usize, u64)>;

    /// Sibling temporary path used for atomic uploads via rename
    fn get_atomic_upload_path(&self, name: &str) -> String;

    /// Inverse of [`Fs::resolve_path`]
    fn get_relative_path(&self, name: &str) -> String;

    /// Compose path elements with the backend's separator semantics
    fn join(&self, elems: &[&str]) -> String;

    /// True if mounted virtual folders are handled by this backend itself
    fn has_virtual_folders(&self) -> bool {
        false
    }

    async fn get_mime_type(&self, name: &str) -> FsResult<String> {
        let _ = name;
        Err(VfsError::unsupported(self.name(), "get_mime_type"))
    }

    /// Filesystem usage for the given directory.
    /// Fails with [`VfsError::StorageSizeUnavailable`] where unsupported.
    async fn get_available_disk_size(&self, dir_name: &str) -> FsResult<StatVfs> {
        let _ = dir_name;
        Err(VfsError::StorageSizeUnavailable)
    }

    /// Reconcile external metadata against the backend contents.
    /// A no-op for backends without sidecar metadata.
    async fn check_metadata(&self) -> FsResult<()> {
        Ok(())
    }

    /// Release all backend resources. Idempotent.
    async fn close(&self) -> FsResult<()>;
}

/// An open file bound to one filesystem instance
///
/// Positioned operations are only valid when the owning backend's
/// capability predicates allow them. After `close` no further operations
/// are permitted.
#[async_trait]
pub trait File: Send + Sync {
    fn name(&self) -> &str;

    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    async fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize>;

    async fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    async fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<usize>;

    async fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64>;

    async fn stat(&self) -> FsResult<FileInfo>;

    async fn truncate(&self, size: u64) -> FsResult<()>;

    /// Flush pending writes and release the handle
    async fn close(&mut self) -> FsResult<()>;
}

/// Backends that can resolve symlinks to a canonical absolute path
#[async_trait]
pub trait RealPather: Fs {
    async fn real_path(&self, path: &str) -> FsResult<String>;
}

/// Backends that can copy a known-size object server side
#[async_trait]
pub trait FileCopier: Fs {
    async fn copy_file(&self, source: &str, target: &str, src_size: i64) -> FsResult<()>;
}

/// Backends that can list the file names under a prefix, used by the
/// metadata consistency sweep
#[async_trait]
pub trait MetadataChecker: Fs {
    async fn file_names_in_prefix(&self, fs_prefix: &str) -> FsResult<HashSet<String>>;
}

/// True if `fs` is the local filesystem
pub fn is_local_os_fs(fs: &dyn Fs) -> bool {
    fs.name() == OS_FS_NAME
}

/// True if `fs` is the encrypted local filesystem
pub fn is_crypt_os_fs(fs: &dyn Fs) -> bool {
    fs.name() == CRYPT_FS_NAME
}

/// True if `fs` is an SFTP filesystem
pub fn is_sftp_fs(fs: &dyn Fs) -> bool {
    fs.name().starts_with(SFTP_FS_PREFIX)
}

/// True if `fs` is an HTTP filesystem
pub fn is_http_fs(fs: &dyn Fs) -> bool {
    fs.name().starts_with(HTTP_FS_PREFIX)
}

/// True if `fs` is an SFTP filesystem that buffers uploads
pub fn is_buffered_sftp_fs(fs: &dyn Fs) -> bool {
    if !is_sftp_fs(fs) {
        return false;
    }
    !fs.is_upload_resume_supported()
}

/// True if `fs` is local or SFTP with no buffering
pub fn is_local_or_unbuffered_sftp_fs(fs: &dyn Fs) -> bool {
    if is_local_os_fs(fs) {
        return true;
    }
    if is_sftp_fs(fs) {
        return fs.is_upload_resume_supported();
    }
    false
}

/// True if `fs` is local or SFTP
pub fn is_local_or_sftp_fs(fs: &dyn Fs) -> bool {
    is_local_os_fs(fs) || is_sftp_fs(fs)
}

/// True if `fs` supports truncating files
pub fn has_truncate_support(fs: &dyn Fs) -> bool {
    is_local_os_fs(fs) || is_sftp_fs(fs) || is_http_fs(fs)
}

/// True if `fs` never persists partial files on upload failure
pub fn has_implicit_atomic_uploads(fs: &dyn Fs) -> bool {
    let name = fs.name();
    name.starts_with(S3_FS_PREFIX)
        || name.starts_with(GCS_FS_PREFIX)
        || name.starts_with(AZBLOB_FS_PREFIX)
}

/// True if `fs` can open a file for reading and writing at the same time
pub fn has_open_rw_support(fs: &dyn Fs) -> bool {
    if is_local_os_fs(fs) {
        return true;
    }
    if is_sftp_fs(fs) && fs.is_upload_resume_supported() {
        return true;
    }
    false
}

/// True if `fs` is local, plain or encrypted
pub fn is_local_or_crypto_fs(fs: &dyn Fs) -> bool {
    is_local_os_fs(fs) || is_crypt_os_fs(fs)
}

/// The documented equality-check modes are 0 and 1, anything else is
/// rejected
pub fn is_equality_check_mode_valid(mode: i32) -> bool {
    mode == 0 || mode == 1
}

/// Check if a path exists and is a directory
pub async fn is_directory(fs: &dyn Fs, path: &str) -> FsResult<bool> {
    let info = fs.stat(path).await?;
    Ok(info.is_dir)
}

/// Change ownership of a path, logging instead of returning errors.
/// Does nothing when both ids are -1 or for the local filesystem on
/// Windows.
pub async fn set_path_permissions(fs: &dyn Fs, path: &str, uid: i32, gid: i32) {
    if uid == -1 && gid == -1 {
        return;
    }
    if is_local_os_fs(fs) && cfg!(windows) {
        return;
    }
    if let Err(err) = fs.chown(path, uid, gid).await {
        fs_log(
            fs.name(),
            fs.connection_id(),
            Level::WARN,
            format_args!("error changing ownership of path {:?}: {}", path, err),
        );
    }
}

/// A mount path of "/" addresses the whole virtual filesystem and is
/// canonicalized to the empty string
pub fn get_mount_path(mount_path: &str) -> &str {
    if mount_path == "/" {
        return "";
    }
    mount_path
}

/// Make a slash path absolute, cleaning relative inputs
pub fn ensure_abs_path(name: &str) -> String {
    if name.starts_with('/') {
        return name.to_string();
    }
    format!("/{}", clean_path(name))
}

/// Lexically clean a slash-separated path: drops empty and `.` components
/// and resolves `..` against the preceding component
pub(crate) fn clean_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for comp in path.split('/') {
        match comp {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::testutil::StubFs;
    use super::*;

    #[test]
    fn test_ensure_abs_path() {
        assert_eq!(ensure_abs_path("a/b"), "/a/b");
        assert_eq!(ensure_abs_path("/a/b"), "/a/b");
        assert_eq!(ensure_abs_path("a/./b/../c"), "/a/c");
        assert_eq!(ensure_abs_path(""), "/");
    }

    #[test]
    fn test_ensure_abs_path_idempotent() {
        for p in ["a/b", "/x", "", "a/../..", "dir/file.txt"] {
            let once = ensure_abs_path(p);
            assert_eq!(ensure_abs_path(&once), once);
        }
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path("a//b/./c"), "a/b/c");
        assert_eq!(clean_path("a/b/../c"), "a/c");
        assert_eq!(clean_path("./"), "");
        assert_eq!(clean_path("a/.."), "");
    }

    #[test]
    fn test_get_mount_path() {
        assert_eq!(get_mount_path("/"), "");
        assert_eq!(get_mount_path("/data"), "/data");
    }

    #[test]
    fn test_equality_check_mode() {
        assert!(is_equality_check_mode_valid(0));
        assert!(is_equality_check_mode_valid(1));
        assert!(!is_equality_check_mode_valid(-1));
        assert!(!is_equality_check_mode_valid(2));
    }

    #[test]
    fn test_backend_kind_predicates() {
        let local = StubFs::new(OS_FS_NAME, "c1");
        let crypt = StubFs::new(CRYPT_FS_NAME, "c1");
        let sftp = StubFs::new("sftpfs_srv1", "c1").with_resume(true);
        let buffered_sftp = StubFs::new("sftpfs_srv2", "c1");
        let http = StubFs::new("httpfs_api", "c1");
        let s3 = StubFs::new("s3fs_bucket", "c1");
        let gcs = StubFs::new("gcsfs_bucket", "c1");
        let az = StubFs::new("azblobfs_container", "c1");

        assert!(is_local_os_fs(&local));
        assert!(!is_local_os_fs(&crypt));
        assert!(is_crypt_os_fs(&crypt));
        assert!(is_sftp_fs(&sftp));
        assert!(is_http_fs(&http));

        assert!(is_buffered_sftp_fs(&buffered_sftp));
        assert!(!is_buffered_sftp_fs(&sftp));

        assert!(is_local_or_unbuffered_sftp_fs(&local));
        assert!(is_local_or_unbuffered_sftp_fs(&sftp));
        assert!(!is_local_or_unbuffered_sftp_fs(&buffered_sftp));

        assert!(is_local_or_sftp_fs(&local));
        assert!(is_local_or_sftp_fs(&buffered_sftp));
        assert!(!is_local_or_sftp_fs(&s3));

        assert!(is_local_or_crypto_fs(&local));
        assert!(is_local_or_crypto_fs(&crypt));
        assert!(!is_local_or_crypto_fs(&http));

        for fs in [&s3, &gcs, &az] {
            assert!(has_implicit_atomic_uploads(fs));
        }
        for fs in [&local, &crypt, &sftp, &http] {
            assert!(!has_implicit_atomic_uploads(fs));
        }
    }

    #[test]
    fn test_truncate_and_rw_predicates() {
        let local = StubFs::new(OS_FS_NAME, "c1");
        let sftp = StubFs::new("sftpfs_srv", "c1").with_resume(true);
        let buffered_sftp = StubFs::new("sftpfs_srv", "c1");
        let http = StubFs::new("httpfs_api", "c1");
        let s3 = StubFs::new("s3fs_bucket", "c1");

        assert!(has_truncate_support(&local));
        assert!(has_truncate_support(&sftp));
        assert!(has_truncate_support(&http));
        assert!(!has_truncate_support(&s3));

        assert!(has_open_rw_support(&local));
        assert!(has_open_rw_support(&sftp));
        assert!(!has_open_rw_support(&buffered_sftp));
        assert!(!has_open_rw_support(&s3));
    }

    #[tokio::test]
    async fn test_set_path_permissions_skips_noop_ids() {
        let fs = StubFs::new(OS_FS_NAME, "c1");
        set_path_permissions(&fs, "/dir", -1, -1).await;
        assert!(fs.chown_calls.lock().unwrap().is_empty());

        set_path_permissions(&fs, "/dir", 1000, 1000).await;
        #[cfg(not(windows))]
        assert_eq!(
            fs.chown_calls.lock().unwrap().as_slice(),
            &[("/dir".to_string(), 1000, 1000)]
        );
    }

    #[tokio::test]
    async fn test_default_capabilities() {
        let fs = StubFs::new("s3fs_bucket", "c1");
        assert!(!fs.has_virtual_folders());
        assert!(fs.check_metadata().await.is_ok());
        assert!(matches!(
            fs.get_available_disk_size("/").await.unwrap_err(),
            VfsError::StorageSizeUnavailable
        ));
        let err = fs.symlink("/a", "/b").await.unwrap_err();
        assert!(fs.is_not_supported(&err));
    }
}
