/*!
 * Wharf - multi-protocol file transfer server, virtual filesystem core
 *
 * This crate is the storage abstraction the protocol frontends build on:
 * - One backend-neutral filesystem contract covering local disk, SFTP,
 *   HTTP, S3, Google Cloud Storage, Azure Blob and encrypted local storage
 * - Streaming upload and download primitives bridging protocol handlers
 *   and backends that only offer whole-object writes
 * - Per-backend configuration with validation and credential encryption
 * - A consistency sweep reconciling external file metadata against what
 *   each object backend actually contains
 * - Capability predicates upper layers use to decide whether resume,
 *   truncate or atomic uploads are available
 */

pub mod logging;
pub mod vfs;

// Re-export the types protocol handlers touch on every request
pub use vfs::{
    File, FileInfo, Fs, FsResult, OpenedRead, OpenedWrite, OsFs, PipeReader, PipeWriter,
    QuotaCheckResult, Secret, VfsError,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
