//! External modification-time metadata
//!
//! Object stores cannot represent arbitrary modification times, so an
//! external provider keeps them keyed by `(storage_id, absolute path)`.
//! Entries can outlive the objects they describe on eventually-consistent
//! stores; the consistency sweep pages through the provider's folders and
//! removes entries whose object no longer exists.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock, RwLock};

use async_trait::async_trait;
use thiserror::Error;
use tracing::Level;

use super::error::{FsResult, VfsError};
use super::types::{system_time_from_msec, FileInfo};
use super::{ensure_abs_path, MetadataChecker};
use crate::logging::fs_log;

/// Page size for the consistency sweep
const SWEEP_PAGE_LIMIT: usize = 100;

/// Errors from the external metadata provider
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The provider has no entry for the requested object
    #[error("no such object")]
    NoSuchObject,

    /// The provider failed
    #[error("{0}")]
    Provider(String),
}

/// Result type alias for metadata provider operations
pub type MetadataResult<T> = std::result::Result<T, MetadataError>;

/// External modification-time store
///
/// Implementations must return folders from `get_metadata_folders` in a
/// stable order: the sweep advances its pagination cursor with the last
/// folder name of each page.
#[async_trait]
pub trait Metadater: Send + Sync {
    /// Modification time for one object, msec since the Unix epoch
    async fn get_modification_time(
        &self,
        storage_id: &str,
        object_path: &str,
        is_dir: bool,
    ) -> MetadataResult<i64>;

    /// Modification times for every entry directly inside a folder,
    /// keyed by base name
    async fn get_modification_times(
        &self,
        storage_id: &str,
        folder: &str,
    ) -> MetadataResult<HashMap<String, i64>>;

    /// Folders with stored metadata, paginated: up to `limit` entries
    /// strictly after `from`
    async fn get_metadata_folders(
        &self,
        storage_id: &str,
        from: &str,
        limit: usize,
    ) -> MetadataResult<Vec<String>>;

    /// Remove the entry for one object
    async fn remove_metadata(&self, storage_id: &str, object_path: &str) -> MetadataResult<()>;
}

fn provider_store() -> &'static RwLock<Option<Arc<dyn Metadater>>> {
    static STORE: OnceLock<RwLock<Option<Arc<dyn Metadater>>>> = OnceLock::new();
    STORE.get_or_init(|| RwLock::new(None))
}

/// Register the process-wide metadata provider. Absence of a provider is
/// not an error: lookups degrade to no-ops and the sweep short-circuits.
pub fn register_metadater(provider: Arc<dyn Metadater>) {
    *provider_store().write().expect("metadater lock poisoned") = Some(provider);
}

/// Check whether a metadata provider is registered
pub fn has_metadater() -> bool {
    provider_store()
        .read()
        .expect("metadater lock poisoned")
        .is_some()
}

fn metadater() -> Option<Arc<dyn Metadater>> {
    provider_store()
        .read()
        .expect("metadater lock poisoned")
        .clone()
}

/// Overlay the provider's modification time onto a listing entry.
/// Directories and unknown objects are left untouched.
pub async fn update_file_info_mod_time(
    storage_id: &str,
    object_path: &str,
    info: &mut FileInfo,
) -> FsResult<()> {
    match metadater() {
        None => Ok(()),
        Some(provider) => {
            update_file_info_mod_time_with(provider.as_ref(), storage_id, object_path, info).await
        }
    }
}

/// Same as [`update_file_info_mod_time`] with an explicit provider
pub async fn update_file_info_mod_time_with(
    provider: &dyn Metadater,
    storage_id: &str,
    object_path: &str,
    info: &mut FileInfo,
) -> FsResult<()> {
    if info.is_dir {
        return Ok(());
    }
    match provider
        .get_modification_time(storage_id, &ensure_abs_path(object_path), info.is_dir)
        .await
    {
        Ok(msec) => {
            info.set_mod_time(system_time_from_msec(msec));
            Ok(())
        }
        Err(MetadataError::NoSuchObject) => Ok(()),
        Err(err) => Err(VfsError::MetadataPlugin {
            message: err.to_string(),
        }),
    }
}

/// Modification times for a folder, empty when no provider is registered
/// or the provider has no entries for it
pub async fn folder_mod_times(
    storage_id: &str,
    dir_name: &str,
) -> FsResult<HashMap<String, i64>> {
    match metadater() {
        None => Ok(HashMap::new()),
        Some(provider) => folder_mod_times_with(provider.as_ref(), storage_id, dir_name).await,
    }
}

/// Same as [`folder_mod_times`] with an explicit provider
pub async fn folder_mod_times_with(
    provider: &dyn Metadater,
    storage_id: &str,
    dir_name: &str,
) -> FsResult<HashMap<String, i64>> {
    match provider
        .get_modification_times(storage_id, &ensure_abs_path(dir_name))
        .await
    {
        Ok(times) => Ok(times),
        Err(MetadataError::NoSuchObject) => Ok(HashMap::new()),
        Err(err) => Err(VfsError::MetadataPlugin {
            message: err.to_string(),
        }),
    }
}

/// Reconcile the registered provider against the live object listing of a
/// backend, removing entries for objects that no longer exist.
/// A no-op when no provider is registered.
pub async fn check_metadata_consistency(
    fs: &dyn MetadataChecker,
    storage_id: &str,
    key_prefix: &str,
) -> FsResult<()> {
    match metadater() {
        None => Ok(()),
        Some(provider) => {
            check_metadata_consistency_with(provider.as_ref(), fs, storage_id, key_prefix).await
        }
    }
}

/// Same as [`check_metadata_consistency`] with an explicit provider.
///
/// Failure to remove a single entry is logged and the sweep continues;
/// failure to page folders, fetch times or list live objects aborts.
pub async fn check_metadata_consistency_with(
    provider: &dyn Metadater,
    fs: &dyn MetadataChecker,
    storage_id: &str,
    key_prefix: &str,
) -> FsResult<()> {
    let mut from = String::new();
    loop {
        let folders = provider
            .get_metadata_folders(storage_id, &from, SWEEP_PAGE_LIMIT)
            .await
            .map_err(|err| {
                fs_log(
                    fs.name(),
                    fs.connection_id(),
                    Level::ERROR,
                    format_args!("unable to get folders: {}", err),
                );
                VfsError::MetadataPlugin {
                    message: err.to_string(),
                }
            })?;

        for folder in &folders {
            from.clone_from(folder);
            let mut fs_prefix = folder.clone();
            if !fs_prefix.ends_with('/') {
                fs_prefix.push('/');
            }
            if !key_prefix.is_empty() && !fs_prefix.starts_with(&format!("/{}", key_prefix)) {
                fs_log(
                    fs.name(),
                    fs.connection_id(),
                    Level::DEBUG,
                    format_args!(
                        "skip metadata check for folder {:?} outside prefix {:?}",
                        folder, key_prefix
                    ),
                );
                continue;
            }
            fs_log(
                fs.name(),
                fs.connection_id(),
                Level::DEBUG,
                format_args!("check metadata for folder {:?}", folder),
            );
            let metadata_values = provider
                .get_modification_times(storage_id, folder)
                .await
                .map_err(|err| {
                    fs_log(
                        fs.name(),
                        fs.connection_id(),
                        Level::ERROR,
                        format_args!(
                            "unable to get modification times for folder {:?}: {}",
                            folder, err
                        ),
                    );
                    VfsError::MetadataPlugin {
                        message: err.to_string(),
                    }
                })?;
            if metadata_values.is_empty() {
                fs_log(
                    fs.name(),
                    fs.connection_id(),
                    Level::DEBUG,
                    format_args!("no metadata for folder {:?}", folder),
                );
                continue;
            }
            let file_names = fs.file_names_in_prefix(&fs_prefix).await.map_err(|err| {
                fs_log(
                    fs.name(),
                    fs.connection_id(),
                    Level::ERROR,
                    format_args!("unable to get content for prefix {:?}: {}", fs_prefix, err),
                );
                err
            })?;
            remove_dangling_entries(provider, fs, storage_id, folder, &metadata_values, &file_names)
                .await;
        }

        if folders.len() < SWEEP_PAGE_LIMIT {
            return Ok(());
        }
    }
}

async fn remove_dangling_entries(
    provider: &dyn Metadater,
    fs: &dyn MetadataChecker,
    storage_id: &str,
    folder: &str,
    metadata_values: &HashMap<String, i64>,
    file_names: &HashSet<String>,
) {
    for name in metadata_values.keys() {
        if file_names.contains(name) {
            continue;
        }
        let file_path = ensure_abs_path(&format!("{}/{}", folder.trim_end_matches('/'), name));
        match provider.remove_metadata(storage_id, &file_path).await {
            Err(err) => fs_log(
                fs.name(),
                fs.connection_id(),
                Level::ERROR,
                format_args!(
                    "unable to remove metadata for missing file {:?}: {}",
                    file_path, err
                ),
            ),
            Ok(()) => fs_log(
                fs.name(),
                fs.connection_id(),
                Level::DEBUG,
                format_args!("metadata removed for missing file {:?}", file_path),
            ),
        }
    }
}
