//! Filesystem stubs shared by unit tests

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use super::error::{FsResult, VfsError};
use super::types::FileInfo;
use super::{Fs, MetadataChecker, OpenedRead, OpenedWrite, WalkFn};

/// A backend stub with a configurable name, used to exercise capability
/// predicates and the metadata sweep without real storage
pub(crate) struct StubFs {
    name: String,
    connection_id: String,
    resume_supported: bool,
    prefix_files: HashMap<String, HashSet<String>>,
    failing_prefix: Option<String>,
    pub(crate) chown_calls: Mutex<Vec<(String, i32, i32)>>,
}

impl StubFs {
    pub(crate) fn new(name: &str, connection_id: &str) -> Self {
        Self {
            name: name.to_string(),
            connection_id: connection_id.to_string(),
            resume_supported: false,
            prefix_files: HashMap::new(),
            failing_prefix: None,
            chown_calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_resume(mut self, supported: bool) -> Self {
        self.resume_supported = supported;
        self
    }

    pub(crate) fn with_prefix_files(mut self, prefix: &str, names: &[&str]) -> Self {
        self.prefix_files.insert(
            prefix.to_string(),
            names.iter().map(|n| n.to_string()).collect(),
        );
        self
    }

    pub(crate) fn with_failing_prefix(mut self, prefix: &str) -> Self {
        self.failing_prefix = Some(prefix.to_string());
        self
    }

    fn unsupported(&self, operation: &str) -> VfsError {
        VfsError::unsupported(&self.name, operation)
    }
}

#[async_trait]
impl Fs for StubFs {
    fn name(&self) -> &str {
        &self.name
    }

    fn connection_id(&self) -> &str {
        &self.connection_id
    }

    async fn stat(&self, _name: &str) -> FsResult<FileInfo> {
        Err(self.unsupported("stat"))
    }

    async fn lstat(&self, _name: &str) -> FsResult<FileInfo> {
        Err(self.unsupported("lstat"))
    }

    async fn open(&self, _name: &str, _offset: u64) -> FsResult<OpenedRead> {
        Err(self.unsupported("open"))
    }

    async fn create(&self, _name: &str, _flag: i32, _checks: u32) -> FsResult<OpenedWrite> {
        Err(self.unsupported("create"))
    }

    async fn rename(&self, _source: &str, _target: &str) -> FsResult<(usize, u64)> {
        Err(self.unsupported("rename"))
    }

    async fn remove(&self, _name: &str, _is_dir: bool) -> FsResult<()> {
        Err(self.unsupported("remove"))
    }

    async fn mkdir(&self, _name: &str) -> FsResult<()> {
        Err(self.unsupported("mkdir"))
    }

    async fn chown(&self, name: &str, uid: i32, gid: i32) -> FsResult<()> {
        self.chown_calls
            .lock()
            .unwrap()
            .push((name.to_string(), uid, gid));
        Ok(())
    }

    async fn read_dir(&self, _dirname: &str) -> FsResult<Vec<FileInfo>> {
        Err(self.unsupported("read_dir"))
    }

    async fn walk(&self, _root: &str, _walk_fn: &mut WalkFn<'_>) -> FsResult<()> {
        Ok(())
    }

    fn is_upload_resume_supported(&self) -> bool {
        self.resume_supported
    }

    fn is_atomic_upload_supported(&self) -> bool {
        false
    }

    async fn check_root_path(&self, _username: &str, _uid: i32, _gid: i32) -> bool {
        true
    }

    fn resolve_path(&self, virtual_path: &str) -> FsResult<String> {
        Ok(virtual_path.to_string())
    }

    async fn scan_root_dir_contents(&self) -> FsResult<(usize, u64)> {
        Ok((0, 0))
    }

    async fn get_dir_size(&self, _dirname: &str) -> FsResult<(usize, u64)> {
        Ok((0, 0))
    }

    fn get_atomic_upload_path(&self, name: &str) -> String {
        format!("{}.tmp", name)
    }

    fn get_relative_path(&self, name: &str) -> String {
        name.to_string()
    }

    fn join(&self, elems: &[&str]) -> String {
        elems.join("/")
    }

    async fn close(&self) -> FsResult<()> {
        Ok(())
    }
}

#[async_trait]
impl MetadataChecker for StubFs {
    async fn file_names_in_prefix(&self, fs_prefix: &str) -> FsResult<HashSet<String>> {
        if self.failing_prefix.as_deref() == Some(fs_prefix) {
            return Err(VfsError::Transport {
                backend: self.name.clone(),
                message: format!("listing failed for prefix {:?}", fs_prefix),
            });
        }
        Ok(self.prefix_files.get(fs_prefix).cloned().unwrap_or_default())
    }
}
