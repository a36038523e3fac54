//! Local filesystem backend
//!
//! The reference implementation of the [`Fs`] contract: paths resolve under
//! a per-user root directory, files are plain OS files accessed through
//! blocking calls on the Tokio blocking pool, and every optional capability
//! (truncate, resume, random access, real path, server-side copy) is
//! available.

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rand::Rng;
use tokio::fs;
use tracing::Level;
use walkdir::WalkDir;

use super::error::{FsResult, VfsError};
use super::types::{FileInfo, StatVfs, CHECK_PARENT_DIR, DIR_MIME_TYPE, OS_FS_NAME};
use super::{
    clean_path, get_mount_path, set_path_permissions, settings, File, FileCopier, Fs, OpenedRead,
    OpenedWrite, RealPather, WalkFn,
};
use crate::logging::fs_log;

/// Filesystem backend over a local root directory
#[derive(Debug, Clone)]
pub struct OsFs {
    connection_id: String,
    root_dir: PathBuf,
    mount_path: String,
}

impl OsFs {
    /// Create a backend rooted at `root_dir`, exposed at `mount_path`
    /// inside the user's virtual filesystem
    pub fn new(
        connection_id: impl Into<String>,
        root_dir: impl Into<PathBuf>,
        mount_path: &str,
    ) -> Self {
        Self {
            connection_id: connection_id.into(),
            root_dir: root_dir.into(),
            mount_path: get_mount_path(mount_path).to_string(),
        }
    }

    /// The root directory all virtual paths resolve under
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }
}

async fn blocking_io<T, F>(f: F) -> io::Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> io::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(io::Error::other)?
}

fn map_path_err(path: &str, err: io::Error) -> VfsError {
    match err.kind() {
        io::ErrorKind::NotFound => VfsError::NotExist {
            path: path.to_string(),
        },
        io::ErrorKind::PermissionDenied => VfsError::Permission {
            path: path.to_string(),
            message: err.to_string(),
        },
        _ => VfsError::Io(err),
    }
}

fn base_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "/".to_string())
}

fn file_info_from_metadata(name: String, meta: &std::fs::Metadata) -> FileInfo {
    #[cfg(unix)]
    let mode = {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode()
    };
    #[cfg(not(unix))]
    let mode = 0;

    FileInfo {
        name,
        size: meta.len() as i64,
        mode,
        mod_time: meta.modified().unwrap_or(UNIX_EPOCH),
        is_dir: meta.is_dir(),
        is_symlink: meta.file_type().is_symlink(),
    }
}

fn is_cross_device(err: &io::Error) -> bool {
    #[cfg(unix)]
    {
        err.raw_os_error() == Some(libc::EXDEV)
    }
    #[cfg(not(unix))]
    {
        let _ = err;
        false
    }
}

fn open_with_flags(path: &Path, flag: i32) -> io::Result<std::fs::File> {
    if flag == 0 {
        return std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path);
    }
    #[cfg(unix)]
    {
        let mut opts = std::fs::OpenOptions::new();
        let access = flag & libc::O_ACCMODE;
        opts.read(access == libc::O_RDONLY || access == libc::O_RDWR)
            .write(access == libc::O_WRONLY || access == libc::O_RDWR)
            .append(flag & libc::O_APPEND != 0)
            .truncate(flag & libc::O_TRUNC != 0)
            .create(flag & libc::O_CREAT != 0)
            .create_new(flag & libc::O_EXCL != 0);
        opts.open(path)
    }
    #[cfg(not(unix))]
    {
        std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
    }
}

fn walkdir_io_error(err: walkdir::Error) -> io::Error {
    err.into_io_error()
        .unwrap_or_else(|| io::Error::other("directory walk failed"))
}

fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(walkdir_io_error)?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(io::Error::other)?;
        let target = dst.join(rel);
        let file_type = entry.file_type();
        if file_type.is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if file_type.is_file() {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
        } else if file_type.is_symlink() {
            // recreated pointing at the original target
            #[cfg(unix)]
            {
                let link = std::fs::read_link(entry.path())?;
                std::os::unix::fs::symlink(&link, &target)?;
            }
        }
    }
    Ok(())
}

fn mime_type_by_extension(name: &str) -> &'static str {
    match Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
        .as_str()
    {
        "txt" | "log" => "text/plain",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl Fs for OsFs {
    fn name(&self) -> &str {
        OS_FS_NAME
    }

    fn connection_id(&self) -> &str {
        &self.connection_id
    }

    async fn stat(&self, name: &str) -> FsResult<FileInfo> {
        let meta = fs::metadata(name).await.map_err(|e| map_path_err(name, e))?;
        Ok(file_info_from_metadata(base_name(name), &meta))
    }

    async fn lstat(&self, name: &str) -> FsResult<FileInfo> {
        let meta = fs::symlink_metadata(name)
            .await
            .map_err(|e| map_path_err(name, e))?;
        Ok(file_info_from_metadata(base_name(name), &meta))
    }

    async fn open(&self, name: &str, offset: u64) -> FsResult<OpenedRead> {
        let path = PathBuf::from(name);
        let file = blocking_io(move || {
            let file = std::fs::File::open(&path)?;
            if offset > 0 {
                (&file).seek(SeekFrom::Start(offset))?;
            }
            Ok(file)
        })
        .await
        .map_err(|e| map_path_err(name, e))?;
        Ok(OpenedRead {
            file: Some(Box::new(OsFile::new(name.to_string(), file))),
            reader: None,
            cleanup: None,
        })
    }

    async fn create(&self, name: &str, flag: i32, checks: u32) -> FsResult<OpenedWrite> {
        let path = PathBuf::from(name);
        if checks & CHECK_PARENT_DIR != 0 {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| map_path_err(name, e))?;
            }
        }
        let file = blocking_io(move || open_with_flags(&path, flag))
            .await
            .map_err(|e| map_path_err(name, e))?;
        Ok(OpenedWrite {
            file: Some(Box::new(OsFile::new(name.to_string(), file))),
            writer: None,
            cleanup: None,
        })
    }

    async fn rename(&self, source: &str, target: &str) -> FsResult<(usize, u64)> {
        let info = self.stat(source).await?;
        let (files, bytes) = if info.is_dir {
            self.get_dir_size(source).await?
        } else {
            (1, info.size.max(0) as u64)
        };
        match fs::rename(source, target).await {
            Ok(()) => Ok((files, bytes)),
            Err(err) => {
                if is_cross_device(&err)
                    && settings::rename_mode() == settings::RENAME_MODE_COPY
                {
                    let src = PathBuf::from(source);
                    let dst = PathBuf::from(target);
                    let is_dir = info.is_dir;
                    blocking_io(move || {
                        if is_dir {
                            copy_tree(&src, &dst)?;
                            std::fs::remove_dir_all(&src)
                        } else {
                            std::fs::copy(&src, &dst)?;
                            std::fs::remove_file(&src)
                        }
                    })
                    .await
                    .map_err(|e| map_path_err(source, e))?;
                    return Ok((files, bytes));
                }
                Err(map_path_err(source, err))
            }
        }
    }

    async fn remove(&self, name: &str, is_dir: bool) -> FsResult<()> {
        let result = if is_dir {
            fs::remove_dir(name).await
        } else {
            fs::remove_file(name).await
        };
        result.map_err(|e| map_path_err(name, e))
    }

    async fn mkdir(&self, name: &str) -> FsResult<()> {
        fs::create_dir(name).await.map_err(|e| map_path_err(name, e))
    }

    async fn symlink(&self, source: &str, target: &str) -> FsResult<()> {
        #[cfg(unix)]
        {
            fs::symlink(source, target)
                .await
                .map_err(|e| map_path_err(source, e))
        }
        #[cfg(not(unix))]
        {
            let _ = (source, target);
            Err(VfsError::unsupported(self.name(), "symlink"))
        }
    }

    async fn readlink(&self, name: &str) -> FsResult<String> {
        let target = fs::read_link(name).await.map_err(|e| map_path_err(name, e))?;
        Ok(target.to_string_lossy().into_owned())
    }

    async fn chown(&self, name: &str, uid: i32, gid: i32) -> FsResult<()> {
        #[cfg(unix)]
        {
            let path = PathBuf::from(name);
            let uid = (uid >= 0).then_some(uid as u32);
            let gid = (gid >= 0).then_some(gid as u32);
            blocking_io(move || std::os::unix::fs::chown(&path, uid, gid))
                .await
                .map_err(|e| map_path_err(name, e))
        }
        #[cfg(not(unix))]
        {
            let _ = (name, uid, gid);
            Err(VfsError::unsupported(self.name(), "chown"))
        }
    }

    async fn chmod(&self, name: &str, mode: u32) -> FsResult<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(name, std::fs::Permissions::from_mode(mode))
                .await
                .map_err(|e| map_path_err(name, e))
        }
        #[cfg(not(unix))]
        {
            let _ = (name, mode);
            Err(VfsError::unsupported(self.name(), "chmod"))
        }
    }

    async fn chtimes(
        &self,
        name: &str,
        atime: SystemTime,
        mtime: SystemTime,
        is_uploading: bool,
    ) -> FsResult<()> {
        // local files carry their own times, no sidecar metadata involved
        let _ = is_uploading;
        let path = PathBuf::from(name);
        let ft_atime = filetime::FileTime::from_system_time(atime);
        let ft_mtime = filetime::FileTime::from_system_time(mtime);
        blocking_io(move || filetime::set_file_times(&path, ft_atime, ft_mtime))
            .await
            .map_err(|e| map_path_err(name, e))
    }

    async fn truncate(&self, name: &str, size: u64) -> FsResult<()> {
        let path = PathBuf::from(name);
        blocking_io(move || {
            let file = std::fs::OpenOptions::new().write(true).open(&path)?;
            file.set_len(size)
        })
        .await
        .map_err(|e| map_path_err(name, e))
    }

    async fn read_dir(&self, dirname: &str) -> FsResult<Vec<FileInfo>> {
        let mut entries = fs::read_dir(dirname)
            .await
            .map_err(|e| map_path_err(dirname, e))?;
        let mut result = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| map_path_err(dirname, e))?
        {
            let meta = entry
                .metadata()
                .await
                .map_err(|e| map_path_err(dirname, e))?;
            result.push(file_info_from_metadata(
                entry.file_name().to_string_lossy().into_owned(),
                &meta,
            ));
        }
        Ok(result)
    }

    async fn walk(&self, root: &str, walk_fn: &mut WalkFn<'_>) -> FsResult<()> {
        let mut stack = vec![root.to_string()];
        while let Some(current) = stack.pop() {
            let meta = match fs::symlink_metadata(&current).await {
                Ok(meta) => meta,
                Err(err) => {
                    walk_fn(&current, None, Some(&map_path_err(&current, err)))?;
                    continue;
                }
            };
            let info = file_info_from_metadata(base_name(&current), &meta);
            let is_dir = info.is_dir;
            walk_fn(&current, Some(&info), None)?;
            if !is_dir {
                continue;
            }
            let mut children = Vec::new();
            match fs::read_dir(&current).await {
                Ok(mut entries) => loop {
                    match entries.next_entry().await {
                        Ok(Some(entry)) => {
                            children.push(entry.path().to_string_lossy().into_owned())
                        }
                        Ok(None) => break,
                        Err(err) => {
                            walk_fn(&current, None, Some(&map_path_err(&current, err)))?;
                            break;
                        }
                    }
                },
                Err(err) => {
                    walk_fn(&current, None, Some(&map_path_err(&current, err)))?;
                    continue;
                }
            }
            // keep a stable lexical visit order
            children.sort();
            while let Some(child) = children.pop() {
                stack.push(child);
            }
        }
        Ok(())
    }

    fn is_upload_resume_supported(&self) -> bool {
        true
    }

    fn is_atomic_upload_supported(&self) -> bool {
        true
    }

    async fn check_root_path(&self, username: &str, uid: i32, gid: i32) -> bool {
        if fs::metadata(&self.root_dir).await.is_ok() {
            return true;
        }
        let root = self.root_dir.clone();
        let created = blocking_io(move || {
            #[cfg(unix)]
            {
                use std::os::unix::fs::DirBuilderExt;
                std::fs::DirBuilder::new()
                    .recursive(true)
                    .mode(0o700)
                    .create(&root)
            }
            #[cfg(not(unix))]
            {
                std::fs::create_dir_all(&root)
            }
        })
        .await;
        if let Err(err) = created {
            fs_log(
                self.name(),
                self.connection_id(),
                Level::WARN,
                format_args!("error creating root directory for user {:?}: {}", username, err),
            );
            return false;
        }
        let root = self.root_dir.to_string_lossy().into_owned();
        set_path_permissions(self, &root, uid, gid).await;
        true
    }

    fn resolve_path(&self, virtual_path: &str) -> FsResult<String> {
        // lexical cleaning resolves every ".." before joining, so the
        // result cannot escape the root
        let rel = clean_path(virtual_path);
        let fs_path = if rel.is_empty() {
            self.root_dir.clone()
        } else {
            self.root_dir.join(rel)
        };
        Ok(fs_path.to_string_lossy().into_owned())
    }

    async fn scan_root_dir_contents(&self) -> FsResult<(usize, u64)> {
        let root = self.root_dir.to_string_lossy().into_owned();
        self.get_dir_size(&root).await
    }

    async fn get_dir_size(&self, dirname: &str) -> FsResult<(usize, u64)> {
        let path = PathBuf::from(dirname);
        blocking_io(move || {
            let mut files = 0usize;
            let mut bytes = 0u64;
            for entry in WalkDir::new(&path) {
                let entry = entry.map_err(walkdir_io_error)?;
                if entry.file_type().is_file() {
                    files += 1;
                    bytes += entry.metadata().map_err(walkdir_io_error)?.len();
                }
            }
            Ok((files, bytes))
        })
        .await
        .map_err(|e| map_path_err(dirname, e))
    }

    fn get_atomic_upload_path(&self, name: &str) -> String {
        let path = Path::new(name);
        let temp_path = settings::temp_path();
        let dir = if temp_path.is_empty() {
            path.parent().map(Path::to_path_buf).unwrap_or_default()
        } else {
            PathBuf::from(temp_path)
        };
        let unique: u64 = rand::thread_rng().gen();
        dir.join(format!(
            ".wharf-upload.{:016x}.{}",
            unique,
            base_name(name)
        ))
        .to_string_lossy()
        .into_owned()
    }

    fn get_relative_path(&self, name: &str) -> String {
        let base = if self.mount_path.is_empty() {
            "/"
        } else {
            self.mount_path.as_str()
        };
        let rel = match Path::new(name).strip_prefix(&self.root_dir) {
            Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
            Err(_) => String::new(),
        };
        let joined = format!("{}/{}", base.trim_end_matches('/'), rel);
        format!("/{}", clean_path(&joined))
    }

    fn join(&self, elems: &[&str]) -> String {
        let joined = elems.join("/");
        if joined.starts_with('/') {
            format!("/{}", clean_path(&joined))
        } else {
            clean_path(&joined)
        }
    }

    async fn get_mime_type(&self, name: &str) -> FsResult<String> {
        let info = self.stat(name).await?;
        if info.is_dir {
            return Ok(DIR_MIME_TYPE.to_string());
        }
        Ok(mime_type_by_extension(name).to_string())
    }

    async fn get_available_disk_size(&self, dir_name: &str) -> FsResult<StatVfs> {
        let path = PathBuf::from(dir_name);
        let best = tokio::task::spawn_blocking(move || {
            let disks = sysinfo::Disks::new_with_refreshed_list();
            let mut best: Option<(u64, u64, usize)> = None;
            for disk in disks.list() {
                let mount = disk.mount_point();
                if path.starts_with(mount) {
                    let len = mount.as_os_str().len();
                    if best.map_or(true, |(_, _, best_len)| len >= best_len) {
                        best = Some((disk.total_space(), disk.available_space(), len));
                    }
                }
            }
            best
        })
        .await
        .map_err(|e| VfsError::Io(io::Error::other(e)))?;

        match best {
            Some((total, available, _)) => {
                const BLOCK_SIZE: u64 = 4096;
                Ok(StatVfs {
                    bsize: BLOCK_SIZE,
                    blocks: total / BLOCK_SIZE,
                    bfree: available / BLOCK_SIZE,
                    bavail: available / BLOCK_SIZE,
                    files: 0,
                    ffree: 0,
                    favail: 0,
                })
            }
            None => Err(VfsError::StorageSizeUnavailable),
        }
    }

    async fn close(&self) -> FsResult<()> {
        // the local backend holds no connection state
        Ok(())
    }
}

#[async_trait]
impl RealPather for OsFs {
    async fn real_path(&self, path: &str) -> FsResult<String> {
        let resolved = fs::canonicalize(path)
            .await
            .map_err(|e| map_path_err(path, e))?;
        Ok(resolved.to_string_lossy().into_owned())
    }
}

#[async_trait]
impl FileCopier for OsFs {
    async fn copy_file(&self, source: &str, target: &str, _src_size: i64) -> FsResult<()> {
        fs::copy(source, target)
            .await
            .map_err(|e| map_path_err(source, e))?;
        Ok(())
    }
}

/// An open local file
///
/// Blocking calls run on the Tokio blocking pool; the handle is shared with
/// them through an `Arc` so positioned operations need no cursor lock.
pub struct OsFile {
    name: String,
    file: Option<Arc<std::fs::File>>,
}

impl OsFile {
    fn new(name: String, file: std::fs::File) -> Self {
        Self {
            name,
            file: Some(Arc::new(file)),
        }
    }

    fn handle(&self) -> io::Result<Arc<std::fs::File>> {
        self.file
            .clone()
            .ok_or_else(|| io::Error::other("file already closed"))
    }
}

#[async_trait]
impl File for OsFile {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let file = self.handle()?;
        let len = buf.len();
        let (n, data) = blocking_io(move || {
            let mut tmp = vec![0u8; len];
            let n = (&*file).read(&mut tmp)?;
            Ok((n, tmp))
        })
        .await?;
        buf[..n].copy_from_slice(&data[..n]);
        Ok(n)
    }

    async fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let file = self.handle()?;
        let len = buf.len();
        let (n, data) = blocking_io(move || {
            let mut tmp = vec![0u8; len];
            #[cfg(unix)]
            let n = {
                use std::os::unix::fs::FileExt;
                file.read_at(&mut tmp, offset)?
            };
            #[cfg(windows)]
            let n = {
                use std::os::windows::fs::FileExt;
                file.seek_read(&mut tmp, offset)?
            };
            Ok((n, tmp))
        })
        .await?;
        buf[..n].copy_from_slice(&data[..n]);
        Ok(n)
    }

    async fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let file = self.handle()?;
        let data = buf.to_vec();
        blocking_io(move || (&*file).write(&data)).await
    }

    async fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<usize> {
        let file = self.handle()?;
        let data = buf.to_vec();
        blocking_io(move || {
            #[cfg(unix)]
            {
                use std::os::unix::fs::FileExt;
                file.write_at(&data, offset)
            }
            #[cfg(windows)]
            {
                use std::os::windows::fs::FileExt;
                file.seek_write(&data, offset)
            }
        })
        .await
    }

    async fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let file = self.handle()?;
        blocking_io(move || (&*file).seek(pos)).await
    }

    async fn stat(&self) -> FsResult<FileInfo> {
        let file = self.handle().map_err(VfsError::Io)?;
        let name = base_name(&self.name);
        let meta = blocking_io(move || file.metadata())
            .await
            .map_err(VfsError::Io)?;
        Ok(file_info_from_metadata(name, &meta))
    }

    async fn truncate(&self, size: u64) -> FsResult<()> {
        let file = self.handle().map_err(VfsError::Io)?;
        blocking_io(move || file.set_len(size))
            .await
            .map_err(VfsError::Io)
    }

    async fn close(&mut self) -> FsResult<()> {
        // dropping the last Arc closes the descriptor once in-flight
        // blocking operations finish
        self.file.take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_fs(root: &str) -> OsFs {
        OsFs::new("conn1", root, "/")
    }

    #[test]
    fn test_resolve_path_stays_under_root() {
        let fs = test_fs("/srv/data/user1");
        assert_eq!(
            fs.resolve_path("/docs/file.txt").unwrap(),
            "/srv/data/user1/docs/file.txt"
        );
        assert_eq!(fs.resolve_path("/").unwrap(), "/srv/data/user1");
        assert_eq!(
            fs.resolve_path("/../../etc/passwd").unwrap(),
            "/srv/data/user1/etc/passwd"
        );
        assert_eq!(
            fs.resolve_path("a/./b//c").unwrap(),
            "/srv/data/user1/a/b/c"
        );
    }

    #[test]
    fn test_get_relative_path() {
        let fs = test_fs("/srv/data/user1");
        assert_eq!(
            fs.get_relative_path("/srv/data/user1/docs/file.txt"),
            "/docs/file.txt"
        );
        assert_eq!(fs.get_relative_path("/srv/data/user1"), "/");
        assert_eq!(fs.get_relative_path("/elsewhere/file"), "/");

        let mounted = OsFs::new("conn1", "/srv/data/user1", "/backup");
        assert_eq!(
            mounted.get_relative_path("/srv/data/user1/x"),
            "/backup/x"
        );
    }

    #[test]
    fn test_join() {
        let fs = test_fs("/root");
        assert_eq!(fs.join(&["/a", "b", "c"]), "/a/b/c");
        assert_eq!(fs.join(&["a", "..", "b"]), "b");
        assert_eq!(fs.join(&["/a//", "./b"]), "/a/b");
    }

    #[test]
    fn test_atomic_upload_path_is_hidden_sibling() {
        let fs = test_fs("/root");
        let path = fs.get_atomic_upload_path("/root/dir/file.bin");
        assert!(path.starts_with("/root/dir/.wharf-upload."));
        assert!(path.ends_with(".file.bin"));
        // unique per call
        assert_ne!(path, fs.get_atomic_upload_path("/root/dir/file.bin"));
    }

    #[test]
    fn test_mime_type_by_extension() {
        assert_eq!(mime_type_by_extension("a.json"), "application/json");
        assert_eq!(mime_type_by_extension("photo.JPG"), "image/jpeg");
        assert_eq!(mime_type_by_extension("blob"), "application/octet-stream");
    }

    #[test]
    fn test_capability_flags() {
        let fs = test_fs("/root");
        assert_eq!(fs.name(), OS_FS_NAME);
        assert!(fs.is_upload_resume_supported());
        assert!(fs.is_atomic_upload_supported());
        assert!(!fs.has_virtual_folders());
    }
}
