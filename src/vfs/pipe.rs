//! In-process pipe with random-access writes and an upload completion channel
//!
//! Object backends expose only whole-object PUT, so an upload is bridged
//! through a pipe: the protocol handler writes into the writer side while a
//! background task drains the reader side into the destination. The pipe is
//! backed by an unlinked temporary file, which makes positioned writes and
//! lag between the two sides cheap.
//!
//! Reads only observe the contiguous prefix of written data. Positioned
//! writes ahead of that watermark are parked until the gap fills; if the
//! writer closes with a gap outstanding, the data past the gap is dropped
//! and the reader sees the prefix.

use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tokio::sync::{oneshot, Notify};

use super::error::{FsResult, VfsError};

/// Create a pipe backed by a temporary file in the system temp directory
pub fn pipe() -> io::Result<(PipeReader, PipeWriterAt)> {
    new_pipe(tempfile::tempfile()?)
}

/// Create a pipe backed by a temporary file in the given directory
pub fn pipe_in_dir(dir: &Path) -> io::Result<(PipeReader, PipeWriterAt)> {
    new_pipe(tempfile::tempfile_in(dir)?)
}

/// Create a pipe in the configured temporary directory, falling back to
/// the system default when none is set
pub fn pipe_in_temp_dir() -> io::Result<(PipeReader, PipeWriterAt)> {
    let dir = super::settings::temp_path();
    if dir.is_empty() {
        pipe()
    } else {
        pipe_in_dir(Path::new(&dir))
    }
}

fn new_pipe(file: File) -> io::Result<(PipeReader, PipeWriterAt)> {
    let shared = Arc::new(Shared {
        file,
        state: Mutex::new(PipeState::default()),
        event: Notify::new(),
    });
    Ok((
        PipeReader {
            shared: Arc::clone(&shared),
        },
        PipeWriterAt { shared },
    ))
}

#[derive(Debug, Default)]
struct PipeState {
    /// Contiguous bytes written, readable range is [0, write_end)
    write_end: u64,
    /// Next offset for sequential writes
    seq_pos: u64,
    /// Out-of-order extents waiting for the gap below them to fill
    pending: BTreeMap<u64, u64>,
    read_pos: u64,
    write_closed: bool,
    read_closed: bool,
}

struct Shared {
    file: File,
    state: Mutex<PipeState>,
    event: Notify,
}

impl Shared {
    fn lock(&self) -> std::sync::MutexGuard<'_, PipeState> {
        self.state.lock().expect("pipe state lock poisoned")
    }

    fn merge_extent(state: &mut PipeState, start: u64, end: u64) {
        if end <= state.write_end {
            return;
        }
        if start <= state.write_end {
            state.write_end = end;
        } else {
            let entry = state.pending.entry(start).or_insert(end);
            if *entry < end {
                *entry = end;
            }
        }
        // drain parked extents the watermark now reaches
        loop {
            let reachable = state
                .pending
                .range(..=state.write_end)
                .next()
                .map(|(s, e)| (*s, *e));
            match reachable {
                Some((start, end)) => {
                    state.pending.remove(&start);
                    if end > state.write_end {
                        state.write_end = end;
                    }
                }
                None => break,
            }
        }
    }
}

/// Writer side of the pipe, supporting sequential and positioned writes
pub struct PipeWriterAt {
    shared: Arc<Shared>,
}

impl PipeWriterAt {
    /// Append data at the sequential write cursor
    pub async fn write(&self, data: &[u8]) -> io::Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }
        let offset = {
            let mut state = self.shared.lock();
            if state.read_closed {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe reader closed"));
            }
            let offset = state.seq_pos;
            state.seq_pos += data.len() as u64;
            offset
        };
        self.write_extent(data, offset)
    }

    /// Write data at an arbitrary offset
    pub async fn write_at(&self, data: &[u8], offset: u64) -> io::Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }
        {
            let state = self.shared.lock();
            if state.read_closed {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe reader closed"));
            }
        }
        self.write_extent(data, offset)
    }

    fn write_extent(&self, data: &[u8], offset: u64) -> io::Result<usize> {
        write_all_at(&self.shared.file, data, offset)?;
        {
            let mut state = self.shared.lock();
            Shared::merge_extent(&mut state, offset, offset + data.len() as u64);
        }
        self.shared.event.notify_waiters();
        Ok(data.len())
    }

    /// Close the writer side. The reader drains the contiguous prefix and
    /// then observes end of stream. Idempotent.
    pub fn close(&self) {
        {
            let mut state = self.shared.lock();
            if state.write_closed {
                return;
            }
            state.write_closed = true;
            state.pending.clear();
        }
        self.shared.event.notify_waiters();
    }
}

impl Drop for PipeWriterAt {
    fn drop(&mut self) {
        self.close();
    }
}

/// Reader side of the pipe
pub struct PipeReader {
    shared: Arc<Shared>,
}

impl PipeReader {
    /// Read from the current position, waiting for data or writer close
    pub async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            let notified = self.shared.event.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut state = self.shared.lock();
                if state.read_pos < state.write_end {
                    let n = (state.write_end - state.read_pos).min(buf.len() as u64) as usize;
                    let pos = state.read_pos;
                    state.read_pos += n as u64;
                    drop(state);
                    read_exact_at(&self.shared.file, &mut buf[..n], pos)?;
                    return Ok(n);
                }
                if state.write_closed {
                    return Ok(0);
                }
            }
            notified.await;
        }
    }

    /// Read at an arbitrary offset, waiting until the requested range is
    /// fully written or the writer closes. Does not move the read cursor.
    pub async fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let want_end = offset + buf.len() as u64;
        loop {
            let notified = self.shared.event.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let state = self.shared.lock();
                if state.write_end >= want_end || state.write_closed {
                    if offset >= state.write_end {
                        return Ok(0);
                    }
                    let n = (state.write_end - offset).min(buf.len() as u64) as usize;
                    drop(state);
                    read_exact_at(&self.shared.file, &mut buf[..n], offset)?;
                    return Ok(n);
                }
            }
            notified.await;
        }
    }

    /// Close the reader side; subsequent writes fail with a broken pipe
    pub fn close(&mut self) {
        {
            let mut state = self.shared.lock();
            if state.read_closed {
                return;
            }
            state.read_closed = true;
        }
        self.shared.event.notify_waiters();
    }
}

impl Drop for PipeReader {
    fn drop(&mut self) {
        self.close();
    }
}

/// Writer handed to protocol handlers for streaming uploads
///
/// Wraps the pipe writer together with a one-shot completion channel. The
/// background uploader signals its terminal result through the paired
/// [`UploadCompletion`] after draining the pipe; [`PipeWriter::close`]
/// closes the writer side, waits for that signal and returns the recorded
/// error, so the caller of close learns the true fate of the upload.
pub struct PipeWriter {
    writer: PipeWriterAt,
    done_rx: oneshot::Receiver<Option<VfsError>>,
}

/// Completion handle owned by the background uploader
pub struct UploadCompletion {
    tx: oneshot::Sender<Option<VfsError>>,
}

impl UploadCompletion {
    /// Record the terminal result of the destination write and unblock
    /// [`PipeWriter::close`]. Consumes the handle, so it fires exactly once.
    pub fn done(self, result: FsResult<()>) {
        let _ = self.tx.send(result.err());
    }
}

impl PipeWriter {
    /// Wrap a pipe writer, returning the completion handle for the uploader
    pub fn new(writer: PipeWriterAt) -> (Self, UploadCompletion) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                writer,
                done_rx: rx,
            },
            UploadCompletion { tx },
        )
    }

    /// Forward a sequential write to the pipe
    pub async fn write(&self, data: &[u8]) -> io::Result<usize> {
        self.writer.write(data).await
    }

    /// Forward a positioned write to the pipe. Only legal when the backend
    /// reports upload-resume support.
    pub async fn write_at(&self, data: &[u8], offset: u64) -> io::Result<usize> {
        self.writer.write_at(data, offset).await
    }

    /// Close the writer side, wait for the uploader's completion signal and
    /// return its terminal error
    pub async fn close(self) -> FsResult<()> {
        let PipeWriter { writer, done_rx } = self;
        writer.close();
        match done_rx.await {
            Ok(None) => Ok(()),
            Ok(Some(err)) => Err(err),
            Err(_) => Err(VfsError::Other(
                "upload ended without a completion signal".to_string(),
            )),
        }
    }
}

#[cfg(unix)]
pub(crate) fn write_all_at(file: &File, buf: &[u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.write_all_at(buf, offset)
}

#[cfg(unix)]
pub(crate) fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
pub(crate) fn write_all_at(file: &File, mut buf: &[u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        let n = file.seek_write(buf, offset)?;
        if n == 0 {
            return Err(io::Error::new(io::ErrorKind::WriteZero, "failed to write"));
        }
        buf = &buf[n..];
        offset += n as u64;
    }
    Ok(())
}

#[cfg(windows)]
pub(crate) fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        let n = file.seek_read(buf, offset)?;
        if n == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "failed to fill buffer"));
        }
        let rest = buf;
        buf = &mut rest[n..];
        offset += n as u64;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn read_to_end(reader: &mut PipeReader) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = [0u8; 8];
        loop {
            let n = reader.read(&mut buf).await.unwrap();
            if n == 0 {
                return out;
            }
            out.extend_from_slice(&buf[..n]);
        }
    }

    #[tokio::test]
    async fn test_sequential_roundtrip() {
        let (mut reader, writer) = pipe().unwrap();
        writer.write(b"hello ").await.unwrap();
        writer.write(b"world").await.unwrap();
        writer.close();
        assert_eq!(read_to_end(&mut reader).await, b"hello world");
    }

    #[tokio::test]
    async fn test_out_of_order_writes_merge() {
        let (mut reader, writer) = pipe().unwrap();

        let handle = tokio::spawn(async move { read_to_end(&mut reader).await });

        // the tail lands first and is parked until the gap fills
        writer.write_at(b"world", 5).await.unwrap();
        writer.write_at(b"hello", 0).await.unwrap();
        writer.close();

        assert_eq!(handle.await.unwrap(), b"helloworld");
    }

    #[tokio::test]
    async fn test_read_at_waits_for_range() {
        let (reader, writer) = pipe().unwrap();

        let handle = tokio::spawn(async move {
            let mut buf = [0u8; 4];
            let n = reader.read_at(&mut buf, 4).await.unwrap();
            (n, buf)
        });

        writer.write(b"01234567").await.unwrap();
        let (n, buf) = handle.await.unwrap();
        assert_eq!(n, 4);
        assert_eq!(&buf, b"4567");
    }

    #[tokio::test]
    async fn test_gap_dropped_on_close() {
        let (mut reader, writer) = pipe().unwrap();
        writer.write(b"head").await.unwrap();
        // never backfilled, must not become readable
        writer.write_at(b"tail", 100).await.unwrap();
        writer.close();
        assert_eq!(read_to_end(&mut reader).await, b"head");
    }

    #[tokio::test]
    async fn test_write_after_reader_close() {
        let (mut reader, writer) = pipe().unwrap();
        reader.close();
        let err = writer.write(b"late").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn test_close_delivers_uploader_error() {
        let (mut reader, raw_writer) = pipe().unwrap();
        let (writer, completion) = PipeWriter::new(raw_writer);

        let uploader = tokio::spawn(async move {
            let received = read_to_end(&mut reader).await;
            completion.done(Err(VfsError::Transport {
                backend: "s3fs".to_string(),
                message: "part upload timed out".to_string(),
            }));
            received
        });

        for chunk in 0..10u8 {
            writer.write(&[chunk; 16]).await.unwrap();
        }
        let err = writer.close().await.unwrap_err();
        assert!(err.to_string().contains("part upload timed out"));
        assert_eq!(uploader.await.unwrap().len(), 160);
    }

    #[tokio::test]
    async fn test_close_reports_success() {
        let (mut reader, raw_writer) = pipe().unwrap();
        let (writer, completion) = PipeWriter::new(raw_writer);

        let uploader = tokio::spawn(async move {
            let received = read_to_end(&mut reader).await;
            completion.done(Ok(()));
            received
        });

        writer.write(b"payload").await.unwrap();
        writer.close().await.unwrap();
        assert_eq!(uploader.await.unwrap(), b"payload");
    }

    #[tokio::test]
    async fn test_dropped_completion_surfaces() {
        let (_reader, raw_writer) = pipe().unwrap();
        let (writer, completion) = PipeWriter::new(raw_writer);
        drop(completion);
        let err = writer.close().await.unwrap_err();
        assert!(err.to_string().contains("without a completion signal"));
    }
}
