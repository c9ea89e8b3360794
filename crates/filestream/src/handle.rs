//! Mode-validated buffered file handle.
//!
//! This module provides [`BufferedFileHandle`], the public entry point of the crate. A handle is
//! always in one of two states:
//!
//! - **Closed**: no OS file, zero chunk size, empty buffers.
//! - **Open**: an OS file, a positive chunk size, a chunk buffer of that size and a capture
//!   buffer pre-sized to the file length at open time.
//!
//! # Capability gating
//!
//! Every read and write checks the handle's [`OpenMode`] first. Text operations (characters
//! and lines) require a text mode; chunk and record operations require a binary mode. See
//! [`crate::Capabilities`] for the full table.
//!
//! # End of file
//!
//! Single-character reads return `None` when the stream ends and set the EOF flag; the *next*
//! character read then fails with `EofError`. Chunk reads that come up short at end of stream
//! set the flag instead of failing. Repositioning the stream clears the flag.
//!
//! # Ownership
//!
//! The handle owns its file and buffers exclusively. [`BufferedFileHandle::take`] moves them
//! into a new value and leaves the source closed. Dropping an open handle flushes and closes it.

use crate::capture::CaptureBuffer;
use crate::config::StreamConfig;
use crate::constants::DEFAULT_TERMINATOR;
use crate::error::{ErrorKind, FileStreamError, FileStreamResult};
use crate::mode::{Capabilities, ModeFamily, OpenMode};
use crate::record::{self, Record};
use crate::stream::RawStream;
use std::fs;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};

/// Opaque stream position returned by [`BufferedFileHandle::get_position`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position(u64);

/// Buffered file handle with mode-gated character, line, chunk and record I/O.
#[derive(Debug, Default)]
pub struct BufferedFileHandle {
    stream: Option<RawStream>,
    mode: Option<OpenMode>,
    path: Option<PathBuf>,
    chunk: usize,
    buffer: Vec<u8>,
    capture: CaptureBuffer,
    eof: bool,
}

impl BufferedFileHandle {
    /// Creates a closed handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a handle and opens `path` with `mode`.
    ///
    /// # Errors
    ///
    /// See [`BufferedFileHandle::open`].
    pub fn opened(path: impl AsRef<Path>, mode: &str, chunk_size: usize) -> FileStreamResult<Self> {
        let mut handle = Self::new();
        handle.open(path, mode, chunk_size)?;
        Ok(handle)
    }

    /// Creates a handle and opens `path` with the mode and chunk size from `config`.
    pub fn from_config(path: impl AsRef<Path>, config: &StreamConfig) -> FileStreamResult<Self> {
        let mut handle = Self::new();
        handle.open_mode(path, config.mode(), config.chunk_size())?;
        Ok(handle)
    }

    /// Opens `path` with a mode string.
    ///
    /// # Errors
    ///
    /// Returns `FileStreamError` with kind:
    /// - `InvalidMode` if `mode` is not one of the twelve accepted strings
    /// - `CannotSetBuffer` if `chunk_size` is zero
    /// - `CannotOpenFile` / `CannotCreateFile` if the OS refuses to open the file
    /// - `CannotAllocateMemory` if the buffers cannot be allocated
    pub fn open(
        &mut self,
        path: impl AsRef<Path>,
        mode: &str,
        chunk_size: usize,
    ) -> FileStreamResult<()> {
        let mode: OpenMode = mode.parse()?;
        self.open_mode(path, mode, chunk_size)
    }

    /// Opens `path` with an already validated mode.
    ///
    /// Any file the handle currently holds is closed first.
    ///
    /// The failure kind when the OS refuses the open depends on the mode family: read modes
    /// always report `CannotOpenFile`; write and append modes report `CannotOpenFile` when the
    /// path already exists and `CannotCreateFile` when it does not.
    pub fn open_mode(
        &mut self,
        path: impl AsRef<Path>,
        mode: OpenMode,
        chunk_size: usize,
    ) -> FileStreamResult<()> {
        let path = path.as_ref();
        if chunk_size == 0 {
            return Err(FileStreamError::new(ErrorKind::CannotSetBuffer));
        }
        self.close()?;

        let file = mode
            .open_options()
            .open(path)
            .map_err(|e| FileStreamError::with_source(open_failure_kind(path, mode), e))?;

        let stream = RawStream::new(file, chunk_size, mode.family() == ModeFamily::Append)
            .map_err(|e| FileStreamError::with_source(ErrorKind::CannotSetBuffer, e))?;

        let file_len = fs::metadata(path)?.len();
        let capture_len = usize::try_from(file_len)
            .map_err(|_| FileStreamError::new(ErrorKind::CannotAllocateMemory))?;

        let buffer = allocate(chunk_size)?;
        let capture = CaptureBuffer::with_capacity(capture_len)?;

        tracing::debug!(
            path = %path.display(),
            mode = mode.as_str(),
            chunk_size,
            file_len,
            "opened file stream"
        );

        self.stream = Some(stream);
        self.mode = Some(mode);
        self.path = Some(path.to_path_buf());
        self.chunk = chunk_size;
        self.buffer = buffer;
        self.capture = capture;
        self.eof = false;
        Ok(())
    }

    /// Flushes and releases the OS file. Does nothing on a closed handle.
    ///
    /// The handle is closed afterwards even if the final flush fails.
    ///
    /// # Errors
    ///
    /// Returns `CannotCloseFile` if pending data could not be written.
    pub fn close(&mut self) -> FileStreamResult<()> {
        let Some(stream) = self.stream.take() else {
            return Ok(());
        };
        let path = self.path.take();
        self.mode = None;
        self.chunk = 0;
        self.buffer = Vec::new();
        self.capture = CaptureBuffer::default();
        self.eof = false;

        stream
            .close()
            .map_err(|e| FileStreamError::with_source(ErrorKind::CannotCloseFile, e))?;

        if let Some(path) = path {
            tracing::debug!(path = %path.display(), "closed file stream");
        }
        Ok(())
    }

    /// Moves the open file and all state into a new handle, leaving `self` closed.
    #[must_use]
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    /// Resizes the chunk buffer used by chunk operations.
    ///
    /// The OS-level stream buffer keeps the size it was opened with.
    ///
    /// # Errors
    ///
    /// Returns `CannotSetBuffer` if `chunk_size` is zero or the handle is closed, or
    /// `CannotAllocateMemory`.
    pub fn set_chunk(&mut self, chunk_size: usize) -> FileStreamResult<()> {
        if chunk_size == 0 || self.stream.is_none() {
            return Err(FileStreamError::new(ErrorKind::CannotSetBuffer));
        }
        self.buffer = allocate(chunk_size)?;
        self.chunk = chunk_size;
        Ok(())
    }

    pub fn flush(&mut self) -> FileStreamResult<()> {
        let stream = self.stream_or(ErrorKind::CannotFlushFile)?;
        stream
            .flush()
            .map_err(|e| FileStreamError::with_source(ErrorKind::CannotFlushFile, e))
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    pub fn is_eof(&self) -> bool {
        self.eof
    }

    pub fn mode(&self) -> Option<OpenMode> {
        self.mode
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // ----- character and line I/O -----

    /// Reads one byte. Returns `None` at end of file and sets the EOF flag.
    ///
    /// Every result, including the end-of-file marker, is recorded in the capture buffer.
    ///
    /// # Errors
    ///
    /// - `ModeNotSupportRead` if the mode is not a text read mode
    /// - `CannotReadChar` if the handle is closed or the OS read fails
    /// - `EofError` if a previous read already reached end of file
    pub fn read_char(&mut self) -> FileStreamResult<Option<u8>> {
        self.require(Capabilities::TEXT_READ, ErrorKind::ModeNotSupportRead)?;
        let eof = self.eof;
        let stream = self.stream_or(ErrorKind::CannotReadChar)?;
        if eof {
            return Err(FileStreamError::new(ErrorKind::EofError));
        }
        let value = stream
            .getc()
            .map_err(|e| FileStreamError::with_source(ErrorKind::CannotReadChar, e))?;

        self.eof = value.is_none();
        self.capture.record(value);
        Ok(value)
    }

    /// Writes one byte.
    ///
    /// # Errors
    ///
    /// - `ModeNotSupportWrite` if the mode is not a text write mode
    /// - `CannotReadChar` if the handle is closed
    /// - `EofError` if the OS write fails
    pub fn write_char(&mut self, byte: u8) -> FileStreamResult<()> {
        self.require(Capabilities::TEXT_WRITE, ErrorKind::ModeNotSupportWrite)?;
        let stream = self.stream_or(ErrorKind::CannotReadChar)?;
        stream
            .putc(byte)
            .map_err(|e| FileStreamError::with_source(ErrorKind::EofError, e))
    }

    /// Steps back over the last value returned by [`Self::read_char`].
    ///
    /// # Errors
    ///
    /// - `CannotUnget` if there is no captured value left (nothing read, or handle closed)
    /// - `CannotUngetChar` if the last value was the end-of-file marker
    pub fn unget(&mut self) -> FileStreamResult<()> {
        let Some(last) = self.capture.last() else {
            return Err(FileStreamError::new(ErrorKind::CannotUnget));
        };
        let Some(byte) = last else {
            return Err(FileStreamError::new(ErrorKind::CannotUngetChar));
        };
        self.push_back(byte)?;
        self.capture.rewind();
        Ok(())
    }

    /// Pushes an arbitrary byte back onto the stream. The capture buffer is left untouched.
    pub fn unget_char(&mut self, byte: u8) -> FileStreamResult<()> {
        self.push_back(byte)
    }

    /// Reads up to the next newline or end of file. The newline is not included.
    ///
    /// # Errors
    ///
    /// Propagates any error from [`Self::read_char`]; returns `CannotReadFile` if the line is
    /// not valid UTF-8.
    pub fn read_line(&mut self) -> FileStreamResult<String> {
        let mut line = Vec::new();
        loop {
            match self.read_char()? {
                Some(b'\n') => break,
                Some(byte) => line.push(byte),
                None => {
                    self.eof = true;
                    break;
                }
            }
        }
        String::from_utf8(line).map_err(|_| FileStreamError::new(ErrorKind::CannotReadFile))
    }

    /// Reads the remaining content line by line until end of file.
    ///
    /// Line terminators consumed by [`Self::read_line`] are put back between lines, so the
    /// result equals the bytes left in the file.
    pub fn read_all(&mut self) -> FileStreamResult<String> {
        let mut content = String::new();
        while !self.eof {
            let line = self.read_line()?;
            content.push_str(&line);
            if !self.eof {
                content.push('\n');
            }
        }
        Ok(content)
    }

    /// Writes `text` up to its first newline, followed by `'\n'`.
    pub fn write_line(&mut self, text: &str) -> FileStreamResult<()> {
        self.write_line_with(text, Some(DEFAULT_TERMINATOR))
    }

    /// Writes `text` up to its first newline, followed by `terminator` if given.
    pub fn write_line_with(&mut self, text: &str, terminator: Option<u8>) -> FileStreamResult<()> {
        for byte in text.bytes().take_while(|&b| b != b'\n') {
            self.write_char(byte)?;
        }
        self.write_terminator(terminator)
    }

    /// Writes all of `text`, embedded newlines included, followed by `'\n'`.
    pub fn write_text(&mut self, text: &str) -> FileStreamResult<()> {
        self.write_text_with(text, Some(DEFAULT_TERMINATOR))
    }

    /// Writes all of `text`, followed by `terminator` if given.
    pub fn write_text_with(&mut self, text: &str, terminator: Option<u8>) -> FileStreamResult<()> {
        for byte in text.bytes() {
            self.write_char(byte)?;
        }
        self.write_terminator(terminator)
    }

    // ----- chunk I/O -----

    /// Reads one chunk of the handle's chunk size.
    pub fn read_chunk(&mut self) -> FileStreamResult<Vec<u8>> {
        self.read_chunk_of(self.chunk)
    }

    /// Reads `size` bytes.
    ///
    /// A short read at end of stream sets the EOF flag and returns the bytes that were read.
    ///
    /// # Errors
    ///
    /// - `ModeNotSupportBytesRead` if the mode is not a binary read mode
    /// - `CannotReadBytesFile` if the handle is closed or the OS read fails
    pub fn read_chunk_of(&mut self, size: usize) -> FileStreamResult<Vec<u8>> {
        self.require(Capabilities::BYTES_READ, ErrorKind::ModeNotSupportBytesRead)?;
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| FileStreamError::new(ErrorKind::CannotReadBytesFile))?;
        if self.buffer.len() < size {
            self.buffer = allocate(size)?;
        }

        let read = stream
            .read(&mut self.buffer[..size])
            .map_err(|e| FileStreamError::with_source(ErrorKind::CannotReadBytesFile, e))?;

        if read != size {
            if !stream.is_eof() {
                return Err(FileStreamError::new(ErrorKind::CannotReadBytesFile));
            }
            tracing::trace!(requested = size, read, "chunk read reached end of file");
            self.eof = true;
        }

        let mut chunk = Vec::new();
        chunk
            .try_reserve_exact(read)
            .map_err(|_| FileStreamError::new(ErrorKind::CannotAllocateMemory))?;
        chunk.extend_from_slice(&self.buffer[..read]);
        Ok(chunk)
    }

    /// Writes the first chunk-size bytes of `data`.
    pub fn write_chunk(&mut self, data: &[u8]) -> FileStreamResult<()> {
        self.write_chunk_of(data, self.chunk)
    }

    /// Writes exactly the first `size` bytes of `data`.
    ///
    /// # Errors
    ///
    /// - `ModeNotSupportBytesWriting` if the mode is not a binary write mode
    /// - `CannotWriteBytesFile` if `data` holds fewer than `size` bytes, the handle is closed,
    ///   or the OS write fails
    pub fn write_chunk_of(&mut self, data: &[u8], size: usize) -> FileStreamResult<()> {
        self.require(Capabilities::BYTES_WRITE, ErrorKind::ModeNotSupportBytesWriting)?;
        let bytes = data
            .get(..size)
            .ok_or_else(|| FileStreamError::new(ErrorKind::CannotWriteBytesFile))?;
        self.write_bytes(bytes)
    }

    // ----- fixed-layout records -----

    /// Writes one record.
    pub fn serialize<T: Record>(&mut self, value: &T) -> FileStreamResult<()> {
        self.serialize_slice(std::slice::from_ref(value))
    }

    /// Writes `values.len()` records back to back.
    ///
    /// # Errors
    ///
    /// - `ModeNotSupportBytesWriting` if the mode is not a binary write mode
    /// - `CannotWriteBytesFile` if the handle is closed or the OS write fails
    pub fn serialize_slice<T: Record>(&mut self, values: &[T]) -> FileStreamResult<()> {
        self.require(Capabilities::BYTES_WRITE, ErrorKind::ModeNotSupportBytesWriting)?;
        let size = values
            .len()
            .checked_mul(T::SIZE)
            .ok_or_else(|| FileStreamError::new(ErrorKind::CannotAllocateMemory))?;
        let mut encoded = Vec::new();
        encoded
            .try_reserve_exact(size)
            .map_err(|_| FileStreamError::new(ErrorKind::CannotAllocateMemory))?;
        record::encode_all(values, &mut encoded);
        self.write_bytes(&encoded)
    }

    /// Reads one record.
    pub fn deserialize_one<T: Record>(&mut self) -> FileStreamResult<T> {
        let mut values = self.deserialize_many::<T>(1)?;
        values
            .pop()
            .ok_or_else(|| FileStreamError::new(ErrorKind::CannotReadBytesFile))
    }

    /// Reads `count` records.
    ///
    /// # Errors
    ///
    /// - `ModeNotSupportBytesRead` if the mode is not a binary read mode
    /// - `CannotAllocateMemory` if the output cannot be allocated
    /// - `CannotReadBytesFile` if fewer than `count` whole records could be read
    pub fn deserialize_many<T: Record>(&mut self, count: usize) -> FileStreamResult<Vec<T>> {
        self.require(Capabilities::BYTES_READ, ErrorKind::ModeNotSupportBytesRead)?;
        let mut values = Vec::new();
        values
            .try_reserve_exact(count)
            .map_err(|_| FileStreamError::new(ErrorKind::CannotAllocateMemory))?;

        let raw = self.read_records::<T>(count)?;
        if T::SIZE == 0 {
            values.extend((0..count).map(|_| T::decode(&[])));
        } else {
            values.extend(raw.chunks_exact(T::SIZE).map(T::decode));
        }
        Ok(values)
    }

    /// Reads `target.len()` records into caller-provided storage.
    ///
    /// # Errors
    ///
    /// Same as [`Self::deserialize_many`]; `target` is left unchanged on failure.
    pub fn deserialize_into<T: Record>(&mut self, target: &mut [T]) -> FileStreamResult<()> {
        self.require(Capabilities::BYTES_READ, ErrorKind::ModeNotSupportBytesRead)?;
        let raw = self.read_records::<T>(target.len())?;
        if T::SIZE == 0 {
            return Ok(());
        }
        for (slot, bytes) in target.iter_mut().zip(raw.chunks_exact(T::SIZE)) {
            *slot = T::decode(bytes);
        }
        Ok(())
    }

    // ----- positioning -----

    /// Moves to `offset` bytes from the start of the file.
    pub fn seek(&mut self, offset: u64) -> FileStreamResult<()> {
        self.reposition(SeekFrom::Start(offset), ErrorKind::SeekStartError)
    }

    /// Moves `offset` bytes relative to the current position.
    pub fn seek_from_current(&mut self, offset: i64) -> FileStreamResult<()> {
        self.reposition(SeekFrom::Current(offset), ErrorKind::SeekCurError)
    }

    /// Moves `offset` bytes relative to the end of the file.
    pub fn seek_from_end(&mut self, offset: i64) -> FileStreamResult<()> {
        self.reposition(SeekFrom::End(offset), ErrorKind::SeekEndError)
    }

    /// Current byte offset.
    pub fn tell(&mut self) -> FileStreamResult<u64> {
        let stream = self.stream_or(ErrorKind::IoError)?;
        Ok(stream.tell()?)
    }

    pub fn get_position(&mut self) -> FileStreamResult<Position> {
        let stream = self.stream_or(ErrorKind::GetPosError)?;
        stream
            .tell()
            .map(Position)
            .map_err(|e| FileStreamError::with_source(ErrorKind::GetPosError, e))
    }

    pub fn set_position(&mut self, position: Position) -> FileStreamResult<()> {
        self.reposition(SeekFrom::Start(position.0), ErrorKind::SetPosError)
    }

    // ----- helpers -----

    /// Fails with `error` when the handle is open in a mode lacking `required`.
    fn require(&self, required: Capabilities, error: ErrorKind) -> FileStreamResult<()> {
        match self.mode {
            Some(mode) if !mode.supports(required) => Err(FileStreamError::new(error)),
            _ => Ok(()),
        }
    }

    fn stream_or(&mut self, error: ErrorKind) -> FileStreamResult<&mut RawStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| FileStreamError::new(error))
    }

    fn push_back(&mut self, byte: u8) -> FileStreamResult<()> {
        let stream = self.stream_or(ErrorKind::CannotUngetChar)?;
        stream
            .ungetc(byte)
            .map_err(|e| FileStreamError::with_source(ErrorKind::CannotUngetChar, e))?;
        self.eof = false;
        Ok(())
    }

    fn write_terminator(&mut self, terminator: Option<u8>) -> FileStreamResult<()> {
        match terminator {
            Some(0) | None => Ok(()),
            Some(byte) => self.write_char(byte),
        }
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> FileStreamResult<()> {
        let stream = self.stream_or(ErrorKind::CannotWriteBytesFile)?;
        stream
            .write_all(bytes)
            .map_err(|e| FileStreamError::with_source(ErrorKind::CannotWriteBytesFile, e))
    }

    fn read_records<T: Record>(&mut self, count: usize) -> FileStreamResult<Vec<u8>> {
        let size = count
            .checked_mul(T::SIZE)
            .ok_or_else(|| FileStreamError::new(ErrorKind::CannotAllocateMemory))?;
        let mut raw = allocate(size)?;

        let stream = self.stream_or(ErrorKind::CannotReadBytesFile)?;
        let read = stream
            .read(&mut raw)
            .map_err(|e| FileStreamError::with_source(ErrorKind::CannotReadBytesFile, e))?;
        if read != size {
            return Err(FileStreamError::new(ErrorKind::CannotReadBytesFile));
        }
        Ok(raw)
    }

    fn reposition(&mut self, target: SeekFrom, error: ErrorKind) -> FileStreamResult<()> {
        let stream = self.stream_or(error)?;
        let offset = stream
            .seek(target)
            .map_err(|e| FileStreamError::with_source(error, e))?;
        tracing::trace!(?target, offset, "repositioned file stream");
        self.eof = false;
        Ok(())
    }
}

impl Drop for BufferedFileHandle {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("failed to close file stream on drop: {}", e);
        }
    }
}

/// Chooses the error reported when the OS refuses to open `path` with `mode`.
fn open_failure_kind(path: &Path, mode: OpenMode) -> ErrorKind {
    match mode.family() {
        ModeFamily::Read => ErrorKind::CannotOpenFile,
        ModeFamily::Write | ModeFamily::Append if path.exists() => ErrorKind::CannotOpenFile,
        ModeFamily::Write | ModeFamily::Append => ErrorKind::CannotCreateFile,
    }
}

/// Allocates a zeroed buffer of `len` bytes.
fn allocate(len: usize) -> FileStreamResult<Vec<u8>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| FileStreamError::new(ErrorKind::CannotAllocateMemory))?;
    buffer.resize(len, 0);
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    struct Sample {
        id: u32,
        value: f64,
        flags: [u8; 4],
    }

    crate::impl_record!(Sample {
        id: u32,
        value: f64,
        flags: [u8; 4],
    });

    /// Helper to create a file with the given content inside a temp dir
    fn create_file(temp: &TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = temp.path().join(name);
        fs::write(&path, content).expect("Failed to create test file");
        path
    }

    fn kind<T: std::fmt::Debug>(result: FileStreamResult<T>) -> ErrorKind {
        result.expect_err("operation should fail").kind()
    }

    // Open and close

    #[test]
    fn test_new_handle_is_closed() {
        let handle = BufferedFileHandle::new();
        assert!(!handle.is_open());
        assert!(!handle.is_eof());
        assert_eq!(handle.mode(), None);
        assert_eq!(handle.chunk_size(), 0);
        assert!(handle.path().is_none());
    }

    #[test]
    fn test_open_all_modes_on_existing_file() {
        let temp = TempDir::new().unwrap();
        for mode in OpenMode::ALL {
            let path = create_file(&temp, "existing.txt", b"content");
            let handle = BufferedFileHandle::opened(&path, mode.as_str(), 8);
            assert!(handle.is_ok(), "mode {mode} failed to open existing file");

            let handle = handle.unwrap();
            assert!(handle.is_open());
            assert_eq!(handle.mode(), Some(mode));
            assert_eq!(handle.chunk_size(), 8);
            assert_eq!(handle.path(), Some(path.as_path()));
        }
    }

    #[test]
    fn test_open_creating_modes_on_missing_file() {
        let temp = TempDir::new().unwrap();
        for mode in OpenMode::ALL {
            let path = temp.path().join(format!("new-{}.dat", mode.as_str().replace('+', "p")));
            let result = BufferedFileHandle::opened(&path, mode.as_str(), 8);

            if mode.family() == ModeFamily::Read {
                assert_eq!(kind(result), ErrorKind::CannotOpenFile, "mode {mode}");
                assert!(!path.exists());
            } else {
                assert!(result.is_ok(), "mode {mode} should create the file");
                assert!(path.exists());
            }
        }
    }

    #[test]
    fn test_open_rejects_invalid_modes() {
        let temp = TempDir::new().unwrap();
        let path = create_file(&temp, "file.txt", b"keep me");

        for mode in ["", "rw", "rb+", "w+t", "x", "READ"] {
            let mut handle = BufferedFileHandle::new();
            assert_eq!(kind(handle.open(&path, mode, 8)), ErrorKind::InvalidMode);
            assert!(!handle.is_open());
        }

        // The file was never touched by an OS open
        assert_eq!(fs::read(&path).unwrap(), b"keep me");
    }

    #[test]
    fn test_open_write_in_missing_directory_cannot_create() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing").join("file.txt");

        assert_eq!(
            kind(BufferedFileHandle::opened(&path, "w", 8)),
            ErrorKind::CannotCreateFile
        );
        assert_eq!(
            kind(BufferedFileHandle::opened(&path, "a+b", 8)),
            ErrorKind::CannotCreateFile
        );
        assert_eq!(
            kind(BufferedFileHandle::opened(&path, "r+", 8)),
            ErrorKind::CannotOpenFile
        );
    }

    #[test]
    fn test_open_write_on_existing_directory_cannot_open() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("a-directory");
        fs::create_dir_all(&dir).unwrap();

        assert_eq!(
            kind(BufferedFileHandle::opened(&dir, "w", 8)),
            ErrorKind::CannotOpenFile
        );
        assert_eq!(
            kind(BufferedFileHandle::opened(&dir, "ab", 8)),
            ErrorKind::CannotOpenFile
        );
    }

    #[test]
    fn test_open_zero_chunk_rejected() {
        let temp = TempDir::new().unwrap();
        let path = create_file(&temp, "file.txt", b"data");

        assert_eq!(
            kind(BufferedFileHandle::opened(&path, "r", 0)),
            ErrorKind::CannotSetBuffer
        );
    }

    #[test]
    fn test_from_config() {
        let temp = TempDir::new().unwrap();
        let path = create_file(&temp, "config.bin", b"\x01\x02\x03\x04");

        let config = StreamConfig::parse("rb", 2).unwrap();
        let mut handle = BufferedFileHandle::from_config(&path, &config).unwrap();
        assert_eq!(handle.chunk_size(), 2);
        assert_eq!(handle.read_chunk().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_close_resets_state_and_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let path = create_file(&temp, "close.txt", b"x");

        let mut handle = BufferedFileHandle::opened(&path, "r", 4).unwrap();
        handle.read_char().unwrap();
        handle.close().unwrap();

        assert!(!handle.is_open());
        assert_eq!(handle.chunk_size(), 0);
        assert_eq!(handle.mode(), None);
        handle.close().unwrap();
    }

    #[test]
    fn test_close_flushes_pending_writes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("flush.txt");

        let mut handle = BufferedFileHandle::opened(&path, "w", 64).unwrap();
        handle.write_text_with("buffered", None).unwrap();
        handle.close().unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"buffered");
    }

    #[test]
    fn test_drop_flushes_pending_writes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("drop.txt");

        {
            let mut handle = BufferedFileHandle::opened(&path, "w", 64).unwrap();
            handle.write_line("dropped").unwrap();
        }

        assert_eq!(fs::read(&path).unwrap(), b"dropped\n");
    }

    #[test]
    fn test_reopen_closes_previous_file() {
        let temp = TempDir::new().unwrap();
        let first = temp.path().join("first.txt");
        let second = create_file(&temp, "second.txt", b"2");

        let mut handle = BufferedFileHandle::opened(&first, "w", 64).unwrap();
        handle.write_text_with("one", None).unwrap();
        handle.open(&second, "r", 4).unwrap();

        assert_eq!(fs::read(&first).unwrap(), b"one");
        assert_eq!(handle.read_char().unwrap(), Some(b'2'));
    }

    #[test]
    fn test_take_leaves_source_closed() {
        let temp = TempDir::new().unwrap();
        let path = create_file(&temp, "move.txt", b"mv");

        let mut source = BufferedFileHandle::opened(&path, "r", 4).unwrap();
        assert_eq!(source.read_char().unwrap(), Some(b'm'));

        let mut target = source.take();
        assert!(!source.is_open());
        assert_eq!(source.chunk_size(), 0);
        assert_eq!(kind(source.read_char()), ErrorKind::CannotReadChar);

        assert!(target.is_open());
        assert_eq!(target.read_char().unwrap(), Some(b'v'));
        target.unget().unwrap();
        assert_eq!(target.read_char().unwrap(), Some(b'v'));
    }

    #[test]
    fn test_set_chunk_changes_default_chunk_reads() {
        let temp = TempDir::new().unwrap();
        let path = create_file(&temp, "chunks.bin", b"abcdefgh");

        let mut handle = BufferedFileHandle::opened(&path, "rb", 2).unwrap();
        assert_eq!(handle.read_chunk().unwrap(), b"ab");

        handle.set_chunk(5).unwrap();
        assert_eq!(handle.chunk_size(), 5);
        assert_eq!(handle.read_chunk().unwrap(), b"cdefg");

        assert_eq!(kind(handle.set_chunk(0)), ErrorKind::CannotSetBuffer);
        assert_eq!(
            kind(BufferedFileHandle::new().set_chunk(4)),
            ErrorKind::CannotSetBuffer
        );
    }

    // Capability gating

    #[test]
    fn test_text_operations_gated_by_mode() {
        let temp = TempDir::new().unwrap();
        for mode in OpenMode::ALL {
            let path = create_file(&temp, "gate.txt", b"xyz");

            let mut handle = BufferedFileHandle::opened(&path, mode.as_str(), 8).unwrap();
            let read = handle.read_char();
            if mode.supports(Capabilities::TEXT_READ) {
                assert!(read.is_ok(), "read_char failed for {mode}");
            } else {
                assert_eq!(kind(read), ErrorKind::ModeNotSupportRead, "mode {mode}");
            }

            let mut handle = BufferedFileHandle::opened(&path, mode.as_str(), 8).unwrap();
            let write = handle.write_char(b'!');
            if mode.supports(Capabilities::TEXT_WRITE) {
                assert!(write.is_ok(), "write_char failed for {mode}");
            } else {
                assert_eq!(kind(write), ErrorKind::ModeNotSupportWrite, "mode {mode}");
            }
        }
    }

    #[test]
    fn test_byte_operations_gated_by_mode() {
        let temp = TempDir::new().unwrap();
        for mode in OpenMode::ALL {
            let readable = mode.supports(Capabilities::BYTES_READ);
            let writable = mode.supports(Capabilities::BYTES_WRITE);

            let path = create_file(&temp, "gate.bin", b"12345678");
            let mut handle = BufferedFileHandle::opened(&path, mode.as_str(), 4).unwrap();

            let chunk = handle.read_chunk_of(2).map(|_| ());
            let one = handle.deserialize_one::<u8>().map(|_| ());
            let many = handle.deserialize_many::<u8>(1).map(|_| ());
            let mut target = [0u8; 1];
            let into = handle.deserialize_into(&mut target);
            for result in [chunk, one, many, into] {
                let rejected = matches!(
                    result.as_ref().map_err(FileStreamError::kind),
                    Err(ErrorKind::ModeNotSupportBytesRead)
                );
                assert_eq!(rejected, !readable, "byte read gate wrong for {mode}");
            }

            let chunk = handle.write_chunk_of(b"ab", 2);
            let one = handle.serialize(&7u16);
            let slice = handle.serialize_slice(&[1u8, 2]);
            for result in [chunk, one, slice] {
                if writable {
                    assert!(result.is_ok(), "byte write failed for {mode}");
                } else {
                    assert_eq!(kind(result), ErrorKind::ModeNotSupportBytesWriting);
                }
            }
        }
    }

    #[test]
    fn test_closed_handle_errors() {
        let mut handle = BufferedFileHandle::new();

        assert_eq!(kind(handle.read_char()), ErrorKind::CannotReadChar);
        assert_eq!(kind(handle.write_char(b'a')), ErrorKind::CannotReadChar);
        assert_eq!(kind(handle.read_chunk_of(1)), ErrorKind::CannotReadBytesFile);
        assert_eq!(kind(handle.deserialize_one::<u32>()), ErrorKind::CannotReadBytesFile);
        assert_eq!(kind(handle.write_chunk_of(b"a", 1)), ErrorKind::CannotWriteBytesFile);
        assert_eq!(kind(handle.serialize(&1u32)), ErrorKind::CannotWriteBytesFile);
        assert_eq!(kind(handle.unget()), ErrorKind::CannotUnget);
        assert_eq!(kind(handle.unget_char(b'a')), ErrorKind::CannotUngetChar);
        assert_eq!(kind(handle.flush()), ErrorKind::CannotFlushFile);
        assert_eq!(kind(handle.seek(0)), ErrorKind::SeekStartError);
        assert_eq!(kind(handle.seek_from_current(0)), ErrorKind::SeekCurError);
        assert_eq!(kind(handle.seek_from_end(0)), ErrorKind::SeekEndError);
        assert_eq!(kind(handle.tell()), ErrorKind::IoError);
        assert_eq!(kind(handle.get_position()), ErrorKind::GetPosError);
        assert!(!handle.is_open());
    }

    // Character and line I/O

    #[test]
    fn test_read_char_empty_file() {
        let temp = TempDir::new().unwrap();
        let path = create_file(&temp, "empty.txt", b"");

        let mut handle = BufferedFileHandle::opened(&path, "r", 4).unwrap();
        assert_eq!(handle.read_char().unwrap(), None);
        assert!(handle.is_eof());
        assert_eq!(kind(handle.read_char()), ErrorKind::EofError);
    }

    #[test]
    fn test_read_char_sequence() {
        let temp = TempDir::new().unwrap();
        let path = create_file(&temp, "seq.txt", b"hi");

        let mut handle = BufferedFileHandle::opened(&path, "r", 1).unwrap();
        assert_eq!(handle.read_char().unwrap(), Some(b'h'));
        assert_eq!(handle.read_char().unwrap(), Some(b'i'));
        assert!(!handle.is_eof());
        assert_eq!(handle.read_char().unwrap(), None);
        assert!(handle.is_eof());
    }

    #[test]
    fn test_unget_restores_last_char() {
        let temp = TempDir::new().unwrap();
        let path = create_file(&temp, "unget.txt", b"ab");

        let mut handle = BufferedFileHandle::opened(&path, "r", 4).unwrap();
        assert_eq!(kind(handle.unget()), ErrorKind::CannotUnget);

        assert_eq!(handle.read_char().unwrap(), Some(b'a'));
        handle.unget().unwrap();
        assert_eq!(handle.read_char().unwrap(), Some(b'a'));
        assert_eq!(handle.read_char().unwrap(), Some(b'b'));

        // Two steps back replays both bytes in order
        handle.unget().unwrap();
        handle.unget().unwrap();
        assert_eq!(handle.read_char().unwrap(), Some(b'a'));
        assert_eq!(handle.read_char().unwrap(), Some(b'b'));

        handle.unget().unwrap();
        handle.unget().unwrap();
        assert_eq!(kind(handle.unget()), ErrorKind::CannotUnget);
    }

    #[test]
    fn test_unget_after_eof_marker_fails() {
        let temp = TempDir::new().unwrap();
        let path = create_file(&temp, "eof.txt", b"z");

        let mut handle = BufferedFileHandle::opened(&path, "r", 4).unwrap();
        assert_eq!(handle.read_char().unwrap(), Some(b'z'));
        assert_eq!(handle.read_char().unwrap(), None);
        assert_eq!(kind(handle.unget()), ErrorKind::CannotUngetChar);
    }

    #[test]
    fn test_unget_char_pushes_arbitrary_byte() {
        let temp = TempDir::new().unwrap();
        let path = create_file(&temp, "push.txt", b"");

        let mut handle = BufferedFileHandle::opened(&path, "r", 4).unwrap();
        assert_eq!(handle.read_char().unwrap(), None);
        assert!(handle.is_eof());

        handle.unget_char(b'#').unwrap();
        assert!(!handle.is_eof());
        assert_eq!(handle.read_char().unwrap(), Some(b'#'));
        assert_eq!(handle.read_char().unwrap(), None);
    }

    #[test]
    fn test_read_line_splits_on_newline() {
        let temp = TempDir::new().unwrap();
        let path = create_file(&temp, "lines.txt", b"ab\ncd");

        let mut handle = BufferedFileHandle::opened(&path, "r", 4).unwrap();
        assert_eq!(handle.read_line().unwrap(), "ab");
        assert!(!handle.is_eof());
        assert_eq!(handle.read_line().unwrap(), "cd");
        assert!(handle.is_eof());
        assert_eq!(kind(handle.read_line()), ErrorKind::EofError);
    }

    #[test]
    fn test_read_line_rejects_invalid_utf8() {
        let temp = TempDir::new().unwrap();
        let path = create_file(&temp, "bad.txt", &[0xff, 0xfe, b'\n']);

        let mut handle = BufferedFileHandle::opened(&path, "r", 4).unwrap();
        assert_eq!(kind(handle.read_line()), ErrorKind::CannotReadFile);
    }

    #[test]
    fn test_read_all_keeps_line_breaks() {
        let temp = TempDir::new().unwrap();
        let content = "first\nsecond\n\nfourth";
        let path = create_file(&temp, "all.txt", content.as_bytes());

        let mut handle = BufferedFileHandle::opened(&path, "r", 4).unwrap();
        assert_eq!(handle.read_all().unwrap(), content);
        assert!(handle.is_eof());
        assert_eq!(handle.read_all().unwrap(), "");
    }

    #[test]
    fn test_read_all_after_partial_read() {
        let temp = TempDir::new().unwrap();
        let path = create_file(&temp, "rest.txt", b"skip\nkeep\n");

        let mut handle = BufferedFileHandle::opened(&path, "r", 4).unwrap();
        assert_eq!(handle.read_line().unwrap(), "skip");
        assert_eq!(handle.read_all().unwrap(), "keep\n");
    }

    #[test]
    fn test_write_line_stops_at_embedded_newline() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("line.txt");

        let mut handle = BufferedFileHandle::opened(&path, "w", 8).unwrap();
        handle.write_line("one\ntwo").unwrap();
        handle.write_line_with("three", Some(b';')).unwrap();
        handle.write_line_with("four", None).unwrap();
        handle.write_line_with("five", Some(0)).unwrap();
        handle.close().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "one\nthree;fourfive");
    }

    #[test]
    fn test_write_text_keeps_embedded_newlines() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("text.txt");

        let mut handle = BufferedFileHandle::opened(&path, "w", 8).unwrap();
        handle.write_text("one\ntwo").unwrap();
        handle.write_text_with("three", None).unwrap();
        handle.close().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\nthree");
    }

    #[test]
    fn test_append_mode_adds_to_end() {
        let temp = TempDir::new().unwrap();
        let path = create_file(&temp, "log.txt", b"first\n");

        let mut handle = BufferedFileHandle::opened(&path, "a", 8).unwrap();
        handle.write_line("second").unwrap();
        handle.close().unwrap();

        let mut handle = BufferedFileHandle::opened(&path, "a+", 8).unwrap();
        assert_eq!(handle.read_line().unwrap(), "first");
        handle.write_line("third").unwrap();
        handle.close().unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "first\nsecond\nthird\n"
        );
    }

    #[test]
    fn test_write_mode_truncates() {
        let temp = TempDir::new().unwrap();
        let path = create_file(&temp, "trunc.txt", b"old content");

        let mut handle = BufferedFileHandle::opened(&path, "w+", 8).unwrap();
        assert_eq!(handle.read_char().unwrap(), None);
        handle.close().unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"");
    }

    // Chunk I/O

    #[test]
    fn test_chunk_roundtrip_preserves_zero_bytes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("zeros.bin");
        let data = vec![0x00, 0x41, 0x00, 0x00, 0xFF, 0x00, 0x42];

        let mut handle = BufferedFileHandle::opened(&path, "wb", 4).unwrap();
        handle.write_chunk_of(&data, data.len()).unwrap();
        handle.close().unwrap();

        let mut handle = BufferedFileHandle::opened(&path, "rb", 4).unwrap();
        assert_eq!(handle.read_chunk_of(data.len()).unwrap(), data);
        assert!(!handle.is_eof());

        assert_eq!(handle.read_chunk_of(1).unwrap(), Vec::<u8>::new());
        assert!(handle.is_eof());
    }

    #[test]
    fn test_short_chunk_read_sets_eof() {
        let temp = TempDir::new().unwrap();
        let path = create_file(&temp, "short.bin", b"abc");

        let mut handle = BufferedFileHandle::opened(&path, "rb", 2).unwrap();
        assert_eq!(handle.read_chunk().unwrap(), b"ab");
        assert!(!handle.is_eof());
        assert_eq!(handle.read_chunk().unwrap(), b"c");
        assert!(handle.is_eof());
    }

    #[test]
    fn test_write_chunk_uses_chunk_size() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("prefix.bin");

        let mut handle = BufferedFileHandle::opened(&path, "wb", 3).unwrap();
        handle.write_chunk(b"abcdef").unwrap();
        assert_eq!(kind(handle.write_chunk(b"xy")), ErrorKind::CannotWriteBytesFile);
        handle.close().unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"abc");
    }

    // Records

    #[test]
    fn test_serialize_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("records.bin");
        let samples = [
            Sample {
                id: 1,
                value: 0.5,
                flags: [0, 1, 0, 1],
            },
            Sample {
                id: 2,
                value: -12.25,
                flags: [0xFF; 4],
            },
            Sample {
                id: 0,
                value: f64::MAX,
                flags: [0; 4],
            },
        ];

        let mut handle = BufferedFileHandle::opened(&path, "wb", 8).unwrap();
        handle.serialize_slice(&samples).unwrap();
        handle.serialize(&Sample::default()).unwrap();
        handle.close().unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), 4 * Sample::SIZE as u64);

        let mut handle = BufferedFileHandle::opened(&path, "rb", 8).unwrap();
        assert_eq!(handle.deserialize_many::<Sample>(3).unwrap(), samples);
        assert_eq!(handle.deserialize_one::<Sample>().unwrap(), Sample::default());
        assert_eq!(
            kind(handle.deserialize_one::<Sample>()),
            ErrorKind::CannotReadBytesFile
        );
    }

    #[test]
    fn test_deserialize_into_fills_target() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ints.bin");

        let mut handle = BufferedFileHandle::opened(&path, "w+b", 4).unwrap();
        handle.serialize_slice(&[10i32, -20, 30]).unwrap();
        handle.seek(0).unwrap();

        let mut target = [0i32; 3];
        handle.deserialize_into(&mut target).unwrap();
        assert_eq!(target, [10, -20, 30]);

        let mut more = [7i32; 1];
        assert_eq!(
            kind(handle.deserialize_into(&mut more)),
            ErrorKind::CannotReadBytesFile
        );
        assert_eq!(more, [7]);
    }

    #[test]
    fn test_deserialize_short_read_fails() {
        let temp = TempDir::new().unwrap();
        let path = create_file(&temp, "partial.bin", &[1, 2, 3, 4, 5, 6]);

        let mut handle = BufferedFileHandle::opened(&path, "rb", 4).unwrap();
        assert_eq!(
            kind(handle.deserialize_many::<u32>(2)),
            ErrorKind::CannotReadBytesFile
        );
    }

    // Positioning

    #[test]
    fn test_seek_tell_and_reread() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("seek.txt");

        let mut handle = BufferedFileHandle::opened(&path, "w+", 4).unwrap();
        handle.write_text_with("hello", None).unwrap();
        assert_eq!(handle.tell().unwrap(), 5);

        handle.seek(0).unwrap();
        assert_eq!(handle.tell().unwrap(), 0);

        let mut read = Vec::new();
        for _ in 0..5 {
            read.push(handle.read_char().unwrap().unwrap());
        }
        assert_eq!(read, b"hello");
    }

    #[test]
    fn test_relative_seeks() {
        let temp = TempDir::new().unwrap();
        let path = create_file(&temp, "digits.bin", b"0123456789");

        let mut handle = BufferedFileHandle::opened(&path, "rb", 4).unwrap();
        handle.seek_from_end(-3).unwrap();
        assert_eq!(handle.tell().unwrap(), 7);
        assert_eq!(handle.read_chunk_of(3).unwrap(), b"789");

        handle.seek(2).unwrap();
        handle.seek_from_current(3).unwrap();
        assert_eq!(handle.read_chunk_of(1).unwrap(), b"5");

        assert_eq!(kind(handle.seek_from_current(-100)), ErrorKind::SeekCurError);
        assert_eq!(kind(handle.seek_from_end(-100)), ErrorKind::SeekEndError);
    }

    #[test]
    fn test_seek_clears_eof() {
        let temp = TempDir::new().unwrap();
        let path = create_file(&temp, "again.txt", b"a\nb");

        let mut handle = BufferedFileHandle::opened(&path, "r", 4).unwrap();
        assert_eq!(handle.read_all().unwrap(), "a\nb");
        assert!(handle.is_eof());

        handle.seek(0).unwrap();
        assert!(!handle.is_eof());
        assert_eq!(handle.read_all().unwrap(), "a\nb");
    }

    #[test]
    fn test_position_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = create_file(&temp, "pos.txt", b"abcdef");

        let mut handle = BufferedFileHandle::opened(&path, "r", 2).unwrap();
        handle.read_char().unwrap();
        handle.read_char().unwrap();
        let position = handle.get_position().unwrap();

        assert_eq!(handle.read_line().unwrap(), "cdef");
        handle.set_position(position).unwrap();
        assert_eq!(handle.read_char().unwrap(), Some(b'c'));
    }

    #[test]
    fn test_flush_makes_writes_visible() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("visible.bin");

        let mut handle = BufferedFileHandle::opened(&path, "wb", 64).unwrap();
        handle.serialize(&0xABCDu16).unwrap();
        assert_eq!(fs::read(&path).unwrap().len(), 0);

        handle.flush().unwrap();
        assert_eq!(fs::read(&path).unwrap(), 0xABCDu16.to_ne_bytes());
    }
}
