//! Stream configuration.
//!
//! A [`StreamConfig`] is resolved once (built in code or loaded from a serialised settings file)
//! and then handed to [`crate::BufferedFileHandle::from_config`].

use crate::constants::DEFAULT_CHUNK_SIZE;
use crate::error::{ErrorKind, FileStreamError, FileStreamResult};
use crate::mode::OpenMode;

/// Open mode and chunk size for a handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StreamConfig {
    mode: OpenMode,
    chunk_size: usize,
}

impl StreamConfig {
    /// Create a new `StreamConfig`.
    ///
    /// # Errors
    ///
    /// Returns `CannotSetBuffer` if `chunk_size` is zero.
    pub fn new(mode: OpenMode, chunk_size: usize) -> FileStreamResult<Self> {
        if chunk_size == 0 {
            return Err(FileStreamError::new(ErrorKind::CannotSetBuffer));
        }
        Ok(Self { mode, chunk_size })
    }

    /// Like [`StreamConfig::new`], taking the mode as its string form.
    pub fn parse(mode: &str, chunk_size: usize) -> FileStreamResult<Self> {
        Self::new(mode.parse()?, chunk_size)
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            mode: OpenMode::Write,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}
