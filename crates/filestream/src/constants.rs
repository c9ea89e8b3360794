//! Constants used throughout the filestream crate.

/// Name reported by [`crate::FileStreamError::name`] and used as the prefix of error messages.
pub const FILE_STREAM_NAME: &str = "file_stream";

/// Chunk size used when none is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 16;

/// Mode string used when none is configured.
pub const DEFAULT_MODE: &str = "w";

/// Byte written after a line when no explicit terminator is given.
pub const DEFAULT_TERMINATOR: u8 = b'\n';
