//! Buffered File Streams
//!
//! This crate provides [`BufferedFileHandle`], a buffered file handle whose open mode decides
//! which operations are allowed.
//!
//! ## Design Principles
//!
//! - Open modes are a closed set of twelve `fopen`-style strings, validated before any OS call
//! - Text I/O (characters, lines) and byte I/O (chunks, records) are gated by mode separately
//! - Every failure carries a numbered [`ErrorKind`] with a fixed description
//! - A handle owns its file exclusively and closes it when dropped
//!
//! ## Open Modes
//!
//! ```text
//! mode   family  text read  text write  bytes read  bytes write
//! r      read    yes        -           -           -
//! r+     read    yes        yes         -           -
//! w      write   -          yes         -           -
//! w+     write   yes        yes         -           -
//! a      append  -          yes         -           -
//! a+     append  yes        yes         -           -
//! rb     read    -          -           yes         -
//! r+b    read    -          -           yes         yes
//! wb     write   -          -           -           yes
//! w+b    write   -          -           yes         yes
//! ab     append  -          -           -           yes
//! a+b    append  -          -           yes         yes
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use filestream::BufferedFileHandle;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut out = BufferedFileHandle::opened("notes.txt", "w", 16)?;
//! out.write_line("first")?;
//! out.write_line("second")?;
//! out.close()?;
//!
//! let mut input = BufferedFileHandle::opened("notes.txt", "r", 16)?;
//! assert_eq!(input.read_line()?, "first");
//! # Ok(())
//! # }
//! ```

mod capture;
mod config;
mod constants;
mod error;
mod handle;
mod mode;
mod record;
mod stream;

pub use config::StreamConfig;
pub use constants::{DEFAULT_CHUNK_SIZE, DEFAULT_MODE, FILE_STREAM_NAME};
pub use error::{ErrorKind, FileStreamError, FileStreamResult, InvalidErrorCode};
pub use handle::{BufferedFileHandle, Position};
pub use mode::{Capabilities, ModeFamily, OpenMode};
pub use record::Record;
