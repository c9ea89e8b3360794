//! Shadow buffer recording every value returned by single-character reads.
//!
//! The buffer is what makes [`crate::BufferedFileHandle::unget`] possible: stepping back pops
//! the most recent entry and hands it to the stream's push-back.

use crate::error::{ErrorKind, FileStreamError, FileStreamResult};

#[derive(Debug, Default)]
pub(crate) struct CaptureBuffer {
    /// `None` entries record an end-of-file result.
    entries: Vec<Option<u8>>,
}

impl CaptureBuffer {
    /// Allocates room for `capacity` entries up front.
    pub(crate) fn with_capacity(capacity: usize) -> FileStreamResult<Self> {
        let mut entries = Vec::new();
        entries
            .try_reserve_exact(capacity)
            .map_err(|_| FileStreamError::new(ErrorKind::CannotAllocateMemory))?;
        Ok(Self { entries })
    }

    pub(crate) fn record(&mut self, value: Option<u8>) {
        self.entries.push(value);
    }

    /// Most recently recorded value, if any.
    pub(crate) fn last(&self) -> Option<Option<u8>> {
        self.entries.last().copied()
    }

    /// Moves the cursor back by one entry.
    pub(crate) fn rewind(&mut self) {
        self.entries.pop();
    }
}
