//! Buffered stream over an OS file.
//!
//! [`RawStream`] keeps one buffer that serves either read-ahead or pending writes, a push-back
//! stack for ungotten bytes and a sticky end-of-stream indicator. Switching between reading
//! and writing repositions the file so the logical offset seen by callers never jumps.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Idle,
    Reading,
    Writing,
}

#[derive(Debug)]
pub(crate) struct RawStream {
    file: File,
    buf: Vec<u8>,
    /// Next unread byte in `buf` while reading.
    pos: usize,
    /// Valid read-ahead bytes, or pending write bytes, in `buf`.
    filled: usize,
    pushback: Vec<u8>,
    direction: Direction,
    append: bool,
    at_eof: bool,
}

impl RawStream {
    /// Wraps `file` with a buffer of `buffer_size` bytes.
    ///
    /// `append` must match how the file was opened: writes then always land at the end.
    pub(crate) fn new(file: File, buffer_size: usize, append: bool) -> io::Result<Self> {
        if buffer_size == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "buffer size must be positive",
            ));
        }
        let mut buf = Vec::new();
        buf.try_reserve_exact(buffer_size)
            .map_err(|e| io::Error::new(io::ErrorKind::OutOfMemory, e))?;
        buf.resize(buffer_size, 0);

        Ok(Self {
            file,
            buf,
            pos: 0,
            filled: 0,
            pushback: Vec::new(),
            direction: Direction::Idle,
            append,
            at_eof: false,
        })
    }

    pub(crate) fn is_eof(&self) -> bool {
        self.at_eof
    }

    pub(crate) fn getc(&mut self) -> io::Result<Option<u8>> {
        self.enter_read()?;
        if let Some(byte) = self.pushback.pop() {
            return Ok(Some(byte));
        }
        if self.pos == self.filled && self.fill()? == 0 {
            return Ok(None);
        }
        let byte = self.buf[self.pos];
        self.pos += 1;
        Ok(Some(byte))
    }

    /// Pushes `byte` back so the next read returns it first.
    pub(crate) fn ungetc(&mut self, byte: u8) -> io::Result<()> {
        self.enter_read()?;
        self.pushback.push(byte);
        self.at_eof = false;
        Ok(())
    }

    /// Reads until `out` is full or the file ends. Returns the number of bytes read.
    pub(crate) fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        self.enter_read()?;
        let mut done = 0;
        while done < out.len() {
            if let Some(byte) = self.pushback.pop() {
                out[done] = byte;
                done += 1;
                continue;
            }

            if self.pos < self.filled {
                let n = (self.filled - self.pos).min(out.len() - done);
                out[done..done + n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
                self.pos += n;
                done += n;
                continue;
            }

            // Large reads bypass the buffer.
            if out.len() - done >= self.buf.len() {
                match self.file.read(&mut out[done..]) {
                    Ok(0) => {
                        self.at_eof = true;
                        break;
                    }
                    Ok(n) => done += n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                    Err(e) => return Err(e),
                }
            } else if self.fill()? == 0 {
                break;
            }
        }
        Ok(done)
    }

    pub(crate) fn putc(&mut self, byte: u8) -> io::Result<()> {
        self.write_all(&[byte])
    }

    pub(crate) fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.enter_write()?;
        if self.filled + data.len() > self.buf.len() {
            self.flush_pending()?;
        }
        if data.len() >= self.buf.len() {
            self.file.write_all(data)?;
        } else {
            self.buf[self.filled..self.filled + data.len()].copy_from_slice(data);
            self.filled += data.len();
        }
        Ok(())
    }

    pub(crate) fn flush(&mut self) -> io::Result<()> {
        self.flush_pending()?;
        self.file.flush()
    }

    /// Repositions the stream, discarding read-ahead and push-back and clearing end-of-stream.
    pub(crate) fn seek(&mut self, target: SeekFrom) -> io::Result<u64> {
        let target = match target {
            SeekFrom::Current(offset) => {
                let here = self.tell()?;
                let dest = i128::from(here) + i128::from(offset);
                let dest = u64::try_from(dest).map_err(|_| {
                    io::Error::new(io::ErrorKind::InvalidInput, "seek before start of file")
                })?;
                SeekFrom::Start(dest)
            }
            other => other,
        };

        self.flush_pending()?;
        self.pos = 0;
        self.filled = 0;
        self.pushback.clear();
        self.direction = Direction::Idle;
        self.at_eof = false;
        self.file.seek(target)
    }

    /// Logical offset: the OS offset adjusted for buffered and pushed-back bytes.
    pub(crate) fn tell(&mut self) -> io::Result<u64> {
        let base = self.file.stream_position()?;
        Ok(match self.direction {
            Direction::Reading => base.saturating_sub(self.unread() as u64),
            Direction::Writing => base + self.filled as u64,
            Direction::Idle => base,
        })
    }

    /// Flushes pending writes and releases the file.
    pub(crate) fn close(mut self) -> io::Result<()> {
        self.flush()
    }

    fn unread(&self) -> usize {
        (self.filled - self.pos) + self.pushback.len()
    }

    fn fill(&mut self) -> io::Result<usize> {
        loop {
            match self.file.read(&mut self.buf) {
                Ok(n) => {
                    self.pos = 0;
                    self.filled = n;
                    if n == 0 {
                        self.at_eof = true;
                    }
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    fn flush_pending(&mut self) -> io::Result<()> {
        if self.direction == Direction::Writing && self.filled > 0 {
            let pending = self.filled;
            self.filled = 0;
            self.file.write_all(&self.buf[..pending])?;
        }
        Ok(())
    }

    fn enter_read(&mut self) -> io::Result<()> {
        match self.direction {
            Direction::Reading => {}
            Direction::Writing => {
                self.flush_pending()?;
                self.pos = 0;
                self.filled = 0;
                self.direction = Direction::Reading;
            }
            Direction::Idle => {
                self.pos = 0;
                self.filled = 0;
                self.direction = Direction::Reading;
            }
        }
        Ok(())
    }

    fn enter_write(&mut self) -> io::Result<()> {
        match self.direction {
            Direction::Writing => return Ok(()),
            Direction::Reading => {
                let logical = self.tell()?;
                self.pos = 0;
                self.filled = 0;
                self.pushback.clear();
                self.file.seek(SeekFrom::Start(logical))?;
            }
            Direction::Idle => {}
        }
        if self.append {
            self.file.seek(SeekFrom::End(0))?;
        }
        self.direction = Direction::Writing;
        Ok(())
    }
}
