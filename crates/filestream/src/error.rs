//! Error taxonomy for file stream operations.
//!
//! Every failure is reported as a [`FileStreamError`] carrying one [`ErrorKind`]. Kinds form a
//! closed set with stable numeric codes `1..=26`; each code maps to a fixed description.

use crate::constants::FILE_STREAM_NAME;

/// Raised when a numeric error code falls outside the closed code space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid error code: {0}")]
pub struct InvalidErrorCode(pub i64);

/// The kinds of failure a [`crate::BufferedFileHandle`] can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorKind {
    CannotOpenFile = 1,
    CannotCreateFile,
    CannotSetBuffer,
    CannotAllocateMemory,
    ModeNotSupportWrite,
    ModeNotSupportRead,
    ModeNotSupportBytesWriting,
    ModeNotSupportBytesRead,
    CannotReadChar,
    CannotPutChar,
    CannotReadFile,
    CannotWriteFile,
    CannotReadBytesFile,
    CannotWriteBytesFile,
    CannotUnget,
    CannotUngetChar,
    EofError,
    SeekStartError,
    SeekCurError,
    SeekEndError,
    SetPosError,
    GetPosError,
    CannotFlushFile,
    CannotCloseFile,
    InvalidMode,
    IoError,
}

impl ErrorKind {
    /// All kinds, ordered by code.
    pub const ALL: [ErrorKind; 26] = [
        ErrorKind::CannotOpenFile,
        ErrorKind::CannotCreateFile,
        ErrorKind::CannotSetBuffer,
        ErrorKind::CannotAllocateMemory,
        ErrorKind::ModeNotSupportWrite,
        ErrorKind::ModeNotSupportRead,
        ErrorKind::ModeNotSupportBytesWriting,
        ErrorKind::ModeNotSupportBytesRead,
        ErrorKind::CannotReadChar,
        ErrorKind::CannotPutChar,
        ErrorKind::CannotReadFile,
        ErrorKind::CannotWriteFile,
        ErrorKind::CannotReadBytesFile,
        ErrorKind::CannotWriteBytesFile,
        ErrorKind::CannotUnget,
        ErrorKind::CannotUngetChar,
        ErrorKind::EofError,
        ErrorKind::SeekStartError,
        ErrorKind::SeekCurError,
        ErrorKind::SeekEndError,
        ErrorKind::SetPosError,
        ErrorKind::GetPosError,
        ErrorKind::CannotFlushFile,
        ErrorKind::CannotCloseFile,
        ErrorKind::InvalidMode,
        ErrorKind::IoError,
    ];

    /// Numeric code of this kind.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Looks up a kind by its numeric code.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidErrorCode`] if `code` is not in `1..=26`.
    pub fn from_code(code: i64) -> Result<Self, InvalidErrorCode> {
        if code < 1 || code > Self::ALL.len() as i64 {
            return Err(InvalidErrorCode(code));
        }
        Ok(Self::ALL[(code - 1) as usize])
    }

    /// Description for a numeric code, without constructing an error.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidErrorCode`] if `code` is not in `1..=26`.
    pub fn describe(code: i64) -> Result<&'static str, InvalidErrorCode> {
        Self::from_code(code).map(Self::description)
    }

    /// Fixed human-readable description of this kind.
    pub const fn description(self) -> &'static str {
        match self {
            ErrorKind::CannotOpenFile => "file does not exist",
            ErrorKind::CannotCreateFile => "cannot create file",
            ErrorKind::CannotSetBuffer => "cannot set buffer",
            ErrorKind::CannotAllocateMemory => "cannot allocate memory",
            ErrorKind::ModeNotSupportWrite => "file opening mode does not support writing",
            ErrorKind::ModeNotSupportRead => "file opening mode does not support reading",
            ErrorKind::ModeNotSupportBytesWriting => {
                "file opening mode does not support writing bytes"
            }
            ErrorKind::ModeNotSupportBytesRead => "file opening mode does not support reading bytes",
            ErrorKind::CannotReadChar => "cannot read char from file",
            ErrorKind::CannotPutChar => "cannot put char in file",
            ErrorKind::CannotReadFile => "cannot read data from file",
            ErrorKind::CannotWriteFile => "cannot write data in file",
            ErrorKind::CannotReadBytesFile => "cannot read bytes from file",
            ErrorKind::CannotWriteBytesFile => "cannot write bytes in file",
            ErrorKind::CannotUnget => "cannot unget char from buffer",
            ErrorKind::CannotUngetChar => "cannot unget current char",
            ErrorKind::EofError => "end of file",
            ErrorKind::SeekStartError => "cannot seek from file start to need position",
            ErrorKind::SeekCurError => {
                "cannot seek from file current cursor position to need position"
            }
            ErrorKind::SeekEndError => "cannot seek from file end to need position",
            ErrorKind::SetPosError => "cannot set file position to need position",
            ErrorKind::GetPosError => "cannot get file position",
            ErrorKind::CannotFlushFile => "cannot flush file",
            ErrorKind::CannotCloseFile => "cannot close file",
            ErrorKind::InvalidMode => "invalid file open mode",
            ErrorKind::IoError => "file_stream error",
        }
    }
}

impl TryFrom<u8> for ErrorKind {
    type Error = InvalidErrorCode;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_code(i64::from(code))
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// Error returned by every fallible file stream operation.
#[derive(Debug, thiserror::Error)]
#[error("[{name}] error code {code}: {kind}", name = FILE_STREAM_NAME, code = .kind.code())]
pub struct FileStreamError {
    kind: ErrorKind,
    #[source]
    source: Option<std::io::Error>,
}

impl FileStreamError {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    /// Creates an error of `kind` caused by an underlying I/O failure.
    pub fn with_source(kind: ErrorKind, source: std::io::Error) -> Self {
        Self {
            kind,
            source: Some(source),
        }
    }

    /// Creates an error from a raw numeric code.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidErrorCode`] if `code` is not in `1..=26`.
    pub fn from_code(code: i64) -> Result<Self, InvalidErrorCode> {
        ErrorKind::from_code(code).map(Self::new)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn code(&self) -> u8 {
        self.kind.code()
    }

    pub fn description(&self) -> &'static str {
        self.kind.description()
    }

    /// Name of the error domain.
    pub fn name(&self) -> &'static str {
        FILE_STREAM_NAME
    }

    /// Underlying I/O error, if the failure came from the operating system.
    pub fn io_error(&self) -> Option<&std::io::Error> {
        self.source.as_ref()
    }
}

impl Default for FileStreamError {
    fn default() -> Self {
        Self::new(ErrorKind::IoError)
    }
}

impl From<ErrorKind> for FileStreamError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<std::io::Error> for FileStreamError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::IoError, err)
    }
}

pub type FileStreamResult<T> = std::result::Result<T, FileStreamError>;
