//! Open modes and the capabilities each one grants.
//!
//! Exactly twelve `fopen`-style mode strings are accepted: `{r, w, a}` combined with plain,
//! update (`+`) and binary (`b`) variants. Text operations (characters and lines) and byte
//! operations (chunks and records) are gated separately, so a binary mode cannot be used for
//! line I/O and vice versa.

use crate::error::{ErrorKind, FileStreamError};
use std::fs::OpenOptions;
use std::str::FromStr;

bitflags::bitflags! {
    /// Operations permitted by an [`OpenMode`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        /// Character and line writes.
        const TEXT_WRITE = 1 << 0;
        /// Character and line reads.
        const TEXT_READ = 1 << 1;
        /// Chunk writes and record serialisation.
        const BYTES_WRITE = 1 << 2;
        /// Chunk reads and record deserialisation.
        const BYTES_READ = 1 << 3;
    }
}

/// Base behaviour of a mode with respect to existing files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeFamily {
    /// The file must already exist.
    Read,
    /// The file is created if missing and truncated otherwise.
    Write,
    /// The file is created if missing; writes go to the end.
    Append,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpenMode {
    /// `"w"`
    Write,
    /// `"r"`
    Read,
    /// `"a"`
    Append,
    /// `"w+"`
    WriteUpdate,
    /// `"r+"`
    ReadUpdate,
    /// `"a+"`
    AppendUpdate,
    /// `"wb"`
    BinaryWrite,
    /// `"rb"`
    BinaryRead,
    /// `"ab"`
    BinaryAppend,
    /// `"w+b"`
    BinaryWriteUpdate,
    /// `"r+b"`
    BinaryReadUpdate,
    /// `"a+b"`
    BinaryAppendUpdate,
}

impl OpenMode {
    pub const ALL: [OpenMode; 12] = [
        OpenMode::Write,
        OpenMode::Read,
        OpenMode::Append,
        OpenMode::WriteUpdate,
        OpenMode::ReadUpdate,
        OpenMode::AppendUpdate,
        OpenMode::BinaryWrite,
        OpenMode::BinaryRead,
        OpenMode::BinaryAppend,
        OpenMode::BinaryWriteUpdate,
        OpenMode::BinaryReadUpdate,
        OpenMode::BinaryAppendUpdate,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            OpenMode::Write => "w",
            OpenMode::Read => "r",
            OpenMode::Append => "a",
            OpenMode::WriteUpdate => "w+",
            OpenMode::ReadUpdate => "r+",
            OpenMode::AppendUpdate => "a+",
            OpenMode::BinaryWrite => "wb",
            OpenMode::BinaryRead => "rb",
            OpenMode::BinaryAppend => "ab",
            OpenMode::BinaryWriteUpdate => "w+b",
            OpenMode::BinaryReadUpdate => "r+b",
            OpenMode::BinaryAppendUpdate => "a+b",
        }
    }

    pub const fn family(self) -> ModeFamily {
        match self {
            OpenMode::Read
            | OpenMode::ReadUpdate
            | OpenMode::BinaryRead
            | OpenMode::BinaryReadUpdate => ModeFamily::Read,
            OpenMode::Write
            | OpenMode::WriteUpdate
            | OpenMode::BinaryWrite
            | OpenMode::BinaryWriteUpdate => ModeFamily::Write,
            OpenMode::Append
            | OpenMode::AppendUpdate
            | OpenMode::BinaryAppend
            | OpenMode::BinaryAppendUpdate => ModeFamily::Append,
        }
    }

    /// Whether the mode opens for both reading and writing (`+`).
    pub const fn is_update(self) -> bool {
        matches!(
            self,
            OpenMode::WriteUpdate
                | OpenMode::ReadUpdate
                | OpenMode::AppendUpdate
                | OpenMode::BinaryWriteUpdate
                | OpenMode::BinaryReadUpdate
                | OpenMode::BinaryAppendUpdate
        )
    }

    pub const fn is_binary(self) -> bool {
        matches!(
            self,
            OpenMode::BinaryWrite
                | OpenMode::BinaryRead
                | OpenMode::BinaryAppend
                | OpenMode::BinaryWriteUpdate
                | OpenMode::BinaryReadUpdate
                | OpenMode::BinaryAppendUpdate
        )
    }

    /// Capability set of this mode.
    pub const fn capabilities(self) -> Capabilities {
        match self {
            OpenMode::Write | OpenMode::Append => Capabilities::TEXT_WRITE,
            OpenMode::Read => Capabilities::TEXT_READ,
            OpenMode::WriteUpdate | OpenMode::ReadUpdate | OpenMode::AppendUpdate => {
                Capabilities::TEXT_WRITE.union(Capabilities::TEXT_READ)
            }
            OpenMode::BinaryWrite | OpenMode::BinaryAppend => Capabilities::BYTES_WRITE,
            OpenMode::BinaryRead => Capabilities::BYTES_READ,
            OpenMode::BinaryWriteUpdate
            | OpenMode::BinaryReadUpdate
            | OpenMode::BinaryAppendUpdate => {
                Capabilities::BYTES_WRITE.union(Capabilities::BYTES_READ)
            }
        }
    }

    pub fn supports(self, required: Capabilities) -> bool {
        self.capabilities().contains(required)
    }

    /// Translates the mode into the options used to open the OS file.
    pub(crate) fn open_options(self) -> OpenOptions {
        let mut options = OpenOptions::new();
        match self.family() {
            ModeFamily::Read => {
                options.read(true).write(self.is_update());
            }
            ModeFamily::Write => {
                options
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .read(self.is_update());
            }
            ModeFamily::Append => {
                options.append(true).create(true).read(self.is_update());
            }
        }
        options
    }
}

impl FromStr for OpenMode {
    type Err = FileStreamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OpenMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| FileStreamError::new(ErrorKind::InvalidMode))
    }
}

impl std::fmt::Display for OpenMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for OpenMode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for OpenMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
