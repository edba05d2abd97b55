/*!
Specialized `Error` and `Result` types for ps2dump.
*/

use std::{error, fmt, result};

use log::{debug, error, info, trace, warn};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Error(pub ErrorOrigin, pub ErrorKind);

impl Error {
    /// Returns a static string representing the type of error.
    pub fn as_str(&self) -> &'static str {
        self.1.to_str()
    }

    /// Returns a static string representing the type of error.
    pub fn into_str(self) -> &'static str {
        self.as_str()
    }

    /// Returns the broad class this error belongs to.
    pub fn class(&self) -> ErrorClass {
        self.1.class()
    }

    pub fn log_error(self, err: impl fmt::Display) -> Self {
        error!("{}: {} ({})", self.0.to_str(), self.1.to_str(), err);
        self
    }

    pub fn log_warn(self, err: impl fmt::Display) -> Self {
        warn!("{}: {} ({})", self.0.to_str(), self.1.to_str(), err);
        self
    }

    pub fn log_info(self, err: impl fmt::Display) -> Self {
        info!("{}: {} ({})", self.0.to_str(), self.1.to_str(), err);
        self
    }

    pub fn log_debug(self, err: impl fmt::Display) -> Self {
        debug!("{}: {} ({})", self.0.to_str(), self.1.to_str(), err);
        self
    }

    pub fn log_trace(self, err: impl fmt::Display) -> Self {
        trace!("{}: {} ({})", self.0.to_str(), self.1.to_str(), err);
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.0.to_str(), self.1.to_str())
    }
}

impl error::Error for Error {}

/// Convert from ErrorKind
impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(ErrorOrigin::Other, kind)
    }
}

#[repr(u16)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ErrorOrigin {
    Args,

    Archive,
    Savestate,
    CpuRegisters,
    MemoryImage,

    ThreadTable,
    ThreadContext,

    ElfWriter,
    Output,

    Other,
}

impl ErrorOrigin {
    /// Returns a static string representing the type of error.
    pub fn to_str(self) -> &'static str {
        match self {
            ErrorOrigin::Args => "args",

            ErrorOrigin::Archive => "archive",
            ErrorOrigin::Savestate => "savestate",
            ErrorOrigin::CpuRegisters => "cpu registers",
            ErrorOrigin::MemoryImage => "memory image",

            ErrorOrigin::ThreadTable => "thread table",
            ErrorOrigin::ThreadContext => "thread context",

            ErrorOrigin::ElfWriter => "elf writer",
            ErrorOrigin::Output => "output",

            ErrorOrigin::Other => "other",
        }
    }
}

/// Broad classification of an [`ErrorKind`].
///
/// Every class is terminal for a translation run, the classes only differ in what went wrong.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ErrorClass {
    /// The container is not a usable savestate (missing entries, version floor).
    Format,
    /// The savestate does not have the expected binary layout.
    Layout,
    /// Recovered state contradicts itself.
    Consistency,
    /// Reading or writing files failed.
    Io,
    /// Invalid arguments or settings.
    Configuration,
}

impl ErrorClass {
    /// Returns a static string representing the class.
    pub fn to_str(self) -> &'static str {
        match self {
            ErrorClass::Format => "format error",
            ErrorClass::Layout => "layout error",
            ErrorClass::Consistency => "consistency error",
            ErrorClass::Io => "io error",
            ErrorClass::Configuration => "configuration error",
        }
    }
}

#[repr(u16)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    Configuration,
    ArgValidation,

    InvalidArchive,
    EntryNotFound,
    InvalidVersion,
    VersionMismatch,

    MarkerMismatch,
    OutOfBounds,
    OutOfMemoryRange,

    StackPointerMismatch,

    UnableToOpenFile,
    UnableToReadFile,
    UnableToWriteFile,
}

impl ErrorKind {
    /// Returns a static string representing the type of error.
    pub fn to_str(self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration error",
            ErrorKind::ArgValidation => "the argument could not be validated",

            ErrorKind::InvalidArchive => "file is not a valid savestate archive",
            ErrorKind::EntryNotFound => "required archive entry not found",
            ErrorKind::InvalidVersion => "version entry is malformed",
            ErrorKind::VersionMismatch => "savestate version is not supported",

            ErrorKind::MarkerMismatch => "section marker does not match",
            ErrorKind::OutOfBounds => "out of bounds",
            ErrorKind::OutOfMemoryRange => "address is outside of the memory image",

            ErrorKind::StackPointerMismatch => "saved stack pointer does not match the context",

            ErrorKind::UnableToOpenFile => "unable to open file",
            ErrorKind::UnableToReadFile => "unable to read file",
            ErrorKind::UnableToWriteFile => "unable to write file",
        }
    }

    /// Returns the broad class this kind of error belongs to.
    pub fn class(self) -> ErrorClass {
        match self {
            ErrorKind::Configuration | ErrorKind::ArgValidation => ErrorClass::Configuration,

            ErrorKind::InvalidArchive
            | ErrorKind::EntryNotFound
            | ErrorKind::InvalidVersion
            | ErrorKind::VersionMismatch => ErrorClass::Format,

            ErrorKind::MarkerMismatch | ErrorKind::OutOfBounds | ErrorKind::OutOfMemoryRange => {
                ErrorClass::Layout
            }

            ErrorKind::StackPointerMismatch => ErrorClass::Consistency,

            ErrorKind::UnableToOpenFile
            | ErrorKind::UnableToReadFile
            | ErrorKind::UnableToWriteFile => ErrorClass::Io,
        }
    }
}

/// Specialized `Result` type for ps2dump results.
pub type Result<T> = result::Result<T, Error>;
