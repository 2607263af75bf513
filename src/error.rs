use alloc::borrow::Cow;
use core::fmt::{Debug, Display};

/// Error types reported through the result channel of the `mapview`
/// library.
///
/// These cover the user-correctable failure conditions of opening and
/// resizing a viewed file. Faults (out-of-bounds offsets, writes through a
/// read-only viewer, mapping requests the OS rejects) are not errors in
/// this sense and go through the viewer's fault handler instead.
#[derive(Debug)]
pub enum Error {
    /// The requested viewer creation mode was not recognized.
    BadMode,

    /// The path could not be translated to the form the host filesystem
    /// API requires.
    ///
    /// On Windows this means the UTF-8 input could not become a
    /// wide-character string; on POSIX it means a C string could not be
    /// formed (an interior NUL byte).
    PathTranslate,

    /// The file could not be opened in the requested mode.
    ///
    /// Typical causes are a missing file, a pre-existing file in
    /// [`Mode::Exclusive`](crate::Mode::Exclusive), or lacking
    /// permissions.
    Open {
        /// A descriptive message about the open failure.
        msg: Cow<'static, str>,
    },

    /// The length of the freshly opened file could not be determined, or
    /// it exceeds [`MAX_LEN`](crate::MAX_LEN).
    LenQuery {
        /// A descriptive message about the length query failure.
        msg: Cow<'static, str>,
    },

    /// An I/O operation failed while resizing the file.
    ///
    /// The viewer's cached length is left unchanged, but the on-disk
    /// length may be arbitrary; treat the cached length as stale and
    /// either retry the resize or close the viewer.
    Io {
        /// A descriptive message about the I/O error.
        msg: Cow<'static, str>,
    },
}

impl Error {
    /// A static description of the error category, independent of any
    /// context captured in the value.
    pub fn message(&self) -> &'static str {
        match self {
            Error::BadMode => "invalid viewer creation mode",
            Error::PathTranslate => "failed to translate path for the host filesystem API",
            Error::Open { .. } => "failed to open file path",
            Error::LenQuery { .. } => "failed to query length of file",
            Error::Io { .. } => "I/O error",
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::BadMode | Error::PathTranslate => f.write_str(self.message()),
            Error::Open { msg } | Error::LenQuery { msg } | Error::Io { msg } => {
                write!(f, "{}: {msg}", self.message())
            }
        }
    }
}

impl core::error::Error for Error {}

/// Creates an open error with the specified message.
#[cold]
#[inline(never)]
pub(crate) fn open_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::Open { msg: msg.into() }
}

/// Creates a length query error with the specified message.
#[cold]
#[inline(never)]
pub(crate) fn len_query_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::LenQuery { msg: msg.into() }
}

/// Creates an I/O error with the specified message.
#[cold]
#[inline(never)]
pub(crate) fn io_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::Io { msg: msg.into() }
}

pub type Result<T> = core::result::Result<T, Error>;
