//! Random-access typed-integer views over ordinary files.
//!
//! A [`Viewer`] keeps a single sliding memory-mapped window over an on-disk
//! file and exposes load/store operations for 8/16/32/64-bit signed and
//! unsigned integers at arbitrary byte offsets, in either byte order. The
//! window follows the access offset: whenever an access falls outside the
//! currently mapped range, the window is flushed (if dirty), unmapped, and
//! remapped over the region containing the target bytes. Clients never deal
//! with the mapping directly.
//!
//! The OS mapping primitives are abstracted behind the [`Backend`] trait
//! with one implementation per platform, selected at build time; everything
//! above that seam is platform-agnostic.
//!
//! # Example
//! ```no_run
//! use mapview::{ByteOrder, Mode, Viewer};
//!
//! let mut v = Viewer::create("data.bin", Mode::Regular)?;
//! v.set_len(16)?;
//! v.write_u32(0, ByteOrder::Little, 0xDEAD_BEEF);
//! v.write_u32(4, ByteOrder::Big, 0xDEAD_BEEF);
//! v.flush();
//! assert_eq!(v.read_u32(0, ByteOrder::Little), 0xDEAD_BEEF);
//! v.close();
//! # Ok::<(), mapview::Error>(())
//! ```
//!
//! A viewer is a single-threaded object: it may be moved between threads,
//! but calls on one viewer must be externally serialized.

#![cfg_attr(not(feature = "std"), no_std)]
extern crate alloc;

mod access;
pub mod backend;
mod error;
mod os;
mod probe;
mod viewer;

pub use backend::Backend;
pub use error::{Error, Result};
pub use viewer::Viewer;

/// The maximum allowed length for a viewed file, in bytes.
///
/// This exists only to keep offset arithmetic free of overflow. The limit
/// is more than one million terabytes, so real files never hit it.
pub const MAX_LEN: i64 = i64::MAX / 2;

/// The window size hint every viewer starts with, in bytes (16 MiB).
pub const DEFAULT_HINT: i32 = 1 << 24;

/// How a file is opened by [`Viewer::create`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mode {
    /// Open an existing file for reading only. Fails if the file does not
    /// exist.
    ReadOnly,
    /// Open an existing file for reading and writing. Fails if the file
    /// does not exist.
    Existing,
    /// Open for reading and writing, creating the file if necessary. A
    /// pre-existing file has its length reset to zero.
    Regular,
    /// Create a new file for reading and writing. Fails if the file
    /// already exists.
    Exclusive,
}

/// Byte order of an integer as laid out in the file.
///
/// [`Little`](ByteOrder::Little) means the byte at the lowest file offset
/// is the least significant; [`Big`](ByteOrder::Big) (network order) means
/// it is the most significant.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ByteOrder {
    Big,
    Little,
}

impl ByteOrder {
    #[inline]
    pub const fn is_little(self) -> bool {
        matches!(self, ByteOrder::Little)
    }
}

/// Handler invoked for fatal faults: programming errors and invariant
/// violations the library cannot locally recover from.
pub type FaultFn = fn(&str) -> !;

/// Handler invoked for non-fatal warnings, such as OS failures during
/// teardown.
pub type WarnFn = fn(&str);

/// Fault and warn handlers for one viewer, fixed at creation.
///
/// The default fault handler panics with the fault description; the
/// default warn handler emits a [`log::warn!`] record and continues.
#[derive(Clone, Copy)]
pub struct Hooks {
    pub fault: FaultFn,
    pub warn: WarnFn,
}

impl Default for Hooks {
    fn default() -> Self {
        Hooks {
            fault: default_fault,
            warn: default_warn,
        }
    }
}

fn default_fault(msg: &str) -> ! {
    panic!("{msg}");
}

fn default_warn(msg: &str) {
    log::warn!("{msg}");
}
