//! The seam between the platform-agnostic viewer and the OS mapping
//! primitives.

pub use crate::os::OsBackend;

use crate::{Mode, Result, WarnFn};
use core::ptr::NonNull;

/// A trait representing the low-level file and memory mapping operations a
/// viewer needs.
///
/// Exactly one implementation is selected at build time from the `os`
/// module: `mmap`/`msync`/`munmap` on POSIX, the
/// `CreateFileMapping`/`MapViewOfFile` family on Windows. The viewer never
/// names a platform; it only speaks this trait.
pub trait Backend {
    /// An open file handle. Dropping it releases the handle; a failure to
    /// release is reported through the warn handler captured at open time.
    type File;

    /// Platform state backing an active mapping, beyond the file handle
    /// itself. Windows keeps a file-mapping object here; on POSIX there is
    /// no such object and this is a unit.
    type Mapping;

    /// Opens the file at `path` in the given mode.
    ///
    /// Creation modes grant read and write permission to owner, group, and
    /// other where the platform supports it, filtered by the process
    /// umask. Sharing is disabled except for read-sharing of read-only
    /// opens on platforms with mandatory share modes.
    fn open(path: &str, mode: Mode, warn: WarnFn) -> Result<Self::File>;

    /// Returns the current byte length of the file.
    ///
    /// Fails if the length cannot be determined or exceeds
    /// [`MAX_LEN`](crate::MAX_LEN).
    fn query_len(file: &Self::File) -> Result<i64>;

    /// Changes the byte length of the file from `old_len` to `new_len`.
    ///
    /// The content of any bytes added by growth is undefined. On failure
    /// the on-disk length may be arbitrary.
    fn set_len(file: &Self::File, old_len: i64, new_len: i64) -> Result<()>;

    /// Creates the platform mapping object for the file, if the platform
    /// has one.
    ///
    /// Called lazily before the first [`map`](Backend::map) after open or
    /// after a resize. A read-only object is created iff `writable` is
    /// false.
    fn create_mapping(file: &Self::File, writable: bool, warn: WarnFn) -> Result<Self::Mapping>;

    /// Maps `len` bytes of the file starting at `offset` and returns the
    /// base address.
    ///
    /// `offset` must be a multiple of the mapping granularity and `len`
    /// at least one. The pointer stays valid until passed to
    /// [`unmap`](Backend::unmap).
    ///
    /// # Safety
    /// `offset + len` must not exceed the file length, and the caller must
    /// unmap the region before the file handle or mapping object goes
    /// away.
    unsafe fn map(
        file: &Self::File,
        mapping: &Self::Mapping,
        offset: i64,
        len: usize,
        writable: bool,
    ) -> Result<NonNull<u8>>;

    /// Releases a region previously returned by [`map`](Backend::map).
    ///
    /// # Safety
    /// `ptr` and `len` must describe exactly one live mapped region.
    unsafe fn unmap(ptr: NonNull<u8>, len: usize) -> Result<()>;

    /// Synchronously pushes any modified bytes in a mapped region through
    /// to the backing file.
    ///
    /// # Safety
    /// `ptr` and `len` must describe a live mapped region.
    unsafe fn flush(ptr: NonNull<u8>, len: usize) -> Result<()>;

    /// Sets the file's last-modified timestamp to the current wall-clock
    /// time.
    fn touch_mtime(file: &Self::File) -> Result<()>;

    /// The host's mapping granularity in bytes.
    fn granularity() -> i32;
}
