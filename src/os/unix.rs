use crate::{
    Error, Mode, Result, WarnFn,
    backend::Backend,
    error::{io_error, len_query_error, open_error},
};
use alloc::ffi::CString;
use core::{ffi::c_void, mem::MaybeUninit, ptr::NonNull};
use libc::{
    MAP_PRIVATE, MAP_SHARED, MS_SYNC, O_CREAT, O_EXCL, O_RDONLY, O_RDWR, O_TRUNC, PROT_READ,
    PROT_WRITE, SEEK_SET,
};

/// Read-write permissions for everyone, filtered by the process umask when
/// a file is created.
const RWRWRW: libc::mode_t =
    libc::S_IRUSR | libc::S_IWUSR | libc::S_IRGRP | libc::S_IWGRP | libc::S_IROTH | libc::S_IWOTH;

/// The POSIX implementation of the [`Backend`] trait.
pub struct OsBackend;

/// An open POSIX file descriptor.
///
/// The path is kept alongside the descriptor because `utime` needs it;
/// there is no handle-based way to set timestamps that predates
/// `futimens` everywhere this library runs.
pub struct OsFile {
    path: CString,
    fd: libc::c_int,
    warn: WarnFn,
}

impl Drop for OsFile {
    fn drop(&mut self) {
        if unsafe { libc::close(self.fd) } != 0 {
            (self.warn)("failed to close file descriptor");
        }
    }
}

impl Backend for OsBackend {
    type File = OsFile;
    /// POSIX has no mapping object separate from the descriptor; `mmap`
    /// works straight from the file.
    type Mapping = ();

    fn open(path: &str, mode: Mode, warn: WarnFn) -> Result<OsFile> {
        let cpath = CString::new(path).map_err(|_| Error::PathTranslate)?;
        let m = match mode {
            Mode::ReadOnly => O_RDONLY,
            Mode::Existing => O_RDWR,
            Mode::Regular => O_RDWR | O_CREAT | O_TRUNC,
            Mode::Exclusive => O_RDWR | O_CREAT | O_EXCL,
        };
        let fd = if m & O_CREAT != 0 {
            unsafe { libc::open(cpath.as_ptr(), m, RWRWRW as core::ffi::c_uint) }
        } else {
            unsafe { libc::open(cpath.as_ptr(), m) }
        };
        if fd == -1 {
            return Err(open_error("open failed"));
        }
        Ok(OsFile {
            path: cpath,
            fd,
            warn,
        })
    }

    fn query_len(file: &OsFile) -> Result<i64> {
        let mut st = MaybeUninit::<libc::stat>::zeroed();
        if unsafe { libc::fstat(file.fd, st.as_mut_ptr()) } != 0 {
            return Err(len_query_error("fstat failed"));
        }
        let len = unsafe { st.assume_init() }.st_size as i64;
        if !(0..=crate::MAX_LEN).contains(&len) {
            return Err(len_query_error("file length out of range"));
        }
        Ok(len)
    }

    fn set_len(file: &OsFile, old_len: i64, new_len: i64) -> Result<()> {
        if new_len > old_len {
            // Growing: seek to what will be the last byte and write a
            // single byte there. The content of the gap is undefined.
            let off = unsafe { libc::lseek(file.fd, (new_len - 1) as libc::off_t, SEEK_SET) };
            if off == -1 || off != (new_len - 1) as libc::off_t {
                return Err(io_error("lseek failed"));
            }
            let byte = 0u8;
            if unsafe { libc::write(file.fd, (&byte as *const u8).cast::<c_void>(), 1) } != 1 {
                return Err(io_error("write failed"));
            }
        } else if unsafe { libc::ftruncate(file.fd, new_len as libc::off_t) } != 0 {
            return Err(io_error("ftruncate failed"));
        }
        Ok(())
    }

    fn create_mapping(_file: &OsFile, _writable: bool, _warn: WarnFn) -> Result<()> {
        Ok(())
    }

    unsafe fn map(
        file: &OsFile,
        _mapping: &(),
        offset: i64,
        len: usize,
        writable: bool,
    ) -> Result<NonNull<u8>> {
        let ptr = if writable {
            unsafe {
                libc::mmap(
                    core::ptr::null_mut(),
                    len,
                    PROT_READ | PROT_WRITE,
                    MAP_SHARED,
                    file.fd,
                    offset as libc::off_t,
                )
            }
        } else {
            unsafe {
                libc::mmap(
                    core::ptr::null_mut(),
                    len,
                    PROT_READ,
                    MAP_PRIVATE,
                    file.fd,
                    offset as libc::off_t,
                )
            }
        };
        if core::ptr::eq(ptr, libc::MAP_FAILED) {
            return Err(map_error("mmap failed"));
        }
        Ok(unsafe { NonNull::new_unchecked(ptr.cast::<u8>()) })
    }

    unsafe fn unmap(ptr: NonNull<u8>, len: usize) -> Result<()> {
        if unsafe { libc::munmap(ptr.as_ptr().cast::<c_void>(), len) } != 0 {
            return Err(map_error("munmap failed"));
        }
        Ok(())
    }

    unsafe fn flush(ptr: NonNull<u8>, len: usize) -> Result<()> {
        if unsafe { libc::msync(ptr.as_ptr().cast::<c_void>(), len, MS_SYNC) } != 0 {
            return Err(map_error("msync failed"));
        }
        Ok(())
    }

    fn touch_mtime(file: &OsFile) -> Result<()> {
        let t = unsafe { libc::time(core::ptr::null_mut()) };
        if t < 0 {
            return Err(io_error("time failed"));
        }
        let tb = libc::utimbuf {
            actime: t,
            modtime: t,
        };
        if unsafe { libc::utime(file.path.as_ptr(), &tb) } != 0 {
            return Err(io_error("utime failed"));
        }
        Ok(())
    }

    fn granularity() -> i32 {
        let val = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if val < 0 { 4096 } else { val as i32 }
    }
}

#[cold]
#[inline(never)]
fn map_error(msg: &'static str) -> Error {
    Error::Io { msg: msg.into() }
}
