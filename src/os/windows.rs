use crate::{
    Error, Mode, Result, WarnFn,
    backend::Backend,
    error::{io_error, len_query_error, open_error},
};
use alloc::{borrow::Cow, format, vec::Vec};
use core::{ffi::c_void, mem::MaybeUninit, ptr::NonNull};
use windows_sys::Win32::{
    Foundation::{
        CloseHandle, FILETIME, GENERIC_READ, GENERIC_WRITE, GetLastError, HANDLE,
        INVALID_HANDLE_VALUE,
    },
    Storage::FileSystem::{
        CREATE_ALWAYS, CREATE_NEW, CreateFileW, FILE_ATTRIBUTE_NORMAL, FILE_BEGIN,
        FILE_SHARE_READ, GetFileSizeEx, OPEN_EXISTING, SetEndOfFile, SetFilePointerEx,
        SetFileTime,
    },
    System::{
        Memory::{
            CreateFileMappingW, FILE_MAP_READ, FILE_MAP_WRITE, FlushViewOfFile,
            MEMORY_MAPPED_VIEW_ADDRESS, MapViewOfFile, PAGE_READONLY, PAGE_READWRITE,
            UnmapViewOfFile,
        },
        SystemInformation::{GetSystemInfo, GetSystemTimeAsFileTime, SYSTEM_INFO},
    },
};

/// The Windows implementation of the [`Backend`] trait.
pub struct OsBackend;

/// An open Windows file handle.
pub struct OsFile {
    handle: HANDLE,
    warn: WarnFn,
}

/// The file-mapping object a view is carved out of.
///
/// Created read-only for read-only viewers and read-write otherwise, and
/// torn down whenever the file length changes so it can be recreated over
/// the new extent.
pub struct OsMapping {
    handle: HANDLE,
    warn: WarnFn,
}

unsafe impl Send for OsFile {}
unsafe impl Send for OsMapping {}

impl Drop for OsFile {
    fn drop(&mut self) {
        if unsafe { CloseHandle(self.handle) } == 0 {
            (self.warn)("failed to close file handle");
        }
    }
}

impl Drop for OsMapping {
    fn drop(&mut self) {
        if unsafe { CloseHandle(self.handle) } == 0 {
            (self.warn)("failed to close file mapping object");
        }
    }
}

/// Translates a UTF-8 path into the NUL-terminated UTF-16 form the wide
/// file API takes.
fn wide_path(path: &str) -> Result<Vec<u16>> {
    if path.as_bytes().contains(&0) {
        return Err(Error::PathTranslate);
    }
    let mut wide: Vec<u16> = path.encode_utf16().collect();
    wide.push(0);
    Ok(wide)
}

impl Backend for OsBackend {
    type File = OsFile;
    type Mapping = OsMapping;

    fn open(path: &str, mode: Mode, warn: WarnFn) -> Result<OsFile> {
        let wide = wide_path(path)?;
        let (access, share, disposition) = match mode {
            Mode::ReadOnly => (GENERIC_READ, FILE_SHARE_READ, OPEN_EXISTING),
            Mode::Existing => (GENERIC_READ | GENERIC_WRITE, 0, OPEN_EXISTING),
            Mode::Regular => (GENERIC_READ | GENERIC_WRITE, 0, CREATE_ALWAYS),
            Mode::Exclusive => (GENERIC_READ | GENERIC_WRITE, 0, CREATE_NEW),
        };
        let handle = unsafe {
            CreateFileW(
                wide.as_ptr(),
                access,
                share,
                core::ptr::null(),
                disposition,
                FILE_ATTRIBUTE_NORMAL,
                core::ptr::null_mut(),
            )
        };
        if handle == INVALID_HANDLE_VALUE {
            return Err(open_error(last_error("CreateFileW failed")));
        }
        Ok(OsFile { handle, warn })
    }

    fn query_len(file: &OsFile) -> Result<i64> {
        let mut len: i64 = 0;
        if unsafe { GetFileSizeEx(file.handle, &mut len) } == 0 {
            return Err(len_query_error(last_error("GetFileSizeEx failed")));
        }
        if !(0..=crate::MAX_LEN).contains(&len) {
            return Err(len_query_error("file length out of range"));
        }
        Ok(len)
    }

    fn set_len(file: &OsFile, _old_len: i64, new_len: i64) -> Result<()> {
        let mut moved: i64 = 0;
        if unsafe { SetFilePointerEx(file.handle, new_len, &mut moved, FILE_BEGIN) } == 0 {
            return Err(io_error(last_error("SetFilePointerEx failed")));
        }
        if unsafe { SetEndOfFile(file.handle) } == 0 {
            return Err(io_error(last_error("SetEndOfFile failed")));
        }
        Ok(())
    }

    fn create_mapping(file: &OsFile, writable: bool, warn: WarnFn) -> Result<OsMapping> {
        let protect = if writable { PAGE_READWRITE } else { PAGE_READONLY };
        let handle = unsafe {
            CreateFileMappingW(
                file.handle,
                core::ptr::null(),
                protect,
                0,
                0,
                core::ptr::null(),
            )
        };
        if handle.is_null() {
            return Err(io_error(last_error("CreateFileMappingW failed")));
        }
        Ok(OsMapping { handle, warn })
    }

    unsafe fn map(
        _file: &OsFile,
        mapping: &OsMapping,
        offset: i64,
        len: usize,
        writable: bool,
    ) -> Result<NonNull<u8>> {
        let access = if writable {
            FILE_MAP_READ | FILE_MAP_WRITE
        } else {
            FILE_MAP_READ
        };
        let view = unsafe {
            MapViewOfFile(
                mapping.handle,
                access,
                (offset >> 32) as u32,
                offset as u32,
                len,
            )
        };
        NonNull::new(view.Value.cast::<u8>())
            .ok_or_else(|| io_error(last_error("MapViewOfFile failed")))
    }

    unsafe fn unmap(ptr: NonNull<u8>, _len: usize) -> Result<()> {
        let addr = MEMORY_MAPPED_VIEW_ADDRESS {
            Value: ptr.as_ptr().cast::<c_void>(),
        };
        if unsafe { UnmapViewOfFile(addr) } == 0 {
            return Err(io_error(last_error("UnmapViewOfFile failed")));
        }
        Ok(())
    }

    unsafe fn flush(ptr: NonNull<u8>, _len: usize) -> Result<()> {
        // Length zero flushes from the base address to the end of the
        // view.
        if unsafe { FlushViewOfFile(ptr.as_ptr().cast::<c_void>(), 0) } == 0 {
            return Err(io_error(last_error("FlushViewOfFile failed")));
        }
        Ok(())
    }

    fn touch_mtime(file: &OsFile) -> Result<()> {
        let mut now = MaybeUninit::<FILETIME>::zeroed();
        unsafe { GetSystemTimeAsFileTime(now.as_mut_ptr()) };
        let now = unsafe { now.assume_init() };
        if unsafe { SetFileTime(file.handle, core::ptr::null(), &now, &now) } == 0 {
            return Err(io_error(last_error("SetFileTime failed")));
        }
        Ok(())
    }

    fn granularity() -> i32 {
        let mut si = MaybeUninit::<SYSTEM_INFO>::zeroed();
        unsafe { GetSystemInfo(si.as_mut_ptr()) };
        unsafe { si.assume_init() }.dwAllocationGranularity as i32
    }
}

#[cold]
#[inline(never)]
fn last_error(what: &str) -> Cow<'static, str> {
    let code = unsafe { GetLastError() };
    Cow::Owned(format!("{what}, error code: {code}"))
}
