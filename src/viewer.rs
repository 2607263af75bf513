//! The viewer object and its windowing engine.

use crate::{
    DEFAULT_HINT, Hooks, MAX_LEN, Mode, Result,
    backend::{Backend, OsBackend},
    probe,
};
use alloc::format;
use bitflags::bitflags;
use core::ptr::NonNull;

/// Windows never exceed one gigabyte, both to bound the rounding step of
/// the size derivation and to cap per-window address-space commitment.
const WINDOW_CEILING: i32 = 1 << 30;

bitflags! {
    #[derive(Clone, Copy, Debug)]
    struct ViewerFlags: u32 {
        /// The viewer was opened read-only.
        const READ_ONLY = 1;
        /// The host stores integers little-endian.
        const HOST_LE = 1 << 1;
        /// The mapped window has been written to since the last flush.
        const DIRTY = 1 << 2;
        /// A write or resize happened; update the last-modified
        /// timestamp on close.
        const TOUCH = 1 << 3;
    }
}

/// The currently mapped byte range of the file.
struct Window {
    ptr: NonNull<u8>,
    /// File offset of the first mapped byte. Always a multiple of the
    /// derived window size.
    first: i64,
    /// File offset of the last mapped byte.
    last: i64,
}

impl Window {
    #[inline]
    fn len(&self) -> usize {
        (self.last - self.first + 1) as usize
    }

    #[inline]
    fn contains(&self, b: i64) -> bool {
        b >= self.first && b <= self.last
    }
}

/// A memory-mapped viewer over one on-disk file.
///
/// Created with [`Viewer::create`] or [`Viewer::create_with`], and closed
/// by [`Viewer::close`] or by dropping. All typed accessors live in a
/// separate impl block; see the crate root for the full surface.
///
/// The backend parameter is the build-time platform implementation; code
/// that just wants the current platform never names it.
pub struct Viewer<B: Backend = OsBackend> {
    file: B::File,
    /// Platform mapping object, created lazily before the first map after
    /// creation or after a resize.
    mapping: Option<B::Mapping>,
    window: Option<Window>,
    /// Cached file length in bytes, in `[0, MAX_LEN]`.
    flen: i64,
    /// Mapping granularity, at least 8 and a multiple of 8.
    pgsize: i32,
    /// Client window size hint. Any value.
    hint: i32,
    /// Derived window size. Zero iff the file is empty, otherwise a
    /// multiple of `pgsize` no larger than the file.
    wlen: i32,
    flags: ViewerFlags,
    hooks: Hooks,
}

// The window pointer refers to a mapping owned exclusively by this viewer,
// so moving the viewer to another thread moves the whole view with it.
unsafe impl<B: Backend> Send for Viewer<B>
where
    B::File: Send,
    B::Mapping: Send,
{
}

/// Computes the actual window size from the hint, the mapping granularity,
/// and the file length.
///
/// The hint is raised to at least the page size, capped at
/// [`WINDOW_CEILING`], rounded up to a page multiple, and finally capped
/// at the file length (which may take it to zero for an empty file).
fn derive_window_size(hint: i32, pgsize: i32, flen: i64) -> i32 {
    let mut wl = hint;
    if wl < pgsize {
        wl = pgsize;
    }
    if wl > WINDOW_CEILING {
        wl = WINDOW_CEILING;
    }
    if wl % pgsize != 0 {
        wl = (wl / pgsize + 1) * pgsize;
    }
    if wl as i64 > flen {
        wl = flen as i32;
    }
    wl
}

impl Viewer<OsBackend> {
    /// Opens `path` in the given mode with the default fault and warn
    /// handlers.
    pub fn create(path: &str, mode: Mode) -> Result<Self> {
        Self::open(path, mode, Hooks::default())
    }

    /// Opens `path` in the given mode with the given handlers.
    pub fn create_with(path: &str, mode: Mode, hooks: Hooks) -> Result<Self> {
        Self::open(path, mode, hooks)
    }
}

impl<B: Backend> Viewer<B> {
    /// Opens `path` in the given mode on an explicitly chosen backend.
    ///
    /// Most code wants [`Viewer::create`] or [`Viewer::create_with`],
    /// which pick the platform backend; this is the constructor to
    /// turbofish when driving the engine over something else.
    ///
    /// The handlers in `hooks` receive this viewer's faults and warnings
    /// for its whole lifetime. The host is probed once here: its byte
    /// order (with a two's-complement self-check) and its mapping
    /// granularity; an unusable answer to either probe is a fault.
    ///
    /// Nothing is mapped yet on return; the first typed access maps the
    /// first window. The window size hint starts at
    /// [`DEFAULT_HINT`](crate::DEFAULT_HINT), so calling
    /// [`set_hint`](Viewer::set_hint) right away changes the hint before
    /// anything is mapped.
    pub fn open(path: &str, mode: Mode, hooks: Hooks) -> Result<Self> {
        let mut flags = ViewerFlags::empty();
        if mode == Mode::ReadOnly {
            flags.insert(ViewerFlags::READ_ONLY);
        }
        if probe::host_little_endian(&hooks) {
            flags.insert(ViewerFlags::HOST_LE);
        }
        let pgsize = probe::page_size::<B>(&hooks);
        let file = B::open(path, mode, hooks.warn)?;
        let flen = B::query_len(&file)?;
        Ok(Viewer {
            file,
            mapping: None,
            window: None,
            flen,
            pgsize,
            hint: DEFAULT_HINT,
            wlen: derive_window_size(DEFAULT_HINT, pgsize, flen),
            flags,
            hooks,
        })
    }

    /// Closes the viewer.
    ///
    /// Any dirty window is flushed, the mapping is torn down, the
    /// last-modified timestamp is updated if anything was written, and the
    /// file handle is released. Dropping the viewer does the same thing;
    /// this method only makes the point of teardown explicit.
    pub fn close(self) {}

    /// Whether this viewer supports write operations.
    #[inline]
    pub fn writable(&self) -> bool {
        !self.flags.contains(ViewerFlags::READ_ONLY)
    }

    /// The length in bytes of the viewed file.
    ///
    /// The value is cached, so this involves no system call.
    #[inline]
    pub fn len(&self) -> i64 {
        self.flen
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.flen == 0
    }

    /// The current window size hint.
    #[inline]
    pub fn hint(&self) -> i32 {
        self.hint
    }

    /// Sets the length of the viewed file to `new_len` bytes.
    ///
    /// A no-op if the length already matches. Shrinking drops data from
    /// the end of the file; growing appends bytes of undefined content.
    /// Any mapped window is unmapped first and the window size is
    /// recomputed, so resizing has significant overhead.
    ///
    /// Faults if the viewer is read-only or `new_len` is outside
    /// `[0, MAX_LEN]`. On error the cached length is unchanged, but the
    /// on-disk length may be arbitrary; treat the viewer's length as
    /// stale and either retry or close.
    pub fn set_len(&mut self, new_len: i64) -> Result<()> {
        if !(0..=MAX_LEN).contains(&new_len) {
            self.fault("new file length out of range");
        }
        self.ensure_writable();
        if new_len == self.flen {
            return Ok(());
        }
        self.unmap_all();
        B::set_len(&self.file, self.flen, new_len)?;
        self.flags.insert(ViewerFlags::TOUCH);
        self.flen = new_len;
        self.recompute_window_size();
        Ok(())
    }

    /// Changes the window size hint.
    ///
    /// A no-op if the hint already matches. Zero or negative values make
    /// windows as small as the platform allows, which is usually a bad
    /// idea. If the derived window size changes, any mapped window is
    /// unmapped.
    ///
    /// Large windows are the best strategy, ideally fitting the whole
    /// file in one; small hints only make sense when many huge files are
    /// open at once and address space is the constraint.
    pub fn set_hint(&mut self, hint: i32) {
        if hint == self.hint {
            return;
        }
        self.hint = hint;
        if self.recompute_window_size() {
            self.unview();
        }
    }

    /// Pushes any unwritten changes out to the backing file.
    ///
    /// A no-op if nothing is dirty or nothing is mapped. Closing the
    /// viewer flushes automatically.
    pub fn flush(&mut self) {
        if self.flags.contains(ViewerFlags::DIRTY) {
            if let Some(win) = &self.window {
                if unsafe { B::flush(win.ptr, win.len()) }.is_err() {
                    self.warn("failed to flush window to disk");
                }
                self.flags.remove(ViewerFlags::DIRTY);
            }
        }
    }

    /// Re-derives the window size, returning whether it changed.
    fn recompute_window_size(&mut self) -> bool {
        let wl = derive_window_size(self.hint, self.pgsize, self.flen);
        let changed = wl != self.wlen;
        self.wlen = wl;
        changed
    }

    /// Unmaps the current window, if any, flushing it first when dirty.
    fn unview(&mut self) {
        self.flush();
        if let Some(win) = self.window.take() {
            if unsafe { B::unmap(win.ptr, win.len()) }.is_err() {
                self.warn("failed to unmap window");
            }
            log::trace!("unmapped window [{}, {}]", win.first, win.last);
        }
    }

    /// Tears the mapping down completely: the window and, where the
    /// platform has one, the file-mapping object.
    fn unmap_all(&mut self) {
        self.unview();
        self.mapping = None;
    }

    /// Ensures a window covering the byte at offset `b` is mapped.
    ///
    /// Faults if `b` lies outside the file. Because windows start at
    /// multiples of the window size, which is itself a multiple of eight,
    /// an aligned integer of up to eight bytes whose last byte is `b` is
    /// always fully inside the mapped window.
    pub(crate) fn require(&mut self, b: i64) {
        if b < 0 || b >= self.flen {
            self.fault("offset outside file bounds");
        }
        if let Some(win) = &self.window {
            if win.contains(b) {
                return;
            }
        }
        self.unview();

        let wlen = self.wlen as i64;
        let first = b / wlen * wlen;
        let len = wlen.min(self.flen - first);

        if self.mapping.is_none() {
            match B::create_mapping(&self.file, self.writable(), self.hooks.warn) {
                Ok(m) => {
                    log::trace!("created file mapping (writable: {})", self.writable());
                    self.mapping = Some(m);
                }
                Err(e) => self.fault(&format!("failed to create file mapping: {e}")),
            }
        }
        let mapping = match &self.mapping {
            Some(m) => m,
            None => self.fault("file mapping object missing"),
        };
        let ptr = match unsafe { B::map(&self.file, mapping, first, len as usize, self.writable()) }
        {
            Ok(ptr) => ptr,
            Err(e) => self.fault(&format!("failed to map window: {e}")),
        };
        log::trace!("mapped window [{}, {}] ({len} bytes)", first, first + len - 1);
        self.window = Some(Window {
            ptr,
            first,
            last: first + len - 1,
        });
    }

    /// Borrows `n` mapped bytes starting at file offset `pos`.
    ///
    /// The range must already be inside the mapped window.
    pub(crate) fn view_bytes(&self, pos: i64, n: usize) -> &[u8] {
        let win = self.window_or_fault();
        if pos < win.first || pos + n as i64 - 1 > win.last {
            self.fault("access outside mapped window");
        }
        unsafe {
            core::slice::from_raw_parts(win.ptr.as_ptr().add((pos - win.first) as usize), n)
        }
    }

    /// Mutably borrows `n` mapped bytes starting at file offset `pos`.
    pub(crate) fn view_bytes_mut(&mut self, pos: i64, n: usize) -> &mut [u8] {
        let win = self.window_or_fault();
        if pos < win.first || pos + n as i64 - 1 > win.last {
            self.fault("access outside mapped window");
        }
        unsafe {
            core::slice::from_raw_parts_mut(win.ptr.as_ptr().add((pos - win.first) as usize), n)
        }
    }

    fn window_or_fault(&self) -> &Window {
        match &self.window {
            Some(win) => win,
            None => self.fault("no window mapped"),
        }
    }

    /// Rough range check applied before the exact per-access bounds
    /// check.
    pub(crate) fn prefilter(&self, pos: i64) {
        if !(0..MAX_LEN).contains(&pos) {
            self.fault("offset outside file bounds");
        }
    }

    pub(crate) fn ensure_writable(&self) {
        if !self.writable() {
            self.fault("viewer is read-only");
        }
    }

    /// Records that mapped bytes were modified.
    pub(crate) fn mark_written(&mut self) {
        self.flags.insert(ViewerFlags::DIRTY | ViewerFlags::TOUCH);
    }

    #[inline]
    pub(crate) fn host_le(&self) -> bool {
        self.flags.contains(ViewerFlags::HOST_LE)
    }

    #[cold]
    pub(crate) fn fault(&self, msg: &str) -> ! {
        (self.hooks.fault)(msg)
    }

    fn warn(&self, msg: &str) {
        (self.hooks.warn)(msg)
    }
}

impl<B: Backend> core::fmt::Debug for Viewer<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Viewer")
            .field("flen", &self.flen)
            .field("pgsize", &self.pgsize)
            .field("hint", &self.hint)
            .field("wlen", &self.wlen)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

impl<B: Backend> Drop for Viewer<B> {
    fn drop(&mut self) {
        self.unmap_all();
        if self.flags.contains(ViewerFlags::TOUCH) {
            if B::touch_mtime(&self.file).is_err() {
                self.fault("failed to update last-modified timestamp");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::derive_window_size;

    #[test]
    fn small_hints_clamp_to_page_size() {
        assert_eq!(derive_window_size(0, 4096, 1 << 40), 4096);
        assert_eq!(derive_window_size(-123, 4096, 1 << 40), 4096);
        assert_eq!(derive_window_size(1, 65536, 1 << 40), 65536);
    }

    #[test]
    fn huge_hints_clamp_to_one_gigabyte() {
        assert_eq!(derive_window_size(i32::MAX, 4096, 1 << 40), 1 << 30);
    }

    #[test]
    fn hints_round_up_to_page_multiples() {
        assert_eq!(derive_window_size(5000, 4096, 1 << 40), 8192);
        assert_eq!(derive_window_size(4096, 4096, 1 << 40), 4096);
        assert_eq!(derive_window_size(4097, 4096, 1 << 40), 8192);
    }

    #[test]
    fn file_length_caps_the_window() {
        assert_eq!(derive_window_size(1 << 24, 4096, 100), 100);
        assert_eq!(derive_window_size(0, 4096, 10), 10);
        assert_eq!(derive_window_size(1 << 24, 4096, 0), 0);
    }

    #[test]
    fn derived_size_is_always_in_bounds() {
        let hints = [i32::MIN, -1, 0, 1, 4095, 4096, 4097, 1 << 20, 1 << 30, i32::MAX];
        let pages = [8, 4096, 16384, 65536];
        let lens = [0i64, 1, 7, 8, 4096, 100_000, 1 << 31, 1 << 40];
        for &hint in &hints {
            for &pg in &pages {
                for &flen in &lens {
                    let wl = derive_window_size(hint, pg, flen) as i64;
                    assert!(wl <= flen);
                    assert!(wl <= (1 << 30) + pg as i64);
                    if flen == 0 {
                        assert_eq!(wl, 0);
                    } else {
                        assert!(wl > 0);
                        // A page multiple, unless the whole file fits in
                        // one window.
                        assert!(wl % pg as i64 == 0 || wl == flen);
                    }
                }
            }
        }
    }
}
