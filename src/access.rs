//! The typed load/store surface of the viewer.
//!
//! One load and one store routine exist per width; signedness is a cast at
//! the public boundary and the byte shuffle against host order happens in
//! exactly one place. Unaligned accesses decompose into two half-width
//! accesses, down to bytes, which are always aligned.

use crate::{ByteOrder, backend::Backend, viewer::Viewer};

impl<B: Backend> Viewer<B> {
    /// Reorders `buf` between file order and host order. The two differ
    /// exactly when the requested order and the host's disagree.
    #[inline]
    fn shuffle(&self, buf: &mut [u8], le: bool) {
        if le != self.host_le() {
            buf.reverse();
        }
    }

    fn load8(&mut self, pos: i64) -> u8 {
        self.prefilter(pos);
        self.require(pos);
        self.view_bytes(pos, 1)[0]
    }

    fn store8(&mut self, pos: i64, v: u8) {
        self.prefilter(pos);
        self.ensure_writable();
        self.require(pos);
        self.view_bytes_mut(pos, 1)[0] = v;
        self.mark_written();
    }

    fn load16(&mut self, pos: i64, le: bool) -> u16 {
        self.prefilter(pos);
        if pos & 0x1 == 0 {
            // Mapping the last byte maps the whole integer.
            self.require(pos + 1);
            let mut buf = [0u8; 2];
            buf.copy_from_slice(self.view_bytes(pos, 2));
            self.shuffle(&mut buf, le);
            u16::from_ne_bytes(buf)
        } else {
            let a = self.load8(pos) as u16;
            let b = self.load8(pos + 1) as u16;
            if le { a | (b << 8) } else { (a << 8) | b }
        }
    }

    fn store16(&mut self, pos: i64, le: bool, v: u16) {
        self.prefilter(pos);
        self.ensure_writable();
        if pos & 0x1 == 0 {
            self.require(pos + 1);
            let mut buf = v.to_ne_bytes();
            self.shuffle(&mut buf, le);
            self.view_bytes_mut(pos, 2).copy_from_slice(&buf);
            self.mark_written();
        } else {
            let (a, b) = if le {
                (v as u8, (v >> 8) as u8)
            } else {
                ((v >> 8) as u8, v as u8)
            };
            self.store8(pos, a);
            self.store8(pos + 1, b);
        }
    }

    fn load32(&mut self, pos: i64, le: bool) -> u32 {
        self.prefilter(pos);
        if pos & 0x3 == 0 {
            self.require(pos + 3);
            let mut buf = [0u8; 4];
            buf.copy_from_slice(self.view_bytes(pos, 4));
            self.shuffle(&mut buf, le);
            u32::from_ne_bytes(buf)
        } else {
            let a = self.load16(pos, le) as u32;
            let b = self.load16(pos + 2, le) as u32;
            if le { a | (b << 16) } else { (a << 16) | b }
        }
    }

    fn store32(&mut self, pos: i64, le: bool, v: u32) {
        self.prefilter(pos);
        self.ensure_writable();
        if pos & 0x3 == 0 {
            self.require(pos + 3);
            let mut buf = v.to_ne_bytes();
            self.shuffle(&mut buf, le);
            self.view_bytes_mut(pos, 4).copy_from_slice(&buf);
            self.mark_written();
        } else {
            let (a, b) = if le {
                (v as u16, (v >> 16) as u16)
            } else {
                ((v >> 16) as u16, v as u16)
            };
            self.store16(pos, le, a);
            self.store16(pos + 2, le, b);
        }
    }

    fn load64(&mut self, pos: i64, le: bool) -> u64 {
        self.prefilter(pos);
        if pos & 0x7 == 0 {
            self.require(pos + 7);
            let mut buf = [0u8; 8];
            buf.copy_from_slice(self.view_bytes(pos, 8));
            self.shuffle(&mut buf, le);
            u64::from_ne_bytes(buf)
        } else {
            let a = self.load32(pos, le) as u64;
            let b = self.load32(pos + 4, le) as u64;
            if le { a | (b << 32) } else { (a << 32) | b }
        }
    }

    fn store64(&mut self, pos: i64, le: bool, v: u64) {
        self.prefilter(pos);
        self.ensure_writable();
        if pos & 0x7 == 0 {
            self.require(pos + 7);
            let mut buf = v.to_ne_bytes();
            self.shuffle(&mut buf, le);
            self.view_bytes_mut(pos, 8).copy_from_slice(&buf);
            self.mark_written();
        } else {
            let (a, b) = if le {
                (v as u32, (v >> 32) as u32)
            } else {
                ((v >> 32) as u32, v as u32)
            };
            self.store32(pos, le, a);
            self.store32(pos + 4, le, b);
        }
    }

    /// Reads the byte at file offset `pos`.
    ///
    /// Faults unless `pos` lies inside the file.
    pub fn read_u8(&mut self, pos: i64) -> u8 {
        self.load8(pos)
    }

    /// Reads the signed byte at file offset `pos`.
    pub fn read_i8(&mut self, pos: i64) -> i8 {
        self.load8(pos) as i8
    }

    /// Stores `v` at file offset `pos`.
    ///
    /// Faults if the viewer is read-only or `pos` lies outside the file.
    /// The byte lands in the mapped window; use
    /// [`flush`](Viewer::flush) or close the viewer to make it durable.
    pub fn write_u8(&mut self, pos: i64, v: u8) {
        self.store8(pos, v)
    }

    /// Stores the signed byte `v` at file offset `pos`.
    pub fn write_i8(&mut self, pos: i64, v: i8) {
        self.store8(pos, v as u8)
    }
}

macro_rules! typed_accessors {
    ($bits:literal, $read_u:ident, $read_i:ident, $write_u:ident, $write_i:ident,
     $load:ident, $store:ident, $u:ty, $i:ty) => {
        impl<B: Backend> Viewer<B> {
            #[doc = concat!("Reads the unsigned ", $bits, "-bit integer at file offset `pos`, \
laid out in the given byte order.")]
            ///
            /// Aligned offsets (divisible by the integer's width) take the
            /// direct in-window path; unaligned offsets decompose into two
            /// half-width accesses, which is slower. Faults unless the
            /// whole integer lies inside the file.
            pub fn $read_u(&mut self, pos: i64, order: ByteOrder) -> $u {
                self.$load(pos, order.is_little())
            }

            #[doc = concat!("Reads the signed two's-complement ", $bits, "-bit integer at \
file offset `pos`.")]
            pub fn $read_i(&mut self, pos: i64, order: ByteOrder) -> $i {
                self.$load(pos, order.is_little()) as $i
            }

            #[doc = concat!("Stores `v` as an unsigned ", $bits, "-bit integer at file \
offset `pos`, laid out in the given byte order.")]
            ///
            /// Faults if the viewer is read-only or the integer does not
            /// lie fully inside the file. The bytes land in the mapped
            /// window; use [`flush`](Viewer::flush) or close the viewer
            /// to make them durable. An unaligned store decomposes into
            /// half-width stores and may dirty two adjacent windows.
            pub fn $write_u(&mut self, pos: i64, order: ByteOrder, v: $u) {
                self.$store(pos, order.is_little(), v)
            }

            #[doc = concat!("Stores `v` as a signed two's-complement ", $bits, "-bit integer \
at file offset `pos`.")]
            pub fn $write_i(&mut self, pos: i64, order: ByteOrder, v: $i) {
                self.$store(pos, order.is_little(), v as $u)
            }
        }
    };
}

typed_accessors!("16", read_u16, read_i16, write_u16, write_i16, load16, store16, u16, i16);
typed_accessors!("32", read_u32, read_i32, write_u32, write_i32, load32, store32, u32, i32);
typed_accessors!("64", read_u64, read_i64, write_u64, write_i64, load64, store64, u64, i64);
