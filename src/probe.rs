//! One-shot platform queries, run once per viewer at creation.

use crate::{Backend, Hooks};

/// Determines whether the host stores integers little-endian.
///
/// Also verifies that signed integers use two's complement by inspecting
/// the raw bytes of the value -2; any pattern other than the two
/// two's-complement layouts is a fault.
pub(crate) fn host_little_endian(hooks: &Hooks) -> bool {
    let buf = (-2i16).to_ne_bytes();
    match buf {
        [0xff, 0xfe] => false,
        [0xfe, 0xff] => true,
        _ => (hooks.fault)("host integers are not two's complement"),
    }
}

/// Queries the host's mapping granularity through the backend.
///
/// The granularity must be at least eight bytes and a multiple of eight;
/// window arithmetic relies on that, so anything else is a fault.
pub(crate) fn page_size<B: Backend>(hooks: &Hooks) -> i32 {
    let pg = B::granularity();
    if pg < 8 || pg & 0x7 != 0 {
        (hooks.fault)("host page size is not a positive multiple of eight");
    }
    pg
}
