mod common;

use common::{file_in, new_file, scratch};
use mapview::{ByteOrder, Mode, Viewer};
use rstest::rstest;

const LE: ByteOrder = ByteOrder::Little;
const BE: ByteOrder = ByteOrder::Big;

#[rstest]
#[case::aligned(0)]
#[case::odd(1)]
#[case::odd_mid(3)]
#[case::aligned_mid(8)]
#[case::word_but_not_dword(6)]
#[case::dword_but_not_qword(20)]
fn every_width_round_trips(#[case] pos: i64) {
    for order in [LE, BE] {
        let dir = scratch();
        let (_, mut v) = new_file(&dir, "rt.bin", 64);

        v.write_u8(pos, 0xA5);
        assert_eq!(v.read_u8(pos), 0xA5);
        v.write_i8(pos, -100);
        assert_eq!(v.read_i8(pos), -100);

        v.write_u16(pos, order, 0xBEEF);
        assert_eq!(v.read_u16(pos, order), 0xBEEF);
        v.write_i16(pos, order, -12345);
        assert_eq!(v.read_i16(pos, order), -12345);

        v.write_u32(pos, order, 0xDEAD_BEEF);
        assert_eq!(v.read_u32(pos, order), 0xDEAD_BEEF);
        v.write_i32(pos, order, i32::MIN + 7);
        assert_eq!(v.read_i32(pos, order), i32::MIN + 7);

        v.write_u64(pos, order, 0x0123_4567_89AB_CDEF);
        assert_eq!(v.read_u64(pos, order), 0x0123_4567_89AB_CDEF);
        v.write_i64(pos, order, -1);
        assert_eq!(v.read_i64(pos, order), -1);
    }
}

#[test]
fn reads_agree_with_bytewise_assembly() {
    let dir = scratch();
    let (_, mut v) = new_file(&dir, "bytes.bin", 40);
    for i in 0..40 {
        v.write_u8(i, (i as u8).wrapping_mul(7).wrapping_add(1));
    }

    // Any offset, aligned or not, must yield the value assembled from the
    // individual bytes.
    for pos in 0i64..32 {
        let b: Vec<u64> = (pos..pos + 8).map(|i| v.read_u8(i) as u64).collect();
        let le64 = (0..8).fold(0u64, |acc, i| acc | (b[i] << (8 * i)));
        assert_eq!(v.read_u64(pos, LE), le64);
        assert_eq!(v.read_u64(pos, BE), le64.swap_bytes());
        let le16 = b[0] as u16 | ((b[1] as u16) << 8);
        assert_eq!(v.read_u16(pos, LE), le16);
        assert_eq!(v.read_u16(pos, BE), le16.swap_bytes());
    }
}

#[test]
fn opposite_order_reads_are_byte_reversals() {
    let dir = scratch();
    let (_, mut v) = new_file(&dir, "dual.bin", 32);

    v.write_u32(0, LE, 0x1122_3344);
    assert_eq!(v.read_u32(0, BE), 0x4433_2211);
    v.write_u64(8, BE, 0x0102_0304_0506_0708);
    assert_eq!(v.read_u64(8, LE), 0x0807_0605_0403_0201);
    v.write_u16(16, LE, 0x1234);
    assert_eq!(v.read_u16(16, BE), 0x3412);
}

#[test]
fn mixed_order_writes_land_byte_exact() {
    let dir = scratch();
    let path = file_in(&dir, "mixed.bin");

    let mut v = Viewer::create(&path, Mode::Exclusive).unwrap();
    v.set_len(16).unwrap();
    v.write_u32(0, LE, 0xDEAD_BEEF);
    v.write_u32(4, BE, 0xDEAD_BEEF);
    v.flush();
    v.close();

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(
        &bytes[..8],
        &[0xEF, 0xBE, 0xAD, 0xDE, 0xDE, 0xAD, 0xBE, 0xEF]
    );

    let mut v = Viewer::create(&path, Mode::ReadOnly).unwrap();
    assert_eq!(v.read_u32(0, LE), 0xDEAD_BEEF);
    assert_eq!(v.read_u32(4, BE), 0xDEAD_BEEF);
}

#[test]
fn negative_one_is_all_ones_on_disk() {
    let dir = scratch();
    let path = file_in(&dir, "neg.bin");

    let mut v = Viewer::create(&path, Mode::Exclusive).unwrap();
    v.set_len(8).unwrap();
    v.write_i64(0, LE, -1);
    v.close();

    assert_eq!(std::fs::read(&path).unwrap(), vec![0xFF; 8]);

    let mut v = Viewer::create(&path, Mode::Existing).unwrap();
    assert_eq!(v.read_i64(0, LE), -1);
    assert_eq!(v.read_u64(0, LE), u64::MAX);
}

#[test]
fn signed_values_are_twos_complement_in_the_file() {
    let dir = scratch();
    let path = file_in(&dir, "twos.bin");

    let mut v = Viewer::create(&path, Mode::Exclusive).unwrap();
    v.set_len(4).unwrap();
    v.write_i16(0, BE, -2);
    v.write_i16(2, LE, -2);
    v.close();

    assert_eq!(std::fs::read(&path).unwrap(), vec![0xFF, 0xFE, 0xFE, 0xFF]);
}

#[test]
fn unaligned_write_persists_in_little_endian_layout() {
    let dir = scratch();
    let path = file_in(&dir, "unaligned.bin");

    let mut v = Viewer::create(&path, Mode::Exclusive).unwrap();
    v.set_len(16).unwrap();
    v.write_u16(3, LE, 0x1234);
    v.close();

    let mut v = Viewer::create(&path, Mode::ReadOnly).unwrap();
    assert_eq!(v.read_u8(3), 0x34);
    assert_eq!(v.read_u8(4), 0x12);
}

#[test]
fn last_in_range_access_succeeds_for_every_width() {
    let dir = scratch();
    let (_, mut v) = new_file(&dir, "tail.bin", 64);

    v.write_u8(63, 0x11);
    assert_eq!(v.read_u8(63), 0x11);
    v.write_u16(62, LE, 0x2222);
    assert_eq!(v.read_u16(62, LE), 0x2222);
    v.write_u32(60, LE, 0x3333_3333);
    assert_eq!(v.read_u32(60, LE), 0x3333_3333);
    v.write_u64(56, LE, 0x4444_4444_4444_4444);
    assert_eq!(v.read_u64(56, LE), 0x4444_4444_4444_4444);
}

#[test]
#[should_panic(expected = "offset outside file bounds")]
fn read_past_end_faults() {
    let dir = scratch();
    let (_, mut v) = new_file(&dir, "oob.bin", 16);
    // The last byte of the integer would be at offset 16.
    v.read_u32(13, LE);
}

#[test]
#[should_panic(expected = "offset outside file bounds")]
fn negative_offset_faults() {
    let dir = scratch();
    let (_, mut v) = new_file(&dir, "neg_off.bin", 16);
    v.read_u8(-1);
}

#[test]
#[should_panic(expected = "viewer is read-only")]
fn write_through_read_only_viewer_faults() {
    let dir = scratch();
    let path = file_in(&dir, "ro.bin");
    let mut v = Viewer::create(&path, Mode::Exclusive).unwrap();
    v.set_len(8).unwrap();
    v.close();

    let mut v = Viewer::create(&path, Mode::ReadOnly).unwrap();
    v.write_u8(0, 1);
}

#[test]
#[should_panic(expected = "offset outside file bounds")]
fn empty_file_faults_on_any_access() {
    let dir = scratch();
    let path = file_in(&dir, "empty.bin");
    let mut v = Viewer::create(&path, Mode::Exclusive).unwrap();
    assert_eq!(v.len(), 0);
    v.read_u8(0);
}
