//! Property-based coverage of the byte-level primitives against arbitrary
//! input. `cargo test` runs these as part of the default dev-dependency set
//! (`proptest`); they exist to back the "never panics on malformed input"
//! guarantee `utils::read_str`/`decode_str` document, which fixed example
//! cases alone can't pin down.

use proptest::prelude::*;
use regf_hive::utils::{decode_str, read_dword, read_qword, read_word, StrEncoding};

proptest! {
    /// A little-endian WORD written at an arbitrary offset always reads back
    /// unchanged, regardless of what surrounds it.
    #[test]
    fn word_round_trips(value in any::<u16>(), pad in 0usize..16) {
        let mut data = vec![0u8; pad];
        data.extend_from_slice(&value.to_le_bytes());
        data.extend(vec![0u8; 8]);
        let read = read_word(&data, 0, pad).unwrap();
        prop_assert_eq!(read, value);
    }

    /// Same property for DWORD.
    #[test]
    fn dword_round_trips(value in any::<u32>(), pad in 0usize..16) {
        let mut data = vec![0u8; pad];
        data.extend_from_slice(&value.to_le_bytes());
        data.extend(vec![0u8; 8]);
        let read = read_dword(&data, 0, pad).unwrap();
        prop_assert_eq!(read, value);
    }

    /// Same property for QWORD.
    #[test]
    fn qword_round_trips(value in any::<u64>(), pad in 0usize..16) {
        let mut data = vec![0u8; pad];
        data.extend_from_slice(&value.to_le_bytes());
        data.extend(vec![0u8; 8]);
        let read = read_qword(&data, 0, pad).unwrap();
        prop_assert_eq!(read, value);
    }

    /// No arbitrary byte sequence, under either encoding, ever panics; it
    /// degrades to the sentinel string at worst.
    #[test]
    fn decode_str_never_panics_on_arbitrary_bytes(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let _ = decode_str(&bytes, StrEncoding::Ascii);
        let _ = decode_str(&bytes, StrEncoding::Utf16Le);
    }

    /// Any valid UTF-16LE encoding of an ASCII-only string round-trips
    /// through `decode_str`, trailing NULs aside.
    #[test]
    fn utf16_ascii_strings_round_trip(s in "[a-zA-Z0-9]{0,32}") {
        let bytes: Vec<u8> = s.encode_utf16().flat_map(|c| c.to_le_bytes()).collect();
        let decoded = decode_str(&bytes, StrEncoding::Utf16Le);
        prop_assert_eq!(decoded, s);
    }

    /// Reading past the end of a buffer always errors, never panics,
    /// regardless of buffer length or requested offset.
    #[test]
    fn out_of_bounds_reads_error_not_panic(len in 0usize..20, offset in 0usize..40) {
        let data = vec![0u8; len];
        let _ = read_dword(&data, 0, offset);
    }
}
