use pretty_assertions::assert_eq;

use ctf_ir::TypeKind;

use super::{info_kind, info_root, info_vlen, read_header, type_info, Header, HEADER_LEN, VERSION};
use crate::FormatError;

fn sample() -> Header {
    Header {
        version: VERSION,
        flags: 0,
        parent_label: 0,
        parent_name: 0,
        first_type: 1,
        n_labels: 1,
        n_objects: 2,
        n_functions: 3,
        n_types: 4,
        label_off: 0,
        object_off: 8,
        function_off: 32,
        type_off: 80,
        str_off: 200,
        str_len: 17,
    }
}

fn bytes_of(header: &Header) -> Vec<u8> {
    let mut out = Vec::new();
    header.write_to(&mut out).ok();
    out
}

#[test]
fn header_is_fixed_size() {
    assert_eq!(bytes_of(&sample()).len(), HEADER_LEN);
}

#[test]
fn header_reads_back() {
    let header = sample();
    assert_eq!(read_header(&bytes_of(&header)), Ok(header));
}

#[test]
fn magic_is_little_endian() {
    let bytes = bytes_of(&sample());
    assert_eq!(&bytes[..3], &[0xF1, 0xCF, VERSION]);
}

#[test]
fn bad_magic_is_rejected() {
    let mut bytes = bytes_of(&sample());
    bytes[0] = 0;
    assert_eq!(read_header(&bytes), Err(FormatError::BadMagic(0xCF00)));
}

#[test]
fn other_versions_are_rejected() {
    for version in [0, VERSION - 1, VERSION + 1, u8::MAX] {
        let mut bytes = bytes_of(&sample());
        bytes[2] = version;
        assert_eq!(
            read_header(&bytes),
            Err(FormatError::UnsupportedVersion(version))
        );
    }
}

#[test]
fn short_buffers_are_truncated() {
    let bytes = bytes_of(&sample());
    assert_eq!(
        read_header(&bytes[..2]),
        Err(FormatError::Truncated { needed: 4, len: 2 })
    );
    assert_eq!(
        read_header(&bytes[..HEADER_LEN - 1]),
        Err(FormatError::Truncated {
            needed: HEADER_LEN,
            len: HEADER_LEN - 1
        })
    );
}

#[test]
fn misordered_sections_are_corrupt() {
    let mut header = sample();
    header.type_off = header.str_off + 1;
    assert!(matches!(
        read_header(&bytes_of(&header)),
        Err(FormatError::Corrupt(_))
    ));
}

#[test]
fn info_word_packs_kind_root_and_length() {
    let info = type_info(TypeKind::Struct, true, 3);
    assert_eq!(info_kind(info), TypeKind::Struct as u8);
    assert!(info_root(info));
    assert_eq!(info_vlen(info), 3);

    let info = type_info(TypeKind::PtrAuth, false, 0);
    assert_eq!(info_kind(info), TypeKind::PtrAuth as u8);
    assert!(!info_root(info));
    assert_eq!(info_vlen(info), 0);
}
