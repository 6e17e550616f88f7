//! A reader for encoded artifacts, for checking what the encoder wrote.

use byteorder::{LittleEndian, ReadBytesExt};
use ctf_encode::format::{info_kind, info_root, info_vlen};
use ctf_encode::{decompress_data, Header};
use ctf_ir::TypeKind;

type Le = LittleEndian;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub id: u32,
    pub name: String,
    pub kind: u8,
    pub root: bool,
    pub size: u32,
    /// Referenced type IDs in payload order.
    pub refs: Vec<u32>,
    /// Member or enumerator names.
    pub names: Vec<String>,
}

#[derive(Debug)]
pub struct Decoded {
    pub header: Header,
    pub labels: Vec<(String, u32)>,
    pub objects: Vec<(String, u32, u32)>,
    /// (name, symidx, ret, args)
    pub functions: Vec<(String, u32, u32, Vec<u32>)>,
    pub types: Vec<Entry>,
}

impl Decoded {
    pub fn entry(&self, id: u32) -> &Entry {
        let index = (id - self.header.first_type) as usize;
        &self.types[index]
    }

    pub fn named(&self, name: &str) -> &Entry {
        self.types.iter().find(|e| e.name == name).unwrap()
    }
}

pub fn decode(bytes: &[u8]) -> Decoded {
    let (header, data) = decompress_data(bytes).unwrap();
    let strings = &data[header.str_off as usize..header.data_len()];
    let string = |off: u32| -> String {
        let rest = &strings[off as usize..];
        let len = rest.iter().position(|&b| b == 0).unwrap();
        String::from_utf8(rest[..len].to_vec()).unwrap()
    };
    let section = |from: u32, to: u32| &data[from as usize..to as usize];
    let word = |r: &mut &[u8]| r.read_u32::<Le>().unwrap();

    let mut r = section(header.label_off, header.object_off);
    let labels = (0..header.n_labels)
        .map(|_| (string(word(&mut r)), word(&mut r)))
        .collect();

    let mut r = section(header.object_off, header.function_off);
    let objects = (0..header.n_objects)
        .map(|_| (string(word(&mut r)), word(&mut r), word(&mut r)))
        .collect();

    let mut r = section(header.function_off, header.type_off);
    let functions = (0..header.n_functions)
        .map(|_| {
            let name = string(word(&mut r));
            let symidx = word(&mut r);
            let vlen = info_vlen(word(&mut r));
            let ret = word(&mut r);
            let args = (0..vlen).map(|_| word(&mut r)).collect();
            (name, symidx, ret, args)
        })
        .collect();

    let mut r = section(header.type_off, header.str_off);
    let mut types = Vec::new();
    for id in header.first_type..header.first_type + header.n_types {
        let name = string(word(&mut r));
        let info = word(&mut r);
        let size = word(&mut r);
        let (kind, vlen) = (info_kind(info), info_vlen(info));
        let mut refs = Vec::new();
        let mut names = Vec::new();
        match kind {
            k if k == TypeKind::Integer as u8 || k == TypeKind::Real as u8 => {
                word(&mut r);
            }
            k if k == TypeKind::Forward as u8 => {
                word(&mut r);
            }
            k if k == TypeKind::PtrAuth as u8 => {
                refs.push(word(&mut r));
                word(&mut r);
            }
            k if k == TypeKind::Array as u8 => {
                refs.push(word(&mut r));
                refs.push(word(&mut r));
                word(&mut r);
            }
            k if k == TypeKind::Function as u8 => {
                refs.push(word(&mut r));
                refs.extend((0..vlen).map(|_| word(&mut r)));
            }
            k if k == TypeKind::Struct as u8 || k == TypeKind::Union as u8 => {
                for _ in 0..vlen {
                    names.push(string(word(&mut r)));
                    refs.push(word(&mut r));
                    word(&mut r);
                    word(&mut r);
                }
            }
            k if k == TypeKind::Enum as u8 => {
                for _ in 0..vlen {
                    names.push(string(word(&mut r)));
                    word(&mut r);
                }
            }
            _ => refs.push(word(&mut r)),
        }
        types.push(Entry {
            id,
            name,
            kind,
            root: info_root(info),
            size,
            refs,
            names,
        });
    }
    assert!(r.is_empty(), "type section has trailing bytes");

    Decoded {
        header,
        labels,
        objects,
        functions,
        types,
    }
}
