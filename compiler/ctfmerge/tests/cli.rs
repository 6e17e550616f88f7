#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

use std::fs;
use std::path::{Path, PathBuf};

use ctf_encode::format::HEADER_LEN;
use ctf_encode::{decompress_data, read_header, CtfFlags, Header};
use ctf_ir::interchange::UnitFile;
use ctf_ir::{ForwardKind, Intrinsic, Item, ItemKind, SharedInterner, TypeGraph};
use ctfmerge::{
    parse_args, run, Command, DriverError, InputError, MergeConfig, RecordBinding, SymbolFile,
    SymbolRecord,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn write_unit(dir: &Path, name: &str, graph: &TypeGraph) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, UnitFile::from_graph(graph).to_bytes().unwrap()).unwrap();
    path
}

/// `struct node { int value; struct node *next; }` and a global `head`.
fn list_unit(interner: &SharedInterner, file: &str) -> TypeGraph {
    let mut g = TypeGraph::with_source(interner.clone(), file);
    let int = g.add_intrinsic(Some("int"), 4, Intrinsic::int(32, true));
    let fwd = g.add_forward("node", ForwardKind::Struct);
    let ptr = g.add_pointer(fwd, 8);
    let members = vec![
        g.member(Some("value"), int, 0, 0),
        g.member(Some("next"), ptr, 64, 0),
    ];
    let node = g.add_struct(Some("node"), 16, members);
    g.redirect_forward(fwd, node).unwrap();
    g.add_item(Item::new(ItemKind::GlobalVariable, interner.intern("head"), ptr));
    g
}

/// `int printf(int, ...)`, or without the ellipsis.
fn printf_unit(interner: &SharedInterner, file: &str, variadic: bool) -> TypeGraph {
    let mut g = TypeGraph::with_source(interner.clone(), file);
    let int = g.add_intrinsic(Some("int"), 4, Intrinsic::int(32, true));
    let f = g.add_function(int, [int], variadic);
    g.add_item(
        Item::new(ItemKind::GlobalFunction, interner.intern("printf"), f)
            .with_args([int], variadic)
            .with_owner(interner.intern(file)),
    );
    g
}

fn config(dir: &TempDir, inputs: Vec<PathBuf>) -> MergeConfig {
    let mut config = MergeConfig::new(dir.path().join("out.ctf"));
    config.threads = Some(2);
    config.inputs = inputs;
    config
}

fn header_of(path: &Path) -> (Header, Vec<u8>) {
    let bytes = fs::read(path).unwrap();
    let (header, data) = decompress_data(&bytes).unwrap();
    (header, data.into_owned())
}

fn string_at(data: &[u8], header: &Header, off: u32) -> String {
    let start = (header.str_off + off) as usize;
    let len = data[start..].iter().position(|&b| b == 0).unwrap();
    String::from_utf8(data[start..start + len].to_vec()).unwrap()
}

#[test]
fn units_merge_into_one_labelled_artifact() {
    let dir = TempDir::new().unwrap();
    let interner = SharedInterner::new();
    let inputs = vec![
        write_unit(dir.path(), "a.unit", &list_unit(&interner, "a.c")),
        write_unit(dir.path(), "b.unit", &list_unit(&interner, "b.c")),
        write_unit(dir.path(), "c.unit", &printf_unit(&interner, "c.c", true)),
    ];
    let mut config = config(&dir, inputs);
    config.label = "release".to_owned();

    let summary = run(&config).unwrap();
    assert_eq!(summary.units, 3);
    assert!(summary.skipped.is_empty());
    assert!(summary.types_matched > 0);

    let (header, data) = header_of(&config.output);
    assert_eq!(header.n_objects, 1);
    assert_eq!(header.n_functions, 1);
    assert_eq!(header.n_labels, 1);
    // int, node, pointer, function
    assert_eq!(header.n_types, 4);

    let label = &data[header.label_off as usize..];
    let name = u32::from_le_bytes(label[..4].try_into().unwrap());
    assert_eq!(string_at(&data, &header, name), "release");
    assert_eq!(summary.bytes, fs::read(&config.output).unwrap().len());
}

#[test]
fn thread_count_does_not_change_the_artifact() {
    let dir = TempDir::new().unwrap();
    let interner = SharedInterner::new();
    let inputs: Vec<_> = (0..8)
        .map(|i| {
            let unit = list_unit(&interner, &format!("u{i}.c"));
            write_unit(dir.path(), &format!("u{i}.unit"), &unit)
        })
        .collect();

    let mut serial = config(&dir, inputs.clone());
    serial.threads = Some(1);
    serial.output = dir.path().join("serial.ctf");
    let mut parallel = config(&dir, inputs);
    parallel.threads = Some(4);
    parallel.output = dir.path().join("parallel.ctf");

    run(&serial).unwrap();
    run(&parallel).unwrap();
    assert_eq!(
        fs::read(&serial.output).unwrap(),
        fs::read(&parallel.output).unwrap()
    );
}

#[test]
fn conflicting_units_fail_the_run_and_write_nothing() {
    let dir = TempDir::new().unwrap();
    let interner = SharedInterner::new();
    let inputs = vec![
        write_unit(dir.path(), "a.unit", &printf_unit(&interner, "a.c", true)),
        write_unit(dir.path(), "b.unit", &printf_unit(&interner, "b.c", false)),
        write_unit(dir.path(), "c.unit", &list_unit(&interner, "c.c")),
    ];
    let config = config(&dir, inputs);

    let Err(DriverError::UnitsFailed { failures }) = run(&config) else {
        panic!("expected the conflict to fail the run");
    };
    assert_eq!(failures.len(), 1);
    assert!(failures[0].error.is_unit_scoped());
    assert!(!config.output.exists());
}

#[test]
fn keep_going_skips_conflicting_units() {
    let dir = TempDir::new().unwrap();
    let interner = SharedInterner::new();
    let inputs = vec![
        write_unit(dir.path(), "a.unit", &printf_unit(&interner, "a.c", true)),
        write_unit(dir.path(), "b.unit", &printf_unit(&interner, "b.c", false)),
    ];
    let mut config = config(&dir, inputs);
    config.keep_going = true;

    let summary = run(&config).unwrap();
    assert_eq!(summary.units, 1);
    assert_eq!(summary.skipped.len(), 1);
    let (header, _) = header_of(&config.output);
    assert_eq!(header.n_functions, 1);
}

#[test]
fn missing_inputs_are_fatal_even_when_keeping_going() {
    let dir = TempDir::new().unwrap();
    let mut config = config(&dir, vec![dir.path().join("absent.unit")]);
    config.keep_going = true;

    assert!(matches!(
        run(&config),
        Err(DriverError::Input(InputError::Read { .. }))
    ));
    assert!(!config.output.exists());
}

#[test]
fn garbage_unit_files_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("junk.unit");
    fs::write(&path, b"definitely not a unit").unwrap();

    assert!(matches!(
        run(&config(&dir, vec![path])),
        Err(DriverError::Input(InputError::Unit { .. }))
    ));
}

#[test]
fn compressed_artifacts_inflate() {
    let dir = TempDir::new().unwrap();
    let interner = SharedInterner::new();
    let inputs = vec![write_unit(dir.path(), "a.unit", &list_unit(&interner, "a.c"))];

    let mut plain = config(&dir, inputs.clone());
    plain.output = dir.path().join("plain.ctf");
    let mut packed = config(&dir, inputs);
    packed.output = dir.path().join("packed.ctf");
    packed.flags = CtfFlags::COMPRESS;

    run(&plain).unwrap();
    run(&packed).unwrap();

    let raw = fs::read(&packed.output).unwrap();
    assert!(read_header(&raw).unwrap().is_compressed());
    let (_, inflated) = header_of(&packed.output);
    assert_eq!(inflated, fs::read(&plain.output).unwrap()[HEADER_LEN..].to_vec());
}

#[test]
fn symbol_tables_drop_unbound_descriptors() {
    let dir = TempDir::new().unwrap();
    let interner = SharedInterner::new();
    let inputs = vec![
        write_unit(dir.path(), "a.unit", &list_unit(&interner, "a.c")),
        write_unit(dir.path(), "b.unit", &printf_unit(&interner, "b.c", true)),
    ];
    let symbols = SymbolFile::new(vec![SymbolRecord {
        name: "printf".to_owned(),
        function: true,
        binding: RecordBinding::Global,
        file: None,
        dynamic: true,
    }]);
    let symbols_path = dir.path().join("symbols.bin");
    fs::write(&symbols_path, symbols.to_bytes().unwrap()).unwrap();

    let mut config = config(&dir, inputs);
    config.symbols = Some(symbols_path);

    let summary = run(&config).unwrap();
    assert_eq!(summary.unmatched, 1);
    let (header, _) = header_of(&config.output);
    assert_eq!(header.n_functions, 1);
    assert_eq!(header.n_objects, 0);
}

/// Name of type `id` in an artifact whose types are all intrinsics or
/// pointers, 16 bytes each.
fn type_name(data: &[u8], header: &Header, id: u32) -> String {
    let at = (header.type_off + (id - header.first_type) * 16) as usize;
    let name = u32::from_le_bytes(data[at..at + 4].try_into().unwrap());
    string_at(data, header, name)
}

/// Type ID of the `index`th object.
fn object_type(data: &[u8], header: &Header, index: u32) -> u32 {
    let at = (header.object_off + index * 12 + 8) as usize;
    u32::from_le_bytes(data[at..at + 4].try_into().unwrap())
}

#[test]
fn children_reference_parent_types_by_their_artifact_ids() {
    let dir = TempDir::new().unwrap();
    let interner = SharedInterner::new();

    // Graph IDs int 1, int* 2; the artifact walks p first: int* 1, int 2.
    let mut base = TypeGraph::with_source(interner.clone(), "base.c");
    let int = base.add_intrinsic(Some("int"), 4, Intrinsic::int(32, true));
    let ptr = base.add_pointer(int, 8);
    base.add_item(Item::new(ItemKind::GlobalVariable, interner.intern("p"), ptr));
    let mut parent = config(&dir, vec![write_unit(dir.path(), "base.unit", &base)]);
    parent.output = dir.path().join("base.ctf");
    parent.emit_parent = Some(dir.path().join("libbase.unit"));
    run(&parent).unwrap();

    let (base_header, base_data) = header_of(&parent.output);
    assert_eq!(type_name(&base_data, &base_header, 2), "int");

    let mut child = list_unit(&interner, "a.c");
    let child_int = ctf_ir::TypeId::FIRST;
    assert_eq!(child.name_of(child_int), Some("int"));
    child.add_item(Item::new(ItemKind::GlobalVariable, interner.intern("q"), child_int));
    let mut config = config(&dir, vec![write_unit(dir.path(), "a.unit", &child)]);
    config.parent = parent.emit_parent.clone();
    run(&config).unwrap();

    let (header, data) = header_of(&config.output);
    assert_eq!(header.first_type, 3);
    // node and its pointer; int comes from the parent.
    assert_eq!(header.n_types, 2);
    assert_eq!(string_at(&data, &header, header.parent_name), "libbase.unit");
    // Objects sort by name: head, q.
    let q = object_type(&data, &header, 1);
    assert_eq!(type_name(&base_data, &base_header, q), "int");
}

#[test]
fn plain_units_are_not_parents() {
    let dir = TempDir::new().unwrap();
    let interner = SharedInterner::new();
    let mut base = TypeGraph::with_source(interner.clone(), "base.c");
    base.add_intrinsic(Some("int"), 4, Intrinsic::int(32, true));

    let inputs = vec![write_unit(dir.path(), "a.unit", &list_unit(&interner, "a.c"))];
    let mut config = config(&dir, inputs);
    config.parent = Some(write_unit(dir.path(), "base.unit", &base));
    assert!(matches!(
        run(&config),
        Err(DriverError::Input(InputError::NotNumbered { .. }))
    ));
    assert!(!config.output.exists());
}

#[test]
fn rerunning_with_the_same_label_moves_it() {
    let dir = TempDir::new().unwrap();
    let interner = SharedInterner::new();
    let mut unit = list_unit(&interner, "a.c");
    unit.label_add("release", ctf_ir::LabelIdx::At(ctf_ir::TypeId::FIRST)).unwrap();
    let mut config = config(&dir, vec![write_unit(dir.path(), "a.unit", &unit)]);
    config.label = "release".to_owned();

    let summary = run(&config).unwrap();
    assert_eq!(summary.encode.labels, 1);
    assert_eq!(summary.items.count(ItemKind::GlobalVariable), 1);
    assert_eq!(summary.items.total(), 1);
}

#[test]
fn command_lines_become_configs() {
    let args: Vec<String> = ["-o", "out.ctf", "-c", "-j", "3", "a.unit", "b.unit"]
        .iter()
        .map(|s| (*s).to_owned())
        .collect();
    let Command::Merge(config) = parse_args(&args).unwrap() else {
        panic!("expected a merge");
    };
    assert_eq!(config.threads, Some(3));
    assert_eq!(config.flags, CtfFlags::COMPRESS);
    assert_eq!(config.inputs.len(), 2);
}
