use masm::pass1::PassOne;
use masm::pass2::PassTwo;
use mld::{exec, linker, map};
use obj::Module;

fn assemble(source: &str) -> Module {
    PassTwo::assemble(PassOne::assemble_source(source).expect("pass one")).into_module()
}

fn merge(modules: Vec<(&str, Module)>) -> Module {
    obj::codec::merge(
        modules
            .into_iter()
            .map(|(name, module)| (name.to_string(), module))
            .collect(),
    )
    .expect("merge")
}

#[test]
fn call_across_modules_patched_to_final_address() {
    let caller = assemble(
        "\t.def main\n\
         \t.ref helper\n\
         main: CALL #helper\n\
         \tNOP",
    );
    let callee = assemble(
        "\t.def helper\n\
         helper: NOP\n\
         \tRETI",
    );
    let out = linker::link(merge(vec![("a.obj", caller), ("b.obj", callee)])).unwrap();

    // a.obj occupies 6 bytes at the .text base, b.obj follows it.
    assert_eq!(out.symbols.address_of("main"), Some(0xF800));
    assert_eq!(out.symbols.address_of("helper"), Some(0xF806));

    let call = out
        .instructions
        .iter()
        .find(|i| i.address == 0xF800)
        .unwrap();
    assert_eq!(call.machine_code, Some(0x12B0));
    assert_eq!(call.extra_words, vec![0xF806]);

    let text = &out.segments[".text"];
    assert_eq!(text.origin, 0xF800);
    assert_eq!(
        text.data,
        vec![0xB0, 0x12, 0x06, 0xF8, 0x03, 0x43, 0x03, 0x43, 0x00, 0x13]
    );
}

#[test]
fn multiply_defined_symbol_is_fatal() {
    let a = assemble("\t.def x\nx: NOP");
    let b = assemble("\t.def x\nx: RETI");
    let err = obj::codec::merge(vec![("a.obj".to_string(), a), ("b.obj".to_string(), b)])
        .unwrap_err();
    assert!(matches!(err, obj::Error::MultiplyDefined(name) if name == "x"));
}

#[test]
fn data_references_relocate_with_their_section() {
    let module = assemble(
        "\t.def main\n\
         main: MOV #msg,R12\n\
         \t.data\n\
         msg: .string \"hi\"",
    );
    let out = linker::link(merge(vec![("a.obj", module)])).unwrap();

    // msg moves from provisional .data offset 0 to the section base, and
    // the immediate's extra word follows it.
    assert_eq!(out.symbols.address_of("msg"), Some(0x2000));
    let mov = out
        .instructions
        .iter()
        .find(|i| i.address == 0xF800)
        .unwrap();
    assert_eq!(mov.extra_words, vec![0x2000]);
    assert_eq!(out.segments[".data"].data, vec![b'h', b'i', 0]);
}

#[test]
fn bss_occupies_addresses_but_no_output_bytes() {
    let module = assemble(
        "main: NOP\n\
         \t.bss\n\
         buf: .space 8\n\
         tail: .space 2",
    );
    let out = linker::link(merge(vec![("a.obj", module)])).unwrap();

    assert_eq!(out.symbols.address_of("buf"), Some(0x3000));
    assert_eq!(out.symbols.address_of("tail"), Some(0x3008));
    // The executable carries only the .text block.
    let text = exec::render(&out.segments);
    assert!(text.contains("@F800"));
    assert!(!text.contains("@3000"));
    assert!(text.ends_with("q\n"));
}

#[test]
fn object_files_round_trip_through_the_full_pipeline() {
    let dir = std::env::temp_dir().join("mld-pipeline-test");
    std::fs::create_dir_all(&dir).unwrap();

    let a = dir.join("a.obj");
    let b = dir.join("b.obj");
    obj::codec::write(
        &a,
        &assemble(
            "\t.def main\n\
             \t.ref helper\n\
             main: CALL #helper\n\
             \tNOP",
        ),
    )
    .unwrap();
    obj::codec::write(&b, &assemble("\t.def helper\nhelper: RETI")).unwrap();

    let paths = vec![
        a.display().to_string(),
        b.display().to_string(),
    ];
    let merged = obj::codec::read_multiple(&paths).unwrap();
    let out = linker::link(merged).unwrap();

    assert_eq!(out.symbols.address_of("helper"), Some(0xF806));
    let exe = exec::render(&out.segments);
    assert!(exe.starts_with("@F800\n"));
    assert!(exe.contains("B0 12 06 F8"));

    let report = map::render("linked.txt", &out);
    assert!(report.contains("0x0000F800  main"));
    assert!(report.contains("0x0000F806  helper"));
}

#[test]
fn linking_is_deterministic() {
    let source_a = "\t.def main\nmain: NOP\n\tNOP";
    let source_b = "\t.def aux\naux: RETI";
    let first = linker::link(merge(vec![
        ("a.obj", assemble(source_a)),
        ("b.obj", assemble(source_b)),
    ]))
    .unwrap();
    let second = linker::link(merge(vec![
        ("a.obj", assemble(source_a)),
        ("b.obj", assemble(source_b)),
    ]))
    .unwrap();

    assert_eq!(
        exec::render(&first.segments),
        exec::render(&second.segments)
    );
    assert_eq!(
        map::render("out.txt", &first),
        map::render("out.txt", &second)
    );
}
