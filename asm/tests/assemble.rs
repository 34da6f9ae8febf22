use masm::pass1::PassOne;
use masm::pass2::{Pass2Output, PassTwo};
use obj::reloc::RelocationType;
use obj::symbol::Binding;

fn assemble(source: &str) -> Pass2Output {
    PassTwo::assemble(PassOne::assemble_source(source).expect("pass one"))
}

/// Expected machine words for single-instruction programs.
macro_rules! encodes {
    ($name:ident, $source:expr, $word:expr) => {
        #[test]
        fn $name() {
            let out = assemble($source);
            assert_eq!(
                out.instructions[0].machine_code,
                Some($word),
                "source: {}",
                $source
            );
        }
    };
}

encodes!(mov_register_direct, "\tMOV R4,R5", 0x4405);
encodes!(mov_constant_four, "\tMOV #4,R5", 0x4225);
encodes!(clr_expands_to_mov_zero, "\tCLR R5", 0x4305);
encodes!(inc_expands_to_add_one, "\tINC R6", 0x5316);
encodes!(tst_duplicates_operand, "\tTST R9", 0x9909);
encodes!(mov_byte_mode, "\tMOV.B R4,R5", 0x4445);
encodes!(push_register, "\tPUSH R10", 0x120A);
encodes!(nop_fixed_word, "\tNOP", 0x4303);
encodes!(reti_no_operand, "\tRETI", 0x1300);
encodes!(swpb_indirect, "\tSWPB @R4", 0x10A4);

#[test]
fn immediate_with_extra_word_and_listing() {
    let out = assemble("\tMOV #0x1234,R5");
    let inst = &out.instructions[0];
    assert_eq!(inst.machine_code, Some(0x4035));
    assert_eq!(inst.extra_words, vec![0x1234]);
    assert!(out.listing.contains("1234"));
}

#[test]
fn word_directive_collects_values() {
    let out = assemble("\t.data\ntbl: .word 1,2,3");
    let inst = &out.instructions[0];
    assert_eq!(inst.address, 0);
    assert_eq!(inst.machine_code, None);
    assert_eq!(inst.extra_words, vec![1, 2, 3]);
    assert_eq!(inst.section, ".data");
}

#[test]
fn string_directive_appends_terminator() {
    let out = assemble("\t.data\nmsg: .string \"ok\"");
    assert_eq!(out.instructions[0].extra_bytes, vec![b'o', b'k', 0]);
}

#[test]
fn forward_jump_offset() {
    let out = assemble(
        "\tJNZ skip\n\
         \tNOP\n\
         skip: NOP",
    );
    // Target 4, jump at 0: (4 - 0 - 2) / 2 = 1.
    let code = out.instructions[0].machine_code.unwrap();
    assert_eq!(code, (0b001000 << 10) | 1);
}

#[test]
fn call_to_imported_symbol_records_relocation() {
    let out = assemble(
        "\t.ref puts\n\
         \tMOV #msg,R12\n\
         \tCALL #puts\n\
         \t.data\n\
         msg: .string \"x\"",
    );
    // #msg resolves locally, #puts stays a zero placeholder; both get
    // absolute relocations for the linker to rewrite.
    assert_eq!(out.relocations.len(), 2);
    assert_eq!(out.relocations[0].symbol, "msg");
    assert_eq!(out.relocations[0].address, 2);
    assert_eq!(out.relocations[1].symbol, "puts");
    assert_eq!(out.relocations[1].address, 6);
    assert!(out
        .relocations
        .iter()
        .all(|r| r.kind == RelocationType::Absolute16Bit));
}

#[test]
fn equ_set_and_expressions() {
    let out = assemble(
        "SIZE .equ 8\n\
         DOUBLE .set SIZE * 2\n\
         \tMOV #SIZE,R5\n\
         \t.data\n\
         v: .word DOUBLE + 1",
    );
    // A symbolic immediate always carries its value in an extra word,
    // even when a literal 8 would hit the constant generator.
    assert_eq!(out.instructions[0].machine_code, Some(0x4035));
    assert_eq!(out.instructions[0].extra_words, vec![8]);
    assert_eq!(out.instructions[1].extra_words, vec![17]);
}

#[test]
fn def_exports_and_ref_imports() {
    let out = assemble(
        "\t.def main\n\
         \t.ref helper\n\
         main: CALL #helper",
    );
    assert_eq!(out.symbols.get("main").unwrap().binding, Binding::Def);
    assert_eq!(out.symbols.get("helper").unwrap().binding, Binding::Ref);
    assert!(out.symbols.get("main").unwrap().defined);
    assert!(!out.symbols.get("helper").unwrap().defined);
}

#[test]
fn object_file_round_trips_through_codec() {
    let out = assemble(
        "\t.def main\n\
         main: MOV #0x1234,R5\n\
         \t.data\n\
         msg: .string \"hi\"",
    );
    let text = obj::codec::to_string(&out.into_module()).unwrap();
    let module = obj::codec::from_str(&text).unwrap();
    assert_eq!(module.instructions[0].machine_code, Some(0x4035));
    assert_eq!(module.instructions[0].extra_words, vec![0x1234]);
    assert_eq!(module.instructions[1].extra_bytes, vec![b'h', b'i', 0]);
    assert_eq!(module.symbols.get("main").unwrap().binding, Binding::Def);
}

#[test]
fn macro_invocations_expand_before_pass_one() {
    use masm::macros::MacroExpander;
    use std::io::Write;

    let dir = std::env::temp_dir().join("masm-macro-test");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("main.asm");
    let mut file = std::fs::File::create(&path).unwrap();
    write!(
        file,
        "double .macro r\n\
         \tADD r,r\n\
         .endm\n\
         \tdouble R4\n\
         \tdouble R5\n"
    )
    .unwrap();

    let expanded = MacroExpander::new().expand_file(&path).unwrap();
    let out = assemble(&expanded);
    assert_eq!(out.instructions[0].machine_code, Some(0x5404));
    assert_eq!(out.instructions[1].machine_code, Some(0x5505));
}
