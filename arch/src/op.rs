use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Instruction format families of the ISA.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Data directives, bare labels and fixed-word encodings.
    #[default]
    Directive,
    /// Format 1: two operands, 4-bit opcode.
    Double,
    /// Format 2: one operand, 9-bit opcode.
    Single,
    /// Format 3: conditional jumps, 6-bit condition code.
    Jump,
}

/// Encoding bits for a mnemonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// 4-bit opcode, shifted to bits 15..12.
    Double(u16),
    /// 9-bit opcode, shifted to bits 15..7.
    Single(u16),
    /// 6-bit condition code, shifted to bits 15..10.
    Jump(u16),
    /// Complete machine word, no operand fields.
    Fixed(u16),
}

impl Opcode {
    pub fn format(&self) -> Format {
        match self {
            Opcode::Double(_) => Format::Double,
            Opcode::Single(_) => Format::Single,
            Opcode::Jump(_) => Format::Jump,
            Opcode::Fixed(_) => Format::Directive,
        }
    }
}

static OPCODES: Lazy<HashMap<&'static str, Opcode>> = Lazy::new(|| {
    let mut map = HashMap::new();

    // Format 1 (double operand)
    map.insert("MOV", Opcode::Double(0b0100));
    map.insert("ADD", Opcode::Double(0b0101));
    map.insert("ADDC", Opcode::Double(0b0110));
    map.insert("SUBC", Opcode::Double(0b0111));
    map.insert("SUB", Opcode::Double(0b1000));
    map.insert("CMP", Opcode::Double(0b1001));
    map.insert("DADD", Opcode::Double(0b1010));
    map.insert("BIT", Opcode::Double(0b1011));
    map.insert("BIC", Opcode::Double(0b1100));
    map.insert("BIS", Opcode::Double(0b1101));
    map.insert("XOR", Opcode::Double(0b1110));
    map.insert("AND", Opcode::Double(0b1111));

    // Format 2 (single operand)
    map.insert("RRC", Opcode::Single(0b000100000));
    map.insert("SWPB", Opcode::Single(0b000100001));
    map.insert("RRA", Opcode::Single(0b000100010));
    map.insert("SXT", Opcode::Single(0b000100011));
    map.insert("PUSH", Opcode::Single(0b000100100));
    map.insert("CALL", Opcode::Single(0b000100101));
    map.insert("RETI", Opcode::Single(0b000100110));

    // Format 3 (jumps)
    map.insert("JNE", Opcode::Jump(0b001000));
    map.insert("JNZ", Opcode::Jump(0b001000));
    map.insert("JEQ", Opcode::Jump(0b001001));
    map.insert("JZ", Opcode::Jump(0b001001));
    map.insert("JNC", Opcode::Jump(0b001010));
    map.insert("JC", Opcode::Jump(0b001011));
    map.insert("JN", Opcode::Jump(0b001100));
    map.insert("JGE", Opcode::Jump(0b001101));
    map.insert("JL", Opcode::Jump(0b001110));
    map.insert("JMP", Opcode::Jump(0b001111));
    map.insert("BR", Opcode::Jump(0b001111));

    // NOP has no operand fields, it assembles to one fixed word.
    map.insert("NOP", Opcode::Fixed(0x4303));

    // Emulated mnemonics keep their base instruction's opcode so that the
    // format of a line can be classified before the pseudo transform runs.
    map.insert("CLR", Opcode::Double(0b0100)); // MOV
    map.insert("INC", Opcode::Double(0b0101)); // ADD
    map.insert("DEC", Opcode::Double(0b1000)); // SUB
    map.insert("TST", Opcode::Double(0b1001)); // CMP

    map
});

/// Look up a mnemonic, case insensitive.
pub fn lookup(mnemonic: &str) -> Option<Opcode> {
    OPCODES.get(mnemonic.to_ascii_uppercase().as_str()).copied()
}

pub fn contains(mnemonic: &str) -> bool {
    lookup(mnemonic).is_some()
}
