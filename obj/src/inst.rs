use arch::op::Format;

/// One emitted unit: a real instruction, a data directive, or a bare label.
///
/// Pass one creates it with a provisional address; pass two fills in the
/// machine code and trailing words/bytes; the linker rewrites addresses and
/// extra words during relocation. Mnemonic and operand text survive only
/// inside a single assembly run, they are not part of the object format.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub label: Option<String>,
    pub mnemonic: Option<String>,
    pub operands: Option<String>,
    pub address: u16,
    pub format: Format,
    pub byte_mode: bool,
    pub machine_code: Option<u16>,
    pub extra_words: Vec<u16>,
    pub extra_bytes: Vec<u8>,
    pub section: String,
    /// Source module, tagged when merging object files.
    pub module: Option<String>,
    pub raw_line: String,
}

impl Instruction {
    /// Whether this unit carries a real opcode word.
    ///
    /// A stored word of 0x0000 means "no opcode": the object format writes
    /// 0x0000 for directives and bare labels, and no real instruction in the
    /// current opcode table encodes to zero.
    pub fn has_opcode(&self) -> bool {
        self.machine_code.map_or(false, |code| code != 0)
    }

    /// Size in bytes as laid out in memory.
    pub fn size(&self) -> u16 {
        let has_extras = !self.extra_words.is_empty() || !self.extra_bytes.is_empty();
        if !self.has_opcode() && !has_extras {
            // Bare label, zero size.
            return 0;
        }
        let opcode = if self.has_opcode() { 2 } else { 0 };
        opcode + 2 * self.extra_words.len() as u16 + self.extra_bytes.len() as u16
    }

    /// First address past this unit.
    pub fn end_address(&self) -> u32 {
        self.address as u32 + self.size() as u32
    }

    /// Whether `address` falls inside the bytes this unit occupies.
    pub fn contains(&self, address: u16) -> bool {
        address >= self.address && (address as u32) < self.end_address()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_of_label_instruction_and_directive() {
        let label = Instruction {
            label: Some("loop".into()),
            ..Default::default()
        };
        assert_eq!(label.size(), 0);

        let inst = Instruction {
            machine_code: Some(0x4225),
            ..Default::default()
        };
        assert_eq!(inst.size(), 2);

        let with_extra = Instruction {
            machine_code: Some(0x40B5),
            extra_words: vec![0x1234],
            ..Default::default()
        };
        assert_eq!(with_extra.size(), 4);

        let words = Instruction {
            extra_words: vec![1, 2, 3],
            ..Default::default()
        };
        assert_eq!(words.size(), 6);

        let bytes = Instruction {
            extra_bytes: vec![b'h', b'i', 0],
            ..Default::default()
        };
        assert_eq!(bytes.size(), 3);
    }

    #[test]
    fn containment_covers_extra_words() {
        let inst = Instruction {
            address: 0x10,
            machine_code: Some(0x12B0),
            extra_words: vec![0],
            ..Default::default()
        };
        assert!(inst.contains(0x10));
        assert!(inst.contains(0x12));
        assert!(!inst.contains(0x14));
    }
}
