//! Pass one: classify lines, collect symbols, assign provisional addresses.
//!
//! Every line is reduced to an [`Instruction`] record carrying its section
//! and the section program counter at the point it appeared. Sizing runs
//! the same pseudo-instruction transform pass two uses, so both passes
//! agree on how many words a line occupies.

use crate::error::Error;
use crate::literal;
use crate::macros::MacroExpander;
use crate::section::SectionTracker;
use arch::{op, psudo, reg};
use obj::inst::Instruction;
use obj::symbol::{Binding, SymbolTable};
use std::path::Path;

#[derive(Debug)]
pub struct Pass1Output {
    pub instructions: Vec<Instruction>,
    pub symbols: SymbolTable,
}

pub struct PassOne {
    symbols: SymbolTable,
    instructions: Vec<Instruction>,
    sections: SectionTracker,
}

impl PassOne {
    /// Macro-expand a file and run pass one over the result.
    pub fn assemble_file(path: &Path) -> Result<Pass1Output, Error> {
        let mut expander = MacroExpander::new();
        let expanded = expander.expand_file(path)?;
        Self::assemble_source(&expanded)
    }

    pub fn assemble_source(source: &str) -> Result<Pass1Output, Error> {
        let mut pass = PassOne {
            symbols: SymbolTable::new(),
            instructions: Vec::new(),
            sections: SectionTracker::new(),
        };
        for line in source.lines() {
            pass.process_line(line)?;
        }
        Ok(Pass1Output {
            instructions: pass.instructions,
            symbols: pass.symbols,
        })
    }

    fn process_line(&mut self, line: &str) -> Result<(), Error> {
        let stripped = match line.find(';') {
            Some(idx) => &line[..idx],
            None => line,
        };
        let mut text = stripped.trim().to_string();
        if text.is_empty() {
            return Ok(());
        }

        let (mut first, mut rest) = split_first(&text);
        let mut label: Option<String> = None;

        if let Some(name) = first.strip_suffix(':') {
            let name = name.to_string();
            match self.symbols.get(&name) {
                Some(entry) if entry.defined => {
                    return Err(Error::DuplicateLabel(name));
                }
                Some(entry) if entry.binding == Binding::Ref => {
                    return Err(Error::RefRedefined(name));
                }
                Some(_) => {
                    // Forward reference from .def, fill in the address.
                    let section = self.sections.current().to_string();
                    self.symbols
                        .add_or_update(&name, self.sections.spc(), &section)?;
                }
                None => {
                    let section = self.sections.current().to_string();
                    self.symbols
                        .add_symbol(&name, self.sections.spc(), &section)?;
                }
            }

            match rest {
                Some(tail) => {
                    label = Some(name);
                    text = tail;
                    let split = split_first(&text);
                    first = split.0;
                    rest = split.1;
                }
                None => {
                    self.instructions.push(Instruction {
                        label: Some(name.clone()),
                        address: self.sections.spc(),
                        section: self.sections.current().to_string(),
                        raw_line: format!("{}:", name),
                        ..Default::default()
                    });
                    return Ok(());
                }
            }
        }

        let mut mnemonic = first.to_ascii_lowercase();

        if mnemonic == ".equ" || mnemonic == ".set" {
            let Some(name) = label else {
                // A value definition with no label is meaningless, skip it.
                return Ok(());
            };
            let Some(value_text) = rest else {
                return Err(Error::MissingValue(mnemonic));
            };
            let value = literal::resolve_with(&value_text, &self.symbols)?;
            if mnemonic == ".equ" {
                if self.symbols.contains(&name) {
                    return Err(Error::EquRedefined(name));
                }
                self.symbols.add_symbol(&name, value as u16, ".text")?;
            } else {
                self.symbols.add_or_update(&name, value as u16, ".text")?;
            }
            return Ok(());
        }

        // The colon-less form: `BUF_SIZE .equ 16`.
        if is_ident(&first) {
            if let Some(tail) = &rest {
                let (second, value_text) = split_first(tail);
                let directive = second.to_ascii_lowercase();
                if directive == ".equ" || directive == ".set" {
                    let value_text = value_text.unwrap_or_default();
                    let value = literal::resolve_with(&value_text, &self.symbols)?;
                    if directive == ".equ" {
                        if self.symbols.contains(&first) {
                            return Err(Error::EquRedefined(first));
                        }
                        self.symbols.add_symbol(&first, value as u16, ".text")?;
                    } else {
                        self.symbols.add_or_update(&first, value as u16, ".text")?;
                    }
                    return Ok(());
                }
            }
        }

        if mnemonic == ".ref" {
            let Some(tail) = rest else {
                return Err(Error::MissingValue(mnemonic));
            };
            for name in tail.split(',') {
                self.symbols.define(name.trim(), 0, Binding::Ref);
            }
            return Ok(());
        }

        if mnemonic == ".def" {
            let Some(tail) = rest else {
                return Err(Error::MissingValue(mnemonic));
            };
            for name in tail.split(',') {
                let name = name.trim();
                if self.symbols.contains(name) {
                    self.symbols.set_binding(name, Binding::Def);
                } else {
                    self.symbols.define(name, 0, Binding::Def);
                }
            }
            return Ok(());
        }

        if mnemonic == ".text" || mnemonic == ".data" || mnemonic == ".bss" {
            self.sections.set_active(&mnemonic);
            return Ok(());
        }

        if mnemonic == ".org" {
            let Some(tail) = rest else {
                return Err(Error::MissingValue(mnemonic));
            };
            let value = literal::resolve_with(tail.trim(), &self.symbols)?;
            let section = self.sections.current().to_string();
            self.sections.set_spc(&section, value as u16);
            return Ok(());
        }

        let mut byte_mode = false;
        if let Some(base) = mnemonic.strip_suffix(".b") {
            byte_mode = true;
            mnemonic = base.to_string();
        } else if let Some(base) = mnemonic.strip_suffix(".w") {
            mnemonic = base.to_string();
        }

        let format = if mnemonic.starts_with('.') {
            arch::op::Format::Directive
        } else {
            match op::lookup(&mnemonic) {
                Some(opcode) => opcode.format(),
                None => return Err(Error::UnknownMnemonic(mnemonic)),
            }
        };

        let inst = Instruction {
            label,
            mnemonic: Some(mnemonic.to_ascii_uppercase()),
            operands: rest,
            address: self.sections.spc(),
            format,
            byte_mode,
            section: self.sections.current().to_string(),
            raw_line: text,
            ..Default::default()
        };
        self.advance_spc(&inst)?;
        self.instructions.push(inst);
        Ok(())
    }

    /// Advance the active section's counter by the size the line will
    /// occupy once pass two encodes it.
    fn advance_spc(&mut self, inst: &Instruction) -> Result<(), Error> {
        let mnemonic = inst.mnemonic.as_deref().unwrap_or_default();
        let operands = inst.operands.as_deref().unwrap_or_default();
        let t = psudo::transform(mnemonic, operands, inst.format, inst.byte_mode);

        if t.mnemonic.starts_with('.') {
            match t.mnemonic.to_ascii_lowercase().as_str() {
                ".word" => self.sections.advance(2 * count_operands(&t.operands)),
                ".byte" => self.sections.advance(count_operands(&t.operands)),
                ".resw" => {
                    let count = literal::resolve_with(t.operands.trim(), &self.symbols)?;
                    self.sections.advance(2u16.wrapping_mul(count as u16));
                }
                ".space" => {
                    let count = literal::resolve_with(t.operands.trim(), &self.symbols)?;
                    self.sections.advance(count as u16);
                }
                ".string" => {
                    let quoted = t.operands.trim();
                    if quoted.len() >= 2 && quoted.starts_with('"') && quoted.ends_with('"') {
                        // Payload plus the null terminator.
                        self.sections.advance((quoted.len() - 2 + 1) as u16);
                    } else {
                        return Err(Error::InvalidString(quoted.to_string()));
                    }
                }
                ".float" => self.sections.advance(4),
                // .sect, .usect and friends occupy no space.
                _ => {}
            }
            return Ok(());
        }

        if t.operands.trim().is_empty() {
            self.sections.advance(2);
            return Ok(());
        }

        let mut size: u16 = 2;
        if matches!(t.format, arch::op::Format::Double | arch::op::Format::Single) {
            for operand in t.operands.split(',') {
                if self.requires_extra_word(operand.trim()) {
                    size += 2;
                }
            }
        }
        self.sections.advance(size);
        Ok(())
    }

    fn requires_extra_word(&self, operand: &str) -> bool {
        let mut operand = operand.trim();
        if operand.starts_with("##") {
            operand = &operand[1..];
        }

        if reg::is_register(operand) {
            return false;
        }
        if let Some(inner) = operand.strip_prefix('@') {
            let name = inner.strip_suffix('+').unwrap_or(inner);
            if reg::is_register(name) {
                return false;
            }
        }

        if let Some(imm) = operand.strip_prefix('#') {
            // Constant generator folding applies to literal immediates
            // only. A symbolic immediate keeps its extra word whether or
            // not its provisional value would fit, so the size computed
            // here matches the encoding and the word stays relocatable.
            return !matches!(literal::resolve(imm), Ok(0 | 1 | 2 | -1 | 4 | 8));
        }

        // Symbolic, absolute (&addr) and indexed x(Rn) operands all carry
        // an extra word.
        true
    }

}

fn split_first(line: &str) -> (String, Option<String>) {
    match line.split_once(char::is_whitespace) {
        Some((head, tail)) => {
            let tail = tail.trim_start();
            let tail = (!tail.is_empty()).then(|| tail.to_string());
            (head.to_string(), tail)
        }
        None => (line.to_string(), None),
    }
}

fn is_ident(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

fn count_operands(operands: &str) -> u16 {
    if operands.trim().is_empty() {
        return 0;
    }
    operands.split(',').count() as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_take_the_current_spc() {
        let out = PassOne::assemble_source(
            "start: MOV R4,R5\n\
             \tADD #100,R6\n\
             next:\n\
             \tNOP",
        )
        .unwrap();
        assert_eq!(out.symbols.address_of("start"), Some(0));
        // MOV R4,R5 is 2 bytes, ADD #100,R6 carries an extra word.
        assert_eq!(out.symbols.address_of("next"), Some(6));
        assert_eq!(out.instructions.len(), 4);
    }

    #[test]
    fn constant_generator_immediates_stay_one_word() {
        let out = PassOne::assemble_source(
            "\tMOV #4,R5\n\
             \tMOV #100,R5\n\
             end:",
        )
        .unwrap();
        assert_eq!(out.instructions[0].address, 0);
        assert_eq!(out.instructions[1].address, 2);
        assert_eq!(out.symbols.address_of("end"), Some(6));
    }

    #[test]
    fn ref_immediate_always_takes_an_extra_word() {
        let out = PassOne::assemble_source(
            "\t.ref puts\n\
             \tCALL #puts\n\
             after:",
        )
        .unwrap();
        assert_eq!(out.symbols.address_of("after"), Some(4));
    }

    #[test]
    fn sections_track_separately() {
        let out = PassOne::assemble_source(
            "\t.data\n\
             buf: .word 1,2,3\n\
             \t.text\n\
             \tNOP\n\
             \t.data\n\
             tail: .byte 7",
        )
        .unwrap();
        assert_eq!(out.symbols.get("buf").unwrap().section.as_deref(), Some(".data"));
        assert_eq!(out.symbols.address_of("buf"), Some(0));
        assert_eq!(out.symbols.address_of("tail"), Some(6));
    }

    #[test]
    fn equ_and_set_rules() {
        let out = PassOne::assemble_source(
            "BUF_SIZE .equ 16\n\
             TMP .set 1\n\
             TMP .set 2",
        )
        .unwrap();
        assert_eq!(out.symbols.address_of("BUF_SIZE"), Some(16));
        assert_eq!(out.symbols.address_of("TMP"), Some(2));

        let err = PassOne::assemble_source("X .equ 1\nX .equ 2").unwrap_err();
        assert!(matches!(err, Error::EquRedefined(_)));
    }

    #[test]
    fn duplicate_and_ref_labels_rejected() {
        let err = PassOne::assemble_source("a: NOP\na: NOP").unwrap_err();
        assert!(matches!(err, Error::DuplicateLabel(_)));

        let err = PassOne::assemble_source("\t.ref ext\next: NOP").unwrap_err();
        assert!(matches!(err, Error::RefRedefined(_)));
    }

    #[test]
    fn def_placeholder_filled_by_later_label() {
        let out = PassOne::assemble_source(
            "\t.def main\n\
             \tNOP\n\
             main: NOP",
        )
        .unwrap();
        let entry = out.symbols.get("main").unwrap();
        assert_eq!(entry.binding, Binding::Def);
        assert_eq!(entry.address, 2);
        assert!(entry.defined);
    }

    #[test]
    fn org_moves_the_counter() {
        let out = PassOne::assemble_source(
            "\t.org 0xF800\n\
             entry: NOP",
        )
        .unwrap();
        assert_eq!(out.symbols.address_of("entry"), Some(0xF800));
    }

    #[test]
    fn string_and_space_sizes() {
        let out = PassOne::assemble_source(
            "\t.data\n\
             msg: .string \"hi\"\n\
             pad: .space 5\n\
             end:",
        )
        .unwrap();
        assert_eq!(out.symbols.address_of("pad"), Some(3));
        assert_eq!(out.symbols.address_of("end"), Some(8));
    }

    #[test]
    fn unknown_mnemonic_rejected() {
        assert!(matches!(
            PassOne::assemble_source("\tHCF R1"),
            Err(Error::UnknownMnemonic(_))
        ));
    }
}
