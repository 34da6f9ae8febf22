//! Pass two: encode machine words, record relocations, build the listing.
//!
//! Consumes the pass one output and fills in each instruction's machine
//! code and trailing words. Any operand naming a known symbol gets a
//! relocation entry so the linker can rewrite it after placement. A line
//! that fails to encode degrades to an ERROR row in the listing; the rest
//! of the module still assembles.

use crate::error::Error;
use crate::literal;
use crate::pass1::Pass1Output;
use arch::op::{self, Format, Opcode};
use arch::{psudo, reg};
use obj::inst::Instruction;
use obj::reloc::{RelocationEntry, RelocationType};
use obj::symbol::{Binding, SymbolTable};

pub struct Pass2Output {
    pub instructions: Vec<Instruction>,
    pub symbols: SymbolTable,
    pub relocations: Vec<RelocationEntry>,
    pub listing: String,
}

impl Pass2Output {
    pub fn into_module(self) -> obj::Module {
        obj::Module {
            instructions: self.instructions,
            symbols: self.symbols,
            relocations: self.relocations,
        }
    }
}

struct OperandInfo {
    reg: u8,
    mode: u8,
    /// Trailing word this operand needs, before relocation.
    extra: Option<i32>,
}

impl OperandInfo {
    fn plain(reg: u8, mode: u8) -> Self {
        Self {
            reg,
            mode,
            extra: None,
        }
    }
}

pub struct PassTwo {
    symbols: SymbolTable,
    relocations: Vec<RelocationEntry>,
    listing: String,
    line: usize,
}

impl PassTwo {
    pub fn assemble(input: Pass1Output) -> Pass2Output {
        let mut pass = PassTwo {
            symbols: input.symbols,
            relocations: Vec::new(),
            listing: String::new(),
            line: 0,
        };
        pass.listing.push_str(&format!(
            "{:<5} {:<6} {:<8} {}\n",
            "Line", "SPC", "Code", "Assembly"
        ));
        pass.listing
            .push_str("----- ------ -------- ------------------------\n");

        let mut instructions = input.instructions;
        for inst in instructions.iter_mut() {
            pass.encode(inst);
        }

        Pass2Output {
            instructions,
            symbols: pass.symbols,
            relocations: pass.relocations,
            listing: pass.listing,
        }
    }

    fn encode(&mut self, inst: &mut Instruction) {
        // Bare labels occupy no space and no listing row.
        let Some(mnemonic) = inst.mnemonic.clone() else {
            return;
        };
        let operands = inst.operands.clone().unwrap_or_default();
        let t = psudo::transform(&mnemonic, &operands, inst.format, inst.byte_mode);
        let addr = inst.address;

        if t.mnemonic.starts_with('.') {
            self.encode_directive(inst, &t.mnemonic, &t.operands, addr);
            return;
        }

        let code = match self.machine_code(inst.address, &t) {
            Ok(code) => code,
            Err(e) => {
                self.error_row(addr, &e.to_string());
                return;
            }
        };
        inst.machine_code = Some(code);
        let n = self.next_line();
        self.listing.push_str(&format!(
            "{:<5} {:04X}   {:04X}     {}\n",
            n, addr, code, inst.raw_line
        ));

        let mut next_addr = addr.wrapping_add(2);
        match t.format {
            Format::Double => {
                let ops: Vec<&str> = t.operands.split(',').collect();
                if ops.len() != 2 {
                    return;
                }
                if let (Ok(src), Ok(dst)) = (
                    self.parse_operand(ops[0].trim()),
                    self.parse_operand(ops[1].trim()),
                ) {
                    for (operand, info) in [(ops[0], src), (ops[1], dst)] {
                        if let Some(extra) = info.extra {
                            self.extra_word_row(inst, next_addr, extra);
                            if let Some(symbol) = self.symbol_in_operand(operand.trim()) {
                                self.relocations.push(RelocationEntry::new(
                                    &symbol,
                                    next_addr,
                                    RelocationType::Absolute16Bit,
                                ));
                            }
                            next_addr = next_addr.wrapping_add(2);
                        }
                    }
                }
            }
            Format::Single => {
                let operand = t.operands.trim();
                if operand.is_empty() {
                    return;
                }
                if let Ok(info) = self.parse_operand(operand) {
                    if let Some(extra) = info.extra {
                        self.extra_word_row(inst, next_addr, extra);
                        if let Some(symbol) = self.symbol_in_operand(operand) {
                            self.relocations.push(RelocationEntry::new(
                                &symbol,
                                next_addr,
                                RelocationType::Absolute16Bit,
                            ));
                        }
                    }
                }
            }
            Format::Jump => {
                // The displacement sits inside the opcode word itself, so
                // the fixup points at the instruction's own address.
                if let Some(symbol) = self.symbol_in_operand(t.operands.trim()) {
                    self.relocations.push(RelocationEntry::new(
                        &symbol,
                        addr,
                        RelocationType::PcRelative10Bit,
                    ));
                }
            }
            Format::Directive => {}
        }
    }

    fn encode_directive(&mut self, inst: &mut Instruction, mnemonic: &str, operands: &str, addr: u16) {
        let name = mnemonic.to_ascii_lowercase();
        match name.as_str() {
            // Pure bookkeeping, no listing row.
            ".usect" | ".sect" => {}

            ".space" => match literal::resolve_with(operands.trim(), &self.symbols) {
                Ok(size) => {
                    let n = self.next_line();
                    self.listing.push_str(&format!(
                        "{:<5} {:04X}            (space {} bytes)\n",
                        n, addr, size
                    ));
                }
                Err(e) => self.error_row(addr, &e.to_string()),
            },

            ".string" => {
                let quoted = operands.trim();
                if quoted.len() >= 2 && quoted.starts_with('"') && quoted.ends_with('"') {
                    let mut addr = addr;
                    for c in quoted[1..quoted.len() - 1].chars() {
                        let n = self.next_line();
                        self.listing.push_str(&format!(
                            "{:<5} {:04X}   {:02X}       '{}'\n",
                            n, addr, c as u32 as u8, c
                        ));
                        inst.extra_bytes.push(c as u32 as u8);
                        addr = addr.wrapping_add(1);
                    }
                    let n = self.next_line();
                    self.listing.push_str(&format!(
                        "{:<5} {:04X}   {:02X}       '\\0'\n",
                        n, addr, 0
                    ));
                    inst.extra_bytes.push(0);
                } else {
                    self.error_row(addr, "invalid .string literal");
                }
            }

            ".float" => {
                let text = operands.trim();
                let value = match self.symbols.address_of(text) {
                    Some(address) => Ok(address as f32),
                    None => text
                        .parse::<f32>()
                        .map_err(|_| Error::InvalidLiteral(text.to_string())),
                };
                match value {
                    Ok(value) => {
                        let bits = value.to_bits();
                        let mut addr = addr;
                        for i in 0..4 {
                            let byte = ((bits >> (i * 8)) & 0xFF) as u8;
                            let n = self.next_line();
                            self.listing
                                .push_str(&format!("{:<5} {:04X}   {:02X}\n", n, addr, byte));
                            inst.extra_bytes.push(byte);
                            addr = addr.wrapping_add(1);
                        }
                    }
                    Err(e) => self.error_row(addr, &e.to_string()),
                }
            }

            ".word" => {
                let mut addr = addr;
                for value in operands.split(',') {
                    match literal::resolve_with(value.trim(), &self.symbols) {
                        Ok(word) => {
                            let word = (word & 0xFFFF) as u16;
                            let n = self.next_line();
                            self.listing
                                .push_str(&format!("{:<5} {:04X}   {:04X}\n", n, addr, word));
                            inst.extra_words.push(word);
                            addr = addr.wrapping_add(2);
                        }
                        Err(e) => {
                            self.error_row(addr, &e.to_string());
                            break;
                        }
                    }
                }
            }

            ".byte" => {
                let mut addr = addr;
                for value in operands.split(',') {
                    match literal::resolve_with(value.trim(), &self.symbols) {
                        Ok(byte) => {
                            let byte = (byte & 0xFF) as u8;
                            let n = self.next_line();
                            self.listing
                                .push_str(&format!("{:<5} {:04X}   {:02X}\n", n, addr, byte));
                            inst.extra_bytes.push(byte);
                            addr = addr.wrapping_add(1);
                        }
                        Err(e) => {
                            self.error_row(addr, &e.to_string());
                            break;
                        }
                    }
                }
            }

            ".resw" => match literal::resolve_with(operands.trim(), &self.symbols) {
                Ok(count) => {
                    let mut addr = addr;
                    for _ in 0..count.max(0) {
                        let n = self.next_line();
                        self.listing
                            .push_str(&format!("{:<5} {:04X}   0000\n", n, addr));
                        addr = addr.wrapping_add(2);
                    }
                }
                Err(e) => self.error_row(addr, &e.to_string()),
            },

            _ => {
                let n = self.next_line();
                self.listing.push_str(&format!(
                    "{:<5} {:04X}            {} {}\n",
                    n, addr, mnemonic, operands
                ));
            }
        }
    }

    fn machine_code(&self, addr: u16, t: &psudo::Transformed) -> Result<u16, Error> {
        if t.mnemonic == "NOP" {
            return Ok(0x4303);
        }
        if t.mnemonic == "RETI" && t.operands.trim().is_empty() {
            return Ok(0x1300);
        }

        let opcode = op::lookup(&t.mnemonic)
            .ok_or_else(|| Error::UnknownMnemonic(t.mnemonic.clone()))?;
        let bw: u16 = if t.byte_mode { 1 } else { 0 };

        match opcode {
            Opcode::Double(bits) => {
                let ops: Vec<&str> = t.operands.split(',').collect();
                if ops.len() != 2 {
                    return Err(Error::OperandCount(t.mnemonic.clone()));
                }
                let src = self.parse_operand(ops[0].trim())?;
                let dst = self.parse_operand(ops[1].trim())?;
                Ok((bits << 12)
                    | ((src.reg as u16) << 8)
                    | ((dst.mode as u16) << 7)
                    | (bw << 6)
                    | ((src.mode as u16) << 4)
                    | dst.reg as u16)
            }
            Opcode::Single(bits) => {
                let operand = self.parse_operand(t.operands.trim())?;
                Ok((bits << 7) | ((operand.mode as u16) << 4) | operand.reg as u16)
            }
            Opcode::Jump(bits) => {
                let offset = self.jump_offset(t.operands.trim(), addr)?;
                Ok((bits << 10) | ((offset as u16) & 0x03FF))
            }
            Opcode::Fixed(word) => Ok(word),
        }
    }

    fn jump_offset(&self, label: &str, addr: u16) -> Result<i32, Error> {
        // Imported targets encode as zero; the linker rewrites the word.
        if self.is_ref_symbol(label) {
            return Ok(0);
        }
        let target = self
            .symbols
            .address_of(label)
            .ok_or_else(|| Error::UnknownSymbol(label.to_string()))?;
        Ok((target as i32 - addr as i32 - 2) / 2)
    }

    fn parse_operand(&self, operand: &str) -> Result<OperandInfo, Error> {
        let mut operand = operand.trim();
        // Macro substitution can stack an extra `#`.
        if operand.starts_with("##") {
            operand = &operand[1..];
        }

        if let Some(n) = reg::number(operand) {
            return Ok(OperandInfo::plain(n, 0));
        }

        if let Some(inner) = operand.strip_prefix('@') {
            let (name, mode) = match inner.strip_suffix('+') {
                Some(name) => (name, 3),
                None => (inner, 2),
            };
            let n = reg::number(name)
                .ok_or_else(|| Error::InvalidOperand(operand.to_string()))?;
            return Ok(OperandInfo::plain(n, mode));
        }

        if let Some(imm) = operand.strip_prefix('#') {
            if self.is_ref_symbol(imm) {
                return Ok(OperandInfo {
                    reg: 0,
                    mode: 3,
                    extra: Some(0),
                });
            }
            // Only literal immediates fold into the constant generator;
            // symbolic ones keep the extra word pass one sized for, so
            // the linker can rewrite it.
            if let Ok(value) = literal::resolve(imm) {
                return Ok(match value {
                    0 => OperandInfo::plain(3, 0),
                    1 => OperandInfo::plain(3, 1),
                    2 => OperandInfo::plain(3, 2),
                    -1 => OperandInfo::plain(3, 3),
                    4 => OperandInfo::plain(2, 2),
                    8 => OperandInfo::plain(2, 3),
                    // Immediate as @PC+ with the value in the next word.
                    _ => OperandInfo {
                        reg: 0,
                        mode: 3,
                        extra: Some(value),
                    },
                });
            }
            let value = literal::resolve_with(imm, &self.symbols)?;
            return Ok(OperandInfo {
                reg: 0,
                mode: 3,
                extra: Some(value),
            });
        }

        if operand.contains('(') && operand.ends_with(')') {
            if let Some(open) = operand.find('(') {
                let name = &operand[open + 1..operand.len() - 1];
                if let Some(n) = reg::number(name) {
                    let offset = literal::resolve_with(operand[..open].trim(), &self.symbols)?;
                    return Ok(OperandInfo {
                        reg: n,
                        mode: 1,
                        extra: Some(offset),
                    });
                }
            }
        }

        if let Some(rest) = operand.strip_prefix('&') {
            let address = literal::resolve_with(rest, &self.symbols)?;
            return Ok(OperandInfo {
                reg: 2,
                mode: 1,
                extra: Some(address),
            });
        }

        // Symbolic addressing, PC-relative with the address in the next word.
        let value = literal::resolve_with(operand, &self.symbols)?;
        Ok(OperandInfo {
            reg: 0,
            mode: 1,
            extra: Some(value),
        })
    }

    /// The symbol an operand names, if the operand is a plain symbol
    /// reference the linker could rewrite.
    fn symbol_in_operand(&self, operand: &str) -> Option<String> {
        let mut operand = operand.trim();
        if operand.starts_with("##") {
            operand = &operand[1..];
        }
        let is_numeric = |s: &str| s.parse::<i32>().is_ok();

        if let Some(rest) = operand.strip_prefix(['#', '&']) {
            return (self.symbols.contains(rest) && !is_numeric(rest)).then(|| rest.to_string());
        }

        if operand.contains('(') && operand.ends_with(')') {
            let name = operand.split('(').next().unwrap_or("").trim();
            return (self.symbols.contains(name) && !is_numeric(name)).then(|| name.to_string());
        }

        (self.symbols.contains(operand) && !is_numeric(operand)).then(|| operand.to_string())
    }

    fn is_ref_symbol(&self, name: &str) -> bool {
        self.symbols
            .get(name.trim())
            .map_or(false, |entry| entry.binding == Binding::Ref)
    }

    fn extra_word_row(&mut self, inst: &mut Instruction, addr: u16, value: i32) {
        let word = (value & 0xFFFF) as u16;
        let n = self.next_line();
        self.listing
            .push_str(&format!("{:<5} {:04X}   {:04X}\n", n, addr, word));
        inst.extra_words.push(word);
    }

    fn error_row(&mut self, addr: u16, message: &str) {
        let n = self.next_line();
        self.listing
            .push_str(&format!("{:<5} {:04X}   ERROR    {}\n", n, addr, message));
    }

    fn next_line(&mut self) -> usize {
        let n = self.line;
        self.line += 1;
        n
    }
}
