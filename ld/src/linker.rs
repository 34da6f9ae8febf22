//! Section placement and relocation patching.
//!
//! The link unit is a merged [`Module`]: every instruction and relocation
//! tagged with its source module. Placement works on chunks, the part of
//! one section contributed by one module. A chunk whose origin is nonzero
//! was fixed with `.org` and keeps its address; the relocatable chunks of
//! the same section follow it (or the section's default base) in module
//! name order. After placement every symbol has its final address and the
//! deferred patches can be applied.

use crate::error::Error;
use crate::segment::MemorySegment;
use color_print::cprintln;
use indexmap::IndexMap;
use obj::inst::Instruction;
use obj::reloc::{RelocationEntry, RelocationType};
use obj::symbol::{Binding, SymbolTable};
use obj::Module;

pub const DEFAULT_ORIGINS: &[(&str, u16)] = &[
    (".text", 0xF800),
    (".data", 0x2000),
    (".bss", 0x3000),
];

fn default_origin(section: &str) -> Option<u16> {
    DEFAULT_ORIGINS
        .iter()
        .find(|(name, _)| *name == section)
        .map(|(_, origin)| *origin)
}

fn section_rank(section: &str) -> usize {
    DEFAULT_ORIGINS
        .iter()
        .position(|(name, _)| *name == section)
        .unwrap_or(usize::MAX)
}

/// One module's share of one output section.
#[derive(Debug, Clone)]
pub struct SectionContribution {
    pub module: String,
    pub section: String,
    pub origin: u16,
    pub length: u32,
    pub final_address: u16,
}

struct Chunk {
    module: String,
    section: String,
    origin: u16,
    length: u32,
    final_address: u16,
    instructions: Vec<Instruction>,
    relocations: Vec<RelocationEntry>,
}

pub struct LinkOutput {
    pub instructions: Vec<Instruction>,
    pub symbols: SymbolTable,
    pub segments: IndexMap<String, MemorySegment>,
    pub contributions: Vec<SectionContribution>,
}

pub fn link(module: Module) -> Result<LinkOutput, Error> {
    let Module {
        instructions,
        symbols: merged_symbols,
        relocations,
    } = module;

    // Group instructions into (module, section) chunks, first-seen order.
    let mut chunks: Vec<Chunk> = Vec::new();
    let mut index: IndexMap<(String, String), usize> = IndexMap::new();
    for inst in instructions {
        let key = (
            inst.module.clone().unwrap_or_default(),
            inst.section.clone(),
        );
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            chunks.push(Chunk {
                module: key.0.clone(),
                section: key.1.clone(),
                origin: 0,
                length: 0,
                final_address: 0,
                instructions: Vec::new(),
                relocations: Vec::new(),
            });
            chunks.len() - 1
        });
        chunks[slot].instructions.push(inst);
    }

    // A relocation belongs to the chunk whose instruction covers its
    // fixup address, within the module that produced it.
    for rel in relocations {
        let module_name = rel.module.clone().unwrap_or_default();
        let owner = chunks
            .iter()
            .position(|c| {
                c.module == module_name
                    && c.instructions.iter().any(|i| i.contains(rel.address))
            });
        match owner {
            Some(slot) => chunks[slot].relocations.push(rel),
            None => cprintln!(
                "<yellow,bold>warn</>: no instruction covers relocation of `{}` at {:04X}",
                rel.symbol,
                rel.address
            ),
        }
    }

    for chunk in chunks.iter_mut() {
        let origin = chunk
            .instructions
            .iter()
            .map(|i| i.address)
            .min()
            .unwrap_or(0);
        let end = chunk
            .instructions
            .iter()
            .map(Instruction::end_address)
            .max()
            .unwrap_or(0);
        chunk.origin = origin;
        chunk.length = end.saturating_sub(origin as u32);
    }

    // Canonical section order: .text, .data, .bss, then first appearance.
    let mut section_order: Vec<String> = Vec::new();
    for chunk in &chunks {
        if !section_order.contains(&chunk.section) {
            section_order.push(chunk.section.clone());
        }
    }
    section_order.sort_by_key(|s| section_rank(s));

    let mut final_instructions: Vec<Instruction> = Vec::new();
    let mut final_symbols = SymbolTable::new();
    let mut final_relocations: Vec<RelocationEntry> = Vec::new();
    let mut contributions: Vec<SectionContribution> = Vec::new();
    let mut counters: IndexMap<String, u16> = IndexMap::new();

    for section in &section_order {
        let members: Vec<usize> = (0..chunks.len())
            .filter(|&i| chunks[i].section == *section)
            .collect();

        let absolute: Vec<usize> = members
            .iter()
            .copied()
            .filter(|&i| chunks[i].origin != 0)
            .collect();
        if absolute.len() > 1 {
            return Err(Error::MultipleOrigins(section.clone()));
        }

        let mut relocatable: Vec<usize> = members
            .iter()
            .copied()
            .filter(|&i| chunks[i].origin == 0)
            .collect();
        relocatable.sort_by(|&a, &b| chunks[a].module.cmp(&chunks[b].module));

        let mut cursor = match absolute.first() {
            Some(&slot) => {
                let base = chunks[slot].origin;
                place_chunk(
                    &mut chunks[slot],
                    base,
                    &merged_symbols,
                    &mut final_instructions,
                    &mut final_symbols,
                    &mut final_relocations,
                );
                base.wrapping_add(chunks[slot].length as u16)
            }
            None => *counters
                .entry(section.clone())
                .or_insert_with(|| default_origin(section).unwrap_or(0)),
        };

        for slot in relocatable {
            place_chunk(
                &mut chunks[slot],
                cursor,
                &merged_symbols,
                &mut final_instructions,
                &mut final_symbols,
                &mut final_relocations,
            );
            cursor = cursor.wrapping_add(chunks[slot].length as u16);
        }
        counters.insert(section.clone(), cursor);
    }

    for chunk in &chunks {
        contributions.push(SectionContribution {
            module: chunk.module.clone(),
            section: chunk.section.clone(),
            origin: chunk.origin,
            length: chunk.length,
            final_address: chunk.final_address,
        });
    }

    // Imports that stayed unresolved in this link unit still get an entry
    // so patching can report them by name.
    for entry in merged_symbols.values() {
        if entry.binding == Binding::Ref && !final_symbols.contains(&entry.name) {
            final_symbols.define(&entry.name, entry.address, entry.binding);
        }
    }

    patch(&mut final_instructions, &final_symbols, &final_relocations);

    final_instructions.sort_by_key(|i| i.address);
    let segments = build_segments(&section_order, &final_instructions)?;

    Ok(LinkOutput {
        instructions: final_instructions,
        symbols: final_symbols,
        segments,
        contributions,
    })
}

fn place_chunk(
    chunk: &mut Chunk,
    base: u16,
    merged_symbols: &SymbolTable,
    final_instructions: &mut Vec<Instruction>,
    final_symbols: &mut SymbolTable,
    final_relocations: &mut Vec<RelocationEntry>,
) {
    chunk.final_address = base;
    let offset = base.wrapping_sub(chunk.origin);

    for mut inst in chunk.instructions.drain(..) {
        inst.address = inst.address.wrapping_add(offset);
        final_instructions.push(inst);
    }

    for entry in merged_symbols.values() {
        if entry.module.as_deref() == Some(chunk.module.as_str())
            && entry.section.as_deref() == Some(chunk.section.as_str())
        {
            final_symbols.define(
                &entry.name,
                entry.address.wrapping_add(offset),
                entry.binding,
            );
        }
    }

    for rel in chunk.relocations.drain(..) {
        final_relocations.push(RelocationEntry::new(
            &rel.symbol,
            rel.address.wrapping_add(offset),
            rel.kind,
        ));
    }
}

fn patch(
    instructions: &mut [Instruction],
    symbols: &SymbolTable,
    relocations: &[RelocationEntry],
) {
    for rel in relocations {
        let Some(resolved) = symbols.address_of(&rel.symbol) else {
            cprintln!("<yellow,bold>warn</>: unresolved symbol `{}`", rel.symbol);
            continue;
        };
        let Some(inst) = instructions.iter_mut().find(|i| i.contains(rel.address)) else {
            cprintln!(
                "<yellow,bold>warn</>: no instruction at relocation address {:04X}",
                rel.address
            );
            continue;
        };

        match rel.kind {
            RelocationType::Absolute16Bit => {
                let first_extra = inst
                    .address
                    .wrapping_add(if inst.has_opcode() { 2 } else { 0 });
                let delta = rel.address as i32 - first_extra as i32;
                if delta < 0 || delta % 2 != 0 {
                    cprintln!(
                        "<yellow,bold>warn</>: relocation address {:04X} does not land on an extra word",
                        rel.address
                    );
                    continue;
                }
                let slot = (delta / 2) as usize;
                match inst.extra_words.get_mut(slot) {
                    Some(word) => *word = resolved,
                    None => cprintln!(
                        "<yellow,bold>warn</>: extra word index {} out of range at {:04X}",
                        slot,
                        rel.address
                    ),
                }
            }
            RelocationType::PcRelative10Bit => {
                let Some(code) = inst.machine_code else {
                    cprintln!(
                        "<yellow,bold>warn</>: jump relocation at {:04X} has no opcode word",
                        rel.address
                    );
                    continue;
                };
                let offset = (resolved as i32 - rel.address as i32 - 2) / 2;
                inst.machine_code = Some((code & 0xFC00) | ((offset as u16) & 0x03FF));
            }
        }
    }
}

fn build_segments(
    section_order: &[String],
    instructions: &[Instruction],
) -> Result<IndexMap<String, MemorySegment>, Error> {
    let mut segments = IndexMap::new();

    for section in section_order {
        let members: Vec<&Instruction> = instructions
            .iter()
            .filter(|i| &i.section == section)
            .collect();
        if members.is_empty() {
            continue;
        }

        let origin = members[0].address;
        let end = members
            .iter()
            .map(|i| i.end_address())
            .max()
            .unwrap_or(origin as u32);
        let length = end.saturating_sub(origin as u32) as usize;
        let mut segment = MemorySegment::new(section, origin, length);

        for inst in members {
            let mut offset = (inst.address.wrapping_sub(origin)) as usize;
            if let Some(code) = inst.machine_code.filter(|_| inst.has_opcode()) {
                segment.write_word(offset, code)?;
                offset += 2;
            }
            for word in &inst.extra_words {
                segment.write_word(offset, *word)?;
                offset += 2;
            }
            for byte in &inst.extra_bytes {
                segment.write_byte(offset, *byte)?;
                offset += 1;
            }
        }

        segments.insert(section.clone(), segment);
    }

    Ok(segments)
}
