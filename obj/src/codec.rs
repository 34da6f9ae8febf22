//! Object interchange codec.
//!
//! The document carries three ordered record lists (instructions, symbols,
//! relocations) with all numeric fields rendered as hex strings. The whole
//! document is parsed into typed structures up front; malformed hex or
//! unknown enum values reject the file with a descriptive error instead of
//! surfacing later inside the linker.

use crate::error::Error;
use crate::inst::Instruction;
use crate::reloc::{RelocationEntry, RelocationType};
use crate::symbol::{Binding, SymbolEntry, SymbolTable};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// One module's assembled output: the triple the interchange format carries.
#[derive(Debug, Default, Clone)]
pub struct Module {
    pub instructions: Vec<Instruction>,
    pub symbols: SymbolTable,
    pub relocations: Vec<RelocationEntry>,
}

#[derive(Serialize, Deserialize)]
struct ModuleDoc {
    instructions: Vec<InstDoc>,
    symbols: Vec<SymbolDoc>,
    relocations: Vec<RelocDoc>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstDoc {
    section: String,
    address: String,
    machine_code: String,
    extra_words: Vec<String>,
    extra_bytes: Vec<String>,
    raw_line: String,
}

#[derive(Serialize, Deserialize)]
struct SymbolDoc {
    name: String,
    address: String,
    binding: String,
    #[serde(default)]
    defined: bool,
    section: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct RelocDoc {
    symbol: String,
    address: String,
    /// Absent in legacy documents, defaulting to ABSOLUTE_16BIT.
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

fn parse_word(text: &str) -> Result<u16, Error> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u16::from_str_radix(digits, 16).map_err(|_| Error::InvalidHex(text.to_string()))
}

fn parse_byte(text: &str) -> Result<u8, Error> {
    let word = parse_word(text)?;
    u8::try_from(word).map_err(|_| Error::InvalidHex(text.to_string()))
}

fn word(value: u16) -> String {
    format!("0x{:04X}", value)
}

fn byte(value: u8) -> String {
    format!("0x{:02X}", value)
}

/// Serialize a module to the interchange text.
pub fn to_string(module: &Module) -> Result<String, Error> {
    let doc = ModuleDoc {
        instructions: module
            .instructions
            .iter()
            .map(|inst| InstDoc {
                section: inst.section.clone(),
                address: word(inst.address),
                machine_code: word(inst.machine_code.unwrap_or(0)),
                extra_words: inst.extra_words.iter().copied().map(word).collect(),
                extra_bytes: inst.extra_bytes.iter().copied().map(byte).collect(),
                raw_line: inst.raw_line.clone(),
            })
            .collect(),
        symbols: module
            .symbols
            .values()
            .map(|entry| SymbolDoc {
                name: entry.name.clone(),
                address: word(entry.address),
                binding: entry.binding.to_string(),
                defined: entry.defined,
                section: entry.section.clone(),
            })
            .collect(),
        relocations: module
            .relocations
            .iter()
            .map(|entry| RelocDoc {
                symbol: entry.symbol.clone(),
                address: word(entry.address),
                kind: Some(entry.kind.to_string()),
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// Parse the interchange text into a typed module.
pub fn from_str(text: &str) -> Result<Module, Error> {
    let doc: ModuleDoc = serde_json::from_str(text)?;

    let mut symbols = SymbolTable::new();
    for sym in doc.symbols {
        let binding = Binding::from_str(&sym.binding)
            .map_err(|_| Error::UnknownBinding(sym.binding.clone()))?;
        // Legacy writers emitted the literal string "null" for a missing
        // section.
        let section = sym.section.filter(|s| s != "null");
        symbols.insert(SymbolEntry {
            name: sym.name,
            address: parse_word(&sym.address)?,
            binding,
            defined: sym.defined,
            section,
            module: None,
        });
    }

    let mut instructions = Vec::with_capacity(doc.instructions.len());
    for inst in doc.instructions {
        let code = parse_word(&inst.machine_code)?;
        instructions.push(Instruction {
            section: inst.section,
            address: parse_word(&inst.address)?,
            machine_code: (code != 0).then_some(code),
            extra_words: inst
                .extra_words
                .iter()
                .map(|w| parse_word(w))
                .collect::<Result<_, _>>()?,
            extra_bytes: inst
                .extra_bytes
                .iter()
                .map(|b| parse_byte(b))
                .collect::<Result<_, _>>()?,
            raw_line: inst.raw_line,
            ..Default::default()
        });
    }

    let mut relocations = Vec::with_capacity(doc.relocations.len());
    for rel in doc.relocations {
        let kind = match rel.kind {
            Some(name) => RelocationType::from_str(&name)
                .map_err(|_| Error::UnknownRelocationType(name.clone()))?,
            None => RelocationType::default(),
        };
        relocations.push(RelocationEntry::new(&rel.symbol, parse_word(&rel.address)?, kind));
    }

    Ok(Module {
        instructions,
        symbols,
        relocations,
    })
}

pub fn write(path: &Path, module: &Module) -> Result<(), Error> {
    let text = to_string(module)?;
    std::fs::write(path, text).map_err(|e| Error::FileWrite(path.display().to_string(), e))
}

pub fn read(path: &Path) -> Result<Module, Error> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::FileRead(path.display().to_string(), e))?;
    from_str(&text)
}

/// Merge several modules into one link unit.
///
/// Instructions and relocations are concatenated, each tagged with its
/// source-module name. Symbol tables merge by label: a defined incoming
/// entry fills an undefined placeholder; two defined DEF entries for the
/// same label are a multiply-defined error.
pub fn merge(modules: Vec<(String, Module)>) -> Result<Module, Error> {
    let mut merged = Module::default();

    for (name, module) in modules {
        for mut inst in module.instructions {
            inst.module = Some(name.clone());
            merged.instructions.push(inst);
        }

        for mut entry in module.symbols.values().cloned() {
            entry.module = Some(name.clone());
            match merged.symbols.get_mut(&entry.name) {
                Some(existing) => {
                    if entry.defined
                        && existing.defined
                        && entry.binding == Binding::Def
                        && existing.binding == Binding::Def
                    {
                        return Err(Error::MultiplyDefined(entry.name));
                    }
                    if entry.defined && !existing.defined {
                        existing.address = entry.address;
                        existing.binding = entry.binding;
                        existing.section = entry.section;
                        existing.module = entry.module;
                        existing.defined = true;
                    }
                }
                None => merged.symbols.insert(entry),
            }
        }

        for mut rel in module.relocations {
            rel.module = Some(name.clone());
            merged.relocations.push(rel);
        }
    }

    Ok(merged)
}

/// Read and merge a set of object files, in the order given.
pub fn read_multiple(paths: &[String]) -> Result<Module, Error> {
    let mut modules = Vec::with_capacity(paths.len());
    for path in paths {
        let path = Path::new(path);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        modules.push((name, read(path)?));
    }
    merge(modules)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_module() -> Module {
        let mut symbols = SymbolTable::new();
        symbols.add_symbol("START", 0x0000, ".text").unwrap();
        symbols.define("PUTS", 0, Binding::Ref);

        Module {
            instructions: vec![
                Instruction {
                    section: ".text".into(),
                    address: 0x0000,
                    machine_code: Some(0x4225),
                    raw_line: "mov #4, R5".into(),
                    ..Default::default()
                },
                Instruction {
                    section: ".data".into(),
                    address: 0x0000,
                    extra_words: vec![1, 2, 3],
                    raw_line: ".word 1,2,3".into(),
                    ..Default::default()
                },
            ],
            symbols,
            relocations: vec![RelocationEntry::new(
                "PUTS",
                0x0002,
                RelocationType::Absolute16Bit,
            )],
        }
    }

    #[test]
    fn round_trip_is_idempotent() {
        let first = to_string(&sample_module()).unwrap();
        let reread = from_str(&first).unwrap();
        let second = to_string(&reread).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn zero_machine_code_reads_as_none() {
        let module = from_str(&to_string(&sample_module()).unwrap()).unwrap();
        assert_eq!(module.instructions[0].machine_code, Some(0x4225));
        assert_eq!(module.instructions[1].machine_code, None);
        assert_eq!(module.instructions[1].extra_words, vec![1, 2, 3]);
    }

    #[test]
    fn legacy_defaults_for_optional_fields() {
        let text = r#"{
            "instructions": [],
            "symbols": [
                {"name":"X","address":"0x0010","binding":"DEF","section":null}
            ],
            "relocations": [
                {"symbol":"X","address":"0x0004"}
            ]
        }"#;
        let module = from_str(text).unwrap();
        assert!(!module.symbols.get("X").unwrap().defined);
        assert_eq!(module.relocations[0].kind, RelocationType::Absolute16Bit);
    }

    #[test]
    fn malformed_hex_is_rejected() {
        let text = r#"{
            "instructions": [
                {"section":".text","address":"0xZZZZ","machineCode":"0x0000",
                 "extraWords":[],"extraBytes":[],"rawLine":""}
            ],
            "symbols": [],
            "relocations": []
        }"#;
        assert!(matches!(from_str(text), Err(Error::InvalidHex(_))));
    }

    #[test]
    fn merge_fills_ref_placeholder_from_def() {
        let mut a = Module::default();
        a.symbols.define("FOO", 0, Binding::Ref);

        let mut b = Module::default();
        b.symbols.define("FOO", 0, Binding::Def);
        b.symbols.add_or_update("FOO", 0x0042, ".text").unwrap();

        let merged = merge(vec![("a.obj".into(), a), ("b.obj".into(), b)]).unwrap();
        let entry = merged.symbols.get("FOO").unwrap();
        assert_eq!(entry.address, 0x0042);
        assert_eq!(entry.binding, Binding::Def);
        assert_eq!(entry.module.as_deref(), Some("b.obj"));
        assert!(entry.defined);
    }

    #[test]
    fn merge_rejects_two_defined_defs() {
        let mut a = Module::default();
        a.symbols.define("X", 0, Binding::Def);
        a.symbols.add_or_update("X", 0x10, ".text").unwrap();

        let mut b = Module::default();
        b.symbols.define("X", 0, Binding::Def);
        b.symbols.add_or_update("X", 0x20, ".text").unwrap();

        assert!(matches!(
            merge(vec![("a.obj".into(), a), ("b.obj".into(), b)]),
            Err(Error::MultiplyDefined(_))
        ));
    }
}
