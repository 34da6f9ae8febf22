//! Link map report: where each section and contribution landed, plus the
//! exported symbols.

use crate::error::Error;
use crate::linker::LinkOutput;
use obj::symbol::Binding;
use std::path::Path;

pub fn render(output_name: &str, link: &LinkOutput) -> String {
    let mut out = String::new();
    let rule = "*".repeat(78);
    out.push_str(&format!("{}\n", rule));
    out.push_str("*                             MSP430 LINKER MAP FILE                         *\n");
    out.push_str(&format!("{}\n\n", rule));

    out.push_str(&format!("OUTPUT FILE NAME: <{}>\n\n", output_name));

    out.push_str("SECTION ALLOCATION MAP\n\n");
    out.push_str("output                                  attributes/\n");
    out.push_str("section   page    origin      length      input sections\n");
    out.push_str("--------  ----  ----------  ----------  --------------------\n");

    let mut contributions = link.contributions.clone();
    contributions.sort_by(|a, b| {
        a.section
            .cmp(&b.section)
            .then_with(|| a.module.cmp(&b.module))
    });

    let mut current_section = "";
    for contrib in &contributions {
        if contrib.section != current_section {
            current_section = &contrib.section;
            if let Some(segment) = link.segments.get(current_section) {
                out.push_str(&format!(
                    "{:<8}  {:>4}  0x{:08X}  0x{:08X}\n",
                    segment.name,
                    0,
                    segment.origin,
                    segment.len()
                ));
            }
        }
        out.push_str(&format!(
            "{:16}0x{:08X}  0x{:08X}  {} ({})\n",
            "", contrib.final_address, contrib.length, contrib.module, contrib.section
        ));
    }
    out.push_str("\n\n");

    out.push_str("GLOBAL SYMBOLS\n\n");
    out.push_str("address     name\n");
    out.push_str("----------  --------------------\n");

    let mut symbols: Vec<_> = link
        .symbols
        .values()
        .filter(|s| s.binding == Binding::Def)
        .collect();
    symbols.sort_by_key(|s| s.address);

    for symbol in &symbols {
        out.push_str(&format!("0x{:08X}  {}\n", symbol.address, symbol.name));
    }
    out.push_str(&format!("\n[{} symbols]\n", symbols.len()));

    out
}

pub fn write(path: &Path, output_name: &str, link: &LinkOutput) -> Result<(), Error> {
    std::fs::write(path, render(output_name, link))
        .map_err(|e| Error::FileWrite(path.display().to_string(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linker::link;
    use obj::inst::Instruction;
    use obj::symbol::{Binding, SymbolTable};
    use obj::Module;

    #[test]
    fn map_lists_sections_and_def_symbols() {
        let mut symbols = SymbolTable::new();
        symbols.add_symbol("main", 0, ".text").unwrap();
        if let Some(entry) = symbols.get_mut("main") {
            entry.binding = Binding::Def;
            entry.module = Some("a.obj".to_string());
        }

        let module = Module {
            instructions: vec![Instruction {
                address: 0,
                machine_code: Some(0x4303),
                section: ".text".to_string(),
                module: Some("a.obj".to_string()),
                ..Default::default()
            }],
            symbols,
            relocations: vec![],
        };
        let out = link(module).unwrap();
        let text = render("linked.txt", &out);

        assert!(text.contains("OUTPUT FILE NAME: <linked.txt>"));
        assert!(text.contains(".text"));
        assert!(text.contains("a.obj (.text)"));
        assert!(text.contains("0x0000F800  main"));
        assert!(text.contains("[1 symbols]"));
    }
}
