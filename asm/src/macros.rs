//! Macro expansion, the step before pass one.
//!
//! `NAME .macro P1,P2` ... `.endm` defines a macro; invoking it substitutes
//! arguments for parameters on whole-word boundaries. A `label?` inside a
//! body becomes `label_<n>` with a counter unique to each expansion, so a
//! macro used twice does not collide with itself. `.mlib "file"` loads
//! macro definitions from a library file without emitting its other lines.

use crate::error::Error;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Macro {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<String>,
}

#[derive(Debug, Default)]
pub struct MacroExpander {
    macros: HashMap<String, Macro>,
    counter: u32,
}

impl MacroExpander {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expand a source file into flat assembly text.
    pub fn expand_file(&mut self, path: &Path) -> Result<String, Error> {
        let text = fs::read_to_string(path)
            .map_err(|e| Error::FileRead(path.display().to_string(), e))?;
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let expanded = self.process(&lines, base_dir)?;
        Ok(expanded.join("\n"))
    }

    fn process(&mut self, lines: &[String], base_dir: &Path) -> Result<Vec<String>, Error> {
        let mut out = Vec::new();
        let mut defining: Option<Macro> = None;

        for line in lines {
            let trimmed = line.trim();

            if defining.is_some() {
                if trimmed.eq_ignore_ascii_case(".endm") {
                    if let Some(def) = defining.take() {
                        self.macros.insert(def.name.to_ascii_lowercase(), def);
                    }
                } else if let Some(def) = defining.as_mut() {
                    // Keep the original indentation inside the body.
                    def.body.push(line.clone());
                }
                continue;
            }

            let effective = line.split(';').next().unwrap_or("").trim();
            if effective.is_empty() {
                out.push(line.clone());
                continue;
            }

            let mut words = effective.split_whitespace();
            let first = words.next().unwrap_or("");
            let second = words.next().unwrap_or("");

            if second.eq_ignore_ascii_case(".macro") {
                let after = effective[first.len()..].trim_start();
                let param_text = after[second.len()..].trim();
                let params = if param_text.is_empty() {
                    Vec::new()
                } else {
                    param_text.split(',').map(|p| p.trim().to_string()).collect()
                };
                defining = Some(Macro {
                    name: first.to_string(),
                    params,
                    body: Vec::new(),
                });
            } else if first.eq_ignore_ascii_case(".mlib") {
                let lib = effective[first.len()..].trim().replace('"', "");
                let mut lib_path = PathBuf::from(&lib);
                if lib_path.is_relative() {
                    lib_path = base_dir.join(lib_path);
                }
                let text = fs::read_to_string(&lib_path)
                    .map_err(|e| Error::FileRead(lib_path.display().to_string(), e))?;
                let lib_lines: Vec<String> = text.lines().map(str::to_string).collect();
                let lib_base = lib_path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."));
                // Registers the library's macros; its expanded text is not
                // emitted into the including file.
                self.process(&lib_lines, &lib_base)?;
            } else if let Some(mac) = self.macros.get(&first.to_ascii_lowercase()).cloned() {
                let arg_text = effective[first.len()..].trim();
                let args: Vec<&str> = if arg_text.is_empty() {
                    Vec::new()
                } else {
                    arg_text.split(',').map(str::trim).collect()
                };
                if mac.params.len() != args.len() {
                    return Err(Error::MacroArity {
                        name: mac.name,
                        expected: mac.params.len(),
                        given: args.len(),
                    });
                }

                self.counter += 1;
                for body_line in &mac.body {
                    let mut expanded = body_line.clone();
                    for (param, arg) in mac.params.iter().zip(&args) {
                        expanded = substitute_word(&expanded, param, arg);
                    }
                    expanded = number_local_labels(&expanded, self.counter);
                    out.push(expanded);
                }
            } else {
                out.push(line.clone());
            }
        }

        if let Some(def) = defining {
            return Err(Error::UnterminatedMacro(def.name));
        }
        Ok(out)
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Replace `from` with `to` on whole-word boundaries only, so a parameter
/// named `a` leaves `DADD` alone.
fn substitute_word(line: &str, from: &str, to: &str) -> String {
    if from.is_empty() {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len());
    let mut i = 0;
    while i < line.len() {
        if line[i..].starts_with(from) {
            let end = i + from.len();
            let before_ok = !line[..i].chars().next_back().map_or(false, is_word_char);
            let after_ok = !line[end..].chars().next().map_or(false, is_word_char);
            if before_ok && after_ok {
                out.push_str(to);
                i = end;
                continue;
            }
        }
        let mut next = i + 1;
        while next < line.len() && !line.is_char_boundary(next) {
            next += 1;
        }
        out.push_str(&line[i..next]);
        i = next;
    }
    out
}

/// Rewrite each `word?` into `word_<counter>`.
fn number_local_labels(line: &str, counter: u32) -> String {
    let mut out = String::with_capacity(line.len());
    let mut word = String::new();
    for c in line.chars() {
        if is_word_char(c) {
            word.push(c);
        } else if c == '?' && !word.is_empty() {
            out.push_str(&word);
            out.push('_');
            out.push_str(&counter.to_string());
            word.clear();
        } else {
            out.push_str(&word);
            word.clear();
            out.push(c);
        }
    }
    out.push_str(&word);
    out
}
