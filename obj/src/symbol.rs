use crate::error::Error;
use indexmap::IndexMap;
use strum::{Display, EnumString};

/// Cross-module visibility of a symbol.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum Binding {
    /// Module-private label.
    #[default]
    #[strum(serialize = "LOCAL")]
    Local,
    /// Exported via `.def`.
    #[strum(serialize = "DEF")]
    Def,
    /// Imported via `.ref`, unresolved until link time.
    #[strum(serialize = "REF")]
    Ref,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    pub name: String,
    pub address: u16,
    pub binding: Binding,
    /// True once a label occurrence (or `.equ`/`.set`) fixed the address.
    pub defined: bool,
    pub section: Option<String>,
    pub module: Option<String>,
}

/// Label table with deterministic iteration order.
#[derive(Debug, Default, Clone)]
pub struct SymbolTable(IndexMap<String, SymbolEntry>);

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a plain label. Duplicates are an error.
    pub fn add_symbol(&mut self, name: &str, address: u16, section: &str) -> Result<(), Error> {
        if self.0.contains_key(name) {
            return Err(Error::DuplicateSymbol(name.to_string()));
        }
        self.0.insert(
            name.to_string(),
            SymbolEntry {
                name: name.to_string(),
                address,
                binding: Binding::Local,
                defined: true,
                section: Some(section.to_string()),
                module: None,
            },
        );
        Ok(())
    }

    /// Create (or replace) a binding placeholder for `.ref`/`.def`.
    ///
    /// The entry is not "defined"; a later label occurrence fills in the
    /// real address without touching the binding.
    pub fn define(&mut self, name: &str, address: u16, binding: Binding) {
        self.0.insert(
            name.to_string(),
            SymbolEntry {
                name: name.to_string(),
                address,
                binding,
                defined: false,
                section: None,
                module: None,
            },
        );
    }

    /// Fill in a forward reference or add a fresh local label (`.set` allows
    /// updating in place).
    pub fn add_or_update(&mut self, name: &str, address: u16, section: &str) -> Result<(), Error> {
        if let Some(entry) = self.0.get_mut(name) {
            entry.address = address;
            entry.section = Some(section.to_string());
            entry.defined = true;
            Ok(())
        } else {
            self.add_symbol(name, address, section)
        }
    }

    pub fn set_binding(&mut self, name: &str, binding: Binding) {
        if let Some(entry) = self.0.get_mut(name) {
            entry.binding = binding;
        }
    }

    /// Insert a fully populated entry, replacing any existing one.
    pub fn insert(&mut self, entry: SymbolEntry) {
        self.0.insert(entry.name.clone(), entry);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn address_of(&self, name: &str) -> Option<u16> {
        self.0.get(name).map(|e| e.address)
    }

    pub fn get(&self, name: &str) -> Option<&SymbolEntry> {
        self.0.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut SymbolEntry> {
        self.0.get_mut(name)
    }

    pub fn values(&self) -> impl Iterator<Item = &SymbolEntry> {
        self.0.values()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
