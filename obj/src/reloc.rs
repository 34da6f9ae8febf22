use strum::{Display, EnumString};

/// How a resolved symbol address gets written back at link time.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum RelocationType {
    /// Overwrite a trailing extra word with the address verbatim.
    #[default]
    #[strum(serialize = "ABSOLUTE_16BIT")]
    Absolute16Bit,
    /// Re-encode the low 10 bits of the owning jump's opcode word with a
    /// signed word-granular displacement.
    #[strum(serialize = "PC_RELATIVE_10BIT")]
    PcRelative10Bit,
}

/// A deferred patch: write `symbol`'s final address at `address`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocationEntry {
    pub symbol: String,
    pub address: u16,
    pub kind: RelocationType,
    /// Source module, tagged when merging object files.
    pub module: Option<String>,
}

impl RelocationEntry {
    pub fn new(symbol: &str, address: u16, kind: RelocationType) -> Self {
        Self {
            symbol: symbol.to_string(),
            address,
            kind,
            module: None,
        }
    }
}
