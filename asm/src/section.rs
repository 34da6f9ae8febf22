use indexmap::IndexMap;

/// Per-section program counter, one counter for each section seen so far.
///
/// `.text`, `.data` and `.bss` are pre-seeded; any other name switched to
/// gets its own counter starting at zero. Pass one interleaves sections
/// freely and each keeps its place.
#[derive(Debug)]
pub struct SectionTracker {
    spc: IndexMap<String, u16>,
    current: String,
}

impl SectionTracker {
    pub fn new() -> Self {
        let mut spc = IndexMap::new();
        spc.insert(".text".to_string(), 0);
        spc.insert(".data".to_string(), 0);
        spc.insert(".bss".to_string(), 0);
        Self {
            spc,
            current: ".text".to_string(),
        }
    }

    pub fn set_active(&mut self, section: &str) {
        self.spc.entry(section.to_string()).or_insert(0);
        self.current = section.to_string();
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    /// Program counter of the active section.
    pub fn spc(&self) -> u16 {
        self.spc.get(&self.current).copied().unwrap_or(0)
    }

    pub fn advance(&mut self, amount: u16) {
        if let Some(counter) = self.spc.get_mut(&self.current) {
            *counter = counter.wrapping_add(amount);
        }
    }

    pub fn set_spc(&mut self, section: &str, value: u16) {
        self.spc.insert(section.to_string(), value);
    }
}

impl Default for SectionTracker {
    fn default() -> Self {
        Self::new()
    }
}
