use bimap::BiMap;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Canonical register names R0..R15, bidirectional with their numbers.
static REG_MAP: Lazy<BiMap<&'static str, u8>> = Lazy::new(|| {
    let mut map: BiMap<&'static str, u8> = BiMap::new();
    map.insert("R0", 0);
    map.insert("R1", 1);
    map.insert("R2", 2);
    map.insert("R3", 3);
    map.insert("R4", 4);
    map.insert("R5", 5);
    map.insert("R6", 6);
    map.insert("R7", 7);
    map.insert("R8", 8);
    map.insert("R9", 9);
    map.insert("R10", 10);
    map.insert("R11", 11);
    map.insert("R12", 12);
    map.insert("R13", 13);
    map.insert("R14", 14);
    map.insert("R15", 15);
    map
});

/// Conventional aliases for the first four registers.
static ALIAS_MAP: Lazy<HashMap<&'static str, u8>> = Lazy::new(|| {
    let mut map = HashMap::new();
    map.insert("PC", 0);
    map.insert("SP", 1);
    map.insert("SR", 2);
    map.insert("CG", 3);
    map
});

/// Register number for a name or alias, case insensitive.
pub fn number(s: &str) -> Option<u8> {
    let upper = s.trim().to_ascii_uppercase();
    if let Some(n) = REG_MAP.get_by_left(upper.as_str()) {
        return Some(*n);
    }
    ALIAS_MAP.get(upper.as_str()).copied()
}

pub fn is_register(s: &str) -> bool {
    number(s).is_some()
}

/// Canonical `Rn` name for a register number.
pub fn canonical(n: u8) -> Option<&'static str> {
    REG_MAP.get_by_right(&n).copied()
}
