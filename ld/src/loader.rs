//! Flat 64 KiB load image, the whole address space as erased flash.

use crate::segment::MemorySegment;
use color_print::cprintln;
use indexmap::IndexMap;

pub const MEMORY_SIZE: usize = 0x10000;

pub struct Loader {
    image: Vec<u8>,
}

impl Loader {
    /// Copy every segment into a fresh image pre-filled with 0xFF. A
    /// segment running past the end of the address space is skipped with
    /// a warning.
    pub fn new(segments: &IndexMap<String, MemorySegment>) -> Self {
        let mut image = vec![0xFF; MEMORY_SIZE];
        for segment in segments.values() {
            let origin = segment.origin as usize;
            if origin + segment.len() <= MEMORY_SIZE {
                image[origin..origin + segment.len()].copy_from_slice(&segment.data);
            } else {
                cprintln!(
                    "<yellow,bold>warn</>: segment `{}` at 0x{:04X} ({} bytes) overruns memory",
                    segment.name,
                    segment.origin,
                    segment.len()
                );
            }
        }
        Self { image }
    }

    pub fn image(&self) -> &[u8] {
        &self.image
    }
}
