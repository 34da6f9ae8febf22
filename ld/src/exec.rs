//! TI-TXT executable output.
//!
//! Each data-bearing span of a segment becomes an `@XXXX` block with up
//! to 16 hex bytes per line. A run of [`ZERO_GAP`] or more zero bytes
//! splits the segment into separate blocks so erased regions are not
//! written out. `.bss` carries no initialized data and is skipped. The
//! file ends with the `q` terminator.

use crate::error::Error;
use crate::segment::MemorySegment;
use indexmap::IndexMap;
use std::path::Path;

/// Consecutive zero bytes that end a data block.
pub const ZERO_GAP: usize = 16;

pub fn render(segments: &IndexMap<String, MemorySegment>) -> String {
    let mut out = String::new();

    for segment in segments.values() {
        if segment.name == ".bss" {
            continue;
        }
        let data = &segment.data;
        let mut i = 0;

        while i < data.len() {
            while i < data.len() && data[i] == 0 {
                i += 1;
            }
            if i >= data.len() {
                break;
            }
            let start = i;

            // The block runs to the last data byte before a long zero gap.
            let mut end = start;
            let mut zeros = 0;
            for j in start..data.len() {
                if data[j] == 0 {
                    zeros += 1;
                } else {
                    end = j;
                    zeros = 0;
                }
                if zeros >= ZERO_GAP {
                    break;
                }
            }

            out.push_str(&format!("@{:04X}\n", segment.origin as usize + start));
            for (count, k) in (start..=end).enumerate() {
                out.push_str(&format!("{:02X}", data[k]));
                if k == end {
                    out.push('\n');
                } else if (count + 1) % 16 == 0 {
                    out.push('\n');
                } else {
                    out.push(' ');
                }
            }

            i = end + 1;
        }
    }

    out.push_str("q\n");
    out
}

pub fn write(path: &Path, segments: &IndexMap<String, MemorySegment>) -> Result<(), Error> {
    std::fs::write(path, render(segments))
        .map_err(|e| Error::FileWrite(path.display().to_string(), e))
}
