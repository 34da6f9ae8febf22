use crate::error::Error;

/// A contiguous span of linked memory, one per output section.
#[derive(Debug, Clone)]
pub struct MemorySegment {
    pub name: String,
    pub origin: u16,
    pub data: Vec<u8>,
}

impl MemorySegment {
    pub fn new(name: &str, origin: u16, length: usize) -> Self {
        Self {
            name: name.to_string(),
            origin,
            data: vec![0; length],
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn write_byte(&mut self, offset: usize, value: u8) -> Result<(), Error> {
        let slot = self.data.get_mut(offset).ok_or(Error::SegmentBounds {
            segment: self.name.clone(),
            offset,
        })?;
        *slot = value;
        Ok(())
    }

    /// Little-endian word write.
    pub fn write_word(&mut self, offset: usize, value: u16) -> Result<(), Error> {
        self.write_byte(offset, (value & 0xFF) as u8)?;
        self.write_byte(offset + 1, (value >> 8) as u8)
    }

    /// 16 bytes per row with an ASCII gutter.
    pub fn hex_dump(&self) -> String {
        let mut out = String::new();
        for (row, chunk) in self.data.chunks(16).enumerate() {
            out.push_str(&format!("0x{:04X}: ", self.origin as usize + row * 16));
            for i in 0..16 {
                match chunk.get(i) {
                    Some(byte) => out.push_str(&format!("{:02X} ", byte)),
                    None => out.push_str("   "),
                }
            }
            out.push(' ');
            for byte in chunk {
                if (32..127).contains(byte) {
                    out.push(*byte as char);
                } else {
                    out.push('.');
                }
            }
            out.push('\n');
        }
        out
    }
}
