use crate::cursor::{Reader, Writer};
use crate::error::Result;
use serde::Serialize;

pub const ENTRY_SIZE: usize = 16;

/// One record per object-typed field, in pre-order. `parent_index` is a
/// meta1 index (-1 for the root object); `meta2_entry_index` points back at
/// the field's meta2 record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Meta1Entry {
    pub parent_index: i32,
    pub meta2_entry_index: i32,
    pub num_direct_children: i32,
    pub num_all_children: i32,
}

impl Meta1Entry {
    pub fn decode(reader: &mut Reader) -> Result<Self> {
        Ok(Self {
            parent_index: reader.read_i32()?,
            meta2_entry_index: reader.read_i32()?,
            num_direct_children: reader.read_i32()?,
            num_all_children: reader.read_i32()?,
        })
    }

    pub fn encode(&self, writer: &mut Writer) {
        writer.write_i32(self.parent_index);
        writer.write_i32(self.meta2_entry_index);
        writer.write_i32(self.num_direct_children);
        writer.write_i32(self.num_all_children);
    }
}

pub fn decode_block(reader: &mut Reader, num_entries: usize) -> Result<Vec<Meta1Entry>> {
    let mut entries = Vec::with_capacity(num_entries);
    for _ in 0..num_entries {
        entries.push(Meta1Entry::decode(reader)?);
    }
    Ok(entries)
}

pub fn encode_block(entries: &[Meta1Entry], writer: &mut Writer) {
    for entry in entries {
        entry.encode(writer);
    }
}
