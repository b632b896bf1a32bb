use crate::cursor::{Reader, Writer};
use crate::error::{Error, Result};
use crate::meta1::Meta1Entry;
use crate::tree;
use serde::Serialize;

pub const ENTRY_SIZE: usize = 12;

// field_info bit layout:
//
//   bit 0        is_object
//   bits 2..11   field name length, including the trailing NUL (9 bits)
//   bits 11..31  meta1 entry index when is_object, zero otherwise (20 bits)
//   bit 31       observed set sporadically; carries no known meaning
const IS_OBJECT_BIT: u32 = 0b1;
const NAME_LENGTH_SHIFT: u32 = 2;
const NAME_LENGTH_MASK: u32 = 0x1ff;
const META1_INDEX_SHIFT: u32 = 11;
const META1_INDEX_MASK: u32 = 0xf_ffff;

/// One 12-byte record per field. `field_info` keeps the raw packed word
/// (bit 31 included); everything derived from it or from neighboring
/// records lives in `inferences`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Meta2Entry {
    pub name_hash: i32,
    pub offset: i32,
    pub field_info: i32,
    pub inferences: Meta2Inferences,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Meta2Inferences {
    pub is_object: bool,
    pub field_name_length: usize,
    pub meta1_entry_index: usize,
    pub num_direct_children: i32,
    pub num_all_children: i32,
    pub raw_data_length: i32,
    pub parent_index: i32,
}

pub fn pack_field_info(field_name_length: usize, is_object: bool, meta1_entry_index: usize) -> i32 {
    let mut info = (field_name_length as u32 & NAME_LENGTH_MASK) << NAME_LENGTH_SHIFT;
    if is_object {
        info |= IS_OBJECT_BIT;
        info |= (meta1_entry_index as u32 & META1_INDEX_MASK) << META1_INDEX_SHIFT;
    }
    info as i32
}

fn unpack_field_info(field_info: i32) -> Meta2Inferences {
    let info = field_info as u32;
    Meta2Inferences {
        is_object: info & IS_OBJECT_BIT == 1,
        field_name_length: ((info >> NAME_LENGTH_SHIFT) & NAME_LENGTH_MASK) as usize,
        meta1_entry_index: ((info >> META1_INDEX_SHIFT) & META1_INDEX_MASK) as usize,
        ..Meta2Inferences::default()
    }
}

impl Meta2Entry {
    pub fn decode(reader: &mut Reader) -> Result<Self> {
        let name_hash = reader.read_i32()?;
        let offset = reader.read_i32()?;
        let field_info = reader.read_i32()?;
        Ok(Self {
            name_hash,
            offset,
            field_info,
            inferences: unpack_field_info(field_info),
        })
    }

    pub fn encode(&self, writer: &mut Writer) {
        writer.write_i32(self.name_hash);
        writer.write_i32(self.offset);
        writer.write_i32(self.field_info);
    }
}

/// Decode `num_entries` records and run the three inference passes: raw
/// data lengths from neighboring offsets, child counts copied over from
/// meta1, and parent indexes recovered from the pre-order layout.
pub fn decode_block(
    reader: &mut Reader,
    num_entries: usize,
    data_length: i32,
    meta1_entries: &[Meta1Entry],
) -> Result<Vec<Meta2Entry>> {
    let mut entries = Vec::with_capacity(num_entries);
    for _ in 0..num_entries {
        entries.push(Meta2Entry::decode(reader)?);
    }

    infer_raw_data_lengths(&mut entries, data_length)?;
    apply_meta1_children(meta1_entries, &mut entries)?;
    infer_parent_indexes(&mut entries);

    Ok(entries)
}

/// A field's payload runs from the end of its name to the next field's
/// offset; the last field runs to the end of the data region.
fn infer_raw_data_lengths(entries: &mut [Meta2Entry], data_length: i32) -> Result<()> {
    let n = entries.len();
    for i in 0..n {
        let next_offset = if i + 1 < n {
            entries[i + 1].offset
        } else {
            data_length
        };
        let entry = &mut entries[i];
        let length = next_offset - (entry.offset + entry.inferences.field_name_length as i32);
        if length < 0 {
            return Err(Error::CorruptMeta2(format!(
                "entry {i} at offset {} has negative raw data length {length}",
                entry.offset,
            )));
        }
        entry.inferences.raw_data_length = length;
    }
    Ok(())
}

/// Copy child counts from each meta1 entry onto the meta2 entry it points
/// at, cross-checking the back-reference both ways.
fn apply_meta1_children(meta1_entries: &[Meta1Entry], entries: &mut [Meta2Entry]) -> Result<()> {
    for (meta1_index, meta1_entry) in meta1_entries.iter().enumerate() {
        let meta2_index = usize::try_from(meta1_entry.meta2_entry_index).map_err(|_| {
            Error::CorruptMeta2(format!(
                "meta1 entry {meta1_index} points at negative meta2 index {}",
                meta1_entry.meta2_entry_index
            ))
        })?;
        let entry = entries.get_mut(meta2_index).ok_or_else(|| {
            Error::CorruptMeta2(format!(
                "meta1 entry {meta1_index} points past the meta2 table ({meta2_index})"
            ))
        })?;
        if !entry.inferences.is_object {
            return Err(Error::CorruptMeta2(format!(
                "meta1 entry {meta1_index} points at meta2 entry {meta2_index}, which is not an object"
            )));
        }
        if entry.inferences.meta1_entry_index != meta1_index {
            return Err(Error::Meta1CrossCheck {
                meta1_index,
                meta2_index,
                got: entry.inferences.meta1_entry_index,
            });
        }
        entry.inferences.num_direct_children = meta1_entry.num_direct_children;
        entry.inferences.num_all_children = meta1_entry.num_all_children;
    }

    // every object must have found its meta1 entry
    for (index, entry) in entries.iter().enumerate() {
        if entry.inferences.is_object && entry.inferences.meta1_entry_index >= meta1_entries.len() {
            return Err(Error::CorruptMeta2(format!(
                "object entry {index} claims meta1 index {} of {}",
                entry.inferences.meta1_entry_index,
                meta1_entries.len()
            )));
        }
    }
    Ok(())
}

struct Frame {
    index: i32,
    remaining: i32,
}

/// Fields are laid out depth-first, so a stack of open objects and their
/// remaining child slots recovers every parent index in one pass.
fn infer_parent_indexes(entries: &mut [Meta2Entry]) {
    for entry in entries.iter_mut() {
        entry.inferences.parent_index = -1;
    }
    tree::build_tree(
        Frame {
            index: -1,
            remaining: 1,
        },
        entries,
        |top, _, entry| entry.inferences.parent_index = top.index,
        |top| {
            top.remaining -= 1;
            top.remaining == 0
        },
        |index, entry| {
            (entry.inferences.is_object && entry.inferences.num_direct_children > 0).then(|| {
                Frame {
                    index: index as i32,
                    remaining: entry.inferences.num_direct_children,
                }
            })
        },
    );
}
