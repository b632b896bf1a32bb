use crate::cursor::Writer;
use crate::error::{Error, Result};
use crate::field::nearest_multiple_of_4;
use crate::hash::{self, DEHASH_PREFIX};
use crate::header::Header;
use crate::infer;
use crate::lhm::{self, OrderedMap};
use crate::meta1::{self, Meta1Entry};
use crate::meta2::{self, Meta2Entry};
use crate::tree;
use crate::types::DataType;
use serde_json::Value as Json;

/// Keys whose object values hold a re-encoded embedded file rather than
/// ordinary children. Heuristic: a save that used these names for plain
/// objects would be misclassified, and none has been seen.
const EMBEDDED_KEYS: &[&str] = &["raw_data", "static_save"];

/// One pre-order row of the file being assembled.
#[derive(Debug)]
struct EncodingField {
    key: String,
    is_object: bool,
    payload: Vec<u8>,
    num_direct_children: i32,
    num_all_children: i32,
    parent_index: i32,
    meta1_index: usize,
}

/// JSON text ⇒ binary.
pub fn encode(input: &[u8]) -> Result<Vec<u8>> {
    encode_map(lhm::from_slice(input)?)
}

fn encode_map(map: OrderedMap) -> Result<Vec<u8>> {
    let revision = take_revision(&map)?;
    tracing::debug!(revision, keys = map.len(), "assembling file");

    let mut fields = Vec::new();
    flatten(&map, &[], &mut fields)?;
    assign_parent_indexes(&mut fields);
    assign_meta1_indexes(&mut fields);

    let (offsets, paddings, data_length) = layout(&fields);

    let meta1_entries = build_meta1(&fields);
    let meta2_entries = build_meta2(&fields, &offsets);
    let header = Header::from_layout(
        revision,
        meta1_entries.len() as i32,
        meta2_entries.len() as i32,
        data_length,
    );

    let total = crate::header::HEADER_SIZE
        + meta1_entries.len() * meta1::ENTRY_SIZE
        + meta2_entries.len() * meta2::ENTRY_SIZE
        + data_length as usize;
    let mut writer = Writer::with_capacity(total);
    header.encode(&mut writer);
    meta1::encode_block(&meta1_entries, &mut writer);
    for entry in &meta2_entries {
        entry.encode(&mut writer);
    }
    for (field, padding) in fields.iter().zip(&paddings) {
        writer.write_bytes(field.key.as_bytes());
        writer.write_u8(0);
        writer.write_zeros(*padding);
        writer.write_bytes(&field.payload);
    }
    Ok(writer.into_bytes())
}

/// The revision must be the first key of every (top-level or embedded)
/// object; it travels in the header, not the data region.
fn take_revision(map: &OrderedMap) -> Result<i32> {
    let (key, value) = map.iter().next().ok_or_else(|| Error::MissingRevision {
        expected: lhm::REVISION_KEY,
        got: String::from("<empty object>"),
    })?;
    if key != lhm::REVISION_KEY {
        return Err(Error::MissingRevision {
            expected: lhm::REVISION_KEY,
            got: key.clone(),
        });
    }
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
        .map(|v| v as i32)
        .ok_or_else(|| Error::MissingRevision {
            expected: lhm::REVISION_KEY,
            got: format!("{key} = {value}"),
        })
}

/// Recursive pre-order walk of the ordered map. Returns how many fields
/// the subtree emitted, which is exactly `num_all_children` for the
/// enclosing object.
fn flatten(
    map: &OrderedMap,
    parent_path: &[String],
    out: &mut Vec<EncodingField>,
) -> Result<usize> {
    let mut emitted = 0;
    for (key, value) in map {
        if key == lhm::REVISION_KEY {
            continue;
        }
        let mut path = parent_path.to_vec();
        path.push(key.clone());
        let data_type = imply_type(key, &path, value);

        match data_type {
            DataType::Object => {
                let map = value.as_object().expect("object tag implies a map");
                let slot = out.len();
                out.push(EncodingField {
                    key: key.clone(),
                    is_object: true,
                    payload: Vec::new(),
                    num_direct_children: 0,
                    num_all_children: 0,
                    parent_index: -1,
                    meta1_index: 0,
                });
                let descendants = flatten(map, &path, out)?;
                let direct = map.keys().filter(|k| *k != lhm::REVISION_KEY).count();
                out[slot].num_direct_children = direct as i32;
                out[slot].num_all_children = descendants as i32;
                emitted += 1 + descendants;
            }
            DataType::FileJson => {
                let map = value.as_object().expect("file tag implies a map");
                let embedded = encode_map(map.clone())?;
                let mut payload = Writer::with_capacity(4 + embedded.len());
                payload.write_i32(embedded.len() as i32);
                payload.write_bytes(&embedded);
                out.push(EncodingField {
                    key: key.clone(),
                    is_object: false,
                    payload: payload.into_bytes(),
                    num_direct_children: 0,
                    num_all_children: 0,
                    parent_index: -1,
                    meta1_index: 0,
                });
                emitted += 1;
            }
            _ => {
                out.push(EncodingField {
                    key: key.clone(),
                    is_object: false,
                    payload: encode_value(data_type, value)?,
                    num_direct_children: 0,
                    num_all_children: 0,
                    parent_index: -1,
                    meta1_index: 0,
                });
                emitted += 1;
            }
        }
    }
    Ok(emitted)
}

/// Type implication for a JSON value: embedded-key check, then the two
/// static resolver stages, then the shape of the value itself.
fn imply_type(key: &str, path: &[String], value: &Json) -> DataType {
    if EMBEDDED_KEYS.contains(&key) && value.is_object() {
        return DataType::FileJson;
    }
    let by_name = infer::by_field_name(key);
    if by_name != DataType::Unknown {
        return by_name;
    }
    let by_path = infer::by_hierarchy_path(path);
    if by_path != DataType::Unknown {
        return by_path;
    }
    imply_by_value(value)
}

fn imply_by_value(value: &Json) -> DataType {
    match value {
        Json::Bool(_) => DataType::Bool,
        Json::Number(n) => {
            if n.as_i64().is_some() || n.as_u64().is_some() {
                DataType::Int
            } else {
                let f = n.as_f64().unwrap_or(0.0);
                if f.trunc() == f {
                    DataType::Int
                } else {
                    DataType::Float
                }
            }
        }
        Json::String(s) => {
            if s.len() == 1 {
                DataType::Char
            } else {
                DataType::String
            }
        }
        Json::Array(items) => imply_array(items),
        Json::Object(_) => DataType::Object,
        Json::Null => DataType::Unknown,
    }
}

fn imply_array(items: &[Json]) -> DataType {
    if items.len() == 2 && items.iter().all(Json::is_boolean) {
        return DataType::TwoBool;
    }
    if items.iter().all(Json::is_string) {
        if items.is_empty() {
            // count-only payload, identical bytes whichever vector we call it
            return DataType::IntVector;
        }
        return DataType::StringVector;
    }
    if items.iter().all(Json::is_number) {
        let integral = items
            .iter()
            .all(|item| item.as_i64().is_some() || item.as_u64().is_some());
        return if integral {
            DataType::IntVector
        } else {
            DataType::FloatVector
        };
    }
    if items
        .iter()
        .all(|item| item.is_number() || item.is_string())
    {
        return DataType::HybridVector;
    }
    DataType::Unknown
}

fn number_as_i32(data_type: DataType, value: &Json) -> Result<i32> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
        .map(|v| v as i32)
        .ok_or(Error::UnsupportedType(data_type))
}

fn number_as_f32(data_type: DataType, value: &Json) -> Result<f32> {
    value
        .as_f64()
        .map(|f| f as f32)
        .ok_or(Error::UnsupportedType(data_type))
}

fn string_of(data_type: DataType, value: &Json) -> Result<&str> {
    value.as_str().ok_or(Error::UnsupportedType(data_type))
}

/// String payloads are length-prefixed and NUL-terminated, except that a
/// `###name` spelling collapses back into the four-byte hash it came from.
fn write_string(writer: &mut Writer, text: &str) {
    if let Some(name) = text.strip_prefix(DEHASH_PREFIX) {
        writer.write_i32(hash::hash_name(name));
        return;
    }
    writer.write_i32(text.len() as i32 + 1);
    writer.write_bytes(text.as_bytes());
    writer.write_u8(0);
}

/// Serialize one leaf value under its implied type tag.
fn encode_value(data_type: DataType, value: &Json) -> Result<Vec<u8>> {
    let mut writer = Writer::new();
    match data_type {
        DataType::Bool => {
            let b = value.as_bool().ok_or(Error::UnsupportedType(data_type))?;
            writer.write_u8(b as u8);
        }
        DataType::Char => {
            let s = string_of(data_type, value)?;
            let byte = *s.as_bytes().first().ok_or(Error::InvalidDataLength {
                data_type,
                expected: 1,
                got: 0,
            })?;
            writer.write_u8(byte);
        }
        DataType::Int => writer.write_i32(number_as_i32(data_type, value)?),
        DataType::Float => writer.write_f32(number_as_f32(data_type, value)?),
        DataType::String => write_string(&mut writer, string_of(data_type, value)?),
        DataType::IntVector | DataType::FloatVector | DataType::StringVector
        | DataType::HybridVector => {
            let items = value.as_array().ok_or(Error::UnsupportedType(data_type))?;
            writer.write_i32(items.len() as i32);
            for item in items {
                match data_type {
                    DataType::FloatVector => writer.write_f32(number_as_f32(data_type, item)?),
                    DataType::StringVector => write_string(&mut writer, string_of(data_type, item)?),
                    // int and hybrid vectors dispatch per element: partial
                    // dehashing leaves `###name` strings mixed with raw
                    // integers in the same array
                    _ => match item {
                        Json::String(s) => write_string(&mut writer, s),
                        other => writer.write_i32(number_as_i32(data_type, other)?),
                    },
                }
            }
        }
        DataType::TwoBool => {
            let items = value.as_array().ok_or(Error::UnsupportedType(data_type))?;
            if items.len() != 2 {
                return Err(Error::InvalidDataLength {
                    data_type,
                    expected: 2,
                    got: items.len(),
                });
            }
            for item in items {
                let b = item.as_bool().ok_or(Error::UnsupportedType(data_type))?;
                writer.write_i32(b as i32);
            }
        }
        DataType::TwoInt => {
            let items = value.as_array().ok_or(Error::UnsupportedType(data_type))?;
            if items.len() != 2 {
                return Err(Error::InvalidDataLength {
                    data_type,
                    expected: 2,
                    got: items.len(),
                });
            }
            for item in items {
                writer.write_i32(number_as_i32(data_type, item)?);
            }
        }
        // unclassified decode output: nothing better to emit than an
        // empty payload
        DataType::Unknown => {}
        DataType::Object | DataType::FileRaw | DataType::FileDecoded | DataType::FileJson => {
            return Err(Error::UnsupportedType(data_type));
        }
    }
    Ok(writer.into_bytes())
}

struct Frame {
    index: i32,
    remaining: i32,
}

/// Same stack walk the decoder uses on meta2 entries, run over the rows
/// being assembled.
fn assign_parent_indexes(fields: &mut [EncodingField]) {
    tree::build_tree(
        Frame {
            index: -1,
            remaining: 1,
        },
        fields,
        |top, _, field| field.parent_index = top.index,
        |top| {
            top.remaining -= 1;
            top.remaining == 0
        },
        |index, field| {
            (field.is_object && field.num_direct_children > 0).then(|| Frame {
                index: index as i32,
                remaining: field.num_direct_children,
            })
        },
    );
}

fn assign_meta1_indexes(fields: &mut [EncodingField]) {
    let mut next = 0;
    for field in fields {
        if field.is_object {
            field.meta1_index = next;
            next += 1;
        }
    }
}

/// Meta2 offsets and alignment padding. A payload of four bytes or more
/// starts at the next 4-byte boundary after the name; shorter payloads
/// follow the name immediately.
fn layout(fields: &[EncodingField]) -> (Vec<i32>, Vec<usize>, i32) {
    let mut offsets = Vec::with_capacity(fields.len());
    let mut paddings = Vec::with_capacity(fields.len());
    let mut running = 0usize;
    for field in fields {
        offsets.push(running as i32);
        let name_end = running + field.key.len() + 1;
        let payload_start = if field.payload.len() >= 4 {
            nearest_multiple_of_4(name_end)
        } else {
            name_end
        };
        paddings.push(payload_start - name_end);
        running = payload_start + field.payload.len();
    }
    (offsets, paddings, running as i32)
}

fn build_meta1(fields: &[EncodingField]) -> Vec<Meta1Entry> {
    fields
        .iter()
        .enumerate()
        .filter(|(_, field)| field.is_object)
        .map(|(index, field)| Meta1Entry {
            parent_index: if field.parent_index == -1 {
                -1
            } else {
                fields[field.parent_index as usize].meta1_index as i32
            },
            meta2_entry_index: index as i32,
            num_direct_children: field.num_direct_children,
            num_all_children: field.num_all_children,
        })
        .collect()
}

fn build_meta2(fields: &[EncodingField], offsets: &[i32]) -> Vec<Meta2Entry> {
    fields
        .iter()
        .zip(offsets)
        .map(|(field, &offset)| {
            let field_info =
                meta2::pack_field_info(field.key.len() + 1, field.is_object, field.meta1_index);
            Meta2Entry {
                name_hash: hash::hash_name(&field.key),
                offset,
                field_info,
                inferences: Default::default(),
            }
        })
        .collect()
}
