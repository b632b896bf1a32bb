use crate::cursor::{trim_trailing_nul, Reader};
use crate::error::{Error, Result};
use crate::hash;
use crate::infer;
use crate::meta2::Meta2Entry;
use crate::types::{DataType, Value};
use serde::Serialize;

/// One decoded field: name, on-disk payload (alignment padding included),
/// and everything inferred about it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    pub raw_data: Vec<u8>,
    pub inferences: Inferences,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Inferences {
    pub is_object: bool,
    pub parent_index: i32,
    pub hierarchy_path: Vec<String>,
    pub raw_data_offset: usize,
    pub raw_data_length: usize,
    pub raw_data_stripped: Vec<u8>,
    pub data_type: DataType,
    pub data: Value,
}

pub fn nearest_multiple_of_4(n: usize) -> usize {
    (n + 3) & !3
}

fn decode_name(reader: &mut Reader, entry: &Meta2Entry) -> Result<String> {
    let bytes = reader.read_bytes(entry.inferences.field_name_length)?;
    let name = String::from_utf8(trim_trailing_nul(bytes).to_vec()).map_err(|source| {
        Error::InvalidString {
            name: String::from_utf8_lossy(bytes).into_owned(),
            source,
        }
    })?;
    let hashed = hash::hash_name(&name);
    if hashed != entry.name_hash {
        return Err(Error::HashMismatch {
            name,
            expected: entry.name_hash,
            got: hashed,
        });
    }
    Ok(name)
}

fn decode_field(reader: &mut Reader, entry: &Meta2Entry) -> Result<Field> {
    let name = decode_name(reader, entry)?;
    let raw_data_length = entry.inferences.raw_data_length as usize;
    let raw_data = reader.read_bytes(raw_data_length)?.to_vec();

    // Payloads of four bytes or more start at the next 4-byte boundary
    // after the name; whatever sits between is padding to strip.
    let raw_data_offset = entry.offset as usize + entry.inferences.field_name_length;
    let slack = nearest_multiple_of_4(raw_data_offset) - raw_data_offset;
    let raw_data_stripped = if raw_data.len() > slack {
        raw_data[slack..].to_vec()
    } else {
        raw_data.clone()
    };

    Ok(Field {
        name,
        raw_data,
        inferences: Inferences {
            is_object: entry.inferences.is_object,
            parent_index: entry.inferences.parent_index,
            raw_data_offset,
            raw_data_length,
            raw_data_stripped,
            ..Inferences::default()
        },
    })
}

fn hierarchy_path(index: usize, fields: &[Field]) -> Vec<String> {
    let mut path = Vec::new();
    let mut cursor = index as i32;
    while cursor != -1 {
        let field = &fields[cursor as usize];
        path.push(field.name.clone());
        cursor = field.inferences.parent_index;
    }
    path.reverse();
    path
}

/// Decode every field in meta2 order, then resolve hierarchy paths, types,
/// and values. Embedded files stay `file_raw` here; the pipeline expands
/// them once the flat pass is done.
pub fn decode_fields(reader: &mut Reader, meta2_entries: &[Meta2Entry]) -> Result<Vec<Field>> {
    let mut fields = Vec::with_capacity(meta2_entries.len());
    for entry in meta2_entries {
        fields.push(decode_field(reader, entry)?);
    }

    let paths: Vec<Vec<String>> = (0..fields.len())
        .map(|index| hierarchy_path(index, &fields))
        .collect();
    for (field, path) in fields.iter_mut().zip(paths) {
        field.inferences.hierarchy_path = path;
    }

    for field in &mut fields {
        if field.inferences.is_object {
            field.inferences.data_type = DataType::Object;
            field.inferences.data = Value::Object;
            continue;
        }
        let data_type = infer::resolve(
            &field.name,
            &field.inferences.hierarchy_path,
            &field.inferences.raw_data_stripped,
        );
        let value = parse_payload(data_type, &field.inferences.raw_data_stripped)?;
        let (data_type, value) = infer::dehash(data_type, value);
        if data_type == DataType::Unknown {
            tracing::warn!(
                name = %field.name,
                length = field.inferences.raw_data_stripped.len(),
                "unclassified payload, emitting null"
            );
        }
        field.inferences.data_type = data_type;
        field.inferences.data = value;
    }

    Ok(fields)
}

fn expect_length(data_type: DataType, expected: usize, payload: &[u8]) -> Result<()> {
    if payload.len() != expected {
        return Err(Error::InvalidDataLength {
            data_type,
            expected,
            got: payload.len(),
        });
    }
    Ok(())
}

fn read_count(data_type: DataType, reader: &mut Reader, payload: &[u8]) -> Result<usize> {
    usize::try_from(reader.read_i32()?).map_err(|_| Error::InvalidDataLength {
        data_type,
        expected: 4,
        got: payload.len(),
    })
}

fn read_string_item(reader: &mut Reader, data_type: DataType) -> Result<String> {
    let length = read_count(data_type, reader, &[])?;
    read_utf8(reader.read_bytes(length)?)
}

/// Parse a stripped payload under an already-resolved type tag.
pub fn parse_payload(data_type: DataType, payload: &[u8]) -> Result<Value> {
    let mut reader = Reader::new(payload);
    let value = match data_type {
        DataType::Bool => {
            expect_length(data_type, 1, payload)?;
            Value::Bool(payload[0] != 0)
        }
        DataType::Char => {
            expect_length(data_type, 1, payload)?;
            Value::Char(payload[0] as char)
        }
        DataType::Int => {
            expect_length(data_type, 4, payload)?;
            Value::Int(reader.read_i32()?)
        }
        DataType::Float => {
            expect_length(data_type, 4, payload)?;
            Value::Float(reader.read_f32()?)
        }
        DataType::String => {
            let length = read_count(data_type, &mut reader, payload)?;
            expect_length(data_type, 4 + length, payload)?;
            Value::String(read_utf8(reader.read_bytes(length)?)?)
        }
        DataType::IntVector => {
            let count = read_count(data_type, &mut reader, payload)?;
            expect_length(data_type, 4 + 4 * count, payload)?;
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(reader.read_i32()?);
            }
            Value::IntVector(items)
        }
        DataType::FloatVector => {
            let count = read_count(data_type, &mut reader, payload)?;
            expect_length(data_type, 4 + 4 * count, payload)?;
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(reader.read_f32()?);
            }
            Value::FloatVector(items)
        }
        DataType::StringVector => {
            let count = read_count(data_type, &mut reader, payload)?;
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(read_string_item(&mut reader, data_type)?);
            }
            Value::StringVector(items)
        }
        DataType::TwoBool => {
            expect_length(data_type, 8, payload)?;
            Value::TwoBool(payload[0] != 0, payload[4] != 0)
        }
        DataType::TwoInt => {
            expect_length(data_type, 8, payload)?;
            Value::TwoInt(reader.read_i32()?, reader.read_i32()?)
        }
        // expanded later by the pipeline (file_raw) or never parsed from
        // payload bytes at all
        DataType::FileRaw
        | DataType::FileDecoded
        | DataType::FileJson
        | DataType::Object
        | DataType::HybridVector
        | DataType::Unknown => Value::Unknown,
    };
    Ok(value)
}

fn read_utf8(bytes: &[u8]) -> Result<String> {
    String::from_utf8(trim_trailing_nul(bytes).to_vec()).map_err(|source| Error::InvalidString {
        name: String::from_utf8_lossy(bytes).into_owned(),
        source,
    })
}
