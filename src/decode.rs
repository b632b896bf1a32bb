use crate::cursor::Reader;
use crate::error::{Error, Result};
use crate::field::{self, Field};
use crate::header::Header;
use crate::lhm::{self, OrderedMap};
use crate::meta1::{self, Meta1Entry};
use crate::meta2::{self, Meta2Entry};
use crate::types::{DataType, Value};
use serde::Serialize;
use serde_json::Value as Json;

/// A fully decoded file: the two index tables plus every field with its
/// inferences, embedded files recursively expanded. This is what `--debug`
/// serializes; the normal output is the ordered-map projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedFile {
    pub header: Header,
    pub meta1_entries: Vec<Meta1Entry>,
    pub meta2_entries: Vec<Meta2Entry>,
    pub fields: Vec<Field>,
}

fn entry_count(declared: i32, table: &str) -> Result<usize> {
    usize::try_from(declared).map_err(|_| {
        Error::CorruptMeta2(format!(
            "header declares a negative {table} entry count ({declared})"
        ))
    })
}

impl DecodedFile {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes);

        let header = Header::decode(&mut reader)?;
        tracing::debug!(
            revision = header.revision,
            meta1 = header.num_meta1_entries,
            meta2 = header.num_meta2_entries,
            data_length = header.data_length,
            "header parsed"
        );

        let num_meta1 = entry_count(header.num_meta1_entries, "meta1")?;
        let num_meta2 = entry_count(header.num_meta2_entries, "meta2")?;

        let meta1_entries = meta1::decode_block(&mut reader, num_meta1)?;
        let meta2_entries = meta2::decode_block(
            &mut reader,
            num_meta2,
            header.data_length,
            &meta1_entries,
        )?;
        let mut fields = field::decode_fields(&mut reader, &meta2_entries)?;
        expand_embedded(&mut fields)?;

        Ok(Self {
            header,
            meta1_entries,
            meta2_entries,
            fields,
        })
    }
}

/// An embedded file's payload is a four-byte length followed by a complete
/// DSON file; parse the remainder recursively and retag.
fn expand_embedded(fields: &mut [Field]) -> Result<()> {
    for field in fields {
        if field.inferences.data_type != DataType::FileRaw {
            continue;
        }
        let stripped = &field.inferences.raw_data_stripped;
        if stripped.len() < 4 {
            return Err(Error::InvalidDataLength {
                data_type: DataType::FileRaw,
                expected: 4,
                got: stripped.len(),
            });
        }
        tracing::debug!(name = %field.name, "expanding embedded file");
        let embedded = DecodedFile::from_bytes(&stripped[4..])?;
        field.inferences.data = Value::File(Box::new(embedded));
        field.inferences.data_type = DataType::FileDecoded;
    }
    Ok(())
}

/// Project the flat field list into nested ordered maps. Each object opens
/// a child map under its name; leaves store their typed value; the
/// synthetic revision key goes first so the encoder can round-trip it.
pub fn project(file: &DecodedFile) -> OrderedMap {
    // slot 0 is the root (-1); slot i + 1 collects field i's children
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); file.fields.len() + 1];
    for (index, field) in file.fields.iter().enumerate() {
        children[(field.inferences.parent_index + 1) as usize].push(index);
    }
    build_map(file, &children, 0, Some(file.header.revision))
}

fn build_map(
    file: &DecodedFile,
    children: &[Vec<usize>],
    slot: usize,
    revision: Option<i32>,
) -> OrderedMap {
    let mut map = OrderedMap::new();
    if let Some(revision) = revision {
        map.insert(lhm::REVISION_KEY.to_string(), Json::from(revision));
    }
    for &index in &children[slot] {
        let field = &file.fields[index];
        let value = if field.inferences.is_object {
            Json::Object(build_map(file, children, index + 1, None))
        } else {
            field.inferences.data.to_json()
        };
        map.insert(field.name.clone(), value);
    }
    map
}

/// Binary ⇒ JSON text (the ordered-map projection).
pub fn decode(input: &[u8]) -> Result<Vec<u8>> {
    let file = DecodedFile::from_bytes(input)?;
    lhm::to_json_pretty(project(&file))
}

/// Binary ⇒ JSON text of the full decoded structure, every inference
/// included. Diagnostic output, not round-trippable.
pub fn decode_debug(input: &[u8]) -> Result<Vec<u8>> {
    let file = DecodedFile::from_bytes(input)?;
    let mut bytes = serde_json::to_vec_pretty(&file)?;
    bytes.push(b'\n');
    Ok(bytes)
}
