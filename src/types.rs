use crate::decode::DecodedFile;
use serde::{Serialize, Serializer};
use std::fmt;

/// Payload type tags. Binary payloads carry no explicit tag; these are the
/// outcome of the three-stage resolver (or of value-shape implication on
/// the encode side).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    #[default]
    Unknown,
    Bool,
    Char,
    Int,
    Float,
    String,
    IntVector,
    FloatVector,
    StringVector,
    /// Integer vector whose dehashing succeeded only partly, leaving
    /// strings and raw integers mixed in one array.
    HybridVector,
    TwoBool,
    TwoInt,
    /// Embedded DSON payload that has not been expanded yet.
    FileRaw,
    /// Embedded DSON payload expanded into a full decoded file.
    FileDecoded,
    /// Encode-side marker for a JSON object that must be re-encoded as an
    /// embedded file (`raw_data` / `static_save` keys).
    FileJson,
    Object,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "unknown",
            Self::Bool => "bool",
            Self::Char => "char",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::IntVector => "int_vector",
            Self::FloatVector => "float_vector",
            Self::StringVector => "string_vector",
            Self::HybridVector => "hybrid_vector",
            Self::TwoBool => "two_bool",
            Self::TwoInt => "two_int",
            Self::FileRaw => "file_raw",
            Self::FileDecoded => "file_decoded",
            Self::FileJson => "file_json",
            Self::Object => "object",
        };
        f.write_str(name)
    }
}

/// One element of a partially-dehashed integer vector.
#[derive(Debug, Clone, PartialEq)]
pub enum Hybrid {
    Int(i32),
    Name(String),
}

/// A parsed payload. Modeled as a tagged sum rather than a type-erased
/// container so every consumer has to say what it expects.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Unknown,
    Bool(bool),
    Char(char),
    Int(i32),
    Float(f32),
    String(String),
    IntVector(Vec<i32>),
    FloatVector(Vec<f32>),
    StringVector(Vec<String>),
    HybridVector(Vec<Hybrid>),
    TwoBool(bool, bool),
    TwoInt(i32, i32),
    File(Box<DecodedFile>),
    Object,
}

fn float_to_json(value: f32) -> serde_json::Value {
    match serde_json::Number::from_f64(f64::from(value)) {
        Some(number) => serde_json::Value::Number(number),
        None => {
            tracing::warn!(value = %value, "non-finite float has no JSON spelling, emitting null");
            serde_json::Value::Null
        }
    }
}

impl Value {
    /// The ordered-map projection of a leaf value.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Self::Unknown => Json::Null,
            Self::Bool(b) => Json::Bool(*b),
            Self::Char(c) => Json::String(c.to_string()),
            Self::Int(i) => Json::from(*i),
            Self::Float(f) => float_to_json(*f),
            Self::String(s) => Json::String(s.clone()),
            Self::IntVector(items) => items.iter().copied().map(Json::from).collect(),
            Self::FloatVector(items) => items.iter().copied().map(float_to_json).collect(),
            Self::StringVector(items) => {
                items.iter().cloned().map(Json::String).collect()
            }
            Self::HybridVector(items) => items
                .iter()
                .map(|item| match item {
                    Hybrid::Int(i) => Json::from(*i),
                    Hybrid::Name(name) => Json::String(name.clone()),
                })
                .collect(),
            Self::TwoBool(a, b) => Json::Array(vec![Json::Bool(*a), Json::Bool(*b)]),
            Self::TwoInt(a, b) => Json::Array(vec![Json::from(*a), Json::from(*b)]),
            Self::File(file) => Json::Object(crate::decode::project(file)),
            Self::Object => Json::Object(serde_json::Map::new()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
