use crate::error::{Error, Result};
use serde::de::Error as _;
use serde_json::Value as Json;

/// Insertion-ordered string → JSON mapping. With serde_json's
/// `preserve_order` feature this is index-map backed: iteration follows
/// insertion, re-inserting an existing key overwrites in place and keeps
/// the original position. Both properties are load-bearing for the
/// round-trip, since meta2 offsets are a function of key order.
pub type OrderedMap = serde_json::Map<String, Json>;

/// Synthetic first key of every (top-level or embedded) decoded object,
/// carrying the header revision through the JSON side.
pub const REVISION_KEY: &str = "__revision_dont_touch";

/// Emit the map as UTF-8 JSON, 2-space indentation, keys in insertion
/// order, with a trailing newline.
pub fn to_json_pretty(map: OrderedMap) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(&Json::Object(map))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Parse JSON text into an ordered map, preserving key order.
pub fn from_slice(bytes: &[u8]) -> Result<OrderedMap> {
    match serde_json::from_slice(bytes)? {
        Json::Object(map) => Ok(map),
        other => Err(Error::Json(serde_json::Error::custom(format!(
            "top-level JSON value must be an object, got {other}"
        )))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_come_back_in_insertion_order() {
        let text = br#"{"zulu": 1, "alpha": 2, "mike": {"yankee": 3, "bravo": 4}}"#;
        let map = from_slice(text).unwrap();
        let keys: Vec<&String> = map.keys().collect();
        assert_eq!(keys, ["zulu", "alpha", "mike"]);

        let emitted = to_json_pretty(map).unwrap();
        let text = String::from_utf8(emitted).unwrap();
        assert!(text.find("zulu").unwrap() < text.find("alpha").unwrap());
        assert!(text.find("yankee").unwrap() < text.find("bravo").unwrap());
    }

    #[test]
    fn two_space_indentation_and_trailing_newline() {
        let mut map = OrderedMap::new();
        map.insert("a".into(), json!(1));
        let text = String::from_utf8(to_json_pretty(map).unwrap()).unwrap();
        assert_eq!(text, "{\n  \"a\": 1\n}\n");
    }

    #[test]
    fn duplicate_key_keeps_first_position_second_value() {
        let map = from_slice(br#"{"a": 1, "b": 2, "a": 3}"#).unwrap();
        let keys: Vec<&String> = map.keys().collect();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(map["a"], json!(3));
    }

    #[test]
    fn non_object_top_level_is_rejected() {
        assert!(from_slice(b"[1, 2]").is_err());
    }
}
