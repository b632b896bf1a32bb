//! End-to-end laws over synthetic save files: the binary produced from
//! decoded-then-reencoded input must be byte-identical, and decoding is
//! idempotent over the codec.

use rusty_dson::cursor::Writer;
use rusty_dson::decode::DecodedFile;
use rusty_dson::hash::hash_name;
use rusty_dson::header::Header;
use rusty_dson::meta2::{pack_field_info, Meta2Entry};
use rusty_dson::{decode, encode, is_dson};

/// Exercises every payload codec: primitives, both hashed-string forms, all
/// four vector kinds, the two pair kinds, and nested objects.
const SAMPLE: &str = r####"{
  "__revision_dont_touch": 59,
  "base_root": {
    "version": 2,
    "paused": false,
    "requirement_code": "f",
    "estate_name": "The Hamlet",
    "class_id": "###crusader",
    "current_hp": 25.5,
    "killRange": [1, 3],
    "flags": [true, false],
    "dungeons_unlocked": [3, 5],
    "dispatched_events": ["###plague_doctor", 2],
    "goal_ids": ["g1", "g2"],
    "areas": {
      "a1": {
        "bounds": [1.5, 2.75]
      }
    },
    "party": {
      "heroes": [4, 9]
    },
    "notes": null
  }
}"####;

fn canonical(text: &str) -> Vec<u8> {
    let value: serde_json::Value = serde_json::from_str(text).unwrap();
    let mut bytes = serde_json::to_vec_pretty(&value).unwrap();
    bytes.push(b'\n');
    bytes
}

#[test]
fn encode_then_decode_reproduces_the_json() {
    let binary = encode(SAMPLE.as_bytes()).unwrap();
    assert!(is_dson(&binary));
    assert_eq!(decode(&binary).unwrap(), canonical(SAMPLE));
}

#[test]
fn decode_then_encode_reproduces_the_binary() {
    let binary = encode(SAMPLE.as_bytes()).unwrap();
    let json = decode(&binary).unwrap();
    assert_eq!(encode(&json).unwrap(), binary);
}

#[test]
fn decode_is_idempotent_over_the_codec() {
    let binary = encode(SAMPLE.as_bytes()).unwrap();
    let once = decode(&binary).unwrap();
    let twice = decode(&encode(&once).unwrap()).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn magic_survives_the_round_trip() {
    let binary = encode(SAMPLE.as_bytes()).unwrap();
    assert!(is_dson(&binary[..4]));
    let again = encode(&decode(&binary).unwrap()).unwrap();
    assert!(is_dson(&again[..4]));
    assert!(!is_dson(SAMPLE.as_bytes()));
}

#[test]
fn structural_invariants_hold() {
    let binary = encode(SAMPLE.as_bytes()).unwrap();
    let file = DecodedFile::from_bytes(&binary).unwrap();

    // data region bookkeeping
    let total: usize = file
        .fields
        .iter()
        .map(|f| f.name.len() + 1 + f.inferences.raw_data_length)
        .sum();
    assert_eq!(total as i32, file.header.data_length);
    assert_eq!(
        file.header.data_offset,
        file.header.header_length + file.header.meta1_size + 12 * file.header.num_meta2_entries
    );

    // every name hash checks out
    for (field, entry) in file.fields.iter().zip(&file.meta2_entries) {
        assert_eq!(hash_name(&field.name), entry.name_hash);
    }

    // parent walks terminate at the root within tree depth
    for mut cursor in file.fields.iter().map(|f| f.inferences.parent_index) {
        let mut steps = 0;
        while cursor != -1 {
            cursor = file.fields[cursor as usize].inferences.parent_index;
            steps += 1;
            assert!(steps <= file.fields.len());
        }
    }

    // meta1 back-references point at objects that point back
    for (j, meta1) in file.meta1_entries.iter().enumerate() {
        let entry = &file.meta2_entries[meta1.meta2_entry_index as usize];
        assert!(entry.inferences.is_object);
        assert_eq!(entry.inferences.meta1_entry_index, j);
    }
}

#[test]
fn payloads_of_four_bytes_or_more_are_aligned() {
    let binary = encode(SAMPLE.as_bytes()).unwrap();
    let file = DecodedFile::from_bytes(&binary).unwrap();
    for field in &file.fields {
        let stripped = field.inferences.raw_data_stripped.len();
        if stripped >= 4 {
            let start = field.inferences.raw_data_offset
                + (field.inferences.raw_data_length - stripped);
            assert_eq!(start % 4, 0, "field {} payload is unaligned", field.name);
        } else {
            assert_eq!(
                field.inferences.raw_data_length, stripped,
                "field {} is padded despite a short payload",
                field.name
            );
        }
    }
}

#[test]
fn single_leaf_file_round_trips() {
    let text = "{\n  \"__revision_dont_touch\": 1,\n  \"count\": 7\n}\n";
    let binary = encode(text.as_bytes()).unwrap();

    let file = DecodedFile::from_bytes(&binary).unwrap();
    assert!(file.meta1_entries.is_empty());
    assert_eq!(file.fields.len(), 1);
    assert_eq!(file.fields[0].inferences.parent_index, -1);

    assert_eq!(decode(&binary).unwrap(), text.as_bytes());
    assert_eq!(encode(&decode(&binary).unwrap()).unwrap(), binary);
}

#[test]
fn embedded_files_nest_and_round_trip() {
    for key in ["raw_data", "static_save"] {
        let text = format!(
            r#"{{
  "__revision_dont_touch": 60,
  "base_root": {{
    "{key}": {{
      "__revision_dont_touch": 59,
      "inner": {{
        "x": 1
      }}
    }}
  }}
}}"#
        );
        let binary = encode(text.as_bytes()).unwrap();
        let file = DecodedFile::from_bytes(&binary).unwrap();

        // the host field holds a length-prefixed complete DSON file
        let host = file
            .fields
            .iter()
            .find(|f| f.name == key)
            .expect("host field present");
        assert!(is_dson(&host.inferences.raw_data_stripped[4..8]));

        // the embedded file counts as a single leaf for its parent
        assert_eq!(file.meta1_entries[0].num_all_children, 1);

        assert_eq!(decode(&binary).unwrap(), canonical(&text));
        assert_eq!(encode(&decode(&binary).unwrap()).unwrap(), binary);
    }
}

#[test]
fn hashed_integer_substitution() {
    let text = r####"{
  "__revision_dont_touch": 1,
  "hero_class": "###crusader"
}"####;
    let binary = encode(text.as_bytes()).unwrap();

    // the string collapsed into the four-byte hash
    let file = DecodedFile::from_bytes(&binary).unwrap();
    assert_eq!(
        file.fields[0].inferences.raw_data_stripped,
        1181166609i32.to_le_bytes()
    );

    let json = String::from_utf8(decode(&binary).unwrap()).unwrap();
    assert!(json.contains("\"###crusader\""));
    assert_eq!(encode(json.as_bytes()).unwrap(), binary);
}

#[test]
fn unclassified_payload_decodes_to_null() {
    // two-byte payload: no inference stage claims it
    let name = "xxx";
    let name_length = name.len() + 1;
    let data_length = (name_length + 2) as i32;

    let mut writer = Writer::new();
    Header::from_layout(5, 0, 1, data_length).encode(&mut writer);
    Meta2Entry {
        name_hash: hash_name(name),
        offset: 0,
        field_info: pack_field_info(name_length, false, 0),
        inferences: Default::default(),
    }
    .encode(&mut writer);
    writer.write_bytes(name.as_bytes());
    writer.write_u8(0);
    writer.write_bytes(&[7, 7]);

    let json = String::from_utf8(decode(&writer.into_bytes()).unwrap()).unwrap();
    assert!(json.contains("\"xxx\": null"));
}

#[test]
fn one_character_strings_stay_one_byte() {
    let text = r#"{
  "__revision_dont_touch": 1,
  "grade": "B"
}"#;
    let binary = encode(text.as_bytes()).unwrap();
    let file = DecodedFile::from_bytes(&binary).unwrap();
    assert_eq!(file.fields[0].inferences.raw_data_stripped, b"B");

    let json = String::from_utf8(decode(&binary).unwrap()).unwrap();
    assert!(json.contains("\"grade\": \"B\""));
    assert_eq!(encode(json.as_bytes()).unwrap(), binary);
}
