use crate::hash;
use crate::header;
use crate::types::{DataType, Hybrid, Value};

// Stage 1: leaf names whose type the payload alone cannot reveal. These are
// fixed vocabulary from the save schema; extend only with a sample file in
// hand.
const CHAR_NAMES: &[&str] = &["requirement_code"];

const FLOAT_NAMES: &[&str] = &["current_hp", "m_Stress"];

const INT_VECTOR_NAMES: &[&str] = &[
    "read_page_indexes",
    "raid_read_page_indexes",
    "raid_unread_page_indexes",
    "dungeons_unlocked",
    "played_video_list",
    "trinket_retention_ids",
    "last_party_guids",
    "dungeon_history",
    "buff_group_guids",
    "result_event_history",
    "dead_hero_entries",
    "additional_mash_disabled_infestation_monster_class_ids",
    "skill_cooldown_keys",
    "skill_cooldown_values",
    "bufferedSpawningSlotsAvailable",
    "raid_finish_quirk_monster_class_ids",
    "narration_audio_event_queue_tags",
    "dispatched_events",
];

const STRING_VECTOR_NAMES: &[&str] = &["goal_ids", "quirk_group", "backgroundNames"];

const TWO_INT_NAMES: &[&str] = &["killRange"];

pub fn by_field_name(name: &str) -> DataType {
    if CHAR_NAMES.contains(&name) {
        DataType::Char
    } else if FLOAT_NAMES.contains(&name) {
        DataType::Float
    } else if INT_VECTOR_NAMES.contains(&name) {
        DataType::IntVector
    } else if STRING_VECTOR_NAMES.contains(&name) {
        DataType::StringVector
    } else if TWO_INT_NAMES.contains(&name) {
        DataType::TwoInt
    } else {
        DataType::Unknown
    }
}

// Stage 2: hierarchy-path patterns. `*` matches exactly one component; a
// pattern matches when it lines up with the tail of the field's path.
const WILDCARD: &str = "*";

const FLOAT_PATHS: &[&[&str]] = &[
    &["actor", "buff_group", WILDCARD, "amount"],
    &["chapters", WILDCARD, WILDCARD, "percent"],
    &["non_rolled_additional_chances", WILDCARD, "chance"],
    &["rarity_table", WILDCARD, "chance"],
];

const INT_VECTOR_PATHS: &[&[&str]] = &[
    &["mash", "valid_additional_mash_entry_indexes"],
    &["party", "heroes"],
    &["curioGroups", WILDCARD, "curios"],
    &["curioGroups", WILDCARD, "curio_table_entries"],
    &["backer_heroes", WILDCARD, "combat_skills"],
    &["backer_heroes", WILDCARD, "camping_skills"],
    &["backer_heroes", WILDCARD, "quirks"],
];

const STRING_VECTOR_PATHS: &[&[&str]] = &[
    &["roaming_dungeon_2_ids", WILDCARD, "s"],
    &["backgroundGroups", WILDCARD, "backgrounds"],
    &["backgroundGroups", WILDCARD, "background_table_entries"],
];

const FLOAT_VECTOR_PATHS: &[&[&str]] = &[
    &["map", "bounds"],
    &["areas", WILDCARD, "bounds"],
    &["areas", WILDCARD, "tiles", WILDCARD, "mappos"],
    &["areas", WILDCARD, "tiles", WILDCARD, "sidepos"],
];

fn matches_tail(pattern: &[&str], path: &[String]) -> bool {
    if pattern.len() > path.len() {
        return false;
    }
    let tail = &path[path.len() - pattern.len()..];
    pattern
        .iter()
        .zip(tail)
        .all(|(pat, component)| *pat == WILDCARD || pat == component)
}

pub fn by_hierarchy_path(path: &[String]) -> DataType {
    let table: &[(&[&[&str]], DataType)] = &[
        (FLOAT_PATHS, DataType::Float),
        (INT_VECTOR_PATHS, DataType::IntVector),
        (STRING_VECTOR_PATHS, DataType::StringVector),
        (FLOAT_VECTOR_PATHS, DataType::FloatVector),
    ];
    for (patterns, data_type) in table {
        if patterns.iter().any(|pattern| matches_tail(pattern, path)) {
            return *data_type;
        }
    }
    DataType::Unknown
}

// Stage 3: payload shape, decode only. Order matters: an eight-byte payload
// is tried as two_bool first, then as an embedded file, then as a string.
pub fn by_raw_payload(payload: &[u8]) -> DataType {
    let n = payload.len();
    if n == 1 {
        return if (0x20..=0x7e).contains(&payload[0]) {
            DataType::Char
        } else {
            DataType::Bool
        };
    }
    if n == 4 {
        return DataType::Int;
    }
    if n == 8 && is_two_bool_shape(payload) {
        return DataType::TwoBool;
    }
    if n >= 8 && payload[4..8] == header::MAGIC {
        return DataType::FileRaw;
    }
    if n >= 5 {
        return DataType::String;
    }
    DataType::Unknown
}

fn is_two_bool_shape(payload: &[u8]) -> bool {
    let half_ok = |half: &[u8]| half[0] <= 1 && half[1..4] == [0, 0, 0];
    half_ok(&payload[..4]) && half_ok(&payload[4..])
}

/// First non-unknown of the three stages.
pub fn resolve(name: &str, hierarchy_path: &[String], payload: &[u8]) -> DataType {
    let by_name = by_field_name(name);
    if by_name != DataType::Unknown {
        return by_name;
    }
    let by_path = by_hierarchy_path(hierarchy_path);
    if by_path != DataType::Unknown {
        return by_path;
    }
    by_raw_payload(payload)
}

/// Reverse-hash substitution on parsed integers. Absence in the table is
/// normal; presence retags the value so the JSON carries `###name` instead
/// of the raw hash.
pub fn dehash(data_type: DataType, value: Value) -> (DataType, Value) {
    match value {
        Value::Int(raw) => match hash::dehash(raw) {
            Some(name) => (DataType::String, Value::String(name)),
            None => (data_type, Value::Int(raw)),
        },
        Value::IntVector(items) => {
            let hits = items.iter().filter(|&&i| hash::lookup(i).is_some()).count();
            if hits == 0 {
                (data_type, Value::IntVector(items))
            } else if hits == items.len() {
                let names = items
                    .into_iter()
                    .map(|i| hash::dehash(i).expect("every element dehashes"))
                    .collect();
                (DataType::StringVector, Value::StringVector(names))
            } else {
                let mixed = items
                    .into_iter()
                    .map(|i| match hash::dehash(i) {
                        Some(name) => Hybrid::Name(name),
                        None => Hybrid::Int(i),
                    })
                    .collect();
                (DataType::HybridVector, Value::HybridVector(mixed))
            }
        }
        other => (data_type, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash_name;

    fn path(components: &[&str]) -> Vec<String> {
        components.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn name_table_hits() {
        assert_eq!(by_field_name("requirement_code"), DataType::Char);
        assert_eq!(by_field_name("current_hp"), DataType::Float);
        assert_eq!(by_field_name("m_Stress"), DataType::Float);
        assert_eq!(by_field_name("dispatched_events"), DataType::IntVector);
        assert_eq!(by_field_name("goal_ids"), DataType::StringVector);
        assert_eq!(by_field_name("killRange"), DataType::TwoInt);
        assert_eq!(by_field_name("anything_else"), DataType::Unknown);
    }

    #[test]
    fn path_patterns_match_the_tail() {
        assert_eq!(
            by_hierarchy_path(&path(&["base_root", "actor", "buff_group", "3", "amount"])),
            DataType::Float
        );
        assert_eq!(
            by_hierarchy_path(&path(&["mash", "valid_additional_mash_entry_indexes"])),
            DataType::IntVector
        );
        assert_eq!(
            by_hierarchy_path(&path(&["base_root", "map", "areas", "a1", "tiles", "t9", "mappos"])),
            DataType::FloatVector
        );
        assert_eq!(
            by_hierarchy_path(&path(&["base_root", "backgroundGroups", "g", "backgrounds"])),
            DataType::StringVector
        );
    }

    #[test]
    fn wildcard_spans_exactly_one_component() {
        assert_eq!(
            by_hierarchy_path(&path(&["actor", "buff_group", "a", "b", "amount"])),
            DataType::Unknown
        );
        assert_eq!(
            by_hierarchy_path(&path(&["actor", "buff_group", "amount"])),
            DataType::Unknown
        );
    }

    #[test]
    fn short_path_never_matches_longer_pattern() {
        assert_eq!(by_hierarchy_path(&path(&["bounds"])), DataType::Unknown);
    }

    #[test]
    fn payload_shapes() {
        assert_eq!(by_raw_payload(&[b'f']), DataType::Char);
        assert_eq!(by_raw_payload(&[0x01]), DataType::Bool);
        assert_eq!(by_raw_payload(&[0x1f]), DataType::Bool);
        assert_eq!(by_raw_payload(&[1, 2, 3, 4]), DataType::Int);
        assert_eq!(by_raw_payload(&[5, 0, 0, 0, b'a', b'b', b'c', b'd', 0]), DataType::String);
        assert_eq!(by_raw_payload(&[0, 0]), DataType::Unknown);
    }

    #[test]
    fn two_bool_discrimination() {
        assert_eq!(
            by_raw_payload(&[1, 0, 0, 0, 0, 0, 0, 0]),
            DataType::TwoBool
        );
        assert_eq!(
            by_raw_payload(&[1, 0, 0, 0, 0, 0, 0, 2]),
            DataType::String
        );
    }

    #[test]
    fn embedded_file_detection() {
        let mut payload = vec![64, 0, 0, 0];
        payload.extend_from_slice(&header::MAGIC);
        payload.extend_from_slice(&[0; 60]);
        assert_eq!(by_raw_payload(&payload), DataType::FileRaw);
    }

    #[test]
    fn dehash_retags_known_integers() {
        let (tag, value) = dehash(DataType::Int, Value::Int(hash_name("crusader")));
        assert_eq!(tag, DataType::String);
        assert_eq!(value, Value::String("###crusader".into()));

        let (tag, value) = dehash(DataType::Int, Value::Int(123456));
        assert_eq!(tag, DataType::Int);
        assert_eq!(value, Value::Int(123456));
    }

    #[test]
    fn dehash_splits_vectors_three_ways() {
        let all = vec![hash_name("crusader"), hash_name("vestal")];
        let (tag, _) = dehash(DataType::IntVector, Value::IntVector(all));
        assert_eq!(tag, DataType::StringVector);

        let none = vec![11, 22];
        let (tag, value) = dehash(DataType::IntVector, Value::IntVector(none.clone()));
        assert_eq!(tag, DataType::IntVector);
        assert_eq!(value, Value::IntVector(none));

        let some = vec![hash_name("crusader"), 22];
        let (tag, value) = dehash(DataType::IntVector, Value::IntVector(some));
        assert_eq!(tag, DataType::HybridVector);
        assert_eq!(
            value,
            Value::HybridVector(vec![
                Hybrid::Name("###crusader".into()),
                Hybrid::Int(22),
            ])
        );
    }
}
