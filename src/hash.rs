use std::collections::HashMap;
use std::sync::OnceLock;

/// Marks a JSON string as the dehashed spelling of an integer; the encoder
/// hashes the suffix back instead of emitting string bytes.
pub const DEHASH_PREFIX: &str = "###";

/// The name hash every meta2 entry carries, and the one hashed-integer
/// values are produced with. Signed 32-bit wrap-around is part of the
/// format: `plague_doctor` really is negative on disk.
pub fn hash_name(name: &str) -> i32 {
    name.bytes()
        .fold(0i32, |acc, b| acc.wrapping_mul(53).wrapping_add(b as i32))
}

static NAME_BY_HASH: OnceLock<HashMap<i32, &'static str>> = OnceLock::new();

fn name_table() -> &'static HashMap<i32, &'static str> {
    NAME_BY_HASH.get_or_init(|| {
        include_str!("names.txt")
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|name| (hash_name(name), name))
            .collect()
    })
}

/// Reverse lookup against the bundled identifier list. Absence is normal
/// (the integer stays numeric); only presence triggers retagging.
pub fn lookup(hash: i32) -> Option<&'static str> {
    name_table().get(&hash).copied()
}

/// The `###name` spelling for a known hash, if the table has it.
pub fn dehash(hash: i32) -> Option<String> {
    lookup(hash).map(|name| format!("{DEHASH_PREFIX}{name}"))
}
