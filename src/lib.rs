//! Bidirectional codec between DSON (the proprietary binary save format of
//! a certain dungeon-crawling game) and an ordered-JSON text form. The two
//! directions are exact inverses: re-encoding decoded output reproduces the
//! source bytes, modulo one documented meaningless bit.

pub mod cursor;
pub mod decode;
pub mod encode;
pub mod error;
pub mod field;
pub mod hash;
pub mod header;
pub mod infer;
pub mod lhm;
pub mod meta1;
pub mod meta2;
pub mod subcommand;
pub mod tree;
pub mod types;

pub use error::{Error, Result};

/// Binary DSON ⇒ JSON text (ordered-map projection).
pub fn decode(input: &[u8]) -> Result<Vec<u8>> {
    decode::decode(input)
}

/// Binary DSON ⇒ JSON text of the full decoded structure, every inferred
/// field included. Diagnostic output; it does not round-trip.
pub fn decode_debug(input: &[u8]) -> Result<Vec<u8>> {
    decode::decode_debug(input)
}

/// JSON text ⇒ binary DSON.
pub fn encode(input: &[u8]) -> Result<Vec<u8>> {
    encode::encode(input)
}

/// True iff the prefix opens with the DSON magic number.
pub fn is_dson(prefix: &[u8]) -> bool {
    header::is_dson(prefix)
}
