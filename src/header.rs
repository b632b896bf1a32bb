use crate::cursor::{Reader, Writer};
use crate::error::{Error, Result};
use crate::meta1;
use crate::meta2;
use serde::Serialize;

pub const MAGIC: [u8; 4] = [0x01, 0xb1, 0x00, 0x00];
pub const HEADER_SIZE: usize = 64;

/// Fixed-size file header. The on-disk record is 64 bytes; the zero-filler
/// regions between fields are not represented, they are skipped on decode
/// and written back as literal zeros on encode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    pub revision: i32,
    pub header_length: i32,
    pub meta1_size: i32,
    pub num_meta1_entries: i32,
    pub meta1_offset: i32,
    pub num_meta2_entries: i32,
    pub meta2_offset: i32,
    pub data_length: i32,
    pub data_offset: i32,
}

/// True iff the first four bytes carry the DSON magic number.
pub fn is_dson(prefix: &[u8]) -> bool {
    prefix.len() >= 4 && prefix[..4] == MAGIC
}

impl Header {
    /// Derive a complete header from the encode-side layout counts.
    pub fn from_layout(
        revision: i32,
        num_meta1_entries: i32,
        num_meta2_entries: i32,
        data_length: i32,
    ) -> Self {
        let meta1_size = num_meta1_entries * meta1::ENTRY_SIZE as i32;
        let meta1_offset = HEADER_SIZE as i32;
        let meta2_offset = meta1_offset + meta1_size;
        let data_offset = meta2_offset + num_meta2_entries * meta2::ENTRY_SIZE as i32;
        Self {
            revision,
            header_length: HEADER_SIZE as i32,
            meta1_size,
            num_meta1_entries,
            meta1_offset,
            num_meta2_entries,
            meta2_offset,
            data_length,
            data_offset,
        }
    }

    pub fn decode(reader: &mut Reader) -> Result<Self> {
        let magic = reader.read_bytes(4)?;
        if magic != MAGIC {
            return Err(Error::InvalidMagic {
                expected: MAGIC,
                got: magic.to_vec(),
            });
        }

        let revision = reader.read_i32()?;
        let header_length = reader.read_i32()?;
        reader.skip(4)?;
        let meta1_size = reader.read_i32()?;
        let num_meta1_entries = reader.read_i32()?;
        let meta1_offset = reader.read_i32()?;
        reader.skip(8)?;
        reader.skip(8)?;
        let num_meta2_entries = reader.read_i32()?;
        let meta2_offset = reader.read_i32()?;
        reader.skip(4)?;
        let data_length = reader.read_i32()?;
        let data_offset = reader.read_i32()?;

        Ok(Self {
            revision,
            header_length,
            meta1_size,
            num_meta1_entries,
            meta1_offset,
            num_meta2_entries,
            meta2_offset,
            data_length,
            data_offset,
        })
    }

    pub fn encode(&self, writer: &mut Writer) {
        writer.write_bytes(&MAGIC);
        writer.write_i32(self.revision);
        writer.write_i32(self.header_length);
        writer.write_zeros(4);
        writer.write_i32(self.meta1_size);
        writer.write_i32(self.num_meta1_entries);
        writer.write_i32(self.meta1_offset);
        writer.write_zeros(8);
        writer.write_zeros(8);
        writer.write_i32(self.num_meta2_entries);
        writer.write_i32(self.meta2_offset);
        writer.write_zeros(4);
        writer.write_i32(self.data_length);
        writer.write_i32(self.data_offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_is_64_bytes_and_decodes_back() {
        let header = Header::from_layout(12345, 2, 10, 256);
        let mut writer = Writer::new();
        header.encode(&mut writer);
        let bytes = writer.into_bytes();
        assert_eq!(bytes.len(), HEADER_SIZE);

        let decoded = Header::decode(&mut Reader::new(&bytes)).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(decoded.revision, 12345);
        assert_eq!(decoded.meta1_size, 32);
        assert_eq!(decoded.meta1_offset, 64);
        assert_eq!(decoded.meta2_offset, 96);
        assert_eq!(decoded.data_offset, 96 + 120);
        assert_eq!(decoded.data_length, 256);
    }

    #[test]
    fn data_offset_matches_layout_invariant() {
        let header = Header::from_layout(1, 3, 7, 99);
        assert_eq!(
            header.data_offset,
            header.header_length + header.meta1_size + 12 * header.num_meta2_entries
        );
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = vec![0u8; HEADER_SIZE];
        bytes[0] = 0x50;
        let err = Header::decode(&mut Reader::new(&bytes)).unwrap_err();
        assert!(matches!(err, Error::InvalidMagic { .. }));
    }

    #[test]
    fn magic_sniffing() {
        assert!(is_dson(&[0x01, 0xb1, 0x00, 0x00, 0xff]));
        assert!(!is_dson(&[0x01, 0xb1]));
        assert!(!is_dson(b"{\n  \"a\""));
    }
}
