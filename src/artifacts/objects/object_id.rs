//! Object identifier (SHA-1 digest)
//!
//! Every blob, tree and commit is identified by the SHA-1 hash of its
//! canonical encoding. The identifier is carried around as the
//! 40-character hexadecimal form and converted to the raw 20-byte form
//! only when serializing tree entries.

use crate::artifacts::objects::{OBJECT_ID_HEX_LENGTH, OBJECT_ID_RAW_LENGTH};
use std::io;
use std::path::PathBuf;

/// Content digest identifying an object in a store
///
/// A validated 40-character hexadecimal string. The digest of an object is
/// computed over its canonical encoding, so equal digests imply
/// byte-identical objects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ObjectId(String);

impl ObjectId {
    /// Parse and validate an object ID from its hexadecimal form
    pub fn try_parse(id: String) -> anyhow::Result<Self> {
        if id.len() != OBJECT_ID_HEX_LENGTH {
            return Err(anyhow::anyhow!("invalid object ID length: {}", id.len()));
        }
        if !id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(anyhow::anyhow!("invalid object ID characters: {}", id));
        }
        Ok(Self(id.to_lowercase()))
    }

    /// Write the digest in raw binary form (20 bytes)
    ///
    /// Used when serializing tree entries, which reference their children
    /// by raw digest rather than by hexadecimal string.
    pub fn write_raw_to<W: io::Write>(&self, writer: &mut W) -> anyhow::Result<()> {
        for i in (0..OBJECT_ID_HEX_LENGTH).step_by(2) {
            let byte = u8::from_str_radix(&self.0[i..i + 2], 16)
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "invalid hex digit"))?;
            writer.write_all(&[byte])?;
        }

        Ok(())
    }

    /// Read a digest from raw binary form (20 bytes)
    pub fn read_raw_from<R: io::Read + ?Sized>(reader: &mut R) -> anyhow::Result<Self> {
        let mut raw = [0u8; OBJECT_ID_RAW_LENGTH];
        reader.read_exact(&mut raw)?;

        let mut hex = String::with_capacity(OBJECT_ID_HEX_LENGTH);
        for byte in raw {
            hex.push_str(&format!("{:02x}", byte));
        }

        Self::try_parse(hex)
    }

    /// Convert to the store path `ab/cdef...` (first two characters as the
    /// fan-out directory)
    pub fn to_path(&self) -> PathBuf {
        let (dir, file) = self.0.split_at(2);
        PathBuf::from(dir).join(file)
    }

    /// Abbreviated form (first 7 characters), for log output
    pub fn to_short_oid(&self) -> String {
        self.0.split_at(7).0.to_string()
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_valid_hex_digest() {
        let id = "a".repeat(40);
        assert!(ObjectId::try_parse(id).is_ok());
    }

    #[test]
    fn parse_rejects_wrong_length_and_non_hex() {
        assert!(ObjectId::try_parse("abc".to_string()).is_err());
        assert!(ObjectId::try_parse("g".repeat(40)).is_err());
    }

    #[test]
    fn raw_round_trip_preserves_digest() {
        let id = ObjectId::try_parse("0123456789abcdef0123456789abcdef01234567".to_string())
            .expect("valid digest");

        let mut raw = Vec::new();
        id.write_raw_to(&mut raw).expect("write raw");
        assert_eq!(raw.len(), OBJECT_ID_RAW_LENGTH);

        let back = ObjectId::read_raw_from(&mut raw.as_slice()).expect("read raw");
        assert_eq!(back, id);
    }

    #[test]
    fn store_path_uses_two_character_fanout() {
        let id = ObjectId::try_parse("0123456789abcdef0123456789abcdef01234567".to_string())
            .expect("valid digest");
        assert_eq!(id.to_path(), PathBuf::from("01").join("23456789abcdef0123456789abcdef01234567"));
    }
}
