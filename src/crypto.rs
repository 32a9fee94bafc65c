//! Block hashing for Montycoin
//!
//! Blocks are hashed over a canonical JSON rendering: object keys sorted by
//! name, `", "` and `": "` separators, non-ASCII characters escaped as
//! `\uXXXX`. Every node on the network must agree on these bytes, otherwise
//! `previous_hash` links computed by one node will not verify on another.

use crate::blockchain::Block;
use crate::error::{ChainError, Result};
use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};
use sha2::{Digest, Sha256};
use std::io;

/// Lower-case hex SHA-256 of arbitrary bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Canonical text of a block, the exact bytes fed to the block hash.
pub fn canonical_json(block: &Block) -> Result<String> {
    // serde_json::Map is a BTreeMap here, so keys come out sorted.
    let value = serde_json::to_value(block)?;
    let mut out = Vec::with_capacity(256);
    let mut ser = Serializer::with_formatter(&mut out, CanonicalFormatter);
    value.serialize(&mut ser)?;
    String::from_utf8(out).map_err(|e| ChainError::Serialization(e.to_string()))
}

/// Digest of a block's canonical encoding.
pub fn block_digest(block: &Block) -> Result<String> {
    Ok(sha256_hex(canonical_json(block)?.as_bytes()))
}

struct CanonicalFormatter;

impl Formatter for CanonicalFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        for ch in fragment.chars() {
            if (' '..='~').contains(&ch) {
                writer.write_all(&[ch as u8])?;
            } else {
                let mut units = [0u16; 2];
                for unit in ch.encode_utf16(&mut units).iter() {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}
