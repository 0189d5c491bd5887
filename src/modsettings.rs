//! Provides a minimal reader/writer for Factorio's property-tree binary format, the structure
//! backing both `mod-settings.dat` and the mod list embedded in a save file (§10.G).
//!
//! The full grammar covers settings this program never needs to interpret (per-mod startup
//! settings, runtime settings, map generation data); what's implemented here is the node shape
//! itself plus enough of the top-level layout to pull a save's mod list back out, not a complete
//! settings editor.

use std::convert::TryInto;
use std::io::{self, Read, Write};

/// One node of a Factorio property tree.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyTree {
    /// The `none` node kind; carries no value.
    None,
    /// A boolean leaf.
    Bool(bool),
    /// A floating-point leaf. Factorio encodes all numbers, integer or not, as `f64`.
    Number(f64),
    /// A UTF-8 string leaf.
    String(String),
    /// An ordered list of nodes. Each element is internally paired with an (almost always empty)
    /// string key, which this type discards on read and re-emits as empty on write.
    List(Vec<PropertyTree>),
    /// An ordered key/value mapping. Order is preserved across read/write round-trips.
    Dictionary(Vec<(String, PropertyTree)>),
}

/// Type tags as they appear on the wire, preceding every node's payload.
mod tag {
    pub const NONE: u8 = 0;
    pub const BOOL: u8 = 1;
    pub const NUMBER: u8 = 2;
    pub const STRING: u8 = 3;
    pub const LIST: u8 = 4;
    pub const DICTIONARY: u8 = 5;
}

impl PropertyTree {
    /// Parses a property tree from its binary encoding.
    pub fn read(bytes: &[u8]) -> io::Result<Self> {
        let mut cursor = io::Cursor::new(bytes);
        Self::read_node(&mut cursor)
    }

    /// Serializes this tree back to its binary encoding.
    pub fn write(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_node(&mut out).expect("writing to a Vec never fails");
        out
    }

    fn read_node<R: Read>(r: &mut R) -> io::Result<Self> {
        let kind = read_u8(r)?;
        // the "any type" flag; always present, never meaningfully used by this program.
        let _any_type = read_u8(r)?;

        match kind {
            tag::NONE => Ok(PropertyTree::None),
            tag::BOOL => Ok(PropertyTree::Bool(read_u8(r)? != 0)),
            tag::NUMBER => Ok(PropertyTree::Number(read_f64(r)?)),
            tag::STRING => Ok(PropertyTree::String(read_string(r)?)),
            tag::LIST => {
                let count = read_u32(r)?;
                let mut items = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    let _key = read_string(r)?;
                    items.push(Self::read_node(r)?);
                }
                Ok(PropertyTree::List(items))
            }
            tag::DICTIONARY => {
                let count = read_u32(r)?;
                let mut entries = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    let key = read_string(r)?;
                    entries.push((key, Self::read_node(r)?));
                }
                Ok(PropertyTree::Dictionary(entries))
            }
            other => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unknown property tree node tag {}", other),
            )),
        }
    }

    fn write_node<W: Write>(&self, w: &mut W) -> io::Result<()> {
        match self {
            PropertyTree::None => {
                w.write_all(&[tag::NONE, 0])?;
            }
            PropertyTree::Bool(v) => {
                w.write_all(&[tag::BOOL, 0, u8::from(*v)])?;
            }
            PropertyTree::Number(v) => {
                w.write_all(&[tag::NUMBER, 0])?;
                w.write_all(&v.to_le_bytes())?;
            }
            PropertyTree::String(v) => {
                w.write_all(&[tag::STRING, 0])?;
                write_string(w, v)?;
            }
            PropertyTree::List(items) => {
                w.write_all(&[tag::LIST, 0])?;
                w.write_all(&(items.len() as u32).to_le_bytes())?;
                for item in items {
                    write_string(w, "")?;
                    item.write_node(w)?;
                }
            }
            PropertyTree::Dictionary(entries) => {
                w.write_all(&[tag::DICTIONARY, 0])?;
                w.write_all(&(entries.len() as u32).to_le_bytes())?;
                for (key, value) in entries {
                    write_string(w, key)?;
                    value.write_node(w)?;
                }
            }
        }
        Ok(())
    }

    /// Looks up a key in this node if it's a [`Dictionary`](PropertyTree::Dictionary).
    pub fn get(&self, key: &str) -> Option<&PropertyTree> {
        match self {
            PropertyTree::Dictionary(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Returns the items of this node if it's a [`List`](PropertyTree::List).
    pub fn as_list(&self) -> Option<&[PropertyTree]> {
        match self {
            PropertyTree::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns this node's string value, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyTree::String(s) => Some(s),
            _ => None,
        }
    }
}

fn read_u8<R: Read>(r: &mut R) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u32<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_f64<R: Read>(r: &mut R) -> io::Result<f64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

/// Reads a Factorio "space-optimized" string: an empty flag byte, then (if non-empty) a length
/// that's either a single byte or, when that byte is `0xff`, a following little-endian `u32`,
/// then that many UTF-8 bytes.
fn read_string<R: Read>(r: &mut R) -> io::Result<String> {
    let empty = read_u8(r)?;
    if empty != 0 {
        return Ok(String::new());
    }

    let short_len = read_u8(r)?;
    let len = if short_len == 0xff { read_u32(r)? } else { u32::from(short_len) };

    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn write_string<W: Write>(w: &mut W, s: &str) -> io::Result<()> {
    if s.is_empty() {
        return w.write_all(&[1]);
    }

    w.write_all(&[0])?;
    let bytes = s.as_bytes();
    let len: u32 = bytes
        .len()
        .try_into()
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "string too long to encode"))?;

    if len < 0xff {
        w.write_all(&[len as u8])?;
    } else {
        w.write_all(&[0xff])?;
        w.write_all(&len.to_le_bytes())?;
    }
    w.write_all(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_scalar_nodes() {
        for node in [
            PropertyTree::None,
            PropertyTree::Bool(true),
            PropertyTree::Bool(false),
            PropertyTree::Number(3.5),
            PropertyTree::String("hello".to_string()),
            PropertyTree::String(String::new()),
        ] {
            let bytes = node.write();
            assert_eq!(PropertyTree::read(&bytes).unwrap(), node);
        }
    }

    #[test]
    fn round_trips_nested_structure() {
        let tree = PropertyTree::Dictionary(vec![
            ("name".to_string(), PropertyTree::String("angelsindustries".to_string())),
            (
                "versions".to_string(),
                PropertyTree::List(vec![PropertyTree::String("0.18.3".to_string()), PropertyTree::Number(1.0)]),
            ),
        ]);

        let bytes = tree.write();
        let parsed = PropertyTree::read(&bytes).unwrap();
        assert_eq!(parsed, tree);
        assert_eq!(parsed.get("name").and_then(PropertyTree::as_str), Some("angelsindustries"));
    }

    #[test]
    fn long_string_uses_extended_length_encoding() {
        let long = "x".repeat(1000);
        let node = PropertyTree::String(long.clone());
        let bytes = node.write();
        assert_eq!(PropertyTree::read(&bytes).unwrap(), PropertyTree::String(long));
    }
}
