//! String-keyed metadata, stored in the manifest using PHP's `serialize()`
//! representation of an array, e.g. `a:1:{s:7:"creator";s:4:"RAID";}`.
use alloc::collections::btree_map::{self, BTreeMap};
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::str;

use crate::Error;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Metadata {
    map: BTreeMap<String, String>,
}

impl Metadata {
    pub fn new() -> Metadata {
        Metadata::default()
    }

    /// Returns the previous value for `key`, if any
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.map.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.map.iter()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.map
    }

    /// Serialize as a PHP array of strings. Keys that PHP would store as
    /// integers are written as integers.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"a:");
        out.extend_from_slice(self.map.len().to_string().as_bytes());
        out.extend_from_slice(b":{");
        for (key, value) in self.map.iter() {
            if is_int_key(key) {
                out.extend_from_slice(b"i:");
                out.extend_from_slice(key.as_bytes());
                out.push(b';');
            } else {
                write_str(&mut out, key);
            }
            write_str(&mut out, value);
        }
        out.push(b'}');
        out
    }

    pub fn from_bytes(data: &[u8]) -> Result<Metadata, Error> {
        let mut cursor = Cursor { data, pos: 0 };
        cursor.expect(b"a:")?;
        let count = cursor.number(b':')?;
        cursor.expect(b"{")?;

        let mut map = BTreeMap::new();
        for _ in 0..count {
            let key = cursor.scalar()?;
            let value = cursor.scalar()?;
            map.insert(key, value);
        }
        cursor.expect(b"}")?;

        if cursor.pos != data.len() {
            return Err(Error::InvalidMetadata);
        }
        Ok(Metadata { map })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Metadata {
        Metadata {
            map: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl From<BTreeMap<String, String>> for Metadata {
    fn from(map: BTreeMap<String, String>) -> Metadata {
        Metadata { map }
    }
}

impl<'a> IntoIterator for &'a Metadata {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.map.iter()
    }
}

fn write_str(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(b"s:");
    out.extend_from_slice(s.len().to_string().as_bytes());
    out.extend_from_slice(b":\"");
    out.extend_from_slice(s.as_bytes());
    out.extend_from_slice(b"\";");
}

/// PHP turns canonical decimal strings into integer array keys
fn is_int_key(key: &str) -> bool {
    let digits = key.strip_prefix('-').unwrap_or(key);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return false;
    }
    if key == "-0" {
        return false;
    }
    key.parse::<i64>().is_ok()
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn expect(&mut self, token: &[u8]) -> Result<(), Error> {
        let end = self.pos.checked_add(token.len()).ok_or(Error::InvalidMetadata)?;
        if self.data.get(self.pos..end) != Some(token) {
            return Err(Error::InvalidMetadata);
        }
        self.pos = end;
        Ok(())
    }

    /// Read an unsigned decimal terminated by `end`, consuming the terminator
    fn number(&mut self, end: u8) -> Result<usize, Error> {
        let text = self.until(end)?;
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidMetadata);
        }
        text.parse().map_err(|_| Error::InvalidMetadata)
    }

    fn until(&mut self, end: u8) -> Result<&'a str, Error> {
        let rest = self.data.get(self.pos..).ok_or(Error::InvalidMetadata)?;
        let len = rest
            .iter()
            .position(|b| *b == end)
            .ok_or(Error::InvalidMetadata)?;
        let text = str::from_utf8(&rest[..len]).map_err(|_| Error::InvalidMetadata)?;
        self.pos += len + 1;
        Ok(text)
    }

    fn scalar(&mut self) -> Result<String, Error> {
        let tag = self.data.get(self.pos).copied().ok_or(Error::InvalidMetadata)?;
        match tag {
            b's' => {
                self.expect(b"s:")?;
                let len = self.number(b':')?;
                self.expect(b"\"")?;
                let end = self.pos.checked_add(len).ok_or(Error::InvalidMetadata)?;
                let bytes = self.data.get(self.pos..end).ok_or(Error::InvalidMetadata)?;
                let value = str::from_utf8(bytes).map_err(|_| Error::InvalidMetadata)?;
                self.pos = end;
                self.expect(b"\";")?;
                Ok(value.to_string())
            }
            b'i' => {
                self.expect(b"i:")?;
                let text = self.until(b';')?;
                text.parse::<i64>().map_err(|_| Error::InvalidMetadata)?;
                Ok(text.to_string())
            }
            _ => Err(Error::InvalidMetadata),
        }
    }
}
