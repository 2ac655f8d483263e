//! # B+-Tree Index Readers
//!
//! Read-side support for the two index file shapes of the dBase family:
//!
//! - [`ndx`]: the single-key NDX file, one B+-tree in 512-byte nodes.
//! - [`mdx`]: the multi-tag MDX container, packing up to 48 independent
//!   B+-trees ("tags") into one file, with nodes spanning one or more
//!   512-byte blocks.
//!
//! Both resolve a key to a DBF *record number* that callers feed to the
//! table cursor, and both return [`RECORD_NUMBER_EOF`] when a lookup finds
//! no match. Index maintenance (inserting or deleting keys) is out of
//! scope; these are readers.
//!
//! [`RECORD_NUMBER_EOF`]: crate::table::RECORD_NUMBER_EOF

use std::cmp::Ordering;

use smallvec::SmallVec;

use crate::date::Date;
use crate::error::{Result, XbaseError};

pub mod mdx;
pub mod ndx;

/// The data type a tag or index file carries, as stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexDataType {
    Character = 0,
    Numeric = 1,
    Date = 2,
}

impl IndexDataType {
    /// Maps the on-disk numeric type code.
    pub fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            0 => Some(IndexDataType::Character),
            1 => Some(IndexDataType::Numeric),
            2 => Some(IndexDataType::Date),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            IndexDataType::Character => "CHARACTER",
            IndexDataType::Numeric => "NUMERIC",
            IndexDataType::Date => "DATE",
        }
    }
}

/// A lookup key, as accepted by `find` on either index shape.
///
/// Dates participate as their `DTOS()` character rendering, matching how
/// date tags are stored on disk.
#[derive(Debug, Clone)]
pub enum SearchKey {
    Text(String),
    Number(f64),
    Date(Date),
}

impl SearchKey {
    /// The key as character bytes right-padded with spaces to `key_length`.
    pub(crate) fn character_bytes(&self, key_length: usize) -> SmallVec<[u8; 32]> {
        let rendered;
        let text: &str = match self {
            SearchKey::Text(s) => s,
            SearchKey::Date(d) => {
                rendered = d.dtos();
                &rendered
            }
            SearchKey::Number(n) => {
                rendered = n.to_string();
                &rendered
            }
        };
        let mut padded: SmallVec<[u8; 32]> = SmallVec::from_slice(text.as_bytes());
        while padded.len() < key_length {
            padded.push(b' ');
        }
        padded
    }

    /// The key as a double, failing for non-numeric keys.
    pub(crate) fn numeric(&self) -> Result<f64> {
        match self {
            SearchKey::Number(n) => Ok(*n),
            SearchKey::Text(s) => s.trim().parse::<f64>().map_err(|_| {
                XbaseError::invalid(format!("search key {s:?} is not numeric"))
            }),
            SearchKey::Date(_) => Err(XbaseError::invalid(
                "date search key used against a numeric index",
            )),
        }
    }
}

impl From<&str> for SearchKey {
    fn from(s: &str) -> Self {
        SearchKey::Text(s.to_owned())
    }
}

impl From<String> for SearchKey {
    fn from(s: String) -> Self {
        SearchKey::Text(s)
    }
}

impl From<f64> for SearchKey {
    fn from(n: f64) -> Self {
        SearchKey::Number(n)
    }
}

impl From<i64> for SearchKey {
    fn from(n: i64) -> Self {
        SearchKey::Number(n as f64)
    }
}

impl From<i32> for SearchKey {
    fn from(n: i32) -> Self {
        SearchKey::Number(f64::from(n))
    }
}

impl From<Date> for SearchKey {
    fn from(d: Date) -> Self {
        SearchKey::Date(d)
    }
}

/// Compares a stored character key (null-trimmed) with an already padded
/// search key, byte-wise.
pub(crate) fn compare_character(stored: &[u8], padded_search: &[u8]) -> Ordering {
    stored.cmp(padded_search)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn character_bytes_pad_to_key_length() {
        let key = SearchKey::from("abc");
        assert_eq!(key.character_bytes(6).as_slice(), b"abc   ");
        assert_eq!(key.character_bytes(2).as_slice(), b"abc");
    }

    #[test]
    fn dates_render_as_dtos() {
        let key = SearchKey::from(Date::new(5, 18, 2012));
        assert_eq!(key.character_bytes(10).as_slice(), b"20120518  ");
    }

    #[test]
    fn numeric_coercions() {
        assert_eq!(SearchKey::from(15i32).numeric().unwrap(), 15.0);
        assert_eq!(SearchKey::from("12.5").numeric().unwrap(), 12.5);
        assert!(SearchKey::from(Date::BLANK).numeric().is_err());
    }

    #[test]
    fn data_type_codes() {
        assert_eq!(IndexDataType::from_raw(0), Some(IndexDataType::Character));
        assert_eq!(IndexDataType::from_raw(1), Some(IndexDataType::Numeric));
        assert_eq!(IndexDataType::from_raw(2), Some(IndexDataType::Date));
        assert_eq!(IndexDataType::from_raw(9), None);
    }
}
