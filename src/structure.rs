//! # Table Structure
//!
//! [`TableStructure`] is the in-memory mirror of a DBF header: the ordered
//! field list plus the scalar metadata parsed from (or destined for) the
//! 32-byte header. It is a plain container; all file I/O lives in the table
//! engine.
//!
//! ## Invariants
//!
//! - `header_length = 32 + 32 · field_count + 1`
//! - `record_length = 1 + Σ field.length` (the deletion flag byte)
//!
//! Both are recomputed by [`calculate_lengths`](TableStructure::calculate_lengths)
//! before a create writes the header.

use std::fmt;

use crate::date::Date;
use crate::error::{Result, XbaseError};
use crate::field::Field;

/// Header-derived table metadata and the ordered field list.
#[derive(Debug, Clone, Default)]
pub struct TableStructure {
    fields: Vec<Field>,
    /// Length of the header area in bytes, including the terminator.
    pub header_length: u16,
    /// Length of one record in bytes, including the deletion flag.
    pub record_length: u16,
    /// Number of records in the table.
    pub record_count: u32,
    /// Date of the last modification, from header bytes 1..4.
    pub last_updated: Date,
    /// Whether a DBT memo file is paired with the table (signature bit 7).
    pub dbt_paired: bool,
    /// Whether a production MDX is paired with the table (header byte 28).
    pub mdx_paired: bool,
    /// Memo-existence flag (signature bit 3).
    pub memo_exists: bool,
    /// Transaction flag (header byte 14); preserved, not interpreted.
    pub transaction_active: bool,
    /// Encryption flag (header byte 15); preserved, not interpreted.
    pub data_encrypted: bool,
}

impl TableStructure {
    /// Builds a structure from a field list, rejecting duplicate names.
    pub fn new(fields: Vec<Field>) -> Result<Self> {
        for (i, field) in fields.iter().enumerate() {
            if fields[..i].iter().any(|f| f.name() == field.name()) {
                return Err(XbaseError::invalid(format!(
                    "duplicate field name {}",
                    field.name()
                )));
            }
        }
        Ok(Self {
            fields,
            ..Self::default()
        })
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// The field at a zero-based index.
    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// Zero-based index of the field with the given name, compared without
    /// regard to case.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.name().eq_ignore_ascii_case(name))
    }

    pub(crate) fn fields_mut(&mut self) -> &mut Vec<Field> {
        &mut self.fields
    }

    /// Recomputes `record_length` and `header_length` from the field list.
    /// Called before a create writes the structure to disk.
    pub fn calculate_lengths(&mut self) {
        let mut record_length: u32 = 1;
        for field in &self.fields {
            record_length += field.length();
        }
        self.record_length = record_length as u16;
        self.header_length = (32 + 32 * self.fields.len() + 1) as u16;
    }
}

impl fmt::Display for TableStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "----------------------------------")?;
        writeln!(f, "Last Updated: {}", self.last_updated)?;
        writeln!(f, "Records: {}", self.record_count)?;
        writeln!(f, "  #       Name   Len Dec Type")?;
        for (number, field) in self.fields.iter().enumerate() {
            writeln!(
                f,
                "{:3} {:>10} {:5} {:3} {}",
                number + 1,
                field.name(),
                field.length(),
                field.decimals(),
                field.field_type().full_name()
            )?;
        }
        write!(f, "----------------------------------")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;

    fn sample_fields() -> Vec<Field> {
        vec![
            Field::new("NAME", FieldType::Character, 20, 0),
            Field::new("AGE", FieldType::Numeric, 3, 0),
            Field::new("NOTES", FieldType::Memo, 10, 0),
        ]
    }

    #[test]
    fn lengths_follow_the_header_invariants() {
        let mut structure = TableStructure::new(sample_fields()).unwrap();
        structure.calculate_lengths();
        assert_eq!(structure.record_length, 1 + 20 + 3 + 10);
        assert_eq!(structure.header_length, 32 + 32 * 3 + 1);
    }

    #[test]
    fn duplicate_field_names_are_rejected() {
        let fields = vec![
            Field::new("NAME", FieldType::Character, 20, 0),
            Field::new("name", FieldType::Character, 5, 0),
        ];
        assert!(matches!(
            TableStructure::new(fields).unwrap_err(),
            XbaseError::InvalidArgument(_)
        ));
    }

    #[test]
    fn field_lookup_ignores_case() {
        let structure = TableStructure::new(sample_fields()).unwrap();
        assert_eq!(structure.field_index("age"), Some(1));
        assert_eq!(structure.field_index("AGE"), Some(1));
        assert_eq!(structure.field_index("MISSING"), None);
    }

    #[test]
    fn display_lists_fields_in_order() {
        let structure = TableStructure::new(sample_fields()).unwrap();
        let listing = structure.to_string();
        assert!(listing.contains("NAME"));
        assert!(listing.contains("Character"));
        assert!(listing.contains("Memo"));
        let name_at = listing.find("NAME").unwrap();
        let age_at = listing.find("AGE").unwrap();
        assert!(name_at < age_at);
    }
}
