//! # Cursor Strategies
//!
//! "Advance by N records" has two concrete meanings: raw record order, or
//! the key order of an index. The [`Skipper`] trait captures the operation;
//! [`LinearSkipper`] walks the table cursor directly, while [`MdxSkipper`]
//! drives an MDX tag cursor and reports the record numbers it lands on
//! without repositioning the table.

use crate::error::Result;
use crate::index::mdx::Mdx;
use crate::table::Dbf;

/// A pluggable relative-positioning strategy.
pub trait Skipper {
    /// Skips forwards (positive) or backwards (negative) by `offset`
    /// records, returning the record number arrived at. Running off either
    /// end returns the corresponding cursor sentinel. An offset of zero
    /// reports the current record number.
    fn skip(&mut self, offset: i64) -> Result<i64>;
}

/// Skips in physical record order by moving the table cursor.
pub struct LinearSkipper<'a> {
    dbf: &'a mut Dbf,
}

impl<'a> LinearSkipper<'a> {
    pub fn new(dbf: &'a mut Dbf) -> Self {
        Self { dbf }
    }
}

impl Skipper for LinearSkipper<'_> {
    fn skip(&mut self, offset: i64) -> Result<i64> {
        self.dbf.skip(offset)
    }
}

/// Skips in index key order by stepping an MDX tag cursor.
pub struct MdxSkipper<'a> {
    dbf: &'a Dbf,
    mdx: &'a mut Mdx,
}

impl<'a> MdxSkipper<'a> {
    /// Pairs a table with the MDX cursor that orders it. The MDX must have
    /// an active tag.
    pub fn new(dbf: &'a Dbf, mdx: &'a mut Mdx) -> Self {
        Self { dbf, mdx }
    }
}

impl Skipper for MdxSkipper<'_> {
    fn skip(&mut self, offset: i64) -> Result<i64> {
        if offset == 0 {
            return Ok(self.dbf.recno());
        }

        let mut landed = 0;
        if offset > 0 {
            for _ in 0..offset {
                landed = self.mdx.next()?;
                if landed <= 0 {
                    return Ok(landed);
                }
            }
        } else {
            for _ in 0..-offset {
                landed = self.mdx.prev()?;
                if landed <= 0 {
                    return Ok(landed);
                }
            }
        }
        Ok(landed)
    }
}
