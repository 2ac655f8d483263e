//! # xbase: dBase III/IV Table Driver
//!
//! A read/write driver for the dBase family of on-disk table files (DBF)
//! and their side files: DBT memo stores for variable-length text and
//! binary payloads, and the NDX and MDX B+-tree index formats.
//!
//! ## Quick Start
//!
//! ```ignore
//! use xbase::{Config, Dbf, Field, FieldType, TableStructure};
//!
//! let config = Config::default();
//! let structure = TableStructure::new(vec![
//!     Field::new("NAME", FieldType::Character, 20, 0),
//!     Field::new("BALANCE", FieldType::Numeric, 10, 2),
//! ])?;
//!
//! let mut dbf = Dbf::create("accounts.dbf", structure, config.clone())?;
//! dbf.append_blank()?;
//! dbf.replace("NAME", "Ada")?;
//! dbf.replace("BALANCE", 125.50)?;
//!
//! let mut dbf = Dbf::open("accounts.dbf", config)?;
//! dbf.goto_record(1)?;
//! assert_eq!(dbf.get_string("NAME")?, "Ada");
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +------------------------------------+
//! |        Dbf (cursor, records)       |
//! +------------------+-----------------+
//! | memo (DBT store) | index (NDX/MDX) |
//! +------------------+-----------------+
//! |  codec / lock / config / error     |
//! +------------------------------------+
//! ```
//!
//! - [`table`]: the DBF record cursor: open/create, decode, replace,
//!   delete/undelete, append.
//! - [`memo`]: the DBT block store memo fields delegate to.
//! - [`index`]: read-side NDX and MDX B+-trees; lookups return DBF record
//!   numbers for [`Dbf::goto_record`].
//! - [`skipper`]: relative positioning in record order or index order.
//! - [`date`], [`field`], [`structure`], [`value`]: the data model.
//! - [`codec`], [`lock`], [`config`], [`error`]: the byte-level and
//!   concurrency substrate.
//!
//! ## Cursor Sentinels
//!
//! Record numbers are 1-based. [`RECORD_NUMBER_BOF`] (0) and
//! [`RECORD_NUMBER_EOF`] (−1) are both cursor states and the "no match" /
//! "ran off the end" returns of index lookups and traversal.
//!
//! ## Concurrency
//!
//! Handles are single-threaded unless `Config::thread_safety` arms the
//! per-handle reentrant lock. Cross-process coordination uses advisory
//! byte-range locks armed by `Config::file_locking`. Never open the same
//! table twice within one process; POSIX region locks are per-process and
//! the two handles would release each other's locks.
//!
//! ## Out of Scope
//!
//! Index maintenance (NDX/MDX writes), multi-record transactions, recovery
//! from partial writes, and encryption (the header flag is preserved,
//! nothing more).

pub mod codec;
pub mod config;
pub mod date;
pub mod error;
pub mod field;
pub mod index;
pub mod lock;
pub mod memo;
pub mod skipper;
pub mod structure;
pub mod table;
pub mod value;

pub use config::Config;
pub use date::Date;
pub use error::{Result, XbaseError};
pub use field::{Field, FieldType};
pub use index::mdx::{Mdx, Tag};
pub use index::ndx::Ndx;
pub use index::{IndexDataType, SearchKey};
pub use lock::HandleLock;
pub use skipper::{LinearSkipper, MdxSkipper, Skipper};
pub use structure::TableStructure;
pub use table::{Dbf, FieldSelector, RECORD_NUMBER_BOF, RECORD_NUMBER_EOF};
pub use value::Value;
