//! # NDX Single-Index Reader
//!
//! An NDX file holds one B+-tree over fixed 512-byte pages. Page zero is the
//! header; every other page is a tree node.
//!
//! ## Header (page 0)
//!
//! ```text
//! Offset  Size  Description
//! 0       4     Root page number (u32 LE)
//! 4       4     Total pages (u32 LE)
//! 8       4     Reserved
//! 12      2     Key length in bytes
//! 14      2     Keys per page
//! 16      2     Data type: 0 character, 1 numeric, 2 date
//! 18      2     Key record size; must equal ceil(len/4)*4 + 8
//! 20      2     Reserved
//! 22      2     Unique flag
//! 24      ...   Key source expression, null terminated ASCII
//! ```
//!
//! ## Node pages
//!
//! Bytes 0..4 hold the number of keys in the page, followed by key records
//! of the asserted size. Within key record `i`: bytes 0..4 the next-page
//! pointer (zero marks a leaf entry), bytes 4..8 the DBF record number
//! (meaningful at leaf entries), then the key bytes, null terminated when
//! shorter than the padded width.
//!
//! A lookup walks each page in key order and, at the first stored key
//! comparing greater than or equal to the search key, either returns the
//! entry's record number (leaf entry) or descends into its child page.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use tracing::debug;
use zerocopy::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::codec;
use crate::config::Config;
use crate::error::{Result, XbaseError};
use crate::index::{compare_character, IndexDataType, SearchKey};
use crate::lock::HandleLock;
use crate::table::RECORD_NUMBER_EOF;

/// NDX node and header size; pages and blocks coincide for NDX.
pub const PAGE_SIZE: usize = 512;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct NdxHeader {
    start_page: U32,
    total_pages: U32,
    reserved1: [u8; 4],
    key_length: U16,
    keys_per_page: U16,
    data_type: U16,
    key_record_size: U16,
    reserved2: [u8; 2],
    unique: U16,
}

const _: () = assert!(std::mem::size_of::<NdxHeader>() == 24);

/// An open NDX index file.
#[derive(Debug)]
pub struct Ndx {
    path: PathBuf,
    file: File,
    lock: HandleLock,
    buf: [u8; PAGE_SIZE],

    start_page: u32,
    total_pages: u32,
    key_length: u16,
    keys_per_page: u16,
    data_type: IndexDataType,
    unique: bool,
    key_expression: String,

    page_number: u32,
}

impl Ndx {
    /// Opens an NDX file with its own handle lock.
    pub fn open(path: impl AsRef<Path>, config: &Config) -> Result<Ndx> {
        let lock = HandleLock::new(config.thread_safety);
        Self::open_with_lock(path, config, lock)
    }

    /// Opens an NDX file sharing the caller's handle lock, typically the one
    /// owned by the DBF this index belongs to.
    pub fn open_with_lock(path: impl AsRef<Path>, config: &Config, lock: HandleLock) -> Result<Ndx> {
        let path = path.as_ref().to_path_buf();
        let mut options = OpenOptions::new();
        options.read(true).write(true);
        if config.synchronous_writes {
            options.custom_flags(libc::O_SYNC);
        }
        let file = options.open(&path)?;

        let mut ndx = Ndx {
            path,
            file,
            lock,
            buf: [0u8; PAGE_SIZE],
            start_page: 0,
            total_pages: 0,
            key_length: 0,
            keys_per_page: 0,
            data_type: IndexDataType::Character,
            unique: false,
            key_expression: String::new(),
            page_number: 0,
        };
        ndx.read_structure()?;
        debug!(path = %ndx.path.display(), key = %ndx.key_expression, "opened NDX");
        Ok(ndx)
    }

    fn read_structure(&mut self) -> Result<()> {
        let _guard = self.lock.acquire();

        let mut raw = [0u8; PAGE_SIZE];
        codec::read_exact_at(&self.file, &mut raw, 0, "NDX header")?;

        let header = NdxHeader::ref_from_bytes(&raw[..std::mem::size_of::<NdxHeader>()])
            .map_err(|e| XbaseError::corrupt(format!("unreadable NDX header: {e:?}")))?;

        self.start_page = header.start_page.get();
        self.total_pages = header.total_pages.get();
        self.key_length = header.key_length.get();
        self.keys_per_page = header.keys_per_page.get();
        self.data_type = IndexDataType::from_raw(header.data_type.get()).ok_or_else(|| {
            XbaseError::unsupported("NDX data type", header.data_type.get().to_string())
        })?;

        let asserted = header.key_record_size.get();
        let computed = self.key_record_size() as u16;
        if asserted != computed {
            return Err(XbaseError::corrupt(format!(
                "NDX key record size {asserted} disagrees with computed {computed}"
            )));
        }

        self.unique = header.unique.get() != 0;
        self.key_expression =
            String::from_utf8_lossy(codec::null_terminated(&raw[24..])).into_owned();
        Ok(())
    }

    /// Key record size in bytes: the key padded to a 4-byte multiple plus
    /// the two u32 pointers.
    fn key_record_size(&self) -> usize {
        (self.key_length as usize).div_ceil(4) * 4 + 8
    }

    pub fn key_length(&self) -> u16 {
        self.key_length
    }

    pub fn data_type(&self) -> IndexDataType {
        self.data_type
    }

    pub fn unique(&self) -> bool {
        self.unique
    }

    /// The source expression this index was built over.
    pub fn key_expression(&self) -> &str {
        &self.key_expression
    }

    /// Moves to the given page, re-reading only when it differs from the
    /// currently buffered one. Page numbers start at 1.
    pub fn goto_page(&mut self, page_number: u32) -> Result<()> {
        if self.page_number != page_number {
            self.page_number = page_number;
            self.read_page()?;
        }
        Ok(())
    }

    /// Re-reads the current page into the node buffer.
    pub fn read_page(&mut self) -> Result<()> {
        if self.page_number == 0 {
            return Err(XbaseError::invalid(format!(
                "invalid page number: {}",
                self.page_number
            )));
        }
        let offset = u64::from(self.page_number) * PAGE_SIZE as u64;
        codec::read_exact_at(&self.file, &mut self.buf, offset, "NDX page")?;
        Ok(())
    }

    fn keys_in_page(&self) -> u32 {
        u32::from_le_bytes([self.buf[0], self.buf[1], self.buf[2], self.buf[3]])
    }

    fn u32_at(&self, offset: usize) -> u32 {
        u32::from_le_bytes([
            self.buf[offset],
            self.buf[offset + 1],
            self.buf[offset + 2],
            self.buf[offset + 3],
        ])
    }

    /// Next-page pointer of key `i`; zero marks a leaf entry.
    fn next_page(&self, i: usize) -> u32 {
        self.u32_at(4 + i * self.key_record_size())
    }

    /// DBF record number of key `i`; meaningful at leaf entries.
    fn record_number(&self, i: usize) -> u32 {
        self.u32_at(8 + i * self.key_record_size())
    }

    /// Stored key bytes of key `i`, trimmed at the first null.
    fn key_bytes(&self, i: usize) -> &[u8] {
        let start = 12 + i * self.key_record_size();
        let width = self.key_record_size() - 8;
        codec::null_terminated(&self.buf[start..start + width])
    }

    /// Looks up a key, returning the matching DBF record number or
    /// [`RECORD_NUMBER_EOF`] when the index holds no such key.
    pub fn find(&mut self, key: impl Into<SearchKey>) -> Result<i64> {
        let lock = self.lock.clone();
        let _guard = lock.acquire();
        let key = key.into();

        let prepared = match self.data_type {
            IndexDataType::Character => {
                Prepared::Character(key.character_bytes(self.key_length as usize))
            }
            IndexDataType::Numeric => Prepared::Numeric(key.numeric()?),
            IndexDataType::Date => {
                return Err(XbaseError::unsupported(
                    "NDX lookup",
                    "date-typed NDX indexes",
                ))
            }
        };

        let start = self.start_page;
        self.find_from(&prepared, start)
    }

    /// Key count of the buffered page, clamped to what physically fits so a
    /// corrupt count cannot push reads past the page.
    fn usable_keys(&self) -> usize {
        let fits = (PAGE_SIZE - 4) / self.key_record_size();
        (self.keys_in_page() as usize).min(fits)
    }

    fn find_from(&mut self, prepared: &Prepared, page_number: u32) -> Result<i64> {
        self.goto_page(page_number)?;
        let keys_in_page = self.usable_keys();

        for i in 0..keys_in_page {
            if prepared.compare_stored(self, i).is_ge() {
                let next_page = self.next_page(i);
                if next_page == 0 {
                    return Ok(i64::from(self.record_number(i)));
                }
                return self.find_from(prepared, next_page);
            }
        }

        Ok(RECORD_NUMBER_EOF)
    }
}

/// A search key pre-processed for the index's data type.
enum Prepared {
    Character(smallvec::SmallVec<[u8; 32]>),
    Numeric(f64),
}

impl Prepared {
    /// Compares the stored key `i` in the buffered page against this search
    /// key; `Greater` means the stored key sorts after the search key.
    fn compare_stored(&self, ndx: &Ndx, i: usize) -> std::cmp::Ordering {
        match self {
            Prepared::Character(padded) => compare_character(ndx.key_bytes(i), padded),
            Prepared::Numeric(search) => {
                let start = 12 + i * ndx.key_record_size();
                let raw: [u8; 8] = ndx.buf[start..start + 8].try_into().unwrap_or([0u8; 8]);
                f64::from_le_bytes(raw).total_cmp(search)
            }
        }
    }
}

impl fmt::Display for Ndx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "----------------------------------")?;
        writeln!(f, "Start Page:     {:18}", self.start_page)?;
        writeln!(f, "Total Pages:    {:18}", self.total_pages)?;
        writeln!(f, "Key Length:     {:18}", self.key_length)?;
        writeln!(f, "Key Record Size:{:18}", self.key_record_size())?;
        writeln!(f, "Keys Per Page:  {:18}", self.keys_per_page)?;
        writeln!(f, "Data Type:      {:>18}", self.data_type.name())?;
        writeln!(f, "Unique:         {:18}", self.unique)?;
        writeln!(f, "Key: {:>29}", self.key_expression)?;
        write!(f, "----------------------------------")
    }
}
