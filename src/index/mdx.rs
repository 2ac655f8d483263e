//! # MDX Multi-Index Reader
//!
//! An MDX file packs up to 48 independent B+-trees ("tags") into one file.
//! The physical unit is a 512-byte block; a tree node spans
//! `block_size_multiplier` consecutive blocks (the multiplier is almost
//! always 1).
//!
//! ## File Header (bytes 0..544)
//!
//! ```text
//! Offset  Size  Description
//! 0       1     Version, expected 2
//! 1       3     Reindex stamp: year−2000, month, day
//! 4       16    Paired DBF base name, null terminated
//! 20      2     Block size multiplier (u16 LE)
//! 22      2     Node size in bytes; must equal multiplier * 512
//! 24      1     Production flag
//! 25      1     Key slots per tag, 1..=48
//! 26      1     Tag descriptor length, 1..=32
//! 28      2     Tags in use
//! 32      4     Number of blocks
//! 36      4     First free block
//! 40      4     Available block
//! 44      3     Last-update stamp: year−2000, month, day
//! ```
//!
//! Tag descriptors follow at byte 544, one per tag in use, each
//! `tag_length` bytes: header block (u32), 10-byte name, a key-format byte
//! (0x08 descending, 0x40 unique), three tag-link bytes, and the key type
//! letter (`C`, `N`, or `D`; date tags keep character semantics).
//!
//! Each tag then has a **header block** at `header_block * 512` holding the
//! root block, size in blocks, echoes of the key format and type (any
//! disagreement with the descriptor is fatal), key length, keys per block,
//! and a re-verified unique flag.
//!
//! ## Node Layout
//!
//! A node read starts at `block_number * 512` and spans the node size.
//! Bytes 0..4 hold the key count and bytes 4..8 the previous-block pointer;
//! a node with a zero previous-block pointer is a leaf. Key records of
//! `ceil(key_length/4)*4 + 4` bytes follow, each holding a child-block or
//! record-number pointer at its fourth byte and the key bytes after it.
//!
//! ## Keys
//!
//! Character and date keys compare byte-wise against a space-padded search
//! key. Numeric keys are either a native little-endian float64 (key length
//! 8) or the 12-byte packed-decimal encoding decoded by the byte codec.
//!
//! ## Cursor
//!
//! The reader keeps one position (block number and key index within it) per
//! file, driven by [`Mdx::goto_top`], [`Mdx::goto_bottom`], [`Mdx::next`],
//! and [`Mdx::prev`] over the active tag set with [`Mdx::set_tag`].
//! `next` and `prev` walk within the current leaf and report
//! [`RECORD_NUMBER_EOF`] / [`RECORD_NUMBER_BOF`] at its edges;
//! `goto_bottom` is a linear forward walk.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use smallvec::SmallVec;
use tracing::{debug, warn};
use zerocopy::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::codec;
use crate::config::Config;
use crate::date::Date;
use crate::error::{Result, XbaseError};
use crate::index::{compare_character, IndexDataType, SearchKey};
use crate::lock::HandleLock;
use crate::table::{RECORD_NUMBER_BOF, RECORD_NUMBER_EOF};

/// The MDX physical block size. Nodes span `block_size_multiplier` blocks.
pub const BLOCK_SIZE: usize = 512;

const HEADER_SPAN: usize = 544;
const SUPPORTED_VERSION: u8 = 2;
const KEY_FORMAT_DESCENDING: u8 = 0x08;
const KEY_FORMAT_UNIQUE: u8 = 0x40;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct MdxHeader {
    version: u8,
    reindex_stamp: [u8; 3],
    dbf_name: [u8; 16],
    block_size_multiplier: U16,
    node_size: U16,
    production: u8,
    keys_in_tag: u8,
    tag_length: u8,
    reserved1: u8,
    tags_in_use: U16,
    reserved2: [u8; 2],
    number_of_blocks: U32,
    first_free_block: U32,
    available_block: U32,
    update_stamp: [u8; 3],
}

const _: () = assert!(std::mem::size_of::<MdxHeader>() == 47);

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct TagDescriptor {
    header_block: U32,
    name: [u8; 10],
    key_format: u8,
    left_tag: u8,
    right_tag: u8,
    backward_tag: u8,
    reserved: u8,
    key_type: u8,
}

const _: () = assert!(std::mem::size_of::<TagDescriptor>() == 20);

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct TagHeaderBlock {
    root_block: U32,
    size_in_blocks: U32,
    key_format: u8,
    key_type: u8,
    reserved1: [u8; 2],
    key_length: U16,
    keys_per_block: U16,
    secondary_key_type: U16,
    key_item_length: U16,
    reserved2: [u8; 3],
    unique: u8,
}

const _: () = assert!(std::mem::size_of::<TagHeaderBlock>() == 24);

/// One index within an MDX file.
#[derive(Debug, Clone)]
pub struct Tag {
    name: String,
    header_block: u32,
    data_type: IndexDataType,
    unique: bool,
    descending: bool,
    left_tag: u8,
    right_tag: u8,
    backward_tag: u8,
    root_block: u32,
    size_in_blocks: u32,
    key_length: u16,
    keys_per_block: u16,
    secondary_key_type: u16,
    key_item_length: u16,
}

impl Tag {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The data type the tag indexes. Date tags report
    /// [`IndexDataType::Character`]; their keys are `DTOS()` renderings.
    pub fn data_type(&self) -> IndexDataType {
        self.data_type
    }

    pub fn unique(&self) -> bool {
        self.unique
    }

    pub fn descending(&self) -> bool {
        self.descending
    }

    pub fn root_block(&self) -> u32 {
        self.root_block
    }

    pub fn size_in_blocks(&self) -> u32 {
        self.size_in_blocks
    }

    pub fn key_length(&self) -> u16 {
        self.key_length
    }

    pub fn keys_per_block(&self) -> u16 {
        self.keys_per_block
    }

    pub fn secondary_key_type(&self) -> u16 {
        self.secondary_key_type
    }

    pub fn key_item_length(&self) -> u16 {
        self.key_item_length
    }

    pub fn left_tag(&self) -> u8 {
        self.left_tag
    }

    pub fn right_tag(&self) -> u8 {
        self.right_tag
    }

    pub fn backward_tag(&self) -> u8 {
        self.backward_tag
    }

    pub fn header_block(&self) -> u32 {
        self.header_block
    }

    /// Size of one key record within a node: the key padded to a 4-byte
    /// multiple plus the pointer word.
    pub fn key_record_size(&self) -> usize {
        (self.key_length as usize).div_ceil(4) * 4 + 4
    }
}

/// A search key pre-processed for a tag's data type.
enum Prepared {
    Character(SmallVec<[u8; 32]>),
    Numeric(f64),
}

/// An open MDX index file with its tag table and cursor.
#[derive(Debug)]
pub struct Mdx {
    path: PathBuf,
    file: File,
    lock: HandleLock,
    buf: Vec<u8>,

    version: u8,
    dbf_name: String,
    block_size_multiplier: u16,
    node_size: usize,
    production: bool,
    keys_in_tag: u8,
    tag_length: u8,
    tags_in_use: u16,
    number_of_blocks: u32,
    first_free_block: u32,
    available_block: u32,
    reindex_date: Date,
    last_update_date: Date,
    tags: Vec<Tag>,

    block_number: u32,
    key_index: usize,
    active_tag: Option<usize>,
}

impl Mdx {
    /// Opens an MDX file with its own handle lock.
    pub fn open(path: impl AsRef<Path>, config: &Config) -> Result<Mdx> {
        let lock = HandleLock::new(config.thread_safety);
        Self::open_with_lock(path, config, lock)
    }

    /// Opens an MDX file sharing the caller's handle lock, typically the one
    /// owned by the DBF this index belongs to.
    pub fn open_with_lock(path: impl AsRef<Path>, config: &Config, lock: HandleLock) -> Result<Mdx> {
        let path = path.as_ref().to_path_buf();
        let mut options = OpenOptions::new();
        options.read(true).write(true);
        if config.synchronous_writes {
            options.custom_flags(libc::O_SYNC);
        }
        let file = options.open(&path)?;

        let mut mdx = Mdx {
            path,
            file,
            lock,
            buf: Vec::new(),
            version: 0,
            dbf_name: String::new(),
            block_size_multiplier: 0,
            node_size: 0,
            production: false,
            keys_in_tag: 0,
            tag_length: 0,
            tags_in_use: 0,
            number_of_blocks: 0,
            first_free_block: 0,
            available_block: 0,
            reindex_date: Date::BLANK,
            last_update_date: Date::BLANK,
            tags: Vec::new(),
            block_number: 0,
            key_index: 0,
            active_tag: None,
        };
        mdx.read_structure()?;
        debug!(path = %mdx.path.display(), tags = mdx.tags.len(), "opened MDX");
        Ok(mdx)
    }

    fn read_structure(&mut self) -> Result<()> {
        let _guard = self.lock.acquire();

        let mut raw = [0u8; HEADER_SPAN];
        codec::read_exact_at(&self.file, &mut raw, 0, "MDX header")?;

        let header = MdxHeader::ref_from_bytes(&raw[..std::mem::size_of::<MdxHeader>()])
            .map_err(|e| XbaseError::corrupt(format!("unreadable MDX header: {e:?}")))?;

        self.version = header.version;
        if self.version != SUPPORTED_VERSION {
            warn!(path = %self.path.display(), version = self.version, "MDX has an unsupported version");
        }

        self.reindex_date = Date::new(
            header.reindex_stamp[1],
            header.reindex_stamp[2],
            i16::from(header.reindex_stamp[0]) + 2000,
        );
        self.last_update_date = Date::new(
            header.update_stamp[1],
            header.update_stamp[2],
            i16::from(header.update_stamp[0]) + 2000,
        );
        self.dbf_name = codec::padded_name(&header.dbf_name);

        self.block_size_multiplier = header.block_size_multiplier.get();
        if self.block_size_multiplier == 0 {
            return Err(XbaseError::corrupt("MDX block size multiplier is zero"));
        }
        self.node_size = header.node_size.get() as usize;
        if self.node_size != self.block_size_multiplier as usize * BLOCK_SIZE {
            return Err(XbaseError::corrupt(format!(
                "MDX node size {} does not equal multiplier {} x {BLOCK_SIZE}",
                self.node_size, self.block_size_multiplier
            )));
        }

        self.production = header.production != 0;
        self.keys_in_tag = header.keys_in_tag;
        if !(1..=48).contains(&self.keys_in_tag) {
            return Err(XbaseError::corrupt(format!(
                "MDX keys-in-tag {} out of range 1..=48",
                self.keys_in_tag
            )));
        }
        self.tag_length = header.tag_length;
        if !(1..=32).contains(&self.tag_length) {
            return Err(XbaseError::corrupt(format!(
                "MDX tag length {} out of range 1..=32",
                self.tag_length
            )));
        }

        self.tags_in_use = header.tags_in_use.get();
        self.number_of_blocks = header.number_of_blocks.get();
        self.first_free_block = header.first_free_block.get();
        self.available_block = header.available_block.get();

        self.tags.clear();
        for tag_index in 0..self.tags_in_use {
            let offset = HEADER_SPAN as u64 + u64::from(tag_index) * u64::from(self.tag_length);
            let mut raw = [0u8; std::mem::size_of::<TagDescriptor>()];
            codec::read_exact_at(&self.file, &mut raw, offset, "MDX tag descriptor")?;
            let descriptor = TagDescriptor::ref_from_bytes(&raw)
                .map_err(|e| XbaseError::corrupt(format!("unreadable tag descriptor: {e:?}")))?;

            let data_type = match descriptor.key_type {
                b'C' | b'D' => IndexDataType::Character,
                b'N' => IndexDataType::Numeric,
                other => {
                    return Err(XbaseError::unsupported(
                        "MDX key type",
                        format!("{:?}", other as char),
                    ))
                }
            };

            let header_offset = u64::from(descriptor.header_block.get()) * BLOCK_SIZE as u64;
            let mut raw_header = [0u8; std::mem::size_of::<TagHeaderBlock>()];
            codec::read_exact_at(&self.file, &mut raw_header, header_offset, "MDX tag header")?;
            let tag_header = TagHeaderBlock::ref_from_bytes(&raw_header)
                .map_err(|e| XbaseError::corrupt(format!("unreadable tag header: {e:?}")))?;

            if tag_header.key_format != descriptor.key_format {
                return Err(XbaseError::corrupt(format!(
                    "key format byte in header != key format byte in tag descriptor: {} != {}",
                    descriptor.key_format, tag_header.key_format
                )));
            }
            if tag_header.key_type != descriptor.key_type {
                return Err(XbaseError::corrupt(format!(
                    "key type byte in header != key type byte in tag descriptor: {} != {}",
                    descriptor.key_type as char, tag_header.key_type as char
                )));
            }
            let unique = descriptor.key_format & KEY_FORMAT_UNIQUE != 0;
            if (tag_header.unique != 0) != unique {
                return Err(XbaseError::corrupt(format!(
                    "unique flag in header != unique flag in tag descriptor: key format={}",
                    descriptor.key_format
                )));
            }

            self.tags.push(Tag {
                name: codec::padded_name(&descriptor.name),
                header_block: descriptor.header_block.get(),
                data_type,
                unique,
                descending: descriptor.key_format & KEY_FORMAT_DESCENDING != 0,
                left_tag: descriptor.left_tag,
                right_tag: descriptor.right_tag,
                backward_tag: descriptor.backward_tag,
                root_block: tag_header.root_block.get(),
                size_in_blocks: tag_header.size_in_blocks.get(),
                key_length: tag_header.key_length.get(),
                keys_per_block: tag_header.keys_per_block.get(),
                secondary_key_type: tag_header.secondary_key_type.get(),
                key_item_length: tag_header.key_item_length.get(),
            });
        }

        self.buf = vec![0u8; self.node_size];
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Base name of the DBF this index was built for.
    pub fn dbf_name(&self) -> &str {
        &self.dbf_name
    }

    pub fn production(&self) -> bool {
        self.production
    }

    pub fn node_size(&self) -> usize {
        self.node_size
    }

    pub fn block_size_multiplier(&self) -> u16 {
        self.block_size_multiplier
    }

    pub fn number_of_blocks(&self) -> u32 {
        self.number_of_blocks
    }

    pub fn reindex_date(&self) -> Date {
        self.reindex_date
    }

    pub fn last_update_date(&self) -> Date {
        self.last_update_date
    }

    /// All tags carried by this file, in descriptor order.
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Looks up a tag by name, without changing the active tag.
    pub fn tag(&self, name: &str) -> Option<&Tag> {
        self.tags
            .iter()
            .find(|t| t.name().eq_ignore_ascii_case(name))
    }

    /// Sets the active (master) tag for lookups and ordered traversal.
    /// Returns the tag when one with the given name exists.
    pub fn set_tag(&mut self, name: &str) -> Option<&Tag> {
        let index = self
            .tags
            .iter()
            .position(|t| t.name().eq_ignore_ascii_case(name))?;
        self.active_tag = Some(index);
        Some(&self.tags[index])
    }

    fn active(&self) -> Result<&Tag> {
        self.active_tag
            .and_then(|i| self.tags.get(i))
            .ok_or_else(|| XbaseError::invalid("no active tag; call set_tag first"))
    }

    /// Moves to the given block and reads the node starting there into the
    /// buffer. Block numbers start at 1; the move is skipped when the block
    /// is already buffered.
    pub fn goto_block(&mut self, block_number: u32) -> Result<()> {
        if self.block_number != block_number {
            if block_number > self.number_of_blocks {
                return Err(XbaseError::invalid(format!(
                    "block does not exist: {block_number}"
                )));
            }
            if block_number == 0 {
                return Err(XbaseError::invalid("invalid block number: 0"));
            }
            self.block_number = block_number;
            self.key_index = 0;
            self.read_block()?;
        }
        Ok(())
    }

    /// Re-reads the current node into the buffer.
    pub fn read_block(&mut self) -> Result<()> {
        if self.block_number == 0 {
            return Err(XbaseError::invalid("invalid block number: 0"));
        }
        let offset = BLOCK_SIZE as u64 * u64::from(self.block_number);
        codec::read_exact_at(&self.file, &mut self.buf, offset, "MDX block")?;
        Ok(())
    }

    fn keys_in_node(&self) -> usize {
        u32::from_le_bytes([self.buf[0], self.buf[1], self.buf[2], self.buf[3]]) as usize
    }

    fn u32_at(&self, offset: usize) -> u32 {
        u32::from_le_bytes([
            self.buf[offset],
            self.buf[offset + 1],
            self.buf[offset + 2],
            self.buf[offset + 3],
        ])
    }

    /// Previous-block pointer slot of key `i`. For the first key this is the
    /// node-level pointer whose zero value marks a leaf.
    fn previous_block(&self, i: usize, key_record_size: usize) -> u32 {
        self.u32_at(4 + i * key_record_size)
    }

    /// Child-block pointer (internal nodes) or DBF record number (leaves)
    /// of key `i`.
    fn next_block_or_record_number(&self, i: usize, key_record_size: usize) -> u32 {
        self.u32_at(8 + i * key_record_size)
    }

    /// Stored key bytes of key `i`.
    fn key_bytes(&self, i: usize, key_record_size: usize, key_length: usize) -> &[u8] {
        let start = 12 + i * key_record_size;
        &self.buf[start..start + key_length]
    }

    /// Whether the buffered node is a leaf.
    fn is_leaf(&self, key_record_size: usize) -> bool {
        self.previous_block(0, key_record_size) == 0
    }

    /// Key count of the buffered node, clamped to what physically fits so a
    /// corrupt count cannot push reads past the node.
    fn usable_keys(&self, tag: &Tag) -> usize {
        let span = self.node_size.saturating_sub(12 + tag.key_length as usize);
        let fits = span / tag.key_record_size() + 1;
        self.keys_in_node().min(fits)
    }

    fn prepare(&self, tag: &Tag, key: SearchKey) -> Result<Prepared> {
        match tag.data_type {
            IndexDataType::Character | IndexDataType::Date => {
                Ok(Prepared::Character(key.character_bytes(tag.key_length as usize)))
            }
            IndexDataType::Numeric => Ok(Prepared::Numeric(key.numeric()?)),
        }
    }

    /// Compares stored key `i` of the buffered node against the prepared
    /// search key; `Greater` means the stored key sorts after it.
    fn compare_stored(&self, tag: &Tag, prepared: &Prepared, i: usize) -> std::cmp::Ordering {
        let krs = tag.key_record_size();
        match prepared {
            Prepared::Character(padded) => {
                let stored =
                    codec::null_terminated(self.key_bytes(i, krs, tag.key_length as usize));
                compare_character(stored, padded)
            }
            Prepared::Numeric(search) => {
                let stored = match tag.key_length {
                    8 => {
                        let raw: [u8; 8] = self
                            .key_bytes(i, krs, 8)
                            .try_into()
                            .unwrap_or([0u8; 8]);
                        f64::from_le_bytes(raw)
                    }
                    12 => codec::decode_packed_decimal(self.key_bytes(i, krs, 12)),
                    _ => 0.0,
                };
                stored.total_cmp(search)
            }
        }
    }

    /// Looks up a key in the active tag, returning the matching DBF record
    /// number or [`RECORD_NUMBER_EOF`] when the tag holds no such key.
    pub fn find(&mut self, key: impl Into<SearchKey>) -> Result<i64> {
        let lock = self.lock.clone();
        let _guard = lock.acquire();
        let tag = self.active()?.clone();
        let prepared = self.prepare(&tag, key.into())?;
        self.find_from(&tag, &prepared, tag.root_block())
    }

    /// Looks up a key in the named tag, leaving the active tag unchanged.
    pub fn find_in_tag(&mut self, tag_name: &str, key: impl Into<SearchKey>) -> Result<i64> {
        let lock = self.lock.clone();
        let _guard = lock.acquire();
        let tag = self
            .tag(tag_name)
            .ok_or_else(|| {
                XbaseError::invalid(format!(
                    "tag {tag_name} not found in MDX {}",
                    self.path.display()
                ))
            })?
            .clone();
        let prepared = self.prepare(&tag, key.into())?;
        self.find_from(&tag, &prepared, tag.root_block())
    }

    fn find_from(&mut self, tag: &Tag, prepared: &Prepared, block_number: u32) -> Result<i64> {
        self.goto_block(block_number)?;
        let krs = tag.key_record_size();
        let leaf = self.is_leaf(krs);
        let keys_in_node = self.usable_keys(tag);

        for i in 0..keys_in_node {
            let ordering = self.compare_stored(tag, prepared, i);
            if leaf {
                if ordering.is_eq() {
                    return Ok(i64::from(self.next_block_or_record_number(i, krs)));
                }
                if ordering.is_gt() {
                    break;
                }
            } else if ordering.is_gt() {
                // Descend under the last key that compared below the search
                // key; a greater first key means the value cannot be here.
                if i == 0 {
                    break;
                }
                let child = self.next_block_or_record_number(i - 1, krs);
                return self.find_from(tag, prepared, child);
            }
        }

        Ok(RECORD_NUMBER_EOF)
    }

    /// Positions the cursor on the first key of the active tag and returns
    /// its record number.
    pub fn goto_top(&mut self) -> Result<i64> {
        let lock = self.lock.clone();
        let _guard = lock.acquire();
        let tag = self.active()?.clone();
        let krs = tag.key_record_size();

        self.goto_block(tag.root_block())?;
        while !self.is_leaf(krs) {
            let child = self.next_block_or_record_number(self.key_index, krs);
            self.goto_block(child)?;
        }
        self.key_index = 0;
        Ok(i64::from(self.next_block_or_record_number(0, krs)))
    }

    /// Positions the cursor on the last key of the active tag and returns
    /// its record number. This walks forward from the top.
    pub fn goto_bottom(&mut self) -> Result<i64> {
        let lock = self.lock.clone();
        let _guard = lock.acquire();
        let tag = self.active()?.clone();
        let krs = tag.key_record_size();

        self.goto_top()?;
        while self.next()? != RECORD_NUMBER_EOF {}
        Ok(i64::from(self.next_block_or_record_number(self.key_index, krs)))
    }

    /// Steps forward within the current leaf, returning the next record
    /// number or [`RECORD_NUMBER_EOF`] at the leaf's end.
    pub fn next(&mut self) -> Result<i64> {
        let lock = self.lock.clone();
        let _guard = lock.acquire();
        let tag = self.active()?.clone();
        let krs = tag.key_record_size();

        loop {
            if self.is_leaf(krs) {
                let keys_in_node = self.usable_keys(&tag);
                if self.key_index + 1 >= keys_in_node {
                    return Ok(RECORD_NUMBER_EOF);
                }
                self.key_index += 1;
                return Ok(i64::from(self.next_block_or_record_number(self.key_index, krs)));
            }
            let child = self.next_block_or_record_number(self.key_index, krs);
            self.goto_block(child)?;
        }
    }

    /// Steps backward within the current leaf, returning the previous record
    /// number or [`RECORD_NUMBER_BOF`] at the leaf's start.
    pub fn prev(&mut self) -> Result<i64> {
        let lock = self.lock.clone();
        let _guard = lock.acquire();
        let tag = self.active()?.clone();
        let krs = tag.key_record_size();

        loop {
            if self.is_leaf(krs) {
                if self.key_index == 0 {
                    return Ok(RECORD_NUMBER_BOF);
                }
                self.key_index -= 1;
                return Ok(i64::from(self.next_block_or_record_number(self.key_index, krs)));
            }
            let child = self.previous_block(self.key_index, krs);
            self.goto_block(child)?;
        }
    }
}

impl fmt::Display for Mdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "----------------------------------")?;
        writeln!(f, "DBF Name:        {:>17}", self.dbf_name)?;
        writeln!(f, "Production:      {:>17}", self.production)?;
        writeln!(f, "Node Size:       {:>17}", self.node_size)?;
        writeln!(f, "Block Size Mult: {:>17}", self.block_size_multiplier)?;
        writeln!(f, "Entries In Tag:  {:>17}", self.keys_in_tag)?;
        writeln!(f, "Tag Length:      {:>17}", self.tag_length)?;
        writeln!(f, "Tags In Use:     {:>17}", self.tags_in_use)?;
        writeln!(f, "Number Of Blocks:{:>17}", self.number_of_blocks)?;
        writeln!(f, "First Free Block:{:>17}", self.first_free_block)?;
        writeln!(f, "Available Block: {:>17}", self.available_block)?;
        writeln!(f, "Last Updated:    {:>17}", self.last_update_date.to_string())?;
        writeln!(f, "Reindex Date:    {:>17}", self.reindex_date.to_string())?;
        writeln!(f, "Tags:")?;
        for (i, tag) in self.tags.iter().enumerate() {
            if i != 0 {
                writeln!(f, " ---")?;
            }
            writeln!(f, " Name:           {:>17}", tag.name())?;
            writeln!(f, " Descending:     {:>17}", tag.descending())?;
            writeln!(f, " Unique:         {:>17}", tag.unique())?;
            writeln!(f, " Header Block:   {:>17}", tag.header_block())?;
            writeln!(f, " Root Block:     {:>17}", tag.root_block())?;
            writeln!(f, " Size In Blocks: {:>17}", tag.size_in_blocks())?;
            writeln!(f, " Key Length:     {:>17}", tag.key_length())?;
            writeln!(f, " Keys Per Block: {:>17}", tag.keys_per_block())?;
            writeln!(f, " 2nd Key Type:   {:>17}", tag.secondary_key_type())?;
            writeln!(f, " Key Item Length:{:>17}", tag.key_item_length())?;
        }
        write!(f, "----------------------------------")
    }
}
