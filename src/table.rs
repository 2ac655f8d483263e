//! # DBF Table Engine
//!
//! The record cursor over a fixed-header, fixed-record-width table file.
//! This module owns the header parse/write-back, the cursor state machine,
//! record decode, field replacement, deletion tombstones, and blank-record
//! appends. Memo-class fields delegate their payloads to the DBT store.
//!
//! ## On-Disk Layout
//!
//! ```text
//! +--------------------------+
//! | Header (32B)             |  signature, stamp, counts, lengths, flags
//! +--------------------------+
//! | Field descriptors (32B)* |  one per field
//! +--------------------------+
//! | 0x0D                     |  end-of-header terminator
//! +--------------------------+
//! | Records (record_length)* |  1 deletion byte + fixed-width fields
//! +--------------------------+
//! | 0x1A                     |  end-of-file marker
//! +--------------------------+
//! ```
//!
//! Header bytes: 0 signature (low 3 bits version, bit 3 memo, bit 7 DBT
//! paired); 1..4 last-update stamp as `year−1900`, month, day; 4..8 record
//! count (u32 LE); 8..10 header length; 10..12 record length; 14
//! transaction flag; 15 encryption flag; 28 MDX flag. Records begin with a
//! deletion byte (`' '` live, `'*'` deleted); fields follow at their
//! declared widths, space padded.
//!
//! ## Cursor Model
//!
//! Records are numbered from 1. The cursor also takes two sentinel states,
//! [`RECORD_NUMBER_BOF`] (0, before the first record) and
//! [`RECORD_NUMBER_EOF`] (−1, past the last). [`Dbf::goto_record`] re-reads
//! the header first so a record count bumped by another process is observed,
//! then clamps the target into one of the three states and decodes the
//! record (or each field's default at BOF-empty/EOF).
//!
//! ## Concurrency
//!
//! Within a handle, public methods serialize on the [`HandleLock`] when
//! thread safety is configured. Across processes, advisory region locks
//! bracket the header read, each record read, field writes, and the append
//! path (record-count field plus the new record's range) when file locking
//! is configured. A reader never observes a torn header because the shared
//! header lock spans the whole 32-byte read.
//!
//! Do not open two handles to the same table file from one process: POSIX
//! region locks are per-process and the handles would silently release each
//! other's locks.
//!
//! ## Caveats
//!
//! A failed record read leaves the decoded values partially populated;
//! reposition the cursor after an error. A failed replace can leave the
//! record inconsistent on disk (there is no rollback).

use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zerocopy::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::codec;
use crate::config::Config;
use crate::date::Date;
use crate::error::{Result, XbaseError};
use crate::field::{Field, FieldType};
use crate::lock::{lock_region_if, HandleLock};
use crate::memo;
use crate::structure::TableStructure;
use crate::value::Value;

/// Cursor state: before the first record. Also the "no match" floor returned
/// by backward index traversal.
pub const RECORD_NUMBER_BOF: i64 = 0;

/// Cursor state: past the last record. Also the "no match" return of index
/// lookups and forward traversal.
pub const RECORD_NUMBER_EOF: i64 = -1;

const HEADER_SIZE: usize = 32;
const DESCRIPTOR_SIZE: usize = 32;
const HEADER_TERMINATOR: u8 = 0x0d;
const FILE_TERMINATOR: u8 = 0x1a;
const DELETED_MARK: u8 = b'*';
const ALIVE_MARK: u8 = b' ';
const SUPPORTED_VERSION: u8 = 3;
const MAX_FILE_SIZE: u64 = 2_147_483_648;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct DbfHeader {
    signature: u8,
    last_update: [u8; 3],
    record_count: U32,
    header_length: U16,
    record_length: U16,
    reserved1: [u8; 2],
    transaction_active: u8,
    data_encrypted: u8,
    reserved2: [u8; 12],
    mdx_paired: u8,
    language_driver: u8,
    reserved3: [u8; 2],
}

const _: () = assert!(std::mem::size_of::<DbfHeader>() == HEADER_SIZE);

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct FieldDescriptor {
    name: [u8; 11],
    field_type: u8,
    reserved1: [u8; 4],
    length: u8,
    decimals: u8,
    reserved2: [u8; 2],
    work_area_id: u8,
    reserved3: [u8; 2],
    set_fields_flag: u8,
    reserved4: [u8; 7],
    index_field_flag: u8,
}

const _: () = assert!(std::mem::size_of::<FieldDescriptor>() == DESCRIPTOR_SIZE);

/// Resolves a caller-facing field reference to a zero-based index.
///
/// Implemented for 1-based field numbers (`usize`) and for field names
/// (`&str`, case-insensitive).
pub trait FieldSelector {
    fn resolve(&self, dbf: &Dbf) -> Result<usize>;
}

impl FieldSelector for usize {
    fn resolve(&self, dbf: &Dbf) -> Result<usize> {
        if *self == 0 {
            return Err(XbaseError::invalid("field number must be greater than zero"));
        }
        let count = dbf.structure.field_count();
        if *self > count {
            return Err(XbaseError::invalid(format!(
                "field number greater than the number of fields in the table ({self} > {count})"
            )));
        }
        Ok(*self - 1)
    }
}

impl FieldSelector for i32 {
    fn resolve(&self, dbf: &Dbf) -> Result<usize> {
        if *self <= 0 {
            return Err(XbaseError::invalid("field number must be greater than zero"));
        }
        (*self as usize).resolve(dbf)
    }
}

impl FieldSelector for &str {
    fn resolve(&self, dbf: &Dbf) -> Result<usize> {
        dbf.structure
            .field_index(self)
            .ok_or_else(|| XbaseError::invalid(format!("field {self} does not exist")))
    }
}

/// An open DBF table with its cursor.
#[derive(Debug)]
pub struct Dbf {
    path: PathBuf,
    file: File,
    config: Config,
    lock: HandleLock,
    structure: TableStructure,
    record_number: i64,
    current_record_deleted: bool,
    values: Vec<Value>,
}

fn open_table_file(path: &Path, config: &Config) -> Result<File> {
    let mut options = OpenOptions::new();
    options.read(true).write(true);
    if config.synchronous_writes {
        options.custom_flags(libc::O_SYNC);
    }
    Ok(options.open(path)?)
}

fn with_dbf_extension(path: &Path) -> PathBuf {
    let has_extension = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("dbf"))
        .unwrap_or(false);
    if has_extension {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_owned();
        name.push(".dbf");
        PathBuf::from(name)
    }
}

/// Encodes a value into a space-padded fixed-width field image, truncating
/// on overflow.
fn encode_field(value: &Value, width: usize) -> Vec<u8> {
    let mut image = vec![b' '; width];
    let text = value.to_string();
    let bytes = text.as_bytes();
    let n = bytes.len().min(width);
    image[..n].copy_from_slice(&bytes[..n]);
    image
}

impl Dbf {
    /// Opens an existing table and positions the cursor on record 1.
    pub fn open(path: impl AsRef<Path>, config: Config) -> Result<Dbf> {
        let lock = HandleLock::new(config.thread_safety);
        Self::open_with_lock(path, config, lock)
    }

    /// Opens an existing table sharing a caller-supplied handle lock, so a
    /// table and its index files can serialize against each other.
    pub fn open_with_lock(path: impl AsRef<Path>, config: Config, lock: HandleLock) -> Result<Dbf> {
        let path = path.as_ref().to_path_buf();
        let file = open_table_file(&path, &config)?;
        let mut dbf = Dbf {
            path,
            file,
            config,
            lock,
            structure: TableStructure::default(),
            record_number: RECORD_NUMBER_BOF,
            current_record_deleted: false,
            values: Vec::new(),
        };
        dbf.read_structure()?;
        debug!(path = %dbf.path.display(), records = dbf.structure.record_count, "opened DBF");
        dbf.goto_record(1)?;
        Ok(dbf)
    }

    /// Opens a table by a path relative to the configured current directory,
    /// appending `.dbf` when the name lacks it.
    pub fn open_relative(name: &str, config: Config) -> Result<Dbf> {
        let path = config.current_directory.join(name);
        Self::open(with_dbf_extension(&path), config)
    }

    /// Creates a new table file from the given structure. A paired DBT is
    /// created alongside when the structure contains a memo-class field.
    pub fn create(path: impl AsRef<Path>, structure: TableStructure, config: Config) -> Result<Dbf> {
        let path = with_dbf_extension(path.as_ref());

        if structure.fields().is_empty() {
            return Err(XbaseError::invalid("the table structure has no fields"));
        }
        for field in structure.fields() {
            Self::validate_field(field)?;
        }
        for (i, field) in structure.fields().iter().enumerate() {
            if structure.fields()[..i]
                .iter()
                .any(|f| f.name() == field.name())
            {
                return Err(XbaseError::invalid(format!(
                    "duplicate field name {}",
                    field.name()
                )));
            }
        }

        let mut structure = structure;
        structure.record_count = 0;
        structure.header_length = 0;
        structure.record_length = 0;
        if structure
            .fields()
            .iter()
            .any(|f| f.field_type().is_memo_class())
        {
            structure.dbt_paired = true;
        }

        let mut options = OpenOptions::new();
        options.read(true).write(true).create(true).truncate(true);
        if config.synchronous_writes {
            options.custom_flags(libc::O_SYNC);
        }
        let file = options.open(&path)?;

        let lock = HandleLock::new(config.thread_safety);
        let mut dbf = Dbf {
            path,
            file,
            config,
            lock,
            structure,
            record_number: RECORD_NUMBER_BOF,
            current_record_deleted: false,
            values: Vec::new(),
        };

        if dbf.structure.dbt_paired {
            let base = dbf
                .path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            memo::create(&dbf.dbt_path(), &base, &dbf.config)?;
        }

        dbf.write_structure()?;
        debug!(path = %dbf.path.display(), fields = dbf.structure.field_count(), "created DBF");
        dbf.goto_record(0)?;
        Ok(dbf)
    }

    /// Creates a new table by a path relative to the configured current
    /// directory.
    pub fn create_relative(name: &str, structure: TableStructure, config: Config) -> Result<Dbf> {
        let path = config.current_directory.join(name);
        Self::create(path, structure, config)
    }

    fn validate_field(field: &Field) -> Result<()> {
        if field.name().is_empty() || field.name().len() > 10 {
            return Err(XbaseError::invalid(format!(
                "field name {:?} must be 1 to 10 bytes",
                field.name()
            )));
        }
        let max = if field.field_type() == FieldType::Character {
            65_535
        } else {
            255
        };
        if field.length() == 0 || field.length() > max {
            return Err(XbaseError::invalid(format!(
                "field {} length {} out of range 1..={max}",
                field.name(),
                field.length()
            )));
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The handle lock, cloneable into index opens that should serialize
    /// with this table.
    pub fn handle_lock(&self) -> &HandleLock {
        &self.lock
    }

    pub fn structure(&self) -> &TableStructure {
        &self.structure
    }

    /// Whether the cursor sits before the first record.
    pub fn bof(&self) -> bool {
        self.record_number == RECORD_NUMBER_BOF
    }

    /// Whether the cursor sits past the last record.
    pub fn eof(&self) -> bool {
        self.record_number == RECORD_NUMBER_EOF
    }

    /// Whether the current record carries the deletion tombstone.
    pub fn deleted(&self) -> bool {
        self.current_record_deleted
    }

    /// The current record number, or a cursor sentinel.
    pub fn recno(&self) -> i64 {
        self.record_number
    }

    /// The path of the DBT file paired with this table: the table path with
    /// its final three extension characters replaced by `dbt`.
    pub fn dbt_path(&self) -> PathBuf {
        let text = self.path.as_os_str().to_string_lossy();
        if text.len() < 3 {
            return self.path.clone();
        }
        PathBuf::from(format!("{}dbt", &text[..text.len() - 3]))
    }

    /// Moves the cursor to `record_number`, clamping to BOF/EOF, and decodes
    /// the landed-on record. The header is re-read first so appends by other
    /// processes are observed.
    pub fn goto_record(&mut self, record_number: i64) -> Result<i64> {
        self.read_structure()?;
        self.current_record_deleted = false;

        let count = i64::from(self.structure.record_count);
        self.record_number = if record_number <= 0 || count == 0 {
            RECORD_NUMBER_BOF
        } else if record_number > count {
            RECORD_NUMBER_EOF
        } else {
            record_number
        };

        self.read_record(record_number)?;
        Ok(self.record_number)
    }

    /// Moves the cursor forwards or backwards by `offset` records.
    pub fn skip(&mut self, offset: i64) -> Result<i64> {
        self.goto_record(self.record_number + offset)
    }

    /// The 1-based number of the named field, or 0 when it does not exist.
    pub fn field_number_by_name(&self, name: &str) -> usize {
        self.structure.field_index(name).map(|i| i + 1).unwrap_or(0)
    }

    /// The decoded value of a field in the current record.
    pub fn value(&self, field: impl FieldSelector) -> Result<&Value> {
        let index = field.resolve(self)?;
        self.values.get(index).ok_or_else(|| {
            XbaseError::invalid("no record values decoded; position the cursor first")
        })
    }

    pub fn get_string(&self, field: impl FieldSelector) -> Result<String> {
        Ok(self.value(field)?.as_string())
    }

    pub fn get_int(&self, field: impl FieldSelector) -> Result<i64> {
        self.value(field)?.as_i64()
    }

    pub fn get_double(&self, field: impl FieldSelector) -> Result<f64> {
        self.value(field)?.as_f64()
    }

    pub fn get_boolean(&self, field: impl FieldSelector) -> Result<bool> {
        self.value(field)?.as_bool()
    }

    pub fn get_date(&self, field: impl FieldSelector) -> Result<Date> {
        self.value(field)?.as_date()
    }

    pub fn get_bytes(&self, field: impl FieldSelector) -> Result<Vec<u8>> {
        Ok(self.value(field)?.as_bytes())
    }

    /// Replaces one field of the current record. Fixed-width fields update
    /// in place; memo-class fields route through the DBT store and rewrite
    /// the 10-byte block-number column only when a new chain was appended.
    pub fn replace(&mut self, field: impl FieldSelector, value: impl Into<Value>) -> Result<()> {
        let index = field.resolve(self)?;
        if self.bof() {
            return Err(XbaseError::invalid(
                "cannot replace a value at beginning of file",
            ));
        }
        if self.eof() {
            return Err(XbaseError::invalid("cannot replace a value at end of file"));
        }

        let value = value.into();
        let old_value = std::mem::replace(&mut self.values[index], value.clone());

        {
            let _guard = self.lock.acquire();
            let field = self.structure.fields()[index].clone();
            let column_offset = self.record_offset(self.record_number) + self.field_offset(index);

            if field.field_type().is_memo_class() {
                let mut column = [0u8; 10];
                codec::read_exact_at(&self.file, &mut column, column_offset, "DBF memo column")?;
                let old_block = codec::parse_block_number(&column)?;

                let new_bytes = match &value {
                    Value::Text(s) => s.as_bytes().to_vec(),
                    Value::Bytes(b) => b.clone(),
                    other => other.to_string().into_bytes(),
                };
                let appended = memo::write_memo(
                    &self.dbt_path(),
                    old_block,
                    old_value.byte_len(),
                    &new_bytes,
                    &self.config,
                )?;
                if let Some(block) = appended {
                    codec::write_all_at(&self.file, &codec::format_block_number(block), column_offset)?;
                }
            } else {
                let image = encode_field(&value, field.length() as usize);
                let _region = lock_region_if(
                    self.config.file_locking,
                    &self.file,
                    column_offset,
                    u64::from(field.length()),
                    false,
                )?;
                codec::write_all_at(&self.file, &image, column_offset)?;
            }
        }

        self.update_last_modified()
    }

    /// Marks the current record deleted. Idempotent.
    pub fn delete(&mut self) -> Result<()> {
        self.set_deleted(true)
    }

    /// Clears the current record's deletion tombstone. Idempotent.
    pub fn undelete(&mut self) -> Result<()> {
        self.set_deleted(false)
    }

    fn set_deleted(&mut self, deleted: bool) -> Result<()> {
        if self.bof() {
            return Err(XbaseError::invalid(
                "cannot delete or undelete at beginning of file",
            ));
        }
        if self.eof() {
            return Err(XbaseError::invalid(
                "cannot delete or undelete at end of file",
            ));
        }

        if self.current_record_deleted != deleted {
            {
                let _guard = self.lock.acquire();
                let mark = if deleted { DELETED_MARK } else { ALIVE_MARK };
                let offset = self.record_offset(self.record_number);
                codec::write_all_at(&self.file, &[mark], offset)?;
            }
            self.current_record_deleted = deleted;
            self.update_last_modified()?;
        }
        Ok(())
    }

    /// Appends a blank record holding each field's default, then positions
    /// the cursor on it.
    pub fn append_blank(&mut self) -> Result<()> {
        {
            let _guard = self.lock.acquire();
            let _count_lock = lock_region_if(self.config.file_locking, &self.file, 4, 4, false)?;

            let header_length = u64::from(self.structure.header_length);
            let record_length = u64::from(self.structure.record_length);
            let count = u64::from(self.structure.record_count);

            // Logical size after the append: header, every record, EOF mark.
            if header_length + record_length * (count + 1) + 1 > MAX_FILE_SIZE {
                return Err(XbaseError::invalid("file too large to append"));
            }

            let offset = header_length + record_length * count;
            let _record_lock = lock_region_if(
                self.config.file_locking,
                &self.file,
                offset,
                record_length + 1,
                false,
            )?;

            let mut image = Vec::with_capacity(record_length as usize + 1);
            image.push(ALIVE_MARK);
            for field in self.structure.fields() {
                image.extend_from_slice(&encode_field(
                    &field.default_value(),
                    field.length() as usize,
                ));
            }
            image.push(FILE_TERMINATOR);
            codec::write_all_at(&self.file, &image, offset)?;

            // Re-read the on-disk count under the lock before bumping it, in
            // case another process appended since the header was read.
            let on_disk = codec::read_u32_at(&self.file, 4, "DBF record count")?;
            codec::write_u32_at(&self.file, on_disk + 1, 4)?;
            self.structure.record_count = on_disk + 1;
        }

        self.update_last_modified()?;
        self.goto_record(i64::from(self.structure.record_count))?;
        Ok(())
    }

    /// Reads and parses the 32-byte header and the field descriptor list.
    fn read_structure(&mut self) -> Result<()> {
        let _guard = self.lock.acquire();

        let mut raw = [0u8; HEADER_SIZE];
        {
            let _region = lock_region_if(self.config.file_locking, &self.file, 0, 32, true)?;
            codec::read_exact_at(&self.file, &mut raw, 0, "DBF header")?;
        }
        let header = DbfHeader::ref_from_bytes(&raw)
            .map_err(|e| XbaseError::corrupt(format!("unreadable DBF header: {e:?}")))?;

        let version = header.signature & 0x07;
        if version != SUPPORTED_VERSION {
            warn!(path = %self.path.display(), version, "DBF has an unsupported signature version");
        }

        self.structure.dbt_paired = header.signature & 0x80 != 0;
        self.structure.memo_exists = header.signature & 0x08 != 0;
        self.structure.last_updated = Date::new(
            header.last_update[1],
            header.last_update[2],
            i16::from(header.last_update[0]) + 1900,
        );
        self.structure.record_count = header.record_count.get();
        self.structure.header_length = header.header_length.get();
        self.structure.record_length = header.record_length.get();
        if self.structure.record_length == 0 {
            return Err(XbaseError::corrupt("DBF record length is zero"));
        }
        self.structure.transaction_active = header.transaction_active != 0;
        self.structure.data_encrypted = header.data_encrypted != 0;
        self.structure.mdx_paired = header.mdx_paired != 0;

        self.structure.fields_mut().clear();
        let mut offset = HEADER_SIZE as u64;
        loop {
            let mut peek = [0u8; 1];
            codec::read_exact_at(&self.file, &mut peek, offset, "DBF field descriptors")?;
            if peek[0] == HEADER_TERMINATOR {
                break;
            }

            let mut raw = [0u8; DESCRIPTOR_SIZE];
            codec::read_exact_at(&self.file, &mut raw, offset, "DBF field descriptors")?;
            let descriptor = FieldDescriptor::ref_from_bytes(&raw)
                .map_err(|e| XbaseError::corrupt(format!("unreadable field descriptor: {e:?}")))?;

            let name = codec::padded_name(&descriptor.name);
            if name.is_empty() {
                return Err(XbaseError::corrupt("blank field name in DBF header"));
            }

            let field_type = FieldType::from_code(descriptor.field_type);
            let (length, decimals) = match field_type {
                // The decimal byte doubles as the high byte of a 16-bit
                // character field length.
                FieldType::Character => (
                    u32::from(descriptor.length) | (u32::from(descriptor.decimals) << 8),
                    0,
                ),
                FieldType::Date => (8, 0),
                _ => (u32::from(descriptor.length), u32::from(descriptor.decimals)),
            };
            self.structure
                .fields_mut()
                .push(Field::new(name, field_type, length, decimals));

            offset += DESCRIPTOR_SIZE as u64;
        }

        Ok(())
    }

    /// Writes the header and field descriptors back to disk. On a fresh file
    /// the lengths are computed first and the terminator and EOF markers are
    /// laid down.
    fn write_structure(&mut self) -> Result<()> {
        let _guard = self.lock.acquire();

        if self.structure.header_length == 0 || self.structure.record_length == 0 {
            self.structure.calculate_lengths();
            let terminators = [HEADER_TERMINATOR, FILE_TERMINATOR];
            codec::write_all_at(
                &self.file,
                &terminators,
                u64::from(self.structure.header_length) - 1,
            )?;
        }

        if self.structure.last_updated.is_blank() {
            self.structure.last_updated = Date::today();
        }

        let _region = lock_region_if(self.config.file_locking, &self.file, 0, 32, false)?;

        let mut signature = SUPPORTED_VERSION;
        if self.structure.dbt_paired {
            signature |= 0x80;
        }
        if self.structure.memo_exists {
            signature |= 0x08;
        }

        let stamp = self.structure.last_updated;
        let header = DbfHeader {
            signature,
            last_update: [
                ((stamp.year() - 1900) & 0xff) as u8,
                stamp.month(),
                stamp.day(),
            ],
            record_count: U32::new(self.structure.record_count),
            header_length: U16::new(self.structure.header_length),
            record_length: U16::new(self.structure.record_length),
            reserved1: [0; 2],
            transaction_active: self.structure.transaction_active as u8,
            data_encrypted: self.structure.data_encrypted as u8,
            reserved2: [0; 12],
            mdx_paired: self.structure.mdx_paired as u8,
            language_driver: 0,
            reserved3: [0; 2],
        };
        codec::write_all_at(&self.file, header.as_bytes(), 0)?;

        for (i, field) in self.structure.fields().iter().enumerate() {
            let mut name = [0u8; 11];
            let bytes = field.name().as_bytes();
            name[..bytes.len()].copy_from_slice(bytes);

            let (length, decimals) = if field.field_type() == FieldType::Character {
                ((field.length() & 0xff) as u8, (field.length() >> 8) as u8)
            } else {
                (field.length() as u8, field.decimals() as u8)
            };

            let descriptor = FieldDescriptor {
                name,
                field_type: field.field_type().code(),
                reserved1: [0; 4],
                length,
                decimals,
                reserved2: [0; 2],
                work_area_id: 1,
                reserved3: [0; 2],
                set_fields_flag: 0,
                reserved4: [0; 7],
                index_field_flag: 0,
            };
            codec::write_all_at(
                &self.file,
                descriptor.as_bytes(),
                (HEADER_SIZE + i * DESCRIPTOR_SIZE) as u64,
            )?;
        }

        Ok(())
    }

    /// Byte offset of a record (1-based number) from the start of the file.
    fn record_offset(&self, record_number: i64) -> u64 {
        u64::from(self.structure.header_length)
            + (record_number as u64 - 1) * u64::from(self.structure.record_length)
    }

    /// Byte offset of a field within its record, including the deletion
    /// flag byte.
    fn field_offset(&self, index: usize) -> u64 {
        let mut offset = 1u64;
        for field in &self.structure.fields()[..index] {
            offset += u64::from(field.length());
        }
        offset
    }

    /// Decodes the record at `record_number` into the cursor's value set.
    /// At EOF, or at BOF of an empty table, each field decodes to its
    /// default instead.
    fn read_record(&mut self, record_number: i64) -> Result<()> {
        if (self.bof() && self.structure.record_count == 0) || self.eof() {
            self.values = self
                .structure
                .fields()
                .iter()
                .map(|f| f.default_value())
                .collect();
            return Ok(());
        }

        let _guard = self.lock.acquire();
        let record_number = if self.bof() { 1 } else { record_number };

        let offset = self.record_offset(record_number);
        let record_length = usize::from(self.structure.record_length);
        let mut raw = vec![0u8; record_length];
        {
            let _region = lock_region_if(
                self.config.file_locking,
                &self.file,
                offset,
                record_length as u64,
                true,
            )?;
            codec::read_exact_at(&self.file, &mut raw, offset, "DBF record")?;
        }

        self.current_record_deleted = raw[0] == DELETED_MARK;

        let mut values = Vec::with_capacity(self.structure.field_count());
        let mut at = 1usize;
        for field in self.structure.fields() {
            let width = field.length() as usize;
            let bytes = &raw[at..at + width];
            values.push(self.decode_field(field, bytes)?);
            at += width;
        }
        self.values = values;
        Ok(())
    }

    fn decode_field(&self, field: &Field, bytes: &[u8]) -> Result<Value> {
        match field.field_type() {
            FieldType::Character => {
                let text = String::from_utf8_lossy(bytes);
                if self.config.auto_trim {
                    Ok(Value::Text(text.trim_end_matches(' ').to_owned()))
                } else {
                    Ok(Value::Text(text.into_owned()))
                }
            }
            FieldType::Numeric | FieldType::Float => {
                let text = String::from_utf8_lossy(bytes.trim_ascii()).into_owned();
                if text.is_empty() {
                    Ok(field.default_value())
                } else {
                    let number = text.parse::<f64>().map_err(|_| {
                        XbaseError::corrupt(format!(
                            "field {} holds unparseable number {text:?}",
                            field.name()
                        ))
                    })?;
                    Ok(Value::Number(number))
                }
            }
            FieldType::Date => {
                if bytes.is_empty() || bytes[0] == b' ' {
                    return Ok(Value::Date(Date::BLANK));
                }
                let parse = |range: std::ops::Range<usize>| -> Result<i32> {
                    std::str::from_utf8(&bytes[range])
                        .ok()
                        .and_then(|s| s.trim().parse::<i32>().ok())
                        .ok_or_else(|| {
                            XbaseError::corrupt(format!(
                                "field {} holds an unparseable date",
                                field.name()
                            ))
                        })
                };
                let year = parse(0..4)?;
                let month = parse(4..6)?;
                let day = parse(6..8)?;
                Ok(Value::Date(Date::new(month as u8, day as u8, year as i16)))
            }
            FieldType::Logical => {
                let truthy = !bytes.is_empty() && matches!(bytes[0], b'y' | b'Y' | b't' | b'T');
                Ok(Value::Logical(truthy))
            }
            FieldType::Memo | FieldType::Binary | FieldType::General => {
                let block = codec::parse_block_number(bytes)?;
                if block == 0 {
                    return Ok(if field.field_type() == FieldType::Memo {
                        Value::Text(String::new())
                    } else {
                        Value::Bytes(Vec::new())
                    });
                }
                let payload = memo::read_memo(&self.dbt_path(), block, &self.config)?;
                Ok(if field.field_type() == FieldType::Memo {
                    Value::Text(String::from_utf8_lossy(&payload).into_owned())
                } else {
                    Value::Bytes(payload)
                })
            }
            FieldType::Unknown => Ok(Value::Text(String::new())),
        }
    }

    /// Stamps the header with today's date, unless it already carries it.
    fn update_last_modified(&mut self) -> Result<()> {
        let today = Date::today();
        if self.structure.last_updated == today {
            return Ok(());
        }

        {
            let _guard = self.lock.acquire();
            let stamp = [
                ((today.year() - 1900) & 0xff) as u8,
                today.month(),
                today.day(),
            ];
            let _region = lock_region_if(self.config.file_locking, &self.file, 1, 3, false)?;
            codec::write_all_at(&self.file, &stamp, 1)?;
        }
        self.structure.last_updated = today;
        Ok(())
    }
}
