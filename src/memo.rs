//! # DBT Memo Store
//!
//! Variable-length memo payloads live in a DBT side file addressed by block
//! number; the owning DBF record stores only a 10-byte ASCII block number
//! column. Every operation here opens and closes its own file handle, so no
//! long-lived cycle exists between a table and its memo store.
//!
//! ## On-Disk Layout
//!
//! Block zero is the header:
//!
//! ```text
//! Offset  Size  Description
//! 0       4     Next available block (u32 LE)
//! 4       4     Initial marker, written as 1 at create
//! 8       8     First 8 bytes of the owning DBF base name, null padded
//! 16      4     Reserved
//! 20      2     Block length in bytes (u16 LE, multiple of 64, >= 64)
//! 22      ...   Reserved to the end of block zero
//! ```
//!
//! Each memo record starts on a block boundary:
//!
//! ```text
//! Offset  Size  Description
//! 0       4     Sentinel FF FF 08 00
//! 4       4     Total length (u32 LE): value length + 8 header bytes
//! 8       n     Value bytes
//! 8+n     ...   Null padding to a multiple of the block length
//! ```
//!
//! A value of length `n` occupies `ceil((n + 8) / block_length)` contiguous
//! blocks.
//!
//! ## Allocation Policy
//!
//! [`write_memo`] reuses the existing chain in place when the record already
//! points at one (`old_block != 0`) and the new value fits in no more blocks
//! than the old one did. Otherwise it appends at the next-available-block
//! cursor in the header, bumping the cursor by the new chain length under an
//! exclusive region lock on the cursor field.
//!
//! ## Failure Semantics
//!
//! A block whose sentinel does not read `FF FF 08 00`, or a header block
//! length below 64 bytes, marks the file corrupt and fails the operation.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use tracing::debug;
use zerocopy::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::codec;
use crate::config::Config;
use crate::error::{Result, XbaseError};
use crate::lock::lock_region_if;

/// First four bytes of every memo record.
pub const MEMO_SENTINEL: [u8; 4] = [0xff, 0xff, 0x08, 0x00];

/// Smallest legal DBT block length.
pub const MIN_BLOCK_LENGTH: u16 = 64;

const HEADER_SIZE: usize = 22;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct DbtHeader {
    next_available_block: U32,
    initial_marker: U32,
    owner_name: [u8; 8],
    reserved: [u8; 4],
    block_length: U16,
}

const _: () = assert!(std::mem::size_of::<DbtHeader>() == HEADER_SIZE);

fn open_for_write(path: &Path, config: &Config) -> Result<File> {
    let mut options = OpenOptions::new();
    options.read(true).write(true);
    if config.synchronous_writes {
        options.custom_flags(libc::O_SYNC);
    }
    Ok(options.open(path)?)
}

/// Reads and validates the header, returning the block length in bytes.
fn read_block_length(file: &File) -> Result<u64> {
    let mut raw = [0u8; HEADER_SIZE];
    codec::read_exact_at(file, &mut raw, 0, "DBT header")?;
    let header = DbtHeader::ref_from_bytes(&raw)
        .map_err(|e| XbaseError::corrupt(format!("unreadable DBT header: {e:?}")))?;

    let block_length = header.block_length.get();
    if block_length < MIN_BLOCK_LENGTH {
        return Err(XbaseError::corrupt(format!(
            "DBT block length {block_length} is below the {MIN_BLOCK_LENGTH}-byte minimum"
        )));
    }
    if block_length % 64 != 0 {
        return Err(XbaseError::corrupt(format!(
            "DBT block length {block_length} is not a multiple of 64"
        )));
    }
    Ok(u64::from(block_length))
}

/// Number of blocks a memo value of `value_length` bytes occupies.
fn blocks_required(value_length: usize, block_length: u64) -> u64 {
    (value_length as u64 + 8).div_ceil(block_length)
}

/// Creates a fresh DBT file with an empty block zero.
///
/// `owner_base_name` is the DBF file name without its extension; its first
/// eight bytes are recorded in the header. The block length is taken from
/// the configuration and applies to this file forever after.
pub fn create(path: &Path, owner_base_name: &str, config: &Config) -> Result<()> {
    let mut options = OpenOptions::new();
    options.read(true).write(true).create_new(true);
    if config.synchronous_writes {
        options.custom_flags(libc::O_SYNC);
    }
    let file = options.open(path)?;

    let mut owner = [0u8; 8];
    for (slot, byte) in owner.iter_mut().zip(owner_base_name.bytes()) {
        *slot = byte;
    }

    let header = DbtHeader {
        next_available_block: U32::new(1),
        initial_marker: U32::new(1),
        owner_name: owner,
        reserved: [0u8; 4],
        block_length: U16::new(config.dbt_block_size * 64),
    };
    codec::write_all_at(&file, header.as_bytes(), 0)?;
    file.set_len(512)?;

    debug!(path = %path.display(), block_length = config.dbt_block_bytes(), "created DBT");
    Ok(())
}

/// Reads the memo value stored at `block_number`.
pub fn read_memo(path: &Path, block_number: u32, config: &Config) -> Result<Vec<u8>> {
    if block_number == 0 {
        return Err(XbaseError::invalid("memo block number must be positive"));
    }

    let file = File::open(path)?;
    let block_length = read_block_length(&file)?;
    let start = u64::from(block_number) * block_length;

    let mut record_header = [0u8; 8];
    codec::read_exact_at(&file, &mut record_header, start, "DBT block header")?;
    if record_header[..4] != MEMO_SENTINEL {
        return Err(XbaseError::corrupt(format!(
            "DBT block {} header starts {:02x} {:02x} {:02x} {:02x}, expected ff ff 08 00",
            block_number, record_header[0], record_header[1], record_header[2], record_header[3],
        )));
    }

    let total_length = u32::from_le_bytes([
        record_header[4],
        record_header[5],
        record_header[6],
        record_header[7],
    ]);
    let value_length = total_length.saturating_sub(8) as usize;

    let _region = lock_region_if(
        config.file_locking,
        &file,
        start,
        value_length as u64 + 8,
        true,
    )?;

    let mut value = vec![0u8; value_length];
    codec::read_exact_at(&file, &mut value, start + 8, "DBT memo value")?;
    Ok(value)
}

/// Writes a memo value, reusing the record's existing chain when it fits.
///
/// `old_block` is the chain start currently recorded in the DBF column (zero
/// when the column is blank) and `old_length` the byte length of the value
/// it holds. Returns the newly allocated block number when the value was
/// appended, or `None` when the old chain was reused in place; the caller
/// owns rewriting the DBF column in the former case.
pub fn write_memo(
    path: &Path,
    old_block: u32,
    old_length: usize,
    value: &[u8],
    config: &Config,
) -> Result<Option<u32>> {
    let file = open_for_write(path, config)?;
    let block_length = read_block_length(&file)?;

    let old_blocks = blocks_required(old_length, block_length);
    let new_blocks = blocks_required(value.len(), block_length);

    let (start, appended_at) = if old_block != 0 && new_blocks <= old_blocks {
        (u64::from(old_block) * block_length, None)
    } else {
        // Claim blocks at the allocation cursor, bumping it under an
        // exclusive lock so concurrent appenders cannot double-allocate.
        let _region = lock_region_if(config.file_locking, &file, 0, 4, false)?;
        let next = codec::read_u32_at(&file, 0, "DBT next-available block")?;
        codec::write_u32_at(&file, next + new_blocks as u32, 0)?;

        let start = u64::from(next) * block_length;
        codec::write_all_at(&file, &MEMO_SENTINEL, start)?;
        (start, Some(next))
    };

    codec::write_u32_at(&file, value.len() as u32 + 8, start + 4)?;
    codec::write_all_at(&file, value, start + 8)?;

    // Null-pad the tail so the chain ends on a block boundary.
    let end = start + new_blocks * block_length;
    let written = start + 8 + value.len() as u64;
    if written < end {
        let padding = vec![0u8; (end - written) as usize];
        codec::write_all_at(&file, &padding, written)?;
    }

    Ok(appended_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn scratch_dbt(config: &Config) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.dbt");
        create(&path, "notes", config).unwrap();
        (dir, path)
    }

    #[test]
    fn create_writes_the_header_block() {
        let config = Config::default();
        let (_dir, path) = scratch_dbt(&config);

        let file = File::open(&path).unwrap();
        assert_eq!(file.metadata().unwrap().len(), 512);
        assert_eq!(codec::read_u32_at(&file, 0, "next").unwrap(), 1);
        assert_eq!(codec::read_u32_at(&file, 4, "marker").unwrap(), 1);
        assert_eq!(codec::read_u16_at(&file, 20, "block length").unwrap(), 512);

        let mut name = [0u8; 8];
        codec::read_exact_at(&file, &mut name, 8, "owner").unwrap();
        assert_eq!(&name[..5], b"notes");
    }

    #[test]
    fn create_refuses_to_clobber() {
        let config = Config::default();
        let (_dir, path) = scratch_dbt(&config);
        assert!(matches!(
            create(&path, "notes", &config).unwrap_err(),
            XbaseError::Io(_)
        ));
    }

    #[test]
    fn memo_roundtrip_through_append() {
        let config = Config::default();
        let (_dir, path) = scratch_dbt(&config);

        let block = write_memo(&path, 0, 0, b"a short memo", &config)
            .unwrap()
            .expect("blank column appends");
        assert_eq!(block, 1);
        assert_eq!(read_memo(&path, block, &config).unwrap(), b"a short memo");

        // File padded out to whole blocks.
        let len = File::open(&path).unwrap().metadata().unwrap().len();
        assert_eq!(len % 512, 0);
    }

    #[test]
    fn reuse_when_new_chain_is_not_longer() {
        let config = Config::default();
        let (_dir, path) = scratch_dbt(&config);

        let first = write_memo(&path, 0, 0, &[b'x'; 100], &config)
            .unwrap()
            .unwrap();
        // 100 bytes still needs one 512-byte block; same chain is reused.
        let reused = write_memo(&path, first, 100, &[b'y'; 400], &config).unwrap();
        assert!(reused.is_none());
        assert_eq!(read_memo(&path, first, &config).unwrap(), vec![b'y'; 400]);
    }

    #[test]
    fn append_when_new_chain_grows() {
        let config = Config::default();
        let (_dir, path) = scratch_dbt(&config);

        let first = write_memo(&path, 0, 0, &[b'x'; 100], &config)
            .unwrap()
            .unwrap();
        // 600 bytes needs two blocks; a fresh chain is allocated after the
        // first one.
        let second = write_memo(&path, first, 100, &[b'y'; 600], &config)
            .unwrap()
            .expect("growing chain appends");
        assert!(second > first);
        assert_eq!(read_memo(&path, second, &config).unwrap(), vec![b'y'; 600]);

        // Shrinking back fits the two-block chain, so it is reused.
        let shrunk = write_memo(&path, second, 600, &[b'z'; 50], &config).unwrap();
        assert!(shrunk.is_none());
        assert_eq!(read_memo(&path, second, &config).unwrap(), vec![b'z'; 50]);
    }

    #[test]
    fn corrupt_sentinel_is_fatal() {
        let config = Config::default();
        let (_dir, path) = scratch_dbt(&config);

        let block = write_memo(&path, 0, 0, b"payload", &config)
            .unwrap()
            .unwrap();
        let file = OpenOptions::new().write(true).open(&path).unwrap();
        codec::write_all_at(&file, &[0x00, 0x00], u64::from(block) * 512).unwrap();

        assert!(matches!(
            read_memo(&path, block, &config).unwrap_err(),
            XbaseError::Corrupt { .. }
        ));
    }

    #[test]
    fn undersized_block_length_is_fatal() {
        let config = Config::default();
        let (_dir, path) = scratch_dbt(&config);

        let file = OpenOptions::new().write(true).open(&path).unwrap();
        codec::write_all_at(&file, &32u16.to_le_bytes(), 20).unwrap();

        assert!(matches!(
            read_memo(&path, 1, &config).unwrap_err(),
            XbaseError::Corrupt { .. }
        ));
    }

    #[test]
    fn missing_file_is_io() {
        let config = Config::default();
        let dir = tempdir().unwrap();
        assert!(matches!(
            read_memo(&dir.path().join("absent.dbt"), 1, &config).unwrap_err(),
            XbaseError::Io(_)
        ));
    }
}
