//! # Table Lifecycle Tests
//!
//! End-to-end coverage of the DBF engine against real files: structure
//! round-trips through create/reopen, append/replace/read for every field
//! type, the memo reuse-versus-append policy, deletion tombstones, cursor
//! sentinel safety, and relative-path opens.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use tempfile::{tempdir, TempDir};
use xbase::{
    Config, Date, Dbf, Field, FieldType, TableStructure, Value, XbaseError, RECORD_NUMBER_BOF,
    RECORD_NUMBER_EOF,
};

fn full_structure() -> TableStructure {
    TableStructure::new(vec![
        Field::new("NAME", FieldType::Character, 20, 0),
        Field::new("BALANCE", FieldType::Numeric, 12, 2),
        Field::new("RATIO", FieldType::Float, 10, 4),
        Field::new("ACTIVE", FieldType::Logical, 1, 0),
        Field::new("OPENED", FieldType::Date, 8, 0),
        Field::new("NOTES", FieldType::Memo, 10, 0),
    ])
    .unwrap()
}

fn scratch_table(structure: TableStructure) -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("people.dbf");
    let dbf = Dbf::create(&path, structure, Config::default()).unwrap();
    drop(dbf);
    (dir, path)
}

mod structure_roundtrip_tests {
    use super::*;

    #[test]
    fn create_then_reopen_preserves_structure() {
        let (_dir, path) = scratch_table(full_structure());

        let dbf = Dbf::open(&path, Config::default()).unwrap();
        let structure = dbf.structure();

        assert_eq!(structure.field_count(), 6);
        assert_eq!(structure.record_count, 0);
        assert_eq!(structure.header_length, 32 + 32 * 6 + 1);
        assert_eq!(
            structure.record_length,
            1 + 20 + 12 + 10 + 1 + 8 + 10
        );
        assert!(structure.dbt_paired);

        let expected = full_structure();
        for (read, wanted) in structure.fields().iter().zip(expected.fields()) {
            assert_eq!(read, wanted);
        }
    }

    #[test]
    fn wide_character_fields_use_the_length_extension() {
        let structure = TableStructure::new(vec![
            Field::new("BODY", FieldType::Character, 300, 0),
            Field::new("TAIL", FieldType::Character, 7, 0),
        ])
        .unwrap();
        let (_dir, path) = scratch_table(structure);

        let dbf = Dbf::open(&path, Config::default()).unwrap();
        assert_eq!(dbf.structure().fields()[0].length(), 300);
        assert_eq!(dbf.structure().fields()[1].length(), 7);
        assert_eq!(dbf.structure().record_length, 1 + 300 + 7);
    }

    #[test]
    fn create_rejects_degenerate_structures() {
        let dir = tempdir().unwrap();

        let empty = TableStructure::default();
        assert!(matches!(
            Dbf::create(dir.path().join("none.dbf"), empty, Config::default()).unwrap_err(),
            XbaseError::InvalidArgument(_)
        ));

        // Duplicate names never get as far as create.
        assert!(TableStructure::new(vec![
            Field::new("TWIN", FieldType::Character, 4, 0),
            Field::new("twin", FieldType::Character, 4, 0),
        ])
        .is_err());

        let oversized = TableStructure::new(vec![
            Field::new("WIDE", FieldType::Numeric, 400, 0),
        ])
        .unwrap();
        assert!(matches!(
            Dbf::create(dir.path().join("wide.dbf"), oversized, Config::default()).unwrap_err(),
            XbaseError::InvalidArgument(_)
        ));
    }

    #[test]
    fn unknown_field_types_decode_as_empty_strings() {
        let structure = TableStructure::new(vec![
            Field::new("ODD", FieldType::Character, 6, 0),
            Field::new("OK", FieldType::Character, 4, 0),
        ])
        .unwrap();
        let (_dir, path) = scratch_table(structure);

        // Rewrite the first descriptor's type code to something unassigned.
        let file = OpenOptions::new().write(true).open(&path).unwrap();
        use std::os::unix::fs::FileExt;
        file.write_all_at(b"X", 32 + 11).unwrap();
        drop(file);

        let mut dbf = Dbf::open(&path, Config::default()).unwrap();
        assert_eq!(dbf.structure().fields()[0].field_type(), FieldType::Unknown);

        dbf.append_blank().unwrap();
        dbf.replace("OK", "ping").unwrap();
        dbf.goto_record(1).unwrap();
        assert_eq!(dbf.get_string("ODD").unwrap(), "");
        assert_eq!(dbf.get_string("OK").unwrap(), "ping");
    }

    #[test]
    fn structure_display_reports_every_field() {
        let (_dir, path) = scratch_table(full_structure());
        let dbf = Dbf::open(&path, Config::default()).unwrap();
        let listing = dbf.structure().to_string();
        for name in ["NAME", "BALANCE", "RATIO", "ACTIVE", "OPENED", "NOTES"] {
            assert!(listing.contains(name), "missing {name} in:\n{listing}");
        }
    }
}

mod append_replace_tests {
    use super::*;

    #[test]
    fn written_values_survive_close_and_reopen() {
        let (_dir, path) = scratch_table(full_structure());

        {
            let mut dbf = Dbf::open(&path, Config::default()).unwrap();
            dbf.append_blank().unwrap();
            assert_eq!(dbf.recno(), 1);

            dbf.replace("NAME", "Ada Lovelace").unwrap();
            dbf.replace("BALANCE", 125.5).unwrap();
            dbf.replace("RATIO", 0.625).unwrap();
            dbf.replace("ACTIVE", true).unwrap();
            dbf.replace("OPENED", Date::new(5, 18, 2012)).unwrap();
            dbf.replace("NOTES", "first entry in the ledger").unwrap();
        }

        let mut dbf = Dbf::open(&path, Config::default()).unwrap();
        dbf.goto_record(1).unwrap();

        assert_eq!(dbf.get_string("NAME").unwrap(), "Ada Lovelace");
        assert_eq!(dbf.get_double("BALANCE").unwrap(), 125.5);
        assert_eq!(dbf.get_double("RATIO").unwrap(), 0.625);
        assert!(dbf.get_boolean("ACTIVE").unwrap());
        assert_eq!(dbf.get_date("OPENED").unwrap(), Date::new(5, 18, 2012));
        assert_eq!(dbf.get_string("NOTES").unwrap(), "first entry in the ledger");
    }

    #[test]
    fn append_blank_fills_defaults() {
        let (_dir, path) = scratch_table(full_structure());
        let mut dbf = Dbf::open(&path, Config::default()).unwrap();

        dbf.append_blank().unwrap();
        assert_eq!(dbf.structure().record_count, 1);

        assert_eq!(dbf.get_string("NAME").unwrap(), "");
        assert_eq!(dbf.get_double("BALANCE").unwrap(), 0.0);
        assert!(!dbf.get_boolean("ACTIVE").unwrap());
        assert!(dbf.get_date("OPENED").unwrap().is_blank());
        assert_eq!(dbf.get_string("NOTES").unwrap(), "");
        assert!(!dbf.deleted());
    }

    #[test]
    fn values_truncate_to_field_width() {
        let (_dir, path) = scratch_table(full_structure());
        let mut dbf = Dbf::open(&path, Config::default()).unwrap();

        dbf.append_blank().unwrap();
        dbf.replace("NAME", "a name far longer than twenty bytes")
            .unwrap();
        dbf.goto_record(1).unwrap();
        assert_eq!(dbf.get_string("NAME").unwrap(), "a name far longer th");
    }

    #[test]
    fn replace_accepts_field_numbers() {
        let (_dir, path) = scratch_table(full_structure());
        let mut dbf = Dbf::open(&path, Config::default()).unwrap();

        dbf.append_blank().unwrap();
        dbf.replace(1usize, "by number").unwrap();
        assert_eq!(dbf.get_string(1usize).unwrap(), "by number");

        assert!(matches!(
            dbf.replace(0usize, "nope").unwrap_err(),
            XbaseError::InvalidArgument(_)
        ));
        assert!(matches!(
            dbf.replace(7usize, "nope").unwrap_err(),
            XbaseError::InvalidArgument(_)
        ));
        assert!(matches!(
            dbf.replace("GHOST", "nope").unwrap_err(),
            XbaseError::InvalidArgument(_)
        ));
    }

    #[test]
    fn auto_trim_can_be_disabled() {
        let (_dir, path) = scratch_table(full_structure());
        {
            let mut dbf = Dbf::open(&path, Config::default()).unwrap();
            dbf.append_blank().unwrap();
            dbf.replace("NAME", "padded").unwrap();
        }

        let mut dbf = Dbf::open(&path, Config::default().with_auto_trim(false)).unwrap();
        dbf.goto_record(1).unwrap();
        let raw = dbf.get_string("NAME").unwrap();
        assert_eq!(raw.len(), 20);
        assert!(raw.starts_with("padded"));
    }

    #[test]
    fn numeric_projections_work_through_getters() {
        let (_dir, path) = scratch_table(full_structure());
        let mut dbf = Dbf::open(&path, Config::default()).unwrap();

        dbf.append_blank().unwrap();
        dbf.replace("BALANCE", 42i32).unwrap();
        assert_eq!(dbf.get_int("BALANCE").unwrap(), 42);
        assert!(dbf.get_boolean("BALANCE").is_err());

        match dbf.value("BALANCE").unwrap() {
            Value::Number(n) => assert_eq!(*n, 42.0),
            other => panic!("expected a number, got {other:?}"),
        }
    }
}

mod memo_policy_tests {
    use super::*;

    fn dbt_len(path: &Path) -> u64 {
        let mut dbt = path.to_path_buf();
        dbt.set_extension("dbt");
        std::fs::metadata(dbt).unwrap().len()
    }

    #[test]
    fn memo_grows_then_reuses_per_block_arithmetic() {
        let (_dir, path) = scratch_table(full_structure());
        let mut dbf = Dbf::open(&path, Config::default()).unwrap();
        dbf.append_blank().unwrap();

        // First write: blank column, so a one-block chain is appended.
        let short = "m".repeat(300);
        dbf.replace("NOTES", short.as_str()).unwrap();
        let after_first = dbt_len(&path);
        assert_eq!(after_first, 512 * 2);

        // Growing to two blocks cannot reuse the one-block chain.
        let long = "M".repeat(600);
        dbf.replace("NOTES", long.as_str()).unwrap();
        let after_second = dbt_len(&path);
        assert_eq!(after_second, 512 * 4);

        // Shrinking fits the two-block chain, so nothing is appended.
        let shrunk = "s".repeat(200);
        dbf.replace("NOTES", shrunk.as_str()).unwrap();
        assert_eq!(dbt_len(&path), after_second);

        dbf.goto_record(1).unwrap();
        assert_eq!(dbf.get_string("NOTES").unwrap(), shrunk);
    }

    #[test]
    fn memo_reads_survive_reopen() {
        let (_dir, path) = scratch_table(full_structure());
        {
            let mut dbf = Dbf::open(&path, Config::default()).unwrap();
            dbf.append_blank().unwrap();
            dbf.replace("NOTES", "kept across handles").unwrap();
        }
        let mut dbf = Dbf::open(&path, Config::default()).unwrap();
        dbf.goto_record(1).unwrap();
        assert_eq!(dbf.get_string("NOTES").unwrap(), "kept across handles");
    }

    #[test]
    fn binary_memos_roundtrip_raw_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blobs.dbf");
        let structure = TableStructure::new(vec![
            Field::new("RAW", FieldType::Binary, 10, 0),
        ])
        .unwrap();
        let payload = vec![0u8, 1, 2, 0xff, 0x1a, 0, 7];

        {
            let mut dbf = Dbf::create(&path, structure, Config::default()).unwrap();
            dbf.append_blank().unwrap();
            dbf.replace("RAW", payload.clone()).unwrap();
        }

        let mut dbf = Dbf::open(&path, Config::default()).unwrap();
        dbf.goto_record(1).unwrap();
        assert_eq!(dbf.get_bytes("RAW").unwrap(), payload);
    }

    #[test]
    fn dbt_path_replaces_the_extension_characters() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("UPPER.DBF");
        let structure = TableStructure::new(vec![
            Field::new("NOTES", FieldType::Memo, 10, 0),
        ])
        .unwrap();

        let dbf = Dbf::create(&path, structure, Config::default()).unwrap();
        assert!(dbf.dbt_path().ends_with("UPPER.dbt"));
        assert!(dir.path().join("UPPER.dbt").exists());
    }

    #[test]
    fn configured_block_size_applies_to_new_dbts() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.dbf");
        let structure = TableStructure::new(vec![
            Field::new("NOTES", FieldType::Memo, 10, 0),
        ])
        .unwrap();
        let config = Config::default().with_dbt_block_size(16); // 1024-byte blocks

        let mut dbf = Dbf::create(&path, structure, config).unwrap();
        dbf.append_blank().unwrap();
        dbf.replace("NOTES", "x".repeat(900).as_str()).unwrap();
        dbf.goto_record(1).unwrap();
        assert_eq!(dbf.get_string("NOTES").unwrap().len(), 900);

        // One 1024-byte header block plus one 1024-byte chain.
        assert_eq!(std::fs::metadata(dir.path().join("big.dbt")).unwrap().len(), 2048);
    }
}

mod cursor_tests {
    use super::*;

    fn three_records(path: &Path) -> Dbf {
        let mut dbf = Dbf::open(path, Config::default()).unwrap();
        for name in ["one", "two", "three"] {
            dbf.append_blank().unwrap();
            dbf.replace("NAME", name).unwrap();
        }
        dbf
    }

    #[test]
    fn goto_record_clamps_to_sentinels() {
        let (_dir, path) = scratch_table(full_structure());
        let mut dbf = three_records(&path);

        assert_eq!(dbf.goto_record(2).unwrap(), 2);
        assert_eq!(dbf.get_string("NAME").unwrap(), "two");

        assert_eq!(dbf.goto_record(99).unwrap(), RECORD_NUMBER_EOF);
        assert!(dbf.eof());
        assert_eq!(dbf.get_string("NAME").unwrap(), "");

        assert_eq!(dbf.goto_record(-5).unwrap(), RECORD_NUMBER_BOF);
        assert!(dbf.bof());
    }

    #[test]
    fn skip_moves_relative_to_the_cursor() {
        let (_dir, path) = scratch_table(full_structure());
        let mut dbf = three_records(&path);

        dbf.goto_record(1).unwrap();
        assert_eq!(dbf.skip(2).unwrap(), 3);
        assert_eq!(dbf.skip(-1).unwrap(), 2);
        assert_eq!(dbf.skip(10).unwrap(), RECORD_NUMBER_EOF);
    }

    #[test]
    fn empty_table_stays_at_bof() {
        let (_dir, path) = scratch_table(full_structure());
        let mut dbf = Dbf::open(&path, Config::default()).unwrap();
        assert!(dbf.bof());
        assert_eq!(dbf.goto_record(1).unwrap(), RECORD_NUMBER_BOF);
    }

    #[test]
    fn replace_at_bof_and_eof_is_rejected() {
        let (_dir, path) = scratch_table(full_structure());
        let mut dbf = Dbf::open(&path, Config::default()).unwrap();

        // Empty table: cursor is at BOF.
        assert!(matches!(
            dbf.replace("NAME", "never").unwrap_err(),
            XbaseError::InvalidArgument(_)
        ));

        dbf.append_blank().unwrap();
        dbf.goto_record(9).unwrap();
        assert!(dbf.eof());
        assert!(matches!(
            dbf.replace("NAME", "never").unwrap_err(),
            XbaseError::InvalidArgument(_)
        ));

        // The record was not touched by the failed replaces.
        dbf.goto_record(1).unwrap();
        assert_eq!(dbf.get_string("NAME").unwrap(), "");
    }

    #[test]
    fn delete_and_undelete_toggle_the_tombstone() {
        let (_dir, path) = scratch_table(full_structure());
        let mut dbf = three_records(&path);

        dbf.goto_record(2).unwrap();
        assert!(!dbf.deleted());
        dbf.delete().unwrap();
        assert!(dbf.deleted());
        // Idempotent.
        dbf.delete().unwrap();
        assert!(dbf.deleted());

        // The tombstone is on disk, not just in memory.
        dbf.goto_record(1).unwrap();
        dbf.goto_record(2).unwrap();
        assert!(dbf.deleted());

        dbf.undelete().unwrap();
        assert!(!dbf.deleted());
        dbf.goto_record(2).unwrap();
        assert!(!dbf.deleted());
    }

    #[test]
    fn delete_at_sentinels_is_rejected() {
        let (_dir, path) = scratch_table(full_structure());
        let mut dbf = Dbf::open(&path, Config::default()).unwrap();
        assert!(matches!(
            dbf.delete().unwrap_err(),
            XbaseError::InvalidArgument(_)
        ));
    }

    #[test]
    fn append_refuses_past_the_size_ceiling() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("huge.dbf");
        let structure = TableStructure::new(vec![
            Field::new("BLOB", FieldType::Character, 65_000, 0),
        ])
        .unwrap();
        let mut dbf = Dbf::create(&path, structure, Config::default()).unwrap();
        dbf.append_blank().unwrap();

        // Forge a record count that puts the next append past 2 GB.
        use std::os::unix::fs::FileExt;
        let file = OpenOptions::new().write(true).open(&path).unwrap();
        file.write_all_at(&40_000u32.to_le_bytes(), 4).unwrap();
        drop(file);

        dbf.goto_record(1).unwrap();
        assert_eq!(dbf.structure().record_count, 40_000);
        assert!(matches!(
            dbf.append_blank().unwrap_err(),
            XbaseError::InvalidArgument(_)
        ));
    }
}

mod open_path_tests {
    use super::*;

    #[test]
    fn relative_open_appends_the_extension() {
        let dir = tempdir().unwrap();
        let config = Config::default().with_current_directory(dir.path());
        let structure = TableStructure::new(vec![
            Field::new("NAME", FieldType::Character, 8, 0),
        ])
        .unwrap();
        drop(Dbf::create_relative("ledger", structure, config.clone()).unwrap());
        assert!(dir.path().join("ledger.dbf").exists());

        let dbf = Dbf::open_relative("ledger", config).unwrap();
        assert_eq!(dbf.structure().field_count(), 1);
    }

    #[test]
    fn missing_table_is_an_io_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            Dbf::open(dir.path().join("absent.dbf"), Config::default()).unwrap_err(),
            XbaseError::Io(_)
        ));
    }

    #[test]
    fn field_numbers_are_one_based() {
        let (_dir, path) = scratch_table(full_structure());
        let dbf = Dbf::open(&path, Config::default()).unwrap();
        assert_eq!(dbf.field_number_by_name("NAME"), 1);
        assert_eq!(dbf.field_number_by_name("notes"), 6);
        assert_eq!(dbf.field_number_by_name("GHOST"), 0);
    }

    #[test]
    fn thread_safe_config_still_roundtrips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("locked.dbf");
        let config = Config::default()
            .with_thread_safety(true)
            .with_file_locking(true);
        let mut dbf = Dbf::create(&path, full_structure(), config).unwrap();

        dbf.append_blank().unwrap();
        dbf.replace("NAME", "guarded").unwrap();
        dbf.goto_record(1).unwrap();
        assert_eq!(dbf.get_string("NAME").unwrap(), "guarded");
    }
}
