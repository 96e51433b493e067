//! End-to-end tests for the dump-to-histogram pipeline.
//!
//! These build synthetic dump files on disk and run the full library path
//! (read, partition, parse, bin, merge, reshape) against them.

use std::fs;
use std::path::PathBuf;

use dumphist::{histogram_from_dump, Config, Scheduler};
use tempfile::TempDir;

fn entries_row(id: &str, size: i64, inode_type: &str) -> String {
    format!("('{id}',0,0,{size},0,0,0,0,0,'{inode_type}',0,0,0,0,'a','b')")
}

fn write_dump(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("entries.sql");
    fs::write(&path, content).expect("Failed to write dump");
    path
}

fn single_threaded() -> Config {
    Config {
        scheduler: Scheduler::SingleThreaded,
        ..Config::default()
    }
}

#[test]
fn test_round_trip_multi_row_statement() {
    let dir = TempDir::new().unwrap();
    let rows: Vec<String> = (0..10)
        .map(|i| entries_row(&format!("inode-{i}"), i * 100, if i % 2 == 0 { "file" } else { "dir" }))
        .collect();
    let dump = format!("INSERT INTO `ENTRIES` VALUES {};\n", rows.join(","));
    let path = write_dump(&dir, &dump);

    let (table, stats) = histogram_from_dump(&path, &single_threaded()).unwrap();
    assert_eq!(stats.records, 10);
    assert_eq!(stats.skipped(), 0);
    assert_eq!(table.total_for("file"), 5);
    assert_eq!(table.total_for("dir"), 5);
}

#[test]
fn test_end_to_end_two_row_scenario() {
    let dir = TempDir::new().unwrap();
    let dump = "INSERT INTO x (...) VALUES \
                ('1',0,0,0,0,0,0,0,0,'file',0,0,0,0,'a','b'),\
                ('2',0,0,3,0,0,0,0,0,'dir',0,0,0,0,'a','b');\n";
    let path = write_dump(&dir, dump);

    let (table, stats) = histogram_from_dump(&path, &single_threaded()).unwrap();
    assert_eq!(stats.records, 2);
    // Size 0 is bin 0; size 3 is bin 3, labeled by its boundary 4. The
    // index is dense over [0, 3], so the boundary labels are 0, 1, 2, 4.
    assert_eq!(table.boundaries, vec![0, 1, 2, 4]);
    assert_eq!(table.types, vec!["dir".to_string(), "file".to_string()]);
    assert_eq!(table.count_at(0, "file"), 1);
    assert_eq!(table.count_at(4, "dir"), 1);
    assert_eq!(table.count_at(4, "file"), 0);
    assert_eq!(table.count_at(0, "dir"), 0);
    assert_eq!(table.count_at(1, "file"), 0);
    assert_eq!(table.count_at(2, "file"), 0);
}

#[test]
fn test_malformed_row_among_valid_ones() {
    let dir = TempDir::new().unwrap();
    let dump = format!(
        "INSERT INTO `ENTRIES` VALUES {},('bad',0,0,1,0,0,0,0,0,'file',0,0,0,0,'a'),{};\n",
        entries_row("good-1", 0, "file"),
        entries_row("good-2", 3, "dir"),
    );
    let path = write_dump(&dir, &dump);

    let (table, stats) = histogram_from_dump(&path, &single_threaded()).unwrap();
    assert_eq!(stats.records, 2);
    assert_eq!(stats.malformed_rows, 1);
    assert_eq!(table.count_at(0, "file"), 1);
    assert_eq!(table.count_at(4, "dir"), 1);
}

#[test]
fn test_partitioning_does_not_change_the_histogram() {
    let dir = TempDir::new().unwrap();
    let mut dump = String::from("-- synthetic dump\n");
    for i in 0..100i64 {
        dump.push_str(&format!(
            "INSERT INTO `ENTRIES` VALUES {},{};\n",
            entries_row(&format!("f{i}"), i * 313 % 10_000, "file"),
            entries_row(&format!("s{i}"), i % 2, "symlink"),
        ));
    }
    let path = write_dump(&dir, &dump);

    let (reference, ref_stats) = histogram_from_dump(&path, &single_threaded()).unwrap();
    assert_eq!(ref_stats.records, 200);

    for (blocksize, scheduler, workers) in [
        (dump.len() / 2, Scheduler::SingleThreaded, 0),
        (512, Scheduler::SingleThreaded, 0),
        (512, Scheduler::Threads, 3),
        (64, Scheduler::Threads, 8),
        (64, Scheduler::Processes, 2),
    ] {
        let config = Config {
            blocksize,
            scheduler,
            workers,
            ..Config::default()
        };
        let (table, stats) = histogram_from_dump(&path, &config).unwrap();
        assert_eq!(stats, ref_stats, "stats diverged at blocksize {blocksize}");
        assert_eq!(table.boundaries, reference.boundaries);
        assert_eq!(table.types, reference.types);
        assert_eq!(table.counts, reference.counts);
    }
}

#[test]
fn test_save_csv_export_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let dump = format!(
        "INSERT INTO `ENTRIES` VALUES {};\nINSERT INTO `ENTRIES` VALUES {};\n",
        entries_row("a", 0, "file"),
        entries_row("b", 3, "dir"),
    );
    let path = write_dump(&dir, &dump);
    let export = dir.path().join("raw.csv");

    // Tiny blocksize forces one statement per partition; the export must
    // still come out in partition order.
    let config = Config {
        blocksize: 1,
        scheduler: Scheduler::Threads,
        workers: 2,
        save_csv: Some(export.clone()),
    };
    let (_, stats) = histogram_from_dump(&path, &config).unwrap();
    assert_eq!(stats.records, 2);

    let content = fs::read_to_string(&export).unwrap();
    assert_eq!(content, "size,type\n0,file\n3,dir\n");
}

#[test]
fn test_quoting_and_nulls_flow_through() {
    let dir = TempDir::new().unwrap();
    // Escaped quote in the id, comma inside the fileclass, NULL size.
    let dump = "INSERT INTO `ENTRIES` VALUES \
                ('it\\'s',0,0,NULL,0,0,0,0,0,'file',0,0,0,0,'x,y','b');\n";
    let path = write_dump(&dir, dump);

    let (table, stats) = histogram_from_dump(&path, &single_threaded()).unwrap();
    assert_eq!(stats.records, 1);
    assert_eq!(stats.skipped(), 0);
    // NULL size coerces to zero, which is bin 0.
    assert_eq!(table.count_at(0, "file"), 1);
}

#[test]
fn test_empty_dump_yields_empty_table() {
    let dir = TempDir::new().unwrap();
    let path = write_dump(&dir, "-- nothing here\n");
    let (table, stats) = histogram_from_dump(&path, &single_threaded()).unwrap();
    assert!(table.is_empty());
    assert_eq!(stats.records, 0);
}

#[test]
fn test_missing_dump_is_a_structural_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.sql");
    assert!(histogram_from_dump(&missing, &single_threaded()).is_err());
}
