#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::process::Command;
use tempfile::tempdir;

mod common;

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run: link the pair and log 10 classes
    let mut rows = common::connect(1, 10, 100);
    rows.extend(common::sessions(1, 10, 100, 10, 500));
    let csv1 = common::events_file(&rows);

    let output1 = Command::new(cargo_bin!("tutorbill"))
        .arg(csv1.path())
        .arg("--db-path")
        .arg(&db_path)
        .output()
        .expect("Failed to execute command");
    assert!(output1.status.success());
    let stdout1 = String::from_utf8_lossy(&output1.stdout);
    assert!(stdout1.contains(",,10,5000,500,4500,"));

    // 2. Second run: the connection and open cycle survive, 15 more close it
    let csv2 = common::events_file(&common::sessions(1, 10, 100, 15, 500));

    let output2 = Command::new(cargo_bin!("tutorbill"))
        .arg(csv2.path())
        .arg("--db-path")
        .arg(&db_path)
        .output()
        .expect("Failed to execute command");
    assert!(output2.status.success());
    let stdout2 = String::from_utf8_lossy(&output2.stdout);
    assert!(stdout2.contains("1,1,10,pending_payment,"));
    assert!(stdout2.contains(",25,12500,1250,11250,"));

    // 3. Third run: pay it; ids continue after the recovered sequence
    let rows = vec![common::proof(1, 1, "receipts/1.png"), common::approve(1)];
    let csv3 = common::events_file(&rows);

    let output3 = Command::new(cargo_bin!("tutorbill"))
        .arg(csv3.path())
        .arg("--db-path")
        .arg(&db_path)
        .output()
        .expect("Failed to execute command");
    assert!(output3.status.success());
    let stdout3 = String::from_utf8_lossy(&output3.stdout);
    assert!(stdout3.contains("1,1,10,paid,"));
    assert!(stdout3.contains("2,1,10,active,"));
}
