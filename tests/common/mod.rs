#![allow(dead_code)]

use std::fs::File;
use std::io::{Error, Write};
use std::path::Path;
use tempfile::NamedTempFile;

pub const HEADER: &str =
    "type, student, teacher, connection, cycle, date, hours, rate, proof, subject, amount, notes";

pub fn connect(student: u32, teacher: u32, connection: u32) -> Vec<String> {
    vec![
        format!("connect, {student}, {teacher}, {connection}, , , , , , mathematics, ,"),
        format!("accept, , {teacher}, {connection}, , , , , , , ,"),
    ]
}

pub fn sessions(student: u32, teacher: u32, connection: u32, count: usize, rate: u64) -> Vec<String> {
    (0..count)
        .map(|i| {
            let day = i % 28 + 1;
            format!("log, {student}, {teacher}, {connection}, , 2026-03-{day:02}, 1, {rate}, , , ,")
        })
        .collect()
}

pub fn proof(cycle: u64, student: u32, reference: &str) -> String {
    format!("proof, {student}, , , {cycle}, , , , {reference}, , ,")
}

pub fn approve(cycle: u64) -> String {
    format!("approve, , , , {cycle}, , , , , , ,")
}

pub fn reject(cycle: u64) -> String {
    format!("reject, , , , {cycle}, , , , , , ,")
}

/// Writes the header and rows to a temporary events file.
pub fn events_file(rows: &[String]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", HEADER).unwrap();
    for row in rows {
        writeln!(file, "{}", row).unwrap();
    }
    file.flush().unwrap();
    file
}

/// Generates `pairs` linked pairs, each logging `sessions_per_pair` classes.
pub fn generate_events_csv(path: &Path, pairs: u32, sessions_per_pair: usize) -> Result<(), Error> {
    let mut file = File::create(path)?;
    writeln!(file, "{}", HEADER)?;
    for pair in 1..=pairs {
        for row in connect(pair, 1000 + pair, pair) {
            writeln!(file, "{}", row)?;
        }
    }
    // Interleave pairs so no pair's sessions arrive in one block
    for round in 0..sessions_per_pair {
        for pair in 1..=pairs {
            let day = round % 28 + 1;
            writeln!(
                file,
                "log, {pair}, {}, {pair}, , 2026-04-{day:02}, 0.5, 400, , , ,",
                1000 + pair
            )?;
        }
    }
    file.flush()?;
    Ok(())
}
