//! Application layer containing the billing orchestration.
//!
//! `BillingEngine` is the entry point for every operation. It serializes work
//! per (student, teacher) pair with async mutexes and delegates cycle lookup
//! and creation to the `CycleResolver`.

pub mod command;
pub mod engine;
pub mod locks;
pub mod reports;
pub mod resolver;
