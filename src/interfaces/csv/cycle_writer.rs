use crate::domain::cycle::PaymentCycle;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct CycleRow<'a> {
    cycle: u64,
    student: u32,
    teacher: u32,
    status: &'static str,
    start_date: String,
    end_date: Option<String>,
    total_classes: u32,
    total_amount: u64,
    commission: u64,
    teacher_payable: u64,
    proof: Option<&'a str>,
}

impl<'a> From<&'a PaymentCycle> for CycleRow<'a> {
    fn from(cycle: &'a PaymentCycle) -> Self {
        Self {
            cycle: cycle.id.value(),
            student: cycle.student.value(),
            teacher: cycle.teacher.value(),
            status: cycle.status.as_str(),
            start_date: cycle.start_date.to_string(),
            end_date: cycle.end_date.map(|date| date.to_string()),
            total_classes: cycle.total_classes,
            total_amount: cycle.total_amount.value(),
            commission: cycle.commission.value(),
            teacher_payable: cycle.teacher_payable.value(),
            proof: cycle.payment_proof.as_ref().map(|proof| proof.as_str()),
        }
    }
}

const HEADER: [&str; 11] = [
    "cycle",
    "student",
    "teacher",
    "status",
    "start_date",
    "end_date",
    "total_classes",
    "total_amount",
    "commission",
    "teacher_payable",
    "proof",
];

/// Writes the final state of payment cycles as CSV.
///
/// The header is written even when there are no cycles.
pub struct CycleWriter<W: Write> {
    writer: csv::Writer<W>,
    header_written: bool,
}

impl<W: Write> CycleWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(sink),
            header_written: false,
        }
    }

    pub fn write_cycles(&mut self, cycles: &[PaymentCycle]) -> Result<()> {
        if !self.header_written {
            self.writer.write_record(HEADER)?;
            self.header_written = true;
        }
        for cycle in cycles {
            self.writer.serialize(CycleRow::from(cycle))?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| std::io::Error::other(e.to_string()).into())
    }
}
