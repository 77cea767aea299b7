use crate::application::command::Command;
use crate::domain::ids::{ConnectionId, CycleId, StudentId, TeacherId};
use crate::domain::money::Money;
use crate::domain::session::SessionLog;
use crate::error::{BillingError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Connect,
    Accept,
    Decline,
    Log,
    Proof,
    Approve,
    Reject,
    Opening,
}

/// One row of a billing event file. Columns an event doesn't use are empty.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct BillingEvent {
    pub r#type: EventType,
    #[serde(default)]
    pub student: Option<u32>,
    #[serde(default)]
    pub teacher: Option<u32>,
    #[serde(default)]
    pub connection: Option<u32>,
    #[serde(default)]
    pub cycle: Option<u64>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub hours: Option<Decimal>,
    #[serde(default)]
    pub rate: Option<u64>,
    #[serde(default)]
    pub proof: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub amount: Option<u64>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn required<T>(value: Option<T>, event: EventType, column: &str) -> Result<T> {
    value.ok_or_else(|| {
        BillingError::InvalidInput(format!("{:?} event is missing '{}'", event, column))
    })
}

impl BillingEvent {
    /// Turns the row into an engine command, checking the columns its type needs.
    pub fn into_command(self) -> Result<Command> {
        let kind = self.r#type;
        let command = match kind {
            EventType::Connect => Command::RequestConnection {
                connection: ConnectionId(required(self.connection, kind, "connection")?),
                student: StudentId(required(self.student, kind, "student")?),
                teacher: TeacherId(required(self.teacher, kind, "teacher")?),
                subject: required(self.subject, kind, "subject")?,
            },
            EventType::Accept => Command::AcceptConnection {
                connection: ConnectionId(required(self.connection, kind, "connection")?),
                teacher: TeacherId(required(self.teacher, kind, "teacher")?),
            },
            EventType::Decline => Command::DeclineConnection {
                connection: ConnectionId(required(self.connection, kind, "connection")?),
                teacher: TeacherId(required(self.teacher, kind, "teacher")?),
            },
            EventType::Log => Command::LogSession(SessionLog {
                student: StudentId(required(self.student, kind, "student")?),
                teacher: TeacherId(required(self.teacher, kind, "teacher")?),
                connection: ConnectionId(required(self.connection, kind, "connection")?),
                date: required(self.date, kind, "date")?,
                duration_hours: required(self.hours, kind, "hours")?,
                hourly_rate: Money::new(required(self.rate, kind, "rate")?),
                notes: self.notes,
            }),
            EventType::Proof => Command::AttachProof {
                cycle: CycleId(required(self.cycle, kind, "cycle")?),
                student: StudentId(required(self.student, kind, "student")?),
                proof: required(self.proof, kind, "proof")?,
            },
            EventType::Approve | EventType::Reject => Command::Verify {
                cycle: CycleId(required(self.cycle, kind, "cycle")?),
                approve: kind == EventType::Approve,
            },
            EventType::Opening => Command::OpenTeacherAccount {
                teacher: TeacherId(required(self.teacher, kind, "teacher")?),
                opening: Money::new(required(self.amount, kind, "amount")?),
            },
        };
        Ok(command)
    }
}

/// Reads billing events from a CSV source.
///
/// This reader wraps `csv::Reader` and yields one `Result<Command>` per row,
/// so a bad row is reported without stopping the stream.
pub struct EventReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> EventReader<R> {
    /// Creates a new `EventReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads rows and converts them to commands.
    pub fn commands(self) -> impl Iterator<Item = Result<Command>> {
        self.reader
            .into_deserialize::<BillingEvent>()
            .map(|result| result.map_err(BillingError::from)?.into_command())
    }
}
