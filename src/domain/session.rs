use super::ids::{ConnectionId, CycleId, Pair, SessionId, StudentId, TeacherId};
use super::money::{Hours, Money};
use crate::error::{BillingError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A completed class as reported by the teacher, before it is priced.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionLog {
    pub student: StudentId,
    pub teacher: TeacherId,
    pub connection: ConnectionId,
    pub date: String,
    pub duration_hours: rust_decimal::Decimal,
    pub hourly_rate: Money,
    pub notes: Option<String>,
}

impl SessionLog {
    pub fn pair(&self) -> Pair {
        Pair::new(self.student, self.teacher)
    }

    /// Checks the parts of the log that don't need storage.
    pub fn validate(&self) -> Result<(NaiveDate, Hours)> {
        let date = parse_date(&self.date)?;
        let hours = Hours::new(self.duration_hours)?;
        Ok((date, hours))
    }
}

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|e| {
        BillingError::InvalidInput(format!("Invalid class date '{}': {}", raw, e))
    })
}

/// One logged tutoring session. Never changes once created.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Session {
    pub id: SessionId,
    pub student: StudentId,
    pub teacher: TeacherId,
    pub connection: ConnectionId,
    /// The cycle that was active for the pair when the session was logged.
    pub cycle: CycleId,
    pub date: NaiveDate,
    pub duration: Hours,
    pub hourly_rate: Money,
    pub amount: Money,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn record(
        id: SessionId,
        cycle: CycleId,
        log: SessionLog,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        let (date, duration) = log.validate()?;
        let amount = Money::for_duration(duration, log.hourly_rate)?;
        let notes = log
            .notes
            .map(|notes| notes.trim().to_string())
            .filter(|notes| !notes.is_empty());

        Ok(Self {
            id,
            student: log.student,
            teacher: log.teacher,
            connection: log.connection,
            cycle,
            date,
            duration,
            hourly_rate: log.hourly_rate,
            amount,
            notes,
            created_at,
        })
    }
}
