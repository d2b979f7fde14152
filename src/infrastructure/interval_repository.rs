use crate::domain::interval::Interval;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::open_database;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use log::debug;
use rusqlite::{Connection, OptionalExtension, params};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const DATE_FORMAT: &str = "%Y-%m-%d";
const UPSERT_SQL: &str = "INSERT INTO intervals (id, label, description, date, start_at, end_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
     ON CONFLICT(id) DO UPDATE SET
       label = excluded.label,
       description = excluded.description,
       date = excluded.date,
       start_at = excluded.start_at,
       end_at = excluded.end_at";
const SELECT_COLUMNS: &str = "SELECT id, label, description, date, start_at, end_at FROM intervals";

pub trait IntervalRepository: Send + Sync {
    fn get_by_id(&self, id: &str) -> Result<Option<Interval>, InfraError>;
    fn upsert(&self, interval: &Interval) -> Result<(), InfraError>;
    /// Writes every interval or none of them.
    fn upsert_all(&self, intervals: &[Interval]) -> Result<(), InfraError>;
    fn delete(&self, id: &str) -> Result<bool, InfraError>;
    /// Intervals anchored on `date`: scheduled ones by start, then unscheduled ones by id.
    fn list_by_date(&self, date: NaiveDate) -> Result<Vec<Interval>, InfraError>;
    /// Scheduled intervals whose `[start, end)` intersects `[start, end)`, ordered by start.
    fn query_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Interval>, InfraError>;
}

#[derive(Debug, Clone)]
pub struct SqliteIntervalRepository {
    db_path: PathBuf,
}

impl SqliteIntervalRepository {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        open_database(&self.db_path)
    }

    fn query_rows(
        connection: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Interval>, InfraError> {
        let mut statement = connection.prepare(sql)?;
        let rows = statement
            .query_map(params, IntervalRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(IntervalRow::into_interval).collect()
    }
}

impl IntervalRepository for SqliteIntervalRepository {
    fn get_by_id(&self, id: &str) -> Result<Option<Interval>, InfraError> {
        let connection = self.connect()?;
        let row = connection
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                params![id.trim()],
                IntervalRow::from_row,
            )
            .optional()?;
        row.map(IntervalRow::into_interval).transpose()
    }

    fn upsert(&self, interval: &Interval) -> Result<(), InfraError> {
        interval.validate().map_err(InfraError::InvalidInput)?;
        let connection = self.connect()?;
        IntervalRow::from_interval(interval).upsert_into(&connection)
    }

    fn upsert_all(&self, intervals: &[Interval]) -> Result<(), InfraError> {
        for interval in intervals {
            interval.validate().map_err(InfraError::InvalidInput)?;
        }
        let mut connection = self.connect()?;
        let transaction = connection.transaction()?;
        for interval in intervals {
            IntervalRow::from_interval(interval).upsert_into(&transaction)?;
        }
        transaction.commit()?;
        debug!(
            "event=upsert_all module=interval_repository status=ok count={}",
            intervals.len()
        );
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<bool, InfraError> {
        let connection = self.connect()?;
        let removed = connection.execute("DELETE FROM intervals WHERE id = ?1", params![id.trim()])?;
        Ok(removed > 0)
    }

    fn list_by_date(&self, date: NaiveDate) -> Result<Vec<Interval>, InfraError> {
        let connection = self.connect()?;
        Self::query_rows(
            &connection,
            &format!(
                "{SELECT_COLUMNS} WHERE date = ?1 ORDER BY start_at IS NULL, start_at, id"
            ),
            params![date.format(DATE_FORMAT).to_string()],
        )
    }

    fn query_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Interval>, InfraError> {
        if end <= start {
            return Ok(Vec::new());
        }
        let connection = self.connect()?;
        Self::query_rows(
            &connection,
            &format!(
                "{SELECT_COLUMNS}
                 WHERE start_at IS NOT NULL AND end_at IS NOT NULL
                   AND start_at < ?2 AND end_at > ?1
                 ORDER BY start_at, id"
            ),
            params![encode_instant(start), encode_instant(end)],
        )
    }
}

struct IntervalRow {
    id: String,
    label: String,
    description: Option<String>,
    date: String,
    start_at: Option<String>,
    end_at: Option<String>,
}

impl IntervalRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            label: row.get(1)?,
            description: row.get(2)?,
            date: row.get(3)?,
            start_at: row.get(4)?,
            end_at: row.get(5)?,
        })
    }

    fn from_interval(interval: &Interval) -> Self {
        Self {
            id: interval.id.trim().to_string(),
            label: interval.label.clone(),
            description: interval.description.clone(),
            date: interval.date.format(DATE_FORMAT).to_string(),
            start_at: interval.start.map(encode_instant),
            end_at: interval.end.map(encode_instant),
        }
    }

    fn upsert_into(&self, connection: &Connection) -> Result<(), InfraError> {
        connection.execute(
            UPSERT_SQL,
            params![
                self.id,
                self.label,
                self.description,
                self.date,
                self.start_at,
                self.end_at
            ],
        )?;
        Ok(())
    }

    fn into_interval(self) -> Result<Interval, InfraError> {
        let date = NaiveDate::parse_from_str(&self.date, DATE_FORMAT).map_err(|error| {
            InfraError::InvalidInput(format!(
                "invalid intervals.date '{}' for {}: {error}",
                self.date, self.id
            ))
        })?;
        let start = self
            .start_at
            .as_deref()
            .map(|raw| decode_instant(raw, "start_at"))
            .transpose()?;
        let end = self
            .end_at
            .as_deref()
            .map(|raw| decode_instant(raw, "end_at"))
            .transpose()?;
        Ok(Interval {
            id: self.id,
            label: self.label,
            description: self.description,
            date,
            start,
            end,
        })
    }
}

// Fixed-width UTC text keeps SQLite's lexical ordering equal to time ordering.
fn encode_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_instant(raw: &str, field_name: &str) -> Result<DateTime<Utc>, InfraError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| {
            InfraError::InvalidInput(format!("invalid intervals.{field_name} '{raw}': {error}"))
        })
}

#[derive(Debug, Default)]
pub struct InMemoryIntervalRepository {
    intervals: Mutex<HashMap<String, Interval>>,
}

impl InMemoryIntervalRepository {
    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Interval>>, InfraError> {
        self.intervals.lock().map_err(|error| {
            InfraError::InvalidConfig(format!("interval store lock poisoned: {error}"))
        })
    }
}

impl IntervalRepository for InMemoryIntervalRepository {
    fn get_by_id(&self, id: &str) -> Result<Option<Interval>, InfraError> {
        Ok(self.lock()?.get(id.trim()).cloned())
    }

    fn upsert(&self, interval: &Interval) -> Result<(), InfraError> {
        self.upsert_all(std::slice::from_ref(interval))
    }

    fn upsert_all(&self, intervals: &[Interval]) -> Result<(), InfraError> {
        for interval in intervals {
            interval.validate().map_err(InfraError::InvalidInput)?;
        }
        let mut stored = self.lock()?;
        for interval in intervals {
            stored.insert(interval.id.trim().to_string(), interval.clone());
        }
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<bool, InfraError> {
        Ok(self.lock()?.remove(id.trim()).is_some())
    }

    fn list_by_date(&self, date: NaiveDate) -> Result<Vec<Interval>, InfraError> {
        let mut intervals = self
            .lock()?
            .values()
            .filter(|interval| interval.date == date)
            .cloned()
            .collect::<Vec<_>>();
        intervals.sort_by(compare_for_day);
        Ok(intervals)
    }

    fn query_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Interval>, InfraError> {
        let mut intervals = self
            .lock()?
            .values()
            .filter(|interval| match (interval.start, interval.end) {
                (Some(interval_start), Some(interval_end)) => {
                    interval_start < end && interval_end > start
                }
                _ => false,
            })
            .cloned()
            .collect::<Vec<_>>();
        intervals.sort_by(compare_for_day);
        Ok(intervals)
    }
}

fn compare_for_day(left: &Interval, right: &Interval) -> Ordering {
    match (left.start, right.start) {
        (Some(left_start), Some(right_start)) => left_start.cmp(&right_start),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| left.id.cmp(&right.id))
}
