use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

const DST_GAP_STEP_MINUTES: i64 = 15;
const DST_GAP_MAX_STEPS: usize = 4 * 24;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Interval {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl Interval {
    pub fn unscheduled(id: impl Into<String>, label: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            date,
            start: None,
            end: None,
        }
    }

    /// Builds an interval from wall-clock times picked on `date`.
    ///
    /// An `end_time` earlier than `start_time` is read as an overnight span and
    /// lands on the following calendar day. Equal times are kept as-is and
    /// fail [`Interval::validate`].
    pub fn authored(
        id: impl Into<String>,
        label: impl Into<String>,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
        zone: Tz,
    ) -> Self {
        let end_date = if end_time < start_time {
            date.succ_opt().unwrap_or(date)
        } else {
            date
        };
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            date,
            start: Some(resolve_local(date.and_time(start_time), zone)),
            end: Some(resolve_local(end_date.and_time(end_time), zone)),
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn is_scheduled(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    pub fn is_degenerate(&self) -> bool {
        matches!((self.start, self.end), (Some(start), Some(end)) if end <= start)
    }

    /// Returns `(start, end)` only for scheduled intervals with a positive span.
    pub fn span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match (self.start, self.end) {
            (Some(start), Some(end)) if start < end => Some((start, end)),
            _ => None,
        }
    }

    /// `end - start`, clamped to zero for reversed or empty spans.
    pub fn duration(&self) -> Option<Duration> {
        let (start, end) = (self.start?, self.end?);
        Some((end - start).max(Duration::zero()))
    }

    pub(crate) fn moved_to(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        date: NaiveDate,
    ) -> Interval {
        Interval {
            start,
            end,
            date,
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "interval.id")?;
        validate_non_empty(&self.label, "interval.label")?;
        match (self.start, self.end) {
            (Some(start), Some(end)) if end <= start => {
                Err("interval.end must be after interval.start".to_string())
            }
            (Some(_), None) | (None, Some(_)) => {
                Err("interval.start and interval.end must be set together".to_string())
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayWindow {
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    pub fn for_date(date: NaiveDate, zone: Tz) -> Self {
        let start = start_of_day(date, zone);
        Self {
            date,
            start,
            end: start + Duration::hours(24),
        }
    }

    /// The `23:59` boundary the timeline always closes on.
    pub fn last_minute(&self) -> DateTime<Utc> {
        self.start + Duration::hours(23) + Duration::minutes(59)
    }
}

pub fn start_of_day(date: NaiveDate, zone: Tz) -> DateTime<Utc> {
    resolve_local(date.and_time(NaiveTime::MIN), zone)
}

// Local times that fall into a DST gap resolve to the first valid instant after them.
fn resolve_local(local: NaiveDateTime, zone: Tz) -> DateTime<Utc> {
    let mut candidate = local;
    for _ in 0..=DST_GAP_MAX_STEPS {
        if let Some(resolved) = zone.from_local_datetime(&candidate).earliest() {
            return resolved.with_timezone(&Utc);
        }
        candidate = candidate + Duration::minutes(DST_GAP_STEP_MINUTES);
    }
    Utc.from_utc_datetime(&local)
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}
