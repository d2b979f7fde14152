use crate::application::bootstrap::bootstrap_workspace;
use crate::domain::clip::clip;
use crate::domain::day_shift::try_shift_by_days;
use crate::domain::interval::{DayWindow, Interval};
use crate::domain::reflow::{move_item, reflow};
use crate::domain::timeline::{Slot, SlotKind, partition};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::interval_repository::{IntervalRepository, SqliteIntervalRepository};
use crate::infrastructure::reminder_scheduler::{InMemoryReminderScheduler, ReminderScheduler};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, SubsecRound, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

fn next_id(prefix: &str) -> String {
    let sequence = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{}-{sequence}", Utc::now().timestamp_micros())
}

pub struct AppState {
    config_dir: PathBuf,
    logs_dir: PathBuf,
    zone: Tz,
    reminder_lead: Duration,
    intervals: Arc<dyn IntervalRepository>,
    reminders: Arc<dyn ReminderScheduler>,
    now_provider: NowProvider,
    log_guard: Mutex<()>,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let zone = bootstrap.config.zone()?;

        Ok(Self {
            config_dir: bootstrap.config_dir,
            intervals: Arc::new(SqliteIntervalRepository::new(&bootstrap.database_path)),
            logs_dir: bootstrap.logs_dir,
            zone,
            reminder_lead: bootstrap.config.reminder_lead(),
            reminders: Arc::new(InMemoryReminderScheduler::default()),
            now_provider: Arc::new(Utc::now),
            log_guard: Mutex::new(()),
        })
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn with_reminder_scheduler(mut self, reminders: Arc<dyn ReminderScheduler>) -> Self {
        self.reminders = reminders;
        self
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    pub fn reminders(&self) -> &dyn ReminderScheduler {
        self.reminders.as_ref()
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        self.log_error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        self.append_log("info", command, message);
    }

    pub fn log_error(&self, command: &str, message: &str) {
        self.append_log("error", command, message);
    }

    fn append_log(&self, level: &str, command: &str, message: &str) {
        let Ok(_guard) = self.log_guard.lock() else {
            return;
        };
        let path = self.logs_dir.join("commands.log");
        let payload = serde_json::json!({
            "timestamp": (self.now_provider)().to_rfc3339(),
            "level": level,
            "command": command,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", payload);
        }
    }

    // Keeps exactly one reminder per interval, or none when its start has passed.
    fn sync_reminder(&self, interval: &Interval) -> Result<(), InfraError> {
        let fire_at = interval.start.map(|start| start - self.reminder_lead);
        match fire_at {
            Some(fire_at) if fire_at > (self.now_provider)() => {
                self.reminders.schedule(&interval.id, fire_at)
            }
            _ => self.reminders.cancel(&interval.id).map(|_| ()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotResponse {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub kind: SlotKind,
    pub occupant_ids: Vec<String>,
}

impl From<&Slot> for SlotResponse {
    fn from(slot: &Slot) -> Self {
        Self {
            start: slot.start,
            end: slot.end,
            kind: slot.kind(),
            occupant_ids: slot
                .occupants
                .iter()
                .map(|interval| interval.id.clone())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DayViewResponse {
    pub date: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub intervals: Vec<Interval>,
    pub slots: Vec<SlotResponse>,
    pub overlap_count: usize,
}

pub fn create_block_impl(
    state: &AppState,
    label: String,
    description: Option<String>,
    date: String,
    start_time: String,
    end_time: String,
) -> Result<Interval, InfraError> {
    let date = parse_date_input(&date, "date")?;
    let start_time = parse_hhmm_input(&start_time, "start_time")?;
    let end_time = parse_hhmm_input(&end_time, "end_time")?;

    let interval = Interval::authored(
        next_id("blk"),
        label.trim(),
        date,
        start_time,
        end_time,
        state.zone,
    )
    .with_description(normalize_description(description));
    interval.validate().map_err(InfraError::InvalidInput)?;

    state.intervals.upsert(&interval)?;
    state.sync_reminder(&interval)?;
    state.log_info(
        "create_block",
        &format!(
            "created block_id={} date={} start={:?} end={:?}",
            interval.id, interval.date, interval.start, interval.end
        ),
    );
    Ok(interval)
}

pub fn create_unscheduled_impl(
    state: &AppState,
    label: String,
    description: Option<String>,
    date: String,
) -> Result<Interval, InfraError> {
    let date = parse_date_input(&date, "date")?;
    let interval = Interval::unscheduled(next_id("blk"), label.trim(), date)
        .with_description(normalize_description(description));
    interval.validate().map_err(InfraError::InvalidInput)?;

    state.intervals.upsert(&interval)?;
    state.log_info(
        "create_unscheduled",
        &format!("created block_id={} date={}", interval.id, interval.date),
    );
    Ok(interval)
}

pub fn adjust_block_time_impl(
    state: &AppState,
    block_id: String,
    start_at: String,
    end_at: String,
) -> Result<Interval, InfraError> {
    let block_id = block_id.trim();
    if block_id.is_empty() {
        return Err(InfraError::InvalidInput(
            "block_id must not be empty".to_string(),
        ));
    }
    let start = parse_rfc3339_input(&start_at, "start_at")?;
    let end = parse_rfc3339_input(&end_at, "end_at")?;
    if end <= start {
        return Err(InfraError::InvalidInput(
            "end_at must be after start_at".to_string(),
        ));
    }

    let Some(stored) = state.intervals.get_by_id(block_id)? else {
        return Err(InfraError::NotFound(format!("block not found: {block_id}")));
    };
    let updated = Interval {
        start: Some(start),
        end: Some(end),
        ..stored
    };
    state.intervals.upsert(&updated)?;
    state.sync_reminder(&updated)?;

    state.log_info(
        "adjust_block_time",
        &format!("adjusted block_id={block_id} start={start} end={end}"),
    );
    Ok(updated)
}

pub fn delete_block_impl(state: &AppState, block_id: String) -> Result<bool, InfraError> {
    let block_id = block_id.trim();
    if block_id.is_empty() {
        return Err(InfraError::InvalidInput(
            "block_id must not be empty".to_string(),
        ));
    }

    let deleted = state.intervals.delete(block_id)?;
    state.reminders.cancel(block_id)?;
    state.log_info(
        "delete_block",
        &format!("block_id={block_id} deleted={deleted}"),
    );
    Ok(deleted)
}

pub fn list_day_impl(state: &AppState, date: String) -> Result<DayViewResponse, InfraError> {
    let date = parse_date_input(&date, "date")?;
    let window = DayWindow::for_date(date, state.zone);

    let stored = state.intervals.query_range(window.start, window.end)?;
    let visible = clip(&stored, &window);
    let slots = partition(&visible, &window);
    let slots = slots.iter().map(SlotResponse::from).collect::<Vec<_>>();
    let overlap_count = slots
        .iter()
        .filter(|slot| slot.kind == SlotKind::Overlap)
        .count();

    Ok(DayViewResponse {
        date: date.format("%Y-%m-%d").to_string(),
        window_start: window.start,
        window_end: window.end,
        intervals: visible,
        slots,
        overlap_count,
    })
}

/// Commits a finished drag over the blocks anchored on `date`.
///
/// The whole reflowed day is written in one transaction, so a failed write
/// leaves the previous schedule in place.
pub fn reorder_blocks_impl(
    state: &AppState,
    date: String,
    source_index: usize,
    target_index: usize,
) -> Result<Vec<Interval>, InfraError> {
    let date = parse_date_input(&date, "date")?;
    let day = state.intervals.list_by_date(date)?;
    if source_index >= day.len() || target_index >= day.len() {
        return Err(InfraError::InvalidInput(format!(
            "reorder indices {source_index}->{target_index} out of range for {} blocks",
            day.len()
        )));
    }

    let reordered = move_item(&day, source_index, target_index);
    let reflowed = reflow(&reordered, date, state.zone);
    state.intervals.upsert_all(&reflowed)?;

    for (before, after) in reordered.iter().zip(&reflowed) {
        if before.start != after.start {
            state.sync_reminder(after)?;
        }
    }

    state.log_info(
        "reorder_blocks",
        &format!(
            "date={date} source={source_index} target={target_index} blocks={}",
            reflowed.len()
        ),
    );
    Ok(reflowed)
}

pub fn duplicate_day_impl(
    state: &AppState,
    date: String,
    days: i64,
) -> Result<Vec<Interval>, InfraError> {
    let date = parse_date_input(&date, "date")?;
    if days == 0 {
        return Err(InfraError::InvalidInput(
            "days must not be zero".to_string(),
        ));
    }

    let source = state.intervals.list_by_date(date)?;
    let shifted = try_shift_by_days(&source, days).ok_or_else(|| {
        InfraError::InvalidInput(format!(
            "cannot shift {date} by {days} days: outside the supported date range"
        ))
    })?;
    let duplicates = shifted
        .into_iter()
        .map(|interval| Interval {
            id: next_id("blk"),
            ..interval
        })
        .collect::<Vec<_>>();
    state.intervals.upsert_all(&duplicates)?;
    for interval in &duplicates {
        state.sync_reminder(interval)?;
    }

    state.log_info(
        "duplicate_day",
        &format!("date={date} days={days} duplicated={}", duplicates.len()),
    );
    Ok(duplicates)
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_date_input(value: &str, field_name: &str) -> Result<NaiveDate, InfraError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| InfraError::InvalidInput(format!("{field_name} must be YYYY-MM-DD")))
}

fn parse_hhmm_input(value: &str, field_name: &str) -> Result<NaiveTime, InfraError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| InfraError::InvalidInput(format!("{field_name} must be HH:MM")))
}

fn parse_rfc3339_input(value: &str, field_name: &str) -> Result<DateTime<Utc>, InfraError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|value| value.with_timezone(&Utc).trunc_subsecs(6))
        .map_err(|error| {
            InfraError::InvalidInput(format!(
                "{field_name} must be RFC3339 date-time: {error}"
            ))
        })
}
