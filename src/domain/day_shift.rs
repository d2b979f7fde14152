use crate::domain::interval::Interval;
use chrono::Duration;
use log::warn;

/// Moves every interval by `days`; an interval that cannot be shifted as a whole is kept as-is.
pub fn shift_by_days(intervals: &[Interval], days: i64) -> Vec<Interval> {
    let Some(offset) = Duration::try_days(days) else {
        warn!("event=day_shift module=domain status=skipped reason=offset_overflow days={days}");
        return intervals.to_vec();
    };
    intervals
        .iter()
        .map(|interval| {
            shift_interval(interval, offset).unwrap_or_else(|| {
                warn!(
                    "event=day_shift module=domain status=skipped reason=range_overflow id={} days={days}",
                    interval.id
                );
                interval.clone()
            })
        })
        .collect()
}

/// Like [`shift_by_days`], but returns `None` unless every interval can be shifted.
pub fn try_shift_by_days(intervals: &[Interval], days: i64) -> Option<Vec<Interval>> {
    let offset = Duration::try_days(days)?;
    intervals
        .iter()
        .map(|interval| shift_interval(interval, offset))
        .collect()
}

// Start, end and date move together or not at all.
fn shift_interval(interval: &Interval, offset: Duration) -> Option<Interval> {
    let start = interval
        .start
        .map(|start| start.checked_add_signed(offset).ok_or(()))
        .transpose()
        .ok()?;
    let end = interval
        .end
        .map(|end| end.checked_add_signed(offset).ok_or(()))
        .transpose()
        .ok()?;
    let date = interval.date.checked_add_signed(offset)?;
    Some(interval.moved_to(start, end, date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, NaiveDate, Utc};
    use proptest::prelude::*;

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn day(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid date")
    }

    #[test]
    fn shift_moves_block_to_next_day() {
        let block = Interval {
            id: "X".to_string(),
            label: "Gym".to_string(),
            description: None,
            date: day("2026-02-16"),
            start: Some(fixed_time("2026-02-16T08:00:00Z")),
            end: Some(fixed_time("2026-02-16T09:00:00Z")),
        };
        let shifted = shift_by_days(&[block], 1);
        assert_eq!(shifted.len(), 1);
        assert_eq!(shifted[0].id, "X");
        assert_eq!(shifted[0].date, day("2026-02-17"));
        assert_eq!(shifted[0].start, Some(fixed_time("2026-02-17T08:00:00Z")));
        assert_eq!(shifted[0].end, Some(fixed_time("2026-02-17T09:00:00Z")));
    }

    #[test]
    fn shift_moves_only_date_of_unscheduled() {
        let loose = Interval::unscheduled("loose", "Someday", day("2026-02-28"));
        let shifted = shift_by_days(&[loose], 1);
        assert_eq!(shifted[0].date, day("2026-03-01"));
        assert_eq!(shifted[0].start, None);
        assert_eq!(shifted[0].end, None);
    }

    #[test]
    fn shift_accepts_negative_days() {
        let loose = Interval::unscheduled("loose", "Someday", day("2026-03-01"));
        let shifted = shift_by_days(&[loose], -1);
        assert_eq!(shifted[0].date, day("2026-02-28"));
    }

    #[test]
    fn shift_with_absurd_offset_leaves_input_unchanged() {
        let loose = Interval::unscheduled("loose", "Someday", day("2026-03-01"));
        let shifted = shift_by_days(std::slice::from_ref(&loose), i64::MAX);
        assert_eq!(shifted, vec![loose]);
    }

    #[test]
    fn shift_keeps_interval_whole_when_end_leaves_range() {
        let end = DateTime::<Utc>::MAX_UTC - Duration::hours(12);
        let near_limit = Interval {
            id: "edge".to_string(),
            label: "Edge".to_string(),
            description: None,
            date: day("2026-02-16"),
            start: Some(end - Duration::days(2)),
            end: Some(end),
        };
        let shifted = shift_by_days(std::slice::from_ref(&near_limit), 1);
        assert_eq!(shifted, vec![near_limit.clone()]);
        assert_eq!(shifted[0].duration(), near_limit.duration());
        assert_eq!(try_shift_by_days(std::slice::from_ref(&near_limit), 1), None);
    }

    #[test]
    fn try_shift_rejects_offset_overflow() {
        let loose = Interval::unscheduled("loose", "Someday", day("2026-03-01"));
        assert_eq!(try_shift_by_days(std::slice::from_ref(&loose), i64::MAX), None);
        let shifted = try_shift_by_days(std::slice::from_ref(&loose), 2).expect("shiftable");
        assert_eq!(shifted[0].date, day("2026-03-03"));
    }

    proptest! {
        #[test]
        fn shift_preserves_order_and_duration(
            spans in prop::collection::vec((0i64..2_000, 1i64..600), 0..8),
            days in -400i64..400
        ) {
            let anchor = fixed_time("2026-02-16T00:00:00Z");
            let intervals = spans
                .iter()
                .enumerate()
                .map(|(index, (offset, minutes))| {
                    let start = anchor + Duration::minutes(*offset);
                    Interval {
                        id: format!("blk-{index}"),
                        label: "prop".to_string(),
                        description: None,
                        date: day("2026-02-16"),
                        start: Some(start),
                        end: Some(start + Duration::minutes(*minutes)),
                    }
                })
                .collect::<Vec<_>>();

            let shifted = shift_by_days(&intervals, days);
            prop_assert_eq!(shifted.len(), intervals.len());
            for (before, after) in intervals.iter().zip(&shifted) {
                prop_assert_eq!(&before.id, &after.id);
                prop_assert_eq!(before.duration(), after.duration());
                prop_assert_eq!(
                    after.start,
                    before.start.map(|start| start + Duration::days(days))
                );
            }
        }
    }
}
