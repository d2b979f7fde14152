use crate::domain::interval::{Interval, start_of_day};
use chrono::NaiveDate;
use chrono_tz::Tz;
use log::{debug, warn};

/// Packs intervals back-to-back from local midnight of `base_date`, in the given order.
///
/// Each interval keeps its stored duration. Unscheduled intervals are passed
/// through untouched at their position and do not advance the cursor. Totals
/// beyond 24 hours simply run into the next day. An interval whose packed end
/// would leave chrono's representable range is passed through as well.
pub fn reflow(ordered: &[Interval], base_date: NaiveDate, zone: Tz) -> Vec<Interval> {
    let mut cursor = start_of_day(base_date, zone);
    let mut packed = 0usize;
    let result = ordered
        .iter()
        .map(|interval| {
            let Some(duration) = interval.duration() else {
                return interval.clone();
            };
            let start = cursor;
            let Some(end) = start.checked_add_signed(duration) else {
                warn!(
                    "event=reflow module=domain status=skipped reason=end_overflow id={}",
                    interval.id
                );
                return interval.clone();
            };
            cursor = end;
            packed += 1;
            interval.moved_to(Some(start), Some(end), base_date)
        })
        .collect::<Vec<_>>();
    debug!(
        "event=reflow module=domain date={base_date} packed={packed} passed_through={} ends_at={cursor}",
        ordered.len() - packed
    );
    result
}

/// Applies a resolved drag: the item at `source` is removed and reinserted at `target`.
///
/// Out-of-range indices leave the order unchanged.
pub fn move_item<T: Clone>(items: &[T], source: usize, target: usize) -> Vec<T> {
    let mut reordered = items.to_vec();
    if source >= reordered.len() || target >= reordered.len() {
        return reordered;
    }
    let item = reordered.remove(source);
    reordered.insert(target, item);
    reordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};
    use proptest::prelude::*;

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn base_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 16).expect("valid date")
    }

    fn block(id: &str, start: &str, minutes: i64) -> Interval {
        let start = fixed_time(start);
        Interval {
            id: id.to_string(),
            label: format!("block {id}"),
            description: Some(format!("about {id}")),
            date: base_date(),
            start: Some(start),
            end: Some(start + Duration::minutes(minutes)),
        }
    }

    fn span_of(interval: &Interval) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            interval.start.expect("packed start"),
            interval.end.expect("packed end"),
        )
    }

    #[test]
    fn reflow_packs_reordered_blocks_from_midnight() {
        let original = vec![
            block("A", "2026-02-16T09:00:00Z", 30),
            block("B", "2026-02-16T13:00:00Z", 15),
            block("C", "2026-02-16T16:00:00Z", 45),
        ];
        let reordered = move_item(&original, 0, 2);
        let result = reflow(&reordered, base_date(), Tz::UTC);

        let ids = result.iter().map(|interval| interval.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["B", "C", "A"]);
        assert_eq!(
            span_of(&result[0]),
            (
                fixed_time("2026-02-16T00:00:00Z"),
                fixed_time("2026-02-16T00:15:00Z")
            )
        );
        assert_eq!(
            span_of(&result[1]),
            (
                fixed_time("2026-02-16T00:15:00Z"),
                fixed_time("2026-02-16T01:00:00Z")
            )
        );
        assert_eq!(
            span_of(&result[2]),
            (
                fixed_time("2026-02-16T01:00:00Z"),
                fixed_time("2026-02-16T01:30:00Z")
            )
        );
        assert_eq!(result[2].description.as_deref(), Some("about A"));
    }

    #[test]
    fn reflow_passes_unscheduled_through_in_place() {
        let loose = Interval::unscheduled("loose", "Someday", base_date());
        let ordered = vec![
            block("A", "2026-02-16T09:00:00Z", 30),
            loose.clone(),
            block("B", "2026-02-16T13:00:00Z", 15),
        ];
        let result = reflow(&ordered, base_date(), Tz::UTC);
        assert_eq!(result[1], loose);
        assert_eq!(result[0].end, result[2].start);
    }

    #[test]
    fn reflow_moves_blocks_onto_base_date() {
        let ordered = vec![block("A", "2026-02-10T09:00:00Z", 60)];
        let target = NaiveDate::from_ymd_opt(2026, 2, 20).expect("valid date");
        let result = reflow(&ordered, target, Tz::UTC);
        assert_eq!(result[0].date, target);
        assert_eq!(result[0].start, Some(fixed_time("2026-02-20T00:00:00Z")));
    }

    #[test]
    fn reflow_anchors_on_local_midnight() {
        let ordered = vec![block("A", "2026-02-16T09:00:00Z", 60)];
        let result = reflow(&ordered, base_date(), Tz::Europe__Berlin);
        assert_eq!(result[0].start, Some(fixed_time("2026-02-15T23:00:00Z")));
    }

    #[test]
    fn reflow_continues_past_midnight_when_day_overflows() {
        let ordered = vec![
            block("A", "2026-02-16T00:00:00Z", 20 * 60),
            block("B", "2026-02-16T00:00:00Z", 6 * 60),
        ];
        let result = reflow(&ordered, base_date(), Tz::UTC);
        assert_eq!(result[1].end, Some(fixed_time("2026-02-17T02:00:00Z")));
        assert_eq!(result[1].date, base_date());
    }

    #[test]
    fn reflow_passes_through_span_too_large_to_pack() {
        let huge = Interval {
            id: "huge".to_string(),
            label: "Everything".to_string(),
            description: None,
            date: base_date(),
            start: Some(DateTime::<Utc>::MIN_UTC),
            end: Some(DateTime::<Utc>::MAX_UTC),
        };
        let ordered = vec![huge.clone(), block("A", "2026-02-16T09:00:00Z", 30)];
        let result = reflow(&ordered, base_date(), Tz::UTC);
        assert_eq!(result[0], huge);
        assert_eq!(result[1].start, Some(fixed_time("2026-02-16T00:00:00Z")));
        assert_eq!(result[1].end, Some(fixed_time("2026-02-16T00:30:00Z")));
    }

    #[test]
    fn reflow_packs_reversed_span_with_zero_duration() {
        let mut reversed = block("R", "2026-02-16T10:00:00Z", 30);
        std::mem::swap(&mut reversed.start, &mut reversed.end);
        let ordered = vec![reversed, block("A", "2026-02-16T09:00:00Z", 30)];
        let result = reflow(&ordered, base_date(), Tz::UTC);
        assert_eq!(result[0].start, result[0].end);
        assert_eq!(result[1].start, Some(fixed_time("2026-02-16T00:00:00Z")));
    }

    #[test]
    fn reflow_of_empty_list_is_empty() {
        assert!(reflow(&[], base_date(), Tz::UTC).is_empty());
    }

    #[test]
    fn move_item_ignores_out_of_range_indices() {
        let items = vec![1, 2, 3];
        assert_eq!(move_item(&items, 3, 0), items);
        assert_eq!(move_item(&items, 0, 5), items);
        assert_eq!(move_item(&items, 2, 0), vec![3, 1, 2]);
    }

    fn durations() -> impl Strategy<Value = Vec<(i64, i64)>> {
        prop::collection::vec((-1_440i64..2_880, 1i64..600), 0..10)
    }

    fn build(spans: &[(i64, i64)]) -> Vec<Interval> {
        let anchor = fixed_time("2026-02-16T00:00:00Z");
        spans
            .iter()
            .enumerate()
            .map(|(index, (offset, minutes))| {
                let start = anchor + Duration::minutes(*offset);
                Interval {
                    id: format!("blk-{index}"),
                    label: "prop".to_string(),
                    description: None,
                    date: base_date(),
                    start: Some(start),
                    end: Some(start + Duration::minutes(*minutes)),
                }
            })
            .collect()
    }

    // Reflow translates but never resizes, and leaves no gaps from midnight on.
    proptest! {
        #[test]
        fn reflow_conserves_duration_and_packs_without_gaps(spans in durations()) {
            let ordered = build(&spans);
            let result = reflow(&ordered, base_date(), Tz::UTC);

            prop_assert_eq!(result.len(), ordered.len());
            for (before, after) in ordered.iter().zip(&result) {
                prop_assert_eq!(&before.id, &after.id);
                prop_assert_eq!(before.duration(), after.duration());
            }
            if let Some(first) = result.first() {
                prop_assert_eq!(first.start, Some(fixed_time("2026-02-16T00:00:00Z")));
            }
            for pair in result.windows(2) {
                prop_assert_eq!(pair[0].end, pair[1].start);
            }
        }
    }

    proptest! {
        #[test]
        fn reflow_is_idempotent(spans in durations()) {
            let once = reflow(&build(&spans), base_date(), Tz::UTC);
            let twice = reflow(&once, base_date(), Tz::UTC);
            prop_assert_eq!(once, twice);
        }
    }
}
