use crate::domain::interval::{DayWindow, Interval};
use log::debug;

pub fn clip(intervals: &[Interval], window: &DayWindow) -> Vec<Interval> {
    let clipped = intervals
        .iter()
        .filter_map(|interval| clip_interval(interval, window))
        .collect::<Vec<_>>();
    debug!(
        "event=clip module=domain date={} input={} output={}",
        window.date,
        intervals.len(),
        clipped.len()
    );
    clipped
}

fn clip_interval(interval: &Interval, window: &DayWindow) -> Option<Interval> {
    let (Some(start), Some(end)) = (interval.start, interval.end) else {
        return None;
    };
    let overlap_start = start.max(window.start);
    let overlap_end = end.min(window.end);
    (overlap_start < overlap_end)
        .then(|| interval.moved_to(Some(overlap_start), Some(overlap_end), window.date))
}
