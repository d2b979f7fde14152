pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::commands::{
    AppState, DayViewResponse, SlotResponse, adjust_block_time_impl, create_block_impl,
    create_unscheduled_impl, delete_block_impl, duplicate_day_impl, list_day_impl,
    reorder_blocks_impl,
};
pub use domain::clip::clip;
pub use domain::day_shift::{shift_by_days, try_shift_by_days};
pub use domain::interval::{DayWindow, Interval, start_of_day};
pub use domain::reflow::{move_item, reflow};
pub use domain::timeline::{Slot, SlotKind, overlap_groups, partition};
pub use infrastructure::error::InfraError;
