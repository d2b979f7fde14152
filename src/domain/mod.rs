pub mod clip;
pub mod day_shift;
pub mod interval;
pub mod reflow;
pub mod timeline;
