pub mod config;
pub mod error;
pub mod interval_repository;
pub mod reminder_scheduler;
pub mod storage;
