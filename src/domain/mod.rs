//! Core domain types and logic.

pub mod cache_record;
pub mod crossover;
pub mod error;
pub mod features;
pub mod indicator;
pub mod ohlcv;
pub mod ranking;
pub mod scoring;
pub mod settings;
pub mod universe;
