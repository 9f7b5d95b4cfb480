//! Concrete adapter implementations for ports.

pub mod alpha_vantage_adapter;
pub mod cached_loader;
pub mod csv_adapter;
pub mod file_config_adapter;
pub mod source;
pub mod yahoo_adapter;
