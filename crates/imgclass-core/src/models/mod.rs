//! Data models: run configuration.

pub mod config;
