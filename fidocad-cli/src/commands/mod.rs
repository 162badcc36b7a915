//! Command implementations for the fidocad CLI

pub mod config;
pub mod export;
pub mod formats;
