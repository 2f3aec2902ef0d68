//! Command handlers and terminal rendering

pub mod rates;
pub mod setup;
pub mod ui;
