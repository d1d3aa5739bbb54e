//! Personal activity ledger kept as a plain text file. Every line is either a `[yyyy-MM-dd]`
//! date header or an `HH:mm Title /path #tag .id` entry, and the file is only ever appended to.
//!

pub mod cli;
pub mod ledger;
pub mod settings;
pub mod storage;
pub mod utils;
