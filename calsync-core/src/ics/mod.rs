//! ICS generation and parsing.
//!
//! This module handles reading and writing calendar data according to RFC 5545.

mod generate;
mod parse;
pub(crate) mod time;

pub use generate::{generate_calendar, generate_stored_event};
pub use parse::parse_occurrences;
