//! Utility modules.

pub mod datetime;
pub mod pointer;

pub use datetime::{
    is_date, is_datetime, is_time, parse_date, parse_datetime, parse_time, DateTimeParseError,
    IsoDate, IsoDateTime, IsoTime,
};
