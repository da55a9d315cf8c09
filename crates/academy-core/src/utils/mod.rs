//! Utility functions for string formatting and manipulation.

pub mod format;

pub use format::{
    format_date, format_datetime, format_minutes, format_optional, single_line, truncate_string,
};
