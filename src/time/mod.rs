//! Duration parsing and formatting.
//!
//! - [`parse_duration`] turns chat input such as `1d 2h` into seconds
//! - [`format_duration`] turns seconds back into a compact `1d 2h` string

mod duration;
mod human;

pub use crate::time::duration::parse_duration;
pub use crate::time::human::{format_duration, format_remaining};
