//! Tables that hold the stack's state between polls.

mod timed_table;
pub use self::timed_table::*;
