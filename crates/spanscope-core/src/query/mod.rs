//! Query construction
//!
//! [`FilterValue`] validates caller input, [`QueryBuilder`] turns an intent
//! and a time window into query text.

mod builder;
mod filter;

pub use builder::{QueryBuilder, QueryText};
pub use filter::{FilterValue, SafeFragment, DEFAULT_MAX_FILTER_LEN};
