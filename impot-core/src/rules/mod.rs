//! Per-year rule tables and the cache that hands them out.

mod store;

pub use store::{RuleTableSource, RuleTableStore};
