//! Topology encoding: splits as arbitrary-precision bitmasks.

pub mod splits;

pub use splits::{encode_splits, SplitOptions, SplitTable};
