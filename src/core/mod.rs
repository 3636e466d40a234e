pub mod config;

pub use config::{FirstItemPolicy, SegmenterConfig, StrategyMode};
