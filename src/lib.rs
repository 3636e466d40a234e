pub mod core;
pub mod edgar;
pub mod utils;

// Re-exports
pub use core::config::SegmenterConfig;
pub use edgar::parsing::{ParseOutcome, Segmenter};
pub use utils::progress::ProgressTracker;
