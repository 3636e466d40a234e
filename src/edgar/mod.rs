pub mod batch;
pub mod filing;
pub mod items;
pub mod parsing;
pub mod report;

pub use batch::{run_batch, BatchOptions, BatchSummary};
pub use items::CanonicalItemSequence;
pub use report::ReportType;
