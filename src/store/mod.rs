pub mod dataset;
pub mod merge;
pub mod types;

pub use dataset::DatasetStore;
pub use merge::{merge, split_by_year};
pub use types::{Record, RecordSet};
