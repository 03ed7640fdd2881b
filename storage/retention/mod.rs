pub mod policy;

pub use policy::{RetentionPolicy, RetentionReport, StorageStats};
