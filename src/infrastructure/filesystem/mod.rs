pub mod build_records;
pub mod job_config_store;
pub mod job_directory;

pub use build_records::BuildRecords;
pub use job_config_store::{JobConfigStore, JobConfigStoreError};
pub use job_directory::JobDirectory;
