pub mod authentication;
pub mod dir_entry;
pub mod external;
pub mod job_config;
