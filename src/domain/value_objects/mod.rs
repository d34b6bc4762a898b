pub mod depth;
pub mod module_location;
pub mod revision;
pub mod revision_policy;
pub mod svn_info;
