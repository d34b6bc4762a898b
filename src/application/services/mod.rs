pub mod externals_tracker;
pub mod revision_resolver;
pub mod tag_listing;

pub use externals_tracker::ExternalsTracker;
pub use revision_resolver::RevisionResolver;
pub use tag_listing::{TagListing, TagOrder};
