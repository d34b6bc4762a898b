/// Infrastructure layer modules
///
/// Concrete implementations of external interactions:
/// - Subversion client (svn command line)
/// - Per-job credential store, key store and secret sealing
/// - Job directory layout, job.yml and build records
pub mod credentials;
pub mod filesystem;
pub mod svn;
