pub mod build;
pub mod credentials;
pub mod init;
pub mod poll;
pub mod tags;

pub use build::*;
pub use credentials::*;
pub use init::*;
pub use poll::*;
pub use tags::*;
