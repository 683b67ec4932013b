pub mod profile;
pub mod error;
pub mod cache;

pub use profile::*;
pub use error::*;
pub use cache::*;
