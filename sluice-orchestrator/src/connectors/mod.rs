//! Built-in connectors

pub mod file;
pub mod http;

pub use file::FileDestination;
pub use http::{HttpDestination, HttpSource};
