//! Logging setup shared by ccx binaries.
mod logger;
pub use logger::*;
