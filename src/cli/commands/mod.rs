//! CLI command implementations

pub mod cache;
pub mod config;
pub mod describe;
pub mod detector;
pub mod types;

pub use cache::execute as cache;
pub use config::execute as config;
pub use describe::execute as describe;
pub use detector::{prepare, train};
pub use types::execute as types;
