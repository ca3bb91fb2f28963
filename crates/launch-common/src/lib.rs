//! # Launch Common
//!
//! Error and identifier types shared by the launch descriptor crates.

pub mod errors;
pub mod types;

// Re-export commonly used items
pub use errors::{Error, LaunchError, LaunchResult, Result, ResultExt};
pub use types::AppName;
