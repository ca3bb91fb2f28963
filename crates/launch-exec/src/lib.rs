//! # Launch Exec
//!
//! Turns a launch descriptor into a concrete command and, when asked, runs
//! it once in the foreground.
//!
//! - [`LaunchPlan`] resolves the script against a base directory and splits
//!   the argument line into tokens.
//! - [`run_once`] spawns the command, optionally waits for the server target
//!   to accept TCP connections, forwards shutdown signals and reports the
//!   exit status.

pub mod plan;
pub mod probe;
pub mod run;

pub use plan::LaunchPlan;
pub use probe::{wait_for_target, wait_for_tcp};
pub use run::{run_once, RunOptions};
