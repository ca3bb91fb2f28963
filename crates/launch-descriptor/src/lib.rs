//! # Launch Descriptor
//!
//! Typed model of the process launch descriptors a supervisor reads from an
//! ecosystem file: one record per managed process naming the process, the
//! executable to invoke, and its shell-style argument line.
//!
//! ```
//! use launch_descriptor::{ConfigFormat, EcosystemFile};
//!
//! let js = r#"module.exports = {
//!   apps: [{
//!     name: "betaione_backend",
//!     script: "env/bin/python",
//!     args: "-m uvicorn app.main:app --host 0.0.0.0 --port 8000"
//!   }]
//! };"#;
//!
//! let file = EcosystemFile::load_from_str(js, ConfigFormat::EcosystemJs).unwrap();
//! let target = file.single().unwrap().server_target().unwrap();
//! assert_eq!(target.app.to_string(), "app.main:app");
//! assert_eq!(target.port, 8000);
//! ```

pub mod args;
pub mod descriptor;
pub mod format;
pub mod validation;

pub use args::{AppTarget, ArgLine, ServerTarget, DEFAULT_HOST, DEFAULT_PORT};
pub use descriptor::{EcosystemFile, LaunchDescriptor};
pub use format::ConfigFormat;
