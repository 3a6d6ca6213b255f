//! Configuration for the usage telemetry recorder.
//!
//! Settings live in `.telemetry/config.yaml` under a project directory.
//! Values may reference environment variables as `${VAR}` or
//! `${VAR:-default}`, and a few variables override the file directly
//! (see [`env::vars`]).

pub mod env;
pub mod loader;
pub mod types;

pub use env::*;
pub use loader::*;
pub use types::*;
