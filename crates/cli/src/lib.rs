//! Test-suite manifest command line
//!
//! Library half of the `manifest` binary, so commands and the default
//! classifier can be tested without spawning the process.

pub mod cmd;
pub mod config;
pub mod sourcefile;
pub mod util;
