#![warn(clippy::use_self)]

pub mod config;
pub mod copy;
pub mod glob;
pub mod project;
pub mod shell;

mod util;

pub use self::{shell::shell, util::is_error_silent};

#[cfg(feature = "cli")]
mod cli;

#[cfg(feature = "cli")]
pub use cli::run;
