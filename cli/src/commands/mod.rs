//! One submodule per command group, each owning its `clap::Subcommand` enum
//! and `handle_*_command` dispatcher.

pub mod ask;
pub mod cache;
pub mod config;

pub use ask::*;
pub use cache::*;
pub use config::*;
