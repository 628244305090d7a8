mod bin;
mod bootstrap;
mod builder;
mod codec;
mod config;
mod dump;
mod error;
pub mod fs;
mod package;

pub use bin::*;
pub use bootstrap::*;
pub use builder::*;
pub use codec::*;
pub use config::*;
pub use dump::*;
pub use error::*;
pub use package::*;

pub use phar_core;
