//! Domain types for KRS

mod config;
mod event;
mod group;

pub use config::*;
pub use event::*;
pub use group::*;
