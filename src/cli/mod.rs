//! CLI command handling

pub mod run;
pub mod state;

pub use run::*;
pub use state::*;
