pub mod cli;
pub mod command_handlers;
pub mod context;

pub use context::AppContext;
