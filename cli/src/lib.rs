pub mod commands;
pub mod context;
pub mod logging;
pub mod repl;
pub mod transport;

pub use context::CliContext;
pub use repl::readline;
pub use transport::ConsoleTransport;
