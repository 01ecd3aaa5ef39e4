/// newtab-server library: metric sources, layout, assembly, history and the
/// HTTP surface shared by the binary.

pub mod app;
pub mod cli;
pub mod core;
pub mod server;
pub mod utils;
