//! IPC module for toggling the variometer and reading its status

mod protocol;
mod server;

pub use server::Server;
