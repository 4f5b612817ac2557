//! IPC module for daemon-overlay communication

pub mod client;
mod protocol;
mod server;

pub use server::Server;
