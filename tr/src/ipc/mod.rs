//! Control-surface IPC
//!
//! JSON-over-newline request/response on a Unix socket.

pub mod client;
pub mod listener;
pub mod messages;

pub use client::DaemonClient;
pub use listener::{cleanup_socket, create_listener};
pub use messages::{Command, CommandResult, ErrorCode, Request, Response};
