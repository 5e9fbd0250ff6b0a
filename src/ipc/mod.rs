//! Command transports.
//!
//! External tools (scripts, test harnesses, a UI shell) send
//! newline-delimited JSON commands either on stdin or over a Unix socket.

pub mod listener;
