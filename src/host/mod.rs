//! Host-facing contract and transport for the native festival shell.

pub mod channel;
pub mod contract;
pub mod handler;
pub mod stdio;
