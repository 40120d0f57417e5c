// ABOUTME: Library root for sshrun - remote command execution over SSH.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod output;
pub mod ssh;
