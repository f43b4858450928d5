// ABOUTME: Library root for stagehand - deployment lifecycle coordination.
// ABOUTME: The CLI binary is in main.rs.

pub mod api;
pub mod backend;
pub mod config;
pub mod deploy;
pub mod error;
pub mod types;
