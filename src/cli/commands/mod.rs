//! CLI command implementations

pub mod completions;
pub mod config;
pub mod entities;
pub mod files;
pub mod init;
pub mod open;
pub mod parse;
pub mod paths;
pub mod props;
