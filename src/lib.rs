//! barely-db: a convention-based database over a shared folder tree
//!
//! Entities are folders named by typed identifiers (`WB0251_coated`),
//! components are `-D2` subfolders, and stored objects are files inside
//! them with a numbered revision history.

pub mod cli;
pub mod core;
pub mod yaml;
