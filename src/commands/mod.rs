//! Command implementations for the faceit-ow CLI

pub mod common;
pub mod export;
pub mod ingest;
pub mod process;
