// ABOUTME: MySQL client utilities module
// ABOUTME: Exports the database client seam, its CLI implementation, and output parsers

pub mod client;
pub mod options_file;

pub use client::{parse_count, parse_value_counts, DatabaseClient, MysqlCli};
pub use options_file::ClientOptionsFile;
