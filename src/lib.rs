// ABOUTME: Library module for amxbans-migrator
// ABOUTME: Exports all core functionality for use in binary and tests

pub mod commands;
pub mod config;
pub mod error;
pub mod migration;
pub mod mysql;
pub mod runner;
pub mod utils;
