// ABOUTME: Command implementations for the migration CLI
// ABOUTME: Exports check, migrate, and plan commands

pub mod check;
pub mod migrate;
pub mod plan;

pub use check::check;
pub use migrate::migrate;
pub use plan::plan;
