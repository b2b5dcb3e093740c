// ABOUTME: Migration building blocks module
// ABOUTME: Table catalogue, transform rendering, inventories, duration rule and backups

pub mod backup;
pub mod ban_length;
pub mod catalog;
pub mod inventory;
pub mod transform;

pub use backup::{take_backup, BackupArtifact, BackupLabel};
pub use ban_length::{ban_length_seconds, DurationAudit};
pub use catalog::{transforms, INVENTORY_TABLES, TRUNCATE_TABLES};
pub use inventory::{compare, count_rows, Inventory, TableComparison};
pub use transform::{Expr, LoadMode, TableTransform};
