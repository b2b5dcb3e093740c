// ABOUTME: Row-count inventories taken before and after the migration
// ABOUTME: Prints side-by-side source/target figures and audits ban durations

use super::ban_length::DurationAudit;
use crate::config::Endpoint;
use crate::error::ClientError;
use crate::mysql::{parse_count, parse_value_counts, DatabaseClient};
use serde::Serialize;

/// Row count of one prefixed table
pub async fn count_rows<C: DatabaseClient + ?Sized>(
    client: &C,
    endpoint: &Endpoint,
    base: &str,
) -> Result<u64, ClientError> {
    let sql = format!("SELECT COUNT(*) FROM {}", endpoint.qualified(base));
    let output = client.query(endpoint, &sql).await?;
    parse_count(&output)
}

/// Row counts of a fixed set of tables on one endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Inventory {
    pub counts: Vec<(String, u64)>,
}

impl Inventory {
    /// Count every table in `tables`, stopping at the first failure
    pub async fn collect<C: DatabaseClient + ?Sized>(
        client: &C,
        endpoint: &Endpoint,
        tables: &[&str],
    ) -> Result<Self, ClientError> {
        let mut counts = Vec::with_capacity(tables.len());
        for base in tables {
            let count = count_rows(client, endpoint, base).await?;
            tracing::info!("  {:<20} {:>8} row(s)", endpoint.table(base), count);
            counts.push((base.to_string(), count));
        }
        Ok(Self { counts })
    }

    pub fn get(&self, base: &str) -> Option<u64> {
        self.counts
            .iter()
            .find(|(name, _)| name == base)
            .map(|(_, count)| *count)
    }
}

/// Before/after figures for one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableComparison {
    pub table: String,
    pub before: Option<u64>,
    pub after: Option<u64>,
}

impl TableComparison {
    pub fn matches(&self) -> bool {
        self.before == self.after
    }
}

/// Pair source counts with target counts by table name
pub fn compare(before: &Inventory, after: &Inventory) -> Vec<TableComparison> {
    before
        .counts
        .iter()
        .map(|(table, count)| TableComparison {
            table: table.clone(),
            before: Some(*count),
            after: after.get(table),
        })
        .chain(
            after
                .counts
                .iter()
                .filter(|(table, _)| before.get(table).is_none())
                .map(|(table, count)| TableComparison {
                    table: table.clone(),
                    before: None,
                    after: Some(*count),
                }),
        )
        .collect()
}

/// Print the side-by-side comparison table
pub fn print_comparison(rows: &[TableComparison]) {
    let cell = |value: Option<u64>| value.map_or_else(|| "-".to_string(), |v| v.to_string());

    println!();
    println!("{:<20} {:>12} {:>12}", "Table", "Source", "Target");
    println!("{}", "─".repeat(46));
    for row in rows {
        let marker = if row.matches() { "✓" } else { "⚠" };
        println!(
            "{:<20} {:>12} {:>12}  {}",
            row.table,
            cell(row.before),
            cell(row.after),
            marker
        );
    }
    println!("{}", "─".repeat(46));
    println!();
}

/// Group the source ban durations and classify them
pub async fn audit_ban_lengths<C: DatabaseClient + ?Sized>(
    client: &C,
    source: &Endpoint,
    bans_table: &str,
) -> Result<DurationAudit, ClientError> {
    let sql = format!(
        "SELECT `ban_length` IS NULL, `ban_length`, COUNT(*) FROM {} GROUP BY `ban_length`",
        source.qualified(bans_table)
    );
    let output = client.query(source, &sql).await?;
    let rows = parse_value_counts(&output)?;
    Ok(DurationAudit::from_value_counts(&rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inventory(rows: &[(&str, u64)]) -> Inventory {
        Inventory {
            counts: rows.iter().map(|(t, c)| (t.to_string(), *c)).collect(),
        }
    }

    #[test]
    fn test_compare_pairs_by_table() {
        let before = inventory(&[("amxadmins", 3), ("bans", 120)]);
        let after = inventory(&[("bans", 119), ("amxadmins", 3)]);

        let rows = compare(&before, &after);
        assert_eq!(rows.len(), 2);
        assert!(rows[0].matches());
        assert_eq!(rows[1].table, "bans");
        assert!(!rows[1].matches());
    }

    #[test]
    fn test_compare_reports_one_sided_tables() {
        let before = inventory(&[("reasons", 4)]);
        let after = inventory(&[("webadmins", 2)]);

        let rows = compare(&before, &after);
        assert_eq!(
            rows,
            vec![
                TableComparison {
                    table: "reasons".into(),
                    before: Some(4),
                    after: None
                },
                TableComparison {
                    table: "webadmins".into(),
                    before: None,
                    after: Some(2)
                },
            ]
        );
    }

    #[test]
    fn test_inventory_get() {
        let inv = inventory(&[("bans", 7)]);
        assert_eq!(inv.get("bans"), Some(7));
        assert_eq!(inv.get("reasons"), None);
    }
}
