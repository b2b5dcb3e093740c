// ABOUTME: Declarative table transform specifications and their SQL rendering
// ABOUTME: Each transform becomes one INSERT ... SELECT across the two databases

use crate::config::Endpoint;

/// Alias of the source table inside every rendered SELECT
pub const SOURCE_ALIAS: &str = "s";

/// How a target column value is produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Copy a source column unchanged
    Column(&'static str),
    /// Source column, or `default` when it is NULL
    CoalesceText {
        column: &'static str,
        default: &'static str,
    },
    /// Source column, or `default` when it is NULL or blank
    DefaultIfBlank {
        column: &'static str,
        default: &'static str,
    },
    /// Source column, or `default` when it is NULL
    CoalesceInt { column: &'static str, default: i64 },
    /// Constant string
    Text(&'static str),
    /// Constant integer
    Int(i64),
    /// Text column coerced to an unsigned integer
    CastUnsigned(&'static str),
    /// Free-text ban duration in minutes converted to seconds (0 = permanent)
    BanLengthSeconds(&'static str),
    /// Current unix timestamp on the target server
    UnixNow,
}

impl Expr {
    /// Render this expression, qualifying source columns with `alias`
    pub fn to_sql(&self, alias: &str) -> String {
        match self {
            Expr::Column(column) => format!("{}.`{}`", alias, column),
            Expr::CoalesceText { column, default } => {
                format!("COALESCE({}.`{}`, {})", alias, column, quote_literal(default))
            }
            Expr::DefaultIfBlank { column, default } => format!(
                "COALESCE(NULLIF(TRIM({}.`{}`), ''), {})",
                alias,
                column,
                quote_literal(default)
            ),
            Expr::CoalesceInt { column, default } => {
                format!("COALESCE({}.`{}`, {})", alias, column, default)
            }
            Expr::Text(value) => quote_literal(value),
            Expr::Int(value) => value.to_string(),
            Expr::CastUnsigned(column) => format!("CAST({}.`{}` AS UNSIGNED)", alias, column),
            Expr::BanLengthSeconds(column) => ban_length_case(&format!("{}.`{}`", alias, column)),
            Expr::UnixNow => "UNIX_TIMESTAMP()".to_string(),
        }
    }
}

/// Same rule as [`crate::migration::ban_length::ban_length_seconds`], in SQL
///
/// Digits are tested with `NOT REGEXP '[^0-9]'` because ICU's `$` also
/// matches before a trailing newline.
fn ban_length_case(column: &str) -> String {
    let trimmed = format!("TRIM({})", column);
    format!(
        "CASE \
         WHEN {col} IS NULL OR {t} = '' OR {t} = '0' OR LOWER({t}) = 'permanent' THEN 0 \
         WHEN {t} NOT REGEXP '[^0-9]' THEN CAST({t} AS UNSIGNED) * 60 \
         ELSE 0 END",
        col = column,
        t = trimmed
    )
}

/// Whether the target table is cleared beforehand or holds a singleton row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Target was truncated; every selected source row is inserted
    Replace,
    /// Insert only when the target table is still empty
    InsertIfAbsent,
}

/// One source-table to target-table copy with its column mapping
#[derive(Debug, Clone)]
pub struct TableTransform {
    /// Short name used in logs and reports
    pub label: &'static str,
    /// Source table base name (without prefix); `None` for constant rows
    pub source: Option<&'static str>,
    /// Target table base name (without prefix)
    pub target: &'static str,
    /// `(target column, value)` in insertion order
    pub columns: Vec<(&'static str, Expr)>,
    /// Optional predicate over source columns (use the `s.` alias)
    pub filter: Option<&'static str>,
    pub mode: LoadMode,
}

impl TableTransform {
    /// Render the INSERT ... SELECT statement for this transform
    ///
    /// The statement is executed on the target server and reads the source
    /// table by database-qualified name, so both databases must be reachable
    /// from the same server.
    pub fn insert_sql(&self, source: &Endpoint, target: &Endpoint) -> String {
        let target_table = target.qualified(self.target);
        let column_list = self
            .columns
            .iter()
            .map(|(name, _)| format!("`{}`", name))
            .collect::<Vec<_>>()
            .join(", ");
        let select_list = self
            .columns
            .iter()
            .map(|(_, expr)| expr.to_sql(SOURCE_ALIAS))
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!(
            "INSERT INTO {} ({}) SELECT {}",
            target_table, column_list, select_list
        );

        match self.source {
            Some(base) => {
                sql.push_str(&format!(" FROM {} AS {}", source.qualified(base), SOURCE_ALIAS));
            }
            None => sql.push_str(" FROM DUAL"),
        }

        let mut conditions: Vec<String> = Vec::new();
        if let Some(filter) = self.filter {
            conditions.push(format!("({})", filter));
        }
        if self.mode == LoadMode::InsertIfAbsent {
            conditions.push(format!("NOT EXISTS (SELECT 1 FROM {})", target_table));
        }
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        sql
    }
}

/// Quote a MySQL string literal
///
/// # Examples
///
/// ```
/// # use amxbans_migrator::migration::transform::quote_literal;
/// assert_eq!(quote_literal("Unknown"), "'Unknown'");
/// assert_eq!(quote_literal("it's"), "'it''s'");
/// ```
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints() -> (Endpoint, Endpoint) {
        let source = Endpoint {
            host: "localhost".into(),
            user: "root".into(),
            database: "amx5".into(),
            ..Endpoint::default()
        };
        let target = Endpoint {
            database: "amx6".into(),
            prefix: "new".into(),
            ..source.clone()
        };
        (source, target)
    }

    #[test]
    fn test_expr_rendering() {
        assert_eq!(Expr::Column("username").to_sql("s"), "s.`username`");
        assert_eq!(
            Expr::CoalesceText {
                column: "nickname",
                default: ""
            }
            .to_sql("s"),
            "COALESCE(s.`nickname`, '')"
        );
        assert_eq!(
            Expr::DefaultIfBlank {
                column: "ban_type",
                default: "S"
            }
            .to_sql("s"),
            "COALESCE(NULLIF(TRIM(s.`ban_type`), ''), 'S')"
        );
        assert_eq!(Expr::CastUnsigned("level").to_sql("s"), "CAST(s.`level` AS UNSIGNED)");
        assert_eq!(Expr::Text("no").to_sql("s"), "'no'");
        assert_eq!(Expr::Int(-1).to_sql("s"), "-1");
        assert_eq!(Expr::UnixNow.to_sql("s"), "UNIX_TIMESTAMP()");
    }

    #[test]
    fn test_ban_length_case_covers_every_branch() {
        let sql = Expr::BanLengthSeconds("ban_length").to_sql("s");
        assert!(sql.starts_with("CASE WHEN s.`ban_length` IS NULL"));
        assert!(sql.contains("LOWER(TRIM(s.`ban_length`)) = 'permanent' THEN 0"));
        assert!(sql.contains(
            "NOT REGEXP '[^0-9]' THEN CAST(TRIM(s.`ban_length`) AS UNSIGNED) * 60"
        ));
        assert!(sql.ends_with("ELSE 0 END"));
    }

    #[test]
    fn test_insert_sql_with_filter() {
        let (source, target) = endpoints();
        let transform = TableTransform {
            label: "edits",
            source: Some("banhistory"),
            target: "bans_edit",
            columns: vec![("id", Expr::Column("bhid")), ("edit_reason", Expr::Text("x"))],
            filter: Some("s.`bhid` > 0"),
            mode: LoadMode::Replace,
        };

        assert_eq!(
            transform.insert_sql(&source, &target),
            "INSERT INTO `amx6`.`new_bans_edit` (`id`, `edit_reason`) \
             SELECT s.`bhid`, 'x' FROM `amx5`.`amx_banhistory` AS s WHERE (s.`bhid` > 0)"
        );
    }

    #[test]
    fn test_insert_if_absent_guards_on_target() {
        let (source, target) = endpoints();
        let transform = TableTransform {
            label: "config",
            source: None,
            target: "webconfig",
            columns: vec![("cookie", Expr::Text("amxbans")), ("bans_per_page", Expr::Int(50))],
            filter: None,
            mode: LoadMode::InsertIfAbsent,
        };

        assert_eq!(
            transform.insert_sql(&source, &target),
            "INSERT INTO `amx6`.`new_webconfig` (`cookie`, `bans_per_page`) \
             SELECT 'amxbans', 50 FROM DUAL \
             WHERE NOT EXISTS (SELECT 1 FROM `amx6`.`new_webconfig`)"
        );
    }

    #[test]
    fn test_quote_literal_escapes() {
        assert_eq!(quote_literal(""), "''");
        assert_eq!(quote_literal(r"a\b"), r"'a\\b'");
        assert_eq!(quote_literal("O'Brien"), "'O''Brien'");
    }
}
