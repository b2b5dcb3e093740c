// ABOUTME: Ban duration conversion rule and pre-migration audit of source values
// ABOUTME: Free-text minutes become seconds; anything unreadable becomes permanent

/// Largest value the 6.x `bans.ban_length` column (signed INT) accepts
pub const MAX_BAN_LENGTH_SECONDS: u64 = i32::MAX as u64;

/// How a source `ban_length` value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BanLengthKind {
    /// NULL, empty, `0` or `permanent` (any case)
    Permanent,
    /// A plain digit string, in minutes
    Minutes(u64),
    /// Anything else; migrated as permanent
    Unparsed,
}

/// Classify a raw source duration
///
/// Only spaces are trimmed, as MySQL's `TRIM()` does; a tab or newline
/// around the digits leaves the value unreadable.
pub fn classify(raw: Option<&str>) -> BanLengthKind {
    let value = match raw.map(|value| value.trim_matches(' ')) {
        None | Some("") | Some("0") => return BanLengthKind::Permanent,
        Some(value) => value,
    };

    if value.eq_ignore_ascii_case("permanent") {
        return BanLengthKind::Permanent;
    }

    if value.bytes().all(|b| b.is_ascii_digit()) {
        return match value.parse::<u64>() {
            Ok(0) => BanLengthKind::Permanent,
            Ok(minutes) => BanLengthKind::Minutes(minutes),
            Err(_) => BanLengthKind::Minutes(u64::MAX),
        };
    }

    BanLengthKind::Unparsed
}

/// Migrated ban length in seconds; `0` means permanent
///
/// # Examples
///
/// ```
/// # use amxbans_migrator::migration::ban_length::ban_length_seconds;
/// assert_eq!(ban_length_seconds(Some("30")), 1800);
/// assert_eq!(ban_length_seconds(Some("Permanent")), 0);
/// assert_eq!(ban_length_seconds(Some("2 weeks")), 0);
/// assert_eq!(ban_length_seconds(None), 0);
/// ```
pub fn ban_length_seconds(raw: Option<&str>) -> u64 {
    match classify(raw) {
        BanLengthKind::Minutes(minutes) => minutes.saturating_mul(60),
        BanLengthKind::Permanent | BanLengthKind::Unparsed => 0,
    }
}

/// Whether a duration in minutes converts to seconds the target column can hold
///
/// Larger values make MySQL reject the bans load with an out-of-range error.
pub fn fits_target(minutes: u64) -> bool {
    minutes
        .checked_mul(60)
        .is_some_and(|seconds| seconds <= MAX_BAN_LENGTH_SECONDS)
}

/// Summary of the source `ban_length` column before migration
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct DurationAudit {
    pub permanent: u64,
    pub timed: u64,
    /// Bans whose value cannot be read and will become permanent
    pub unparsed: u64,
    /// Distinct unreadable values, in the order they were seen
    pub unparsed_values: Vec<String>,
    /// Bans whose duration in seconds overflows the target column
    pub out_of_range: u64,
    pub out_of_range_values: Vec<String>,
}

impl DurationAudit {
    /// Build from `(value, row count)` pairs of a `GROUP BY ban_length` query
    pub fn from_value_counts(rows: &[(Option<String>, u64)]) -> Self {
        let mut audit = DurationAudit::default();

        for (value, count) in rows {
            match classify(value.as_deref()) {
                BanLengthKind::Permanent => audit.permanent += count,
                BanLengthKind::Minutes(minutes) if !fits_target(minutes) => {
                    audit.out_of_range += count;
                    if let Some(value) = value {
                        audit.out_of_range_values.push(value.clone());
                    }
                }
                BanLengthKind::Minutes(_) => audit.timed += count,
                BanLengthKind::Unparsed => {
                    audit.unparsed += count;
                    if let Some(value) = value {
                        audit.unparsed_values.push(value.clone());
                    }
                }
            }
        }

        audit
    }

    pub fn total(&self) -> u64 {
        self.permanent + self.timed + self.unparsed + self.out_of_range
    }

    pub fn log(&self) {
        tracing::info!(
            "Ban durations: {} permanent, {} timed, {} unreadable",
            self.permanent,
            self.timed,
            self.unparsed
        );

        if self.unparsed > 0 {
            tracing::warn!(
                "⚠ {} ban(s) have an unreadable duration and will be migrated as permanent",
                self.unparsed
            );
            for value in self.unparsed_values.iter().take(10) {
                tracing::warn!("  - '{}'", crate::utils::sanitize_identifier(value));
            }
            if self.unparsed_values.len() > 10 {
                tracing::warn!("  ... and {} more", self.unparsed_values.len() - 10);
            }
        }

        if self.out_of_range > 0 {
            tracing::warn!(
                "⚠ {} ban(s) have a duration above {} seconds; the bans load will be rejected",
                self.out_of_range,
                MAX_BAN_LENGTH_SECONDS
            );
            for value in self.out_of_range_values.iter().take(10) {
                tracing::warn!("  - '{}'", value);
            }
        }
    }
}
