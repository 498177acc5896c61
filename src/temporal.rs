// ⏰ Timestamp Resolver - best-effort absolute time for every entry
//
// Entries arrive with one of three time shapes:
// 1. An explicit creation instant (set by the store)
// 2. A calendar date plus a wall-clock time string ("09:30 AM")
// 3. A calendar date only
//
// The first shape that resolves wins. Nothing here ever fails: an entry whose
// date cannot be read gets the SENTINEL instant, which sorts as the oldest.

use crate::entities::{ForeignTransferEntry, LedgerEntry, SpecialBalanceEntry};
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Instant assigned to entries whose date cannot be parsed.
pub const SENTINEL: DateTime<Utc> = DateTime::<Utc>::MIN_UTC;

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

// ============================================================================
// INPUT SHAPES
// ============================================================================

/// Raw time fields of an entry, borrowed as the store supplied them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimestampInput<'a> {
    pub created_at: Option<&'a str>,
    pub date: Option<&'a str>,
    pub time: Option<&'a str>,
}

/// Anything that can hand its raw time fields to the resolver.
pub trait Timestamped {
    fn timestamp_input(&self) -> TimestampInput<'_>;
}

impl Timestamped for ForeignTransferEntry {
    fn timestamp_input(&self) -> TimestampInput<'_> {
        TimestampInput {
            created_at: self.created_at.as_deref(),
            date: Some(&self.date),
            time: Some(&self.time),
        }
    }
}

impl Timestamped for SpecialBalanceEntry {
    fn timestamp_input(&self) -> TimestampInput<'_> {
        TimestampInput {
            created_at: self.created_at.as_deref(),
            date: Some(&self.date),
            time: None,
        }
    }
}

impl Timestamped for LedgerEntry {
    fn timestamp_input(&self) -> TimestampInput<'_> {
        TimestampInput {
            created_at: self.created_at.as_deref(),
            date: Some(&self.date),
            time: None,
        }
    }
}

// ============================================================================
// RESOLVED TIMESTAMP
// ============================================================================

/// Which rule produced a resolved timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampSource {
    Created,
    DateTime,
    DateOnly,
    Sentinel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTimestamp {
    pub at: DateTime<Utc>,
    pub source: TimestampSource,
}

impl ResolvedTimestamp {
    pub fn is_sentinel(&self) -> bool {
        self.source == TimestampSource::Sentinel
    }
}

// ============================================================================
// RESOLVER
// ============================================================================

/// Resolves entries to UTC instants, reading dates as midnight in `tz`.
#[derive(Debug, Clone)]
pub struct TimestampResolver<Tz: TimeZone> {
    tz: Tz,
}

impl TimestampResolver<Local> {
    /// Resolver for the machine's local time zone.
    pub fn local() -> Self {
        TimestampResolver { tz: Local }
    }
}

impl Default for TimestampResolver<Local> {
    fn default() -> Self {
        Self::local()
    }
}

impl<Tz: TimeZone> TimestampResolver<Tz> {
    pub fn new(tz: Tz) -> Self {
        TimestampResolver { tz }
    }

    pub fn resolve<T: Timestamped + ?Sized>(&self, entry: &T) -> ResolvedTimestamp {
        self.resolve_input(&entry.timestamp_input())
    }

    /// Priority: creation instant → date + time → date → sentinel.
    pub fn resolve_input(&self, input: &TimestampInput<'_>) -> ResolvedTimestamp {
        if let Some(at) = input.created_at.and_then(parse_created_at) {
            return ResolvedTimestamp {
                at,
                source: TimestampSource::Created,
            };
        }

        let Some(date) = input.date.and_then(parse_date) else {
            return ResolvedTimestamp {
                at: SENTINEL,
                source: TimestampSource::Sentinel,
            };
        };

        let midnight = date.and_time(chrono::NaiveTime::MIN);

        if let Some(wall_clock) = input
            .time
            .and_then(parse_time_of_day)
            .and_then(|(hours, minutes)| {
                midnight.checked_add_signed(
                    Duration::hours(i64::from(hours)) + Duration::minutes(i64::from(minutes)),
                )
            })
        {
            return ResolvedTimestamp {
                at: self.from_local(wall_clock),
                source: TimestampSource::DateTime,
            };
        }

        ResolvedTimestamp {
            at: self.from_local(midnight),
            source: TimestampSource::DateOnly,
        }
    }

    fn from_local(&self, naive: NaiveDateTime) -> DateTime<Utc> {
        match self.tz.from_local_datetime(&naive).earliest() {
            Some(local) => local.with_timezone(&Utc),
            // Wall-clock time skipped by a DST transition
            None => Utc.from_utc_datetime(&naive),
        }
    }
}

// ============================================================================
// PARSERS
// ============================================================================

/// RFC 3339, or SQLite's `YYYY-MM-DD HH:MM:SS` (UTC).
pub fn parse_created_at(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// `YYYY-MM-DD`, `MM/DD/YYYY`, or an ISO date-time (date part only).
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }

    value
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

/// Hours and minutes of a wall-clock string, AM/PM marker stripped.
///
/// The marker is dropped, not applied: "02:15 PM" reads as (2, 15).
pub fn parse_time_of_day(value: &str) -> Option<(u32, u32)> {
    let stripped = strip_meridiem(value);
    let mut parts = stripped.split(':');

    let hours = parts.next()?.trim().parse::<u32>().ok()?;
    let minutes = parts.next()?.trim().parse::<u32>().ok()?;

    Some((hours, minutes))
}

fn strip_meridiem(value: &str) -> &str {
    let trimmed = value.trim();
    let tail_start = match trimmed.len().checked_sub(2) {
        Some(start) => start,
        None => return trimmed,
    };

    match trimmed.get(tail_start..) {
        Some(tail) if tail.eq_ignore_ascii_case("am") || tail.eq_ignore_ascii_case("pm") => {
            trimmed[..tail_start].trim_end()
        }
        _ => trimmed,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, LocalResult, Timelike};
    use rust_decimal_macros::dec;

    /// UTC+05:00 zone whose clocks jump from 02:00 to 03:00 every night.
    #[derive(Debug, Clone, Copy)]
    struct SpringForward;

    fn plus_five() -> FixedOffset {
        FixedOffset::east_opt(5 * 3600).unwrap()
    }

    impl TimeZone for SpringForward {
        type Offset = FixedOffset;

        fn from_offset(_offset: &FixedOffset) -> Self {
            SpringForward
        }

        fn offset_from_local_date(&self, _local: &NaiveDate) -> LocalResult<FixedOffset> {
            LocalResult::Single(plus_five())
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
            if local.hour() == 2 {
                LocalResult::None
            } else {
                LocalResult::Single(plus_five())
            }
        }

        fn offset_from_utc_date(&self, _utc: &NaiveDate) -> FixedOffset {
            plus_five()
        }

        fn offset_from_utc_datetime(&self, _utc: &NaiveDateTime) -> FixedOffset {
            plus_five()
        }
    }

    fn utc_resolver() -> TimestampResolver<Utc> {
        TimestampResolver::new(Utc)
    }

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_created_at_wins() {
        let resolved = utc_resolver().resolve_input(&TimestampInput {
            created_at: Some("2024-12-20T10:15:00Z"),
            date: Some("2024-01-01"),
            time: Some("09:30 AM"),
        });

        assert_eq!(resolved.source, TimestampSource::Created);
        assert_eq!(resolved.at, at("2024-12-20T10:15:00Z"));
    }

    #[test]
    fn test_sqlite_created_at_format() {
        assert_eq!(
            parse_created_at("2024-12-20 10:15:00"),
            Some(at("2024-12-20T10:15:00Z"))
        );
        assert_eq!(parse_created_at("yesterday"), None);
        assert_eq!(parse_created_at("  "), None);
    }

    #[test]
    fn test_invalid_created_at_falls_through_to_date_and_time() {
        let resolved = utc_resolver().resolve_input(&TimestampInput {
            created_at: Some("not a timestamp"),
            date: Some("2024-12-20"),
            time: Some("09:30 AM"),
        });

        assert_eq!(resolved.source, TimestampSource::DateTime);
        assert_eq!(resolved.at, at("2024-12-20T09:30:00Z"));
    }

    #[test]
    fn test_meridiem_is_stripped_not_applied() {
        assert_eq!(parse_time_of_day("02:15 PM"), Some((2, 15)));
        assert_eq!(parse_time_of_day("11:45am"), Some((11, 45)));
        assert_eq!(parse_time_of_day("16:00"), Some((16, 0)));
        assert_eq!(parse_time_of_day("9:05:30"), Some((9, 5)));
        assert_eq!(parse_time_of_day("noon"), None);
        assert_eq!(parse_time_of_day("10"), None);
        assert_eq!(parse_time_of_day("PM"), None);
    }

    #[test]
    fn test_bad_time_falls_back_to_midnight() {
        let resolved = utc_resolver().resolve_input(&TimestampInput {
            created_at: None,
            date: Some("2024-12-20"),
            time: Some("half past nine"),
        });

        assert_eq!(resolved.source, TimestampSource::DateOnly);
        assert_eq!(resolved.at, at("2024-12-20T00:00:00Z"));
    }

    #[test]
    fn test_hours_past_midnight_roll_forward() {
        let resolved = utc_resolver().resolve_input(&TimestampInput {
            created_at: None,
            date: Some("2024-12-20"),
            time: Some("25:30"),
        });

        assert_eq!(resolved.at, at("2024-12-21T01:30:00Z"));
    }

    #[test]
    fn test_date_is_local_midnight() {
        // UTC+05:00: local midnight is 19:00 UTC of the previous day
        let resolver = TimestampResolver::new(FixedOffset::east_opt(5 * 3600).unwrap());
        let resolved = resolver.resolve_input(&TimestampInput {
            created_at: None,
            date: Some("2024-12-20"),
            time: None,
        });

        assert_eq!(resolved.source, TimestampSource::DateOnly);
        assert_eq!(resolved.at, at("2024-12-19T19:00:00Z"));
    }

    #[test]
    fn test_skipped_wall_clock_time_reads_as_utc() {
        let resolver = TimestampResolver::new(SpringForward);

        let skipped = resolver.resolve_input(&TimestampInput {
            created_at: None,
            date: Some("2024-03-31"),
            time: Some("02:30"),
        });
        assert_eq!(skipped.source, TimestampSource::DateTime);
        assert_eq!(skipped.at, at("2024-03-31T02:30:00Z"));

        // Outside the gap the zone offset still applies
        let regular = resolver.resolve_input(&TimestampInput {
            created_at: None,
            date: Some("2024-03-31"),
            time: Some("03:30"),
        });
        assert_eq!(regular.at, at("2024-03-30T22:30:00Z"));
    }

    #[test]
    fn test_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 12, 20);
        assert_eq!(parse_date("2024-12-20"), expected);
        assert_eq!(parse_date("12/20/2024"), expected);
        assert_eq!(parse_date("2024-12-20T00:00:00.000Z"), expected);
        assert_eq!(parse_date("20th December"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_unparseable_date_gets_sentinel() {
        let resolved = utc_resolver().resolve_input(&TimestampInput {
            created_at: None,
            date: Some("garbage"),
            time: Some("09:30"),
        });

        assert!(resolved.is_sentinel());
        assert_eq!(resolved.at, SENTINEL);
        assert!(resolved.at < at("1970-01-01T00:00:00Z"));
    }

    #[test]
    fn test_entry_shapes() {
        let resolver = utc_resolver();

        let transfer = ForeignTransferEntry::new(
            "2024-12-19",
            "02:15 PM",
            "SAU-002",
            dec!(750000),
            dec!(75.25),
            dec!(9500),
        );
        assert_eq!(resolver.resolve(&transfer).at, at("2024-12-19T02:15:00Z"));

        let mut ledger = LedgerEntry::new(
            "2024-12-19",
            crate::entities::ReferenceType::Cash,
            dec!(300000),
            dec!(150000),
        );
        assert_eq!(resolver.resolve(&ledger).source, TimestampSource::DateOnly);

        ledger.created_at = Some("2024-12-19T08:00:00+05:00".to_string());
        let resolved = resolver.resolve(&ledger);
        assert_eq!(resolved.source, TimestampSource::Created);
        assert_eq!(resolved.at, at("2024-12-19T03:00:00Z"));

        println!("✅ All three entry shapes resolved");
    }
}
