//! Bounded date-range resolution for feed queries.
//!
//! Clients may supply `days`, `start`, `end`, and `results` in any
//! combination. Precedence is an ordered rule list rather than
//! sequential overwrites, so it stays auditable:
//!
//! 1. `wants_history` when any of `results`/`start`/`days` is present.
//! 2. Defaults: start = history epoch (history) or `now - lookback`,
//!    end = `now`.
//! 3. `days` overrides the default start.
//! 4. Explicit `start` overrides `days`.
//! 5. Explicit `end` overrides the default end.
//! 6. The span cap clamps the start only when history was NOT requested.
//!    A caller who asks for `days=365` gets 365 days; a caller relying
//!    on defaults never gets more than the cap.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::errors::ParseError;

/// Earliest start considered when the caller explicitly asks for history.
const HISTORY_EPOCH: (i32, u32, u32) = (2010, 1, 1);

/// Raw, possibly-conflicting temporal parameters as received.
#[derive(Debug, Clone, Default)]
pub struct DateRangeParams {
    pub days: Option<i64>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub results: Option<usize>,
}

impl DateRangeParams {
    /// True when the caller explicitly asked for historical data,
    /// exempting the request from the default span cap.
    pub fn wants_history(&self) -> bool {
        self.results.is_some() || self.start.is_some() || self.days.is_some()
    }
}

/// A resolved inclusive (start, end) window of absolute timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn span(&self) -> Duration {
        self.end - self.start
    }
}

/// Resolve against the current wall clock with the given defaults.
pub fn resolve(
    params: &DateRangeParams,
    default_lookback: Duration,
    max_span: Duration,
) -> Result<DateRange, ParseError> {
    resolve_at(params, Utc::now(), default_lookback, max_span)
}

/// Resolution with an injected "now", the testable entry point.
pub fn resolve_at(
    params: &DateRangeParams,
    now: DateTime<Utc>,
    default_lookback: Duration,
    max_span: Duration,
) -> Result<DateRange, ParseError> {
    let wants_history = params.wants_history();

    let mut start = if wants_history {
        history_epoch()
    } else {
        now - default_lookback
    };
    let mut end = now;

    if let Some(days) = params.days {
        // Client-supplied and unbounded; absurd values that would
        // overflow the subtraction degrade to the history epoch rather
        // than panicking.
        start = Duration::try_days(days)
            .and_then(|lookback| now.checked_sub_signed(lookback))
            .unwrap_or_else(history_epoch);
    }
    if let Some(raw) = &params.start {
        start = parse_datetime(raw)?;
    }
    if let Some(raw) = &params.end {
        end = parse_datetime(raw)?;
    }

    if end - start > max_span && !wants_history {
        start = end - max_span;
    }

    Ok(DateRange { start, end })
}

fn history_epoch() -> DateTime<Utc> {
    let (y, m, d) = HISTORY_EPOCH;
    match NaiveDate::from_ymd_opt(y, m, d) {
        Some(date) => Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)),
        None => DateTime::<Utc>::MIN_UTC,
    }
}

/// Lenient datetime parsing matching the formats clients actually send:
/// RFC 3339, space- or `T`-separated local datetimes, and bare dates.
/// Naive inputs are interpreted as UTC.
pub fn parse_datetime(input: &str) -> Result<DateTime<Utc>, ParseError> {
    let trimmed = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)));
    }

    Err(ParseError::new(trimmed))
}
