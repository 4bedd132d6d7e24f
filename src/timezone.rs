//! Timezone resolution from a numeric UTC offset.
//!
//! Clients identify their display zone with an integer minute offset
//! (e.g. `-300` for UTC-5). The offset is ambiguous — many zones share
//! it — so resolution is "first zone in `TZ_VARIANTS` order whose
//! *current* offset matches, else UTC". The match is recomputed against
//! a precomputed table rather than probing every zone per request; the
//! table is rebuilt when stale because DST transitions move offsets.
//!
//! Resolution never fails: unknown offsets degrade to UTC.

use chrono::{Offset, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// How long the offset table stays valid before a rebuild.
const TABLE_TTL: Duration = Duration::from_secs(15 * 60);

struct OffsetTable {
    built_at: Instant,
    by_offset: HashMap<i32, Tz>,
}

fn build_table() -> OffsetTable {
    let now = Utc::now();
    let mut by_offset = HashMap::new();
    for tz in chrono_tz::TZ_VARIANTS.iter() {
        let offset_minutes = now.with_timezone(tz).offset().fix().local_minus_utc() / 60;
        // First match in enumeration order wins, keeping resolution
        // deterministic across requests.
        by_offset.entry(offset_minutes).or_insert(*tz);
    }
    OffsetTable {
        built_at: Instant::now(),
        by_offset,
    }
}

static OFFSET_TABLE: Lazy<RwLock<OffsetTable>> = Lazy::new(|| RwLock::new(build_table()));

/// Map a UTC offset in minutes to a concrete zone.
///
/// Offset 0 short-circuits to UTC without touching the table; it is by
/// far the most common request. Any offset with no matching zone at the
/// current moment also resolves to UTC.
pub fn resolve(offset_minutes: i32) -> Tz {
    if offset_minutes == 0 {
        return Tz::UTC;
    }

    refresh_if_stale();

    match OFFSET_TABLE.read() {
        Ok(table) => table.by_offset.get(&offset_minutes).copied().unwrap_or(Tz::UTC),
        // A poisoned lock still has to produce a zone.
        Err(_) => Tz::UTC,
    }
}

fn refresh_if_stale() {
    let stale = match OFFSET_TABLE.read() {
        Ok(table) => table.built_at.elapsed() > TABLE_TTL,
        Err(_) => return,
    };
    if stale {
        if let Ok(mut table) = OFFSET_TABLE.write() {
            // Re-check under the write lock; another request may have
            // rebuilt the table while we waited.
            if table.built_at.elapsed() > TABLE_TTL {
                *table = build_table();
            }
        }
    }
}

/// Current UTC offset of a zone, in minutes.
pub fn current_offset_minutes(tz: Tz) -> i32 {
    Utc::now().with_timezone(&tz).offset().fix().local_minus_utc() / 60
}
