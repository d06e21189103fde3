//! Date collaborator
//!
//! Dates are nanoseconds since the Unix epoch (UTC), the same integer domain
//! as `Value::Date`. All calendar math is delegated to chrono; this module
//! only adapts its API to the nanosecond representation.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime, Timelike, Utc};
use std::fmt::Write;

pub const NANOS_PER_SECOND: i64 = 1_000_000_000;
pub const NANOS_PER_MINUTE: i64 = 60 * NANOS_PER_SECOND;
pub const NANOS_PER_HOUR: i64 = 60 * NANOS_PER_MINUTE;
pub const NANOS_PER_DAY: i64 = 24 * NANOS_PER_HOUR;

pub fn to_datetime(nanos: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_nanos(nanos)
}

pub fn from_datetime(dt: DateTime<Utc>) -> Option<i64> {
    dt.timestamp_nanos_opt()
}

pub fn from_naive(dt: NaiveDateTime) -> Option<i64> {
    dt.and_utc().timestamp_nanos_opt()
}

/// Truncate an instant down to a multiple of `resolution`
///
/// Instants below the lowest representable multiple clamp to `i64::MIN`.
pub fn truncate(nanos: i64, resolution: i64) -> i64 {
    if resolution <= 1 {
        return nanos;
    }
    nanos
        .checked_sub(nanos.rem_euclid(resolution))
        .unwrap_or(i64::MIN)
}

/// Calendar component of a date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    /// 1 = Sunday .. 7 = Saturday
    Weekday,
    DayOfYear,
}

pub fn component(nanos: i64, which: Component) -> i64 {
    let dt = to_datetime(nanos);
    match which {
        Component::Year => i64::from(dt.year()),
        Component::Month => i64::from(dt.month()),
        Component::Day => i64::from(dt.day()),
        Component::Hour => i64::from(dt.hour()),
        Component::Minute => i64::from(dt.minute()),
        Component::Second => i64::from(dt.second()),
        Component::Weekday => i64::from(dt.weekday().number_from_sunday()),
        Component::DayOfYear => i64::from(dt.ordinal()),
    }
}

/// Calendar unit used by reset policies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarUnit {
    Hour,
    Day,
    Week,
    Month,
    Year,
}

/// Whether two instants fall into the same calendar unit
pub fn same_period(unit: CalendarUnit, a: i64, b: i64) -> bool {
    let (a, b) = (to_datetime(a), to_datetime(b));
    match unit {
        CalendarUnit::Hour => a.date_naive() == b.date_naive() && a.hour() == b.hour(),
        CalendarUnit::Day => a.date_naive() == b.date_naive(),
        CalendarUnit::Week => a.iso_week() == b.iso_week(),
        CalendarUnit::Month => a.year() == b.year() && a.month() == b.month(),
        CalendarUnit::Year => a.year() == b.year(),
    }
}

/// DateAdd / DateDiff interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    Year,
    Quarter,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
}

impl Interval {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "yyyy" => Some(Self::Year),
            "q" => Some(Self::Quarter),
            "m" => Some(Self::Month),
            "ww" | "w" => Some(Self::Week),
            "d" | "y" => Some(Self::Day),
            "h" => Some(Self::Hour),
            "n" => Some(Self::Minute),
            "s" => Some(Self::Second),
            _ => None,
        }
    }

    fn months(self) -> Option<i64> {
        match self {
            Self::Year => Some(12),
            Self::Quarter => Some(3),
            Self::Month => Some(1),
            _ => None,
        }
    }

    fn nanos(self) -> i64 {
        match self {
            Self::Week => 7 * NANOS_PER_DAY,
            Self::Day => NANOS_PER_DAY,
            Self::Hour => NANOS_PER_HOUR,
            Self::Minute => NANOS_PER_MINUTE,
            _ => NANOS_PER_SECOND,
        }
    }
}

/// Add `n` intervals to a date; `None` when the result leaves the representable range
pub fn add_interval(interval: Interval, n: i64, nanos: i64) -> Option<i64> {
    match interval.months() {
        Some(per) => {
            let months = n.checked_mul(per)?;
            let step = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
            let dt = to_datetime(nanos);
            let shifted = if months >= 0 {
                dt.checked_add_months(step)?
            } else {
                dt.checked_sub_months(step)?
            };
            from_datetime(shifted)
        },
        None => nanos.checked_add(n.checked_mul(interval.nanos())?),
    }
}

/// Whole intervals from `a` to `b`
///
/// Calendar intervals count boundaries crossed (month/quarter/year numbers,
/// calendar days); clock intervals count elapsed whole units.
pub fn diff_interval(interval: Interval, a: i64, b: i64) -> i64 {
    let (da, db) = (to_datetime(a), to_datetime(b));
    let month_index = |d: &DateTime<Utc>| i64::from(d.year()) * 12 + i64::from(d.month0());
    match interval {
        Interval::Year => i64::from(db.year() - da.year()),
        Interval::Quarter => month_index(&db) / 3 - month_index(&da) / 3,
        Interval::Month => month_index(&db) - month_index(&da),
        Interval::Day => (db.date_naive() - da.date_naive()).num_days(),
        Interval::Week => (db.date_naive() - da.date_naive()).num_days() / 7,
        Interval::Hour | Interval::Minute | Interval::Second => {
            ((i128::from(b) - i128::from(a)) / i128::from(interval.nanos())) as i64
        },
    }
}

/// Build a date from year/month/day, normalising out-of-range months and days
pub fn date_serial(year: i64, month: i64, day: i64) -> Option<i64> {
    let base = NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, 1, 1)?;
    let base = from_naive(base.and_hms_opt(0, 0, 0)?)?;
    let shifted = add_interval(Interval::Month, month.checked_sub(1)?, base)?;
    shifted.checked_add(day.checked_sub(1)?.checked_mul(NANOS_PER_DAY)?)
}

/// Time of day as a date on the epoch day
pub fn time_serial(hour: i64, minute: i64, second: i64) -> Option<i64> {
    let hours = hour.checked_mul(NANOS_PER_HOUR)?;
    let minutes = minute.checked_mul(NANOS_PER_MINUTE)?;
    let seconds = second.checked_mul(NANOS_PER_SECOND)?;
    hours.checked_add(minutes)?.checked_add(seconds)
}

/// strftime formatting; `None` for an invalid pattern
pub fn format(nanos: i64, pattern: &str) -> Option<String> {
    let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return None;
    }
    let mut out = String::new();
    write!(out, "{}", to_datetime(nanos).format_with_items(items.into_iter())).ok()?;
    Some(out)
}

/// Canonical text form used when a date is rendered as text
pub fn render(nanos: i64) -> String {
    to_datetime(nanos)
        .format("%Y-%m-%d %H:%M:%S%.f")
        .to_string()
}

/// Parse the textual date forms accepted by literals and `CDate`
pub fn parse(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return from_datetime(dt.with_timezone(&Utc));
    }
    for pattern in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, pattern) {
            return from_naive(dt);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .and_then(from_naive)
}

/// Span helper: `count` units of `unit_nanos`, rounding fractional counts
pub fn span(count: f64, unit_nanos: i64) -> Option<i64> {
    let nanos = (count * unit_nanos as f64).round();
    if nanos.is_finite() && nanos.abs() < i64::MAX as f64 {
        Some(nanos as i64)
    } else {
        None
    }
}
