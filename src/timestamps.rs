// Timestamp Normalisation
use crate::config::DateWindow;
use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use chrono_tz::Tz;
use polars::prelude::*;

pub const DAY_OF_WEEK: &str = "day_of_week";
pub const HOUR_OF_DAY: &str = "hour_of_day";
pub const DAY_OF_MONTH: &str = "day_of_month";

const UTC: &str = "UTC";
const HOUR_MS: i64 = 3_600_000;

const AWARE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"];
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Whether a timestamp column carries zone information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneBasis {
    /// Wall-clock readings with no zone attached.
    Naive,
    /// Instants, stored as UTC.
    Utc,
}

impl ZoneBasis {
    fn time_zone(self) -> Option<TimeZone> {
        match self {
            ZoneBasis::Naive => None,
            ZoneBasis::Utc => Some(PlSmallStr::from_str(UTC)),
        }
    }
}

/// Parses one textual timestamp. Aware readings come back as their UTC instant.
pub fn parse_timestamp(text: &str) -> Option<(NaiveDateTime, ZoneBasis)> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some((dt.naive_utc(), ZoneBasis::Utc));
    }
    for fmt in AWARE_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, fmt) {
            return Some((dt.naive_utc(), ZoneBasis::Utc));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some((ts, ZoneBasis::Naive));
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|ts| (ts, ZoneBasis::Naive))
}

/// Normalises a timestamp column to millisecond `Datetime`, tagged `UTC` when aware.
///
/// The zone basis is taken from the first non-null value. An empty or
/// all-null column is naive. Within a column, naive text under an aware basis
/// is read as UTC and aware text under a naive basis keeps its UTC reading.
pub fn normalize(column: &Column) -> Result<(Column, ZoneBasis)> {
    let name = column.name().clone();

    let (millis, basis) = match column.dtype() {
        DataType::Datetime(_, tz) => {
            let basis = if tz.is_some() { ZoneBasis::Utc } else { ZoneBasis::Naive };
            let ca = column.datetime()?.cast_time_unit(TimeUnit::Milliseconds);
            (ca.physical().clone(), basis)
        }
        DataType::String => parse_text(column.str()?)?,
        DataType::Null => (
            Int64Chunked::full_null(name.clone(), column.len()),
            ZoneBasis::Naive,
        ),
        other => {
            return Err(Error::Schema(format!(
                "column '{name}' has type {other}, expected timestamps"
            )));
        }
    };

    let ca = millis
        .with_name(name)
        .into_datetime(TimeUnit::Milliseconds, basis.time_zone());

    Ok((ca.into_column(), basis))
}

fn parse_text(values: &StringChunked) -> Result<(Int64Chunked, ZoneBasis)> {
    let mut basis = None;

    let millis = values
        .into_iter()
        .map(|value| {
            let Some(text) = value else {
                return Ok(None);
            };
            let (ts, parsed) = parse_timestamp(text).ok_or_else(|| {
                Error::Schema(format!(
                    "unparseable timestamp '{text}' in column '{}'",
                    values.name()
                ))
            })?;
            basis.get_or_insert(parsed);
            Ok(Some(ts.and_utc().timestamp_millis()))
        })
        .collect::<Result<Int64Chunked>>()?;

    Ok((millis, basis.unwrap_or(ZoneBasis::Naive)))
}

/// Inclusive window test over a normalised column. Nulls fall outside.
///
/// Naive readings are compared against naive bounds and instants against
/// the same bounds read as UTC.
pub fn in_window(name: &str, window: &DateWindow) -> Expr {
    let epoch_ms = col(name).dt().timestamp(TimeUnit::Milliseconds);
    let lo = window.start.and_utc().timestamp_millis();
    let hi = window.end.and_utc().timestamp_millis();

    epoch_ms.clone().gt_eq(lit(lo)).and(epoch_ms.lt_eq(lit(hi)))
}

/// Moves a normalised column into `zone`.
///
/// Aware instants are converted. Naive readings are taken as wall-clock time
/// in `zone`: readings skipped by a DST jump move forward one hour and
/// repeated readings take the earlier instant.
pub fn to_zone(name: &str, basis: ZoneBasis, zone: Tz) -> Expr {
    let zone = PlSmallStr::from_str(zone.name());

    match basis {
        ZoneBasis::Utc => col(name).dt().convert_time_zone(zone),
        ZoneBasis::Naive => {
            let place = |reading: Expr| {
                reading
                    .dt()
                    .replace_time_zone(Some(zone.clone()), lit("earliest"), NonExistent::Null)
            };
            let hour_later = (col(name).cast(DataType::Int64) + lit(HOUR_MS))
                .cast(DataType::Datetime(TimeUnit::Milliseconds, None));

            place(col(name)).fill_null(place(hour_later)).alias(name)
        }
    }
}

/// `day_of_week` (Monday = 0), `hour_of_day` and `day_of_month` read in the column's zone.
pub fn calendar_features(name: &str) -> [Expr; 3] {
    [
        (col(name).dt().weekday().cast(DataType::Int32) - lit(1)).alias(DAY_OF_WEEK),
        col(name).dt().hour().cast(DataType::Int32).alias(HOUR_OF_DAY),
        col(name).dt().day().cast(DataType::Int32).alias(DAY_OF_MONTH),
    ]
}

/// Renders a `Datetime` value as `YYYY-MM-DD HH:MM:SS[.f]`, with `±HH:MM` when zoned.
pub fn format_datetime(value: i64, unit: TimeUnit, tz: Option<&str>) -> Result<String> {
    let (secs, nanos) = match unit {
        TimeUnit::Nanoseconds => (value.div_euclid(1_000_000_000), value.rem_euclid(1_000_000_000)),
        TimeUnit::Microseconds => (value.div_euclid(1_000_000), value.rem_euclid(1_000_000) * 1_000),
        TimeUnit::Milliseconds => (value.div_euclid(1_000), value.rem_euclid(1_000) * 1_000_000),
    };
    let instant = DateTime::from_timestamp(secs, nanos as u32)
        .ok_or_else(|| Error::Serialization(format!("timestamp {value} is out of range")))?;

    Ok(match tz {
        None => instant.naive_utc().format("%Y-%m-%d %H:%M:%S%.f").to_string(),
        Some(tz) => instant
            .with_timezone(&parse_zone(tz)?)
            .format("%Y-%m-%d %H:%M:%S%.f%:z")
            .to_string(),
    })
}

fn parse_zone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| Error::Schema(format!("unknown time zone '{name}'")))
}
