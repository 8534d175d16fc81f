//! Conversions between calendar fields, epoch milliseconds and readable UTC text.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Timelike, Utc};

use crate::error::{LogQueryError, Result};

const COMPOSED_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpochConversion {
    pub epoch_ms: i64,
    /// The composed `YYYY-MM-DDTHH:MM:SSZ` string that was parsed.
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Readable {
    pub readable: String,
    pub utc: String,
}

/// Compose the four fields into `YYYY-MM-DDTHH:MM:SSZ` and parse it as UTC.
///
/// Single-digit month/day/clock parts are zero-padded and an `HH:MM` time
/// gets `:00` seconds.
pub fn to_epoch_millis(year: &str, month: &str, day: &str, time: &str) -> Result<EpochConversion> {
    let date = format!(
        "{}-{}-{}T{}Z",
        year.trim(),
        pad2(month),
        pad2(day),
        normalize_clock(time)
    );
    let parsed = NaiveDateTime::parse_from_str(&date, COMPOSED_FORMAT).map_err(|e| {
        LogQueryError::TimeFormat {
            input: date.clone(),
            reason: e.to_string(),
        }
    })?;
    // chrono accepts second 60 as a leap second.
    if parsed.nanosecond() >= 1_000_000_000 {
        return Err(LogQueryError::TimeFormat {
            input: date,
            reason: "second out of range".to_string(),
        });
    }
    Ok(EpochConversion {
        epoch_ms: parsed.and_utc().timestamp_millis(),
        date,
    })
}

pub fn to_readable(epoch_ms: i64) -> Result<Readable> {
    let dt: DateTime<Utc> =
        DateTime::from_timestamp_millis(epoch_ms).ok_or_else(|| LogQueryError::TimeFormat {
            input: epoch_ms.to_string(),
            reason: "epoch milliseconds out of representable range".to_string(),
        })?;
    Ok(Readable {
        readable: dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        utc: dt.format("%Y-%m-%d %H:%M:%S%.f +0000 UTC").to_string(),
    })
}

pub fn parse_epoch_millis(text: &str) -> Result<i64> {
    text.trim()
        .parse::<i64>()
        .map_err(|e| LogQueryError::InvalidRequest(format!("Invalid epoch_ms: {e}")))
}

fn pad2(field: &str) -> String {
    let field = field.trim();
    if field.len() == 1 && field.bytes().all(|b| b.is_ascii_digit()) {
        format!("0{field}")
    } else {
        field.to_string()
    }
}

fn normalize_clock(time: &str) -> String {
    let mut parts: Vec<String> = time.trim().split(':').map(pad2).collect();
    if parts.len() == 2 {
        parts.push("00".to_string());
    }
    parts.join(":")
}
