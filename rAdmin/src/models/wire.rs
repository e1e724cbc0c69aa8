//! Lenient deserializers for backend payloads.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{de, Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Millis(i64),
    Text(String),
}

/// Parse a backend timestamp string.
///
/// Accepts RFC 3339 (`2024-05-01T10:00:00.000Z`) and naive SQL-style
/// (`2024-05-01 10:00:00`) values; naive values are taken as UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn raw_to_timestamp<E: de::Error>(raw: RawTimestamp) -> Result<DateTime<Utc>, E> {
    match raw {
        RawTimestamp::Millis(ms) => Utc
            .timestamp_millis_opt(ms)
            .single()
            .ok_or_else(|| E::custom(format!("timestamp out of range: {ms}"))),
        RawTimestamp::Text(text) => parse_timestamp(&text)
            .ok_or_else(|| E::custom(format!("invalid timestamp: {text}"))),
    }
}

pub fn timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    raw_to_timestamp(RawTimestamp::deserialize(deserializer)?)
}

pub fn timestamp_opt<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    Option::<RawTimestamp>::deserialize(deserializer)?
        .map(raw_to_timestamp)
        .transpose()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Number(f64),
    Text(String),
}

/// Money amounts come back as numbers or as decimal strings (`"100.00"`).
/// Unparseable values become `None` rather than failing the whole payload.
pub fn amount_opt<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let raw = Option::<RawAmount>::deserialize(deserializer)?;
    Ok(raw.and_then(|raw| match raw {
        RawAmount::Number(n) => Some(n),
        RawAmount::Text(s) => s.trim().parse().ok(),
    }))
}

/// Null-tolerant string: `null` and missing both become empty.
pub fn string_or_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
