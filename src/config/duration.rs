//! ISO-8601 durations (`PT5M`, `P1DT2H`, `PT0.5S`) for config values.

use std::time::Duration;

/// Error returned for a malformed duration string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid ISO-8601 duration '{0}'")]
pub struct DurationParseError(pub String);

/// Parse an ISO-8601 duration of the form `PnDTnHnMnS`.
///
/// Only days are accepted in the date part; fractions are only accepted on
/// seconds. Designators must appear in order and at most once.
pub fn parse_iso8601(input: &str) -> Result<Duration, DurationParseError> {
    let err = || DurationParseError(input.to_string());
    let upper = input.trim().to_ascii_uppercase();

    let rest = upper.strip_prefix('P').ok_or_else(err)?;
    let (date, time) = match rest.split_once('T') {
        Some((d, t)) => {
            if t.is_empty() {
                return Err(err());
            }
            (d, Some(t))
        }
        None => (rest, None),
    };
    if date.is_empty() && time.is_none() {
        return Err(err());
    }

    let mut total = Duration::ZERO;

    for (value, unit) in components(date).ok_or_else(err)? {
        match unit {
            'D' => {
                let days = whole(&value, 86_400).ok_or_else(err)?;
                total = total.checked_add(days).ok_or_else(err)?;
            }
            _ => return Err(err()),
        }
    }

    if let Some(time) = time {
        let mut last_rank = 0;
        for (value, unit) in components(time).ok_or_else(err)? {
            let rank = match unit {
                'H' => 1,
                'M' => 2,
                'S' => 3,
                _ => return Err(err()),
            };
            if rank <= last_rank {
                return Err(err());
            }
            last_rank = rank;

            let part = match unit {
                'H' => whole(&value, 3_600).ok_or_else(err)?,
                'M' => whole(&value, 60).ok_or_else(err)?,
                _ => {
                    let secs: f64 = value.parse().map_err(|_| err())?;
                    if !secs.is_finite() || secs < 0.0 {
                        return Err(err());
                    }
                    Duration::try_from_secs_f64(secs).map_err(|_| err())?
                }
            };
            total = total.checked_add(part).ok_or_else(err)?;
        }
    }

    Ok(total)
}

/// Render a duration in the canonical `PT..H..M..S` form.
pub fn format_iso8601(duration: Duration) -> String {
    let total = duration.as_secs();
    let nanos = duration.subsec_nanos();
    if total == 0 && nanos == 0 {
        return "PT0S".to_string();
    }

    let hours = total / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    let mut out = String::from("PT");
    if hours > 0 {
        out.push_str(&format!("{}H", hours));
    }
    if minutes > 0 {
        out.push_str(&format!("{}M", minutes));
    }
    if seconds > 0 || nanos > 0 {
        if nanos > 0 {
            let fraction = format!("{:09}", nanos);
            out.push_str(&format!("{}.{}S", seconds, fraction.trim_end_matches('0')));
        } else {
            out.push_str(&format!("{}S", seconds));
        }
    }
    out
}

/// Split `12H30M` into `[("12", 'H'), ("30", 'M')]`.
fn components(part: &str) -> Option<Vec<(String, char)>> {
    let mut out = Vec::new();
    let mut number = String::new();
    for c in part.chars() {
        if c.is_ascii_digit() || c == '.' {
            number.push(c);
        } else if c.is_ascii_alphabetic() {
            if number.is_empty() {
                return None;
            }
            out.push((std::mem::take(&mut number), c));
        } else {
            return None;
        }
    }
    if !number.is_empty() {
        return None;
    }
    Some(out)
}

fn whole(value: &str, unit_secs: u64) -> Option<Duration> {
    let n: u64 = value.parse().ok()?;
    n.checked_mul(unit_secs).map(Duration::from_secs)
}

/// Serde adapter for `Duration` fields written as ISO-8601 strings.
pub mod iso8601 {
    use std::time::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_iso8601(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_iso8601(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_common_forms() {
        assert_eq!(parse_iso8601("PT5M").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_iso8601("pt30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_iso8601("PT1H30M").unwrap(), Duration::from_secs(5_400));
        assert_eq!(parse_iso8601("P1DT2H").unwrap(), Duration::from_secs(93_600));
        assert_eq!(parse_iso8601("P2D").unwrap(), Duration::from_secs(172_800));
        assert_eq!(parse_iso8601("PT0.25S").unwrap(), Duration::from_millis(250));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "5M", "P", "PT", "PT5", "PTM", "PT5X", "PT5S5M", "P1H", "PT1.5M", "PT-1S"] {
            assert!(parse_iso8601(bad).is_err(), "expected error for {:?}", bad);
        }
    }

    #[test]
    fn test_parse_rejects_out_of_range() {
        for bad in [
            "PT99999999999999999999999S",
            "P213503982334601DT5124095576030431H",
            "P213503982334601DT99999999999999999999S",
        ] {
            assert_eq!(parse_iso8601(bad), Err(DurationParseError(bad.to_string())));
        }
    }

    #[test]
    fn test_format_matches_parse() {
        assert_eq!(format_iso8601(Duration::from_secs(300)), "PT5M");
        assert_eq!(format_iso8601(Duration::from_secs(3_661)), "PT1H1M1S");
        assert_eq!(format_iso8601(Duration::ZERO), "PT0S");
        assert_eq!(format_iso8601(Duration::from_millis(1_500)), "PT1.5S");

        let d = Duration::from_secs(93_600);
        assert_eq!(parse_iso8601(&format_iso8601(d)).unwrap(), d);
    }
}
