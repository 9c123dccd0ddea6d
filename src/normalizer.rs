//! Turns heterogeneous timestamp strings into one canonical `YYYY-MM-DD HH:MM:SS` display string.
//!
//! Two upstream shapes are understood: ISO-8601 / RFC 3339 values (the `datetime` attribute of a
//! `<time>` element) and the legacy tooltip text `Jan 5, 2024 3:04pm GMT+0800`. The latter is
//! first rewritten into an ISO-like intermediate (`2024-01-05T15:04:00.000+08:00`) and then resolved
//! like any other ISO value.

use chrono::{
    DateTime, Datelike, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc,
};
use regex::Regex;
use std::sync::LazyLock;

use crate::config::{Config, HourClock, TimestampRecord};
use crate::error::ParseError;

static LEGACY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\w+)\s(\d+),\s(\d{4}) (\d+):(\d+)([ap]m) GMT([+-]\d{4})")
        .expect("legacy datetime pattern")
});
static CANONICAL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}").expect("canonical pattern"));
static TIMEZONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([+-])(\d{2})(\d{2})").expect("timezone pattern"));

const MONTHS: [(&str, u32); 12] = [
    ("Jan", 1),
    ("Feb", 2),
    ("Mar", 3),
    ("Apr", 4),
    ("May", 5),
    ("Jun", 6),
    ("Jul", 7),
    ("Aug", 8),
    ("Sep", 9),
    ("Oct", 10),
    ("Nov", 11),
    ("Dec", 12),
];

const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%dT%H:%M%:z",
];
// naive forms are read in the process-local zone
const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];

/// Left-pad the string form of `value` with `pad` up to `width` characters.
/// Longer values come back untouched.
pub fn pad_start<T: ToString>(value: T, width: usize, pad: char) -> String {
    let s = value.to_string();
    let len = s.chars().count();
    if len >= width {
        return s;
    }
    let mut out = String::with_capacity(width);
    out.extend(std::iter::repeat_n(pad, width - len));
    out.push_str(&s);
    out
}

/// `+0800` -> `+08:00`. Input without a 4-digit offset is returned verbatim.
pub fn parse_timezone_offset(text: &str) -> String {
    match TIMEZONE_PATTERN.captures(text) {
        Some(caps) => format!("{}{}:{}", &caps[1], &caps[2], &caps[3]),
        None => text.to_string(),
    }
}

fn month_number(name: &str) -> Option<u32> {
    MONTHS.iter().find(|(m, _)| *m == name).map(|&(_, n)| n)
}

fn field(name: &'static str, value: &str) -> Result<u32, ParseError> {
    value.parse::<u32>().map_err(|_| ParseError::InvalidField {
        field: name,
        value: value.to_string(),
    })
}

/// Strict form of [`parse_legacy_format`]: tells *why* the text was not rewritten.
pub fn legacy_to_iso(text: &str, clock: HourClock) -> Result<String, ParseError> {
    let caps = LEGACY_PATTERN
        .captures(text)
        .ok_or_else(|| ParseError::NoMatch(text.to_string()))?;

    let month =
        month_number(&caps[1]).ok_or_else(|| ParseError::UnknownMonth(caps[1].to_string()))?;
    let day = field("day", &caps[2])?;
    let mut hours = field("hour", &caps[4])?;
    let minutes = field("minute", &caps[5])?;
    let pm = &caps[6] == "pm";

    hours = match clock {
        HourClock::Legacy if pm => hours.saturating_add(12),
        HourClock::Legacy => hours,
        HourClock::Corrected => match (hours, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, true) => h.saturating_add(12),
            (h, false) => h,
        },
    };

    Ok(format!(
        "{}-{}-{}T{}:{}:00.000{}",
        &caps[3],
        pad_start(month, 2, '0'),
        pad_start(day, 2, '0'),
        pad_start(hours, 2, '0'),
        pad_start(minutes, 2, '0'),
        parse_timezone_offset(&caps[7]),
    ))
}

/// Rewrite `Jan 5, 2024 3:04pm GMT+0800` into `2024-01-05T15:04:00.000+08:00`.
/// Anything else is handed back unchanged.
pub fn parse_legacy_format(text: &str, clock: HourClock) -> String {
    legacy_to_iso(text, clock).unwrap_or_else(|_| text.to_string())
}

/// Resolve an ISO-like string to a point in time.
///
/// Date-only values are UTC midnight; date-times without an offset are local time.
pub fn resolve(text: &str) -> Result<DateTime<FixedOffset>, ParseError> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt);
    }
    let zulu = text.strip_suffix(['Z', 'z']).map(|t| format!("{t}+00:00"));
    let with_offset = zulu.as_deref().unwrap_or(text);
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(with_offset, fmt) {
            return Ok(dt);
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.fixed_offset())
                .ok_or_else(|| ParseError::Unresolvable(text.to_string()));
        }
    }
    if let Some(midnight) = NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(Utc.from_utc_datetime(&midnight).fixed_offset());
    }
    Err(ParseError::Unresolvable(text.to_string()))
}

/// Render an instant, already shifted to the display zone, as `YYYY-MM-DD HH:MM:SS`.
pub fn format_canonical<Tz: TimeZone>(dt: &DateTime<Tz>) -> String {
    format!(
        "{}-{}-{} {}:{}:{}",
        pad_start(dt.year(), 4, '0'),
        pad_start(dt.month(), 2, '0'),
        pad_start(dt.day(), 2, '0'),
        pad_start(dt.hour(), 2, '0'),
        pad_start(dt.minute(), 2, '0'),
        pad_start(dt.second(), 2, '0'),
    )
}

pub fn is_already_canonical(text: &str) -> bool {
    CANONICAL_PATTERN.is_match(text)
}

/// Full pipeline: legacy rewrite (when it applies), resolve, shift to the display zone, format.
pub fn normalize(raw: &str, config: &Config) -> Result<String, ParseError> {
    let iso = match legacy_to_iso(raw, config.hour_clock) {
        Ok(iso) => iso,
        Err(ParseError::NoMatch(_)) => raw.to_string(),
        Err(e) => return Err(e),
    };
    let instant = resolve(&iso)?;
    let shown = config
        .zone
        .localize(&instant)
        .ok_or_else(|| ParseError::Unresolvable(iso.clone()))?;
    Ok(format_canonical(&shown))
}

/// Record for one raw timestamp: the canonical text, or the reason there is none.
pub fn record_for(raw: &str, config: &Config) -> TimestampRecord {
    let mut rec = TimestampRecord {
        raw: Some(raw.to_string()),
        ..TimestampRecord::default()
    };
    match normalize(raw, config) {
        Ok(canonical) => rec.canonical = Some(canonical),
        Err(e) => rec.error = Some(e.to_string()),
    }
    rec
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DisplayZone;

    fn utc() -> Config {
        Config {
            zone: DisplayZone::utc(),
            ..Config::default()
        }
    }

    #[test]
    fn pads() {
        assert_eq!(pad_start(5, 2, '0'), "05");
        assert_eq!(pad_start(12, 2, '0'), "12");
        assert_eq!(pad_start("1", 2, '0'), "01");
        assert_eq!(pad_start(2024, 4, '0'), "2024");
        assert_eq!(pad_start(7, 4, ' '), "   7");
    }

    #[test]
    fn timezone_offsets() {
        assert_eq!(parse_timezone_offset("+0800"), "+08:00");
        assert_eq!(parse_timezone_offset("-0530"), "-05:30");
        assert_eq!(parse_timezone_offset("UTC"), "UTC");
    }

    #[test]
    fn legacy_pm_afternoon() {
        let iso = parse_legacy_format("Jan 5, 2024 3:04pm GMT+0800", HourClock::Corrected);
        assert_eq!(iso, "2024-01-05T15:04:00.000+08:00");
        let expected = FixedOffset::east_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 5, 15, 4, 0)
            .unwrap();
        assert_eq!(resolve(&iso).unwrap(), expected);
        assert_eq!(
            normalize("Jan 5, 2024 3:04pm GMT+0800", &utc()).unwrap(),
            "2024-01-05 07:04:00"
        );
    }

    #[test]
    fn legacy_noon_and_midnight() {
        assert_eq!(
            parse_legacy_format("Mar 10, 2023 12:30pm GMT+0000", HourClock::Legacy),
            "2023-03-10T24:30:00.000+00:00"
        );
        assert_eq!(
            parse_legacy_format("Mar 10, 2023 12:30pm GMT+0000", HourClock::Corrected),
            "2023-03-10T12:30:00.000+00:00"
        );
        assert_eq!(
            parse_legacy_format("Mar 10, 2023 12:30am GMT+0000", HourClock::Legacy),
            "2023-03-10T12:30:00.000+00:00"
        );
        assert_eq!(
            parse_legacy_format("Mar 10, 2023 12:30am GMT+0000", HourClock::Corrected),
            "2023-03-10T00:30:00.000+00:00"
        );

        // hour 24 never resolves, so the legacy clock leaves noon untouched downstream
        let legacy = Config {
            hour_clock: HourClock::Legacy,
            ..utc()
        };
        assert!(matches!(
            normalize("Mar 10, 2023 12:30pm GMT+0000", &legacy),
            Err(ParseError::Unresolvable(_))
        ));
    }

    #[test]
    fn unmatched_text_is_returned() {
        assert_eq!(parse_legacy_format("not-a-date", HourClock::Corrected), "not-a-date");
        assert_eq!(
            legacy_to_iso("Foo 5, 2024 3:04pm GMT+0800", HourClock::Corrected),
            Err(ParseError::UnknownMonth("Foo".into()))
        );
        assert!(matches!(
            normalize("not-a-date", &utc()),
            Err(ParseError::Unresolvable(_))
        ));
    }

    #[test]
    fn machine_values() {
        assert_eq!(
            normalize("2024-06-01T10:00:00Z", &utc()).unwrap(),
            "2024-06-01 10:00:00"
        );
        assert_eq!(
            normalize("2024-06-01T10:00:00.123+02:00", &utc()).unwrap(),
            "2024-06-01 08:00:00"
        );
        let tokyo = Config {
            zone: DisplayZone::Fixed(9 * 3600),
            ..Config::default()
        };
        assert_eq!(
            normalize("2024-12-31T20:00:00Z", &tokyo).unwrap(),
            "2025-01-01 05:00:00"
        );
    }

    #[test]
    fn short_iso_forms() {
        assert_eq!(
            normalize("2024-06-01T10:00Z", &utc()).unwrap(),
            "2024-06-01 10:00:00"
        );
        assert_eq!(
            normalize("2024-06-01T10:00+02:00", &utc()).unwrap(),
            "2024-06-01 08:00:00"
        );
        assert_eq!(
            normalize("2024-06-01T10:00-0330", &utc()).unwrap(),
            "2024-06-01 13:30:00"
        );
        assert_eq!(
            normalize("2024-06-01T10:00:00.5z", &utc()).unwrap(),
            "2024-06-01 10:00:00"
        );
        // date-only is UTC midnight
        assert_eq!(normalize("2024-06-01", &utc()).unwrap(), "2024-06-01 00:00:00");
        let tokyo = Config {
            zone: DisplayZone::Fixed(9 * 3600),
            ..Config::default()
        };
        assert_eq!(normalize("2024-06-01", &tokyo).unwrap(), "2024-06-01 09:00:00");
        assert!(resolve("2024-13-01").is_err());
    }

    #[test]
    fn records_carry_canonical_or_error() {
        let ok = record_for("2024-06-01T10:00:00Z", &utc());
        assert_eq!(ok.raw.as_deref(), Some("2024-06-01T10:00:00Z"));
        assert_eq!(ok.canonical.as_deref(), Some("2024-06-01 10:00:00"));
        assert!(ok.error.is_none());

        let bad = record_for("not-a-date", &utc());
        assert!(bad.canonical.is_none());
        assert_eq!(
            bad.error.as_deref(),
            Some("does not resolve to a point in time: not-a-date")
        );
    }

    #[test]
    fn canonical_output_is_recognized() {
        for raw in [
            "2024-06-01T10:00:00Z",
            "2000-02-29T23:59:59-11:00",
            "Dec 31, 1999 11:59pm GMT-0700",
            "Jul 4, 2021 9:05am GMT+0530",
        ] {
            let out = normalize(raw, &utc()).unwrap();
            assert!(is_already_canonical(&out), "{raw} -> {out}");
            assert_eq!(out.len(), 19);
        }
        assert!(!is_already_canonical("2 hours ago"));
        assert!(!is_already_canonical("2024-06-01T10:00:00Z"));
    }

    #[test]
    fn legacy_matches_field_wise_parse() {
        let text = "Aug 17, 2022 7:45pm GMT-0300";
        let ours = resolve(&parse_legacy_format(text, HourClock::Corrected)).unwrap();
        let theirs = DateTime::parse_from_str("2022-08-17 19:45 -0300", "%Y-%m-%d %H:%M %z").unwrap();
        assert_eq!(ours, theirs);
    }
}
