use chrono::{DateTime, FixedOffset, Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which mutation kinds an observer wants, mirroring a browser's observer init dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObserveOptions {
    pub attributes: bool,
    pub child_list: bool,
    pub subtree: bool,
}

impl Default for ObserveOptions {
    fn default() -> Self {
        Self {
            attributes: true,
            child_list: true,
            subtree: true,
        }
    }
}

/// How the 12-hour clock of the legacy `Jan 5, 2024 3:04pm GMT+0800` format maps to 24 hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HourClock {
    /// `pm` always adds 12, so 12pm becomes hour 24 and 12am stays 12.
    Legacy,
    /// 12am is hour 0, 12pm is hour 12.
    #[default]
    Corrected,
}

/// What the initial sweep writes into each `<time>` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Bootstrap {
    /// The raw attribute value; the resulting child-list mutations normalize it afterwards.
    #[default]
    Raw,
    /// The canonical string straight away.
    Normalize,
}

/// Zone the canonical `YYYY-MM-DD HH:MM:SS` text is rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DisplayZone {
    #[default]
    Local,
    /// Seconds east of UTC.
    Fixed(i32),
}

impl DisplayZone {
    pub fn utc() -> Self {
        DisplayZone::Fixed(0)
    }

    /// Shift an instant into this zone, keeping it comparable with a fixed offset.
    pub fn localize<Tz: TimeZone>(&self, dt: &DateTime<Tz>) -> Option<DateTime<FixedOffset>> {
        match *self {
            DisplayZone::Local => Some(dt.with_timezone(&Local).fixed_offset()),
            DisplayZone::Fixed(secs) => FixedOffset::east_opt(secs).map(|tz| dt.with_timezone(&tz)),
        }
    }
}

impl FromStr for DisplayZone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => return Ok(DisplayZone::Local),
            "utc" | "z" => return Ok(DisplayZone::utc()),
            _ => {}
        }
        let offset = crate::normalizer::parse_timezone_offset(s);
        FixedOffset::from_str(&offset)
            .map(|tz| DisplayZone::Fixed(tz.local_minus_utc()))
            .map_err(|_| format!("invalid zone '{}': expected local, utc or ±HH:MM", s))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub observe: ObserveOptions,
    pub hour_clock: HourClock,
    pub bootstrap: Bootstrap,
    pub zone: DisplayZone,
}

/// One rewritten (or attempted) timestamp, as emitted by the output writers.
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct TimestampRecord {
    pub source: Option<String>,
    pub raw: Option<String>,
    pub before: Option<String>,
    pub canonical: Option<String>,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_from_str() {
        assert_eq!("local".parse::<DisplayZone>(), Ok(DisplayZone::Local));
        assert_eq!("UTC".parse::<DisplayZone>(), Ok(DisplayZone::Fixed(0)));
        assert_eq!("+08:00".parse::<DisplayZone>(), Ok(DisplayZone::Fixed(8 * 3600)));
        assert_eq!(
            "-0530".parse::<DisplayZone>(),
            Ok(DisplayZone::Fixed(-(5 * 3600 + 30 * 60)))
        );
        assert!("mars".parse::<DisplayZone>().is_err());
    }

    #[test]
    fn defaults_watch_everything() {
        let cfg = Config::default();
        assert!(cfg.observe.attributes && cfg.observe.child_list && cfg.observe.subtree);
        assert_eq!(cfg.hour_clock, HourClock::Corrected);
        assert_eq!(cfg.bootstrap, Bootstrap::Raw);
    }
}
