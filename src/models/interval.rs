//! Auto-sync intervals the backend scheduler accepts.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{ClientError, Result};

/// The fixed set of auto-sync periods: 30m, 1h, 2h, 6h, 12h, 24h.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub enum SyncInterval {
    HalfHour,
    Hour,
    TwoHours,
    SixHours,
    TwelveHours,
    Day,
}

impl SyncInterval {
    pub const ALL: [SyncInterval; 6] = [
        SyncInterval::HalfHour,
        SyncInterval::Hour,
        SyncInterval::TwoHours,
        SyncInterval::SixHours,
        SyncInterval::TwelveHours,
        SyncInterval::Day,
    ];

    pub fn from_secs(secs: u64) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|i| i.as_secs() == secs)
            .ok_or(ClientError::InvalidInterval(secs))
    }

    pub fn as_secs(self) -> u64 {
        match self {
            SyncInterval::HalfHour => 1_800,
            SyncInterval::Hour => 3_600,
            SyncInterval::TwoHours => 7_200,
            SyncInterval::SixHours => 21_600,
            SyncInterval::TwelveHours => 43_200,
            SyncInterval::Day => 86_400,
        }
    }

    /// `HH:MM:SS`, the form the auto-sync endpoint expects.
    pub fn wire_format(self) -> String {
        hms(self.as_secs())
    }

    pub fn label(self) -> &'static str {
        match self {
            SyncInterval::HalfHour => "30m",
            SyncInterval::Hour => "1h",
            SyncInterval::TwoHours => "2h",
            SyncInterval::SixHours => "6h",
            SyncInterval::TwelveHours => "12h",
            SyncInterval::Day => "24h",
        }
    }
}

impl TryFrom<u64> for SyncInterval {
    type Error = ClientError;

    fn try_from(secs: u64) -> Result<Self> {
        Self::from_secs(secs)
    }
}

impl From<SyncInterval> for u64 {
    fn from(i: SyncInterval) -> u64 {
        i.as_secs()
    }
}

impl fmt::Display for SyncInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Seconds as zero-padded `HH:MM:SS`. Hours are never wrapped.
pub fn hms(total_secs: u64) -> String {
    let hours = total_secs / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let seconds = total_secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Parse `HH:MM:SS` back into seconds. Used when the server echoes the
/// interval in its string form.
pub fn parse_hms(s: &str) -> Option<u64> {
    let mut parts = s.split(':');
    let h: u64 = parts.next()?.parse().ok()?;
    let m: u64 = parts.next()?.parse().ok()?;
    let sec: u64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || m >= 60 || sec >= 60 {
        return None;
    }
    h.checked_mul(3_600)?.checked_add(m * 60 + sec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_only_enumerated_intervals() {
        for secs in [1800, 3600, 7200, 21600, 43200, 86400] {
            assert_eq!(SyncInterval::from_secs(secs).unwrap().as_secs(), secs);
        }
        assert!(matches!(
            SyncInterval::from_secs(900),
            Err(ClientError::InvalidInterval(900))
        ));
        assert!(SyncInterval::from_secs(0).is_err());
    }

    #[test]
    fn test_wire_format() {
        assert_eq!(SyncInterval::HalfHour.wire_format(), "00:30:00");
        assert_eq!(SyncInterval::TwoHours.wire_format(), "02:00:00");
        assert_eq!(SyncInterval::Day.wire_format(), "24:00:00");
    }

    #[test]
    fn test_parse_hms() {
        assert_eq!(parse_hms("06:00:00"), Some(21_600));
        assert_eq!(parse_hms("00:30:00"), Some(1_800));
        assert_eq!(parse_hms("1:2"), None);
        assert_eq!(parse_hms("00:61:00"), None);
        assert_eq!(parse_hms("aa:00:00"), None);
        assert_eq!(parse_hms("9999999999999999999:00:00"), None);
        assert_eq!(parse_hms("5124095576030431:00:16"), None);
    }

    #[test]
    fn test_serde_as_seconds() {
        let json = serde_json::to_string(&SyncInterval::SixHours).unwrap();
        assert_eq!(json, "21600");
        let back: SyncInterval = serde_json::from_str("3600").unwrap();
        assert_eq!(back, SyncInterval::Hour);
        assert!(serde_json::from_str::<SyncInterval>("42").is_err());
    }
}
