//! Timestamps in the format the provisioning API expects.

use chrono::{
    DateTime, Duration, LocalResult, NaiveDateTime, TimeZone, Utc,
};
use chrono_tz::Tz;
use serde::{
    de::{Deserializer, Error as _},
    ser::Serializer,
    Deserialize, Serialize,
};
use std::fmt::{self, Display, Formatter};

/// The layout used for every timestamp LastPass sends or accepts.
pub const LASTPASS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// LastPass reports (and expects) wall-clock times in this zone, without
/// ever saying so in the string itself.
pub const LASTPASS_TIMEZONE: Tz = chrono_tz::US::Eastern;

/// A point in time which is written as `YYYY-MM-DD HH:MM:SS` in the
/// LastPass timezone.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LastPassTime(DateTime<Utc>);

impl LastPassTime {
    pub fn now() -> Self { LastPassTime(Utc::now()) }

    /// Parse a timestamp as US/Eastern wall-clock time.
    ///
    /// Times repeated by the end of daylight saving resolve to the earlier
    /// instant.
    pub fn parse(raw: &str) -> Result<Self, TimeError> {
        let naive = NaiveDateTime::parse_from_str(raw.trim(), LASTPASS_FORMAT)
            .map_err(|inner| TimeError::BadFormat {
                raw: raw.to_string(),
                inner,
            })?;

        match LASTPASS_TIMEZONE.from_local_datetime(&naive) {
            LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => {
                Ok(LastPassTime(t.with_timezone(&Utc)))
            },
            LocalResult::None => Err(TimeError::NonexistentLocalTime {
                raw: raw.to_string(),
            }),
        }
    }

    /// Render the timestamp the way LastPass wants it.
    pub fn format(&self) -> String {
        self.in_timezone(LASTPASS_TIMEZONE)
            .format(LASTPASS_FORMAT)
            .to_string()
    }

    /// Convert to some other timezone for display.
    pub fn in_timezone(&self, tz: Tz) -> DateTime<Tz> {
        self.0.with_timezone(&tz)
    }

    pub fn as_utc(&self) -> DateTime<Utc> { self.0 }

    /// The instant `days` whole days before this one.
    pub fn days_before(&self, days: u32) -> Result<LastPassTime, TimeError> {
        self.0
            .checked_sub_signed(Duration::days(days.into()))
            .map(LastPassTime)
            .ok_or(TimeError::OutOfRange { days })
    }
}

impl<T: TimeZone> From<DateTime<T>> for LastPassTime {
    fn from(other: DateTime<T>) -> LastPassTime {
        LastPassTime(other.with_timezone(&Utc))
    }
}

impl Display for LastPassTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

impl Serialize for LastPassTime {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&self.format())
    }
}

impl<'de> Deserialize<'de> for LastPassTime {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(de)?;
        LastPassTime::parse(&raw).map_err(D::Error::custom)
    }
}

/// Errors that can happen when reading a LastPass timestamp.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimeError {
    #[error("\"{}\" isn't in the \"YYYY-MM-DD HH:MM:SS\" format", raw)]
    BadFormat {
        raw: String,
        #[source]
        inner: chrono::ParseError,
    },
    #[error("\"{}\" doesn't exist in the US/Eastern timezone", raw)]
    NonexistentLocalTime { raw: String },
    #[error("Going back {} days falls outside the supported calendar", days)]
    OutOfRange { days: u32 },
}
