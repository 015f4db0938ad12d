use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::{Date, Month, Weekday};

use crate::ValidationError;

/// 8-digit Gregorian trading-day key (yyyymmdd), the date currency of the
/// whole system. `DEven::ZERO` is the "never synced" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DEven(u32);

impl DEven {
    pub const ZERO: Self = Self(0);

    /// Parse a feed-formatted date. `"0"` and the empty string map to the
    /// sentinel; anything else must be 8 digits naming a real calendar day.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed == "0" {
            return Ok(Self::ZERO);
        }

        let invalid = || ValidationError::InvalidDeven {
            value: input.to_owned(),
        };

        if trimmed.len() != 8 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let value: u32 = trimmed.parse().map_err(|_| invalid())?;
        let deven = Self(value);
        deven.to_date().ok_or_else(invalid)?;
        Ok(deven)
    }

    pub fn from_date(date: Date) -> Self {
        let month = date.month() as u32;
        Self(date.year() as u32 * 10_000 + month * 100 + u32::from(date.day()))
    }

    /// Calendar date behind this key; `None` for the sentinel or a value
    /// that does not name a real day.
    pub fn to_date(self) -> Option<Date> {
        if self.is_never_synced() {
            return None;
        }
        let year = (self.0 / 10_000) as i32;
        let month = Month::try_from(((self.0 / 100) % 100) as u8).ok()?;
        let day = (self.0 % 100) as u8;
        Date::from_calendar_date(year, month, day).ok()
    }

    pub const fn is_never_synced(self) -> bool {
        self.0 == 0
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }

    pub fn weekday(self) -> Option<Weekday> {
        self.to_date().map(|date| date.weekday())
    }

    /// Signed whole days from `self` to `other`; `None` when either side is
    /// the sentinel.
    pub fn days_until(self, other: Self) -> Option<i64> {
        let from = self.to_date()?;
        let to = other.to_date()?;
        Some((to - from).whole_days())
    }
}

impl Display for DEven {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for DEven {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u32(self.0)
    }
}

impl<'de> Deserialize<'de> for DEven {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = u32::deserialize(deserializer)?;
        if value == 0 {
            return Ok(Self::ZERO);
        }
        let deven = Self(value);
        deven
            .to_date()
            .map(|_| deven)
            .ok_or_else(|| D::Error::custom(format!("'{value}' is not a valid yyyymmdd date")))
    }
}
